use axum::{
    extract::{Path, Query, Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{DirectoryError, Result};
use crate::geo::{Area, BoxArea, CircleArea};
use crate::schemas::{BuildingSchema, OrganizationFullSchema, OrganizationSchema, PracticeSchema};
use crate::service::DirectoryService;

#[derive(Clone)]
pub struct AppState {
    pub service: DirectoryService,
    pub api_key: String,
}

/// Boundary error: maps failures onto HTTP statuses. Validation failures are
/// produced here, before the service runs; storage and data-integrity
/// failures come back as 500.
pub enum ApiError {
    Unauthorized,
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid API Key".to_string()),
            ApiError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "detail": message }))).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        error!("request failed: {err}");
        ApiError::Internal(err.to_string())
    }
}

/// Shared-secret check on the `X-API-Key` header.
async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let provided = request
        .headers()
        .get("X-API-Key")
        .and_then(|value| value.to_str().ok());
    if provided != Some(state.api_key.as_str()) {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

/// Raw area query parameters. A group only counts once it is complete; the
/// caller must supply exactly one complete group.
#[derive(Debug, Default, Deserialize)]
pub struct AreaParams {
    // Box corners
    pub lat1: Option<f64>,
    pub lon1: Option<f64>,
    pub lat2: Option<f64>,
    pub lon2: Option<f64>,
    // Circle center and radius (meters)
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius: Option<f64>,
}

fn check_latitude(value: f64, name: &str) -> std::result::Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&value) {
        return Err(ApiError::Validation(format!("{name} must be between -90 and 90")));
    }
    Ok(())
}

fn check_longitude(value: f64, name: &str) -> std::result::Result<(), ApiError> {
    if !(-180.0..=180.0).contains(&value) {
        return Err(ApiError::Validation(format!("{name} must be between -180 and 180")));
    }
    Ok(())
}

impl AreaParams {
    fn into_area(self) -> std::result::Result<Area, ApiError> {
        let boxed = match (self.lat1, self.lon1, self.lat2, self.lon2) {
            (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => {
                check_latitude(lat1, "lat1")?;
                check_latitude(lat2, "lat2")?;
                check_longitude(lon1, "lon1")?;
                check_longitude(lon2, "lon2")?;
                Some(BoxArea { lat1, lon1, lat2, lon2 })
            }
            _ => None,
        };

        let circle = match (self.lat, self.lon, self.radius) {
            (Some(lat), Some(lon), Some(radius)) => {
                check_latitude(lat, "lat")?;
                check_longitude(lon, "lon")?;
                if radius < 0.0 {
                    return Err(ApiError::Validation("radius must not be negative".to_string()));
                }
                Some(CircleArea { lat, lon, radius })
            }
            _ => None,
        };

        match (boxed, circle) {
            (Some(_), Some(_)) => Err(ApiError::Validation("Specify only one area".to_string())),
            (Some(b), None) => Ok(Area::Box(b)),
            (None, Some(c)) => Ok(Area::Circle(c)),
            (None, None) => Err(ApiError::Validation("Area is required".to_string())),
        }
    }
}

fn check_positive_id(value: i64, name: &str) -> std::result::Result<(), ApiError> {
    if value <= 0 {
        return Err(ApiError::Validation(format!("{name} must be positive")));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    search: Option<String>,
}

// -------------- Handlers --------------

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "secunda",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_buildings(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<BuildingSchema>>, ApiError> {
    Ok(Json(state.service.list_buildings().await?))
}

async fn buildings_in_area(
    State(state): State<AppState>,
    Query(params): Query<AreaParams>,
) -> std::result::Result<Json<Vec<BuildingSchema>>, ApiError> {
    let area = params.into_area()?;
    Ok(Json(state.service.buildings_in_area(&area).await?))
}

async fn organizations_in_building(
    State(state): State<AppState>,
    Path(building_id): Path<i64>,
) -> std::result::Result<Json<Vec<OrganizationSchema>>, ApiError> {
    check_positive_id(building_id, "building_id")?;
    Ok(Json(state.service.organizations_in_building(building_id).await?))
}

async fn list_organizations(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<OrganizationSchema>>, ApiError> {
    Ok(Json(state.service.list_organizations().await?))
}

async fn organizations_in_area(
    State(state): State<AppState>,
    Query(params): Query<AreaParams>,
) -> std::result::Result<Json<Vec<OrganizationSchema>>, ApiError> {
    let area = params.into_area()?;
    Ok(Json(state.service.organizations_in_area(&area).await?))
}

async fn search_organizations_by_name(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<Vec<OrganizationSchema>>, ApiError> {
    let search = params.search.unwrap_or_default();
    if search.is_empty() {
        return Err(ApiError::Validation("search must not be empty".to_string()));
    }
    Ok(Json(state.service.search_organizations_by_name(&search).await?))
}

async fn get_organization(
    State(state): State<AppState>,
    Path(organization_id): Path<i64>,
) -> std::result::Result<Json<OrganizationFullSchema>, ApiError> {
    check_positive_id(organization_id, "organization_id")?;
    match state.service.get_organization(organization_id).await? {
        Some(organization) => Ok(Json(organization)),
        None => Err(ApiError::NotFound(format!("Organization {organization_id} not found"))),
    }
}

async fn list_practices(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<PracticeSchema>>, ApiError> {
    Ok(Json(state.service.list_practices().await?))
}

async fn organizations_of_practice(
    State(state): State<AppState>,
    Path(practice_id): Path<i64>,
) -> std::result::Result<Json<Vec<OrganizationSchema>>, ApiError> {
    check_positive_id(practice_id, "practice_id")?;
    Ok(Json(state.service.organizations_of_practice(practice_id).await?))
}

async fn organizations_of_practice_recursive(
    State(state): State<AppState>,
    Path(practice_id): Path<i64>,
) -> std::result::Result<Json<Vec<OrganizationSchema>>, ApiError> {
    check_positive_id(practice_id, "practice_id")?;
    Ok(Json(state.service.organizations_of_practice_recursive(practice_id).await?))
}

// -------------- Router --------------

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let api = Router::new()
        .route("/buildings/all", get(list_buildings))
        .route("/buildings/search_in_area", get(buildings_in_area))
        .route("/buildings/:building_id/organizations", get(organizations_in_building))
        .route("/organizations/all", get(list_organizations))
        .route("/organizations/search_in_area", get(organizations_in_area))
        .route("/organizations/search_by_name", get(search_organizations_by_name))
        .route("/organizations/:organization_id", get(get_organization))
        .route("/practices/all", get(list_practices))
        .route("/practices/:practice_id/organizations", get(organizations_of_practice))
        .route(
            "/practices/:practice_id/organizations/recursive",
            get(organizations_of_practice_recursive),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

/// Binds and serves until the process is stopped.
pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = app_router(state);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("HTTP server listening on {bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
