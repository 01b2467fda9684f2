//! Response-ready projections of the domain entities. Shapes follow the
//! public API: short refs break the organization↔practice recursion, and
//! the full organization view embeds its building record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSchema {
    pub id: i64,
    pub address: String,
    pub coordinates: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSchema {
    pub id: i64,
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub building_id: i64,
    pub practices: Vec<PracticeRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationFullSchema {
    pub id: i64,
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub building: BuildingSchema,
    pub practices: Vec<PracticeRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeSchema {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    /// Distance to the root of the practice tree; derived, not stored.
    pub level: u32,
    pub organizations: Vec<OrganizationRef>,
}

impl From<&crate::domain::Building> for BuildingSchema {
    fn from(building: &crate::domain::Building) -> Self {
        Self {
            id: building.id,
            address: building.address.clone(),
            coordinates: building.coordinates.clone(),
        }
    }
}

impl From<&crate::domain::Practice> for PracticeRef {
    fn from(practice: &crate::domain::Practice) -> Self {
        Self { id: practice.id, name: practice.name.clone() }
    }
}

impl From<&crate::domain::Organization> for OrganizationRef {
    fn from(organization: &crate::domain::Organization) -> Self {
        Self { id: organization.id, name: organization.name.clone() }
    }
}
