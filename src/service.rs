use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::closure::recursive_practice_ids;
use crate::domain::{practice_level, Organization};
use crate::error::{DirectoryError, Result};
use crate::geo::{buildings_in_area, Area};
use crate::schemas::{
    BuildingSchema, OrganizationFullSchema, OrganizationRef, OrganizationSchema, PracticeRef,
    PracticeSchema,
};
use crate::storage::Storage;

/// Read-only query façade over the storage collaborator. One request maps to
/// one sequential pipeline: fetch, filter in memory, project. Inputs are
/// assumed validated by the HTTP layer (positive ids, non-empty search,
/// exactly one area shape).
#[derive(Clone)]
pub struct DirectoryService {
    storage: Arc<dyn Storage>,
}

impl DirectoryService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn list_buildings(&self) -> Result<Vec<BuildingSchema>> {
        let buildings = self.storage.get_all_buildings().await?;
        Ok(buildings.iter().map(BuildingSchema::from).collect())
    }

    pub async fn list_practices(&self) -> Result<Vec<PracticeSchema>> {
        let practices = self.storage.get_all_practices().await?;
        let practice_ids: Vec<i64> = practices.iter().map(|p| p.id).collect();

        let memberships = self.storage.get_memberships_for_practices(&practice_ids).await?;
        let organizations = self.storage.get_all_organizations().await?;
        let organizations_by_id: HashMap<i64, &Organization> =
            organizations.iter().map(|o| (o.id, o)).collect();

        let practices_by_id: HashMap<i64, _> =
            practices.iter().map(|p| (p.id, p.clone())).collect();

        Ok(practices
            .iter()
            .map(|practice| {
                let mut members: Vec<OrganizationRef> = memberships
                    .iter()
                    .filter(|m| m.practice_id == practice.id)
                    .filter_map(|m| organizations_by_id.get(&m.organization_id))
                    .map(|o| OrganizationRef::from(*o))
                    .collect();
                members.sort_by_key(|o| o.id);

                PracticeSchema {
                    id: practice.id,
                    name: practice.name.clone(),
                    parent_id: practice.parent_id,
                    level: practice_level(&practices_by_id, practice.id),
                    organizations: members,
                }
            })
            .collect())
    }

    pub async fn list_organizations(&self) -> Result<Vec<OrganizationSchema>> {
        let organizations = self.storage.get_all_organizations().await?;
        self.with_practices(organizations).await
    }

    pub async fn organizations_in_building(
        &self,
        building_id: i64,
    ) -> Result<Vec<OrganizationSchema>> {
        let organizations = self
            .storage
            .get_organizations_by_building_ids(&[building_id])
            .await?;
        self.with_practices(organizations).await
    }

    pub async fn organizations_of_practice(
        &self,
        practice_id: i64,
    ) -> Result<Vec<OrganizationSchema>> {
        let organizations = self
            .storage
            .get_organizations_by_practice_ids(&[practice_id])
            .await?;
        self.with_practices(organizations).await
    }

    pub async fn organizations_of_practice_recursive(
        &self,
        practice_id: i64,
    ) -> Result<Vec<OrganizationSchema>> {
        let matching_ids = recursive_practice_ids(self.storage.as_ref(), practice_id).await?;
        debug!(practice_id, matches = matching_ids.len(), "resolved practice closure");
        let organizations = self
            .storage
            .get_organizations_by_practice_ids(&matching_ids)
            .await?;
        self.with_practices(organizations).await
    }

    pub async fn buildings_in_area(&self, area: &Area) -> Result<Vec<BuildingSchema>> {
        let buildings = self.storage.get_all_buildings().await?;
        let matched = buildings_in_area(buildings, area)?;
        Ok(matched.iter().map(BuildingSchema::from).collect())
    }

    pub async fn organizations_in_area(&self, area: &Area) -> Result<Vec<OrganizationSchema>> {
        let buildings = self.storage.get_all_buildings().await?;
        let matched = buildings_in_area(buildings, area)?;
        let building_ids: Vec<i64> = matched.iter().map(|b| b.id).collect();

        let organizations = self
            .storage
            .get_organizations_by_building_ids(&building_ids)
            .await?;
        self.with_practices(organizations).await
    }

    /// `Ok(None)` means the id is absent; the HTTP layer turns that into 404.
    pub async fn get_organization(
        &self,
        organization_id: i64,
    ) -> Result<Option<OrganizationFullSchema>> {
        let Some(organization) = self.storage.get_organization_by_id(organization_id).await? else {
            return Ok(None);
        };

        // A missing building would violate the FK invariant, so it is a
        // storage-integrity failure rather than a not-found.
        let building = self
            .storage
            .get_building_by_id(organization.building_id)
            .await?
            .ok_or_else(|| DirectoryError::Storage {
                message: format!(
                    "building {} referenced by organization {} does not exist",
                    organization.building_id, organization.id
                ),
            })?;

        let memberships = self
            .storage
            .get_memberships_for_organizations(&[organization.id])
            .await?;
        let practice_ids: Vec<i64> = memberships.iter().map(|m| m.practice_id).collect();
        let practices = self.storage.get_practices_by_ids(&practice_ids).await?;

        Ok(Some(OrganizationFullSchema {
            id: organization.id,
            name: organization.name.clone(),
            phone_numbers: organization.phone_numbers.clone(),
            building: BuildingSchema::from(&building),
            practices: practices.iter().map(PracticeRef::from).collect(),
        }))
    }

    pub async fn search_organizations_by_name(
        &self,
        substring: &str,
    ) -> Result<Vec<OrganizationSchema>> {
        let organizations = self.storage.search_organizations_by_name(substring).await?;
        self.with_practices(organizations).await
    }

    /// Attaches practice refs to a batch of organizations in two fetches
    /// (membership rows, then the referenced practices).
    async fn with_practices(
        &self,
        organizations: Vec<Organization>,
    ) -> Result<Vec<OrganizationSchema>> {
        let organization_ids: Vec<i64> = organizations.iter().map(|o| o.id).collect();
        let memberships = self
            .storage
            .get_memberships_for_organizations(&organization_ids)
            .await?;

        let mut practice_ids: Vec<i64> = memberships.iter().map(|m| m.practice_id).collect();
        practice_ids.sort_unstable();
        practice_ids.dedup();
        let practices = self.storage.get_practices_by_ids(&practice_ids).await?;
        let practices_by_id: HashMap<i64, _> = practices.iter().map(|p| (p.id, p)).collect();

        Ok(organizations
            .into_iter()
            .map(|organization| {
                let mut refs: Vec<PracticeRef> = memberships
                    .iter()
                    .filter(|m| m.organization_id == organization.id)
                    .filter_map(|m| practices_by_id.get(&m.practice_id))
                    .map(|p| PracticeRef::from(*p))
                    .collect();
                refs.sort_by_key(|p| p.id);

                OrganizationSchema {
                    id: organization.id,
                    name: organization.name,
                    phone_numbers: organization.phone_numbers,
                    building_id: organization.building_id,
                    practices: refs,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Building, Practice, PracticeMembership};
    use crate::geo::CircleArea;
    use crate::storage::InMemoryStorage;

    async fn service_with_one_building() -> DirectoryService {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .insert_buildings(&[Building {
                id: 1,
                address: "somewhere".to_string(),
                coordinates: "55.769372,37.624849".to_string(),
            }])
            .await
            .unwrap();
        storage
            .insert_practices(&[Practice { id: 1, name: "Еда".to_string(), parent_id: None }])
            .await
            .unwrap();
        storage
            .insert_organizations(&[Organization {
                id: 1,
                name: "Org".to_string(),
                phone_numbers: vec![],
                building_id: 1,
            }])
            .await
            .unwrap();
        storage
            .insert_memberships(&[PracticeMembership { organization_id: 1, practice_id: 1 }])
            .await
            .unwrap();
        DirectoryService::new(storage)
    }

    #[tokio::test]
    async fn absent_organization_is_none_not_an_error() {
        let service = service_with_one_building().await;
        assert!(service.get_organization(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn organizations_in_area_is_empty_when_no_building_matches() {
        let service = service_with_one_building().await;
        let far_away = Area::Circle(CircleArea { lat: 0.0, lon: 0.0, radius: 10.0 });
        assert!(service.organizations_in_area(&far_away).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_view_embeds_building_and_practices() {
        let service = service_with_one_building().await;
        let full = service.get_organization(1).await.unwrap().unwrap();
        assert_eq!(full.building.id, 1);
        assert_eq!(full.practices.len(), 1);
        assert_eq!(full.practices[0].name, "Еда");
    }
}
