use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Building, Organization, Practice, PracticeMembership};
use crate::error::Result;
use crate::storage::traits::Storage;

/// In-memory storage implementation for development and testing. The
/// membership pair set is the single source of truth for the
/// organization↔practice relation; entity maps never embed each other.
pub struct InMemoryStorage {
    buildings: Arc<Mutex<HashMap<i64, Building>>>,
    organizations: Arc<Mutex<HashMap<i64, Organization>>>,
    practices: Arc<Mutex<HashMap<i64, Practice>>>,
    memberships: Arc<Mutex<BTreeSet<PracticeMembership>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            buildings: Arc::new(Mutex::new(HashMap::new())),
            organizations: Arc::new(Mutex::new(HashMap::new())),
            practices: Arc::new(Mutex::new(HashMap::new())),
            memberships: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by_id<T>(mut items: Vec<T>, id_of: impl Fn(&T) -> i64) -> Vec<T> {
    items.sort_by_key(id_of);
    items
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get_all_buildings(&self) -> Result<Vec<Building>> {
        let buildings = self.buildings.lock().unwrap();
        Ok(sorted_by_id(buildings.values().cloned().collect(), |b| b.id))
    }

    async fn get_building_by_id(&self, building_id: i64) -> Result<Option<Building>> {
        let buildings = self.buildings.lock().unwrap();
        Ok(buildings.get(&building_id).cloned())
    }

    async fn get_all_organizations(&self) -> Result<Vec<Organization>> {
        let organizations = self.organizations.lock().unwrap();
        Ok(sorted_by_id(organizations.values().cloned().collect(), |o| o.id))
    }

    async fn get_organization_by_id(&self, organization_id: i64) -> Result<Option<Organization>> {
        let organizations = self.organizations.lock().unwrap();
        Ok(organizations.get(&organization_id).cloned())
    }

    async fn get_organizations_by_building_ids(
        &self,
        building_ids: &[i64],
    ) -> Result<Vec<Organization>> {
        let organizations = self.organizations.lock().unwrap();
        let matched = organizations
            .values()
            .filter(|o| building_ids.contains(&o.building_id))
            .cloned()
            .collect();
        Ok(sorted_by_id(matched, |o| o.id))
    }

    async fn get_organizations_by_practice_ids(
        &self,
        practice_ids: &[i64],
    ) -> Result<Vec<Organization>> {
        // Distinct by construction: the id set is collected first.
        let organization_ids: BTreeSet<i64> = {
            let memberships = self.memberships.lock().unwrap();
            memberships
                .iter()
                .filter(|m| practice_ids.contains(&m.practice_id))
                .map(|m| m.organization_id)
                .collect()
        };

        let organizations = self.organizations.lock().unwrap();
        let matched = organization_ids
            .iter()
            .filter_map(|id| organizations.get(id).cloned())
            .collect();
        Ok(sorted_by_id(matched, |o: &Organization| o.id))
    }

    async fn search_organizations_by_name(&self, substring: &str) -> Result<Vec<Organization>> {
        let needle = substring.to_lowercase();
        let organizations = self.organizations.lock().unwrap();
        let matched = organizations
            .values()
            .filter(|o| o.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(sorted_by_id(matched, |o: &Organization| o.id))
    }

    async fn count_organizations(&self) -> Result<u64> {
        let organizations = self.organizations.lock().unwrap();
        Ok(organizations.len() as u64)
    }

    async fn get_all_practices(&self) -> Result<Vec<Practice>> {
        let practices = self.practices.lock().unwrap();
        Ok(sorted_by_id(practices.values().cloned().collect(), |p| p.id))
    }

    async fn get_practices_by_ids(&self, practice_ids: &[i64]) -> Result<Vec<Practice>> {
        let practices = self.practices.lock().unwrap();
        let matched = practice_ids
            .iter()
            .filter_map(|id| practices.get(id).cloned())
            .collect();
        Ok(sorted_by_id(matched, |p: &Practice| p.id))
    }

    async fn get_practices_by_parent_ids(&self, parent_ids: &[i64]) -> Result<Vec<Practice>> {
        let practices = self.practices.lock().unwrap();
        let matched = practices
            .values()
            .filter(|p| p.parent_id.map_or(false, |pid| parent_ids.contains(&pid)))
            .cloned()
            .collect();
        Ok(sorted_by_id(matched, |p: &Practice| p.id))
    }

    async fn get_memberships_for_organizations(
        &self,
        organization_ids: &[i64],
    ) -> Result<Vec<PracticeMembership>> {
        let memberships = self.memberships.lock().unwrap();
        Ok(memberships
            .iter()
            .filter(|m| organization_ids.contains(&m.organization_id))
            .copied()
            .collect())
    }

    async fn get_memberships_for_practices(
        &self,
        practice_ids: &[i64],
    ) -> Result<Vec<PracticeMembership>> {
        let memberships = self.memberships.lock().unwrap();
        Ok(memberships
            .iter()
            .filter(|m| practice_ids.contains(&m.practice_id))
            .copied()
            .collect())
    }

    async fn insert_buildings(&self, to_insert: &[Building]) -> Result<()> {
        let mut buildings = self.buildings.lock().unwrap();
        for building in to_insert {
            buildings.insert(building.id, building.clone());
        }
        debug!("Inserted {} buildings", to_insert.len());
        Ok(())
    }

    async fn insert_practices(&self, to_insert: &[Practice]) -> Result<()> {
        let mut practices = self.practices.lock().unwrap();
        for practice in to_insert {
            practices.insert(practice.id, practice.clone());
        }
        debug!("Inserted {} practices", to_insert.len());
        Ok(())
    }

    async fn insert_organizations(&self, to_insert: &[Organization]) -> Result<()> {
        let mut organizations = self.organizations.lock().unwrap();
        for organization in to_insert {
            organizations.insert(organization.id, organization.clone());
        }
        debug!("Inserted {} organizations", to_insert.len());
        Ok(())
    }

    async fn insert_memberships(&self, to_insert: &[PracticeMembership]) -> Result<()> {
        let mut memberships = self.memberships.lock().unwrap();
        for membership in to_insert {
            // BTreeSet gives the composite-key semantics: re-inserting an
            // existing pair is a no-op.
            memberships.insert(*membership);
        }
        debug!("Inserted {} membership pairs", to_insert.len());
        Ok(())
    }

    async fn delete_building(&self, building_id: i64) -> Result<()> {
        let removed_organization_ids: Vec<i64> = {
            let mut organizations = self.organizations.lock().unwrap();
            let ids: Vec<i64> = organizations
                .values()
                .filter(|o| o.building_id == building_id)
                .map(|o| o.id)
                .collect();
            for id in &ids {
                organizations.remove(id);
            }
            ids
        };

        {
            let mut memberships = self.memberships.lock().unwrap();
            memberships.retain(|m| !removed_organization_ids.contains(&m.organization_id));
        }

        let mut buildings = self.buildings.lock().unwrap();
        buildings.remove(&building_id);
        debug!(
            "Deleted building {} and {} organizations",
            building_id,
            removed_organization_ids.len()
        );
        Ok(())
    }

    async fn delete_practice(&self, practice_id: i64) -> Result<()> {
        // Collect the whole subtree level by level, then remove it together
        // with every membership row that referenced a removed node.
        let subtree: Vec<i64> = {
            let practices = self.practices.lock().unwrap();
            let mut subtree = vec![practice_id];
            let mut frontier = vec![practice_id];
            while !frontier.is_empty() {
                let next: Vec<i64> = practices
                    .values()
                    .filter(|p| p.parent_id.map_or(false, |pid| frontier.contains(&pid)))
                    .map(|p| p.id)
                    .collect();
                subtree.extend(&next);
                frontier = next;
            }
            subtree
        };

        {
            let mut practices = self.practices.lock().unwrap();
            for id in &subtree {
                practices.remove(id);
            }
        }

        let mut memberships = self.memberships.lock().unwrap();
        memberships.retain(|m| !subtree.contains(&m.practice_id));
        debug!("Deleted practice {} with subtree of {} nodes", practice_id, subtree.len());
        Ok(())
    }
}
