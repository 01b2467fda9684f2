use crate::domain::{Building, Organization, Practice, PracticeMembership};
use crate::error::Result;
use async_trait::async_trait;

/// Narrow query interface over the backing relational store. The service
/// layer only ever reads; the insert and delete methods exist for seeding
/// and for cascade maintenance and are not reachable over HTTP.
///
/// Implementations return list results ordered by ascending id so responses
/// are deterministic.
#[async_trait]
pub trait Storage: Send + Sync {
    // Building operations
    async fn get_all_buildings(&self) -> Result<Vec<Building>>;
    async fn get_building_by_id(&self, building_id: i64) -> Result<Option<Building>>;

    // Organization operations
    async fn get_all_organizations(&self) -> Result<Vec<Organization>>;
    async fn get_organization_by_id(&self, organization_id: i64) -> Result<Option<Organization>>;
    async fn get_organizations_by_building_ids(
        &self,
        building_ids: &[i64],
    ) -> Result<Vec<Organization>>;
    /// Organizations whose membership set intersects `practice_ids`, distinct.
    async fn get_organizations_by_practice_ids(
        &self,
        practice_ids: &[i64],
    ) -> Result<Vec<Organization>>;
    /// Case-insensitive substring match on the organization name.
    async fn search_organizations_by_name(&self, substring: &str) -> Result<Vec<Organization>>;
    /// Row count, used as the seeding idempotency check.
    async fn count_organizations(&self) -> Result<u64>;

    // Practice operations
    async fn get_all_practices(&self) -> Result<Vec<Practice>>;
    async fn get_practices_by_ids(&self, practice_ids: &[i64]) -> Result<Vec<Practice>>;
    /// One-level descendant lookup: practices whose parent is in `parent_ids`.
    async fn get_practices_by_parent_ids(&self, parent_ids: &[i64]) -> Result<Vec<Practice>>;

    // Membership (organization↔practice join table)
    async fn get_memberships_for_organizations(
        &self,
        organization_ids: &[i64],
    ) -> Result<Vec<PracticeMembership>>;
    async fn get_memberships_for_practices(
        &self,
        practice_ids: &[i64],
    ) -> Result<Vec<PracticeMembership>>;

    // Seeding only
    async fn insert_buildings(&self, buildings: &[Building]) -> Result<()>;
    async fn insert_practices(&self, practices: &[Practice]) -> Result<()>;
    async fn insert_organizations(&self, organizations: &[Organization]) -> Result<()>;
    async fn insert_memberships(&self, memberships: &[PracticeMembership]) -> Result<()>;

    // Cascade maintenance (never exposed over HTTP)
    /// Deletes a building together with its organizations and their
    /// membership rows.
    async fn delete_building(&self, building_id: i64) -> Result<()>;
    /// Deletes a practice together with its entire subtree and all
    /// membership rows referencing any deleted node.
    async fn delete_practice(&self, practice_id: i64) -> Result<()>;
}
