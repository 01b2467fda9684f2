use std::sync::Arc;

use async_trait::async_trait;
use libsql::Row;
use tracing::debug;

use crate::db::DatabaseManager;
use crate::domain::{Building, Organization, Practice, PracticeMembership};
use crate::error::{DirectoryError, Result};
use crate::storage::traits::Storage;

/// Storage implementation over Turso/libSQL. Set lookups fetch the table and
/// filter in Rust; the seeded dataset is small and this keeps parameter
/// binding static. Substring search is also done in Rust because SQLite's
/// LIKE is case-insensitive for ASCII only and the dataset is Cyrillic.
pub struct DatabaseStorage {
    db: Arc<DatabaseManager>,
}

fn storage_err(context: &str, e: impl std::fmt::Display) -> DirectoryError {
    DirectoryError::Storage { message: format!("{context}: {e}") }
}

fn row_to_building(row: &Row) -> Result<Building> {
    Ok(Building {
        id: row.get(0).map_err(|e| storage_err("Failed to get building id", e))?,
        address: row.get(1).map_err(|e| storage_err("Failed to get address", e))?,
        coordinates: row.get(2).map_err(|e| storage_err("Failed to get coordinates", e))?,
    })
}

fn row_to_organization(row: &Row) -> Result<Organization> {
    let phone_numbers_json: String = row
        .get(2)
        .map_err(|e| storage_err("Failed to get phone_numbers", e))?;
    let phone_numbers: Vec<String> = serde_json::from_str(&phone_numbers_json)
        .map_err(|e| storage_err("Failed to decode phone_numbers", e))?;

    Ok(Organization {
        id: row.get(0).map_err(|e| storage_err("Failed to get organization id", e))?,
        name: row.get(1).map_err(|e| storage_err("Failed to get name", e))?,
        phone_numbers,
        building_id: row.get(3).map_err(|e| storage_err("Failed to get building_id", e))?,
    })
}

fn row_to_practice(row: &Row) -> Result<Practice> {
    Ok(Practice {
        id: row.get(0).map_err(|e| storage_err("Failed to get practice id", e))?,
        name: row.get(1).map_err(|e| storage_err("Failed to get name", e))?,
        // NULL parent decodes as an error in libsql's typed getter
        parent_id: row.get::<i64>(2).ok(),
    })
}

impl DatabaseStorage {
    pub async fn new() -> Result<Self> {
        let db_manager = DatabaseManager::new().await?;
        db_manager.run_migrations().await?;

        Ok(Self { db: Arc::new(db_manager) })
    }

    async fn query_rows<T>(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        decode: fn(&Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.db.get_connection()?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| storage_err("Query failed", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| storage_err("Failed to read row", e))?
        {
            results.push(decode(&row)?);
        }
        Ok(results)
    }

    async fn all_organizations(&self) -> Result<Vec<Organization>> {
        self.query_rows(
            "SELECT id, name, phone_numbers, building_id FROM organization ORDER BY id",
            libsql::params![],
            row_to_organization,
        )
        .await
    }

    async fn all_practices(&self) -> Result<Vec<Practice>> {
        self.query_rows(
            "SELECT id, name, parent_id FROM practice ORDER BY id",
            libsql::params![],
            row_to_practice,
        )
        .await
    }

    async fn all_memberships(&self) -> Result<Vec<PracticeMembership>> {
        let conn = self.db.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT organization_id, practice_id FROM organization_practice \
                 ORDER BY organization_id, practice_id",
                libsql::params![],
            )
            .await
            .map_err(|e| storage_err("Query failed", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| storage_err("Failed to read row", e))?
        {
            results.push(PracticeMembership {
                organization_id: row
                    .get(0)
                    .map_err(|e| storage_err("Failed to get organization_id", e))?,
                practice_id: row
                    .get(1)
                    .map_err(|e| storage_err("Failed to get practice_id", e))?,
            });
        }
        Ok(results)
    }

    async fn execute(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(sql, params)
            .await
            .map_err(|e| storage_err("Statement failed", e))?;
        Ok(())
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn get_all_buildings(&self) -> Result<Vec<Building>> {
        self.query_rows(
            "SELECT id, address, coordinates FROM building ORDER BY id",
            libsql::params![],
            row_to_building,
        )
        .await
    }

    async fn get_building_by_id(&self, building_id: i64) -> Result<Option<Building>> {
        let mut buildings = self
            .query_rows(
                "SELECT id, address, coordinates FROM building WHERE id = ?",
                libsql::params![building_id],
                row_to_building,
            )
            .await?;
        Ok(buildings.pop())
    }

    async fn get_all_organizations(&self) -> Result<Vec<Organization>> {
        self.all_organizations().await
    }

    async fn get_organization_by_id(&self, organization_id: i64) -> Result<Option<Organization>> {
        let mut organizations = self
            .query_rows(
                "SELECT id, name, phone_numbers, building_id FROM organization WHERE id = ?",
                libsql::params![organization_id],
                row_to_organization,
            )
            .await?;
        Ok(organizations.pop())
    }

    async fn get_organizations_by_building_ids(
        &self,
        building_ids: &[i64],
    ) -> Result<Vec<Organization>> {
        let organizations = self.all_organizations().await?;
        Ok(organizations
            .into_iter()
            .filter(|o| building_ids.contains(&o.building_id))
            .collect())
    }

    async fn get_organizations_by_practice_ids(
        &self,
        practice_ids: &[i64],
    ) -> Result<Vec<Organization>> {
        let memberships = self.all_memberships().await?;
        let organization_ids: std::collections::BTreeSet<i64> = memberships
            .iter()
            .filter(|m| practice_ids.contains(&m.practice_id))
            .map(|m| m.organization_id)
            .collect();

        let organizations = self.all_organizations().await?;
        Ok(organizations
            .into_iter()
            .filter(|o| organization_ids.contains(&o.id))
            .collect())
    }

    async fn search_organizations_by_name(&self, substring: &str) -> Result<Vec<Organization>> {
        let needle = substring.to_lowercase();
        let organizations = self.all_organizations().await?;
        Ok(organizations
            .into_iter()
            .filter(|o| o.name.to_lowercase().contains(&needle))
            .collect())
    }

    async fn count_organizations(&self) -> Result<u64> {
        let conn = self.db.get_connection()?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM organization", libsql::params![])
            .await
            .map_err(|e| storage_err("Count query failed", e))?;

        let row = rows
            .next()
            .await
            .map_err(|e| storage_err("Failed to read count row", e))?
            .ok_or_else(|| DirectoryError::Storage {
                message: "Count query returned no rows".to_string(),
            })?;
        let count: i64 = row.get(0).map_err(|e| storage_err("Failed to get count", e))?;
        Ok(count as u64)
    }

    async fn get_all_practices(&self) -> Result<Vec<Practice>> {
        self.all_practices().await
    }

    async fn get_practices_by_ids(&self, practice_ids: &[i64]) -> Result<Vec<Practice>> {
        let practices = self.all_practices().await?;
        Ok(practices
            .into_iter()
            .filter(|p| practice_ids.contains(&p.id))
            .collect())
    }

    async fn get_practices_by_parent_ids(&self, parent_ids: &[i64]) -> Result<Vec<Practice>> {
        let practices = self.all_practices().await?;
        Ok(practices
            .into_iter()
            .filter(|p| p.parent_id.map_or(false, |pid| parent_ids.contains(&pid)))
            .collect())
    }

    async fn get_memberships_for_organizations(
        &self,
        organization_ids: &[i64],
    ) -> Result<Vec<PracticeMembership>> {
        let memberships = self.all_memberships().await?;
        Ok(memberships
            .into_iter()
            .filter(|m| organization_ids.contains(&m.organization_id))
            .collect())
    }

    async fn get_memberships_for_practices(
        &self,
        practice_ids: &[i64],
    ) -> Result<Vec<PracticeMembership>> {
        let memberships = self.all_memberships().await?;
        Ok(memberships
            .into_iter()
            .filter(|m| practice_ids.contains(&m.practice_id))
            .collect())
    }

    async fn insert_buildings(&self, buildings: &[Building]) -> Result<()> {
        for building in buildings {
            self.execute(
                "INSERT OR REPLACE INTO building (id, address, coordinates) VALUES (?, ?, ?)",
                libsql::params![building.id, building.address.clone(), building.coordinates.clone()],
            )
            .await?;
        }
        debug!("Inserted {} buildings", buildings.len());
        Ok(())
    }

    async fn insert_practices(&self, practices: &[Practice]) -> Result<()> {
        for practice in practices {
            self.execute(
                "INSERT OR REPLACE INTO practice (id, name, parent_id) VALUES (?, ?, ?)",
                libsql::params![practice.id, practice.name.clone(), practice.parent_id],
            )
            .await?;
        }
        debug!("Inserted {} practices", practices.len());
        Ok(())
    }

    async fn insert_organizations(&self, organizations: &[Organization]) -> Result<()> {
        for organization in organizations {
            let phone_numbers = serde_json::to_string(&organization.phone_numbers)?;
            self.execute(
                "INSERT OR REPLACE INTO organization (id, name, phone_numbers, building_id) \
                 VALUES (?, ?, ?, ?)",
                libsql::params![
                    organization.id,
                    organization.name.clone(),
                    phone_numbers,
                    organization.building_id
                ],
            )
            .await?;
        }
        debug!("Inserted {} organizations", organizations.len());
        Ok(())
    }

    async fn insert_memberships(&self, memberships: &[PracticeMembership]) -> Result<()> {
        for membership in memberships {
            self.execute(
                "INSERT OR IGNORE INTO organization_practice (organization_id, practice_id) \
                 VALUES (?, ?)",
                libsql::params![membership.organization_id, membership.practice_id],
            )
            .await?;
        }
        debug!("Inserted {} membership pairs", memberships.len());
        Ok(())
    }

    async fn delete_building(&self, building_id: i64) -> Result<()> {
        // Cascades done explicitly so the result does not depend on the
        // connection's foreign_keys pragma.
        let organizations = self.get_organizations_by_building_ids(&[building_id]).await?;
        for organization in &organizations {
            self.execute(
                "DELETE FROM organization_practice WHERE organization_id = ?",
                libsql::params![organization.id],
            )
            .await?;
            self.execute("DELETE FROM organization WHERE id = ?", libsql::params![organization.id])
                .await?;
        }
        self.execute("DELETE FROM building WHERE id = ?", libsql::params![building_id])
            .await?;
        debug!("Deleted building {} and {} organizations", building_id, organizations.len());
        Ok(())
    }

    async fn delete_practice(&self, practice_id: i64) -> Result<()> {
        // Collect the subtree level by level, then remove nodes and their
        // membership rows.
        let mut subtree = vec![practice_id];
        let mut frontier = vec![practice_id];
        while !frontier.is_empty() {
            let next: Vec<i64> = self
                .get_practices_by_parent_ids(&frontier)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect();
            subtree.extend(&next);
            frontier = next;
        }

        for id in &subtree {
            self.execute(
                "DELETE FROM organization_practice WHERE practice_id = ?",
                libsql::params![*id],
            )
            .await?;
            self.execute("DELETE FROM practice WHERE id = ?", libsql::params![*id])
                .await?;
        }
        debug!("Deleted practice {} with subtree of {} nodes", practice_id, subtree.len());
        Ok(())
    }
}
