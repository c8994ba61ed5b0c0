//! Site repository
//!
//! Provisioning writes compose Site + Group + Domain + membership rows in one
//! transaction: a failure partway (typically a duplicate subdomain) rolls the
//! whole tenant back.

use crate::domain::{ProvisionSiteRecord, Site, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::MySqlPool;

const SITE_COLUMNS: &str = "id, owner_id, group_id, name, subdomain, normalized_subdomain, \
     theme, create_date, modified_date, archive_date, archived_canonical_name, block_reason_id";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// Create a site with its group, canonical+primary domain, and owner
    /// membership, atomically.
    async fn create_provisioned(&self, record: &ProvisionSiteRecord) -> Result<Site>;
    /// Rewrite a site's name/subdomain, its group name, and its canonical
    /// domain, atomically.
    async fn update_provisioned(&self, id: StringUuid, record: &ProvisionSiteRecord)
        -> Result<Site>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Site>>;
    async fn find_by_normalized_subdomain(&self, normalized: &str) -> Result<Option<Site>>;
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Site>>;
    async fn count(&self) -> Result<i64>;
    /// Sites the user can access through group membership.
    async fn list_for_user(&self, user_id: StringUuid) -> Result<Vec<Site>>;
    /// Ids-only variant of `list_for_user`, for query filtering.
    async fn ids_for_user(&self, user_id: StringUuid) -> Result<Vec<StringUuid>>;
    /// Soft delete: stamp the archive date and record the canonical name.
    async fn archive(&self, id: StringUuid, canonical_name: &str) -> Result<Site>;
    async fn block(&self, id: StringUuid, block_reason_id: StringUuid) -> Result<Site>;
    async fn unblock(&self, id: StringUuid) -> Result<Site>;
}

pub struct SiteRepositoryImpl {
    pool: MySqlPool,
}

impl SiteRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn require(&self, id: StringUuid) -> Result<Site> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Site {} not found", id)))
    }
}

#[async_trait]
impl SiteRepository for SiteRepositoryImpl {
    async fn create_provisioned(&self, record: &ProvisionSiteRecord) -> Result<Site> {
        let site_id = StringUuid::new_v4();
        let group_id = StringUuid::new_v4();
        let domain_id = StringUuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO `groups` (id, name) VALUES (?, ?)")
            .bind(group_id)
            .bind(&record.group_name)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO sites
                (id, owner_id, group_id, name, subdomain, normalized_subdomain,
                 theme, create_date, modified_date)
            VALUES (?, ?, ?, ?, ?, ?, 'cleanblog', ?, ?)
            "#,
        )
        .bind(site_id)
        .bind(record.owner_id)
        .bind(group_id)
        .bind(&record.name)
        .bind(&record.subdomain)
        .bind(&record.normalized_subdomain)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // A freshly provisioned site's canonical domain is also its primary.
        sqlx::query(
            r#"
            INSERT INTO domains
                (id, site_id, display_domain, normalized_domain, is_primary, is_canonical)
            VALUES (?, ?, ?, ?, TRUE, TRUE)
            "#,
        )
        .bind(domain_id)
        .bind(site_id)
        .bind(&record.display_domain)
        .bind(&record.normalized_domain)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES (?, ?)")
            .bind(record.owner_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.require(site_id).await
    }

    async fn update_provisioned(
        &self,
        id: StringUuid,
        record: &ProvisionSiteRecord,
    ) -> Result<Site> {
        let site = self.require(id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE sites
            SET name = ?, subdomain = ?, normalized_subdomain = ?, modified_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.name)
        .bind(&record.subdomain)
        .bind(&record.normalized_subdomain)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE `groups` SET name = ? WHERE id = ?")
            .bind(&record.group_name)
            .bind(site.group_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE domains
            SET display_domain = ?, normalized_domain = ?
            WHERE site_id = ? AND is_canonical = TRUE
            "#,
        )
        .bind(&record.display_domain)
        .bind(&record.normalized_domain)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.require(id).await
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    async fn find_by_normalized_subdomain(&self, normalized: &str) -> Result<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE normalized_subdomain = ?"
        ))
        .bind(normalized)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites ORDER BY subdomain LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(sites)
    }

    async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sites")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn list_for_user(&self, user_id: StringUuid) -> Result<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>(&format!(
            r#"
            SELECT {SITE_COLUMNS} FROM sites
            WHERE group_id IN (SELECT group_id FROM user_groups WHERE user_id = ?)
            ORDER BY subdomain
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sites)
    }

    async fn ids_for_user(&self, user_id: StringUuid) -> Result<Vec<StringUuid>> {
        let rows: Vec<(StringUuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM sites
            WHERE group_id IN (SELECT group_id FROM user_groups WHERE user_id = ?)
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn archive(&self, id: StringUuid, canonical_name: &str) -> Result<Site> {
        let result = sqlx::query(
            r#"
            UPDATE sites
            SET archive_date = ?, archived_canonical_name = ?, modified_date = ?
            WHERE id = ? AND archive_date IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(canonical_name)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Site {} not found or already archived",
                id
            )));
        }

        self.require(id).await
    }

    async fn block(&self, id: StringUuid, block_reason_id: StringUuid) -> Result<Site> {
        sqlx::query("UPDATE sites SET block_reason_id = ?, modified_date = ? WHERE id = ?")
            .bind(block_reason_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.require(id).await
    }

    async fn unblock(&self, id: StringUuid) -> Result<Site> {
        sqlx::query("UPDATE sites SET block_reason_id = NULL, modified_date = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.require(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_mock_site_repository() {
        let mut mock = MockSiteRepository::new();

        let site = Site::default();
        let site_clone = site.clone();

        mock.expect_find_by_id()
            .with(eq(site.id))
            .returning(move |_| Ok(Some(site_clone.clone())));

        let result = mock.find_by_id(site.id).await.unwrap();
        assert!(result.is_some());
    }
}
