//! Domain repository
//!
//! Owns the primary/canonical flag invariants: at most one domain per site
//! carries each flag. The clear-then-set sequence runs inside one transaction;
//! the generated-column unique indexes in the schema are the backstop if two
//! writers race past the application-level clear.

use crate::domain::{Domain, StringUuid};
use crate::error::{AppError, Result};
use crate::hostname::{normalize_domain, split_host_port};
use async_trait::async_trait;
use sqlx::MySqlPool;

const DOMAIN_COLUMNS: &str =
    "id, site_id, display_domain, normalized_domain, is_primary, is_canonical";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Insert or update a domain, recomputing the normalized form and
    /// enforcing flag exclusivity for the owning site.
    async fn save(&self, domain: &Domain) -> Result<Domain>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Domain>>;
    /// Exact-match lookup for a request host (port stripped, normalized).
    /// Domains of archived or blocked sites never match. A miss is `Ok(None)`,
    /// not an error.
    async fn find_for_host(&self, host: &str) -> Result<Option<Domain>>;
    async fn list_for_site(&self, site_id: StringUuid) -> Result<Vec<Domain>>;
    async fn primary_for_site(&self, site_id: StringUuid) -> Result<Option<Domain>>;
    async fn canonical_for_site(&self, site_id: StringUuid) -> Result<Option<Domain>>;
    async fn delete(&self, id: StringUuid) -> Result<()>;
}

pub struct DomainRepositoryImpl {
    pool: MySqlPool,
}

impl DomainRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainRepository for DomainRepositoryImpl {
    async fn save(&self, domain: &Domain) -> Result<Domain> {
        // The stored normalized form is always recomputed from the display
        // form, never trusted from the caller.
        let normalized = normalize_domain(&domain.display_domain)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        if domain.is_primary {
            sqlx::query("UPDATE domains SET is_primary = FALSE WHERE site_id = ? AND id <> ?")
                .bind(domain.site_id)
                .bind(domain.id)
                .execute(&mut *tx)
                .await?;
        }
        if domain.is_canonical {
            sqlx::query("UPDATE domains SET is_canonical = FALSE WHERE site_id = ? AND id <> ?")
                .bind(domain.site_id)
                .bind(domain.id)
                .execute(&mut *tx)
                .await?;
        }

        let exists: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM domains WHERE id = ?")
            .bind(domain.id)
            .fetch_one(&mut *tx)
            .await?;

        if exists.0 > 0 {
            sqlx::query(
                r#"
                UPDATE domains
                SET site_id = ?, display_domain = ?, normalized_domain = ?,
                    is_primary = ?, is_canonical = ?
                WHERE id = ?
                "#,
            )
            .bind(domain.site_id)
            .bind(&domain.display_domain)
            .bind(&normalized)
            .bind(domain.is_primary)
            .bind(domain.is_canonical)
            .bind(domain.id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO domains (id, site_id, display_domain, normalized_domain, is_primary, is_canonical)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(domain.id)
            .bind(domain.site_id)
            .bind(&domain.display_domain)
            .bind(&normalized)
            .bind(domain.is_primary)
            .bind(domain.is_canonical)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_by_id(domain.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to save domain")))
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Domain>> {
        let domain = sqlx::query_as::<_, Domain>(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM domains WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(domain)
    }

    async fn find_for_host(&self, host: &str) -> Result<Option<Domain>> {
        let (host, _port) = split_host_port(host);
        let normalized = match normalize_domain(host) {
            Ok(n) => n,
            // A host we cannot normalize cannot match any stored domain.
            Err(_) => return Ok(None),
        };

        let domain = sqlx::query_as::<_, Domain>(
            r#"
            SELECT d.id, d.site_id, d.display_domain, d.normalized_domain,
                   d.is_primary, d.is_canonical
            FROM domains d
            JOIN sites s ON s.id = d.site_id
            WHERE d.normalized_domain = ?
              AND s.archive_date IS NULL
              AND s.block_reason_id IS NULL
            "#,
        )
        .bind(&normalized)
        .fetch_optional(&self.pool)
        .await?;

        Ok(domain)
    }

    async fn list_for_site(&self, site_id: StringUuid) -> Result<Vec<Domain>> {
        let domains = sqlx::query_as::<_, Domain>(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM domains WHERE site_id = ? ORDER BY normalized_domain"
        ))
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(domains)
    }

    async fn primary_for_site(&self, site_id: StringUuid) -> Result<Option<Domain>> {
        let domain = sqlx::query_as::<_, Domain>(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM domains WHERE site_id = ? AND is_primary = TRUE"
        ))
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(domain)
    }

    async fn canonical_for_site(&self, site_id: StringUuid) -> Result<Option<Domain>> {
        let domain = sqlx::query_as::<_, Domain>(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM domains WHERE site_id = ? AND is_canonical = TRUE"
        ))
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(domain)
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Domain {} not found", id)));
        }

        Ok(())
    }
}
