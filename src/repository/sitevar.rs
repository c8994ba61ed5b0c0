//! SiteVar repository

use crate::domain::{SiteVar, StringUuid};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteVarRepository: Send + Sync {
    async fn get(&self, site_id: StringUuid, name: &str) -> Result<Option<SiteVar>>;
    /// Insert or replace the value for `(site, name)`.
    async fn set(&self, site_id: StringUuid, name: &str, value: &str) -> Result<SiteVar>;
    async fn list_for_site(&self, site_id: StringUuid) -> Result<Vec<SiteVar>>;
    async fn delete(&self, site_id: StringUuid, name: &str) -> Result<()>;
}

pub struct SiteVarRepositoryImpl {
    pool: MySqlPool,
}

impl SiteVarRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteVarRepository for SiteVarRepositoryImpl {
    async fn get(&self, site_id: StringUuid, name: &str) -> Result<Option<SiteVar>> {
        let var = sqlx::query_as::<_, SiteVar>(
            "SELECT id, site_id, name, value FROM sitevars WHERE site_id = ? AND name = ?",
        )
        .bind(site_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(var)
    }

    async fn set(&self, site_id: StringUuid, name: &str, value: &str) -> Result<SiteVar> {
        let id = StringUuid::new_v4();

        // (site_id, name) is unique; an existing row is replaced in place.
        sqlx::query(
            r#"
            INSERT INTO sitevars (id, site_id, name, value)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE value = VALUES(value)
            "#,
        )
        .bind(id)
        .bind(site_id)
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;

        self.get(site_id, name).await?.ok_or_else(|| {
            crate::error::AppError::Internal(anyhow::anyhow!("Failed to set site variable"))
        })
    }

    async fn list_for_site(&self, site_id: StringUuid) -> Result<Vec<SiteVar>> {
        let vars = sqlx::query_as::<_, SiteVar>(
            "SELECT id, site_id, name, value FROM sitevars WHERE site_id = ? ORDER BY name",
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(vars)
    }

    async fn delete(&self, site_id: StringUuid, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM sitevars WHERE site_id = ? AND name = ?")
            .bind(site_id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
