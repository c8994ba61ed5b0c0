//! Block reason repository

use crate::domain::{BlockReason, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockReasonRepository: Send + Sync {
    /// Names are stored upper-cased.
    async fn create(&self, name: &str, description: &str) -> Result<BlockReason>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<BlockReason>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<BlockReason>>;
    async fn list(&self) -> Result<Vec<BlockReason>>;
}

pub struct BlockReasonRepositoryImpl {
    pool: MySqlPool,
}

impl BlockReasonRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockReasonRepository for BlockReasonRepositoryImpl {
    async fn create(&self, name: &str, description: &str) -> Result<BlockReason> {
        let id = StringUuid::new_v4();
        let name = name.to_uppercase();

        sqlx::query("INSERT INTO block_reasons (id, name, description) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&name)
            .bind(description)
            .execute(&self.pool)
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create block reason")))
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<BlockReason>> {
        let reason = sqlx::query_as::<_, BlockReason>(
            "SELECT id, name, description FROM block_reasons WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reason)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<BlockReason>> {
        let reason = sqlx::query_as::<_, BlockReason>(
            "SELECT id, name, description FROM block_reasons WHERE name = ?",
        )
        .bind(name.to_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(reason)
    }

    async fn list(&self) -> Result<Vec<BlockReason>> {
        let reasons = sqlx::query_as::<_, BlockReason>(
            "SELECT id, name, description FROM block_reasons ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reasons)
    }
}
