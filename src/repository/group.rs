//! Group repository

use crate::domain::{Group, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Group>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Group>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Group>>;
    async fn rename(&self, id: StringUuid, name: &str) -> Result<Group>;
    async fn add_user(&self, group_id: StringUuid, user_id: StringUuid) -> Result<()>;
    async fn remove_user(&self, group_id: StringUuid, user_id: StringUuid) -> Result<()>;
    async fn groups_for_user(&self, user_id: StringUuid) -> Result<Vec<Group>>;
}

pub struct GroupRepositoryImpl {
    pool: MySqlPool,
}

impl GroupRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for GroupRepositoryImpl {
    async fn create(&self, name: &str) -> Result<Group> {
        let id = StringUuid::new_v4();

        sqlx::query("INSERT INTO `groups` (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create group")))
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>("SELECT id, name FROM `groups` WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>("SELECT id, name FROM `groups` WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn rename(&self, id: StringUuid, name: &str) -> Result<Group> {
        let result = sqlx::query("UPDATE `groups` SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Group {} not found", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to rename group")))
    }

    async fn add_user(&self, group_id: StringUuid, user_id: StringUuid) -> Result<()> {
        sqlx::query("INSERT IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_user(&self, group_id: StringUuid, user_id: StringUuid) -> Result<()> {
        sqlx::query("DELETE FROM user_groups WHERE user_id = ? AND group_id = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn groups_for_user(&self, user_id: StringUuid) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name
            FROM `groups` g
            JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }
}
