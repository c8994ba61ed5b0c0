//! Collection and page tree repository
//!
//! Nodes live in materialized-path tables; a node's subtree is every row whose
//! path starts with the node's path. Permission grants join groups to nodes.

use crate::domain::{path_step, Collection, Page, StringUuid, PATH_STEP_LEN};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn create_collection(
        &self,
        name: &str,
        parent_id: Option<StringUuid>,
    ) -> Result<Collection>;
    async fn create_page(&self, title: &str, parent_id: Option<StringUuid>) -> Result<Page>;
    async fn find_collection(&self, id: StringUuid) -> Result<Option<Collection>>;
    async fn find_page(&self, id: StringUuid) -> Result<Option<Page>>;
    async fn list_collections(&self) -> Result<Vec<Collection>>;
    async fn list_pages(&self) -> Result<Vec<Page>>;
    /// The node plus its whole subtree, by path prefix.
    async fn collection_descendants(&self, id: StringUuid) -> Result<Vec<Collection>>;
    async fn grant_collection_permission(
        &self,
        group_id: StringUuid,
        collection_id: StringUuid,
        permission: &str,
    ) -> Result<()>;
    async fn grant_page_permission(
        &self,
        group_id: StringUuid,
        page_id: StringUuid,
        permission: &str,
    ) -> Result<()>;
    /// Paths of all collections any of the given groups holds a grant on.
    async fn collection_grant_paths(&self, group_ids: &[StringUuid]) -> Result<Vec<String>>;
    /// Paths of all pages any of the given groups holds a grant on.
    async fn page_grant_paths(&self, group_ids: &[StringUuid]) -> Result<Vec<String>>;
}

pub struct CollectionRepositoryImpl {
    pool: MySqlPool,
}

impl CollectionRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Compute the path and depth for a new child of `parent_id` in `table`.
    async fn next_child_path(
        &self,
        tx: &mut sqlx::MySqlConnection,
        table: &str,
        parent_id: Option<StringUuid>,
    ) -> Result<(String, i32)> {
        let (parent_path, parent_depth) = match parent_id {
            Some(pid) => {
                let row: Option<(String, i32)> =
                    sqlx::query_as(&format!("SELECT path, depth FROM {table} WHERE id = ?"))
                        .bind(pid)
                        .fetch_optional(&mut *tx)
                        .await?;
                row.ok_or_else(|| AppError::NotFound(format!("Parent node {} not found", pid)))?
            }
            None => (String::new(), 0),
        };

        // Children occupy exactly one step below the parent.
        let child_pattern = format!("{}{}", parent_path, "_".repeat(PATH_STEP_LEN));
        let (count,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {table} WHERE path LIKE ?"))
                .bind(&child_pattern)
                .fetch_one(&mut *tx)
                .await?;

        let path = format!("{}{}", parent_path, path_step(count as u32 + 1));
        Ok((path, parent_depth + 1))
    }
}

#[async_trait]
impl CollectionRepository for CollectionRepositoryImpl {
    async fn create_collection(
        &self,
        name: &str,
        parent_id: Option<StringUuid>,
    ) -> Result<Collection> {
        let id = StringUuid::new_v4();
        let mut tx = self.pool.begin().await?;
        let (path, depth) = self.next_child_path(&mut tx, "collections", parent_id).await?;

        sqlx::query("INSERT INTO collections (id, name, path, depth) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(&path)
            .bind(depth)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_collection(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create collection")))
    }

    async fn create_page(&self, title: &str, parent_id: Option<StringUuid>) -> Result<Page> {
        let id = StringUuid::new_v4();
        let mut tx = self.pool.begin().await?;
        let (path, depth) = self.next_child_path(&mut tx, "pages", parent_id).await?;

        sqlx::query("INSERT INTO pages (id, title, path, depth) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(title)
            .bind(&path)
            .bind(depth)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_page(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create page")))
    }

    async fn find_collection(&self, id: StringUuid) -> Result<Option<Collection>> {
        let collection = sqlx::query_as::<_, Collection>(
            "SELECT id, name, path, depth FROM collections WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collection)
    }

    async fn find_page(&self, id: StringUuid) -> Result<Option<Page>> {
        let page =
            sqlx::query_as::<_, Page>("SELECT id, title, path, depth FROM pages WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(page)
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(
            "SELECT id, name, path, depth FROM collections ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(collections)
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        let pages =
            sqlx::query_as::<_, Page>("SELECT id, title, path, depth FROM pages ORDER BY path")
                .fetch_all(&self.pool)
                .await?;

        Ok(pages)
    }

    async fn collection_descendants(&self, id: StringUuid) -> Result<Vec<Collection>> {
        let root = self
            .find_collection(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", id)))?;

        let collections = sqlx::query_as::<_, Collection>(
            "SELECT id, name, path, depth FROM collections WHERE path LIKE ? ORDER BY path",
        )
        .bind(format!("{}%", root.path))
        .fetch_all(&self.pool)
        .await?;

        Ok(collections)
    }

    async fn grant_collection_permission(
        &self,
        group_id: StringUuid,
        collection_id: StringUuid,
        permission: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO group_collection_permissions (id, group_id, collection_id, permission)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(group_id)
        .bind(collection_id)
        .bind(permission)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn grant_page_permission(
        &self,
        group_id: StringUuid,
        page_id: StringUuid,
        permission: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO group_page_permissions (id, group_id, page_id, permission)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(StringUuid::new_v4())
        .bind(group_id)
        .bind(page_id)
        .bind(permission)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn collection_grant_paths(&self, group_ids: &[StringUuid]) -> Result<Vec<String>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = sqlx::QueryBuilder::new(
            r#"
            SELECT c.path
            FROM group_collection_permissions p
            JOIN collections c ON c.id = p.collection_id
            WHERE p.group_id IN (
            "#,
        );
        let mut separated = qb.separated(", ");
        for id in group_ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let rows: Vec<(String,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(path,)| path).collect())
    }

    async fn page_grant_paths(&self, group_ids: &[StringUuid]) -> Result<Vec<String>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = sqlx::QueryBuilder::new(
            r#"
            SELECT pg.path
            FROM group_page_permissions p
            JOIN pages pg ON pg.id = p.page_id
            WHERE p.group_id IN (
            "#,
        );
        let mut separated = qb.separated(", ");
        for id in group_ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let rows: Vec<(String,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(path,)| path).collect())
    }
}
