//! Tenant visibility filtering for shared-admin content
//!
//! One tenant's administrators must not see another tenant's collections or
//! pages. Permission grants attach to a node and cover its whole subtree;
//! a user sees the union of every subtree any of their groups holds a grant
//! on, intersected with whatever set the caller is listing. Superusers bypass
//! the filter entirely.

use crate::domain::{is_descendant_path, Collection, Page, StringUuid, User};
use crate::error::Result;
use crate::repository::{CollectionRepository, GroupRepository};
use std::sync::Arc;

pub struct VisibilityService<GR: GroupRepository, CR: CollectionRepository> {
    group_repo: Arc<GR>,
    collection_repo: Arc<CR>,
}

impl<GR: GroupRepository, CR: CollectionRepository> VisibilityService<GR, CR> {
    pub fn new(group_repo: Arc<GR>, collection_repo: Arc<CR>) -> Self {
        Self {
            group_repo,
            collection_repo,
        }
    }

    /// Restrict `collections` to those the user's groups hold a grant on.
    /// No groups or no grants means nothing is visible, never everything.
    pub async fn filter_collections(
        &self,
        collections: Vec<Collection>,
        user: &User,
    ) -> Result<Vec<Collection>> {
        if user.is_superuser {
            return Ok(collections);
        }

        let grant_paths = self.collection_grants(user.id).await?;
        Ok(retain_permitted(collections, &grant_paths, |c| &c.path))
    }

    /// Page-tree counterpart of `filter_collections`.
    pub async fn filter_pages(&self, pages: Vec<Page>, user: &User) -> Result<Vec<Page>> {
        if user.is_superuser {
            return Ok(pages);
        }

        let group_ids = self.group_ids(user.id).await?;
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let grant_paths = self.collection_repo.page_grant_paths(&group_ids).await?;
        Ok(retain_permitted(pages, &grant_paths, |p| &p.path))
    }

    async fn group_ids(&self, user_id: StringUuid) -> Result<Vec<StringUuid>> {
        let groups = self.group_repo.groups_for_user(user_id).await?;
        Ok(groups.into_iter().map(|g| g.id).collect())
    }

    async fn collection_grants(&self, user_id: StringUuid) -> Result<Vec<String>> {
        let group_ids = self.group_ids(user_id).await?;
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.collection_repo.collection_grant_paths(&group_ids).await
    }
}

/// Keep the nodes inside any granted subtree (inclusive).
fn retain_permitted<T>(
    nodes: Vec<T>,
    grant_paths: &[String],
    path_of: impl Fn(&T) -> &str,
) -> Vec<T> {
    match grant_paths {
        [] => Vec::new(),
        // Single grant: no union needed, one prefix check. Produces the same
        // result as the general case for n=1.
        [only] => nodes
            .into_iter()
            .filter(|n| is_descendant_path(path_of(n), only))
            .collect(),
        many => nodes
            .into_iter()
            .filter(|n| many.iter().any(|g| is_descendant_path(path_of(n), g)))
            .collect(),
    }
}
