//! Access-control group model
//!
//! Each site owns exactly one group; membership in that group grants access
//! to the site's content in the shared admin. Groups also carry collection
//! and page permission grants, consumed by the visibility filter.

use super::common::StringUuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Group entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: StringUuid,
    pub name: String,
}

/// Build the reserved group name for a site's access-control group.
pub fn site_group_name(normalized_subdomain: &str) -> String {
    format!("site:{}", normalized_subdomain)
}
