//! Hierarchical content containers and their permission grants
//!
//! Collections (for images/documents) and pages both form trees stored with a
//! materialized path: each node's `path` is its parent's path plus one
//! fixed-width step, so "node plus all descendants" is a single prefix match.
//! A permission grant attached to a node applies to the node and its entire
//! subtree.

use super::common::StringUuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Width of one materialized-path step.
pub const PATH_STEP_LEN: usize = 4;

/// Collection node (images, documents)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Collection {
    pub id: StringUuid,
    pub name: String,
    /// Materialized path; see module docs.
    pub path: String,
    pub depth: i32,
}

/// Page tree node
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: StringUuid,
    pub title: String,
    pub path: String,
    pub depth: i32,
}

/// Grant of a permission to a group on a collection subtree
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupCollectionPermission {
    pub id: StringUuid,
    pub group_id: StringUuid,
    pub collection_id: StringUuid,
    /// Permission codename, e.g. "view", "add", "change".
    pub permission: String,
}

/// Grant of a permission to a group on a page subtree
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupPagePermission {
    pub id: StringUuid,
    pub group_id: StringUuid,
    pub page_id: StringUuid,
    pub permission: String,
}

/// Encode a 1-based step number as one fixed-width path step.
pub fn path_step(ordinal: u32) -> String {
    format!("{:0width$x}", ordinal, width = PATH_STEP_LEN)
}

/// True when `candidate` is `ancestor` itself or inside its subtree.
pub fn is_descendant_path(candidate: &str, ancestor: &str) -> bool {
    candidate.starts_with(ancestor) && candidate.len() % PATH_STEP_LEN == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_step_width() {
        assert_eq!(path_step(1), "0001");
        assert_eq!(path_step(255), "00ff");
        assert_eq!(path_step(1).len(), PATH_STEP_LEN);
    }

    #[test]
    fn test_is_descendant_path_inclusive() {
        // A node is a descendant of itself
        assert!(is_descendant_path("00010002", "00010002"));
        assert!(is_descendant_path("000100020003", "00010002"));
        assert!(!is_descendant_path("00010003", "00010002"));
    }
}
