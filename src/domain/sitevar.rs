//! Per-site key/value configuration

use super::common::StringUuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One configuration override for one site. `(site_id, name)` is unique.
/// Lookups fall back to a process-wide default when no row exists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteVar {
    pub id: StringUuid,
    pub site_id: StringUuid,
    pub name: String,
    pub value: String,
}
