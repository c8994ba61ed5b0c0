//! User reference model
//!
//! Authentication itself lives elsewhere; the tenancy layer only needs user
//! identity, superuser status, and group membership.

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: StringUuid,
    pub email: String,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            email: String::new(),
            is_superuser: false,
            created_at: Utc::now(),
        }
    }
}
