//! Site and Domain models
//!
//! A Site is one published property (blog/brand) sharing the platform's
//! database but isolated by domain and group permissions. A Domain is one
//! hostname resolving to a Site; a Site may hold several, with at most one
//! primary (canonically served from) and one canonical (identity/display).

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Default theme for newly provisioned sites.
pub const DEFAULT_THEME: &str = "cleanblog";

/// Site (tenant) entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: StringUuid,
    /// Owning user. Access is granted through the group, not ownership.
    pub owner_id: StringUuid,
    /// The site's exclusive access-control group (1:1).
    pub group_id: StringUuid,
    pub name: String,
    /// Subdomain as typed by the user.
    pub subdomain: String,
    /// Punycode/lowercase form, unique across sites.
    pub normalized_subdomain: String,
    pub theme: String,
    pub create_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    /// Soft-delete marker. An archived site is never resolvable.
    pub archive_date: Option<DateTime<Utc>>,
    /// Canonical domain name recorded at archive time.
    pub archived_canonical_name: Option<String>,
    /// A blocked site is never resolvable.
    pub block_reason_id: Option<StringUuid>,
}

impl Site {
    pub fn is_archived(&self) -> bool {
        self.archive_date.is_some()
    }

    pub fn is_blocked(&self) -> bool {
        self.block_reason_id.is_some()
    }
}

impl Default for Site {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            owner_id: StringUuid::nil(),
            group_id: StringUuid::nil(),
            name: String::new(),
            subdomain: String::new(),
            normalized_subdomain: String::new(),
            theme: DEFAULT_THEME.to_string(),
            create_date: now,
            modified_date: now,
            archive_date: None,
            archived_canonical_name: None,
            block_reason_id: None,
        }
    }
}

/// Domain entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Domain {
    pub id: StringUuid,
    pub site_id: StringUuid,
    /// Domain as typed/configured.
    pub display_domain: String,
    /// Lowercase punycode form used for lookup, unique across all domains.
    /// Recomputed from `display_domain` on every write.
    pub normalized_domain: String,
    pub is_primary: bool,
    pub is_canonical: bool,
}

impl Domain {
    /// New unsaved domain. The normalized form is computed when the domain is
    /// persisted, not here.
    pub fn new(site_id: StringUuid, display_domain: impl Into<String>) -> Self {
        Self {
            id: StringUuid::new_v4(),
            site_id,
            display_domain: display_domain.into(),
            normalized_domain: String::new(),
            is_primary: false,
            is_canonical: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn canonical(mut self) -> Self {
        self.is_canonical = true;
        self
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut status = Vec::new();
        if self.is_primary {
            status.push("Primary");
        }
        if self.is_canonical {
            status.push("Canonical");
        }
        let status = if status.is_empty() {
            "Alternate".to_string()
        } else {
            status.join(", ")
        };
        write!(f, "{} ({})", self.display_domain, status)
    }
}

/// Reason a site is blocked. Pure lookup entity; names are stored upper-cased.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlockReason {
    pub id: StringUuid,
    pub name: String,
    pub description: String,
}

/// Input for provisioning a new site
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSiteInput {
    pub owner_id: StringUuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 63))]
    pub subdomain: String,
}

/// Fully validated and normalized values for one provisioning write.
///
/// Built by the site service after subdomain validation; every field is final
/// at this point and the repository persists them in a single transaction.
#[derive(Debug, Clone)]
pub struct ProvisionSiteRecord {
    pub owner_id: StringUuid,
    pub name: String,
    pub subdomain: String,
    pub normalized_subdomain: String,
    pub group_name: String,
    pub display_domain: String,
    pub normalized_domain: String,
}

/// Input for updating a site's name and/or subdomain
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSiteInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 63))]
    pub subdomain: String,
}
