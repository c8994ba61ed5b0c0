//! Business logic services

pub mod resolver;
pub mod site;
pub mod sitevar;
pub mod visibility;

pub use resolver::{MatchPriority, ResolvedSite, SiteCache, SiteResolver};
pub use site::SiteService;
pub use sitevar::SiteVarService;
pub use visibility::VisibilityService;
