//! Data access layer (Repository pattern)

pub mod block_reason;
pub mod collection;
pub mod domain;
pub mod group;
pub mod site;
pub mod sitevar;
pub mod user;

pub use block_reason::{BlockReasonRepository, BlockReasonRepositoryImpl};
pub use collection::{CollectionRepository, CollectionRepositoryImpl};
pub use domain::{DomainRepository, DomainRepositoryImpl};
pub use group::{GroupRepository, GroupRepositoryImpl};
pub use site::{SiteRepository, SiteRepositoryImpl};
pub use sitevar::{SiteVarRepository, SiteVarRepositoryImpl};
pub use user::{UserRepository, UserRepositoryImpl};
