//! Domain models

pub mod collection;
pub mod common;
pub mod group;
pub mod site;
pub mod sitevar;
pub mod user;

pub use collection::*;
pub use common::*;
pub use group::*;
pub use site::*;
pub use sitevar::*;
pub use user::*;
