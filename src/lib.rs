//! QuillPress Core - multi-tenant publishing platform backend
//!
//! One database serves many sites; requests are bound to a site by hostname,
//! and administrative visibility is scoped by group-based permission grants.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod hostname;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
