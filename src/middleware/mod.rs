//! HTTP middleware
//!
//! The request-binding middleware maps the Host header to a tenant site and
//! either serves, redirects to the primary domain, or rejects the request.

pub mod site_binding;

pub use site_binding::{site_binding_middleware, SiteBindingState, SiteContext};
