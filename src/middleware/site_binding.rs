//! Request-to-site binding middleware
//!
//! Per request: resolve the Host header to a site, 404 when nothing live
//! matches, bind the resolution into request extensions, and redirect
//! non-primary (alias) hosts to the site's primary domain. Every outcome is
//! terminal; a rejected or redirected request is simply re-issued by the
//! client.

use crate::hostname::{normalize_domain, split_host_port};
use crate::repository::{DomainRepositoryImpl, SiteRepositoryImpl};
use crate::service::{ResolvedSite, SiteResolver};
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

/// The site/domain binding exposed to downstream handlers via request
/// extensions. Content-serving code is expected to filter every query by
/// `context.site().id`.
#[derive(Clone)]
pub struct SiteContext(pub Arc<ResolvedSite>);

impl SiteContext {
    pub fn site(&self) -> &crate::domain::Site {
        &self.0.site
    }

    pub fn domain(&self) -> &crate::domain::Domain {
        &self.0.domain
    }
}

/// State for the binding middleware.
#[derive(Clone)]
pub struct SiteBindingState {
    pub resolver: Arc<SiteResolver<DomainRepositoryImpl, SiteRepositoryImpl>>,
    /// Hosts served directly even through a non-primary domain.
    pub redirect_exempt_hosts: Arc<Vec<String>>,
}

/// Bind the request to a site, or terminate with 404 / redirect.
pub async fn site_binding_middleware(
    axum::extract::State(state): axum::extract::State<SiteBindingState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(host) = request_host(&request) else {
        warn!("Request without a Host header");
        return StatusCode::NOT_FOUND.into_response();
    };

    let resolved = match state.resolver.resolve(&host).await {
        Ok(Some(resolved)) => resolved,
        Ok(None) => {
            warn!(host = %host, "No domain found for request");
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(SiteContext(Arc::clone(&resolved)));

    if resolved.domain.is_primary || is_exempt_host(&host, &state.redirect_exempt_hosts) {
        return next.run(request).await;
    }

    // Alias domain: send the client to the primary. If the site somehow has
    // no primary domain, serving directly beats failing.
    let primary_host = match state.resolver.primary_domain(resolved.site.id).await {
        Ok(Some(primary)) => primary.normalized_domain,
        Ok(None) => return next.run(request).await,
        Err(err) => return err.into_response(),
    };

    redirect_to_host(&request, &primary_host)
}

/// The request host, preferring the Host header over the URI authority.
fn request_host(request: &Request<Body>) -> Option<String> {
    host_from_headers(request.headers())
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
}

fn host_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Exempt hosts are compared without the port, on the normalized form.
fn is_exempt_host(host: &str, exempt: &[String]) -> bool {
    let (bare, _port) = split_host_port(host);
    let candidate = normalize_domain(bare).unwrap_or_else(|_| bare.to_string());
    exempt.iter().any(|e| e == &candidate)
}

/// 302 to the same path and query on another host, preserving the scheme.
fn redirect_to_host(request: &Request<Body>, target_host: &str) -> Response {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let scheme = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().scheme_str())
        .unwrap_or("http");

    let location = format!("{}://{}{}", scheme, target_host, path_and_query);
    match location.parse::<Uri>() {
        Ok(_) => (
            StatusCode::FOUND,
            [(header::LOCATION, location)],
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_exempt_host() {
        let exempt = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        assert!(is_exempt_host("localhost", &exempt));
        assert!(is_exempt_host("localhost:8000", &exempt));
        assert!(is_exempt_host("LOCALHOST", &exempt));
        assert!(!is_exempt_host("blog.example.com", &exempt));
    }

    #[test]
    fn test_redirect_preserves_path_and_query() {
        let request = Request::builder()
            .uri("http://alias.example.com/articles/1?draft=true")
            .header(header::HOST, "alias.example.com")
            .body(Body::empty())
            .unwrap();

        let response = redirect_to_host(&request, "primary.example.com");
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(location, "http://primary.example.com/articles/1?draft=true");
    }

    #[test]
    fn test_request_host_prefers_header() {
        let request = Request::builder()
            .uri("/articles")
            .header(header::HOST, "blog.example.com:8080")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            request_host(&request).as_deref(),
            Some("blog.example.com:8080")
        );
    }
}
