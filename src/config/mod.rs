//! Configuration management for QuillPress Core

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Sites / tenancy configuration
    pub sites: SitesConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Tenancy configuration
#[derive(Debug, Clone)]
pub struct SitesConfig {
    /// The domain the publishing tools are served from. Every provisioned site
    /// gets a subdomain of this domain (subdomain "blog" under root domain
    /// "example.com" serves from "blog.example.com").
    pub root_domain: String,
    /// Subdomain names withheld from tenants (e.g. "www", "admin").
    pub reserved_subdomains: Vec<String>,
    /// Fallback site used when neither the exact host nor its root domain
    /// matches any domain record.
    pub default_site_id: Option<uuid::Uuid>,
    /// Hosts served directly even through a non-primary domain. Covers local
    /// development and test harnesses.
    pub redirect_exempt_hosts: Vec<String>,
    /// Process-wide fallback values for SiteVar lookups (JSON object in the
    /// SITES_VAR_DEFAULTS env var).
    pub var_defaults: HashMap<String, String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            sites: SitesConfig::from_env()?,
        })
    }

    /// Get the HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl SitesConfig {
    /// Load tenancy configuration from environment variables.
    ///
    /// `SITES_ROOT_DOMAIN` is required; nothing else in the tenancy layer can
    /// work without it, so its absence is fatal at startup rather than
    /// deferred to first use.
    pub fn from_env() -> Result<Self> {
        let root_domain = env::var("SITES_ROOT_DOMAIN").context(
            "SITES_ROOT_DOMAIN is required. Provisioned sites are subdomains of this domain.",
        )?;

        let reserved_subdomains = env::var("SITES_RESERVED_SUBDOMAINS")
            .map(|v| parse_name_list(&v))
            .unwrap_or_default();

        let default_site_id = match env::var("SITES_DEFAULT_SITE_ID") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse()
                    .context("Invalid SITES_DEFAULT_SITE_ID (expected a UUID)")?,
            ),
            _ => None,
        };

        let redirect_exempt_hosts = env::var("SITES_REDIRECT_EXEMPT_HOSTS")
            .map(|v| parse_name_list(&v))
            .unwrap_or_else(|_| vec!["localhost".to_string(), "127.0.0.1".to_string()]);

        let var_defaults = match env::var("SITES_VAR_DEFAULTS") {
            Ok(json) if !json.trim().is_empty() => serde_json::from_str(&json)
                .context("Invalid SITES_VAR_DEFAULTS (expected a JSON object of strings)")?,
            _ => HashMap::new(),
        };

        Ok(Self {
            root_domain,
            reserved_subdomains,
            default_site_id,
            redirect_exempt_hosts,
            var_defaults,
        })
    }
}

/// Parse a comma-separated list of names, trimming and dropping empties.
fn parse_name_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
