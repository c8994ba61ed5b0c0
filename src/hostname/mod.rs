//! Domain name normalization and subdomain validation
//!
//! Pure functions with no database access. `normalize_domain` is called on
//! every persisted domain write; stored normalized forms are always recomputed
//! here, never trusted from input.

use thiserror::Error;

/// RFC 1035 limits a DNS label to 63 octets. The raw subdomain is checked
/// against this before punycode expansion.
pub const MAX_SUBDOMAIN_LEN: usize = 63;

/// Failure to convert a host string to its IDNA ASCII form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid domain name: {domain}")]
pub struct InvalidDomainError {
    pub domain: String,
}

/// Subdomain validation failures, in the order they are checked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubdomainError {
    #[error("Subdomain must not be empty")]
    Empty,

    #[error("Subdomain '{0}' must not contain dots")]
    ContainsDots(String),

    #[error("Subdomain '{0}' contains invalid characters")]
    InvalidCharacters(String),

    #[error("Subdomain '{value}' is {length} characters; the limit is {MAX_SUBDOMAIN_LEN}")]
    TooLong { value: String, length: usize },

    #[error("The subdomain '{0}' is not available")]
    Reserved(String),
}

/// Normalize a domain name for lookup and uniqueness comparison.
///
/// Trims surrounding whitespace, lowercases, strips trailing dots, and
/// converts internationalized names to their punycode ASCII form (RFC 3490).
/// Idempotent: normalizing an already-normalized domain is a no-op.
pub fn normalize_domain(raw: &str) -> Result<String, InvalidDomainError> {
    let domain = raw.trim().to_lowercase();
    let domain = domain.trim_end_matches('.');
    idna::domain_to_ascii_strict(domain).map_err(|_| InvalidDomainError {
        domain: raw.to_string(),
    })
}

/// Split an optional port off a Host header value.
///
/// `"blog.example.com:8080"` becomes `("blog.example.com", Some(8080))`.
/// A bracketed IPv6 literal keeps its brackets in the host part.
pub fn split_host_port(host: &str) -> (&str, Option<u16>) {
    if let Some(end) = host.rfind(']') {
        // IPv6 literal, port may follow the closing bracket
        match host[end..].split_once(':') {
            Some((_, port)) => (&host[..=end], port.parse().ok()),
            None => (host, None),
        }
    } else {
        match host.rsplit_once(':') {
            Some((h, port)) => (h, port.parse().ok()),
            None => (host, None),
        }
    }
}

/// Validate a candidate subdomain and return its normalized form.
///
/// Checks run in a fixed order and the first failure wins: empty, dots, raw
/// length against the RFC 1035 label limit, normalization (invalid
/// characters), membership in the reserved-name set (checked on the
/// normalized form). The length check precedes normalization so an over-long
/// label reports its length instead of a generic IDNA failure.
pub fn validate_subdomain(
    subdomain: &str,
    reserved_names: &[String],
) -> Result<String, SubdomainError> {
    let subdomain = subdomain.trim();
    if subdomain.is_empty() {
        return Err(SubdomainError::Empty);
    }
    if subdomain.contains('.') {
        return Err(SubdomainError::ContainsDots(subdomain.to_string()));
    }
    if subdomain.chars().count() > MAX_SUBDOMAIN_LEN {
        return Err(SubdomainError::TooLong {
            value: subdomain.to_string(),
            length: subdomain.chars().count(),
        });
    }
    let normalized = normalize_domain(subdomain)
        .map_err(|_| SubdomainError::InvalidCharacters(subdomain.to_string()))?;
    if reserved_names.iter().any(|r| r == &normalized) {
        return Err(SubdomainError::Reserved(subdomain.to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_plain_domain() {
        assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_normalize_strips_trailing_dots() {
        assert_eq!(normalize_domain("example.com.").unwrap(), "example.com");
        assert_eq!(normalize_domain("example.com..").unwrap(), "example.com");
    }

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize_domain("ExAmPlE.CoM").unwrap(), "example.com");
    }

    #[test]
    fn test_normalize_strips_whitespace() {
        assert_eq!(normalize_domain("  example.com  ").unwrap(), "example.com");
    }

    #[test]
    fn test_normalize_internationalized_domain() {
        assert_eq!(
            normalize_domain("münchen.de").unwrap(),
            "xn--mnchen-3ya.de"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["ExAmPlE.CoM.", "münchen.de", "  blog.example.com  "] {
            let once = normalize_domain(raw).unwrap();
            let twice = normalize_domain(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_normalize_rejects_invalid_domain() {
        let err = normalize_domain("invalid_domain_###").unwrap_err();
        assert_eq!(err.domain, "invalid_domain_###");
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("blog.example.com:8080"),
            ("blog.example.com", Some(8080))
        );
        assert_eq!(split_host_port("blog.example.com"), ("blog.example.com", None));
        assert_eq!(split_host_port("localhost:3000"), ("localhost", Some(3000)));
        assert_eq!(split_host_port("[::1]:8080"), ("[::1]", Some(8080)));
        assert_eq!(split_host_port("[::1]"), ("[::1]", None));
    }

    #[test]
    fn test_validate_valid_subdomain() {
        assert_eq!(validate_subdomain("valid-name", &[]).unwrap(), "valid-name");
    }

    #[test]
    fn test_validate_internationalized_subdomain() {
        assert_eq!(
            validate_subdomain("münchen", &[]).unwrap(),
            "xn--mnchen-3ya"
        );
    }

    #[test]
    fn test_validate_empty_subdomain() {
        assert_eq!(validate_subdomain("", &[]).unwrap_err(), SubdomainError::Empty);
        assert_eq!(
            validate_subdomain("   ", &[]).unwrap_err(),
            SubdomainError::Empty
        );
    }

    #[test]
    fn test_validate_subdomain_with_dots() {
        assert_eq!(
            validate_subdomain("has.dots", &[]).unwrap_err(),
            SubdomainError::ContainsDots("has.dots".to_string())
        );
    }

    #[test]
    fn test_validate_subdomain_too_long() {
        let long = "a".repeat(64);
        assert_eq!(
            validate_subdomain(&long, &[]).unwrap_err(),
            SubdomainError::TooLong {
                value: long.clone(),
                length: 64
            }
        );
        // Exactly at the limit is fine
        assert!(validate_subdomain(&"a".repeat(63), &[]).is_ok());
    }

    #[test]
    fn test_validate_reserved_subdomain() {
        let reserved = vec!["reserved".to_string(), "www".to_string()];
        assert_eq!(
            validate_subdomain("reserved", &reserved).unwrap_err(),
            SubdomainError::Reserved("reserved".to_string())
        );
        // Reservation is matched against the normalized form
        assert_eq!(
            validate_subdomain("ReSeRvEd", &reserved).unwrap_err(),
            SubdomainError::Reserved("ReSeRvEd".to_string())
        );
    }

    #[test]
    fn test_validate_invalid_characters() {
        assert_eq!(
            validate_subdomain("invalid_domain_###", &[]).unwrap_err(),
            SubdomainError::InvalidCharacters("invalid_domain_###".to_string())
        );
    }
}
