//! Host-to-site resolution with an in-process cache
//!
//! The cache is deliberately coarse: any site or domain mutation clears the
//! whole map, because a domain reassignment could affect any cached entry.
//! Stale hits and false misses are both impossible; the price is that one
//! write evicts every tenant's entry. Readers race freely, concurrent clears
//! are idempotent.

use crate::config::SitesConfig;
use crate::domain::{Domain, Site};
use crate::error::Result;
use crate::hostname::{normalize_domain, split_host_port};
use crate::repository::{DomainRepository, SiteRepository};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// How a host matched a site. Lowest value wins when several candidates
/// exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MatchPriority {
    /// The full host matched a domain record exactly.
    ExactHost = 0,
    /// Only the registrable root (last two labels) matched.
    RootDomain = 1,
    /// Nothing matched; the configured fallback site was used.
    DefaultSite = 2,
}

/// A successful host-to-site binding.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSite {
    pub domain: Domain,
    pub site: Site,
    pub priority: MatchPriority,
}

/// Explicit cache object for resolved hosts, keyed by the raw host string.
///
/// Owned by the resolver and injected through application state rather than
/// living as a module-level global.
#[derive(Default)]
pub struct SiteCache {
    entries: RwLock<HashMap<String, Arc<ResolvedSite>>>,
}

impl SiteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, host: &str) -> Option<Arc<ResolvedSite>> {
        self.entries.read().expect("site cache poisoned").get(host).cloned()
    }

    pub fn insert(&self, host: &str, resolved: Arc<ResolvedSite>) {
        self.entries
            .write()
            .expect("site cache poisoned")
            .insert(host.to_string(), resolved);
    }

    /// Drop every entry. Called after any site/domain write.
    pub fn clear(&self) {
        self.entries.write().expect("site cache poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("site cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct SiteResolver<DR: DomainRepository, SR: SiteRepository> {
    domain_repo: Arc<DR>,
    site_repo: Arc<SR>,
    cache: Arc<SiteCache>,
    sites_config: SitesConfig,
}

impl<DR: DomainRepository, SR: SiteRepository> SiteResolver<DR, SR> {
    pub fn new(
        domain_repo: Arc<DR>,
        site_repo: Arc<SR>,
        cache: Arc<SiteCache>,
        sites_config: SitesConfig,
    ) -> Self {
        Self {
            domain_repo,
            site_repo,
            cache,
            sites_config,
        }
    }

    /// The cache shared with the write path for invalidation.
    pub fn cache(&self) -> Arc<SiteCache> {
        Arc::clone(&self.cache)
    }

    /// The primary domain of a site, used as a redirect target.
    pub async fn primary_domain(&self, site_id: crate::domain::StringUuid) -> Result<Option<Domain>> {
        self.domain_repo.primary_for_site(site_id).await
    }

    /// Resolve a request host to a site, or `None` when no live site matches.
    ///
    /// Candidates are ranked by [`MatchPriority`]: exact host match, then
    /// registrable root domain, then the configured default site. Archived
    /// and blocked sites never resolve.
    pub async fn resolve(&self, host: &str) -> Result<Option<Arc<ResolvedSite>>> {
        if let Some(cached) = self.cache.get(host) {
            debug!(host, "Site cache hit");
            return Ok(Some(cached));
        }

        let mut candidates: Vec<ResolvedSite> = Vec::new();

        if let Some(resolved) = self.resolve_exact(host).await? {
            candidates.push(resolved);
        }
        if candidates.is_empty() {
            if let Some(resolved) = self.resolve_root_domain(host).await? {
                candidates.push(resolved);
            }
        }
        if candidates.is_empty() {
            if let Some(resolved) = self.resolve_default_site().await? {
                candidates.push(resolved);
            }
        }

        let best = candidates.into_iter().min_by_key(|c| c.priority);
        match best {
            Some(resolved) => {
                let resolved = Arc::new(resolved);
                self.cache.insert(host, Arc::clone(&resolved));
                Ok(Some(resolved))
            }
            None => Ok(None),
        }
    }

    async fn resolve_exact(&self, host: &str) -> Result<Option<ResolvedSite>> {
        let Some(domain) = self.domain_repo.find_for_host(host).await? else {
            return Ok(None);
        };
        self.load_site(domain, MatchPriority::ExactHost).await
    }

    /// Fall back to the registrable root domain: the last two dot-separated
    /// labels of the host. `blog.customer.example.com` falls back to
    /// `example.com`.
    async fn resolve_root_domain(&self, host: &str) -> Result<Option<ResolvedSite>> {
        let (bare_host, _port) = split_host_port(host);
        let Ok(normalized) = normalize_domain(bare_host) else {
            return Ok(None);
        };

        let labels: Vec<&str> = normalized.split('.').collect();
        if labels.len() <= 2 {
            // Already a bare root domain; the exact pass covered it.
            return Ok(None);
        }
        let root = labels[labels.len() - 2..].join(".");

        let Some(domain) = self.domain_repo.find_for_host(&root).await? else {
            return Ok(None);
        };
        self.load_site(domain, MatchPriority::RootDomain).await
    }

    async fn resolve_default_site(&self) -> Result<Option<ResolvedSite>> {
        let Some(default_id) = self.sites_config.default_site_id else {
            return Ok(None);
        };
        let Some(site) = self.site_repo.find_by_id(default_id.into()).await? else {
            return Ok(None);
        };
        if site.is_archived() || site.is_blocked() {
            return Ok(None);
        }
        // The default site binds through its primary domain; without one it
        // cannot serve.
        let Some(domain) = self.domain_repo.primary_for_site(site.id).await? else {
            return Ok(None);
        };
        Ok(Some(ResolvedSite {
            domain,
            site,
            priority: MatchPriority::DefaultSite,
        }))
    }

    async fn load_site(
        &self,
        domain: Domain,
        priority: MatchPriority,
    ) -> Result<Option<ResolvedSite>> {
        let Some(site) = self.site_repo.find_by_id(domain.site_id).await? else {
            return Ok(None);
        };
        Ok(Some(ResolvedSite {
            domain,
            site,
            priority,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StringUuid;
    use crate::repository::domain::MockDomainRepository;
    use crate::repository::site::MockSiteRepository;
    use mockall::predicate::*;

    fn sites_config() -> SitesConfig {
        SitesConfig {
            root_domain: "example.com".to_string(),
            reserved_subdomains: vec![],
            default_site_id: None,
            redirect_exempt_hosts: vec!["localhost".to_string()],
            var_defaults: Default::default(),
        }
    }

    fn live_site() -> Site {
        Site {
            name: "Test Site".to_string(),
            ..Site::default()
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(MatchPriority::ExactHost < MatchPriority::RootDomain);
        assert!(MatchPriority::RootDomain < MatchPriority::DefaultSite);
    }

    #[test]
    fn test_cache_insert_get_clear() {
        let cache = SiteCache::new();
        let resolved = Arc::new(ResolvedSite {
            domain: Domain::new(StringUuid::new_v4(), "blog.example.com"),
            site: live_site(),
            priority: MatchPriority::ExactHost,
        });

        assert!(cache.get("blog.example.com").is_none());
        cache.insert("blog.example.com", Arc::clone(&resolved));
        assert!(cache.get("blog.example.com").is_some());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("blog.example.com").is_none());
    }

    #[tokio::test]
    async fn test_resolve_exact_match() {
        let site = live_site();
        let site_id = site.id;
        let mut domain = Domain::new(site_id, "blog.example.com");
        domain.normalized_domain = "blog.example.com".to_string();

        let mut domain_repo = MockDomainRepository::new();
        let domain_clone = domain.clone();
        domain_repo
            .expect_find_for_host()
            .with(eq("blog.example.com"))
            .returning(move |_| Ok(Some(domain_clone.clone())));

        let mut site_repo = MockSiteRepository::new();
        let site_clone = site.clone();
        site_repo
            .expect_find_by_id()
            .with(eq(site_id))
            .returning(move |_| Ok(Some(site_clone.clone())));

        let resolver = SiteResolver::new(
            Arc::new(domain_repo),
            Arc::new(site_repo),
            Arc::new(SiteCache::new()),
            sites_config(),
        );

        let resolved = resolver.resolve("blog.example.com").await.unwrap().unwrap();
        assert_eq!(resolved.priority, MatchPriority::ExactHost);
        assert_eq!(resolved.site.name, "Test Site");
    }

    #[tokio::test]
    async fn test_resolve_caches_result() {
        let site = live_site();
        let site_id = site.id;
        let domain = Domain::new(site_id, "blog.example.com");

        let mut domain_repo = MockDomainRepository::new();
        let domain_clone = domain.clone();
        // The repository must be consulted exactly once; the second resolve
        // is served from cache.
        domain_repo
            .expect_find_for_host()
            .times(1)
            .returning(move |_| Ok(Some(domain_clone.clone())));

        let mut site_repo = MockSiteRepository::new();
        let site_clone = site.clone();
        site_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(site_clone.clone())));

        let resolver = SiteResolver::new(
            Arc::new(domain_repo),
            Arc::new(site_repo),
            Arc::new(SiteCache::new()),
            sites_config(),
        );

        resolver.resolve("blog.example.com").await.unwrap().unwrap();
        resolver.resolve("blog.example.com").await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_resolve_root_domain_fallback() {
        let site = live_site();
        let site_id = site.id;
        let mut root_domain = Domain::new(site_id, "example.com");
        root_domain.normalized_domain = "example.com".to_string();

        let mut domain_repo = MockDomainRepository::new();
        domain_repo
            .expect_find_for_host()
            .with(eq("deep.blog.example.com"))
            .returning(|_| Ok(None));
        let root_clone = root_domain.clone();
        domain_repo
            .expect_find_for_host()
            .with(eq("example.com"))
            .returning(move |_| Ok(Some(root_clone.clone())));

        let mut site_repo = MockSiteRepository::new();
        let site_clone = site.clone();
        site_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(site_clone.clone())));

        let resolver = SiteResolver::new(
            Arc::new(domain_repo),
            Arc::new(site_repo),
            Arc::new(SiteCache::new()),
            sites_config(),
        );

        let resolved = resolver
            .resolve("deep.blog.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.priority, MatchPriority::RootDomain);
    }

    #[tokio::test]
    async fn test_resolve_default_site_fallback() {
        let site = live_site();
        let site_id = site.id;
        let mut primary = Domain::new(site_id, "main.example.com").primary();
        primary.normalized_domain = "main.example.com".to_string();

        let mut domain_repo = MockDomainRepository::new();
        domain_repo.expect_find_for_host().returning(|_| Ok(None));
        let primary_clone = primary.clone();
        domain_repo
            .expect_primary_for_site()
            .with(eq(site_id))
            .returning(move |_| Ok(Some(primary_clone.clone())));

        let mut site_repo = MockSiteRepository::new();
        let site_clone = site.clone();
        site_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(site_clone.clone())));

        let mut config = sites_config();
        config.default_site_id = Some(site_id.into());

        let resolver = SiteResolver::new(
            Arc::new(domain_repo),
            Arc::new(site_repo),
            Arc::new(SiteCache::new()),
            config,
        );

        let resolved = resolver.resolve("unknown.host.net").await.unwrap().unwrap();
        assert_eq!(resolved.priority, MatchPriority::DefaultSite);
        assert!(resolved.domain.is_primary);
    }

    #[tokio::test]
    async fn test_resolve_no_match() {
        let mut domain_repo = MockDomainRepository::new();
        domain_repo.expect_find_for_host().returning(|_| Ok(None));

        let site_repo = MockSiteRepository::new();

        let resolver = SiteResolver::new(
            Arc::new(domain_repo),
            Arc::new(site_repo),
            Arc::new(SiteCache::new()),
            sites_config(),
        );

        assert!(resolver.resolve("nowhere.net").await.unwrap().is_none());
        // Misses are not cached; a later provisioning write would make the
        // host resolvable without an intervening clear.
        assert!(resolver.cache().is_empty());
    }
}
