//! Site provisioning and lifecycle actions
//!
//! Business logic composing Site + Group + Domain writes. All mutations end
//! by clearing the resolver cache explicitly; there is no signal/observer
//! machinery between the write path and the cache.

use crate::config::SitesConfig;
use crate::domain::{
    site_group_name, CreateSiteInput, Domain, ProvisionSiteRecord, Site, StringUuid,
    UpdateSiteInput,
};
use crate::error::{AppError, Result};
use crate::hostname::{normalize_domain, validate_subdomain};
use crate::repository::{DomainRepository, SiteRepository};
use crate::service::SiteCache;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// User-facing message for both validation and uniqueness failures, so a
/// caller cannot tell a race-lost duplicate from a pre-checked one.
pub const DOMAIN_NOT_AVAILABLE: &str = "This domain name is not available.";

pub struct SiteService<SR: SiteRepository, DR: DomainRepository> {
    site_repo: Arc<SR>,
    domain_repo: Arc<DR>,
    cache: Arc<SiteCache>,
    sites_config: SitesConfig,
}

impl<SR: SiteRepository, DR: DomainRepository> SiteService<SR, DR> {
    pub fn new(
        site_repo: Arc<SR>,
        domain_repo: Arc<DR>,
        cache: Arc<SiteCache>,
        sites_config: SitesConfig,
    ) -> Self {
        Self {
            site_repo,
            domain_repo,
            cache,
            sites_config,
        }
    }

    /// Validate the subdomain and derive every value a provisioning write
    /// needs. The normalized domain is recomputed from the display form, not
    /// assembled from pre-normalized parts.
    fn build_record(
        &self,
        owner_id: StringUuid,
        name: &str,
        subdomain: &str,
    ) -> Result<ProvisionSiteRecord> {
        let normalized_subdomain =
            validate_subdomain(subdomain, &self.sites_config.reserved_subdomains)
                .map_err(|e| AppError::Validation(e.to_string()))?;

        let display_domain = format!("{}.{}", subdomain, self.sites_config.root_domain);
        let normalized_domain = normalize_domain(&display_domain)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(ProvisionSiteRecord {
            owner_id,
            name: name.to_string(),
            subdomain: subdomain.to_string(),
            normalized_subdomain: normalized_subdomain.clone(),
            group_name: site_group_name(&normalized_subdomain),
            display_domain,
            normalized_domain,
        })
    }

    /// Create a site with its access-control group and canonical+primary
    /// domain. A duplicate subdomain or domain surfaces as a conflict with
    /// the same message a validation failure would carry.
    pub async fn create_site(&self, input: CreateSiteInput) -> Result<Site> {
        input.validate()?;
        let record = self.build_record(input.owner_id, &input.name, &input.subdomain)?;

        let site = self
            .site_repo
            .create_provisioned(&record)
            .await
            .map_err(remap_unique_violation)?;

        self.cache.clear();
        info!(site_id = %site.id, subdomain = %site.subdomain, "Provisioned site");
        Ok(site)
    }

    /// Rename a site and/or move it to a new subdomain. Group name and
    /// canonical domain follow the subdomain atomically.
    pub async fn update_site(&self, id: StringUuid, input: UpdateSiteInput) -> Result<Site> {
        input.validate()?;
        let site = self.get(id).await?;
        let record = self.build_record(site.owner_id, &input.name, &input.subdomain)?;

        let site = self
            .site_repo
            .update_provisioned(id, &record)
            .await
            .map_err(remap_unique_violation)?;

        self.cache.clear();
        Ok(site)
    }

    pub async fn get(&self, id: StringUuid) -> Result<Site> {
        self.site_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Site {} not found", id)))
    }

    pub async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Site>, i64)> {
        let offset = (page - 1) * per_page;
        let sites = self.site_repo.list(offset, per_page).await?;
        let total = self.site_repo.count().await?;
        Ok((sites, total))
    }

    pub async fn list_for_user(&self, user_id: StringUuid) -> Result<Vec<Site>> {
        self.site_repo.list_for_user(user_id).await
    }

    /// Attach an additional (alias) domain to a site.
    pub async fn add_domain(
        &self,
        site_id: StringUuid,
        display_domain: &str,
        is_primary: bool,
        is_canonical: bool,
    ) -> Result<Domain> {
        // Ensure the site exists before writing the domain row.
        let _ = self.get(site_id).await?;

        let mut domain = Domain::new(site_id, display_domain);
        domain.is_primary = is_primary;
        domain.is_canonical = is_canonical;

        let domain = self
            .domain_repo
            .save(&domain)
            .await
            .map_err(remap_unique_violation)?;

        self.cache.clear();
        Ok(domain)
    }

    /// Soft-delete a site. The canonical domain name is recorded on the site
    /// row and the site stops resolving.
    pub async fn archive_site(&self, id: StringUuid) -> Result<Site> {
        let canonical = self.domain_repo.canonical_for_site(id).await?;
        let canonical_name = canonical
            .map(|d| d.display_domain)
            .unwrap_or_default();

        let site = self.site_repo.archive(id, &canonical_name).await?;
        self.cache.clear();
        info!(site_id = %site.id, "Archived site");
        Ok(site)
    }

    pub async fn block_site(&self, id: StringUuid, block_reason_id: StringUuid) -> Result<Site> {
        let site = self.site_repo.block(id, block_reason_id).await?;
        self.cache.clear();
        Ok(site)
    }

    pub async fn unblock_site(&self, id: StringUuid) -> Result<Site> {
        let site = self.site_repo.unblock(id).await?;
        self.cache.clear();
        Ok(site)
    }
}

/// Remap unique-constraint violations to the shared "not available" conflict.
fn remap_unique_violation(err: AppError) -> AppError {
    if err.is_unique_violation() {
        AppError::Conflict(DOMAIN_NOT_AVAILABLE.to_string())
    } else {
        err
    }
}
