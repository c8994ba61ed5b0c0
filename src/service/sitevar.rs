//! SiteVar lookup with process-wide default fallback

use crate::config::SitesConfig;
use crate::domain::{SiteVar, StringUuid};
use crate::error::{AppError, Result};
use crate::repository::SiteVarRepository;
use std::sync::Arc;

pub struct SiteVarService<R: SiteVarRepository> {
    repo: Arc<R>,
    sites_config: SitesConfig,
}

impl<R: SiteVarRepository> SiteVarService<R> {
    pub fn new(repo: Arc<R>, sites_config: SitesConfig) -> Self {
        Self { repo, sites_config }
    }

    /// Look up a variable for a site. Falls back to the process-wide default
    /// map when no row exists; `None` when neither is set.
    pub async fn get_value(&self, site_id: StringUuid, name: &str) -> Result<Option<String>> {
        if let Some(var) = self.repo.get(site_id, name).await? {
            return Ok(Some(var.value));
        }
        Ok(self.sites_config.var_defaults.get(name).cloned())
    }

    /// Like `get_value`, with a caller-supplied last-resort default.
    pub async fn get_value_or(
        &self,
        site_id: StringUuid,
        name: &str,
        default: &str,
    ) -> Result<String> {
        Ok(self
            .get_value(site_id, name)
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Typed variant: parse the stored string. A value that does not parse is
    /// a configuration problem, not a missing value.
    pub async fn get_value_as<T>(&self, site_id: StringUuid, name: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_value(site_id, name).await? {
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                AppError::Config(format!(
                    "Site variable '{}' has unparseable value '{}': {}",
                    name, raw, e
                ))
            }),
            None => Ok(None),
        }
    }

    pub async fn set_value(&self, site_id: StringUuid, name: &str, value: &str) -> Result<SiteVar> {
        self.repo.set(site_id, name, value).await
    }

    pub async fn list(&self, site_id: StringUuid) -> Result<Vec<SiteVar>> {
        self.repo.list_for_site(site_id).await
    }

    pub async fn delete(&self, site_id: StringUuid, name: &str) -> Result<()> {
        self.repo.delete(site_id, name).await
    }
}
