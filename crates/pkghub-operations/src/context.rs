use std::sync::Arc;

use pkghub_config::config::Config;
use pkghub_registry::{
    group_by_version, ArchiveResolver, ClientConfig, Fetcher, GroupedByVersion, HttpFetcher,
    IndexCache, IndexSource, Package, PackagesIndex,
};
use tracing::debug;

use crate::{
    details::{resolve_package_details, PackageDetails},
    error::Result,
    featured::featured,
    search::{apply_filters, count_tags, TagCount},
};

/// Owns the configuration and the fetch pipeline for one session.
///
/// Each context has its own [`IndexCache`]; clones share it.
#[derive(Clone)]
pub struct HubContext {
    config: Config,
    index: IndexSource,
    archives: ArchiveResolver,
}

impl HubContext {
    /// Creates a context that talks HTTP. The index and archives use
    /// separate agents so each gets its configured timeout.
    pub fn new(config: Config) -> Self {
        let index_fetcher = HttpFetcher::new(&ClientConfig {
            user_agent: Some(config.get_user_agent()),
            timeout: Some(config.get_index_timeout()),
        });
        let archive_fetcher = HttpFetcher::new(&ClientConfig {
            user_agent: Some(config.get_user_agent()),
            timeout: Some(config.get_archive_timeout()),
        });

        Self::with_fetchers(config, Arc::new(index_fetcher), Arc::new(archive_fetcher))
    }

    pub fn with_fetchers(
        config: Config,
        index_fetcher: Arc<dyn Fetcher>,
        archive_fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        debug!(index_url = config.get_index_url(), "creating hub context");
        let index = IndexSource::new(config.get_index_url(), index_fetcher, IndexCache::new());

        Self {
            config,
            index,
            archives: ArchiveResolver::new(archive_fetcher),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index_source(&self) -> &IndexSource {
        &self.index
    }

    pub async fn packages_index(&self) -> Result<Arc<PackagesIndex>> {
        Ok(self.index.get_packages_index().await?)
    }

    /// The latest version of every package, in index order.
    pub async fn latest_packages(&self) -> Result<Vec<Package>> {
        Ok(self.packages_index().await?.latest_packages())
    }

    /// Every version of every package, grouped by name, or `None` when
    /// the index lists no packages.
    pub async fn grouped_packages(&self) -> Result<Option<GroupedByVersion>> {
        let index = self.packages_index().await?;
        if index.packages.is_empty() {
            return Ok(None);
        }
        Ok(Some(group_by_version(index.packages.clone())?))
    }

    /// Text search then tag filtering over the latest packages.
    pub async fn search<S: AsRef<str>>(&self, query: &str, tags: &[S]) -> Result<Vec<Package>> {
        let packages = self.latest_packages().await?;
        Ok(apply_filters(
            packages,
            query,
            tags,
            self.config.get_search_threshold(),
        ))
    }

    /// Tag counts over the latest packages.
    pub async fn tags(&self) -> Result<Vec<TagCount>> {
        Ok(count_tags(&self.latest_packages().await?))
    }

    pub async fn details(&self, name: &str, version: Option<&str>) -> Result<PackageDetails> {
        let index = self.packages_index().await?;
        resolve_package_details(&index, &self.archives, name, version).await
    }

    pub async fn featured(&self) -> Result<Vec<Package>> {
        let index = self.packages_index().await?;
        Ok(featured(&index.packages, self.config.get_featured().as_slice()))
    }

    /// Drops the cached index so the next call fetches it again.
    pub fn refresh(&self) {
        self.index.invalidate();
    }
}
