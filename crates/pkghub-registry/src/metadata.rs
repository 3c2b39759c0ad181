use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    cache::IndexCache,
    error::Result,
    http_client::{fetch_async, Fetcher},
    index::PackagesIndex,
};

/// Downloads and validates the package index, without caching.
///
/// Errors are logged here, where the URL is still known, and returned
/// unchanged.
pub async fn fetch_packages_index(fetcher: Arc<dyn Fetcher>, url: String) -> Result<PackagesIndex> {
    info!(url = %url, "fetching package index");

    let bytes = fetch_async(fetcher, url.clone())
        .await
        .inspect_err(|err| error!(url = %url, "failed to fetch package index: {err}"))?;

    let index = PackagesIndex::from_slice(&bytes)
        .inspect_err(|err| error!(url = %url, "package index failed validation: {err}"))?
        .without_sentinels();

    debug!(
        packages = index.packages.len(),
        last_update = index.last_update,
        "package index fetched"
    );
    Ok(index)
}

/// The remote package index behind a shared [`IndexCache`].
#[derive(Clone)]
pub struct IndexSource {
    url: String,
    fetcher: Arc<dyn Fetcher>,
    cache: IndexCache,
}

impl IndexSource {
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn Fetcher>, cache: IndexCache) -> Self {
        Self {
            url: url.into(),
            fetcher,
            cache,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Returns the index, fetching it at most once until it is
    /// invalidated. Concurrent callers share a single request.
    pub async fn get_packages_index(&self) -> Result<Arc<PackagesIndex>> {
        let fetcher = Arc::clone(&self.fetcher);
        let url = self.url.clone();
        self.cache
            .get_or_fetch(move || fetch_packages_index(fetcher, url))
            .await
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}
