use std::{sync::Arc, time::Duration};

use tracing::trace;
use ureq::Agent;
use url::Url;

use crate::error::{RegistryError, Result};

/// Source of remote bytes.
///
/// The pipeline only ever performs `GET`s, so this is the single seam
/// between it and the network. Implementations block; async callers go
/// through [`fetch_async`].
pub trait Fetcher: Send + Sync {
    /// Returns the body of a successful (2xx) response.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(format!("pkghub/{}", env!("CARGO_PKG_VERSION"))),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Builds an `Agent` that reports HTTP error statuses as responses so
    /// that [`HttpFetcher`] can map them itself.
    pub fn build(&self) -> Agent {
        let mut config = Agent::config_builder()
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

/// [`Fetcher`] backed by a `ureq` agent.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            agent: config.build(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Url::parse(url).map_err(|err| RegistryError::FailedToFetchRemote {
            url: url.to_string(),
            reason: format!("invalid URL: {err}"),
        })?;

        trace!(url, "GET");
        let resp = self.agent.get(url).call().map_err(|err| {
            RegistryError::FailedToFetchRemote {
                url: url.to_string(),
                reason: err.to_string(),
            }
        })?;

        if !resp.status().is_success() {
            return Err(RegistryError::HttpStatus {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.into_body().read_to_vec().map_err(|err| {
            RegistryError::FailedToFetchRemote {
                url: url.to_string(),
                reason: err.to_string(),
            }
        })
    }
}

/// Runs a blocking [`Fetcher::fetch`] on the runtime's blocking pool.
pub async fn fetch_async(fetcher: Arc<dyn Fetcher>, url: String) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || fetcher.fetch(&url))
        .await
        .map_err(|err| RegistryError::Custom(format!("fetch task failed: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Echo;

    impl Fetcher for Echo {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Ok(url.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.user_agent.unwrap().starts_with("pkghub/"));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_client_config_build() {
        let config = ClientConfig {
            user_agent: Some("test-agent".to_string()),
            timeout: Some(Duration::from_secs(5)),
        };
        let _ = HttpFetcher::new(&config);
    }

    #[test]
    fn test_http_fetcher_rejects_invalid_url() {
        let fetcher = HttpFetcher::new(&ClientConfig::default());
        let err = fetcher.fetch("not a url").unwrap_err();

        assert!(matches!(
            err,
            RegistryError::FailedToFetchRemote { ref reason, .. } if reason.starts_with("invalid URL")
        ));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_fetch_async() {
        let bytes = fetch_async(Arc::new(Echo), "https://example.com".to_string())
            .await
            .unwrap();
        assert_eq!(bytes, b"https://example.com");
    }
}
