//! HTTP fetcher abstraction for testability

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::trace;

use super::types::FetchError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent sent to tile services.
pub const DEFAULT_USER_AGENT: &str = concat!("tilesync/", env!("CARGO_PKG_VERSION"));

/// Fetches one URL and returns its body.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock fetchers in tests.
pub trait TileFetcher: Send + Sync + 'static {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body, or [`FetchError::NotFound`] for a 404.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// Real fetcher using the async reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the default timeout and user agent.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Creates a fetcher with a custom timeout and user agent.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl TileFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
        let request = self.client.get(url);
        let url = url.to_string();

        async move {
            let response = request.send().await.map_err(map_reqwest_error)?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound);
            }
            if !status.is_success() {
                return Err(FetchError::Http {
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await.map_err(map_reqwest_error)?;
            trace!(url = %url, bytes = body.len(), "Fetched tile");
            Ok(body)
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Http {
            status: status.as_u16(),
        }
    } else {
        FetchError::Connection(e.to_string())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Mock fetcher answering from a fixed table; unknown URLs are 404.
    pub struct MockFetcher {
        pub responses: HashMap<String, Result<Bytes, FetchError>>,
    }

    impl TileFetcher for MockFetcher {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
            let result = self
                .responses
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchError::NotFound));
            async move { result }
        }
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let mut responses = HashMap::new();
        responses.insert("http://a".to_string(), Ok(Bytes::from_static(b"abc")));
        responses.insert("http://b".to_string(), Err(FetchError::Timeout));
        let mock = MockFetcher { responses };

        assert_eq!(mock.fetch("http://a").await.unwrap(), Bytes::from_static(b"abc"));
        assert_eq!(mock.fetch("http://b").await, Err(FetchError::Timeout));
        assert!(mock.fetch("http://c").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_reqwest_fetcher_builds() {
        assert!(ReqwestFetcher::with_options(Duration::from_secs(5), "test-agent").is_ok());
    }
}
