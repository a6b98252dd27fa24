//! Mock fetcher for testing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::InFlight;
use crate::executor::{FetchError, FetchRequest, FetchResult, Fetcher};

/// Bytes written for every successful mock fetch.
pub const MOCK_PAYLOAD: &[u8] = b"mock-model-bytes";

/// Mock implementation of the Fetcher trait.
///
/// Writes [`MOCK_PAYLOAD`] to the requested target. Behavior can be steered
/// per call (`set_next_error`) or per object (`fail_object`), and every
/// request is recorded for assertions.
#[derive(Debug)]
pub struct MockFetcher {
    requests: Arc<RwLock<Vec<FetchRequest>>>,
    next_error: Arc<RwLock<Option<FetchError>>>,
    failing_ids: Arc<RwLock<HashSet<String>>>,
    fetch_duration_ms: Arc<RwLock<u64>>,
    in_flight: InFlight,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher with no simulated latency.
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failing_ids: Arc::new(RwLock::new(HashSet::new())),
            fetch_duration_ms: Arc::new(RwLock::new(0)),
            in_flight: InFlight::default(),
        }
    }

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<FetchRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of fetches attempted.
    pub async fn fetch_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every fetch for `object_id` fail with a 500.
    pub async fn fail_object(&self, object_id: impl Into<String>) {
        self.failing_ids.write().await.insert(object_id.into());
    }

    /// Set the simulated fetch duration.
    pub async fn set_fetch_duration(&self, duration: Duration) {
        *self.fetch_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Highest number of fetches observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.in_flight.max()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        self.requests.write().await.push(request.clone());
        let _guard = self.in_flight.enter();

        let duration = *self.fetch_duration_ms.read().await;
        if duration > 0 {
            tokio::time::sleep(Duration::from_millis(duration)).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if self.failing_ids.read().await.contains(&request.object_id) {
            return Err(FetchError::Http {
                status: 500,
                url: request.url.clone(),
            });
        }

        if let Some(parent) = request.target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.target, MOCK_PAYLOAD).await?;

        Ok(FetchResult {
            bytes: MOCK_PAYLOAD.len() as u64,
            sha256: format!("{:x}", Sha256::digest(MOCK_PAYLOAD)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mock_fetch_writes_payload() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let target = dir.path().join("a/b.glb");

        let result = fetcher
            .fetch(&FetchRequest {
                object_id: "b".to_string(),
                url: "https://host/b.glb".to_string(),
                target: target.clone(),
            })
            .await
            .unwrap();

        assert_eq!(result.bytes, MOCK_PAYLOAD.len() as u64);
        assert_eq!(std::fs::read(&target).unwrap(), MOCK_PAYLOAD);
        assert_eq!(fetcher.fetch_count().await, 1);
        assert_eq!(fetcher.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_mock_fail_object() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        fetcher.fail_object("bad").await;

        let err = fetcher
            .fetch(&FetchRequest {
                object_id: "bad".to_string(),
                url: "https://host/bad.glb".to_string(),
                target: dir.path().join("bad.glb"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Http { status: 500, .. }));
        assert!(!dir.path().join("bad.glb").exists());
    }
}
