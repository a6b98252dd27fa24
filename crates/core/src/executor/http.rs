//! HTTP fetcher implementation.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::FetchError;
use super::traits::Fetcher;
use super::types::{FetchRequest, FetchResult};

/// Streams HTTP responses to disk.
///
/// The body is written chunk by chunk into a temporary file next to the
/// target and renamed into place once complete. If the fetch fails or its
/// future is dropped, the temporary file is removed with it.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("viewforge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Creates a fetcher around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let response = self.client.get(&request.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let dir = request
            .target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| ".".into());
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = NamedTempFile::new_in(&dir)?;
        let mut file = tokio::fs::File::from_std(tmp.reopen()?);
        let mut hasher = Sha256::new();
        let mut bytes = 0u64;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tmp.persist(&request.target).map_err(|e| FetchError::Io(e.error))?;

        debug!(
            object_id = %request.object_id,
            bytes,
            target = %request.target.display(),
            "Fetched object"
        );

        Ok(FetchResult {
            bytes,
            sha256: format!("{:x}", hasher.finalize()),
        })
    }
}
