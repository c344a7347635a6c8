//! Artifact acquisition.
//!
//! The production source downloads the configured release URL into an
//! unnamed spool file in the temp directory. The file has no directory
//! entry; the OS reclaims it when the last handle drops.

use std::io::SeekFrom;

use futures_util::StreamExt;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::firmware::{ArtifactSource, FirmwareError};
use crate::middleware::cache::BoxFuture;

/// Downloads the firmware artifact over HTTP.
pub struct RemoteArtifactSource {
    url: String,
}

impl RemoteArtifactSource {
    pub fn new(url: String) -> Self {
        Self { url }
    }

    /// Return the configured artifact URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn download(&self) -> Result<tokio::fs::File, FirmwareError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| FirmwareError::Fetch(e.to_string()))?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FirmwareError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FirmwareError::Fetch(format!(
                "artifact host returned HTTP {}",
                response.status()
            )));
        }

        let spool = tempfile::tempfile()?;
        let mut file = tokio::fs::File::from_std(spool);

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FirmwareError::Fetch(e.to_string()))?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        // Settle size and allocation metadata before it is read back.
        file.sync_all().await?;
        file.seek(SeekFrom::Start(0)).await?;
        Ok(file)
    }
}

impl ArtifactSource for RemoteArtifactSource {
    fn fetch(&self) -> BoxFuture<'_, Result<tokio::fs::File, FirmwareError>> {
        Box::pin(self.download())
    }
}
