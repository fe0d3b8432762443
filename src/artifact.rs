//! Model artifact provisioning
//!
//! Makes sure the serialized price model exists on local storage before the
//! service starts taking traffic, downloading it once if it is missing.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::config::ArtifactConfig;
use crate::prediction::ModelArtifact;
use crate::{AdvisorError, Result};

/// Where the artifact lives remotely and where it is kept locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    pub remote_reference: String,
    pub local_path: PathBuf,
}

impl From<&ArtifactConfig> for ArtifactLocator {
    fn from(config: &ArtifactConfig) -> Self {
        Self {
            remote_reference: config.remote_reference.clone(),
            local_path: config.local_path.clone(),
        }
    }
}

/// Retrieves raw artifact bytes from a remote reference
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, remote_reference: &str) -> Result<Vec<u8>>;
}

/// Rewrite Google Drive share links into a direct download URL.
///
/// Any other reference is returned unchanged.
#[must_use]
pub fn direct_download_url(reference: &str) -> String {
    if !reference.contains("drive.google.com") {
        return reference.to_string();
    }

    let id = if let Some((_, rest)) = reference.split_once("/file/d/") {
        rest.split(['/', '?', '#']).next()
    } else if let Some((_, query)) = reference.split_once('?') {
        query.split('&').find_map(|pair| pair.strip_prefix("id="))
    } else {
        None
    };

    match id.filter(|id| !id.is_empty()) {
        Some(id) => format!("https://drive.google.com/uc?export=download&id={id}"),
        None => reference.to_string(),
    }
}

/// Downloads artifacts over HTTP(S)
pub struct HttpArtifactFetcher {
    client: Client,
}

impl HttpArtifactFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agri-advisor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdvisorError::config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, remote_reference: &str) -> Result<Vec<u8>> {
        let url = direct_download_url(remote_reference);
        debug!("Downloading artifact from {}", url);
        let start_time = Instant::now();

        let response = self.client.get(&url).send().await.map_err(|e| {
            AdvisorError::artifact_unavailable(format!("Download request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisorError::artifact_unavailable(format!(
                "Download failed with status {status}"
            )));
        }

        // Hosting services answer with an HTML interstitial instead of the file
        // for links that are not publicly downloadable.
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"));
        if is_html {
            return Err(AdvisorError::artifact_unavailable(
                "Remote returned an HTML page instead of the model artifact",
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AdvisorError::artifact_unavailable(format!("Failed to read download body: {e}"))
        })?;

        if bytes.is_empty() {
            return Err(AdvisorError::artifact_unavailable(
                "Remote returned an empty artifact",
            ));
        }

        info!(
            "Downloaded {} bytes in {:.3}s",
            bytes.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(bytes.to_vec())
    }
}

/// Ensures the artifact named by a locator is present on disk
pub struct ArtifactProvisioner {
    locator: ArtifactLocator,
    fetcher: Arc<dyn ArtifactFetcher>,
    ensured: OnceCell<()>,
}

impl ArtifactProvisioner {
    pub fn new(locator: ArtifactLocator, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            locator,
            fetcher,
            ensured: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn locator(&self) -> &ArtifactLocator {
        &self.locator
    }

    /// Download the artifact unless it already exists locally.
    ///
    /// Success is remembered for the lifetime of the provisioner; a failure is
    /// not, so a later call tries again.
    pub async fn ensure_artifact(&self) -> Result<()> {
        self.ensured
            .get_or_try_init(|| self.provision())
            .await
            .map(|_| ())
    }

    #[instrument(skip(self), fields(path = %self.locator.local_path.display()))]
    async fn provision(&self) -> Result<()> {
        let path = self.locator.local_path.clone();

        let exists = tokio::fs::try_exists(&path).await.map_err(|e| {
            AdvisorError::artifact_unavailable(format!(
                "Cannot check artifact at {}: {e}",
                path.display()
            ))
        })?;
        if exists {
            debug!("Artifact already present, skipping download");
            return Ok(());
        }

        info!(
            "Artifact missing, fetching from {}",
            self.locator.remote_reference
        );
        let bytes = self.fetcher.fetch(&self.locator.remote_reference).await?;

        // Never store something the model cache would refuse to load
        ModelArtifact::parse(&bytes).map_err(|e| {
            AdvisorError::artifact_unavailable(format!(
                "Downloaded file from {} is not a usable price model: {e}",
                self.locator.remote_reference
            ))
        })?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &bytes))
            .await
            .map_err(|e| AdvisorError::artifact_unavailable(format!("Write task failed: {e}")))?
            .inspect_err(|e| warn!("Failed to store artifact: {}", e))?;

        info!("Artifact stored at {}", path.display());
        Ok(())
    }
}

/// Write through a temp file in the target directory so readers never see a
/// partial artifact.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let unavailable = |e: std::io::Error| {
        AdvisorError::artifact_unavailable(format!("Cannot write {}: {e}", path.display()))
    };

    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(unavailable)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(unavailable)?;
    temp.write_all(bytes).map_err(unavailable)?;
    temp.as_file().sync_all().map_err(unavailable)?;
    temp.persist(path).map_err(|e| unavailable(e.error))?;
    Ok(())
}
