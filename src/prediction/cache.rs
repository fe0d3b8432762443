use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::model::{ModelArtifact, RegressionModel};
use crate::{AdvisorError, Result};

/// Somewhere a [`RegressionModel`] can be deserialized from.
///
/// Loading is blocking; the cache runs it on the blocking thread pool.
pub trait ModelSource: Send + Sync {
    fn load(&self) -> Result<RegressionModel>;
}

/// Reads the model from the provisioned artifact file
pub struct FileModelSource {
    path: PathBuf,
}

impl FileModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelSource for FileModelSource {
    fn load(&self) -> Result<RegressionModel> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            AdvisorError::model_load(format!(
                "Cannot read artifact at {}: {e}",
                self.path.display()
            ))
        })?;
        ModelArtifact::parse(&bytes)
    }
}

/// Holds at most one deserialized model, shared read-only by all requests.
///
/// The first caller of [`ModelCache::get_model`] loads the model; concurrent
/// callers wait for that load and then share its result. A failed load leaves
/// the cache empty.
pub struct ModelCache {
    source: Arc<dyn ModelSource>,
    model: OnceCell<Arc<RegressionModel>>,
}

impl ModelCache {
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        Self {
            source,
            model: OnceCell::new(),
        }
    }

    pub async fn get_model(&self) -> Result<Arc<RegressionModel>> {
        self.model
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn load(&self) -> Result<Arc<RegressionModel>> {
        debug!("Loading price model");
        let start_time = Instant::now();

        let source = Arc::clone(&self.source);
        let model = tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| AdvisorError::model_load(format!("Model load task failed: {e}")))??;

        info!(
            "Loaded {} in {:.3}s",
            model.describe(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(Arc::new(model))
    }
}
