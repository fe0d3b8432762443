//! Crop price prediction
//!
//! - `model`: the regression artifact format and scoring
//! - `cache`: process-wide, load-once holder of the deserialized model
//! - `predictor`: request validation and rounding around the cached model

pub mod cache;
pub mod model;
pub mod predictor;

pub use cache::{FileModelSource, ModelCache, ModelSource};
pub use model::{ModelArtifact, RegressionModel, RegressionTree};
pub use predictor::{PriceInput, PricePredictor};
