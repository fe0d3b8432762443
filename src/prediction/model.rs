//! Regression model artifact format and scoring
//!
//! The artifact is a JSON export of a trained scikit-learn style regressor:
//!
//! ```json
//! {
//!   "feature_names": ["DayOfYear", "Min Price", "Max Price"],
//!   "model": { "kind": "linear", "intercept": 0.37, "coefficients": [0.0, 0.5, 0.5] }
//! }
//! ```
//!
//! Tree based models use the flat node arrays of a fitted decision tree.

use serde::{Deserialize, Serialize};

use crate::models::{FEATURE_NAMES, PriceFeatureRow};
use crate::{AdvisorError, Result};

/// Sentinel child index marking a leaf node
const LEAF: i64 = -1;

/// Serialized form of the price model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub model: RegressionModel,
}

impl ModelArtifact {
    /// Deserialize and validate an artifact, returning the model it holds
    pub fn parse(bytes: &[u8]) -> Result<RegressionModel> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)
            .map_err(|e| AdvisorError::model_load(format!("Artifact is not a valid model: {e}")))?;

        if artifact.feature_names != FEATURE_NAMES {
            return Err(AdvisorError::model_load(format!(
                "Incompatible feature schema: expected {:?}, found {:?}",
                FEATURE_NAMES, artifact.feature_names
            )));
        }

        artifact.model.validate()?;
        Ok(artifact.model)
    }
}

/// A trained regressor mapping a [`PriceFeatureRow`] to a price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionModel {
    /// Ordinary least squares fit
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    /// Random forest: mean of tree outputs
    Forest { trees: Vec<RegressionTree> },
    /// Gradient boosting: `init + learning_rate * sum(tree outputs)`
    Boosted {
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    },
}

impl RegressionModel {
    #[must_use]
    pub fn predict(&self, row: &PriceFeatureRow) -> f64 {
        let x = row.as_features();
        match self {
            RegressionModel::Linear {
                intercept,
                coefficients,
            } => {
                intercept
                    + coefficients
                        .iter()
                        .zip(x.iter())
                        .map(|(c, v)| c * v)
                        .sum::<f64>()
            }
            RegressionModel::Forest { trees } => {
                let total: f64 = trees.iter().map(|tree| tree.predict(&x)).sum();
                total / trees.len() as f64
            }
            RegressionModel::Boosted {
                init,
                learning_rate,
                trees,
            } => init + learning_rate * trees.iter().map(|tree| tree.predict(&x)).sum::<f64>(),
        }
    }

    /// Short human-readable description used in logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            RegressionModel::Linear { .. } => "linear regression".to_string(),
            RegressionModel::Forest { trees } => format!("random forest ({} trees)", trees.len()),
            RegressionModel::Boosted { trees, .. } => {
                format!("gradient boosting ({} trees)", trees.len())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            RegressionModel::Linear {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != FEATURE_NAMES.len() {
                    return Err(AdvisorError::model_load(format!(
                        "Linear model has {} coefficients, expected {}",
                        coefficients.len(),
                        FEATURE_NAMES.len()
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(AdvisorError::model_load(
                        "Linear model contains non-finite parameters",
                    ));
                }
                Ok(())
            }
            RegressionModel::Forest { trees } => validate_trees(trees),
            RegressionModel::Boosted {
                init,
                learning_rate,
                trees,
            } => {
                if !init.is_finite() || !learning_rate.is_finite() {
                    return Err(AdvisorError::model_load(
                        "Boosted model contains non-finite parameters",
                    ));
                }
                validate_trees(trees)
            }
        }
    }
}

fn validate_trees(trees: &[RegressionTree]) -> Result<()> {
    if trees.is_empty() {
        return Err(AdvisorError::model_load("Ensemble contains no trees"));
    }
    for (index, tree) in trees.iter().enumerate() {
        tree.validate()
            .map_err(|e| AdvisorError::model_load(format!("Tree {index}: {e}")))?;
    }
    Ok(())
}

/// A fitted decision tree in flat array form.
///
/// Node `i` is a leaf when `children_left[i] == -1`; otherwise samples with
/// `x[feature[i]] <= threshold[i]` go left.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl RegressionTree {
    /// Walk from the root to a leaf. Only valid on validated trees.
    #[must_use]
    pub fn predict(&self, x: &[f64; 3]) -> f64 {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        self.value[node]
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("node arrays differ in length".to_string());
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == LEAF {
                if right != LEAF {
                    return Err(format!("node {i} has only one child"));
                }
                if !self.value[i].is_finite() {
                    return Err(format!("leaf {i} has a non-finite value"));
                }
                continue;
            }
            // children always follow their parent, which also rules out cycles
            let in_range = |child: i64| child > i as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(format!("node {i} has out-of-range children"));
            }
            let feature = self.feature[i];
            if feature < 0 || feature as usize >= FEATURE_NAMES.len() {
                return Err(format!("node {i} splits on unknown feature {feature}"));
            }
            if self.threshold[i].is_nan() {
                return Err(format!("node {i} has a NaN threshold"));
            }
        }
        Ok(())
    }
}
