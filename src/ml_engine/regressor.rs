//! Per-channel regressors
//!
//! Two backends share the [`Regressor`] capability:
//! - [`LinearRegressor`]: `intercept + Σ coefficient_i · x_i`
//! - [`TreeEnsemble`]: gradient-boosted trees flattened into node arrays,
//!   `base_score + Σ leaf(tree, x)`
//!
//! Both are validated when loaded so inference itself cannot fail.

use serde::{Deserialize, Serialize};

/// One-step-ahead model for a single channel, in scaled space.
pub trait Regressor: Send + Sync + std::fmt::Debug {
    /// Number of features the model was trained on.
    fn input_width(&self) -> usize;

    /// `features` must be exactly `input_width()` long.
    fn predict(&self, features: &[f64]) -> f64;
}

/// Persisted regressor, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorSpec {
    Linear(LinearRegressor),
    TreeEnsemble(TreeEnsemble),
}

impl RegressorSpec {
    /// Check internal consistency and hand back a boxed model.
    pub fn build(self) -> Result<Box<dyn Regressor>, String> {
        match self {
            Self::Linear(m) => {
                if m.coefficients.is_empty() {
                    return Err("linear model has no coefficients".to_string());
                }
                if !m.intercept.is_finite() || m.coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("linear model has non-finite weights".to_string());
                }
                Ok(Box::new(m))
            }
            Self::TreeEnsemble(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
        }
    }
}

// ============================================================================
// Linear
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl Regressor for LinearRegressor {
    fn input_width(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.coefficients.len());
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

// ============================================================================
// Tree Ensemble
// ============================================================================

/// A node in a flattened tree. Node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `x[split] < threshold` goes to `yes`, otherwise `no`; NaN goes to `missing`.
    Split {
        split: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Split {
                    split,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let x = features[*split];
                    idx = if x.is_nan() {
                        *missing
                    } else if x < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub num_features: usize,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Every tree non-empty, every split index in range, and every child
    /// strictly after its parent (rules out cycles).
    fn validate(&self) -> Result<(), String> {
        if self.num_features == 0 {
            return Err("tree ensemble declares zero features".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Leaf { leaf } if !leaf.is_finite() => {
                        return Err(format!("tree {t} node {i}: non-finite leaf"));
                    }
                    TreeNode::Leaf { .. } => {}
                    TreeNode::Split {
                        split,
                        yes,
                        no,
                        missing,
                        ..
                    } => {
                        if *split >= self.num_features {
                            return Err(format!(
                                "tree {t} node {i}: split feature {split} >= num_features {}",
                                self.num_features
                            ));
                        }
                        for child in [yes, no, missing] {
                            if *child <= i || *child >= tree.nodes.len() {
                                return Err(format!(
                                    "tree {t} node {i}: child index {child} out of order or range"
                                ));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Regressor for TreeEnsemble {
    fn input_width(&self) -> usize {
        self.num_features
    }

    fn predict(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.num_features);
        self.base_score + self.trees.iter().map(|t| t.leaf_value(features)).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump_json() -> &'static str {
        r#"{
            "kind": "tree_ensemble",
            "num_features": 2,
            "base_score": 0.5,
            "trees": [
                {"nodes": [
                    {"split": 0, "threshold": 0.3, "yes": 1, "no": 2, "missing": 2},
                    {"leaf": -0.1},
                    {"leaf": 0.2}
                ]},
                {"nodes": [
                    {"split": 1, "threshold": 0.5, "yes": 1, "no": 2, "missing": 1},
                    {"leaf": 0.01},
                    {"leaf": 0.02}
                ]}
            ]
        }"#
    }

    #[test]
    fn linear_prediction() {
        let spec: RegressorSpec = serde_json::from_str(
            r#"{"kind": "linear", "intercept": 1.0, "coefficients": [2.0, -1.0]}"#,
        )
        .unwrap();
        let model = spec.build().unwrap();
        assert_eq!(model.input_width(), 2);
        assert!((model.predict(&[0.5, 0.25]) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn tree_ensemble_walks_each_tree() {
        let model = serde_json::from_str::<RegressorSpec>(stump_json())
            .unwrap()
            .build()
            .unwrap();
        // x0 < 0.3 -> -0.1, x1 >= 0.5 -> 0.02
        assert!((model.predict(&[0.1, 0.9]) - (0.5 - 0.1 + 0.02)).abs() < 1e-12);
        // x0 >= 0.3 -> 0.2, x1 < 0.5 -> 0.01
        assert!((model.predict(&[0.3, 0.1]) - (0.5 + 0.2 + 0.01)).abs() < 1e-12);
    }

    #[test]
    fn nan_follows_missing_branch() {
        let model = serde_json::from_str::<RegressorSpec>(stump_json())
            .unwrap()
            .build()
            .unwrap();
        assert!((model.predict(&[f64::NAN, f64::NAN]) - (0.5 + 0.2 + 0.01)).abs() < 1e-12);
    }

    #[test]
    fn cyclic_tree_is_rejected() {
        let spec: RegressorSpec = serde_json::from_str(
            r#"{"kind": "tree_ensemble", "num_features": 1, "trees": [
                {"nodes": [{"split": 0, "threshold": 0.0, "yes": 0, "no": 1, "missing": 1},
                           {"leaf": 1.0}]}
            ]}"#,
        )
        .unwrap();
        assert!(spec.build().is_err());
    }

    #[test]
    fn split_beyond_width_is_rejected() {
        let spec: RegressorSpec = serde_json::from_str(
            r#"{"kind": "tree_ensemble", "num_features": 1, "trees": [
                {"nodes": [{"split": 3, "threshold": 0.0, "yes": 1, "no": 2, "missing": 1},
                           {"leaf": 1.0}, {"leaf": 2.0}]}
            ]}"#,
        )
        .unwrap();
        assert!(spec.build().is_err());
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        assert!(serde_json::from_str::<RegressorSpec>(r#"{"kind": "svm"}"#).is_err());
    }
}
