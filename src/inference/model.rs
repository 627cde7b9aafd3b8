//! Model artifacts - linear, gradient boosted trees and ensembles
//!
//! The artifact is a tagged JSON document. Every variant is checked against
//! the feature order at load time so prediction never indexes out of range.

use serde::{Deserialize, Serialize};

use crate::error::{McpError, Result};

/// Anything that maps a feature vector to a scalar
pub trait Predictor: Send + Sync {
    /// Predict from a vector laid out in the cached feature order
    fn predict(&self, features: &[f64]) -> f64;
}

/// One node of a regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// `x[feature] <= threshold` goes left, otherwise right
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree stored as a flat node list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Walk from the root to a leaf.
    ///
    /// Walks at most `nodes.len()` steps; a malformed tree yields 0.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
        0.0
    }

    #[cfg(test)]
    pub(crate) fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, TreeNode::Leaf { .. })).count()
    }

    /// Longest root-to-leaf path, counted in splits
    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize, budget: usize) -> usize {
            if budget == 0 {
                return 0;
            }
            match nodes.get(idx) {
                Some(TreeNode::Split { left, right, .. }) => {
                    1 + walk(nodes, *left, budget - 1).max(walk(nodes, *right, budget - 1))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0, self.nodes.len())
    }

    fn validate(&self, feature_count: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= feature_count {
                        return Err(format!(
                            "node {} splits on feature {} but only {} features are selected",
                            i, feature, feature_count
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", i));
                    }
                    if *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {} points outside the tree", i));
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has a non-finite value", i));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Contents of the model file: the artifact plus, when recorded at fit
/// time, the feature order it was fitted on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(flatten)]
    pub model: ModelArtifact,
}

impl ModelFile {
    /// Parse a model file without checking it against any feature order
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| McpError::ModelLoad(format!("Failed to parse model artifact: {}", e)))
    }
}

/// Serialized model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    GradientBoosted {
        base_score: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    },
    /// Mean of the member predictions
    Ensemble { members: Vec<ModelArtifact> },
}

impl ModelArtifact {
    /// Parse an artifact from JSON and check it against the feature count
    pub fn from_json(content: &str, feature_count: usize) -> Result<Self> {
        let artifact: Self = serde_json::from_str(content)
            .map_err(|e| McpError::ModelLoad(format!("Failed to parse model artifact: {}", e)))?;
        artifact.validate(feature_count)?;
        Ok(artifact)
    }

    /// Check structural consistency with the selected features
    pub fn validate(&self, feature_count: usize) -> Result<()> {
        self.check(feature_count).map_err(McpError::ModelLoad)
    }

    fn check(&self, feature_count: usize) -> std::result::Result<(), String> {
        match self {
            Self::Linear { intercept, coefficients } => {
                if coefficients.len() != feature_count {
                    return Err(format!(
                        "linear model has {} coefficients but {} features are selected",
                        coefficients.len(),
                        feature_count
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("linear model has non-finite weights".to_string());
                }
                Ok(())
            }
            Self::GradientBoosted {
                base_score,
                learning_rate,
                trees,
            } => {
                if !base_score.is_finite() || !learning_rate.is_finite() {
                    return Err("boosted model has non-finite base score or learning rate".to_string());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(feature_count).map_err(|e| format!("tree {}: {}", i, e))?;
                }
                Ok(())
            }
            Self::Ensemble { members } => {
                if members.is_empty() {
                    return Err("ensemble has no members".to_string());
                }
                for (i, member) in members.iter().enumerate() {
                    member.check(feature_count).map_err(|e| format!("member {}: {}", i, e))?;
                }
                Ok(())
            }
        }
    }

    /// Short label used in logs and status reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Linear { .. } => "linear",
            Self::GradientBoosted { .. } => "gradient_boosted",
            Self::Ensemble { .. } => "ensemble",
        }
    }
}

impl Predictor for ModelArtifact {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Self::Linear { intercept, coefficients } => {
                intercept + coefficients.iter().zip(features).map(|(w, x)| w * x).sum::<f64>()
            }
            Self::GradientBoosted {
                base_score,
                learning_rate,
                trees,
            } => base_score + learning_rate * trees.iter().map(|t| t.predict(features)).sum::<f64>(),
            Self::Ensemble { members } => {
                if members.is_empty() {
                    return 0.0;
                }
                members.iter().map(|m| m.predict(features)).sum::<f64>() / members.len() as f64
            }
        }
    }
}
