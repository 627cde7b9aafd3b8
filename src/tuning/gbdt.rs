//! Gradient boosted regression trees
//!
//! Squared loss, so every row has gradient `pred - y` and hessian 1. Trees
//! grow leaf-wise: the open leaf with the largest gain is split next until
//! the leaf budget is spent or no split improves the objective. Leaf weights
//! use L1 soft-thresholding of the gradient sum and L2 shrinkage,
//! `w = -T(G) / (H + lambda)` with `T(G) = sign(G) * max(|G| - alpha, 0)`.

use crate::config::TuningConfig;
use crate::error::{McpError, Result};
use crate::inference::{ModelArtifact, RegressionTree, TreeNode};

use super::dataset::Slice;
use super::space::ParamSet;

/// Minimum gain for a split to be taken
const MIN_GAIN: f64 = 1e-12;

/// Settings for one boosting run
#[derive(Debug, Clone, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub num_leaves: usize,
    pub min_samples_leaf: usize,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 0.1,
            max_depth: 6,
            num_leaves: 31,
            min_samples_leaf: 5,
            reg_alpha: 0.0,
            reg_lambda: 0.0,
        }
    }
}

impl BoostingParams {
    /// Combine fixed settings from config with one sampled parameter set
    pub fn from_trial(tuning: &TuningConfig, params: &ParamSet) -> Self {
        let defaults = Self::default();
        let int = |name: &str, fallback: usize| {
            params
                .get(name)
                .map(|v| v.as_i64().max(1) as usize)
                .unwrap_or(fallback)
        };
        let float = |name: &str| params.get(name).map(|v| v.as_f64().max(0.0)).unwrap_or(0.0);

        Self {
            n_estimators: tuning.n_estimators.max(1),
            learning_rate: tuning.learning_rate,
            max_depth: int("max_depth", defaults.max_depth),
            num_leaves: int("num_leaves", defaults.num_leaves),
            min_samples_leaf: tuning.min_samples_leaf.max(1),
            reg_alpha: float("reg_alpha"),
            reg_lambda: float("reg_lambda"),
        }
    }

    fn threshold_l1(&self, grad_sum: f64) -> f64 {
        grad_sum.signum() * (grad_sum.abs() - self.reg_alpha).max(0.0)
    }

    fn leaf_score(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        let t = self.threshold_l1(grad_sum);
        t * t / (hess_sum + self.reg_lambda)
    }

    fn leaf_weight(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        -self.threshold_l1(grad_sum) / (hess_sum + self.reg_lambda)
    }
}

/// Fit a boosted model on the given rows
pub fn fit(train: Slice<'_>, params: &BoostingParams) -> Result<ModelArtifact> {
    if train.is_empty() {
        return Err(McpError::InvalidParameters("cannot fit on zero rows".to_string()));
    }
    let n = train.len();
    let base_score = train.targets.iter().sum::<f64>() / n as f64;
    let mut predictions = vec![base_score; n];
    let mut trees = Vec::with_capacity(params.n_estimators);

    for _ in 0..params.n_estimators {
        let gradients: Vec<f64> = predictions
            .iter()
            .zip(train.targets)
            .map(|(p, y)| p - y)
            .collect();
        let tree = grow_tree(train.rows, &gradients, params);
        for (pred, row) in predictions.iter_mut().zip(train.rows) {
            *pred += params.learning_rate * tree.predict(row);
        }
        trees.push(tree);
    }

    Ok(ModelArtifact::GradientBoosted {
        base_score,
        learning_rate: params.learning_rate,
        trees,
    })
}

#[derive(Debug)]
struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

#[derive(Debug)]
struct OpenLeaf {
    node: usize,
    depth: usize,
    split: SplitChoice,
}

fn grow_tree(rows: &[Vec<f64>], gradients: &[f64], params: &BoostingParams) -> RegressionTree {
    let all: Vec<usize> = (0..rows.len()).collect();
    let root_sum: f64 = gradients.iter().sum();
    let mut nodes = vec![TreeNode::Leaf {
        value: params.leaf_weight(root_sum, all.len() as f64),
    }];

    let mut open = Vec::new();
    if let Some(split) = best_split(rows, gradients, &all, 0, params) {
        open.push(OpenLeaf { node: 0, depth: 0, split });
    }

    let mut leaves = 1;
    while leaves < params.num_leaves {
        let Some(pos) = open
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.split.gain.total_cmp(&b.1.split.gain))
            .map(|(i, _)| i)
        else {
            break;
        };
        let OpenLeaf { node, depth, split } = open.swap_remove(pos);

        let left = nodes.len();
        let right = left + 1;
        for side in [&split.left, &split.right] {
            let sum: f64 = side.iter().map(|&i| gradients[i]).sum();
            nodes.push(TreeNode::Leaf {
                value: params.leaf_weight(sum, side.len() as f64),
            });
        }
        nodes[node] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        leaves += 1;

        for (child, indices) in [(left, split.left), (right, split.right)] {
            if let Some(next) = best_split(rows, gradients, &indices, depth + 1, params) {
                open.push(OpenLeaf {
                    node: child,
                    depth: depth + 1,
                    split: next,
                });
            }
        }
    }

    RegressionTree { nodes }
}

fn best_split(
    rows: &[Vec<f64>],
    gradients: &[f64],
    indices: &[usize],
    depth: usize,
    params: &BoostingParams,
) -> Option<SplitChoice> {
    let min_leaf = params.min_samples_leaf;
    if depth >= params.max_depth || indices.len() < 2 * min_leaf {
        return None;
    }
    let feature_count = rows.get(*indices.first()?)?.len();

    let total_grad: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let parent = params.leaf_score(total_grad, indices.len() as f64);

    let mut best: Option<(usize, f64, f64)> = None;
    let mut order = indices.to_vec();
    for feature in 0..feature_count {
        order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

        let mut left_grad = 0.0;
        for k in 0..order.len() - 1 {
            left_grad += gradients[order[k]];
            let left_n = k + 1;
            let right_n = order.len() - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let here = rows[order[k]][feature];
            let next = rows[order[k + 1]][feature];
            if next <= here {
                continue;
            }

            let gain = params.leaf_score(left_grad, left_n as f64)
                + params.leaf_score(total_grad - left_grad, right_n as f64)
                - parent;
            if gain > MIN_GAIN && best.is_none_or(|(_, _, g)| gain > g) {
                let mid = here + (next - here) / 2.0;
                let threshold = if mid < next { mid } else { here };
                best = Some((feature, threshold, gain));
            }
        }
    }

    let (feature, threshold, gain) = best?;
    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][feature] <= threshold);
    Some(SplitChoice {
        feature,
        threshold,
        gain,
        left,
        right,
    })
}
