//! Hyperparameter search space

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Range a single hyperparameter is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamRange {
    /// Inclusive integer range
    Int { low: i64, high: i64 },
    /// Inclusive float range
    Float { low: f64, high: f64 },
}

impl ParamRange {
    fn sample<R: Rng>(&self, rng: &mut R) -> ParamValue {
        match *self {
            Self::Int { low, high } => ParamValue::Int(rng.random_range(low..=high)),
            Self::Float { low, high } => ParamValue::Float(rng.random_range(low..=high)),
        }
    }
}

/// A sampled hyperparameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Int(v) => v,
            Self::Float(v) => v.round() as i64,
        }
    }
}

/// One point in the search space
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Named ranges explored by the search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpace {
    ranges: BTreeMap<String, ParamRange>,
}

impl Default for ParamSpace {
    /// Tree depth, leaf count and the two regularization weights
    fn default() -> Self {
        Self::new()
            .with_int("max_depth", 3, 15)
            .with_int("num_leaves", 20, 150)
            .with_float("reg_alpha", 0.0, 1.0)
            .with_float("reg_lambda", 0.0, 1.0)
    }
}

impl ParamSpace {
    /// Create an empty space
    pub fn new() -> Self {
        Self { ranges: BTreeMap::new() }
    }

    pub fn with_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.ranges.insert(name.into(), ParamRange::Int { low, high });
        self
    }

    pub fn with_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.ranges.insert(name.into(), ParamRange::Float { low, high });
        self
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Draw one value for every parameter
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamSet {
        self.ranges
            .iter()
            .map(|(name, range)| (name.clone(), range.sample(rng)))
            .collect()
    }
}
