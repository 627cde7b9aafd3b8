//! Feature vector preprocessing
//!
//! Builds the model input in cached feature order, default-fills missing
//! features, zeroes non-finite values and measures spread.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{McpError, Result};

/// Feature values as supplied by a caller.
///
/// `None` entries come from JSON `null` and are treated as not-a-number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureInput {
    /// Values keyed by feature name
    Named(HashMap<String, Option<f64>>),
    /// Values already laid out in feature order
    Ordered(Vec<Option<f64>>),
}

impl FeatureInput {
    /// Build a named input from `(name, value)` pairs
    pub fn named<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::Named(pairs.into_iter().map(|(k, v)| (k.into(), Some(v))).collect())
    }

    /// Build an ordered input from raw values
    pub fn ordered(values: impl IntoIterator<Item = f64>) -> Self {
        Self::Ordered(values.into_iter().map(Some).collect())
    }
}

/// Lay the input out in `order`.
///
/// Named features absent from the input are 0. Ordered input must match the
/// feature count exactly. Non-finite values are left in place for `sanitize`.
pub fn build_vector(input: &FeatureInput, order: &[String]) -> Result<Vec<f64>> {
    match input {
        FeatureInput::Named(values) => {
            let unknown: Vec<&str> = values
                .keys()
                .filter(|name| !order.contains(name))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                log::debug!("Ignoring features not in the model: {:?}", unknown);
            }

            Ok(order
                .iter()
                .map(|name| match values.get(name) {
                    Some(Some(value)) => *value,
                    Some(None) => f64::NAN,
                    None => 0.0,
                })
                .collect())
        }
        FeatureInput::Ordered(values) => {
            if values.len() != order.len() {
                return Err(McpError::InvalidParameters(format!(
                    "expected {} feature values, got {}",
                    order.len(),
                    values.len()
                )));
            }
            Ok(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        }
    }
}

/// Replace NaN and infinities with 0. Returns how many values were replaced.
pub fn sanitize(values: &mut [f64]) -> usize {
    let mut replaced = 0;
    for value in values.iter_mut() {
        if !value.is_finite() {
            *value = 0.0;
            replaced += 1;
        }
    }
    replaced
}

/// Population variance; 0 for an empty slice
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
