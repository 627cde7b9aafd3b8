//! Training data loading and chronological splitting

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{McpError, Result};
use crate::inference::sanitize;

const SECONDS_PER_DAY: i64 = 86_400;

/// Training rows in chronological order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    /// Unix seconds, one per row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<i64>>,
}

impl Dataset {
    /// Load and validate a dataset file.
    ///
    /// Every failure, including an inconsistent file, is `TuningUnavailable`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            McpError::TuningUnavailable(format!("training data {} unreadable: {}", path.display(), e))
        })?;
        let mut dataset: Self = serde_json::from_str(&content).map_err(|e| {
            McpError::TuningUnavailable(format!("training data {} invalid: {}", path.display(), e))
        })?;
        dataset.validate().map_err(|e| {
            McpError::TuningUnavailable(format!("training data {} rejected: {}", path.display(), e))
        })?;

        let replaced: usize = dataset.rows.iter_mut().map(|row| sanitize(row)).sum();
        if replaced > 0 {
            log::debug!("Replaced {} non-finite training values with 0", replaced);
        }
        Ok(dataset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(McpError::InvalidParameters("training data lists no features".to_string()));
        }
        if self.rows.len() != self.targets.len() {
            return Err(McpError::InvalidParameters(format!(
                "training data has {} rows but {} targets",
                self.rows.len(),
                self.targets.len()
            )));
        }
        if let Some(i) = self.rows.iter().position(|r| r.len() != self.features.len()) {
            return Err(McpError::InvalidParameters(format!(
                "training row {} has {} values, expected {}",
                i,
                self.rows[i].len(),
                self.features.len()
            )));
        }
        if let Some(i) = self.targets.iter().position(|t| !t.is_finite()) {
            return Err(McpError::InvalidParameters(format!("training target {} is not finite", i)));
        }
        if let Some(ts) = &self.timestamps
            && ts.len() != self.rows.len()
        {
            return Err(McpError::InvalidParameters(format!(
                "training data has {} timestamps for {} rows",
                ts.len(),
                self.rows.len()
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only rows within `days` of the last timestamp.
    ///
    /// Without timestamps, or with `days == 0`, the dataset is unchanged.
    pub fn trailing_window(mut self, days: u32) -> Self {
        let Some(ts) = self.timestamps.as_ref() else {
            return self;
        };
        let Some(&last) = ts.last() else {
            return self;
        };
        if days == 0 {
            return self;
        }

        let cutoff = last.saturating_sub(i64::from(days) * SECONDS_PER_DAY);
        let start = ts.iter().position(|&t| t >= cutoff).unwrap_or(ts.len());
        if start > 0 {
            log::debug!("Dropping {} rows older than {} days", start, days);
            self.rows.drain(..start);
            self.targets.drain(..start);
            if let Some(ts) = self.timestamps.as_mut() {
                ts.drain(..start);
            }
        }
        self
    }

    /// Split into a leading training part and a trailing holdout part.
    ///
    /// Both parts keep at least one row; fewer than two rows cannot be split.
    pub fn split(&self, holdout_fraction: f64) -> Result<(Slice<'_>, Slice<'_>)> {
        let n = self.len();
        if n < 2 {
            return Err(McpError::TuningUnavailable(format!(
                "need at least 2 training rows, have {}",
                n
            )));
        }
        let fraction = if holdout_fraction.is_finite() {
            holdout_fraction.clamp(0.0, 1.0)
        } else {
            0.2
        };
        let holdout = ((n as f64) * fraction).round() as usize;
        let cut = n - holdout.clamp(1, n - 1);
        Ok((self.slice(0, cut), self.slice(cut, n)))
    }

    /// All rows as one slice
    pub fn all(&self) -> Slice<'_> {
        self.slice(0, self.len())
    }

    fn slice(&self, start: usize, end: usize) -> Slice<'_> {
        Slice {
            rows: &self.rows[start..end],
            targets: &self.targets[start..end],
        }
    }
}

/// Borrowed range of rows with their targets
#[derive(Debug, Clone, Copy)]
pub struct Slice<'a> {
    pub rows: &'a [Vec<f64>],
    pub targets: &'a [f64],
}

impl Slice<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dataset(n: usize) -> Dataset {
        Dataset {
            features: vec!["x".to_string()],
            rows: (0..n).map(|i| vec![i as f64]).collect(),
            targets: (0..n).map(|i| i as f64 * 2.0).collect(),
            timestamps: Some((0..n as i64).map(|i| i * SECONDS_PER_DAY).collect()),
        }
    }

    #[test]
    fn test_split_is_chronological() {
        let data = dataset(10);
        let (train, holdout) = data.split(0.2).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(holdout.len(), 2);
        assert_eq!(holdout.rows[0], vec![8.0]);
    }

    #[test]
    fn test_split_keeps_both_sides_nonempty() {
        let data = dataset(3);
        let (train, holdout) = data.split(0.0).unwrap();
        assert_eq!((train.len(), holdout.len()), (2, 1));
        let (train, holdout) = data.split(1.0).unwrap();
        assert_eq!((train.len(), holdout.len()), (1, 2));
    }

    #[test]
    fn test_split_too_small() {
        assert!(matches!(dataset(1).split(0.2), Err(McpError::TuningUnavailable(_))));
    }

    #[test]
    fn test_trailing_window() {
        let data = dataset(10).trailing_window(3);
        // days 6, 7, 8, 9
        assert_eq!(data.len(), 4);
        assert_eq!(data.rows[0], vec![6.0]);
        assert_eq!(data.timestamps.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_window_without_timestamps_is_noop() {
        let mut data = dataset(5);
        data.timestamps = None;
        assert_eq!(data.trailing_window(1).len(), 5);
    }

    #[test]
    fn test_validate_rejects_ragged_rows() {
        let mut data = dataset(3);
        data.rows[1].push(1.0);
        assert!(matches!(data.validate(), Err(McpError::InvalidParameters(msg)) if msg.contains("row 1")));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Dataset::load(&dir.path().join("training_data.json")).unwrap_err();
        assert!(matches!(err, McpError::TuningUnavailable(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("training_data.json");
        std::fs::write(
            &path,
            r#"{"features": ["a", "b"], "rows": [[1, 2], [3, 4]], "targets": [0.5, -0.5]}"#,
        )
        .unwrap();
        let data = Dataset::load(&path).unwrap();
        assert_eq!(data.len(), 2);
        assert!(data.timestamps.is_none());
    }

    #[test]
    fn test_window_near_timestamp_floor() {
        let data = Dataset {
            timestamps: Some(vec![i64::MIN, i64::MIN + 1]),
            ..dataset(2)
        };
        let kept = data.trailing_window(u32::MAX);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.timestamps, Some(vec![i64::MIN, i64::MIN + 1]));
    }
}
