//! Hyperparameter tuning
//!
//! `Optimizer::run` loads the training rows, runs a bounded random search
//! with a boosted-tree holdout objective and records the best trial. With
//! `persist_model` set it also refits on every row and swaps the served
//! model and feature list in place.

mod dataset;
mod gbdt;
mod metrics;
mod search;
mod space;

pub use dataset::{Dataset, Slice};
pub use gbdt::{BoostingParams, fit};
pub use metrics::{correlation, directional_accuracy, r_squared};
pub use search::{Evaluation, HoldoutObjective, Objective, RandomSearch, Tuner, TuningResult};
pub use space::{ParamRange, ParamSet, ParamSpace, ParamValue};

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::atomic::write_atomic;
use crate::capability::Capability;
use crate::config::{Config, StorageConfig, TuningConfig};
use crate::error::Result;
use crate::inference::ModelFile;

/// Contents of the best-model record written after every search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestModelRecord {
    pub params: ParamSet,
    pub score: f64,
    pub metrics: BTreeMap<String, f64>,
    pub trials: usize,
    pub trained_at: DateTime<Utc>,
    /// Digest of the persisted model, when one was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_sha256: Option<String>,
}

/// Runs searches against the configured training data
#[derive(Debug, Clone)]
pub struct Optimizer {
    tuning: TuningConfig,
    storage: StorageConfig,
    training_days: u32,
    space: ParamSpace,
}

/// Build the tuning capability from configuration
pub fn optimizer_from_config(config: &Config) -> Capability<Optimizer> {
    if !config.tuning.enabled {
        return Capability::not_configured("tuning disabled by configuration");
    }
    Capability::Ready(Optimizer::new(
        config.tuning.clone(),
        config.storage.clone(),
        config.provider.training_days,
    ))
}

impl Optimizer {
    pub fn new(tuning: TuningConfig, storage: StorageConfig, training_days: u32) -> Self {
        Self {
            tuning,
            storage,
            training_days,
            space: ParamSpace::default(),
        }
    }

    /// Trial count actually run for a request
    pub fn trial_budget(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.tuning.trials)
            .min(self.tuning.max_trials)
            .max(1)
    }

    /// Run a search and record the result
    pub fn run(&self, trials: Option<usize>, seed: Option<u64>) -> Result<TuningResult> {
        let dataset = Dataset::load(&self.storage.training_data_path())?.trailing_window(self.training_days);
        let budget = self.trial_budget(trials);
        log::info!(
            "Starting search: {} trials over {} rows, {} features",
            budget,
            dataset.len(),
            dataset.features.len()
        );

        let objective = HoldoutObjective::new(&dataset, &self.tuning);
        let result = RandomSearch::new(budget, seed).search(&self.space, &objective)?;
        log::info!(
            "Search finished: best score {:.6} with {:?}",
            result.best_score,
            result.best_params
        );

        let model_sha256 = if self.tuning.persist_model {
            Some(self.persist(&dataset, &result.best_params)?)
        } else {
            None
        };

        let record = BestModelRecord {
            params: result.best_params.clone(),
            score: result.best_score,
            metrics: result.metrics.clone(),
            trials: result.trials_run,
            trained_at: Utc::now(),
            model_sha256,
        };
        write_atomic(
            &self.storage.best_model_path(),
            serde_json::to_string_pretty(&record)?.as_bytes(),
        )?;

        Ok(result)
    }

    /// Refit on all rows and replace the served artifacts. Returns the
    /// model digest.
    fn persist(&self, dataset: &Dataset, params: &ParamSet) -> Result<String> {
        let model = fit(dataset.all(), &BoostingParams::from_trial(&self.tuning, params))?;
        let file = ModelFile {
            features: Some(dataset.features.clone()),
            model,
        };
        let model_json = serde_json::to_string_pretty(&file)?;
        let features_json = serde_json::to_string_pretty(&dataset.features)?;

        // The model file carries its own feature order, so it goes first.
        write_atomic(&self.storage.model_path(), model_json.as_bytes())?;
        write_atomic(&self.storage.features_path(), features_json.as_bytes())?;
        log::info!(
            "Persisted refit model to {} ({} rows)",
            self.storage.model_path().display(),
            dataset.len()
        );
        Ok(hex::encode(Sha256::digest(model_json.as_bytes())))
    }
}
