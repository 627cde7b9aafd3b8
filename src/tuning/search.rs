//! Random search over a parameter space

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::TuningConfig;
use crate::error::Result;
use crate::inference::{ModelArtifact, Predictor};

use super::dataset::Dataset;
use super::gbdt::{self, BoostingParams};
use super::metrics;
use super::space::{ParamSet, ParamSpace};

/// Score of one trial, higher is better
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub metrics: BTreeMap<String, f64>,
}

/// Something that can score a parameter set
pub trait Objective {
    fn evaluate(&self, params: &ParamSet) -> Result<Evaluation>;
}

/// Outcome of a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    pub trials_run: usize,
    pub metrics: BTreeMap<String, f64>,
}

/// A search strategy
pub trait Tuner {
    fn search(&mut self, space: &ParamSpace, objective: &dyn Objective) -> Result<TuningResult>;
}

/// Uniform random sampling for a fixed number of trials
#[derive(Debug)]
pub struct RandomSearch {
    trials: usize,
    rng: StdRng,
}

impl RandomSearch {
    /// Seeded search is reproducible; without a seed the OS seeds it
    pub fn new(trials: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            trials: trials.max(1),
            rng,
        }
    }

    pub fn trials(&self) -> usize {
        self.trials
    }
}

impl Tuner for RandomSearch {
    fn search(&mut self, space: &ParamSpace, objective: &dyn Objective) -> Result<TuningResult> {
        let mut best: Option<(ParamSet, Evaluation)> = None;

        for trial in 0..self.trials {
            let params = space.sample(&mut self.rng);
            let eval = objective.evaluate(&params)?;
            let score = if eval.score.is_finite() { eval.score } else { f64::NEG_INFINITY };
            log::debug!("Trial {}/{} score {:.6} params {:?}", trial + 1, self.trials, score, params);

            if best.as_ref().is_none_or(|(_, b)| score > b.score) {
                log::info!("Trial {} improved best score to {:.6}", trial + 1, score);
                best = Some((params, Evaluation { score, ..eval }));
            }
        }

        let (best_params, eval) = best.unwrap_or_default();
        Ok(TuningResult {
            best_params,
            best_score: eval.score,
            trials_run: self.trials,
            metrics: eval.metrics,
        })
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self {
            score: f64::NEG_INFINITY,
            metrics: BTreeMap::new(),
        }
    }
}

/// Fit boosted trees on the leading rows and score R^2 on the trailing rows
#[derive(Debug)]
pub struct HoldoutObjective<'a> {
    dataset: &'a Dataset,
    tuning: &'a TuningConfig,
}

impl<'a> HoldoutObjective<'a> {
    pub fn new(dataset: &'a Dataset, tuning: &'a TuningConfig) -> Self {
        Self { dataset, tuning }
    }

    /// Fit and return the model alongside its evaluation
    pub fn fit_and_score(&self, params: &ParamSet) -> Result<(ModelArtifact, Evaluation)> {
        let (train, holdout) = self.dataset.split(self.tuning.holdout_fraction)?;
        let model = gbdt::fit(train, &BoostingParams::from_trial(self.tuning, params))?;

        let predicted: Vec<f64> = holdout.rows.iter().map(|row| model.predict(row)).collect();
        let r2 = metrics::r_squared(holdout.targets, &predicted);
        let metrics = BTreeMap::from([
            ("r2".to_string(), r2),
            (
                "directional_accuracy".to_string(),
                metrics::directional_accuracy(holdout.targets, &predicted),
            ),
            (
                "correlation".to_string(),
                metrics::correlation(holdout.targets, &predicted),
            ),
        ]);
        Ok((model, Evaluation { score: r2, metrics }))
    }
}

impl Objective for HoldoutObjective<'_> {
    fn evaluate(&self, params: &ParamSet) -> Result<Evaluation> {
        self.fit_and_score(params).map(|(_, eval)| eval)
    }
}
