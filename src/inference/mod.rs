//! Inference - cached model, preprocessing pipeline and smoothing
//!
//! `InferenceService::predict` runs the full pipeline: refresh the cache,
//! build the vector in feature order, zero non-finite values, inject the
//! sentiment score, short-circuit low-variance inputs, predict and smooth.

mod cache;
mod model;
mod preprocess;
mod sentiment;
mod smoothing;

pub use cache::{ArtifactPaths, CacheStatus, LoadedModel, ModelCache};
pub use model::{ModelArtifact, ModelFile, Predictor, RegressionTree, TreeNode};
pub use preprocess::{FeatureInput, build_vector, sanitize, variance};
pub use sentiment::{LexiconScorer, SentimentScorer, scorer_from_lexicon};
pub use smoothing::Smoother;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::config::{Config, InferenceConfig};
use crate::error::{McpError, Result};

/// One prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub features: FeatureInput,
    /// Free text scored for sentiment when a scorer is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl PredictionRequest {
    pub fn new(features: FeatureInput) -> Self {
        Self { features, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Result of the prediction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub prediction: f64,
    /// Input spread fell below the threshold and the model was not invoked
    pub low_variance: bool,
    /// Model output before smoothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<f64>,
    pub generation: u64,
}

/// Cache, sentiment capability and smoothing state behind one handle
pub struct InferenceService {
    cache: ModelCache,
    sentiment: Capability<Box<dyn SentimentScorer>>,
    smoother: Mutex<Smoother>,
    settings: InferenceConfig,
}

impl std::fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceService")
            .field("cache", &self.cache)
            .field("sentiment", &self.sentiment.is_ready())
            .field("settings", &self.settings)
            .finish()
    }
}

impl InferenceService {
    /// Create a service over an explicit cache and sentiment capability
    pub fn new(
        cache: ModelCache,
        sentiment: Capability<Box<dyn SentimentScorer>>,
        settings: InferenceConfig,
    ) -> Self {
        let smoother = Mutex::new(Smoother::new(settings.smoothing, settings.smoothing_alpha));
        Self {
            cache,
            sentiment,
            smoother,
            settings,
        }
    }

    /// Build the service from configuration
    pub fn from_config(config: &Config) -> Arc<Self> {
        let paths = ArtifactPaths::new(config.storage.model_path(), config.storage.features_path());
        let sentiment = scorer_from_lexicon(config.inference.sentiment_lexicon.as_deref());
        Arc::new(Self::new(ModelCache::new(paths), sentiment, config.inference.clone()))
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Run the prediction pipeline
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionOutcome> {
        let loaded = self.cache.current()?;

        let mut vector = build_vector(&request.features, &loaded.features)?;
        let replaced = sanitize(&mut vector);
        if replaced > 0 {
            log::debug!("Replaced {} non-finite feature values with 0", replaced);
        }

        if let Some(text) = request.text.as_deref() {
            self.inject_sentiment(text, &loaded.features, &mut vector);
        }

        let spread = variance(&vector);
        if spread < self.settings.low_variance_threshold {
            log::info!(
                "Input variance {:.3e} below threshold {:.3e}, skipping model",
                spread,
                self.settings.low_variance_threshold
            );
            return Ok(PredictionOutcome {
                prediction: 0.0,
                low_variance: true,
                raw: None,
                generation: loaded.generation,
            });
        }

        let raw = loaded.model.predict(&vector);
        let prediction = {
            let mut smoother = self
                .smoother
                .lock()
                .map_err(|_| McpError::Internal("smoothing state lock poisoned".to_string()))?;
            smoother.apply(loaded.generation, raw)
        };

        Ok(PredictionOutcome {
            prediction,
            low_variance: false,
            raw: Some(raw),
            generation: loaded.generation,
        })
    }

    fn inject_sentiment(&self, text: &str, features: &[String], vector: &mut [f64]) {
        let Some(slot) = features.iter().position(|f| f == &self.settings.sentiment_feature) else {
            return;
        };
        match self.sentiment.as_result() {
            Ok(scorer) => {
                let score = scorer.compound(text);
                let score = if score.is_finite() { score } else { 0.0 };
                vector[slot] = score;
            }
            Err(reason) => log::debug!("Sentiment text ignored: {}", reason),
        }
    }

    /// Force a reload of both artifacts
    pub fn reload(&self) -> Result<Arc<LoadedModel>> {
        self.cache.reload()
    }

    pub fn status(&self) -> CacheStatus {
        self.cache.status()
    }
}
