//! Lexicon-based sentiment scoring
//!
//! Produces a compound score in [-1, 1] from a `{word: valence}` lexicon,
//! with the usual negation dampening and `x / sqrt(x^2 + alpha)`
//! normalization.

use std::collections::HashMap;
use std::path::Path;

use crate::capability::Capability;
use crate::error::{McpError, Result};

/// Normalization constant for the compound score
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Valence multiplier applied to a negated word
const NEGATION_SCALAR: f64 = -0.74;

/// How many preceding tokens are checked for a negation
const NEGATION_WINDOW: usize = 3;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere", "without", "cannot",
];

/// Computes a compound sentiment score for free text
pub trait SentimentScorer: Send + Sync {
    /// Compound score in [-1, 1]
    fn compound(&self, text: &str) -> f64;
}

/// Scorer backed by a word valence lexicon
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

impl LexiconScorer {
    /// Create a scorer from an in-memory lexicon
    pub fn new(lexicon: HashMap<String, f64>) -> Self {
        let lexicon = lexicon.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
        Self { lexicon }
    }

    /// Load a JSON `{word: valence}` lexicon
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let lexicon: HashMap<String, f64> = serde_json::from_str(&content)?;
        Ok(Self::new(lexicon))
    }

    fn len(&self) -> usize {
        self.lexicon.len()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token) || token.ends_with("n't")
}

impl SentimentScorer for LexiconScorer {
    fn compound(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut sum = 0.0;

        for (i, token) in tokens.iter().enumerate() {
            let Some(valence) = self.lexicon.get(token) else {
                continue;
            };
            let start = i.saturating_sub(NEGATION_WINDOW);
            let negated = tokens[start..i].iter().any(|t| is_negation(t));
            sum += if negated { valence * NEGATION_SCALAR } else { *valence };
        }

        if sum == 0.0 {
            return 0.0;
        }
        (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
    }
}

/// Build the sentiment capability from an optional lexicon path
pub fn scorer_from_lexicon(path: Option<&Path>) -> Capability<Box<dyn SentimentScorer>> {
    let Some(path) = path else {
        return Capability::not_configured("no sentiment lexicon configured");
    };

    match LexiconScorer::from_file(path) {
        Ok(scorer) => {
            log::info!("Loaded sentiment lexicon with {} words from {}", scorer.len(), path.display());
            Capability::Ready(Box::new(scorer))
        }
        Err(e) => {
            let reason = match e {
                McpError::Io(io) => format!("sentiment lexicon {} unreadable: {}", path.display(), io),
                other => format!("sentiment lexicon {} invalid: {}", path.display(), other),
            };
            log::warn!("{}", reason);
            Capability::NotConfigured(reason)
        }
    }
}
