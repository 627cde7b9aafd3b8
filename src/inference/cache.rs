//! Model cache keyed by artifact modification time
//!
//! One lock guards the whole check-then-reload sequence, so concurrent first
//! requests load the artifacts once and nobody observes a half-updated entry.
//! The loaded entry is handed out as an `Arc` and the lock is released before
//! the caller predicts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{McpError, Result};

use super::model::{ModelArtifact, ModelFile};

/// Locations of the artifacts backing the cache
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub features: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, features: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            features: features.into(),
        }
    }
}

/// A model and its feature order, as read from disk
#[derive(Debug)]
pub struct LoadedModel {
    pub model: ModelArtifact,
    pub features: Vec<String>,
    pub model_mtime: SystemTime,
    pub features_mtime: SystemTime,
    /// Increases by one on every successful load
    pub generation: u64,
    /// Hex SHA-256 of the model artifact bytes
    pub model_sha256: String,
}

#[derive(Debug)]
enum CacheState {
    Empty,
    Loaded(Arc<LoadedModel>),
    /// Last load failed; the next request tries again
    Failed(String),
}

/// Snapshot of the cache for health reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CacheStatus {
    Empty,
    Loaded {
        generation: u64,
        kind: String,
        features: usize,
        model_sha256: String,
    },
    Failed {
        reason: String,
    },
}

/// Process-wide model cache, shared by handle
#[derive(Debug)]
pub struct ModelCache {
    paths: ArtifactPaths,
    state: Mutex<CacheState>,
    loads: AtomicU64,
}

impl ModelCache {
    /// Create an empty cache over the given artifacts
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            state: Mutex::new(CacheState::Empty),
            loads: AtomicU64::new(0),
        }
    }

    /// Number of successful loads since creation
    pub fn reload_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>> {
        self.state
            .lock()
            .map_err(|_| McpError::Internal("model cache lock poisoned".to_string()))
    }

    /// Return the cached model, reloading it first if either artifact's
    /// modification time changed or nothing is cached yet.
    pub fn current(&self) -> Result<Arc<LoadedModel>> {
        let mut state = self.lock()?;

        let mtimes = match (modified(&self.paths.model), modified(&self.paths.features)) {
            (Ok(model), Ok(features)) => (model, features),
            (Err(e), _) | (_, Err(e)) => {
                *state = CacheState::Failed(e.to_string());
                return Err(e);
            }
        };

        if let CacheState::Loaded(loaded) = &*state
            && loaded.model_mtime == mtimes.0
            && loaded.features_mtime == mtimes.1
        {
            return Ok(Arc::clone(loaded));
        }

        self.reload_locked(&mut state)
    }

    /// Reload both artifacts unconditionally
    pub fn reload(&self) -> Result<Arc<LoadedModel>> {
        let mut state = self.lock()?;
        self.reload_locked(&mut state)
    }

    /// Current cache state without touching the filesystem
    pub fn status(&self) -> CacheStatus {
        match self.lock() {
            Ok(state) => match &*state {
                CacheState::Empty => CacheStatus::Empty,
                CacheState::Loaded(loaded) => CacheStatus::Loaded {
                    generation: loaded.generation,
                    kind: loaded.model.kind().to_string(),
                    features: loaded.features.len(),
                    model_sha256: loaded.model_sha256.clone(),
                },
                CacheState::Failed(reason) => CacheStatus::Failed {
                    reason: reason.clone(),
                },
            },
            Err(e) => CacheStatus::Failed { reason: e.to_string() },
        }
    }

    fn reload_locked(&self, state: &mut CacheState) -> Result<Arc<LoadedModel>> {
        let generation = self.reload_count() + 1;
        match load_artifacts(&self.paths, generation) {
            Ok(loaded) => {
                let loaded = Arc::new(loaded);
                self.loads.fetch_add(1, Ordering::SeqCst);
                log::info!(
                    "Loaded {} model generation {} with {} features from {}",
                    loaded.model.kind(),
                    loaded.generation,
                    loaded.features.len(),
                    self.paths.model.display()
                );
                *state = CacheState::Loaded(Arc::clone(&loaded));
                Ok(loaded)
            }
            Err(e) => {
                log::warn!("Model load failed: {}", e);
                *state = CacheState::Failed(e.to_string());
                Err(e)
            }
        }
    }
}

fn modified(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| McpError::ModelLoad(format!("Cannot stat {}: {}", path.display(), e)))
}

fn load_artifacts(paths: &ArtifactPaths, generation: u64) -> Result<LoadedModel> {
    // Stat before reading so a write racing the read shows up as a newer
    // mtime on the next request.
    let model_mtime = modified(&paths.model)?;
    let features_mtime = modified(&paths.features)?;

    let model_bytes = std::fs::read(&paths.model)
        .map_err(|e| McpError::ModelLoad(format!("Failed to read {}: {}", paths.model.display(), e)))?;
    let model_text = std::str::from_utf8(&model_bytes)
        .map_err(|e| McpError::ModelLoad(format!("{} is not UTF-8: {}", paths.model.display(), e)))?;
    let ModelFile { features: declared, model } = ModelFile::from_json(model_text)?;

    // A feature order recorded in the model file wins over the features
    // file, which may belong to a newer or older model mid-replacement.
    let (features, source) = match declared {
        Some(declared) => {
            match read_feature_list(&paths.features) {
                Ok(listed) if listed != declared => log::warn!(
                    "{} disagrees with the feature order recorded in {}, using the recorded order",
                    paths.features.display(),
                    paths.model.display()
                ),
                Ok(_) => {}
                Err(e) => log::warn!("Ignoring features file: {}", e),
            }
            (declared, &paths.model)
        }
        None => (read_feature_list(&paths.features)?, &paths.features),
    };
    if features.is_empty() {
        return Err(McpError::ModelLoad(format!("{} lists no features", source.display())));
    }
    model.validate(features.len())?;

    Ok(LoadedModel {
        model,
        features,
        model_mtime,
        features_mtime,
        generation,
        model_sha256: hex::encode(Sha256::digest(&model_bytes)),
    })
}

fn read_feature_list(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| McpError::ModelLoad(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| McpError::ModelLoad(format!("Failed to parse {}: {}", path.display(), e)))
}
