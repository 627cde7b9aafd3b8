use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub tuning: TuningConfig,
    pub inference: InferenceConfig,
    pub git: GitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub competition: String,
    pub topic_id: String,
    pub token: String,
    pub timeframe: String,
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            competition: "competition19".to_string(),
            topic_id: "65".to_string(),
            token: "BTC".to_string(),
            timeframe: "8h".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 8001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub model_file: String,
    pub features_file: String,
    pub best_model_file: String,
    pub training_data_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            workspace_dir: PathBuf::from("."),
            model_file: "model.json".to_string(),
            features_file: "selected_features.json".to_string(),
            best_model_file: "best_model.json".to_string(),
            training_data_file: "training_data.json".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }

    pub fn features_path(&self) -> PathBuf {
        self.data_dir.join(&self.features_file)
    }

    pub fn best_model_path(&self) -> PathBuf {
        self.data_dir.join(&self.best_model_file)
    }

    pub fn training_data_path(&self) -> PathBuf {
        self.data_dir.join(&self.training_data_file)
    }
}

/// External market-data provider settings. Credentials are carried for
/// collectors that run next to the service; they are never logged.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub training_days: u32,
    pub cg_api_key: Option<String>,
    pub helius_api_key: Option<String>,
    pub helius_rpc_url: String,
    pub bitquery_api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "binance".to_string(),
            training_days: 365,
            cg_api_key: None,
            helius_api_key: None,
            helius_rpc_url: "https://mainnet.helius-rpc.com".to_string(),
            bitquery_api_key: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("training_days", &self.training_days)
            .field("cg_api_key", &redact(&self.cg_api_key))
            .field("helius_api_key", &redact(&self.helius_api_key))
            .field("helius_rpc_url", &self.helius_rpc_url)
            .field("bitquery_api_key", &redact(&self.bitquery_api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub enabled: bool,
    pub trials: usize,
    pub max_trials: usize,
    pub holdout_fraction: f64,
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub min_samples_leaf: usize,
    pub persist_model: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trials: 50,
            max_trials: 200,
            holdout_fraction: 0.2,
            n_estimators: 50,
            learning_rate: 0.1,
            min_samples_leaf: 5,
            persist_model: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingMode {
    None,
    Ewm,
}

impl FromStr for SmoothingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "ewm" => Ok(Self::Ewm),
            other => Err(format!("unknown smoothing mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub low_variance_threshold: f64,
    pub smoothing: SmoothingMode,
    pub smoothing_alpha: f64,
    pub sentiment_feature: String,
    pub sentiment_lexicon: Option<PathBuf>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            low_variance_threshold: 1e-4,
            smoothing: SmoothingMode::Ewm,
            smoothing_alpha: 0.1,
            sentiment_feature: "vader_sentiment_compound".to_string(),
            sentiment_lexicon: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub repo_root: PathBuf,
    pub remote: String,
    pub default_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            remote: "origin".to_string(),
            default_branch: "main".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment overrides through the given lookup.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = text("COMPETITION") {
            self.service.competition = v;
        }
        if let Some(v) = text("TOPIC_ID") {
            self.service.topic_id = v;
        }
        if let Some(v) = text("TOKEN") {
            self.service.token = v;
        }
        if let Some(v) = text("TIMEFRAME") {
            self.service.timeframe = v;
        }
        if let Some(v) = text("BIND_ADDRESS") {
            self.service.bind_address = v;
        }
        if let Some(port) = parsed(&text, "MCP_PORT").or_else(|| parsed(&text, "FLASK_PORT")) {
            self.service.port = port;
        }

        if let Some(v) = text("DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Some(v) = text("WORKSPACE_DIR") {
            self.storage.workspace_dir = PathBuf::from(v);
        }

        if let Some(v) = text("DATA_PROVIDER") {
            self.provider.name = v;
        }
        if let Some(days) = parsed(&text, "TRAINING_DAYS") {
            self.provider.training_days = days;
        }
        if let Some(v) = text("CG_API_KEY") {
            self.provider.cg_api_key = Some(v);
        }
        if let Some(v) = text("HELIUS_API_KEY") {
            self.provider.helius_api_key = Some(v);
        }
        if let Some(v) = text("HELIUS_RPC_URL") {
            self.provider.helius_rpc_url = v;
        }
        if let Some(v) = text("BITQUERY_API_KEY") {
            self.provider.bitquery_api_key = Some(v);
        }

        if let Some(enabled) = parsed(&text, "TUNING_ENABLED") {
            self.tuning.enabled = enabled;
        }
        if let Some(trials) = parsed(&text, "TUNING_TRIALS") {
            self.tuning.trials = trials;
        }

        if let Some(threshold) = parsed(&text, "LOW_VARIANCE_THRESHOLD") {
            self.inference.low_variance_threshold = threshold;
        }
        if let Some(mode) = parsed(&text, "SMOOTHING") {
            self.inference.smoothing = mode;
        }
        if let Some(alpha) = parsed(&text, "SMOOTHING_ALPHA") {
            self.inference.smoothing_alpha = alpha;
        }
        if let Some(v) = text("SENTIMENT_LEXICON") {
            self.inference.sentiment_lexicon = Some(PathBuf::from(v));
        }

        if let Some(v) = text("GIT_REPO_ROOT") {
            self.git.repo_root = PathBuf::from(v);
        }
        if let Some(v) = text("GIT_REMOTE") {
            self.git.remote = v;
        }
        if let Some(v) = text("GIT_BRANCH") {
            self.git.default_branch = v;
        }
    }
}

fn parsed<T, F>(text: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = text(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}
