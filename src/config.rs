use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::orchestration::{WorkerConfig, WorkerKind};
use crate::{tflog_debug, Error, Result};

/// Default time-to-live for cached results (5 minutes).
pub const DEFAULT_CACHE_TTL_MS: u64 = 300_000;

/// Per-task duration estimate for tasks that route to a registered worker.
pub const DEFAULT_ESTIMATE_ROUTED_MS: u64 = 5_000;

/// Per-task duration estimate for tasks with no registered worker.
pub const DEFAULT_ESTIMATE_UNROUTED_MS: u64 = 1_000;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Per-worker overrides keyed by worker kind.
    #[serde(default)]
    pub workers: BTreeMap<WorkerKind, WorkerSettings>,
    /// Extra or overriding task type routes.
    #[serde(default)]
    pub routes: BTreeMap<String, WorkerKind>,
}

/// Orchestrator behaviour switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub enable_caching: bool,
    pub enable_metrics: bool,
    pub cache_ttl_ms: u64,
    pub estimate_routed_ms: u64,
    pub estimate_unrouted_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            enable_metrics: true,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            estimate_routed_ms: DEFAULT_ESTIMATE_ROUTED_MS,
            estimate_unrouted_ms: DEFAULT_ESTIMATE_UNROUTED_MS,
        }
    }
}

impl OrchestratorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn without_caching(mut self) -> Self {
        self.enable_caching = false;
        self
    }

    pub fn without_metrics(mut self) -> Self {
        self.enable_metrics = false;
        self
    }
}

/// Optional overrides applied on top of a worker's own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WorkerSettings {
    pub max_concurrent: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl WorkerSettings {
    pub fn apply(&self, mut base: WorkerConfig) -> WorkerConfig {
        if let Some(max) = self.max_concurrent {
            base.max_concurrent = max;
        }
        if let Some(ms) = self.timeout_ms {
            base.timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.retry_attempts {
            base.retry_attempts = attempts;
        }
        if let Some(ms) = self.retry_delay_ms {
            base.retry_delay = Duration::from_millis(ms);
        }
        base
    }
}

impl Config {
    pub fn taskforge_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskforge"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::taskforge_dir()?.join("taskforge.toml"))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        tflog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tflog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        tflog_debug!(
            "Config loaded: caching={}, metrics={}, workers={}, routes={}",
            config.orchestrator.enable_caching,
            config.orchestrator.enable_metrics,
            config.workers.len(),
            config.routes.len()
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tflog_debug!("Creating config directory: {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tflog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Worker configuration for `kind`: `base` with any file overrides applied.
    pub fn worker_config(&self, kind: &WorkerKind, base: WorkerConfig) -> WorkerConfig {
        match self.workers.get(kind) {
            Some(settings) => settings.apply(base),
            None => base,
        }
    }
}
