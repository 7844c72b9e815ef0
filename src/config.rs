//! Configuration system.
//!
//! Hierarchical loading, highest precedence last:
//! - `~/.piglet/config.json` (persisted user configuration)
//! - `piglet.toml` (project configuration)
//! - `piglet.local.toml` (git-ignored local overrides)
//! - Environment variables (`PIGLET_*` prefix, `__` section separator)
//!
//! ## Example
//!
//! ```toml
//! # piglet.toml
//! [backend]
//! name = "spark"
//! master = "local[4]"
//!
//! [materialization]
//! base_dir = "/var/lib/piglet/materializations"
//! prob_threshold = 0.8
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! PIGLET_BACKEND__NAME=flinks
//! PIGLET_PROFILING__COLLECTOR_PORT=9090
//! ```

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::mat::{GlobalStrategy, MatSettings};
use crate::plan::CacheMode;
use crate::profiling::markov::{CostStrategy, ProbStrategy};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub profiling: ProfilingConfig,
    #[serde(default)]
    pub materialization: MaterializationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Registered backend name (spark, flinks)
    #[serde(default = "default_backend")]
    pub name: String,

    /// Master string handed to the job runner
    #[serde(default = "default_master")]
    pub master: String,
}

/// Runtime profiling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilingConfig {
    /// Master switch; also folds LOAD mtimes into lineage
    #[serde(default)]
    pub enabled: bool,

    /// Port the collector binds on this host
    #[serde(default = "default_collector_port")]
    pub collector_port: u16,

    /// Location of the persisted Markov model (defaults to
    /// `~/.piglet/profiling.json`)
    #[serde(default)]
    pub profile_path: Option<PathBuf>,

    /// End-of-run notification webhook
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Materialization planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializationConfig {
    /// Directory for cached results and the catalogue
    #[serde(default = "default_mat_dir")]
    pub base_dir: PathBuf,

    /// Minimum benefit for a candidate, milliseconds
    #[serde(default = "default_min_benefit_ms")]
    pub min_benefit_ms: u64,

    /// Minimum reach probability for a candidate
    #[serde(default = "default_prob_threshold")]
    pub prob_threshold: f64,

    /// Sequential write throughput estimate, MiB/s
    #[serde(default = "default_write_throughput")]
    pub write_throughput_mib: u64,

    /// Sequential read throughput estimate, MiB/s
    #[serde(default = "default_read_throughput")]
    pub read_throughput_mib: u64,

    #[serde(default = "default_cost_strategy")]
    pub cost_strategy: CostStrategy,

    #[serde(default = "default_prob_strategy")]
    pub prob_strategy: ProbStrategy,

    #[serde(default = "default_global_strategy")]
    pub global_strategy: GlobalStrategy,

    /// Also splice a CACHE hint at each materialization point
    #[serde(default)]
    pub insert_cache_hint: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_backend() -> String { "spark".to_string() }
fn default_master() -> String { "local[*]".to_string() }
fn default_collector_port() -> u16 { 8080 }
fn default_mat_dir() -> PathBuf { PathBuf::from("materializations") }
fn default_min_benefit_ms() -> u64 { 1_000 }
fn default_prob_threshold() -> f64 { 0.5 }
fn default_write_throughput() -> u64 { 100 }
fn default_read_throughput() -> u64 { 200 }
fn default_cost_strategy() -> CostStrategy { CostStrategy::Max }
fn default_prob_strategy() -> ProbStrategy { ProbStrategy::Max }
fn default_global_strategy() -> GlobalStrategy { GlobalStrategy::AllAboveThreshold }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }

impl Config {
    /// Load configuration from the default locations.
    pub fn load() -> Result<Self, figment::Error> {
        let mut figment = Figment::new();
        if let Ok(home) = std::env::var("HOME") {
            figment = figment.merge(Json::file(
                PathBuf::from(home).join(".piglet").join("config.json"),
            ));
        }
        figment
            .merge(Toml::file("piglet.toml"))
            .merge(Toml::file("piglet.local.toml"))
            .merge(Env::prefixed("PIGLET_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PIGLET_").split("__"))
            .extract()
    }

    /// The materialization planner settings this configuration describes.
    pub fn mat_settings(&self) -> MatSettings {
        MatSettings {
            base_dir: self.materialization.base_dir.clone(),
            min_benefit_ms: self.materialization.min_benefit_ms,
            prob_threshold: self.materialization.prob_threshold,
            write_throughput_mib: self.materialization.write_throughput_mib,
            read_throughput_mib: self.materialization.read_throughput_mib,
            cost_strategy: self.materialization.cost_strategy,
            prob_strategy: self.materialization.prob_strategy,
            global_strategy: self.materialization.global_strategy,
            insert_cache_hint: self.materialization.insert_cache_hint,
            cache_mode: CacheMode::MemoryAndDisk,
        }
    }

    /// Location of the persisted Markov model.
    pub fn profile_path(&self) -> PathBuf {
        self.profiling
            .profile_path
            .clone()
            .unwrap_or_else(crate::profiling::default_profile_path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendConfig::default(),
            profiling: ProfilingConfig::default(),
            materialization: MaterializationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            name: default_backend(),
            master: default_master(),
        }
    }
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        ProfilingConfig {
            enabled: false,
            collector_port: default_collector_port(),
            profile_path: None,
            webhook_url: None,
        }
    }
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        MaterializationConfig {
            base_dir: default_mat_dir(),
            min_benefit_ms: default_min_benefit_ms(),
            prob_threshold: default_prob_threshold(),
            write_throughput_mib: default_write_throughput(),
            read_throughput_mib: default_read_throughput(),
            cost_strategy: default_cost_strategy(),
            prob_strategy: default_prob_strategy(),
            global_strategy: default_global_strategy(),
            insert_cache_hint: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
