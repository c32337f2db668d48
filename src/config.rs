//! Configuration management for the graph pipeline
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (paper-graph.toml)
//! - Environment variables (PAPER_GRAPH__*)
//!
//! ## Example config file (paper-graph.toml):
//! ```toml
//! [paths]
//! input = "data/papers.json"
//! output_dir = "graph"
//!
//! [resolution]
//! priority = [
//!     "Task", "ImagingModality", "AnatomicalStructure",
//!     "Method", "Dataset", "Metric", "Innovation",
//! ]
//!
//! [export]
//! batch_size = 50
//! output_format = "pretty"
//!
//! [embedding]
//! batch_size = 32
//! normalize = true
//! command = ["python3", "embed.py"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embedding::CommandEmbedder;
use crate::error::Result;
use crate::graph::integrity::DEFAULT_MAX_DETAILS;
use crate::graph::{NodeKind, ResolutionPolicy};

/// Main configuration for the graph pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Relation endpoint resolution
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Integrity report settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Statistics report settings
    #[serde(default)]
    pub statistics: StatisticsConfig,

    /// Embedding step settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// File locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON array of paper records
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Directory holding the exported tables
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Integrity report file name, relative to `output_dir`
    #[serde(default = "default_quality_report")]
    pub quality_report: PathBuf,

    /// Statistics report file name, relative to `output_dir`
    #[serde(default = "default_statistics_report")]
    pub statistics_report: PathBuf,
}

/// Resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Kinds probed in order when matching a relation endpoint by name
    #[serde(default = "default_priority")]
    pub priority: Vec<NodeKind>,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Rows per sink batch
    #[serde(default = "default_export_batch_size")]
    pub batch_size: usize,

    /// Output format for JSON reports (pretty or compact)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    /// Serialize a report in this format
    pub fn to_json<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            Self::Pretty => serde_json::to_string_pretty(value),
            Self::Compact => serde_json::to_string(value),
        }
    }
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Invalid-edge details kept in the report
    #[serde(default = "default_max_details")]
    pub max_details: usize,
}

/// Statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Highest-degree nodes listed
    #[serde(default = "default_top_n")]
    pub top_nodes: usize,

    /// Most frequent paper categories listed
    #[serde(default = "default_top_n")]
    pub top_categories: usize,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Texts per model call
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Scale vectors to unit length
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Embedding program and its arguments, see [`CommandEmbedder`]
    #[serde(default)]
    pub command: Vec<String>,
}

impl EmbeddingConfig {
    /// The configured embedding program, if any
    pub fn embedder(&self) -> Option<CommandEmbedder> {
        CommandEmbedder::from_argv(&self.command).ok()
    }
}

// Default value functions
fn default_input() -> PathBuf {
    PathBuf::from("papers.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("graph")
}

fn default_quality_report() -> PathBuf {
    PathBuf::from("quality_report.json")
}

fn default_statistics_report() -> PathBuf {
    PathBuf::from("statistics_report.json")
}

fn default_priority() -> Vec<NodeKind> {
    NodeKind::ENTITIES.to_vec()
}

fn default_export_batch_size() -> usize {
    crate::sink::DEFAULT_BATCH_SIZE
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

fn default_max_details() -> usize {
    DEFAULT_MAX_DETAILS
}

fn default_top_n() -> usize {
    10
}

fn default_embedding_batch_size() -> usize {
    crate::embedding::DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: default_output_dir(),
            quality_report: default_quality_report(),
            statistics_report: default_statistics_report(),
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_export_batch_size(),
            output_format: OutputFormat::Pretty,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_details: default_max_details(),
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            top_nodes: default_top_n(),
            top_categories: default_top_n(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_embedding_batch_size(),
            normalize: true,
            command: Vec::new(),
        }
    }
}

impl GraphConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["paper-graph.toml", ".paper-graph.toml", "config/paper-graph.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        let project_dirs = directories::ProjectDirs::from("org", "paper-graph", "paper-graph");
        if let Some(config_dir) = project_dirs {
            let xdg_config = config_dir.config_dir().join("paper-graph.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        // Load from environment variables (PAPER_GRAPH__EXPORT__BATCH_SIZE, ...)
        builder = builder.add_source(
            Environment::with_prefix("PAPER_GRAPH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Resolution policy built from the configured priority
    pub fn policy(&self) -> Result<ResolutionPolicy> {
        ResolutionPolicy::new(self.resolution.priority.clone())
    }

    /// Full path of the integrity report
    pub fn quality_report_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.quality_report)
    }

    /// Full path of the statistics report
    pub fn statistics_report_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.statistics_report)
    }
}
