//! Configuration: embedded defaults, an optional local file, then environment
//! variables prefixed `HORIZON__`.

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GraphConfigurationError;
use crate::skills::catalog::{builtin_graph, FOUNDATIONAL_VERSION};
use crate::skills::{FoundationalSet, SkillGraph};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-step limit for profile, skill and career analyses.
    pub step_timeout_ms: u64,
    pub synthesis_timeout_ms: u64,
}

impl PipelineConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesis_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: 5_000,
            synthesis_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGraphConfig {
    /// TOML dependency table. The built-in catalog is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub foundational_version: String,
    pub foundational: Vec<String>,
}

impl Default for SkillGraphConfig {
    fn default() -> Self {
        Self {
            path: None,
            foundational_version: FOUNDATIONAL_VERSION.to_string(),
            foundational: vec![
                "git".to_string(),
                "linux".to_string(),
                "programming_basics".to_string(),
            ],
        }
    }
}

impl SkillGraphConfig {
    /// Build and validate the graph and foundational set.
    pub fn load(&self) -> Result<(SkillGraph, FoundationalSet), GraphConfigurationError> {
        let graph = match &self.path {
            Some(path) => SkillGraph::from_toml_file(path)?,
            None => builtin_graph()?,
        };
        let foundational = FoundationalSet::new(
            self.foundational_version.clone(),
            self.foundational.iter().cloned(),
            &graph,
        )?;
        Ok((graph, foundational))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub pipeline: PipelineConfig,
    pub skill_graph: SkillGraphConfig,
}

impl Settings {
    /// Defaults, then `path` (required) or else `horizon.toml` in the working
    /// directory if present, then the environment.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        let builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("horizon").required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix("HORIZON")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("skill_graph.foundational")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.step_timeout_ms == 0 {
            return Err(anyhow!("pipeline.step_timeout_ms cannot be 0"));
        }
        if self.pipeline.synthesis_timeout_ms == 0 {
            return Err(anyhow!("pipeline.synthesis_timeout_ms cannot be 0"));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(anyhow!("Unknown logging format '{}'", self.logging.format));
        }
        if self.skill_graph.foundational.is_empty() {
            return Err(anyhow!("skill_graph.foundational cannot be empty"));
        }
        if self.skill_graph.foundational_version.trim().is_empty() {
            return Err(anyhow!("skill_graph.foundational_version cannot be empty"));
        }
        Ok(())
    }
}
