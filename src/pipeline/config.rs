//! Run configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{PipelineError, PipelineResult};
use crate::reader::{CyclePolicy, DiscriminatorMode, ReaderConfig};
use crate::validation::FormatRegistry;

/// Main run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Input root with the application, module and schema documents
    pub input: PathBuf,
    /// Output directory for documentation and generated artifacts
    pub output: PathBuf,
    /// Remove the output directory before writing
    pub clean_output: bool,
    pub reader: ReaderSection,
    /// Custom string formats: name to regex pattern
    pub formats: BTreeMap<String, String>,
    pub markdown: MarkdownSection,
    pub openapi: OpenApiSection,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input"),
            output: PathBuf::from("out"),
            clean_output: false,
            reader: ReaderSection::default(),
            formats: BTreeMap::new(),
            markdown: MarkdownSection::default(),
            openapi: OpenApiSection::default(),
        }
    }
}

/// `[reader]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderSection {
    pub discriminator: DiscriminatorMode,
    pub cycles: CyclePolicy,
    pub allowed_keywords: Vec<String>,
}

/// `[markdown]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownSection {
    pub enabled: bool,
}

impl Default for MarkdownSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// `[openapi]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenApiSection {
    pub enabled: bool,
    /// Server URLs written into every specification
    pub servers: Vec<String>,
    /// Base of the module links; relative to the module page when unset
    pub link_path: Option<String>,
}

impl RunConfig {
    /// Create a new run config
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML
    #[cfg(feature = "config")]
    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        toml::from_str(content).map_err(|e| PipelineError::ConfigError(e.to_string()))
    }

    /// Load a configuration file
    #[cfg(feature = "config")]
    pub fn load(path: impl AsRef<std::path::Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Set the input root
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = path.into();
        self
    }

    /// Set the output directory
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    pub fn with_clean_output(mut self, clean: bool) -> Self {
        self.clean_output = clean;
        self
    }

    pub fn with_discriminator(mut self, mode: DiscriminatorMode) -> Self {
        self.reader.discriminator = mode;
        self
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.reader.cycles = policy;
        self
    }

    /// Register a custom format by pattern
    pub fn with_format(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.formats.insert(name.into(), pattern.into());
        self
    }

    pub fn with_openapi(mut self, enabled: bool) -> Self {
        self.openapi.enabled = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.input.as_os_str().is_empty() {
            return Err("Input path must not be empty".to_string());
        }
        if self.output.as_os_str().is_empty() {
            return Err("Output path must not be empty".to_string());
        }
        if self.input == self.output {
            return Err("Input and output must be different directories".to_string());
        }
        for (name, pattern) in &self.formats {
            if name.is_empty() {
                return Err("Format names must not be empty".to_string());
            }
            Regex::new(pattern).map_err(|e| format!("Invalid pattern for format '{}': {}", name, e))?;
        }
        Ok(())
    }

    /// Reader configuration of this run
    ///
    /// Custom formats are registered on top of the built-ins and replace
    /// built-ins of the same name.
    pub fn reader_config(&self) -> PipelineResult<ReaderConfig> {
        self.validate().map_err(PipelineError::ConfigError)?;
        let mut formats = FormatRegistry::with_builtins();
        for (name, pattern) in &self.formats {
            formats
                .register_pattern(name.clone(), pattern)
                .map_err(|e| PipelineError::ConfigError(format!("Format '{}': {}", name, e)))?;
        }
        let config = ReaderConfig::new()
            .with_formats(formats)
            .with_allowed_keywords(self.reader.allowed_keywords.iter().cloned())
            .with_discriminator(self.reader.discriminator)
            .with_cycle_policy(self.reader.cycles);
        config.validate().map_err(PipelineError::ConfigError)?;
        Ok(config)
    }
}

/// Stages of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Stage 1: Read, resolve and validate the input
    Read,
    /// Stage 2: Clean the output directory (optional)
    Clean,
    /// Stage 3: Run plugins
    Plugins,
    /// Stage 4: Run writers
    Writers,
}

impl PipelineStage {
    /// Get all stages in execution order
    pub fn all() -> Vec<Self> {
        vec![Self::Read, Self::Clean, Self::Plugins, Self::Writers]
    }

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Clean => "clean",
            Self::Plugins => "plugins",
            Self::Writers => "writers",
        }
    }

    /// Get stage description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Read => "Read, resolve and validate the input model",
            Self::Clean => "Remove previous output",
            Self::Plugins => "Update the model and generate plugin output",
            Self::Writers => "Render documentation",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_default() {
        let config = RunConfig::default();
        assert_eq!(config.input, PathBuf::from("input"));
        assert_eq!(config.output, PathBuf::from("out"));
        assert!(config.markdown.enabled);
        assert!(!config.openapi.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new()
            .with_input("model")
            .with_output("docs")
            .with_clean_output(true)
            .with_discriminator(DiscriminatorMode::Allow)
            .with_format("iban", "^[A-Z]{2}[0-9]{2}")
            .with_openapi(true);
        let reader = config.reader_config().unwrap();
        assert_eq!(reader.discriminator, DiscriminatorMode::Allow);
        assert_eq!(reader.formats.check("iban", &"DE12".into()), Some(true));
        assert_eq!(reader.formats.check("iban", &"x".into()), Some(false));
    }

    #[test]
    fn test_validate_rejects_bad_patterns() {
        let config = RunConfig::new().with_format("broken", "([a-z");
        assert!(config.validate().unwrap_err().contains("broken"));
        assert!(matches!(config.reader_config(), Err(PipelineError::ConfigError(_))));

        let config = RunConfig::new().with_input("same").with_output("same");
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_toml() {
        let config = RunConfig::from_toml_str(
            r#"
input = "model"
output = "docs"
clean_output = true

[reader]
discriminator = "allow"
cycles = "forbid"
allowed_keywords = ["unit"]

[formats]
iban = "^[A-Z]{2}"

[openapi]
enabled = true
servers = ["https://api.example.com"]
"#,
        )
        .unwrap();
        assert_eq!(config.reader.cycles, CyclePolicy::Forbid);
        assert_eq!(config.formats.len(), 1);
        assert_eq!(config.openapi.servers, vec!["https://api.example.com"]);

        assert!(RunConfig::from_toml_str("unknown = 1").is_err());
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<&str> = PipelineStage::all().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["read", "clean", "plugins", "writers"]);
    }
}
