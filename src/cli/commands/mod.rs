//! CLI commands

pub mod build;
pub mod check;

use crate::cli::error::CliError;
use crate::pipeline::{PipelineError, RunConfig};
use crate::reader::{CyclePolicy, DiscriminatorMode};
use clap::Args;
use std::path::PathBuf;

/// Options shared by every command reading an input tree
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Configuration file (TOML); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input directory holding the application, module and schema files
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Whether schemas may extend a base that does not declare them (allow, forbid)
    #[arg(long)]
    pub discriminator: Option<DiscriminatorMode>,

    /// Reject cycles between schemas
    #[arg(long)]
    pub forbid_cycles: bool,

    /// Additional keyword accepted in schema files (repeatable)
    #[arg(long = "allow-keyword", value_name = "KEYWORD")]
    pub allowed_keywords: Vec<String>,

    /// Custom format as NAME=REGEX (repeatable)
    #[arg(long = "format", value_name = "NAME=REGEX")]
    pub formats: Vec<String>,
}

impl InputArgs {
    /// Configuration file (or defaults) with the flags applied
    pub fn load_config(&self) -> Result<RunConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if let Some(input) = &self.input {
            config = config.with_input(input);
        }
        if let Some(mode) = self.discriminator {
            config = config.with_discriminator(mode);
        }
        if self.forbid_cycles {
            config = config.with_cycle_policy(CyclePolicy::Forbid);
        }
        config
            .reader
            .allowed_keywords
            .extend(self.allowed_keywords.iter().cloned());
        for format in &self.formats {
            let (name, pattern) = format.split_once('=').ok_or_else(|| {
                CliError::InvalidArgument(format!("Format '{}' must have the form NAME=REGEX", format))
            })?;
            config = config.with_format(name.trim(), pattern);
        }
        Ok(config)
    }
}

pub(crate) fn validate_config(config: &RunConfig) -> Result<(), CliError> {
    config
        .validate()
        .map_err(|e| CliError::Pipeline(PipelineError::ConfigError(e)))
}
