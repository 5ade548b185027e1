//! Reader configuration

use crate::validation::formats::{FormatRegistry, KeywordContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// How strictly polymorphic bases must list their variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorMode {
    /// Undeclared extensions are linked implicitly
    Allow,
    /// Every extension of a base must be declared by the base
    #[default]
    Forbid,
}

impl fmt::Display for DiscriminatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Forbid => write!(f, "forbid"),
        }
    }
}

impl std::str::FromStr for DiscriminatorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "forbid" => Ok(Self::Forbid),
            _ => Err(format!("Unknown discriminator mode '{}', expected allow or forbid", s)),
        }
    }
}

/// Whether cycles between schemas are accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    #[default]
    Allow,
    Forbid,
}

/// Configuration of the schema reader
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Keywords accepted in addition to JSON-Schema and `x-*` extensions
    pub allowed_keywords: BTreeSet<String>,
    /// Formats and custom keywords of this run
    pub formats: FormatRegistry,
    pub discriminator: DiscriminatorMode,
    pub cycles: CyclePolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            allowed_keywords: BTreeSet::new(),
            formats: FormatRegistry::with_builtins(),
            discriminator: DiscriminatorMode::default(),
            cycles: CyclePolicy::default(),
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept additional keywords
    pub fn with_allowed_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_keywords
            .extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Replace the format registry
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Register a string format, replacing any format of the same name
    pub fn with_format<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.register(name, predicate);
        self
    }

    /// Register a custom keyword with its handler
    pub fn with_keyword<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&KeywordContext, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.formats.register_keyword(name, handler);
        self
    }

    pub fn with_discriminator(mut self, mode: DiscriminatorMode) -> Self {
        self.discriminator = mode;
        self
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycles = policy;
        self
    }

    /// Whether a non-base keyword is accepted by the parser
    pub fn is_keyword_allowed(&self, keyword: &str) -> bool {
        self.allowed_keywords.contains(keyword) || self.formats.has_keyword(keyword)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        for keyword in &self.allowed_keywords {
            if keyword.is_empty() {
                return Err("Allowed keywords must not be empty".to_string());
            }
            if keyword.starts_with('$') {
                return Err(format!("Allowed keyword '{}' must not start with '$'", keyword));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.discriminator, DiscriminatorMode::Forbid);
        assert_eq!(config.cycles, CyclePolicy::Allow);
        assert!(config.formats.contains("date-time"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ReaderConfig::new()
            .with_allowed_keywords(["examples-note"])
            .with_keyword("unit", |_, _| Ok(()))
            .with_format("iban", |s| s.starts_with("DE"))
            .with_discriminator(DiscriminatorMode::Allow)
            .with_cycle_policy(CyclePolicy::Forbid);
        assert!(config.is_keyword_allowed("examples-note"));
        assert!(config.is_keyword_allowed("unit"));
        assert!(!config.is_keyword_allowed("other"));
        assert!(config.formats.contains("iban"));
        assert_eq!(config.discriminator, DiscriminatorMode::Allow);
    }

    #[test]
    fn test_validate_rejects_bad_keywords() {
        let config = ReaderConfig::new().with_allowed_keywords(["$ref2"]);
        assert!(config.validate().is_err());
        assert_eq!("ALLOW".parse::<DiscriminatorMode>().unwrap(), DiscriminatorMode::Allow);
        assert!("maybe".parse::<DiscriminatorMode>().is_err());
    }
}
