//! Documentation metadata shared by the application, modules and schemas

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in an input file
///
/// `line` and `column` are 1-based. A location with `line == 0` only names
/// the file (used for whole-file errors).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location naming only a file
    pub fn file(file: impl Into<String>) -> Self {
        Self::new(file, 0, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

/// Role of a schema in the domain model (`x-schema-type`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaType {
    Aggregate,
    #[default]
    Entity,
    ValueObject,
    ReferenceData,
    Other,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregate => "Aggregate",
            Self::Entity => "Entity",
            Self::ValueObject => "ValueObject",
            Self::ReferenceData => "ReferenceData",
            Self::Other => "Other",
        }
    }

    /// Aggregates and reference data are expected to ship examples
    pub fn expects_examples(&self) -> bool {
        matches!(self, Self::Aggregate | Self::ReferenceData)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SchemaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aggregate" => Ok(Self::Aggregate),
            "Entity" => Ok(Self::Entity),
            "ValueObject" => Ok(Self::ValueObject),
            "ReferenceData" => Ok(Self::ReferenceData),
            "Other" => Ok(Self::Other),
            _ => Err(format!(
                "Unknown schema type '{}', expected one of Aggregate, Entity, ValueObject, ReferenceData, Other",
                s
            )),
        }
    }
}

/// A link to another resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

impl Link {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

/// Category of a known gap between the domain model and an implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplementationErrorType {
    NotInDomainModel,
    MissingInImplementation,
    Wrong,
    Other,
}

impl ImplementationErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInDomainModel => "NOT_IN_DOMAIN_MODEL",
            Self::MissingInImplementation => "MISSING_IN_IMPLEMENTATION",
            Self::Wrong => "WRONG",
            Self::Other => "OTHER",
        }
    }
}

/// A known gap recorded in the input (`x-errors` / `errors`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationError {
    pub text: String,
    #[serde(rename = "type")]
    pub error_type: ImplementationErrorType,
}

/// A free-form tag (`x-tags` / `tags`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            color: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(SourceLocation::new("a/B.yaml", 3, 7).to_string(), "a/B.yaml:3:7");
        assert_eq!(SourceLocation::file("a/B.yaml").to_string(), "a/B.yaml");
    }

    #[test]
    fn test_schema_type_parse() {
        assert_eq!("Aggregate".parse::<SchemaType>().unwrap(), SchemaType::Aggregate);
        assert!("aggregate".parse::<SchemaType>().is_err());
        assert!(SchemaType::ReferenceData.expects_examples());
        assert!(!SchemaType::default().expects_examples());
    }

    #[test]
    fn test_implementation_error_serde() {
        let error: ImplementationError =
            serde_json::from_str(r#"{"text": "missing", "type": "MISSING_IN_IMPLEMENTATION"}"#)
                .unwrap();
        assert_eq!(error.error_type, ImplementationErrorType::MissingInImplementation);
    }
}
