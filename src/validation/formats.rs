//! Registry of string formats and custom schema keywords
//!
//! A registry is owned by the `ReaderConfig` of a run. Registering a name a
//! second time replaces the earlier entry, built-ins included.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::debug;

use crate::models::SourceLocation;

/// Predicate over string values
pub type StringPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Predicate over numeric values
pub type NumericPredicate = Arc<dyn Fn(&serde_json::Number) -> bool + Send + Sync>;

/// Handler for a custom keyword; returns a message for an invalid value
pub type KeywordHandler = Arc<dyn Fn(&KeywordContext, &Value) -> Result<(), String> + Send + Sync>;

/// Where a custom keyword occurs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordContext {
    pub schema_id: String,
    pub keyword: String,
    pub location: SourceLocation,
}

/// A registered format check
#[derive(Clone)]
pub enum FormatCheck {
    String(StringPredicate),
    Numeric(NumericPredicate),
    /// Documentation-only format, every value matches
    Annotation,
}

impl FormatCheck {
    /// `None` when the format does not apply to the value's type
    pub fn check(&self, value: &Value) -> Option<bool> {
        match (self, value) {
            (Self::String(predicate), Value::String(s)) => Some(predicate(s)),
            (Self::Numeric(predicate), Value::Number(n)) => Some(predicate(n)),
            (Self::Annotation, _) => Some(true),
            _ => None,
        }
    }
}

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})$").unwrap()
});

static ISO_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}(:\d{2})?)(\.\d+)?(Z|[+-]\d{2}(:?\d{2})?)?$").unwrap()
});

static ISO_DATE_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})T(\d{2}:\d{2}(:\d{2})?(\.\d+)?)(Z|[+-]\d{2}(:?\d{2})?)?$")
        .unwrap()
});

static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?)$")
        .unwrap()
});

static URI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:[^\s]*$").unwrap());

static URI_REFERENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s]*$").unwrap());

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?|ftp|file)://[^\s/$.?#].[^\s]*$").unwrap());

static URI_TEMPLATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[^\s{}]|\{[^\s{}]+\})*$").unwrap());

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .unwrap()
});

static JSON_POINTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/([^/~]|~[01])*)*$").unwrap());

static RELATIVE_JSON_POINTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0|[1-9][0-9]*)(#|(/([^/~]|~[01])*)*)$").unwrap());

fn is_time(s: &str) -> bool {
    TIME_REGEX
        .captures(s)
        .and_then(|c| c.get(1))
        .is_some_and(|t| NaiveTime::parse_from_str(t.as_str(), "%H:%M:%S").is_ok())
}

fn is_iso_time(s: &str) -> bool {
    ISO_TIME_REGEX.captures(s).and_then(|c| c.get(1)).is_some_and(|t| {
        NaiveTime::parse_from_str(t.as_str(), "%H:%M:%S").is_ok()
            || NaiveTime::parse_from_str(t.as_str(), "%H:%M").is_ok()
    })
}

fn is_iso_date_time(s: &str) -> bool {
    ISO_DATE_TIME_REGEX.captures(s).is_some_and(|c| {
        let date = c.get(1).is_some_and(|d| NaiveDate::parse_from_str(d.as_str(), "%Y-%m-%d").is_ok());
        date && c.get(2).is_some_and(|t| is_iso_time(t.as_str()))
    })
}

fn is_duration(s: &str) -> bool {
    s.len() > 1 && !s.ends_with('T') && DURATION_REGEX.is_match(s)
}

fn is_integer_in(n: &serde_json::Number, min: i64, max: i64) -> bool {
    match n.as_i64() {
        Some(i) => i >= min && i <= max,
        None => false,
    }
}

/// Format and keyword registry of a run
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, FormatCheck>,
    keywords: BTreeMap<String, KeywordHandler>,
}

impl FormatRegistry {
    /// Empty registry without built-in formats
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in formats
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("date", |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
        registry.register("time", is_time);
        registry.register("date-time", |s| DateTime::parse_from_rfc3339(s).is_ok());
        registry.register("iso-time", is_iso_time);
        registry.register("iso-date-time", is_iso_date_time);
        registry.register("duration", is_duration);
        registry.register("uri", |s| URI_REGEX.is_match(s));
        registry.register("uri-reference", |s| URI_REFERENCE_REGEX.is_match(s));
        registry.register("uri-template", |s| URI_TEMPLATE_REGEX.is_match(s));
        registry.register("url", |s| URL_REGEX.is_match(s));
        registry.register("email", |s| EMAIL_REGEX.is_match(s));
        registry.register("hostname", |s| s.len() <= 253 && HOSTNAME_REGEX.is_match(s));
        registry.register("ipv4", |s| s.parse::<Ipv4Addr>().is_ok());
        registry.register("ipv6", |s| s.parse::<Ipv6Addr>().is_ok());
        registry.register("regex", |s| Regex::new(s).is_ok());
        registry.register("uuid", |s| s.len() == 36 && uuid::Uuid::parse_str(s).is_ok());
        registry.register("json-pointer", |s| JSON_POINTER_REGEX.is_match(s));
        registry.register("relative-json-pointer", |s| {
            RELATIVE_JSON_POINTER_REGEX.is_match(s)
        });
        registry.register("byte", |s| BASE64.decode(s).is_ok());
        registry.register_numeric("int32", |n| {
            is_integer_in(n, i64::from(i32::MIN), i64::from(i32::MAX))
        });
        registry.register_numeric("int64", |n| n.is_i64());
        registry.register_numeric("float", |n| {
            n.as_f64().is_some_and(|f| f.abs() <= f64::from(f32::MAX))
        });
        registry.register_numeric("double", |n| n.as_f64().is_some());
        registry.register_annotation("password");
        registry.register_annotation("binary");
        registry
    }

    fn insert(&mut self, name: String, check: FormatCheck) {
        if self.formats.insert(name.clone(), check).is_some() {
            debug!(format = %name, "Format registered again, the new definition wins");
        }
    }

    /// Register a string format
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.insert(name.into(), FormatCheck::String(Arc::new(predicate)));
    }

    /// Register a numeric format
    pub fn register_numeric<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&serde_json::Number) -> bool + Send + Sync + 'static,
    {
        self.insert(name.into(), FormatCheck::Numeric(Arc::new(predicate)));
    }

    /// Register a format every value satisfies
    pub fn register_annotation(&mut self, name: impl Into<String>) {
        self.insert(name.into(), FormatCheck::Annotation);
    }

    /// Register a string format given as a regular expression
    pub fn register_pattern(&mut self, name: impl Into<String>, pattern: &str) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.register(name, move |s| regex.is_match(s));
        Ok(())
    }

    /// Register a custom keyword; the parser accepts it wherever it occurs
    pub fn register_keyword<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&KeywordContext, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.keywords.insert(name.clone(), Arc::new(handler)).is_some() {
            debug!(keyword = %name, "Keyword registered again, the new handler wins");
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormatCheck> {
        self.formats.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn keyword(&self, name: &str) -> Option<&KeywordHandler> {
        self.keywords.get(name)
    }

    pub fn has_keyword(&self, name: &str) -> bool {
        self.keywords.contains_key(name)
    }

    /// Format names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    pub fn keyword_names(&self) -> impl Iterator<Item = &str> {
        self.keywords.keys().map(String::as_str)
    }

    /// Check a value against a named format
    ///
    /// Returns `None` for unknown formats and for values the format does not
    /// apply to.
    pub fn check(&self, name: &str, value: &Value) -> Option<bool> {
        self.formats.get(name).and_then(|f| f.check(value))
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .field("keywords", &self.keywords.keys().collect::<Vec<_>>())
            .finish()
    }
}
