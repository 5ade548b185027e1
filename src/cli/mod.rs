//! CLI module for the domain-schema-docs binary

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
