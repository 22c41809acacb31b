//! Shared configuration for the analyzer binary and library users.

pub mod config;

pub use config::{AnalyzerConfig, ConfigError, ProtocolEntry};
