//! Configuration management for castup.
//!
//! This module handles loading and saving application configuration from TOML
//! files. Configuration is stored in the user's config directory and created
//! with defaults on first run.

pub mod file;

pub use file::{AudioConfig, CastupConfig, TranscodeConfig, UploadConfig};
