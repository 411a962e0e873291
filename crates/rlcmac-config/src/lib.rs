//! RLC/MAC decoder configuration management
//!
//! This crate provides configuration loading and parsing for the block decoder:
//! - TOML configuration file parsing
//! - Decoder and framing configuration structures

pub mod decoder_config;
pub mod toml_config;

pub use decoder_config::*;
pub use toml_config::*;
