//! Configuration for the `doppel` maintenance binary.

pub mod config;

pub use config::{IndexerConfig, PluginSpec, SignatureSpec};
