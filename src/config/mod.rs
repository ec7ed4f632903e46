//! Configuration for the bridge and its logging.
//!
//! Values come from an optional TOML file and are then overridden by
//! `SERVICE_BRIDGE_*` environment variables.

pub mod bridge_config;
pub mod loader;

pub use bridge_config::{BridgeConfig, BridgeSection, LoggingSection};
pub use loader::ConfigLoader;

