pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::BridgeConfig;
pub use errors::{BridgeError, ConfigError, Result};
pub use infrastructure::container::{
    BridgeServiceCollection, ContainerRegistry, ResolverExt, ServiceCollection, ServiceCollectionExt,
    ServiceDescriptor, ServiceKey, ServiceLifetime, ServiceProvider, ServiceRegistry,
};
pub use infrastructure::setup::{register_bridge, register_bridge_with, RegistryBridgeExt};
