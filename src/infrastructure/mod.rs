//! 基础设施层
//!
//! 提供依赖注入容器，以及把通用服务集合桥接到目标注册表的安装入口。

pub mod container;
pub mod setup;

pub use container::{
    BridgeServiceCollection, ContainerRegistry, ServiceCollection, ServiceLifetime, ServiceProvider,
    ServiceRegistry,
};
pub use setup::{register_bridge, register_bridge_with, RegistryBridgeExt};
