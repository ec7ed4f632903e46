//! 依赖注入容器
//!
//! - [`ServiceCollection`]：调用方编写注册逻辑时使用的通用集合
//! - [`ServiceRegistry`] / [`ContainerRegistry`]：权威的目标注册表
//! - [`BridgeServiceCollection`]：把集合的每次插入同步到目标注册表
//! - [`ServiceProvider`]：由集合构建，供桥接注册的工厂解析依赖

pub mod adapter;
pub mod collection;
pub mod descriptor;
mod engine;
pub mod key;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use adapter::{BridgeOptions, BridgeServiceCollection, SharedServiceCollection};
pub use collection::{ServiceCollection, ServiceCollectionExt, ServiceDescriptors};
pub use descriptor::{ImplementationKind, ImplementationType, Injectable, ServiceDescriptor, ServiceFactory};
pub use key::{AnyArc, ServiceKey};
pub use provider::{ProviderScope, ServiceProvider};
pub use registry::{Activator, ContainerRegistry, ContainerStats, RegistryScope, ServiceRegistry};
pub use resolver::{Resolver, ResolverExt};

/// 服务生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// Single instance for the entire container lifetime
    Singleton,
    /// Per-scope instance (shared within active scope)
    Scoped,
    /// New instance per resolve
    Transient,
}
