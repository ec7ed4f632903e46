//! 桥接安装入口
//!
//! 一次完整的安装流程：创建桥接集合 → 把桥接集合本身注册为服务 →
//! 执行调用方的注册逻辑 → 构建服务提供者 → 把服务提供者注册为服务。
//! 每个目标注册表只能执行一次。

use crate::config::BridgeConfig;
use crate::errors::{BridgeError, Result};
use crate::infrastructure::container::{
    BridgeOptions, BridgeServiceCollection, ServiceCollection, ServiceKey, ServiceProvider,
    ServiceRegistry, SharedServiceCollection,
};
use crate::logging::OperationTimer;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// 桥接集合在目标注册表中的标识，解析结果是 [`SharedServiceCollection`]
pub fn bridge_key() -> ServiceKey {
    ServiceKey::of::<Mutex<BridgeServiceCollection>>()
}

/// 服务提供者在目标注册表中的标识
pub fn provider_key() -> ServiceKey {
    ServiceKey::of::<ServiceProvider>()
}

/// 把通用服务集合上的注册逻辑桥接到目标注册表
///
/// 注册逻辑执行期间桥接集合处于加锁状态，不要在其中再次解析并锁定桥接集合。
pub fn register_bridge<R, F>(registry: &Arc<R>, register: F) -> Result<()>
where
    R: ServiceRegistry + 'static,
    F: FnOnce(&mut dyn ServiceCollection) -> Result<()>,
{
    run_setup(registry, BridgeOptions::default(), register)
}

/// 同 [`register_bridge`]，桥接选项取自配置
pub fn register_bridge_with<R, F>(registry: &Arc<R>, config: &BridgeConfig, register: F) -> Result<()>
where
    R: ServiceRegistry + 'static,
    F: FnOnce(&mut dyn ServiceCollection) -> Result<()>,
{
    run_setup(registry, config.bridge_options(), register)
}

fn run_setup<R, F>(registry: &Arc<R>, options: BridgeOptions, register: F) -> Result<()>
where
    R: ServiceRegistry + 'static,
    F: FnOnce(&mut dyn ServiceCollection) -> Result<()>,
{
    let timer = OperationTimer::new("register_bridge")
        .with_metadata("strict_records", &options.strict_records.to_string());

    if registry.is_registered(&bridge_key()) {
        return Err(BridgeError::IllegalState(
            "a bridge has already been registered with this registry".to_string(),
        ));
    }

    let bridge: SharedServiceCollection = Arc::new(Mutex::new(
        BridgeServiceCollection::with_options(registry, options),
    ));
    registry.register_instance(bridge_key(), bridge.clone())?;

    let (provider, descriptors) = {
        let mut services = bridge.lock();
        register(&mut *services)?;
        (services.build()?, services.len())
    };
    registry.register_instance(provider_key(), provider.clone())?;

    info!(
        provider_id = %provider.id(),
        descriptors,
        "Service collection bridged into registry"
    );
    timer.finish();
    Ok(())
}

/// 以方法形式调用安装入口
pub trait RegistryBridgeExt {
    fn register_bridge<F>(&self, register: F) -> Result<()>
    where
        F: FnOnce(&mut dyn ServiceCollection) -> Result<()>;
}

impl<R: ServiceRegistry + 'static> RegistryBridgeExt for Arc<R> {
    fn register_bridge<F>(&self, register: F) -> Result<()>
    where
        F: FnOnce(&mut dyn ServiceCollection) -> Result<()>,
    {
        register_bridge(self, register)
    }
}
