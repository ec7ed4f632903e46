//! 容器适配器 - 桥接通用服务集合和目标注册表
//!
//! [`BridgeServiceCollection`] 对外是一个普通的 [`ServiceCollection`]，
//! 每次插入都会同步注册到目标注册表。它只支持“建立”注册表，不支持反注册：
//! 移除、替换和清空只作用于本地列表。

use super::collection::{ServiceCollection, ServiceDescriptors};
use super::descriptor::{ImplementationKind, ServiceDescriptor, ServiceFactory};
use super::key::ServiceKey;
use super::provider::ServiceProvider;
use super::registry::{Activator, ServiceRegistry};
use super::ServiceLifetime;
use crate::errors::{BridgeError, Result};
use crate::logging::OperationTimer;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// 作为服务注册到目标注册表中的桥接集合
pub type SharedServiceCollection = Arc<Mutex<BridgeServiceCollection>>;

type ProviderSlot = Arc<RwLock<Option<Arc<ServiceProvider>>>>;

/// 桥接选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeOptions {
    /// 为 true 时空记录返回 `InvalidArgument`，否则静默忽略
    pub strict_records: bool,
}

/// 桥接服务集合
pub struct BridgeServiceCollection {
    registry: Weak<dyn ServiceRegistry>,
    services: ServiceDescriptors,
    /// 工厂包装在调用时才读取，构建前为空
    provider: ProviderSlot,
    options: BridgeOptions,
    disposed: bool,
}

impl BridgeServiceCollection {
    /// 创建与目标注册表关联的桥接集合，桥接不持有注册表
    pub fn new<R: ServiceRegistry + 'static>(registry: &Arc<R>) -> Self {
        Self::with_options(registry, BridgeOptions::default())
    }

    pub fn with_options<R: ServiceRegistry + 'static>(registry: &Arc<R>, options: BridgeOptions) -> Self {
        let registry: Weak<R> = Arc::downgrade(registry);
        let registry: Weak<dyn ServiceRegistry> = registry;
        Self {
            registry,
            services: ServiceDescriptors::new(),
            provider: Arc::new(RwLock::new(None)),
            options,
            disposed: false,
        }
    }

    pub fn options(&self) -> BridgeOptions {
        self.options
    }

    /// 当前持有的服务提供者
    pub fn provider(&self) -> Option<Arc<ServiceProvider>> {
        self.provider.read().clone()
    }

    /// 用当前列表构建服务提供者
    ///
    /// 重复调用会先释放之前的提供者再构建新的，已注册的工厂之后都会使用新的提供者。
    pub fn build(&mut self) -> Result<Arc<ServiceProvider>> {
        self.ensure_alive()?;
        let timer = OperationTimer::new("build_service_provider");

        let previous = self.provider.write().take();
        if let Some(previous) = previous {
            warn!(provider_id = %previous.id(), "Replacing an already built service provider");
            previous.dispose();
        }

        let provider = Arc::new(self.services.build_service_provider());
        *self.provider.write() = Some(provider.clone());

        info!(
            provider_id = %provider.id(),
            descriptors = self.services.len(),
            "Bridge service provider built"
        );
        timer.finish();
        Ok(provider)
    }

    /// 释放持有的服务提供者，可重复调用
    ///
    /// 释放后修改操作和 `build` 返回 `UseAfterRelease`；只读访问（`len`、`get`、
    /// `contains`、`index_of`、`iter`、`descriptors`）不做检查，仍委托给本地列表。
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(provider) = self.provider.read().as_ref() {
            provider.dispose();
        }
        self.disposed = true;
        debug!(descriptors = self.services.len(), "Bridge service collection disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.disposed {
            return Err(BridgeError::UseAfterRelease(
                "bridge service collection has been disposed".to_string(),
            ));
        }
        Ok(())
    }

    fn target_registry(&self) -> Result<Arc<dyn ServiceRegistry>> {
        self.registry.upgrade().ok_or_else(|| {
            BridgeError::UseAfterRelease("target registry has been dropped".to_string())
        })
    }

    fn reject_empty(&self, operation: &str) -> Result<()> {
        self.ensure_alive()?;
        if self.options.strict_records {
            return Err(BridgeError::InvalidArgument(format!(
                "{} called without a service descriptor",
                operation
            )));
        }
        debug!(operation, "Ignoring empty service descriptor");
        Ok(())
    }

    /// 把一条描述同步到目标注册表
    fn mirror(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        let registry = self.target_registry()?;
        let key = descriptor.service_key().clone();
        let lifetime = descriptor.lifetime();

        debug!(
            service = %key,
            lifetime = ?lifetime,
            implementation = ?descriptor.implementation_kind(),
            "Mirroring service descriptor"
        );

        match descriptor.implementation_kind() {
            ImplementationKind::Instance(instance) => {
                registry.register_instance(key, instance.clone())
            }
            ImplementationKind::Factory(factory) => {
                let activator = Activator::Factory(self.deferred(factory.clone(), key.clone()));
                register_with_lifetime(registry.as_ref(), key, lifetime, activator)
            }
            ImplementationKind::Type(implementation) => {
                let activator = Activator::Type(implementation.clone());
                register_with_lifetime(registry.as_ref(), key, lifetime, activator)
            }
        }
    }

    /// 包装工厂：调用时才读取服务提供者
    fn deferred(&self, factory: ServiceFactory, key: ServiceKey) -> ServiceFactory {
        let slot = self.provider.clone();
        ServiceFactory::from_erased(move |_registry| {
            // 先取出提供者再释放读锁，工厂内部可能触发重新构建
            let provider = slot.read().clone().ok_or_else(|| {
                BridgeError::IllegalState(format!(
                    "service {} was requested before the service provider was built",
                    key
                ))
            })?;
            if provider.is_disposed() {
                return Err(BridgeError::UseAfterRelease(format!(
                    "service {} was requested after the service provider was disposed",
                    key
                )));
            }
            factory.call(provider.as_ref())
        })
    }
}

fn register_with_lifetime(
    registry: &dyn ServiceRegistry,
    key: ServiceKey,
    lifetime: ServiceLifetime,
    activator: Activator,
) -> Result<()> {
    match lifetime {
        ServiceLifetime::Singleton => registry.register_singleton(key, activator),
        ServiceLifetime::Scoped => registry.register_scoped(key, activator),
        ServiceLifetime::Transient => registry.register(key, activator),
    }
}

impl ServiceCollection for BridgeServiceCollection {
    fn add(&mut self, descriptor: ServiceDescriptor) -> Result<()> {
        self.ensure_alive()?;
        self.services.add(descriptor.clone())?;
        self.mirror(&descriptor)
    }

    fn add_optional(&mut self, descriptor: Option<ServiceDescriptor>) -> Result<()> {
        match descriptor {
            Some(descriptor) => self.add(descriptor),
            None => self.reject_empty("add"),
        }
    }

    fn insert(&mut self, index: usize, descriptor: ServiceDescriptor) -> Result<()> {
        self.ensure_alive()?;
        self.services.insert(index, descriptor.clone())?;
        self.mirror(&descriptor)
    }

    fn insert_optional(&mut self, index: usize, descriptor: Option<ServiceDescriptor>) -> Result<()> {
        match descriptor {
            Some(descriptor) => self.insert(index, descriptor),
            None => self.reject_empty("insert"),
        }
    }

    fn replace(&mut self, index: usize, descriptor: ServiceDescriptor) -> Result<ServiceDescriptor> {
        self.ensure_alive()?;
        self.services.replace(index, descriptor)
    }

    fn remove_at(&mut self, index: usize) -> Result<ServiceDescriptor> {
        self.ensure_alive()?;
        self.services.remove_at(index)
    }

    fn remove(&mut self, descriptor: &ServiceDescriptor) -> Result<bool> {
        self.ensure_alive()?;
        self.services.remove(descriptor)
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.services.clear()
    }

    fn descriptors(&self) -> &[ServiceDescriptor] {
        self.services.descriptors()
    }
}

impl Drop for BridgeServiceCollection {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for BridgeServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeServiceCollection")
            .field("descriptors", &self.services.len())
            .field("built", &self.provider.read().is_some())
            .field("options", &self.options)
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::collection::ServiceCollectionExt;
    use crate::infrastructure::container::registry::ContainerRegistry;
    use crate::infrastructure::container::resolver::{Resolver, ResolverExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Logger;

    #[derive(Debug)]
    struct Clock(usize);

    fn setup() -> (Arc<ContainerRegistry>, BridgeServiceCollection) {
        let registry = Arc::new(ContainerRegistry::new());
        let bridge = BridgeServiceCollection::new(&registry);
        (registry, bridge)
    }

    #[test]
    fn add_mirrors_instances() {
        let (registry, mut bridge) = setup();
        let logger = Arc::new(Logger);
        bridge.add_instance(logger.clone()).unwrap();

        assert_eq!(bridge.len(), 1);
        assert!(Arc::ptr_eq(&registry.resolve::<Logger>().unwrap(), &logger));
    }

    #[test]
    fn factory_before_build_is_illegal_state() {
        let (registry, mut bridge) = setup();
        bridge.add_transient(|_| Ok(Clock(0))).unwrap();

        let err = registry.resolve::<Clock>().unwrap_err();
        assert!(matches!(err, BridgeError::IllegalState(_)));

        bridge.build().unwrap();
        assert!(registry.resolve::<Clock>().is_ok());
    }

    #[test]
    fn factory_receives_the_built_provider() {
        let (registry, mut bridge) = setup();
        bridge
            .add_instance(Arc::new(Logger))
            .unwrap()
            .add_singleton(|resolver: &dyn Resolver| {
                let _logger = resolver.resolve::<Logger>()?;
                Ok(Clock(1))
            })
            .unwrap();
        bridge.build().unwrap();

        assert_eq!(registry.resolve::<Clock>().unwrap().0, 1);
    }

    #[test]
    fn none_is_ignored_unless_strict() {
        let (registry, mut bridge) = setup();
        bridge.add_optional(None).unwrap();
        bridge.insert_optional(0, None).unwrap();
        assert!(bridge.is_empty());
        assert!(registry.registered_keys().is_empty());

        let mut strict = BridgeServiceCollection::with_options(
            &registry,
            BridgeOptions { strict_records: true },
        );
        assert!(matches!(
            strict.add_optional(None),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn insert_out_of_range_does_not_mirror() {
        let (registry, mut bridge) = setup();
        let err = bridge
            .insert(3, ServiceDescriptor::instance(Arc::new(Logger)))
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
        assert!(registry.registered_keys().is_empty());
    }

    #[test]
    fn removal_does_not_propagate() {
        let (registry, mut bridge) = setup();
        let descriptor = ServiceDescriptor::instance(Arc::new(Logger));
        bridge.add(descriptor.clone()).unwrap();

        assert!(bridge.remove(&descriptor).unwrap());
        bridge.add(descriptor).unwrap();
        bridge.remove_at(0).unwrap();
        bridge.clear().unwrap();

        assert!(bridge.is_empty());
        assert!(registry.resolve::<Logger>().is_ok());
    }

    #[test]
    fn rebuild_disposes_previous_provider() {
        let (_registry, mut bridge) = setup();
        bridge.add_instance(Arc::new(Logger)).unwrap();

        let first = bridge.build().unwrap();
        let second = bridge.build().unwrap();

        assert!(first.is_disposed());
        assert!(!second.is_disposed());
        assert_ne!(first.id(), second.id());
        assert!(matches!(
            first.resolve::<Logger>(),
            Err(BridgeError::UseAfterRelease(_))
        ));
        assert!(second.resolve::<Logger>().is_ok());
    }

    #[test]
    fn dispose_is_idempotent_and_blocks_mutation() {
        let (registry, mut bridge) = setup();
        let created = Arc::new(AtomicUsize::new(0));
        let created_clone = created.clone();
        bridge
            .add_transient(move |_| Ok(Clock(created_clone.fetch_add(1, Ordering::SeqCst))))
            .unwrap();
        let provider = bridge.build().unwrap();

        bridge.dispose();
        bridge.dispose();

        assert!(bridge.is_disposed());
        assert!(provider.is_disposed());
        assert!(matches!(
            bridge.add_instance(Arc::new(Logger)),
            Err(BridgeError::UseAfterRelease(_))
        ));
        assert!(matches!(bridge.build(), Err(BridgeError::UseAfterRelease(_))));
        assert!(matches!(
            registry.resolve::<Clock>(),
            Err(BridgeError::UseAfterRelease(_))
        ));
        assert_eq!(created.load(Ordering::SeqCst), 0);
        // 只读操作仍然委托给本地列表
        assert_eq!(bridge.len(), 1);
    }

    #[test]
    fn drop_releases_provider() {
        let (_registry, mut bridge) = setup();
        bridge.add_instance(Arc::new(Logger)).unwrap();
        let provider = bridge.build().unwrap();

        drop(bridge);

        assert!(provider.is_disposed());
        assert!(matches!(
            provider.resolve::<Logger>(),
            Err(BridgeError::UseAfterRelease(_))
        ));
    }

    #[test]
    fn dropped_registry_is_use_after_release() {
        let registry = Arc::new(ContainerRegistry::new());
        let mut bridge = BridgeServiceCollection::new(&registry);
        drop(registry);

        let err = bridge.add_instance(Arc::new(Logger)).unwrap_err();
        assert!(matches!(err, BridgeError::UseAfterRelease(_)));
        // 本地列表已经修改，不回滚
        assert_eq!(bridge.len(), 1);
    }

    #[test]
    fn debug_output_is_summary() {
        let (_registry, bridge) = setup();
        let text = format!("{:?}", bridge);
        assert!(text.contains("descriptors: 0"));
        assert!(text.contains("built: false"));
    }
}
