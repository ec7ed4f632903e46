//! 目标注册表
//!
//! [`ServiceRegistry`] 是桥接写入的权威容器的契约，桥接只写不读。
//! [`ContainerRegistry`] 是进程内的实现，支持单例、作用域和瞬态三种生命周期。

use super::descriptor::{ImplementationKind, ImplementationType, ServiceFactory};
use super::engine::{InstanceCache, ServiceEntry, ServiceTable};
use super::key::{AnyArc, ServiceKey};
use super::resolver::Resolver;
use super::ServiceLifetime;
use crate::errors::{BridgeError, Result};
use std::sync::atomic::Ordering;
use tracing::debug;

/// 交给注册表的构造方式：工厂或实现类型
#[derive(Clone, Debug)]
pub enum Activator {
    Factory(ServiceFactory),
    Type(ImplementationType),
}

impl From<Activator> for ImplementationKind {
    fn from(activator: Activator) -> Self {
        match activator {
            Activator::Factory(factory) => ImplementationKind::Factory(factory),
            Activator::Type(implementation) => ImplementationKind::Type(implementation),
        }
    }
}

/// 目标注册表契约
pub trait ServiceRegistry: Send + Sync {
    /// 注册已有实例
    fn register_instance(&self, key: ServiceKey, instance: AnyArc) -> Result<()>;

    /// 注册单例服务
    fn register_singleton(&self, key: ServiceKey, activator: Activator) -> Result<()>;

    /// 注册作用域服务
    fn register_scoped(&self, key: ServiceKey, activator: Activator) -> Result<()>;

    /// 注册瞬态服务
    fn register(&self, key: ServiceKey, activator: Activator) -> Result<()>;

    /// 检查服务是否已注册
    fn is_registered(&self, key: &ServiceKey) -> bool;
}

/// 容器统计信息
#[derive(Debug, Clone, Default)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub transient_creations: usize,
    pub registered_services: usize,
    pub active_singletons: usize,
}

impl ContainerStats {
    /// 获取缓存命中率（小数形式）
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// 获取性能指标摘要
    pub fn performance_summary(&self) -> String {
        format!(
            "Container Performance: {} total resolutions, {:.1}% cache hit rate, {} registered services, {} active singletons",
            self.total_resolutions,
            self.hit_rate() * 100.0,
            self.registered_services,
            self.active_singletons
        )
    }
}

/// 进程内目标注册表
///
/// 在作用域外解析作用域服务时，使用根作用域缓存，即每个注册表一个实例
/// （相当于根作用域内的单例）。需要真正的按作用域实例时使用 [`ContainerRegistry::create_scope`]。
pub struct ContainerRegistry {
    table: ServiceTable,
    singletons: InstanceCache,
    root_scoped: InstanceCache,
}

impl ContainerRegistry {
    /// 创建新的注册表实例
    pub fn new() -> Self {
        Self {
            table: ServiceTable::new(),
            singletons: InstanceCache::default(),
            root_scoped: InstanceCache::default(),
        }
    }

    fn register_with(
        &self,
        key: ServiceKey,
        lifetime: ServiceLifetime,
        activator: Activator,
    ) -> Result<()> {
        if let Activator::Type(implementation) = &activator {
            if implementation.key().type_id() != key.type_id() {
                return Err(BridgeError::InvalidArgument(format!(
                    "implementation {} cannot be registered as {}",
                    implementation.key(),
                    key
                )));
            }
        }
        debug!(service = %key, lifetime = ?lifetime, activator = ?activator, "Registering service");
        self.table.insert(
            key,
            ServiceEntry {
                lifetime,
                implementation: activator.into(),
            },
        );
        Ok(())
    }

    /// 创建新的作用域
    pub fn create_scope(&self) -> RegistryScope<'_> {
        let scope = RegistryScope {
            registry: self,
            id: uuid::Uuid::new_v4(),
            instances: InstanceCache::default(),
        };
        debug!(scope_id = %scope.id, "Registry scope created");
        scope
    }

    /// 获取已注册的服务标识
    pub fn registered_keys(&self) -> Vec<ServiceKey> {
        self.table.keys()
    }

    /// 获取容器统计信息
    pub fn get_stats(&self) -> ContainerStats {
        let stats = &self.table.stats;
        ContainerStats {
            total_resolutions: stats.total_resolutions.load(Ordering::Relaxed),
            cache_hits: stats.cache_hits.load(Ordering::Relaxed),
            cache_misses: stats.cache_misses.load(Ordering::Relaxed),
            transient_creations: stats.transient_creations.load(Ordering::Relaxed),
            registered_services: self.table.len(),
            active_singletons: self.singletons.len(),
        }
    }
}

impl Default for ContainerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for ContainerRegistry {
    fn register_instance(&self, key: ServiceKey, instance: AnyArc) -> Result<()> {
        debug!(service = %key, "Registering instance");
        self.table.insert(
            key,
            ServiceEntry {
                lifetime: ServiceLifetime::Singleton,
                implementation: ImplementationKind::Instance(instance),
            },
        );
        Ok(())
    }

    fn register_singleton(&self, key: ServiceKey, activator: Activator) -> Result<()> {
        self.register_with(key, ServiceLifetime::Singleton, activator)
    }

    fn register_scoped(&self, key: ServiceKey, activator: Activator) -> Result<()> {
        self.register_with(key, ServiceLifetime::Scoped, activator)
    }

    fn register(&self, key: ServiceKey, activator: Activator) -> Result<()> {
        self.register_with(key, ServiceLifetime::Transient, activator)
    }

    fn is_registered(&self, key: &ServiceKey) -> bool {
        self.table.contains(key)
    }
}

impl Resolver for ContainerRegistry {
    fn resolve_any(&self, key: &ServiceKey) -> Result<AnyArc> {
        self.table
            .resolve(key, &self.singletons, &self.root_scoped, self, self)
    }

    fn is_registered(&self, key: &ServiceKey) -> bool {
        self.table.contains(key)
    }
}

/// 注册表作用域，作用域服务在作用域内共享，作用域结束（drop）时释放
pub struct RegistryScope<'a> {
    registry: &'a ContainerRegistry,
    id: uuid::Uuid,
    instances: InstanceCache,
}

impl RegistryScope<'_> {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }
}

impl Resolver for RegistryScope<'_> {
    fn resolve_any(&self, key: &ServiceKey) -> Result<AnyArc> {
        self.registry.table.resolve(
            key,
            &self.registry.singletons,
            &self.instances,
            self.registry,
            self,
        )
    }

    fn is_registered(&self, key: &ServiceKey) -> bool {
        self.registry.table.contains(key)
    }
}

impl Drop for RegistryScope<'_> {
    fn drop(&mut self) {
        self.instances.clear();
        debug!(scope_id = %self.id, "Registry scope ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::descriptor::Injectable;
    use crate::infrastructure::container::resolver::ResolverExt;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestService {
        id: usize,
    }

    struct Repository {
        service: Arc<TestService>,
    }

    impl Injectable for Repository {
        fn construct(resolver: &dyn Resolver) -> Result<Self> {
            Ok(Repository {
                service: resolver.resolve::<TestService>()?,
            })
        }
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Activator {
        let counter = counter.clone();
        Activator::Factory(ServiceFactory::new(move |_| {
            Ok(TestService {
                id: counter.fetch_add(1, Ordering::SeqCst),
            })
        }))
    }

    #[test]
    fn test_instance_registration() {
        let registry = ContainerRegistry::new();
        let instance = Arc::new(TestService { id: 42 });
        registry
            .register_instance(ServiceKey::of::<TestService>(), instance.clone())
            .unwrap();

        let resolved = registry.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &instance));
    }

    #[test]
    fn test_singleton_service() {
        let registry = ContainerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register_singleton(ServiceKey::of::<TestService>(), counting(&counter))
            .unwrap();

        let service1 = registry.resolve::<TestService>().unwrap();
        let service2 = registry.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&service1, &service2));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_service() {
        let registry = ContainerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register(ServiceKey::of::<TestService>(), counting(&counter))
            .unwrap();

        let service1 = registry.resolve::<TestService>().unwrap();
        let service2 = registry.resolve::<TestService>().unwrap();
        assert_ne!(service1.id, service2.id);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_scoped_service() {
        let registry = ContainerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register_scoped(ServiceKey::of::<TestService>(), counting(&counter))
            .unwrap();

        let scope_a = registry.create_scope();
        let scope_b = registry.create_scope();
        let a1 = scope_a.resolve::<TestService>().unwrap();
        let a2 = scope_a.resolve::<TestService>().unwrap();
        let b = scope_b.resolve::<TestService>().unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_ne!(scope_a.id(), scope_b.id());

        // 根作用域：每个注册表一个实例
        let root1 = registry.resolve::<TestService>().unwrap();
        let root2 = registry.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&root1, &root2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_implementation_type_gets_dependencies() {
        let registry = ContainerRegistry::new();
        registry
            .register_instance(ServiceKey::of::<TestService>(), Arc::new(TestService { id: 9 }))
            .unwrap();
        registry
            .register_singleton(
                ServiceKey::of::<Repository>(),
                Activator::Type(ImplementationType::of::<Repository>()),
            )
            .unwrap();

        let repository = registry.resolve::<Repository>().unwrap();
        assert_eq!(repository.service.id, 9);
    }

    #[test]
    fn test_mismatched_implementation_is_rejected() {
        let registry = ContainerRegistry::new();
        let err = registry
            .register(
                ServiceKey::of::<TestService>(),
                Activator::Type(ImplementationType::of::<Repository>()),
            )
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
        assert!(!ServiceRegistry::is_registered(&registry, &ServiceKey::of::<TestService>()));
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = ContainerRegistry::new();
        registry
            .register_instance(ServiceKey::of::<TestService>(), Arc::new(TestService { id: 1 }))
            .unwrap();
        registry
            .register_instance(ServiceKey::of::<TestService>(), Arc::new(TestService { id: 2 }))
            .unwrap();
        assert_eq!(registry.resolve::<TestService>().unwrap().id, 2);
        assert_eq!(registry.registered_keys().len(), 1);
    }

    #[test]
    fn test_circular_dependency() {
        struct Ping;
        impl Injectable for Ping {
            fn construct(resolver: &dyn Resolver) -> Result<Self> {
                resolver.resolve::<Ping>()?;
                Ok(Ping)
            }
        }

        let registry = ContainerRegistry::new();
        registry
            .register(ServiceKey::of::<Ping>(), Activator::Type(ImplementationType::of::<Ping>()))
            .unwrap();
        let err = registry.resolve::<Ping>().err().unwrap();
        assert!(matches!(err, BridgeError::CircularDependency { .. }));
    }

    #[test]
    fn test_container_stats() {
        let registry = ContainerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register_singleton(ServiceKey::of::<TestService>(), counting(&counter))
            .unwrap();

        for _ in 0..10 {
            registry.resolve::<TestService>().unwrap();
        }

        let stats = registry.get_stats();
        assert_eq!(stats.total_resolutions, 10);
        assert_eq!(stats.cache_hits, 9);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.registered_services, 1);
        assert_eq!(stats.active_singletons, 1);
        assert!(stats.hit_rate() > 0.8);
        assert!(stats.performance_summary().contains("10 total resolutions"));
    }

    #[test]
    fn test_mismatched_instance_fails_to_downcast() {
        let registry = ContainerRegistry::new();
        registry
            .register_instance(
                ServiceKey::named::<Repository>("repo"),
                Arc::new(TestService { id: 1 }),
            )
            .unwrap();

        let err = registry.resolve_named::<Repository>("repo").err().unwrap();
        assert!(matches!(err, BridgeError::TypeCastFailed { .. }));
        let message = err.to_string();
        assert!(message.contains("Repository(repo)"));
        assert!(message.contains("does not hold a value of type"));
    }

    #[test]
    fn test_service_not_registered() {
        let registry = ContainerRegistry::new();
        let result = registry.resolve::<TestService>();
        assert!(matches!(result, Err(BridgeError::ServiceNotRegistered(_))));
    }
}
