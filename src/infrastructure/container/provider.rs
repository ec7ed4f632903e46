//! 服务提供者
//!
//! 由一组服务描述构建，构建时对描述做快照。释放后任何解析都会返回
//! `UseAfterRelease`。

use super::descriptor::ServiceDescriptor;
use super::engine::{InstanceCache, ServiceEntry, ServiceTable};
use super::key::{AnyArc, ServiceKey};
use super::resolver::Resolver;
use crate::errors::{BridgeError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub struct ServiceProvider {
    id: uuid::Uuid,
    table: ServiceTable,
    singletons: InstanceCache,
    root_scoped: InstanceCache,
    disposed: AtomicBool,
}

impl ServiceProvider {
    pub(crate) fn from_descriptors(descriptors: &[ServiceDescriptor]) -> Self {
        let table = ServiceTable::new();
        for descriptor in descriptors {
            table.insert(
                descriptor.service_key().clone(),
                ServiceEntry {
                    lifetime: descriptor.lifetime(),
                    implementation: descriptor.implementation_kind().clone(),
                },
            );
        }
        let provider = Self {
            id: uuid::Uuid::new_v4(),
            table,
            singletons: InstanceCache::default(),
            root_scoped: InstanceCache::default(),
            disposed: AtomicBool::new(false),
        };
        debug!(
            provider_id = %provider.id,
            descriptors = descriptors.len(),
            services = provider.table.len(),
            "Service provider built"
        );
        provider
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// 不同服务标识的数量
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// 创建新的作用域
    pub fn create_scope(&self) -> Result<ProviderScope<'_>> {
        self.ensure_alive()?;
        Ok(ProviderScope {
            provider: self,
            instances: InstanceCache::default(),
        })
    }

    /// 释放提供者及其缓存的实例，可重复调用
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.singletons.clear();
            self.root_scoped.clear();
            debug!(provider_id = %self.id, "Service provider disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(BridgeError::UseAfterRelease(format!(
                "service provider {} has been disposed",
                self.id
            )));
        }
        Ok(())
    }
}

impl Resolver for ServiceProvider {
    fn resolve_any(&self, key: &ServiceKey) -> Result<AnyArc> {
        self.ensure_alive()?;
        self.table
            .resolve(key, &self.singletons, &self.root_scoped, self, self)
    }

    fn is_registered(&self, key: &ServiceKey) -> bool {
        self.table.contains(key)
    }
}

impl Drop for ServiceProvider {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// 提供者作用域
pub struct ProviderScope<'a> {
    provider: &'a ServiceProvider,
    instances: InstanceCache,
}

impl Resolver for ProviderScope<'_> {
    fn resolve_any(&self, key: &ServiceKey) -> Result<AnyArc> {
        self.provider.ensure_alive()?;
        self.provider.table.resolve(
            key,
            &self.provider.singletons,
            &self.instances,
            self.provider,
            self,
        )
    }

    fn is_registered(&self, key: &ServiceKey) -> bool {
        self.provider.table.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::collection::{ServiceCollectionExt, ServiceDescriptors};
    use crate::infrastructure::container::descriptor::Injectable;
    use crate::infrastructure::container::resolver::ResolverExt;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct Counter(usize);

    struct Config {
        name: String,
    }

    struct Greeter {
        config: Arc<Config>,
    }

    impl Injectable for Greeter {
        fn construct(resolver: &dyn Resolver) -> Result<Self> {
            Ok(Greeter {
                config: resolver.resolve::<Config>()?,
            })
        }
    }

    fn counting_services(
        counter: &Arc<AtomicUsize>,
        register: fn(&mut ServiceDescriptors, Arc<AtomicUsize>),
    ) -> ServiceProvider {
        let mut services = ServiceDescriptors::new();
        register(&mut services, counter.clone());
        services.build_service_provider()
    }

    #[test]
    fn lifetimes_round_trip() {
        let counter = Arc::new(AtomicUsize::new(0));

        let singleton = counting_services(&counter, |s, c| {
            s.add_singleton(move |_| Ok(Counter(c.fetch_add(1, Ordering::SeqCst)))).unwrap();
        });
        let a = singleton.resolve::<Counter>().unwrap();
        let b = singleton.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let transient = counting_services(&counter, |s, c| {
            s.add_transient(move |_| Ok(Counter(c.fetch_add(1, Ordering::SeqCst)))).unwrap();
        });
        let a = transient.resolve::<Counter>().unwrap();
        let b = transient.resolve::<Counter>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.0, b.0);

        let scoped = counting_services(&counter, |s, c| {
            s.add_scoped(move |_| Ok(Counter(c.fetch_add(1, Ordering::SeqCst)))).unwrap();
        });
        let scope1 = scoped.create_scope().unwrap();
        let scope2 = scoped.create_scope().unwrap();
        let a1 = scope1.resolve::<Counter>().unwrap();
        let a2 = scope1.resolve::<Counter>().unwrap();
        let b = scope2.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn implementation_types_receive_dependencies() {
        let mut services = ServiceDescriptors::new();
        services
            .add_instance(Arc::new(Config { name: "bridge".into() }))
            .unwrap()
            .add_transient_type::<Greeter>()
            .unwrap();
        let provider = services.build_service_provider();

        let greeter = provider.resolve::<Greeter>().unwrap();
        assert_eq!(greeter.config.name, "bridge");
    }

    #[test]
    fn last_registration_wins() {
        let mut services = ServiceDescriptors::new();
        services
            .add_instance(Arc::new(Counter(1)))
            .unwrap()
            .add_instance(Arc::new(Counter(2)))
            .unwrap();
        let provider = services.build_service_provider();
        assert_eq!(provider.len(), 1);
        assert_eq!(provider.resolve::<Counter>().unwrap().0, 2);
    }

    #[test]
    fn disposed_provider_rejects_resolution() {
        let mut services = ServiceDescriptors::new();
        services.add_instance(Arc::new(Counter(1))).unwrap();
        let provider = services.build_service_provider();
        let scope = provider.create_scope().unwrap();

        provider.dispose();
        provider.dispose();

        assert!(provider.is_disposed());
        assert!(matches!(
            provider.resolve::<Counter>(),
            Err(BridgeError::UseAfterRelease(_))
        ));
        assert!(matches!(
            scope.resolve::<Counter>(),
            Err(BridgeError::UseAfterRelease(_))
        ));
        assert!(provider.create_scope().is_err());
    }

    #[test]
    fn try_resolve_returns_none_for_missing() {
        let provider = ServiceDescriptors::new().build_service_provider();
        assert!(provider.is_empty());
        assert!(provider.try_resolve::<Counter>().unwrap().is_none());
    }
}
