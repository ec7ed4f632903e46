//! 生命周期引擎
//!
//! 目标注册表和服务提供者共用同一套解析逻辑：
//! 单例按容器缓存，作用域服务按作用域缓存，瞬态服务每次新建。

use super::descriptor::ImplementationKind;
use super::key::{AnyArc, ServiceKey};
use super::resolver::{ResolutionGuard, Resolver};
use super::ServiceLifetime;
use crate::errors::{BridgeError, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// 服务注册信息
pub(crate) struct ServiceEntry {
    pub(crate) lifetime: ServiceLifetime,
    pub(crate) implementation: ImplementationKind,
}

impl ServiceEntry {
    fn create(&self, key: &ServiceKey, resolver: &dyn Resolver) -> Result<AnyArc> {
        match &self.implementation {
            ImplementationKind::Instance(instance) => Ok(instance.clone()),
            ImplementationKind::Factory(factory) => factory.call(resolver),
            ImplementationKind::Type(implementation) => {
                let service = implementation.construct(resolver)?;
                // 构造函数是类型化的，这里只防御手工拼装的描述
                if (*service).type_id() != key.type_id() {
                    return Err(BridgeError::InvalidArgument(format!(
                        "implementation {} does not produce service {}",
                        implementation.key(),
                        key
                    )));
                }
                Ok(service)
            }
        }
    }
}

/// 内部统计信息（原子计数器）
#[derive(Default)]
pub(crate) struct ResolutionStats {
    pub(crate) total_resolutions: AtomicUsize,
    pub(crate) cache_hits: AtomicUsize,
    pub(crate) cache_misses: AtomicUsize,
    pub(crate) transient_creations: AtomicUsize,
}

/// 实例缓存，每个服务一个槽位，槽位锁保证工厂只执行一次
#[derive(Default)]
pub(crate) struct InstanceCache {
    slots: DashMap<ServiceKey, Arc<Mutex<Option<AnyArc>>>>,
}

impl InstanceCache {
    pub(crate) fn get_or_create<F>(
        &self,
        key: &ServiceKey,
        stats: &ResolutionStats,
        create: F,
    ) -> Result<AnyArc>
    where
        F: FnOnce() -> Result<AnyArc>,
    {
        // 先克隆槽位再释放 DashMap 的分片锁，创建过程中可能会解析其他服务
        let slot = self.slots.entry(key.clone()).or_default().clone();
        let mut guard = slot.lock();
        if let Some(service) = guard.as_ref() {
            stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(service.clone());
        }
        stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        let service = create()?;
        *guard = Some(service.clone());
        Ok(service)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().try_lock().is_some_and(|s| s.is_some()))
            .count()
    }

    pub(crate) fn clear(&self) {
        self.slots.clear();
    }
}

/// 服务表
pub(crate) struct ServiceTable {
    id: u64,
    entries: DashMap<ServiceKey, Arc<ServiceEntry>>,
    pub(crate) stats: ResolutionStats,
}

impl ServiceTable {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            entries: DashMap::new(),
            stats: ResolutionStats::default(),
        }
    }

    /// 后注册的覆盖先注册的
    pub(crate) fn insert(&self, key: ServiceKey, entry: ServiceEntry) {
        self.entries.insert(key, Arc::new(entry));
    }

    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn keys(&self) -> Vec<ServiceKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// 解析服务
    ///
    /// `root` 用于构造单例，避免单例捕获作用域内的服务；`current` 用于作用域和瞬态服务。
    pub(crate) fn resolve(
        &self,
        key: &ServiceKey,
        singletons: &InstanceCache,
        scoped: &InstanceCache,
        root: &dyn Resolver,
        current: &dyn Resolver,
    ) -> Result<AnyArc> {
        self.stats.total_resolutions.fetch_add(1, Ordering::Relaxed);

        let entry = self
            .entries
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BridgeError::ServiceNotRegistered(key.to_string()))?;

        if let ImplementationKind::Instance(instance) = &entry.implementation {
            return Ok(instance.clone());
        }

        let _guard = ResolutionGuard::enter(self.id, key)?;
        match entry.lifetime {
            ServiceLifetime::Singleton => {
                singletons.get_or_create(key, &self.stats, || entry.create(key, root))
            }
            ServiceLifetime::Scoped => {
                scoped.get_or_create(key, &self.stats, || entry.create(key, current))
            }
            ServiceLifetime::Transient => {
                self.stats.transient_creations.fetch_add(1, Ordering::Relaxed);
                entry.create(key, current)
            }
        }
    }
}
