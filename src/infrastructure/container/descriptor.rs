//! 服务描述（注册记录）
//!
//! 一条 [`ServiceDescriptor`] 描述一个待注册的服务：服务标识、构造方式和生命周期。
//! 描述创建后不可修改，集合中只能整体替换。

use super::key::{AnyArc, ServiceKey};
use super::resolver::Resolver;
use super::ServiceLifetime;
use crate::errors::Result;
use std::fmt;
use std::sync::Arc;

/// 可以由容器自行构造的类型
pub trait Injectable: Sized + Send + Sync + 'static {
    /// 从解析上下文中取得依赖并构造实例
    fn construct(resolver: &dyn Resolver) -> Result<Self>;
}

type ErasedFactoryFn = dyn Fn(&dyn Resolver) -> Result<AnyArc> + Send + Sync;

/// 函数式服务工厂
#[derive(Clone)]
pub struct ServiceFactory {
    factory_fn: Arc<ErasedFactoryFn>,
}

impl ServiceFactory {
    pub fn new<T, F>(factory_fn: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        Self::from_erased(move |resolver| {
            let service = factory_fn(resolver)?;
            Ok(Arc::new(service) as AnyArc)
        })
    }

    /// 工厂直接返回类型擦除后的实例
    pub fn from_erased<F>(factory_fn: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<AnyArc> + Send + Sync + 'static,
    {
        Self {
            factory_fn: Arc::new(factory_fn),
        }
    }

    pub fn call(&self, resolver: &dyn Resolver) -> Result<AnyArc> {
        (self.factory_fn)(resolver)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.factory_fn, &other.factory_fn)
    }
}

impl fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceFactory(..)")
    }
}

/// 实现类型：由容器负责构造和依赖注入
#[derive(Clone)]
pub struct ImplementationType {
    key: ServiceKey,
    constructor: fn(&dyn Resolver) -> Result<AnyArc>,
}

fn construct_erased<T: Injectable>(resolver: &dyn Resolver) -> Result<AnyArc> {
    Ok(Arc::new(T::construct(resolver)?) as AnyArc)
}

impl ImplementationType {
    pub fn of<T: Injectable>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            constructor: construct_erased::<T>,
        }
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn construct(&self, resolver: &dyn Resolver) -> Result<AnyArc> {
        (self.constructor)(resolver)
    }
}

impl PartialEq for ImplementationType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl fmt::Debug for ImplementationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImplementationType({})", self.key)
    }
}

/// 构造方式，三者必居其一
#[derive(Clone)]
pub enum ImplementationKind {
    /// 预先构造好的实例，总是复用
    Instance(AnyArc),
    /// 工厂函数
    Factory(ServiceFactory),
    /// 由容器构造的实现类型
    Type(ImplementationType),
}

impl fmt::Debug for ImplementationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImplementationKind::Instance(_) => f.write_str("Instance(..)"),
            ImplementationKind::Factory(factory) => fmt::Debug::fmt(factory, f),
            ImplementationKind::Type(implementation) => fmt::Debug::fmt(implementation, f),
        }
    }
}

/// 服务描述
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    service_key: ServiceKey,
    lifetime: ServiceLifetime,
    implementation: ImplementationKind,
}

impl ServiceDescriptor {
    /// 注册已有实例
    pub fn instance<T: Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self::keyed_instance(ServiceKey::of::<T>(), instance)
    }

    pub fn keyed_instance(service_key: ServiceKey, instance: AnyArc) -> Self {
        Self {
            service_key,
            lifetime: ServiceLifetime::Singleton,
            implementation: ImplementationKind::Instance(instance),
        }
    }

    /// 注册工厂函数
    pub fn factory<T, F>(lifetime: ServiceLifetime, factory_fn: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        Self::keyed_factory(ServiceKey::of::<T>(), lifetime, ServiceFactory::new(factory_fn))
    }

    pub fn keyed_factory(
        service_key: ServiceKey,
        lifetime: ServiceLifetime,
        factory: ServiceFactory,
    ) -> Self {
        Self {
            service_key,
            lifetime,
            implementation: ImplementationKind::Factory(factory),
        }
    }

    /// 注册实现类型，服务标识即实现类型本身
    pub fn implementation<T: Injectable>(lifetime: ServiceLifetime) -> Self {
        Self::keyed_implementation(ServiceKey::of::<T>(), lifetime, ImplementationType::of::<T>())
    }

    /// 以任意标识注册实现类型，标识的类型必须与实现类型一致，否则注册表会拒绝
    pub fn keyed_implementation(
        service_key: ServiceKey,
        lifetime: ServiceLifetime,
        implementation: ImplementationType,
    ) -> Self {
        Self {
            service_key,
            lifetime,
            implementation: ImplementationKind::Type(implementation),
        }
    }

    pub fn service_key(&self) -> &ServiceKey {
        &self.service_key
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    pub fn implementation_kind(&self) -> &ImplementationKind {
        &self.implementation
    }

    pub fn implementation_instance(&self) -> Option<&AnyArc> {
        match &self.implementation {
            ImplementationKind::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn implementation_factory(&self) -> Option<&ServiceFactory> {
        match &self.implementation {
            ImplementationKind::Factory(factory) => Some(factory),
            _ => None,
        }
    }

    pub fn implementation_type(&self) -> Option<&ImplementationType> {
        match &self.implementation {
            ImplementationKind::Type(implementation) => Some(implementation),
            _ => None,
        }
    }
}

impl PartialEq for ServiceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        if self.service_key != other.service_key || self.lifetime != other.lifetime {
            return false;
        }
        match (&self.implementation, &other.implementation) {
            (ImplementationKind::Instance(a), ImplementationKind::Instance(b)) => Arc::ptr_eq(a, b),
            (ImplementationKind::Factory(a), ImplementationKind::Factory(b)) => a.ptr_eq(b),
            (ImplementationKind::Type(a), ImplementationKind::Type(b)) => a == b,
            _ => false,
        }
    }
}
