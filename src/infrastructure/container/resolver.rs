//! 解析上下文
//!
//! 工厂和实现类型通过 [`Resolver`] 获取依赖，既可以是目标注册表，
//! 也可以是桥接构建出的 [`ServiceProvider`](super::ServiceProvider)。

use super::key::{AnyArc, ServiceKey};
use crate::errors::{BridgeError, Result};
use std::cell::RefCell;
use std::sync::Arc;

/// 类型擦除的解析接口
pub trait Resolver: Send + Sync {
    /// 按标识解析服务
    fn resolve_any(&self, key: &ServiceKey) -> Result<AnyArc>;

    /// 检查服务是否已注册
    fn is_registered(&self, key: &ServiceKey) -> bool;
}

/// 类型化的解析便捷方法，对所有 [`Resolver`]（包括 `dyn Resolver`）可用
pub trait ResolverExt: Resolver {
    fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_key(&ServiceKey::of::<T>())
    }

    fn resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.resolve_key(&ServiceKey::named::<T>(name))
    }

    fn resolve_key<T: Send + Sync + 'static>(&self, key: &ServiceKey) -> Result<Arc<T>> {
        downcast(self.resolve_any(key)?, key)
    }

    /// 未注册时返回 `None`，其他错误照常返回
    fn try_resolve<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        match self.resolve::<T>() {
            Ok(service) => Ok(Some(service)),
            Err(BridgeError::ServiceNotRegistered(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}

/// 安全的类型转换
pub fn downcast<T: Send + Sync + 'static>(value: AnyArc, key: &ServiceKey) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| BridgeError::TypeCastFailed {
        service: key.to_string(),
        expected: std::any::type_name::<T>().to_string(),
    })
}

thread_local! {
    // (容器ID, 服务标识)，按线程记录正在构造的服务
    static RESOLUTION_STACK: RefCell<Vec<(u64, ServiceKey)>> = const { RefCell::new(Vec::new()) };
}

/// 循环依赖检测
///
/// 进入时把服务压栈，drop 时弹出。同一容器内同一服务在栈中出现两次即为循环依赖。
pub(crate) struct ResolutionGuard;

impl ResolutionGuard {
    pub(crate) fn enter(container_id: u64, key: &ServiceKey) -> Result<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(id, k)| *id == container_id && k == key) {
                let mut chain: Vec<String> = stack
                    .iter()
                    .filter(|(id, _)| *id == container_id)
                    .map(|(_, k)| k.to_string())
                    .collect();
                chain.push(key.to_string());
                return Err(BridgeError::CircularDependency { chain });
            }
            stack.push((container_id, key.clone()));
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
