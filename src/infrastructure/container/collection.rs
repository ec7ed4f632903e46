//! 通用服务集合
//!
//! [`ServiceCollection`] 是调用方编写注册逻辑时依赖的抽象：一个有序、可变的
//! [`ServiceDescriptor`] 列表。[`ServiceDescriptors`] 是普通的列表实现，
//! 桥接集合在此之上把每次插入同步到目标注册表。

use super::descriptor::{Injectable, ServiceDescriptor};
use super::key::ServiceKey;
use super::provider::ServiceProvider;
use super::resolver::Resolver;
use super::ServiceLifetime;
use crate::errors::{BridgeError, Result};
use std::sync::Arc;

/// 有序、可变的服务描述集合
pub trait ServiceCollection {
    /// 追加到末尾
    fn add(&mut self, descriptor: ServiceDescriptor) -> Result<()>;

    /// 空记录默认被忽略
    fn add_optional(&mut self, descriptor: Option<ServiceDescriptor>) -> Result<()> {
        match descriptor {
            Some(descriptor) => self.add(descriptor),
            None => Ok(()),
        }
    }

    /// 插入到指定位置，`index > len` 时返回 `InvalidArgument`
    fn insert(&mut self, index: usize, descriptor: ServiceDescriptor) -> Result<()>;

    fn insert_optional(&mut self, index: usize, descriptor: Option<ServiceDescriptor>) -> Result<()> {
        match descriptor {
            Some(descriptor) => self.insert(index, descriptor),
            None => Ok(()),
        }
    }

    /// 替换指定位置的描述，返回被替换的描述
    fn replace(&mut self, index: usize, descriptor: ServiceDescriptor) -> Result<ServiceDescriptor>;

    fn remove_at(&mut self, index: usize) -> Result<ServiceDescriptor>;

    /// 移除第一个相等的描述
    fn remove(&mut self, descriptor: &ServiceDescriptor) -> Result<bool>;

    fn clear(&mut self) -> Result<()>;

    fn descriptors(&self) -> &[ServiceDescriptor];

    fn len(&self) -> usize {
        self.descriptors().len()
    }

    fn is_empty(&self) -> bool {
        self.descriptors().is_empty()
    }

    fn get(&self, index: usize) -> Option<&ServiceDescriptor> {
        self.descriptors().get(index)
    }

    fn index_of(&self, descriptor: &ServiceDescriptor) -> Option<usize> {
        self.descriptors().iter().position(|d| d == descriptor)
    }

    fn contains(&self, descriptor: &ServiceDescriptor) -> bool {
        self.index_of(descriptor).is_some()
    }

    fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.descriptors().iter()
    }
}

/// 注册便捷方法，对所有 [`ServiceCollection`]（包括 `dyn ServiceCollection`）可用
pub trait ServiceCollectionExt: ServiceCollection {
    fn add_instance<T: Send + Sync + 'static>(&mut self, instance: Arc<T>) -> Result<&mut Self> {
        self.add(ServiceDescriptor::instance(instance))?;
        Ok(self)
    }

    fn add_named_instance<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        instance: Arc<T>,
    ) -> Result<&mut Self> {
        self.add(ServiceDescriptor::keyed_instance(ServiceKey::named::<T>(name), instance))?;
        Ok(self)
    }

    fn add_singleton<T, F>(&mut self, factory: F) -> Result<&mut Self>
    where
        F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(ServiceLifetime::Singleton, factory))?;
        Ok(self)
    }

    fn add_scoped<T, F>(&mut self, factory: F) -> Result<&mut Self>
    where
        F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(ServiceLifetime::Scoped, factory))?;
        Ok(self)
    }

    fn add_transient<T, F>(&mut self, factory: F) -> Result<&mut Self>
    where
        F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(ServiceLifetime::Transient, factory))?;
        Ok(self)
    }

    fn add_singleton_type<T: Injectable>(&mut self) -> Result<&mut Self> {
        self.add(ServiceDescriptor::implementation::<T>(ServiceLifetime::Singleton))?;
        Ok(self)
    }

    fn add_scoped_type<T: Injectable>(&mut self) -> Result<&mut Self> {
        self.add(ServiceDescriptor::implementation::<T>(ServiceLifetime::Scoped))?;
        Ok(self)
    }

    fn add_transient_type<T: Injectable>(&mut self) -> Result<&mut Self> {
        self.add(ServiceDescriptor::implementation::<T>(ServiceLifetime::Transient))?;
        Ok(self)
    }

    /// 集合中还没有同一标识的描述时才添加，返回是否添加
    fn try_add(&mut self, descriptor: ServiceDescriptor) -> Result<bool> {
        let key = descriptor.service_key();
        if self.iter().any(|d| d.service_key() == key) {
            return Ok(false);
        }
        self.add(descriptor)?;
        Ok(true)
    }
}

impl<C: ServiceCollection + ?Sized> ServiceCollectionExt for C {}

/// 基于 `Vec` 的服务集合
#[derive(Clone, Debug, Default)]
pub struct ServiceDescriptors {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceDescriptors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用当前内容构建服务提供者，之后对集合的修改不影响已构建的提供者
    pub fn build_service_provider(&self) -> ServiceProvider {
        ServiceProvider::from_descriptors(&self.descriptors)
    }
}

impl From<Vec<ServiceDescriptor>> for ServiceDescriptors {
    fn from(descriptors: Vec<ServiceDescriptor>) -> Self {
        Self { descriptors }
    }
}

impl<'a> IntoIterator for &'a ServiceDescriptors {
    type Item = &'a ServiceDescriptor;
    type IntoIter = std::slice::Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

impl ServiceCollection for ServiceDescriptors {
    fn add(&mut self, descriptor: ServiceDescriptor) -> Result<()> {
        self.descriptors.push(descriptor);
        Ok(())
    }

    fn insert(&mut self, index: usize, descriptor: ServiceDescriptor) -> Result<()> {
        if index > self.descriptors.len() {
            return Err(BridgeError::out_of_range(index, self.descriptors.len()));
        }
        self.descriptors.insert(index, descriptor);
        Ok(())
    }

    fn replace(&mut self, index: usize, descriptor: ServiceDescriptor) -> Result<ServiceDescriptor> {
        let len = self.descriptors.len();
        let slot = self
            .descriptors
            .get_mut(index)
            .ok_or_else(|| BridgeError::out_of_range(index, len))?;
        Ok(std::mem::replace(slot, descriptor))
    }

    fn remove_at(&mut self, index: usize) -> Result<ServiceDescriptor> {
        if index >= self.descriptors.len() {
            return Err(BridgeError::out_of_range(index, self.descriptors.len()));
        }
        Ok(self.descriptors.remove(index))
    }

    fn remove(&mut self, descriptor: &ServiceDescriptor) -> Result<bool> {
        match self.index_of(descriptor) {
            Some(index) => {
                self.descriptors.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.descriptors.clear();
        Ok(())
    }

    fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }
}
