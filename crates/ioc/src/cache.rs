//! Кэш дескрипторов конструкторов
//!
//! ЕДИНСТВЕННАЯ ОТВЕТСТВЕННОСТЬ: TypeId → Arc<ConstructorFactory>
//! - Заполняется лениво при первой активации типа
//! - Безопасен при конкурентном первом заполнении (double-checked RwLock)
//! - Не инвалидируется при нормальной работе; ошибки сборки не кэшируются

use std::{any::TypeId, collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    config::ActivationConfig,
    dependency::downcast_instance,
    descriptor::FactoryBuilder,
    error::{ConfigurationError, FactoryError},
    factory::ConstructorFactory,
    resolver::ResolverContext,
    type_info::{Describe, TypeInfo, TypeKey},
};

static GLOBAL_CACHE: Lazy<Arc<DescriptorCache>> =
    Lazy::new(|| Arc::new(DescriptorCache::new()));

/// Кэш фабрик по типу
pub struct DescriptorCache {
    factories: RwLock<HashMap<TypeId, Arc<ConstructorFactory>>>,
    builder: FactoryBuilder,
    config: ActivationConfig,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::with_config(ActivationConfig::default())
    }

    pub fn with_config(config: ActivationConfig) -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            builder: FactoryBuilder::with_config(&config),
            config,
        }
    }

    /// Процесс-глобальный кэш с настройками по умолчанию
    pub fn global() -> Arc<DescriptorCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    pub fn config(&self) -> &ActivationConfig {
        &self.config
    }

    /// Получить фабрику для `T`, построив дескриптор при первом обращении
    pub fn factory_for<T: Describe>(&self) -> Result<Arc<ConstructorFactory>, ConfigurationError> {
        self.get_or_build(TypeKey::of::<T>(), T::type_info)
    }

    fn get_or_build<F>(
        &self,
        key: TypeKey,
        info: F,
    ) -> Result<Arc<ConstructorFactory>, ConfigurationError>
    where
        F: FnOnce() -> TypeInfo,
    {
        if let Some(factory) = self.factories.read().get(&key.id()) {
            debug!("Cache hit for descriptor: {}", key);
            return Ok(Arc::clone(factory));
        }

        debug!("Cache miss for descriptor: {}", key);
        // Сборка вне блокировки: чистая функция, гонка двух сборок безопасна
        let descriptor = self.builder.build(&info())?;
        let built = Arc::new(ConstructorFactory::with_config(descriptor, &self.config));

        let mut factories = self.factories.write();
        let factory = factories.entry(key.id()).or_insert(built);
        Ok(Arc::clone(factory))
    }

    /// Активировать `T`: фабрика из кэша + create + типизированный downcast
    pub fn activate<T: Describe>(
        &self,
        context: &ResolverContext,
    ) -> Result<Arc<T>, FactoryError> {
        let factory = self.factory_for::<T>()?;
        let instance = factory.create(context)?;
        downcast_instance::<T>(&instance).ok_or(FactoryError::Downcast {
            expected: TypeKey::of::<T>(),
        })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.factories.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Очистить кэш (полезно для тестов)
    pub fn clear(&self) {
        self.factories.write().clear();
        debug!("Cleared descriptor cache");
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Активировать `T` через глобальный кэш
pub fn activate<T: Describe>(context: &ResolverContext) -> Result<Arc<T>, FactoryError> {
    GLOBAL_CACHE.activate::<T>(context)
}
