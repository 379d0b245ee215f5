//! Простой реестр сервисов - эталонный Resolver для тестов и демо
//!
//! АРХИТЕКТУРНЫЕ РЕШЕНИЯ:
//! - HashMap<TypeId, Vec<Registration>> - несколько регистраций на сервис, порядок сохраняется
//! - Только Singleton/Transient lifetime
//! - `register_constructed` активирует реализацию через DescriptorCache,
//!   зависимости которой снова идут через этот же реестр (рекурсивный pipeline)
//! - Clone-able: внутреннее состояние за Arc
//! - Циклы и глубина отслеживаются по пути в ResolverContext

use std::{any::TypeId, collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{
    cache::DescriptorCache,
    config::ActivationConfig,
    dependency::{downcast_instance, into_instance, Instance},
    error::{FactoryError, ResolveError},
    resolver::{AsyncResolver, AsyncResolverContext, Resolver, ResolverContext},
    type_info::{Describe, TypeKey},
};

/// Жизненный цикл регистрации
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Новый экземпляр при каждом разрешении
    Transient,
    /// Один экземпляр на регистрацию
    Singleton,
}

type Provider = Arc<dyn Fn(&ResolverContext) -> Result<Instance, ResolveError> + Send + Sync>;

struct Registration {
    provider: Provider,
    lifetime: Lifetime,
    singleton: OnceCell<Instance>,
}

impl Registration {
    fn get(&self, context: &ResolverContext) -> Result<Instance, ResolveError> {
        match self.lifetime {
            Lifetime::Transient => (self.provider)(context),
            Lifetime::Singleton => self
                .singleton
                .get_or_try_init(|| (self.provider)(context))
                .cloned(),
        }
    }
}

struct RegistryInner {
    registrations: RwLock<HashMap<TypeId, Vec<Arc<Registration>>>>,
    cache: Arc<DescriptorCache>,
    max_depth: usize,
}

/// Реестр сервисов с поддержкой multi-registration
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

impl ServiceRegistry {
    /// Реестр поверх глобального кэша дескрипторов
    pub fn new() -> Self {
        Self::with_cache(DescriptorCache::global())
    }

    /// Реестр с собственным кэшем, собранным по `config`
    pub fn with_config(config: ActivationConfig) -> Self {
        Self::with_cache(Arc::new(DescriptorCache::with_config(config)))
    }

    pub fn with_cache(cache: Arc<DescriptorCache>) -> Self {
        let max_depth = cache.config().max_depth;
        Self {
            inner: Arc::new(RegistryInner {
                registrations: RwLock::new(HashMap::new()),
                cache,
                max_depth,
            }),
        }
    }

    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.inner.cache
    }

    /// Зарегистрировать готовый экземпляр сервиса `S`
    pub fn register_instance<S>(&self, instance: Arc<S>) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let instance = into_instance(instance);
        self.push::<S>(
            Lifetime::Singleton,
            Arc::new(move |_: &ResolverContext| -> Result<Instance, ResolveError> {
                Ok(Arc::clone(&instance))
            }),
        )
    }

    /// Зарегистрировать factory функцию для сервиса `S`
    pub fn register_factory<S, F>(&self, lifetime: Lifetime, factory: F) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> anyhow::Result<Arc<S>> + Send + Sync + 'static,
    {
        self.push::<S>(
            lifetime,
            Arc::new(move |context: &ResolverContext| -> Result<Instance, ResolveError> {
                Ok(into_instance(factory(context)?))
            }),
        )
    }

    /// Зарегистрировать реализацию `I` для сервиса `S`; `I` активируется через свой конструктор
    pub fn register_constructed<S, I, C>(&self, lifetime: Lifetime, cast: C) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Describe,
        C: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
    {
        let cache = Arc::clone(&self.inner.cache);
        self.push::<S>(
            lifetime,
            Arc::new(move |context: &ResolverContext| -> Result<Instance, ResolveError> {
                let implementation = cache.activate::<I>(context)?;
                Ok(into_instance(cast(implementation)))
            }),
        )
    }

    /// Зарегистрировать `I` как сервис самого себя
    pub fn register_type<I: Describe>(&self, lifetime: Lifetime) -> &Self {
        self.register_constructed::<I, I, _>(lifetime, |implementation| implementation)
    }

    fn push<S: ?Sized + 'static>(&self, lifetime: Lifetime, provider: Provider) -> &Self {
        let key = TypeKey::of::<S>();
        let mut registrations = self.inner.registrations.write();
        let entries = registrations.entry(key.id()).or_default();
        entries.push(Arc::new(Registration {
            provider,
            lifetime,
            singleton: OnceCell::new(),
        }));
        debug!("📝 Registered {} ({:?}, #{})", key, lifetime, entries.len());
        self
    }

    pub fn is_registered<S: ?Sized + 'static>(&self) -> bool {
        self.inner
            .registrations
            .read()
            .contains_key(&TypeId::of::<S>())
    }

    pub fn registration_count<S: ?Sized + 'static>(&self) -> usize {
        self.inner
            .registrations
            .read()
            .get(&TypeId::of::<S>())
            .map_or(0, Vec::len)
    }

    /// Корневой контекст разрешения для этого реестра
    pub fn context(&self) -> ResolverContext {
        ResolverContext::new(Arc::new(self.clone()) as Arc<dyn Resolver>)
    }

    pub fn async_context(&self) -> AsyncResolverContext {
        AsyncResolverContext::new(Arc::new(self.clone()) as Arc<dyn AsyncResolver>)
    }

    /// Разрешить сервис
    pub fn resolve<S>(&self) -> Result<Arc<S>, ResolveError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.context().resolve::<S>()
    }

    /// Разрешить все регистрации сервиса
    pub fn resolve_all<S>(&self) -> Result<Vec<Arc<S>>, ResolveError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.context().resolve_all::<S>()
    }

    /// Активировать `T` напрямую через кэш, без регистрации самого `T`
    pub fn activate<T: Describe>(&self) -> Result<Arc<T>, FactoryError> {
        self.inner.cache.activate::<T>(&self.context())
    }

    fn entries(&self, key: &TypeKey) -> Vec<Arc<Registration>> {
        // Клонируем список и отпускаем lock: провайдеры рекурсивно обращаются к реестру
        self.inner
            .registrations
            .read()
            .get(&key.id())
            .cloned()
            .unwrap_or_default()
    }

    fn enter(
        &self,
        key: &TypeKey,
        context: &ResolverContext,
    ) -> Result<ResolverContext, ResolveError> {
        if context.is_cancelled() {
            return Err(ResolveError::Cancelled { type_key: *key });
        }
        if context.path().contains(key) {
            let mut chain = context.path().to_vec();
            chain.push(*key);
            return Err(ResolveError::Circular { chain });
        }
        if context.depth() >= self.inner.max_depth {
            return Err(ResolveError::DepthExceeded {
                type_key: *key,
                limit: self.inner.max_depth,
            });
        }
        Ok(context.enter(*key))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.inner.registrations.read().len())
            .field("max_depth", &self.inner.max_depth)
            .finish()
    }
}

impl Resolver for ServiceRegistry {
    fn resolve_one(
        &self,
        key: &TypeKey,
        context: &ResolverContext,
    ) -> Result<Instance, ResolveError> {
        let entries = self.entries(key);
        let registration = match entries.as_slice() {
            [] => return Err(ResolveError::NotRegistered { type_key: *key }),
            [single] => single,
            many => {
                return Err(ResolveError::Ambiguous {
                    type_key: *key,
                    count: many.len(),
                })
            }
        };

        let child = self.enter(key, context)?;
        trace!(service = %key, depth = child.depth(), "resolving service");
        registration.get(&child)
    }

    fn resolve_all(
        &self,
        element: &TypeKey,
        context: &ResolverContext,
    ) -> Result<Vec<Instance>, ResolveError> {
        let entries = self.entries(element);
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let child = self.enter(element, context)?;
        trace!(service = %element, count = entries.len(), "resolving all registrations");
        entries.iter().map(|registration| registration.get(&child)).collect()
    }
}

#[async_trait]
impl AsyncResolver for ServiceRegistry {
    async fn resolve_one(
        &self,
        key: &TypeKey,
        context: &AsyncResolverContext,
    ) -> Result<Instance, ResolveError> {
        let context = context.rebind(Arc::new(self.clone()) as Arc<dyn Resolver>);
        Resolver::resolve_one(self, key, &context)
    }

    async fn resolve_all(
        &self,
        element: &TypeKey,
        context: &AsyncResolverContext,
    ) -> Result<Vec<Instance>, ResolveError> {
        let context = context.rebind(Arc::new(self.clone()) as Arc<dyn Resolver>);
        Resolver::resolve_all(self, element, &context)
    }
}

/// Typed downcast of a registry instance; used by callers holding raw instances
pub fn instance_as<S>(instance: &Instance) -> Result<Arc<S>, ResolveError>
where
    S: ?Sized + Send + Sync + 'static,
{
    downcast_instance::<S>(instance).ok_or(ResolveError::TypeMismatch {
        type_key: TypeKey::of::<S>(),
    })
}
