//! Resolver capability consumed by the activation core.
//!
//! Resolvers are object-safe: they work on [`TypeKey`]s and type-erased
//! [`Instance`]s, the typed helpers on the contexts downcast on top of that.
//! Caching, lifetimes and cycle detection are the resolver's business; the
//! core only calls `resolve_one` / `resolve_all`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    dependency::{downcast_instance, Instance},
    error::ResolveError,
    type_info::TypeKey,
};

/// Synchronous resolver
#[cfg_attr(test, mockall::automock)]
pub trait Resolver: Send + Sync {
    /// Resolve exactly one instance of `key`
    fn resolve_one(
        &self,
        key: &TypeKey,
        context: &ResolverContext,
    ) -> Result<Instance, ResolveError>;

    /// Resolve every registered instance of `element`, in registration order.
    /// No registrations is an empty vector, not an error.
    fn resolve_all(
        &self,
        element: &TypeKey,
        context: &ResolverContext,
    ) -> Result<Vec<Instance>, ResolveError>;
}

/// Asynchronous resolver
#[async_trait]
pub trait AsyncResolver: Send + Sync {
    async fn resolve_one(
        &self,
        key: &TypeKey,
        context: &AsyncResolverContext,
    ) -> Result<Instance, ResolveError>;

    async fn resolve_all(
        &self,
        element: &TypeKey,
        context: &AsyncResolverContext,
    ) -> Result<Vec<Instance>, ResolveError>;
}

/// Ambient state of one resolution: the resolver, an optional cancellation
/// token and the path of types currently being activated
pub struct ActivationContext<R: ?Sized> {
    resolver: Arc<R>,
    cancellation: Option<CancellationToken>,
    path: Vec<TypeKey>,
}

pub type ResolverContext = ActivationContext<dyn Resolver>;
pub type AsyncResolverContext = ActivationContext<dyn AsyncResolver>;

impl<R: ?Sized> ActivationContext<R> {
    pub fn new(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            cancellation: None,
            path: Vec::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Types being activated, outermost first
    pub fn path(&self) -> &[TypeKey] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Child context for activating `key` one level deeper
    pub fn enter(&self, key: TypeKey) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(key);
        Self {
            resolver: Arc::clone(&self.resolver),
            cancellation: self.cancellation.clone(),
            path,
        }
    }

    /// Same ambient state, different resolver
    pub fn rebind<S: ?Sized>(&self, resolver: Arc<S>) -> ActivationContext<S> {
        ActivationContext {
            resolver,
            cancellation: self.cancellation.clone(),
            path: self.path.clone(),
        }
    }
}

impl ResolverContext {
    /// Typed `resolve_one`
    pub fn resolve<T>(&self) -> Result<Arc<T>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let instance = self.resolver.resolve_one(&key, self)?;
        downcast_instance::<T>(&instance).ok_or(ResolveError::TypeMismatch { type_key: key })
    }

    /// Typed `resolve_all`
    pub fn resolve_all<T>(&self) -> Result<Vec<Arc<T>>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        self.resolver
            .resolve_all(&key, self)?
            .iter()
            .map(|instance| {
                downcast_instance::<T>(instance).ok_or(ResolveError::TypeMismatch { type_key: key })
            })
            .collect()
    }
}

impl AsyncResolverContext {
    pub async fn resolve<T>(&self) -> Result<Arc<T>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let instance = self.resolver.resolve_one(&key, self).await?;
        downcast_instance::<T>(&instance).ok_or(ResolveError::TypeMismatch { type_key: key })
    }

    pub async fn resolve_all<T>(&self) -> Result<Vec<Arc<T>>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        self.resolver
            .resolve_all(&key, self)
            .await?
            .iter()
            .map(|instance| {
                downcast_instance::<T>(instance).ok_or(ResolveError::TypeMismatch { type_key: key })
            })
            .collect()
    }
}
