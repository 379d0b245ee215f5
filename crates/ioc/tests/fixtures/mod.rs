//! Общие fixtures для integration тестов
//!
//! - Небольшой граф сервисов: Clock, Greeter, Plugin, Multi
//! - Тип с двумя конструкторами (Bad)
//! - mockall resolver для проверки того, что и сколько раз разрешается

#![allow(dead_code)]

use std::sync::Arc;

use ioc::{Describe, Instance, ResolveError, Resolver, ResolverContext, TypeInfo, TypeKey};
use mockall::mock;

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        42
    }
}

impl Describe for SystemClock {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<SystemClock>()
            .constructor(|| SystemClock)
            .build()
    }
}

pub struct Calendar;

/// Clock that needs a Calendar nobody registers
pub struct CalendarClock {
    _calendar: Arc<Calendar>,
}

impl Clock for CalendarClock {
    fn now(&self) -> u64 {
        0
    }
}

impl Describe for CalendarClock {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<CalendarClock>()
            .constructor(|calendar: Arc<Calendar>| CalendarClock { _calendar: calendar })
            .build()
    }
}

pub struct Greeter {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Greeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Greeter").finish_non_exhaustive()
    }
}

impl Greeter {
    pub fn greet(&self) -> String {
        format!("hello at {}", self.clock.now())
    }
}

impl Describe for Greeter {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Greeter>()
            .constructor(|clock: Arc<dyn Clock>| Greeter { clock })
            .build()
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

pub struct NamedPlugin(pub &'static str);

impl Plugin for NamedPlugin {
    fn name(&self) -> &'static str {
        self.0
    }
}

pub struct Multi {
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl Multi {
    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

impl Describe for Multi {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Multi>()
            .constructor(|plugins: Vec<Arc<dyn Plugin>>| Multi { plugins })
            .build()
    }
}

/// Scalar and sequence dependencies side by side
pub struct Pipeline {
    pub clock: Arc<dyn Clock>,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl Describe for Pipeline {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Pipeline>()
            .constructor(|clock: Arc<dyn Clock>, plugins: Vec<Arc<dyn Plugin>>| Pipeline {
                clock,
                plugins,
            })
            .build()
    }
}

#[derive(Debug)]
pub struct Bad;

impl Describe for Bad {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Bad>()
            .constructor(|| Bad)
            .constructor(|_clock: Arc<dyn Clock>| Bad)
            .build()
    }
}

#[derive(Debug)]
pub struct Flaky;

impl Describe for Flaky {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Flaky>()
            .fallible_constructor(|_clock: Arc<dyn Clock>| -> anyhow::Result<Flaky> {
                anyhow::bail!("clock drift too large")
            })
            .build()
    }
}

mock! {
    pub TestResolver {}

    impl Resolver for TestResolver {
        fn resolve_one(
            &self,
            key: &TypeKey,
            context: &ResolverContext,
        ) -> Result<Instance, ResolveError>;
        fn resolve_all(
            &self,
            element: &TypeKey,
            context: &ResolverContext,
        ) -> Result<Vec<Instance>, ResolveError>;
    }
}

pub fn mock_context(mock: MockTestResolver) -> ResolverContext {
    ResolverContext::new(Arc::new(mock) as Arc<dyn Resolver>)
}

pub fn plugin(name: &'static str) -> Arc<dyn Plugin> {
    Arc::new(NamedPlugin(name))
}
