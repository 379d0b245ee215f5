//! Typed bridge between constructor closures and type-erased instances.
//!
//! Every resolved service travels as an [`Instance`]: an `Arc<dyn Any>` that
//! wraps the `Arc<T>` of the service type `T`. Wrapping the `Arc<T>` (instead
//! of erasing `T` itself) lets `T` be unsized, so `dyn Trait` services go
//! through the same path as concrete ones.

use std::{
    any::Any,
    sync::Arc,
};

use thiserror::Error;

use crate::type_info::{ConstructorInfo, DeclaredType, GenericInterface, TypeKey};

/// Type-erased service instance holding an `Arc<T>`
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Erase a service instance
pub fn into_instance<T>(value: Arc<T>) -> Instance
where
    T: ?Sized + Send + Sync + 'static,
{
    Arc::new(value)
}

/// Recover a service instance; `None` if it holds some other service type
pub fn downcast_instance<T>(instance: &Instance) -> Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance.downcast_ref::<Arc<T>>().cloned()
}

/// A resolved constructor argument
#[derive(Clone)]
pub enum Argument {
    /// Exactly one instance for a scalar parameter
    Single(Instance),
    /// All registered instances, in registration order, for a sequence parameter
    Sequence(Vec<Instance>),
}

impl Argument {
    pub fn len(&self) -> usize {
        match self {
            Argument::Single(_) => 1,
            Argument::Sequence(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Single(_) => f.write_str("Single(..)"),
            Argument::Sequence(items) => write!(f, "Sequence(len = {})", items.len()),
        }
    }
}

/// Raised by typed invokers when an argument does not fit its parameter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("argument {position} is not a {expected}")]
pub struct ArgumentError {
    pub position: usize,
    pub expected: TypeKey,
}

/// A constructor parameter type.
///
/// `Arc<T>` depends on exactly one `T`. `Vec<Arc<T>>` depends on every
/// registered `T`; it declares itself as directly implementing
/// `Enumerable<T>`, which is what marks it as a sequence.
pub trait Dependency: Sized + Send + 'static {
    fn declared_type() -> DeclaredType;

    fn from_argument(argument: Argument) -> Option<Self>;
}

impl<T> Dependency for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn declared_type() -> DeclaredType {
        DeclaredType::of::<T>()
    }

    fn from_argument(argument: Argument) -> Option<Self> {
        match argument {
            Argument::Single(instance) => downcast_instance::<T>(&instance),
            Argument::Sequence(_) => None,
        }
    }
}

impl<T> Dependency for Vec<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn declared_type() -> DeclaredType {
        DeclaredType::of::<Vec<Arc<T>>>()
            .implementing(GenericInterface::enumerable(TypeKey::of::<T>()))
    }

    fn from_argument(argument: Argument) -> Option<Self> {
        match argument {
            Argument::Sequence(items) => items.iter().map(downcast_instance::<T>).collect(),
            Argument::Single(_) => None,
        }
    }
}

/// Pull the next positional argument and convert it to `D`
pub fn take_argument<D: Dependency>(
    arguments: &mut impl Iterator<Item = Argument>,
    position: usize,
) -> Result<D, ArgumentError> {
    let mismatch = || ArgumentError {
        position,
        expected: D::declared_type().key(),
    };
    let argument = arguments.next().ok_or_else(mismatch)?;
    D::from_argument(argument).ok_or_else(mismatch)
}

/// Closures usable as infallible constructors of `T`
pub trait IntoConstructor<T, Args> {
    fn into_constructor(self) -> ConstructorInfo;
}

/// Closures usable as constructors of `T` that may fail
pub trait IntoFallibleConstructor<T, Args> {
    fn into_constructor(self) -> ConstructorInfo;
}

macro_rules! impl_constructors {
    ($($arg:ident),*) => {
        impl<T, F, $($arg,)*> IntoConstructor<T, ($($arg,)*)> for F
        where
            T: Send + Sync + 'static,
            F: Fn($($arg),*) -> T + Send + Sync + 'static,
            $($arg: Dependency,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn into_constructor(self) -> ConstructorInfo {
                ConstructorInfo::from_declared(
                    vec![$(<$arg as Dependency>::declared_type()),*],
                    move |arguments: Vec<Argument>| {
                        let mut arguments = arguments.into_iter();
                        let mut position = 0usize;
                        $(
                            let $arg = take_argument::<$arg>(&mut arguments, position)?;
                            position += 1;
                        )*
                        Ok(into_instance(Arc::new((self)($($arg),*))))
                    },
                )
            }
        }

        impl<T, F, $($arg,)*> IntoFallibleConstructor<T, ($($arg,)*)> for F
        where
            T: Send + Sync + 'static,
            F: Fn($($arg),*) -> anyhow::Result<T> + Send + Sync + 'static,
            $($arg: Dependency,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn into_constructor(self) -> ConstructorInfo {
                ConstructorInfo::from_declared(
                    vec![$(<$arg as Dependency>::declared_type()),*],
                    move |arguments: Vec<Argument>| {
                        let mut arguments = arguments.into_iter();
                        let mut position = 0usize;
                        $(
                            let $arg = take_argument::<$arg>(&mut arguments, position)?;
                            position += 1;
                        )*
                        let value = (self)($($arg),*)?;
                        Ok(into_instance(Arc::new(value)))
                    },
                )
            }
        }
    };
}

impl_constructors!();
impl_constructors!(A1);
impl_constructors!(A1, A2);
impl_constructors!(A1, A2, A3);
impl_constructors!(A1, A2, A3, A4);
impl_constructors!(A1, A2, A3, A4, A5);
impl_constructors!(A1, A2, A3, A4, A5, A6);
impl_constructors!(A1, A2, A3, A4, A5, A6, A7);
impl_constructors!(A1, A2, A3, A4, A5, A6, A7, A8);
