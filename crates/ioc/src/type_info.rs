//! Type metadata consumed by the activation core.
//!
//! Rust has no runtime reflection, so every constructible type declares its
//! metadata ahead of time through [`Describe`]. The core reads [`TypeInfo`]
//! the same way a reflective container reads constructor and parameter
//! metadata: which constructors exist, what each parameter is declared as,
//! and how to invoke the constructor with a positional argument list.

use std::{
    any::TypeId,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

use crate::dependency::{Argument, Instance, IntoConstructor, IntoFallibleConstructor};

/// Identity of a type: `TypeId` plus a human-readable name.
///
/// Equality and hashing only look at the `TypeId`.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name as reported by `std::any::type_name`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name with module paths stripped: `alloc::sync::Arc<dyn app::Clock>` becomes `Arc<dyn Clock>`
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut path = String::new();

        for ch in self.name.chars() {
            if ch.is_alphanumeric() || ch == '_' || ch == ':' {
                path.push(ch);
                continue;
            }
            flush_segment(&mut out, &mut path);
            out.push(ch);
        }
        flush_segment(&mut out, &mut path);

        out
    }
}

fn flush_segment(out: &mut String, path: &mut String) {
    if let Some(last) = path.rsplit("::").next() {
        out.push_str(last);
    }
    path.clear();
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Definition of a generic interface shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceDef {
    /// "Sequence of E": the shape that marks a parameter as a collection of a service
    Enumerable,
    /// Any other generic interface, identified by name
    Named(&'static str),
}

/// A closed generic interface such as `Enumerable<dyn Plugin>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericInterface {
    pub definition: InterfaceDef,
    pub arguments: Vec<TypeKey>,
}

impl GenericInterface {
    pub fn enumerable(element: TypeKey) -> Self {
        Self {
            definition: InterfaceDef::Enumerable,
            arguments: vec![element],
        }
    }

    pub fn named(name: &'static str, arguments: Vec<TypeKey>) -> Self {
        Self {
            definition: InterfaceDef::Named(name),
            arguments,
        }
    }

    /// Element type if this is exactly `Enumerable<E>`
    pub fn enumerable_element(&self) -> Option<TypeKey> {
        match (self.definition, self.arguments.as_slice()) {
            (InterfaceDef::Enumerable, [element]) => Some(*element),
            _ => None,
        }
    }
}

/// Declared type of a constructor parameter.
///
/// Besides its identity a declared type records the generic shape it *is*
/// (if any), the generic interfaces it implements directly, and those it
/// only inherits through a base type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    key: TypeKey,
    shape: Option<GenericInterface>,
    interfaces: Vec<GenericInterface>,
    inherited: Vec<GenericInterface>,
}

impl DeclaredType {
    pub fn new(key: TypeKey) -> Self {
        Self {
            key,
            shape: None,
            interfaces: Vec::new(),
            inherited: Vec::new(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    /// The type itself is this generic interface
    pub fn with_shape(mut self, shape: GenericInterface) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn implementing(mut self, interface: GenericInterface) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn inheriting(mut self, interface: GenericInterface) -> Self {
        self.inherited.push(interface);
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn shape(&self) -> Option<&GenericInterface> {
        self.shape.as_ref()
    }

    pub fn interfaces(&self) -> &[GenericInterface] {
        &self.interfaces
    }

    pub fn inherited_interfaces(&self) -> &[GenericInterface] {
        &self.inherited
    }
}

/// One formal parameter of a declared constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub declared_type: DeclaredType,
    pub position: usize,
}

impl ParameterInfo {
    pub fn new(declared_type: DeclaredType, position: usize) -> Self {
        Self {
            declared_type,
            position,
        }
    }
}

/// Invokes a constructor with arguments ordered by parameter position
pub type Invoker = Arc<dyn Fn(Vec<Argument>) -> anyhow::Result<Instance> + Send + Sync>;

/// A declared constructor: its parameters and the code that runs it
#[derive(Clone)]
pub struct ConstructorInfo {
    parameters: Vec<ParameterInfo>,
    invoker: Invoker,
}

impl ConstructorInfo {
    /// Build a constructor from hand-written parameter metadata.
    ///
    /// The invoker receives one [`Argument`] per parameter, ordered by
    /// position.
    pub fn from_parts<F>(parameters: Vec<ParameterInfo>, invoker: F) -> Self
    where
        F: Fn(Vec<Argument>) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        Self {
            parameters,
            invoker: Arc::new(invoker),
        }
    }

    /// Same as [`ConstructorInfo::from_parts`] with positions taken from declaration order
    pub fn from_declared<F>(declared: Vec<DeclaredType>, invoker: F) -> Self
    where
        F: Fn(Vec<Argument>) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        let parameters = declared
            .into_iter()
            .enumerate()
            .map(|(position, declared_type)| ParameterInfo::new(declared_type, position))
            .collect();
        Self::from_parts(parameters, invoker)
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Everything the core needs to know about a constructible type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    key: TypeKey,
    constructors: Vec<ConstructorInfo>,
}

impl TypeInfo {
    pub fn new(key: TypeKey) -> Self {
        Self {
            key,
            constructors: Vec::new(),
        }
    }

    pub fn builder<T: Send + Sync + 'static>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder {
            info: TypeInfo::new(TypeKey::of::<T>()),
            _marker: PhantomData,
        }
    }

    pub fn with_constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }
}

/// Typed builder for [`TypeInfo`].
///
/// ```
/// use std::sync::Arc;
/// use ioc::{Describe, TypeInfo};
///
/// trait Clock: Send + Sync {}
///
/// struct Greeter {
///     clock: Arc<dyn Clock>,
/// }
///
/// impl Describe for Greeter {
///     fn type_info() -> TypeInfo {
///         TypeInfo::builder::<Greeter>()
///             .constructor(|clock: Arc<dyn Clock>| Greeter { clock })
///             .build()
///     }
/// }
///
/// assert_eq!(Greeter::type_info().constructors()[0].parameters().len(), 1);
/// ```
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeInfoBuilder<T> {
    /// Declare a constructor from a closure whose parameters are dependencies
    pub fn constructor<Args, F>(mut self, constructor: F) -> Self
    where
        F: IntoConstructor<T, Args>,
    {
        self.info
            .constructors
            .push(IntoConstructor::into_constructor(constructor));
        self
    }

    /// Declare a constructor that may fail with user-code errors
    pub fn fallible_constructor<Args, F>(mut self, constructor: F) -> Self
    where
        F: IntoFallibleConstructor<T, Args>,
    {
        self.info
            .constructors
            .push(IntoFallibleConstructor::into_constructor(constructor));
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }
}

/// Implemented by types that can be activated through their constructor
pub trait Describe: Send + Sync + Sized + 'static {
    fn type_info() -> TypeInfo;
}
