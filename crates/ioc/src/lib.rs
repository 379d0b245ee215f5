//! Constructor-based activation for a dependency resolver.
//!
//! Pipeline: [`Describe`] metadata → [`FactoryBuilder`] validates it into a
//! [`ConstructorDescriptor`] → [`ConstructorFactory`] resolves every parameter
//! through a [`Resolver`] and invokes the constructor.
//!
//! Parameters declared as `Vec<Arc<T>>` are sequence dependencies and receive
//! every registration of `T`; everything else is a scalar dependency.

pub mod cache;
pub mod cardinality;
pub mod config;
pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod registry;
pub mod resolver;
pub mod type_info;

pub use cache::{activate, DescriptorCache};
pub use cardinality::{classify, Cardinality, SequenceDetection};
pub use config::{ActivationConfig, ConfigError, ResolutionMode};
pub use dependency::{
    downcast_instance, into_instance, Argument, ArgumentError, Dependency, Instance,
    IntoConstructor, IntoFallibleConstructor,
};
pub use descriptor::{ConstructorDescriptor, FactoryBuilder, ParameterDescriptor};
pub use error::{
    ActivationContextExt, ConfigurationError, FactoryError, InvocationError, ResolutionError,
    ResolveError,
};
pub use factory::ConstructorFactory;
pub use registry::{Lifetime, ServiceRegistry};
pub use resolver::{
    ActivationContext, AsyncResolver, AsyncResolverContext, Resolver, ResolverContext,
};
pub use type_info::{
    ConstructorInfo, DeclaredType, Describe, GenericInterface, InterfaceDef, Invoker,
    ParameterInfo, TypeInfo, TypeInfoBuilder, TypeKey,
};

pub use tokio_util::sync::CancellationToken;
