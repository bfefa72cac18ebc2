use std::fmt;
use std::sync::Arc;

use crate::container::registry::ServiceRegistry;
use crate::errors::CoreError;

/// Constructor for a concrete implementation, fed with a single argument
pub type ConstructFn<I, A> = Arc<dyn Fn(A) -> Result<Box<I>, CoreError> + Send + Sync>;

/// Factory resolving an interface from the registry and a list of arguments
pub type FactoryFn<I, A> =
    Arc<dyn Fn(&ServiceRegistry, Vec<A>) -> Result<Box<I>, CoreError> + Send + Sync>;

/// How an interface `I` is turned into a value when it is built from arguments of type `A`
pub enum Binding<I: ?Sized, A> {
    /// A concrete type built through its single-argument constructor
    Concrete {
        implementation: &'static str,
        construct: ConstructFn<I, A>,
    },
    /// A factory receiving the registry itself plus the arguments
    Factory(FactoryFn<I, A>),
}

impl<I: ?Sized, A> Binding<I, A> {
    /// Name of the bound implementation, `<factory>` for factory bindings
    pub fn implementation(&self) -> &'static str {
        match self {
            Binding::Concrete { implementation, .. } => implementation,
            Binding::Factory(_) => "<factory>",
        }
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, Binding::Factory(_))
    }

    /// Build an instance from a single argument
    pub fn resolve(&self, registry: &ServiceRegistry, argument: A) -> Result<Box<I>, CoreError> {
        match self {
            Binding::Concrete { construct, .. } => construct(argument),
            Binding::Factory(factory) => factory(registry, vec![argument]),
        }
    }
}

impl<I: ?Sized, A> Clone for Binding<I, A> {
    fn clone(&self) -> Self {
        match self {
            Binding::Concrete {
                implementation,
                construct,
            } => Binding::Concrete {
                implementation,
                construct: Arc::clone(construct),
            },
            Binding::Factory(factory) => Binding::Factory(Arc::clone(factory)),
        }
    }
}

impl<I: ?Sized, A> fmt::Debug for Binding<I, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Concrete { implementation, .. } => f
                .debug_struct("Concrete")
                .field("implementation", implementation)
                .finish(),
            Binding::Factory(_) => f.debug_tuple("Factory").field(&"<factory>").finish(),
        }
    }
}
