use crate::container::binding::Binding;
use crate::errors::CoreError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Type-erased binding stored in the registry
struct BindingEntry {
    interface: &'static str,
    binding: Box<dyn Any + Send + Sync>,
}

/// Registry resolving abstract types (usually `dyn Trait`) to concrete implementations
///
/// Bindings are keyed by the interface and the argument type used to build it,
/// so the same interface may be bound once per argument type.
pub struct ServiceRegistry {
    bindings: RwLock<HashMap<TypeId, BindingEntry>>,
}

impl ServiceRegistry {
    /// Create a new service registry
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Bind interface `I` to the concrete type `C`, built from one `A` argument
    ///
    /// ```ignore
    /// registry.bind::<dyn Clock, DatabaseValue, UtcClock>(|value| {
    ///     Ok(Box::new(UtcClock::parse(value)?))
    /// })?;
    /// ```
    pub fn bind<I, A, C>(
        &self,
        construct: impl Fn(A) -> Result<Box<I>, CoreError> + Send + Sync + 'static,
    ) -> Result<(), CoreError>
    where
        I: ?Sized + 'static,
        A: 'static,
        C: 'static,
    {
        self.insert(Binding::<I, A>::Concrete {
            implementation: type_name::<C>(),
            construct: Arc::new(construct),
        })
    }

    /// Bind interface `I` to a factory called with the registry and the arguments
    pub fn factory<I, A>(
        &self,
        factory: impl Fn(&ServiceRegistry, Vec<A>) -> Result<Box<I>, CoreError> + Send + Sync + 'static,
    ) -> Result<(), CoreError>
    where
        I: ?Sized + 'static,
        A: 'static,
    {
        self.insert(Binding::<I, A>::Factory(Arc::new(factory)))
    }

    /// Get the binding of `I` for argument type `A`
    pub fn binding<I, A>(&self) -> Result<Binding<I, A>, CoreError>
    where
        I: ?Sized + 'static,
        A: 'static,
    {
        let bindings = self.bindings.read().map_err(|_| CoreError::LockError {
            resource: "service_bindings".to_string(),
        })?;

        bindings
            .get(&TypeId::of::<Binding<I, A>>())
            .and_then(|entry| entry.binding.downcast_ref::<Binding<I, A>>())
            .cloned()
            .ok_or_else(|| CoreError::service_not_found(type_name::<I>()))
    }

    /// Get the binding of `I` for argument type `A` if one exists
    pub fn try_binding<I, A>(&self) -> Option<Binding<I, A>>
    where
        I: ?Sized + 'static,
        A: 'static,
    {
        self.binding::<I, A>().ok()
    }

    /// Resolve `I` from a single argument
    pub fn resolve<I, A>(&self, argument: A) -> Result<Box<I>, CoreError>
    where
        I: ?Sized + 'static,
        A: 'static,
    {
        self.binding::<I, A>()?.resolve(self, argument)
    }

    /// Check if `I` is bound for argument type `A`
    pub fn has_binding<I, A>(&self) -> bool
    where
        I: ?Sized + 'static,
        A: 'static,
    {
        self.bindings
            .read()
            .map(|bindings| bindings.contains_key(&TypeId::of::<Binding<I, A>>()))
            .unwrap_or(false)
    }

    /// Remove the binding of `I` for argument type `A`, returning whether one existed
    pub fn unbind<I, A>(&self) -> Result<bool, CoreError>
    where
        I: ?Sized + 'static,
        A: 'static,
    {
        let mut bindings = self.bindings.write().map_err(|_| CoreError::LockError {
            resource: "service_bindings".to_string(),
        })?;

        Ok(bindings.remove(&TypeId::of::<Binding<I, A>>()).is_some())
    }

    /// Names of all bound interfaces
    pub fn interfaces(&self) -> Vec<&'static str> {
        self.bindings
            .read()
            .map(|bindings| bindings.values().map(|entry| entry.interface).collect())
            .unwrap_or_default()
    }

    fn insert<I, A>(&self, binding: Binding<I, A>) -> Result<(), CoreError>
    where
        I: ?Sized + 'static,
        A: 'static,
    {
        let mut bindings = self.bindings.write().map_err(|_| CoreError::LockError {
            resource: "service_bindings".to_string(),
        })?;

        tracing::debug!(
            "Binding {} to {}",
            type_name::<I>(),
            binding.implementation()
        );

        bindings.insert(
            TypeId::of::<Binding<I, A>>(),
            BindingEntry {
                interface: type_name::<I>(),
                binding: Box::new(binding),
            },
        );

        Ok(())
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("interfaces", &self.interfaces())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send {
        fn greet(&self) -> String;
    }

    struct English(String);

    impl Greeter for English {
        fn greet(&self) -> String {
            format!("Hello, {}", self.0)
        }
    }

    struct Shouting(String);

    impl Greeter for Shouting {
        fn greet(&self) -> String {
            format!("HELLO, {}!", self.0.to_uppercase())
        }
    }

    #[test]
    fn test_concrete_binding_resolves() {
        let registry = ServiceRegistry::new();
        registry
            .bind::<dyn Greeter, String, English>(|name| Ok(Box::new(English(name))))
            .unwrap();

        let binding = registry.binding::<dyn Greeter, String>().unwrap();
        assert!(!binding.is_factory());
        assert!(binding.implementation().ends_with("English"));

        let greeter = registry.resolve::<dyn Greeter, String>("Flo".to_string()).unwrap();
        assert_eq!(greeter.greet(), "Hello, Flo");
    }

    #[test]
    fn test_factory_receives_registry_and_arguments() {
        let registry = ServiceRegistry::new();
        registry
            .factory::<dyn Greeter, String>(|registry, mut args| {
                assert!(registry.has_binding::<dyn Greeter, String>());
                let name = args.pop().ok_or_else(|| {
                    CoreError::invalid_argument("Shouting", "missing name argument")
                })?;
                Ok(Box::new(Shouting(name)))
            })
            .unwrap();

        let greeter = registry.resolve::<dyn Greeter, String>("flo".to_string()).unwrap();
        assert_eq!(greeter.greet(), "HELLO, FLO!");
    }

    #[test]
    fn test_bindings_are_keyed_by_argument_type() {
        let registry = ServiceRegistry::new();
        registry
            .bind::<dyn Greeter, String, English>(|name| Ok(Box::new(English(name))))
            .unwrap();

        assert!(registry.has_binding::<dyn Greeter, String>());
        assert!(!registry.has_binding::<dyn Greeter, i64>());
        assert!(matches!(
            registry.binding::<dyn Greeter, i64>(),
            Err(CoreError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_rebinding_replaces_and_unbind_removes() {
        let registry = ServiceRegistry::new();
        registry
            .bind::<dyn Greeter, String, English>(|name| Ok(Box::new(English(name))))
            .unwrap();
        registry
            .bind::<dyn Greeter, String, Shouting>(|name| Ok(Box::new(Shouting(name))))
            .unwrap();

        assert_eq!(registry.interfaces().len(), 1);
        let greeter = registry.resolve::<dyn Greeter, String>("a".to_string()).unwrap();
        assert_eq!(greeter.greet(), "HELLO, A!");

        assert!(registry.unbind::<dyn Greeter, String>().unwrap());
        assert!(!registry.unbind::<dyn Greeter, String>().unwrap());
        assert!(registry.try_binding::<dyn Greeter, String>().is_none());
    }
}
