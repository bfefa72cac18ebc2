pub mod binding;
pub mod registry;

pub use binding::{Binding, ConstructFn, FactoryFn};
pub use registry::ServiceRegistry;
