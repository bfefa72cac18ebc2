pub mod config;
pub mod container;
pub mod errors;

pub use config::validation::ConfigError;
pub use config::{AppConfigTrait, ConfigSource};
pub use container::{Binding, ServiceRegistry};
pub use errors::CoreError;
