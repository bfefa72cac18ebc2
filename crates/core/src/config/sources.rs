/// Configuration source information for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value loaded from environment variable
    EnvVar(String),
    /// Default value used
    Default(String),
    /// Value provided programmatically
    Programmatic,
}

impl ConfigSource {
    /// Check if source is environment variable
    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    /// Check if source is default value
    pub fn is_default(&self) -> bool {
        matches!(self, ConfigSource::Default(_))
    }

    /// Get source description
    pub fn description(&self) -> String {
        match self {
            ConfigSource::EnvVar(var) => format!("Environment variable: {}", var),
            ConfigSource::Default(value) => format!("Default value: {}", value),
            ConfigSource::Programmatic => "Programmatically set".to_string(),
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
