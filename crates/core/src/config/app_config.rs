use crate::config::{ConfigError, ConfigSource};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Configuration trait for application configuration
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Read an environment variable, falling back to `default` when it is unset.
///
/// Returns the value together with where it came from. A variable that is set
/// but cannot be parsed is an error rather than a silent fallback.
pub fn env_or_default<T>(
    var: &str,
    field: &str,
    default: T,
    expected: &str,
) -> Result<(T, ConfigSource), ConfigError>
where
    T: FromStr + std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::invalid_value(field, raw.clone(), expected))?;
            Ok((value, ConfigSource::EnvVar(var.to_string())))
        }
        Err(env::VarError::NotPresent) => {
            let source = ConfigSource::Default(default.to_string());
            Ok((default, source))
        }
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::environment_error(format!(
            "{} is not valid unicode",
            var
        ))),
    }
}

/// Parse a boolean flag the way environment files usually spell them
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean environment flag, see [`parse_flag`] for accepted spellings
pub fn env_flag(var: &str, field: &str, default: bool) -> Result<(bool, ConfigSource), ConfigError> {
    match env::var(var) {
        Ok(raw) => parse_flag(&raw)
            .map(|value| (value, ConfigSource::EnvVar(var.to_string())))
            .ok_or_else(|| ConfigError::invalid_value(field, raw, "true or false")),
        Err(env::VarError::NotPresent) => Ok((default, ConfigSource::Default(default.to_string()))),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::environment_error(format!(
            "{} is not valid unicode",
            var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_env_or_default_uses_default_when_unset() {
        let (value, source) =
            env_or_default::<u32>("LEAN_CORE_TEST_UNSET_VAR", "count", 7, "a number").unwrap();

        assert_eq!(value, 7);
        assert!(source.is_default());
    }

    #[test]
    fn test_env_or_default_rejects_garbage() {
        env::set_var("LEAN_CORE_TEST_GARBAGE_VAR", "seven");
        let result = env_or_default::<u32>("LEAN_CORE_TEST_GARBAGE_VAR", "count", 7, "a number");
        env::remove_var("LEAN_CORE_TEST_GARBAGE_VAR");

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_env_flag_reads_variable() {
        env::set_var("LEAN_CORE_TEST_FLAG_VAR", "no");
        let result = env_flag("LEAN_CORE_TEST_FLAG_VAR", "flag", true);
        env::remove_var("LEAN_CORE_TEST_FLAG_VAR");

        let (value, source) = result.unwrap();
        assert!(!value);
        assert!(source.is_env_var());
    }
}
