use thiserror::Error;

/// Core error type for the lean framework
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Service not found: {service_type}")]
    ServiceNotFound { service_type: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("Invalid argument for '{service_type}': {message}")]
    InvalidArgument {
        service_type: String,
        message: String,
    },

    #[error("Service initialization failed for '{service_type}': {source}")]
    ServiceInitializationFailed {
        service_type: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CoreError {
    /// Create a new service not found error
    pub fn service_not_found(service_type: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            service_type: service_type.into(),
        }
    }

    /// Create an invalid argument error for a service constructor
    pub fn invalid_argument(service_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            service_type: service_type.into(),
            message: message.into(),
        }
    }

    /// Wrap a constructor failure
    pub fn initialization_failed<E>(service_type: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ServiceInitializationFailed {
            service_type: service_type.into(),
            source: Box::new(source),
        }
    }

    /// Get error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::ServiceNotFound { .. } => "SERVICE_NOT_FOUND",
            CoreError::LockError { .. } => "LOCK_ERROR",
            CoreError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            CoreError::ServiceInitializationFailed { .. } => "SERVICE_INITIALIZATION_FAILED",
        }
    }
}
