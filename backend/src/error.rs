//! Error types for prayer-time computation.
//!
//! Every engine error carries an [`ErrorContext`] describing the operation and
//! the offending input, so that callers (and the HTTP layer) can report exactly
//! which value was rejected.

use std::fmt;

use crate::models::Prayer;

/// Result type for engine and configuration operations.
pub type PrayerResult<T> = Result<T, PrayerError>;

/// Structured context for prayer-time errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "compute_schedule", "load_config")
    pub operation: Option<String>,
    /// The input field involved (e.g., "latitude", "utc_offset")
    pub field: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the input field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref field) = self.field {
            parts.push(format!("field={}", field));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for the prayer-time engine, schedule sources and configuration.
#[derive(Debug, thiserror::Error)]
pub enum PrayerError {
    /// Coordinate, offset or date rejected before any computation.
    #[error("Invalid input: {message} {context}")]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    /// The sun never reaches the required angle and the configured
    /// fallback refuses to substitute a time.
    #[error("Astronomical anomaly: no solution for {prayers:?} {context}")]
    AstronomicalAnomaly {
        prayers: Vec<Prayer>,
        context: ErrorContext,
    },

    /// The remote schedule source failed or returned an unusable payload.
    #[error("Remote source error: {message} {context}")]
    RemoteSource {
        message: String,
        context: ErrorContext,
    },

    /// Configuration file or environment error.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

impl PrayerError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an invalid input error with context.
    pub fn invalid_input_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::InvalidInput {
            message: message.into(),
            context,
        }
    }

    /// Create an astronomical anomaly error for the given prayers.
    pub fn anomaly(prayers: Vec<Prayer>, context: ErrorContext) -> Self {
        Self::AstronomicalAnomaly { prayers, context }
    }

    /// Create a remote source error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteSource {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a remote source error with context.
    pub fn remote_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::RemoteSource {
            message: message.into(),
            context,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error with context.
    pub fn configuration_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Configuration {
            message: message.into(),
            context,
        }
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidInput { context, .. }
            | Self::AstronomicalAnomaly { context, .. }
            | Self::RemoteSource { context, .. }
            | Self::Configuration { context, .. } => context,
        }
    }

    /// Add context to an existing error.
    pub fn with_context(self, new_context: ErrorContext) -> Self {
        match self {
            Self::InvalidInput { message, .. } => Self::InvalidInput {
                message,
                context: new_context,
            },
            Self::AstronomicalAnomaly { prayers, .. } => Self::AstronomicalAnomaly {
                prayers,
                context: new_context,
            },
            Self::RemoteSource { message, .. } => Self::RemoteSource {
                message,
                context: new_context,
            },
            Self::Configuration { message, .. } => Self::Configuration {
                message,
                context: new_context,
            },
        }
    }

    /// Whether the error is caused by caller input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

impl From<toml::de::Error> for PrayerError {
    fn from(err: toml::de::Error) -> Self {
        PrayerError::configuration(format!("TOML parse error: {}", err))
    }
}

impl From<serde_json::Error> for PrayerError {
    fn from(err: serde_json::Error) -> Self {
        PrayerError::remote(format!("JSON error: {}", err))
    }
}
