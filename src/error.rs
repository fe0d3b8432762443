//! Error types and handling for the advisory service

use thiserror::Error;

/// Machine-readable error codes reported in API error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ArtifactUnavailable,
    ModelLoad,
    InvalidInput,
    MissingInput,
    WeatherUnavailable,
    Upstream,
    Analysis,
    Prediction,
    Config,
    Io,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ArtifactUnavailable => "ARTIFACT_UNAVAILABLE",
            ErrorCode::ModelLoad => "MODEL_LOAD_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::MissingInput => "MISSING_INPUT",
            ErrorCode::WeatherUnavailable => "WEATHER_UNAVAILABLE",
            ErrorCode::Upstream => "UPSTREAM_SERVICE_ERROR",
            ErrorCode::Analysis => "ANALYSIS_ERROR",
            ErrorCode::Prediction => "PREDICTION_ERROR",
            ErrorCode::Config => "CONFIG_ERROR",
            ErrorCode::Io => "IO_ERROR",
        }
    }
}

/// Main error type for the advisory service
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// The model artifact could not be fetched or written
    #[error("Model artifact unavailable: {message}")]
    ArtifactUnavailable { message: String },

    /// The model artifact is missing, corrupt, or has an incompatible schema
    #[error("Error loading model: {message}")]
    ModelLoad { message: String },

    /// A request field is present but malformed
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A required request field is absent or empty
    #[error("{message}")]
    MissingInput { message: String },

    /// The weather provider rejected the lookup
    #[error("Unable to fetch weather data: {message}")]
    WeatherUnavailable { message: String },

    /// An external backend failed or returned malformed data
    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// Crop image analysis failed
    #[error("Image analysis failed: {message}")]
    Analysis { message: String },

    /// Model scoring produced an unusable value
    #[error("Prediction failed: {message}")]
    Prediction { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AdvisorError {
    pub fn artifact_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ArtifactUnavailable {
            message: message.into(),
        }
    }

    pub fn model_load<S: Into<String>>(message: S) -> Self {
        Self::ModelLoad {
            message: message.into(),
        }
    }

    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn missing_input<S: Into<String>>(message: S) -> Self {
        Self::MissingInput {
            message: message.into(),
        }
    }

    pub fn weather_unavailable<S: Into<String>>(message: S) -> Self {
        Self::WeatherUnavailable {
            message: message.into(),
        }
    }

    pub fn upstream<S: Into<String>>(service: &'static str, message: S) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }

    pub fn analysis<S: Into<String>>(message: S) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    pub fn prediction<S: Into<String>>(message: S) -> Self {
        Self::Prediction {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            AdvisorError::ArtifactUnavailable { .. } => ErrorCode::ArtifactUnavailable,
            AdvisorError::ModelLoad { .. } => ErrorCode::ModelLoad,
            AdvisorError::InvalidInput { .. } => ErrorCode::InvalidInput,
            AdvisorError::MissingInput { .. } => ErrorCode::MissingInput,
            AdvisorError::WeatherUnavailable { .. } => ErrorCode::WeatherUnavailable,
            AdvisorError::Upstream { .. } => ErrorCode::Upstream,
            AdvisorError::Analysis { .. } => ErrorCode::Analysis,
            AdvisorError::Prediction { .. } => ErrorCode::Prediction,
            AdvisorError::Config { .. } => ErrorCode::Config,
            AdvisorError::Io { .. } => ErrorCode::Io,
        }
    }

    /// Whether the caller can fix this by changing the request
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AdvisorError::InvalidInput { .. }
                | AdvisorError::MissingInput { .. }
                | AdvisorError::WeatherUnavailable { .. }
        )
    }

    /// Get the message reported to API callers
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AdvisorError::WeatherUnavailable { .. } => "Unable to fetch weather data".to_string(),
            AdvisorError::Config { .. } => {
                "Service is misconfigured. Please contact the operator.".to_string()
            }
            AdvisorError::Io { .. } => "File operation failed on the server.".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = AdvisorError::invalid_input("dayOfYear must be an integer");
        assert!(matches!(err, AdvisorError::InvalidInput { .. }));
        assert_eq!(err.code(), ErrorCode::InvalidInput);

        let err = AdvisorError::upstream("Gemini", "connection refused");
        assert!(matches!(err, AdvisorError::Upstream { .. }));
        assert_eq!(err.to_string(), "Gemini error: connection refused");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AdvisorError::missing_input("City name is required").is_client_error());
        assert!(AdvisorError::weather_unavailable("No matching location").is_client_error());
        assert!(!AdvisorError::upstream("WeatherAPI", "timeout").is_client_error());
        assert!(!AdvisorError::model_load("corrupt").is_client_error());
    }

    #[test]
    fn test_user_messages() {
        let err = AdvisorError::missing_input("City name is required");
        assert_eq!(err.user_message(), "City name is required");

        let err = AdvisorError::weather_unavailable("No matching location found.");
        assert_eq!(err.user_message(), "Unable to fetch weather data");

        let err = AdvisorError::config("missing key");
        assert!(!err.user_message().contains("missing key"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AdvisorError = io_err.into();
        assert!(matches!(err, AdvisorError::Io { .. }));
        assert_eq!(err.code().as_str(), "IO_ERROR");
    }
}
