//! Error types and handling for the WeatherVault service

use thiserror::Error;

/// Main error type for the WeatherVault service
#[derive(Error, Debug)]
pub enum WeatherVaultError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A weather sample missing its required `main`/`weather` blocks
    #[error("Invalid weather sample: {message}")]
    InvalidSample { message: String },

    /// Export requested with an unrecognized format token
    #[error("Unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    /// Lookup of a record that does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Record database errors
    #[error("Database error: {source}")]
    Database {
        #[from]
        source: rusqlite::Error,
    },

    /// JSON serialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl WeatherVaultError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new invalid-sample error
    pub fn invalid_sample<S: Into<String>>(message: S) -> Self {
        Self::InvalidSample {
            message: message.into(),
        }
    }

    /// Create a new unsupported-format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherVaultError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            WeatherVaultError::Api { .. } => {
                "Unable to reach external services. Please try again later.".to_string()
            }
            WeatherVaultError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            WeatherVaultError::InvalidSample { message } => {
                format!("Invalid weather data: {message}")
            }
            WeatherVaultError::UnsupportedFormat { format } => {
                format!("Unsupported export format: {format}")
            }
            WeatherVaultError::NotFound { message } => message.clone(),
            WeatherVaultError::Database { .. } => {
                "Record storage operation failed.".to_string()
            }
            WeatherVaultError::Serialization { .. } => {
                "Failed to serialize data.".to_string()
            }
            WeatherVaultError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            WeatherVaultError::General { message } => message.clone(),
        }
    }
}
