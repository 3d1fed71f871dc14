//! Error types for racecall.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RacecallError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Event source errors
    #[error("Event source fetch failed: {message}")]
    SourceFetch { message: String },

    #[error("Malformed pass event: {message}")]
    SourceDecode { message: String },

    // Speech backend errors
    #[error("Speech engine {engine} failed to initialize: {message}")]
    SpeechInit { engine: String, message: String },

    #[error("Speech synthesis failed on {engine}: {message}")]
    SpeechSynthesis { engine: String, message: String },

    #[error("Speech tool not found: {tool}")]
    SpeechToolNotFound { tool: String },

    // Voice dispatcher errors
    #[error("Announcement queue is full")]
    QueueFull,

    #[error("Voice dispatcher is not running")]
    DispatcherStopped,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RacecallError>;
