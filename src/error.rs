//! Error types for lectern

use thiserror::Error;

/// Result type alias for lectern operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lectern
///
/// `Device` is fatal to a listening session: the assistant returns to idle
/// and the user must restart. `Stt`, `Chat` and `Tts` are recoverable: the
/// current turn ends early and listening resumes. No error is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device could not be acquired (fatal to the session)
    #[error("audio device unavailable: {0}")]
    Device(String),

    /// Audio processing error (encoding, decoding, stream runtime)
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error (recoverable, ends the current turn)
    #[error("transcription error: {0}")]
    Stt(String),

    /// Chat completion error (recoverable, ends the current turn)
    #[error("chat error: {0}")]
    Chat(String),

    /// Text-to-speech error (recoverable, the reply is kept but not spoken)
    #[error("speech synthesis error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the error ends only the current turn rather than the session
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Stt(_) | Self::Chat(_) | Self::Tts(_))
    }
}
