//!
//! src/errors.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Defines enums and methods of error conversion
//! for errors the converter surfaces to its caller
//!
//!

use thiserror::Error;

/// Catalogs listed in every user facing url error
pub const SUPPORTED_CATALOGS: &str =
    "Spotify, Apple Music, YouTube Music, Deezer, or Tidal";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    InvalidUrl(String),
    #[error("{0}")]
    UnsupportedService(String),
    #[error("authentication failed for {0}")]
    AuthenticationFailed(String),
    #[error("playlist is empty or could not be fetched")]
    EmptyPlaylist,
    #[error("{service} unavailable: {message}")]
    ServiceUnavailable { service: String, message: String },
    #[error("conversion cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl ConvertError {
    pub fn invalid_url() -> Self {
        ConvertError::InvalidUrl(format!(
            "Please provide a valid playlist URL from {}.",
            SUPPORTED_CATALOGS
        ))
    }

    pub fn unsupported_url() -> Self {
        ConvertError::UnsupportedService(format!(
            "This playlist URL is not supported. Please use a playlist link from {}.",
            SUPPORTED_CATALOGS
        ))
    }

    pub fn unavailable(service: &str, message: impl Into<String>) -> Self {
        ConvertError::ServiceUnavailable {
            service: service.to_string(),
            message: message.into()
        }
    }
}

impl From<reqwest::Error> for ConvertError {
    fn from(e: reqwest::Error) -> Self { ConvertError::Http(e.to_string()) }
}

impl From<serde_json::Error> for ConvertError {
    fn from(e: serde_json::Error) -> Self { ConvertError::Parse(e.to_string()) }
}
