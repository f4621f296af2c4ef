//! Error types for recipe-relay

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Request parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Mail authentication failed: {0}")]
    MailAuth(String),

    #[error("Mail protocol error: {0}")]
    MailProtocol(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Recipe API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
