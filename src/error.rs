use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read request header: {0}")]
    HeaderRead(#[source] io::Error),

    #[error("Could not resolve a destination from the request header")]
    UnresolvableDestination,

    #[error("Remote connect error: {0}")]
    Dial(#[source] io::Error),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("write returned zero bytes")]
    WriteZero,

    #[error("copy failed: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
