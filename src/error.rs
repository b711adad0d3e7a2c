use thiserror::Error;

use gifmedia_lib::MediaError;

/// Errors surfaced by the `gifmedia` command line
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Usage(String),
}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(e: toml::ser::Error) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<gifmedia_lib::FfmpegError> for CliError {
    fn from(e: gifmedia_lib::FfmpegError) -> Self {
        CliError::Media(e.into())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
