use image::ImageError;
use thiserror::Error;

use std::error::Error;
use std::fmt;
use std::io::Error as IOError;

#[derive(Debug)]
pub struct LprError(LprErrorKind);

#[derive(Debug, Error)]
pub enum LprErrorKind {
    #[error("io error: {0}")]
    IOError(#[from] IOError),
    #[error("image error: {0}")]
    ImageError(#[from] ImageError),
    #[error("config error: {0}")]
    ConfigError(String),
    #[error("fetch error: {0}")]
    FetchError(String),
}

impl LprError {
    pub fn kind(&self) -> &LprErrorKind {
        &self.0
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self(LprErrorKind::ConfigError(message.into()))
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self(LprErrorKind::FetchError(message.into()))
    }
}

impl<T> From<T> for LprError
where T: Into<LprErrorKind>
{
    fn from(e: T) -> Self {
        Self(e.into())
    }
}

impl fmt::Display for LprError {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.kind(), f)
    }
}

impl Error for LprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.kind() {
            LprErrorKind::IOError(e) => Some(e),
            LprErrorKind::ImageError(e) => Some(e),
            LprErrorKind::ConfigError(_) | LprErrorKind::FetchError(_) => None,
        }
    }
}
