use std::{error, fmt, io, string::FromUtf8Error};

use camino::FromPathBufError;
use serde::{Deserialize, Serialize};

/// Error type of the synchronization engine and its storages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Error {
    /// A directory was expected
    NotADirectory(String),
    /// The entry has no byte representation
    NotDownloadable(String),
    InvalidArgument(String),
    /// Network or permission failure while moving data
    TransferFailure(String),
    /// A remote top-level folder has no local counterpart
    MissingMapping(String),
    NotFound(String),
    Io(String),
    Auth(String),
    Api(String),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotADirectory(what) => write!(f, "Not a directory: {what}"),
            Self::NotDownloadable(what) => write!(f, "Not downloadable: {what}"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::TransferFailure(msg) => write!(f, "Transfer failed: {msg}"),
            Self::MissingMapping(name) => write!(f, "Missing mapping for remote directory {name}"),
            Self::NotFound(what) => write!(f, "No such entry: {what}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Auth(msg) => write!(f, "Authorization error: {msg}"),
            Self::Api(msg) => write!(f, "API error: {msg}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl error::Error for Error {}

impl From<FromUtf8Error> for Error {
    fn from(value: FromUtf8Error) -> Self {
        Self::Io(format!(
            "Non UTF-8 string: {}",
            String::from_utf8_lossy(&value.into_bytes())
        ))
    }
}

impl From<FromPathBufError> for Error {
    fn from(value: FromPathBufError) -> Self {
        Self::Io(format!(
            "Non UTF-8 path: {}",
            value.as_path().as_os_str().to_string_lossy()
        ))
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::NotFound => Self::NotFound(value.to_string()),
            _ => Self::Io(value.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Other(format!("JSON error: {value}"))
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(format!("{value:#}"))
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! io_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Io(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! api_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Api(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! auth_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Auth(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! invalid_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::InvalidArgument(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! api_error {
    ($($t:tt)*) => {
        $crate::Error::Api(format!($($t)*))
    };
}

#[macro_export]
macro_rules! auth_error {
    ($($t:tt)*) => {
        $crate::Error::Auth(format!($($t)*))
    };
}

#[macro_export]
macro_rules! transfer_error {
    ($($t:tt)*) => {
        $crate::Error::TransferFailure(format!($($t)*))
    };
}
