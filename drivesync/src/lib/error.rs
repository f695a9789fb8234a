use std::{fmt, io};

pub fn api<E: fmt::Display>(err: E) -> dsync::Error {
    dsync::Error::Api(err.to_string())
}

pub fn auth<E: fmt::Display>(err: E) -> dsync::Error {
    dsync::Error::Auth(err.to_string())
}

pub fn transfer<E: fmt::Display>(err: E) -> dsync::Error {
    dsync::Error::TransferFailure(err.to_string())
}

/// For errors that must travel through an `AsyncRead`
pub fn io_other<E: fmt::Display>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}
