//! Server error type.

use std::fmt;

/// The error type returned by [`Server::serve`](crate::Server::serve).
///
/// Application-level failures are expressed as HTTP
/// [`Response`](crate::Response) values or, inside RPC middleware, as
/// [`rpc::errors::Error`](crate::rpc::errors::Error). This type surfaces
/// infrastructure failures only: a bad listen address, binding to a port or
/// accepting a connection.
#[derive(Debug)]
pub enum Error {
    Addr(String),
    Io(std::io::Error),
}

impl Error {
    pub(crate) fn addr(addr: &str) -> Self {
        Self::Addr(addr.to_owned())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(addr) => write!(f, "invalid socket address `{addr}`"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Addr(_) => None,
            Self::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
