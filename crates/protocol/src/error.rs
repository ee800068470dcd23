use std::fmt::{self, Display};

/// The kind of error that occurred while talking to a backend.
///
/// Callers are not expected to branch on it, every kind is a transient
/// I/O failure from the widget's point of view. It only enriches logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be sent or the connection broke.
    Network,
    /// The backend answered with a non-success status.
    Status,
    /// The response body could not be decoded or violated the contract.
    InvalidResponse,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Status => write!(f, "unexpected status"),
            ErrorKind::InvalidResponse => write!(f, "invalid response"),
            ErrorKind::Other => write!(f, "other error"),
        }
    }
}
