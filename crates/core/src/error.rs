use std::error::Error as StdError;
use std::fmt::{self, Display};

use support_chat_protocol::{BackendError, ErrorKind as BackendErrorKind};

/// The widget operation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend could not create a session.
    SessionCreationFailed,
    /// The backend did not answer a user message.
    MessageExchangeFailed,
    /// The backend did not accept an escalation.
    EscalationFailed,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SessionCreationFailed => {
                write!(f, "Session creation failed")
            }
            ErrorKind::MessageExchangeFailed => {
                write!(f, "Message exchange failed")
            }
            ErrorKind::EscalationFailed => write!(f, "Escalation failed"),
        }
    }
}

/// Describes a failed widget operation and the backend error behind it.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Box<dyn BackendError>,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind, source: Box<dyn BackendError>) -> Self {
        Self { kind, source }
    }

    /// Returns the failed operation.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the kind of the underlying backend error.
    #[inline]
    pub fn backend_kind(&self) -> BackendErrorKind {
        self.source.kind()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.source)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}
