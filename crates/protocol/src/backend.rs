use std::error::Error;

use crate::error::ErrorKind;
use crate::reply::{Escalation, Reply};
use crate::session::SessionId;

/// The error type for a backend.
pub trait BackendError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a support backend, which creates sessions,
/// answers user messages and accepts escalations.
///
/// Once the backend is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the backend should be prepared for being dropped anytime.
///
/// The returned futures must not borrow from the arguments, so that
/// callers can drive them on another task.
pub trait Backend: Send + Sync {
    /// The error type that may be returned by the backend.
    type Error: BackendError;

    /// Requests a new session.
    fn create_session(
        &self,
    ) -> impl Future<Output = Result<SessionId, Self::Error>> + Send + 'static;

    /// Sends a user message under `session` and returns the reply.
    fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static;

    /// Marks `session` as escalated to a human agent.
    fn escalate(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<Escalation, Self::Error>> + Send + 'static;
}
