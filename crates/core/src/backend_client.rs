use std::pin::Pin;
use std::sync::Arc;

use support_chat_protocol::{
    Backend, BackendError, Escalation, Reply, SessionId,
};
use tracing::Instrument;

pub type BackendResult<T> = Result<T, Box<dyn BackendError>>;
pub type BoxedCallFuture<T> =
    Pin<Box<dyn Future<Output = BackendResult<T>> + Send>>;

/// A wrapper around a backend that erases its type and traces every
/// call for the other modules.
#[derive(Clone)]
pub struct BackendClient {
    backend: Arc<dyn BackendObject>,
}

impl BackendClient {
    #[inline]
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Issues a session creation call.
    ///
    /// The call is issued when this method returns, the future only
    /// waits for its result.
    #[inline]
    pub fn create_session(&self) -> BoxedCallFuture<SessionId> {
        self.backend.create_session()
    }

    #[inline]
    pub fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> BoxedCallFuture<Reply> {
        self.backend.send_message(session, text)
    }

    #[inline]
    pub fn escalate(&self, session: &SessionId) -> BoxedCallFuture<Escalation> {
        self.backend.escalate(session)
    }
}

trait BackendObject: Send + Sync {
    fn create_session(&self) -> BoxedCallFuture<SessionId>;
    fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> BoxedCallFuture<Reply>;
    fn escalate(&self, session: &SessionId) -> BoxedCallFuture<Escalation>;
}

impl<B: Backend + 'static> BackendObject for B {
    fn create_session(&self) -> BoxedCallFuture<SessionId> {
        let fut = Backend::create_session(self);
        Box::pin(
            async move {
                trace!("issued");
                let result = fut.await;
                trace!("finished: {result:?}");
                result.map_err(erase::<B>)
            }
            .instrument(trace_span!("create session")),
        )
    }

    fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> BoxedCallFuture<Reply> {
        let fut = Backend::send_message(self, session, text);
        let span = trace_span!("send message", session = %session);
        Box::pin(
            async move {
                trace!("issued");
                let result = fut.await;
                trace!("finished: {result:?}");
                result.map_err(erase::<B>)
            }
            .instrument(span),
        )
    }

    fn escalate(&self, session: &SessionId) -> BoxedCallFuture<Escalation> {
        let fut = Backend::escalate(self, session);
        let span = trace_span!("escalate", session = %session);
        Box::pin(
            async move {
                trace!("issued");
                let result = fut.await;
                trace!("finished: {result:?}");
                result.map_err(erase::<B>)
            }
            .instrument(span),
        )
    }
}

#[inline]
fn erase<B: Backend>(err: B::Error) -> Box<dyn BackendError> {
    Box::new(err)
}
