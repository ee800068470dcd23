use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use support_chat_protocol::{
    Backend, BackendError, ErrorKind, Escalation, Reply, SessionId,
};
use tokio::time::sleep;

#[derive(Debug)]
struct EchoBackendError(ErrorKind);

impl Display for EchoBackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoBackendError {}

impl BackendError for EchoBackendError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes messages back and escalates anything mentioning a refund.
#[derive(Default)]
struct EchoBackend {
    next_session: AtomicU32,
}

impl Backend for EchoBackend {
    type Error = EchoBackendError;

    fn create_session(
        &self,
    ) -> impl Future<Output = Result<SessionId, Self::Error>> + Send + 'static
    {
        let n = self.next_session.fetch_add(1, Ordering::Relaxed);
        let id = SessionId::new(format!("echo-{n}"))
            .ok_or(EchoBackendError(ErrorKind::InvalidResponse));
        ready(id)
    }

    fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static
    {
        let text = text.to_owned();
        let known = session.as_str().starts_with("echo-");
        async move {
            // Replies never resolve synchronously on a real backend.
            sleep(Duration::from_millis(1)).await;
            if !known {
                return Err(EchoBackendError(ErrorKind::Status));
            }
            let requires_escalation = text.contains("refund");
            Ok(Reply::new(format!("You said {text}"), requires_escalation))
        }
    }

    fn escalate(
        &self,
        _session: &SessionId,
    ) -> impl Future<Output = Result<Escalation, Self::Error>> + Send + 'static
    {
        ready(Ok(Escalation {
            status: Some("escalated".to_owned()),
            ..Default::default()
        }))
    }
}

#[tokio::test]
async fn test_exchange() {
    let backend = EchoBackend::default();
    let session = backend.create_session().await.unwrap();
    assert_eq!(session.as_str(), "echo-0");

    let reply = backend.send_message(&session, "Good morning").await.unwrap();
    assert_eq!(reply.text, "You said Good morning");
    assert!(!reply.requires_escalation);

    let reply = backend
        .send_message(&session, "I need a refund")
        .await
        .unwrap();
    assert!(reply.requires_escalation);

    let escalation = backend.escalate(&session).await.unwrap();
    assert_eq!(escalation.status.as_deref(), Some("escalated"));
}

#[tokio::test]
async fn test_error() {
    let backend = EchoBackend::default();
    let session = SessionId::new("unknown").unwrap();
    let err = backend.send_message(&session, "Hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Status);
}

#[tokio::test]
async fn test_future_outlives_arguments() {
    let backend = EchoBackend::default();
    let fut = {
        let session = SessionId::new("echo-7").unwrap();
        let text = String::from("Hello");
        backend.send_message(&session, &text)
    };
    let handle = tokio::spawn(fut);
    let reply = handle.await.unwrap().unwrap();
    assert_eq!(reply.text, "You said Hello");
}
