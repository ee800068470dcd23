//! A local fake support backend for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use support_chat_protocol::{
    Backend, BackendError, ErrorKind, Escalation, Reply, SessionId,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A call received by [`TestBackend`], in the order it was issued.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Call {
    /// `create_session` was called.
    CreateSession,
    /// `send_message` was called.
    SendMessage {
        /// The session the message was sent under.
        session: String,
        /// The message text.
        text: String,
    },
    /// `escalate` was called.
    Escalate {
        /// The escalated session.
        session: String,
    },
}

#[derive(Default)]
struct Script {
    session_id: Option<String>,
    replies: VecDeque<PresetReply>,
    escalation_failures: u64,
    delay: Option<Duration>,
    calls: Vec<Call>,
}

/// A local fake backend for testing purpose.
///
/// Before sending requests, you need to setup the script: the session id
/// to hand out and the replies to return, in order. If the script runs
/// out of replies or no session id is set, the call fails.
///
/// Clones share the same script and call log, so a test can keep one
/// clone to inspect the calls made through another.
#[derive(Clone, Default)]
pub struct TestBackend {
    script: Arc<Mutex<Script>>,
}

impl TestBackend {
    /// Creates a backend that hands out `session_id`.
    #[inline]
    pub fn with_session_id<S: Into<String>>(session_id: S) -> Self {
        let backend = Self::default();
        backend.script().session_id = Some(session_id.into());
        backend
    }

    /// Queues a reply for the next unanswered message.
    #[inline]
    pub fn add_reply(&self, preset: PresetReply) {
        self.script().replies.push_back(preset);
    }

    /// Makes the next `count` escalation calls fail.
    #[inline]
    pub fn fail_escalations(&self, count: u64) {
        self.script().escalation_failures += count;
    }

    /// Delays every response by `duration`.
    #[inline]
    pub fn set_delay(&self, duration: Duration) {
        self.script().delay = Some(duration);
    }

    /// Returns the calls received so far.
    #[inline]
    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    /// Returns how many calls matched `pred`.
    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.script().calls.iter().filter(|c| pred(c)).count()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // A panicking test thread must not hide the call log from others.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn respond<T>(delay: Option<Duration>, result: Result<T, Error>) -> Result<T, Error> {
    if let Some(delay) = delay {
        sleep(delay).await;
    }
    result
}

impl Backend for TestBackend {
    type Error = crate::Error;

    fn create_session(
        &self,
    ) -> impl Future<Output = Result<SessionId, Self::Error>> + Send + 'static
    {
        let mut script = self.script();
        script.calls.push(Call::CreateSession);
        let result = script
            .session_id
            .clone()
            .and_then(SessionId::new)
            .ok_or(Error {
                message: "no session id",
                kind: ErrorKind::Network,
            });
        respond(script.delay, result)
    }

    fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static
    {
        let mut script = self.script();
        script.calls.push(Call::SendMessage {
            session: session.as_str().to_owned(),
            text: text.to_owned(),
        });
        let result = match script.replies.pop_front() {
            Some(preset) => preset.into_reply().ok_or(Error {
                message: "preset failure",
                kind: ErrorKind::Status,
            }),
            None => Err(Error {
                message: "no enough replies",
                kind: ErrorKind::Other,
            }),
        };
        respond(script.delay, result)
    }

    fn escalate(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<Escalation, Self::Error>> + Send + 'static
    {
        let mut script = self.script();
        script.calls.push(Call::Escalate {
            session: session.as_str().to_owned(),
        });
        let result = if script.escalation_failures > 0 {
            script.escalation_failures -= 1;
            Err(Error {
                message: "preset escalation failure",
                kind: ErrorKind::Network,
            })
        } else {
            Ok(Escalation {
                status: Some("escalated".to_owned()),
                summary: None,
                message: Some("Conversation escalated to human agent".to_owned()),
            })
        };
        respond(script.delay, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_exchange() {
        let backend = TestBackend::with_session_id("abc123");
        backend.add_reply(PresetReply::with_text("I can help with that."));
        backend.add_reply(PresetReply::failure());

        let session = backend.create_session().await.unwrap();
        assert_eq!(session.as_str(), "abc123");

        let reply = backend
            .send_message(&session, "I need a refund")
            .await
            .unwrap();
        assert_eq!(reply, Reply::new("I can help with that.", false));

        let err = backend.send_message(&session, "Again").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);

        // The script is exhausted now.
        let err = backend.send_message(&session, "More").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);

        assert_eq!(
            backend.calls(),
            vec![
                Call::CreateSession,
                Call::SendMessage {
                    session: "abc123".to_owned(),
                    text: "I need a refund".to_owned(),
                },
                Call::SendMessage {
                    session: "abc123".to_owned(),
                    text: "Again".to_owned(),
                },
                Call::SendMessage {
                    session: "abc123".to_owned(),
                    text: "More".to_owned(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_session_id() {
        let backend = TestBackend::default();
        let err = backend.create_session().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_escalation_failures() {
        let backend = TestBackend::with_session_id("abc123");
        backend.fail_escalations(1);
        let session = SessionId::new("abc123").unwrap();

        assert!(backend.escalate(&session).await.is_err());
        assert!(backend.escalate(&session).await.is_ok());
        assert_eq!(
            backend.count_calls(|c| matches!(c, Call::Escalate { .. })),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay() {
        let backend = TestBackend::with_session_id("abc123");
        backend.set_delay(Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        backend.create_session().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
