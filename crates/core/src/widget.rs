mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::pin::Pin;
use std::task::{Context, Poll};

use support_chat_protocol::{Reply, SessionId};
use tokio::sync::{mpsc, oneshot, watch};

use crate::transcript::Transcript;
pub use builder::WidgetBuilder;
use state::Command;

/// The welcome message appended once a session is created.
pub const WELCOME_TEXT: &str =
    "Hello! I'm your AI customer support assistant. How can I help you today?";

/// The assistant message appended when a message exchange fails.
pub const CONNECTION_ERROR_TEXT: &str =
    "Sorry, I'm having trouble connecting. Please try again.";

/// The system notice appended when a conversation is escalated.
pub const ESCALATION_NOTICE_TEXT: &str = "🚨 This conversation has been escalated to a human agent. They will be with you shortly.";

/// The lifecycle stage of a widget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    /// No session has been requested yet.
    #[default]
    Uninitialized,
    /// A session was requested and has not been assigned. A widget whose
    /// session creation failed stays in this stage.
    AwaitingSession,
    /// A session is assigned.
    Ready(Activity),
}

/// Whether a ready widget has a message exchange in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Activity {
    /// No message exchange is in flight.
    #[default]
    Idle,
    /// A message exchange is in flight, further sends are rejected.
    Sending,
}

/// Why an operation was refused without contacting the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The text is empty after trimming whitespace.
    EmptyMessage,
    /// No session has been assigned yet.
    NoSession,
    /// Another message exchange is in flight.
    SendPending,
    /// Session creation has already been requested.
    AlreadyStarted,
}

/// The result of a widget operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation completed.
    Done(T),
    /// The backend call failed. The failure has been logged, and the
    /// transcript reflects it where the operation does so.
    Failed,
    /// A precondition did not hold, nothing was sent or appended.
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    /// Returns the completed value, if any.
    #[inline]
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if the operation was refused.
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

/// A read-only view of a widget, published after every change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// The lifecycle stage.
    pub stage: Stage,
    /// The assigned session, if any.
    pub session_id: Option<SessionId>,
    /// The draft text in the input buffer.
    pub input: String,
    /// The full transcript.
    pub transcript: Transcript,
}

impl Snapshot {
    /// Returns `true` while a message exchange is in flight.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.stage == Stage::Ready(Activity::Sending)
    }

    /// Returns `true` once a session is assigned.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.stage, Stage::Ready(_))
    }
}

/// A chat widget, which maintains a session, a transcript and the
/// in-flight state of its backend calls.
///
/// The state is owned by a task spawned in [`WidgetBuilder::build`]. The
/// methods here enqueue a command for that task and return a
/// [`Completion`] for its outcome. Commands are processed in the order
/// the methods are called, and dropping a `Completion` doesn't cancel
/// the operation.
///
/// Cloned handles drive the same widget. The task stops once all handles
/// are dropped and no backend call is in flight.
#[derive(Clone)]
pub struct Widget {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Snapshot>,
}

impl Widget {
    /// Requests a session from the backend and seeds the transcript
    /// with a welcome message.
    ///
    /// Only the first call contacts the backend, later calls are rejected
    /// with [`Rejection::AlreadyStarted`], even if the first one failed.
    #[inline]
    pub fn create_session(&self) -> Completion<SessionId> {
        self.request(Command::CreateSession)
    }

    /// Sends `text` to the backend.
    ///
    /// The user message is appended and the input buffer cleared before
    /// the backend call is issued. A failed exchange appends
    /// [`CONNECTION_ERROR_TEXT`] and completes with [`Outcome::Failed`].
    /// If the reply suggests escalation, the conversation is escalated
    /// before this operation completes.
    #[inline]
    pub fn send_message<S: Into<String>>(&self, text: S) -> Completion<Reply> {
        let text = text.into();
        self.request(|tx| Command::SendMessage(text, tx))
    }

    /// Replaces the draft text in the input buffer.
    #[inline]
    pub fn set_input<S: Into<String>>(&self, text: S) {
        self.enqueue(Command::SetInput(text.into()));
    }

    /// Sends the draft text in the input buffer, like [`Self::send_message`].
    #[inline]
    pub fn submit(&self) -> Completion<Reply> {
        self.request(Command::Submit)
    }

    /// Asks the backend to hand the conversation to a human agent.
    ///
    /// Escalations are not deduplicated: each call contacts the backend
    /// and appends its own notice on success. Failures append nothing.
    #[inline]
    pub fn escalate(&self) -> Completion<()> {
        self.request(Command::Escalate)
    }

    /// Returns the latest snapshot.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Returns a receiver that observes every published snapshot.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    fn request<T>(
        &self,
        make_command: impl FnOnce(oneshot::Sender<Outcome<T>>) -> Command,
    ) -> Completion<T> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(make_command(tx));
        Completion { rx }
    }

    fn enqueue(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("widget task has stopped, command dropped");
        }
    }
}

/// The pending outcome of a widget operation.
///
/// Resolves to [`Outcome::Failed`] if the widget task stopped before
/// the operation finished.
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> Future for Completion<T> {
    type Output = Outcome<T>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Outcome::Failed))
    }
}
