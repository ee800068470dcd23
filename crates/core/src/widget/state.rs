use std::fmt::{self, Debug};

use support_chat_protocol::{Escalation, Reply, SessionId};
use tokio::sync::{mpsc, oneshot, watch};

use super::{
    Activity, CONNECTION_ERROR_TEXT, ESCALATION_NOTICE_TEXT, Outcome,
    Rejection, Snapshot, Stage, WELCOME_TEXT,
};
use crate::backend_client::{BackendClient, BackendResult, BoxedCallFuture};
use crate::error::{Error, ErrorKind};
use crate::transcript::{Message, Origin, Transcript};

type Responder<T> = oneshot::Sender<Outcome<T>>;

#[derive(Default)]
pub struct Callbacks {
    pub on_idle: Option<Box<dyn Fn() + Send + Sync>>,
    pub on_transcript: Option<Box<dyn Fn(&Message) + Send + Sync>>,
}

#[derive(Debug)]
pub enum Command {
    CreateSession(Responder<SessionId>),
    SendMessage(String, Responder<Reply>),
    SetInput(String),
    Submit(Responder<Reply>),
    Escalate(Responder<()>),
    SessionCreated(BackendResult<SessionId>, Responder<SessionId>),
    MessageExchanged(SessionId, BackendResult<Reply>, Responder<Reply>),
    Escalated(BackendResult<Escalation>, EscalationTrigger),
}

/// What started an escalation, and so who waits for it.
#[derive(Debug)]
pub enum EscalationTrigger {
    Manual(Responder<()>),
    /// A reply suggested escalation. The send completes with the reply
    /// after the escalation ends.
    Reply(Reply, Responder<Reply>),
}

pub struct WidgetState {
    backend: BackendClient,
    callbacks: Callbacks,
    stage: Stage,
    session_id: Option<SessionId>,
    input: String,
    transcript: Transcript,
    snapshot_tx: watch::Sender<Snapshot>,
    // Weak, so that the handles alone keep the task alive.
    command_tx: mpsc::WeakUnboundedSender<Command>,
}

impl WidgetState {
    pub fn new(
        backend: BackendClient,
        callbacks: Callbacks,
        snapshot_tx: watch::Sender<Snapshot>,
        command_tx: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            backend,
            callbacks,
            stage: Stage::Uninitialized,
            session_id: None,
            input: String::new(),
            transcript: Transcript::new(),
            snapshot_tx,
            command_tx,
        }
    }

    pub async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<Command>) {
        debug!("started");
        while let Some(command) = command_rx.recv().await {
            trace!("received command: {command:?}");
            self.handle(command);
        }
        debug!("will terminate");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::CreateSession(tx) => self.create_session(tx),
            Command::SendMessage(text, tx) => self.send_message(text, tx),
            Command::SetInput(text) => {
                self.input = text;
                self.publish();
            }
            Command::Submit(tx) => {
                let text = self.input.clone();
                self.send_message(text, tx);
            }
            Command::Escalate(tx) => {
                let Some(session_id) = self.session_id.clone() else {
                    tx.send(Outcome::Rejected(Rejection::NoSession)).ok();
                    return;
                };
                self.escalate(session_id, EscalationTrigger::Manual(tx));
            }
            Command::SessionCreated(result, tx) => {
                self.on_session_created(result, tx)
            }
            Command::MessageExchanged(session_id, result, tx) => {
                self.on_message_exchanged(session_id, result, tx)
            }
            Command::Escalated(result, trigger) => {
                self.on_escalated(result, trigger)
            }
        }
    }

    fn create_session(&mut self, tx: Responder<SessionId>) {
        if self.stage != Stage::Uninitialized {
            tx.send(Outcome::Rejected(Rejection::AlreadyStarted)).ok();
            return;
        }

        self.stage = Stage::AwaitingSession;
        self.publish();

        info!("creating session");
        let call = self.backend.create_session();
        self.spawn_call(call, move |result| Command::SessionCreated(result, tx));
    }

    fn on_session_created(
        &mut self,
        result: BackendResult<SessionId>,
        tx: Responder<SessionId>,
    ) {
        let session_id = match result {
            Ok(session_id) => session_id,
            Err(err) => {
                // The widget stays in `AwaitingSession` for good.
                let err = Error::new(ErrorKind::SessionCreationFailed, err);
                error!(kind = %err.backend_kind(), "{err}");
                tx.send(Outcome::Failed).ok();
                return;
            }
        };

        info!(session = %session_id, "session created");
        self.session_id = Some(session_id.clone());
        self.stage = Stage::Ready(Activity::Idle);
        self.append(Origin::Assistant, WELCOME_TEXT, false);
        self.publish();
        tx.send(Outcome::Done(session_id)).ok();
    }

    fn send_message(&mut self, text: String, tx: Responder<Reply>) {
        if text.trim().is_empty() {
            tx.send(Outcome::Rejected(Rejection::EmptyMessage)).ok();
            return;
        }
        let Some(session_id) = self.session_id.clone() else {
            tx.send(Outcome::Rejected(Rejection::NoSession)).ok();
            return;
        };
        if self.stage == Stage::Ready(Activity::Sending) {
            debug!("a message exchange is in flight, rejecting");
            tx.send(Outcome::Rejected(Rejection::SendPending)).ok();
            return;
        }

        // The user sees their message before the backend answers.
        self.append(Origin::User, text.as_str(), false);
        self.input.clear();
        self.stage = Stage::Ready(Activity::Sending);
        self.publish();

        let call = self.backend.send_message(&session_id, &text);
        self.spawn_call(call, move |result| {
            Command::MessageExchanged(session_id, result, tx)
        });
    }

    fn on_message_exchanged(
        &mut self,
        session_id: SessionId,
        result: BackendResult<Reply>,
        tx: Responder<Reply>,
    ) {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                let err = Error::new(ErrorKind::MessageExchangeFailed, err);
                error!(kind = %err.backend_kind(), "{err}");
                self.append(Origin::Assistant, CONNECTION_ERROR_TEXT, false);
                self.finish_send(Outcome::Failed, tx);
                return;
            }
        };

        self.append(
            Origin::Assistant,
            reply.text.as_str(),
            reply.requires_escalation,
        );
        if reply.requires_escalation {
            info!("reply suggests escalation");
            self.publish();
            self.escalate(session_id, EscalationTrigger::Reply(reply, tx));
        } else {
            self.finish_send(Outcome::Done(reply), tx);
        }
    }

    /// Ends the in-flight message exchange.
    fn finish_send(&mut self, outcome: Outcome<Reply>, tx: Responder<Reply>) {
        self.stage = Stage::Ready(Activity::Idle);
        self.publish();
        tx.send(outcome).ok();
        if let Some(on_idle) = &self.callbacks.on_idle {
            on_idle();
        }
    }

    fn escalate(&mut self, session_id: SessionId, trigger: EscalationTrigger) {
        info!(session = %session_id, "escalating");
        let call = self.backend.escalate(&session_id);
        self.spawn_call(call, move |result| Command::Escalated(result, trigger));
    }

    fn on_escalated(
        &mut self,
        result: BackendResult<Escalation>,
        trigger: EscalationTrigger,
    ) {
        let escalated = match result {
            Ok(escalation) => {
                debug!(
                    status = ?escalation.status,
                    summary = ?escalation.summary,
                    "escalation accepted"
                );
                self.append(Origin::System, ESCALATION_NOTICE_TEXT, false);
                self.publish();
                true
            }
            Err(err) => {
                let err = Error::new(ErrorKind::EscalationFailed, err);
                error!(kind = %err.backend_kind(), "{err}");
                false
            }
        };

        match trigger {
            EscalationTrigger::Manual(tx) => {
                let outcome = if escalated {
                    Outcome::Done(())
                } else {
                    Outcome::Failed
                };
                tx.send(outcome).ok();
            }
            // The exchange itself succeeded whatever the escalation did.
            EscalationTrigger::Reply(reply, tx) => {
                self.finish_send(Outcome::Done(reply), tx);
            }
        }
    }

    fn append(&mut self, origin: Origin, text: &str, escalation_suggested: bool) {
        let message = self.transcript.append(origin, text, escalation_suggested);
        trace!(id = %message.id(), ?origin, "appended message");
        if let Some(on_transcript) = &self.callbacks.on_transcript {
            on_transcript(message);
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Snapshot {
            stage: self.stage,
            session_id: self.session_id.clone(),
            input: self.input.clone(),
            transcript: self.transcript.clone(),
        });
    }

    /// Drives `call` on its own task and feeds its result back as the
    /// command built by `then`.
    fn spawn_call<T, F>(&self, call: BoxedCallFuture<T>, then: F)
    where
        T: Send + 'static,
        F: FnOnce(BackendResult<T>) -> Command + Send + 'static,
    {
        let Some(command_tx) = self.command_tx.upgrade() else {
            // Only possible once every handle is gone, nobody is waiting.
            debug!("all handles dropped, abandoning the call");
            return;
        };
        tokio::spawn(async move {
            let result = call.await;
            command_tx.send(then(result)).ok();
        });
    }
}

impl Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_idle", &self.on_idle.is_some())
            .field("on_transcript", &self.on_transcript.is_some())
            .finish()
    }
}
