use support_chat_core::transcript::Message;
use support_chat_core::{Completion, Snapshot, Widget, WidgetBuilder};
use support_chat_http_backend::{
    Error as HttpError, Health, HistoryEntry, HttpBackend, HttpBackendConfig,
    HttpBackendConfigBuilder,
};
use support_chat_protocol::{Reply, SessionId};

/// A support chat builder.
///
/// See [`SupportChat`].
pub struct SupportChatBuilder {
    backend: HttpBackend,
    widget_builder: WidgetBuilder,
}

impl SupportChatBuilder {
    /// Creates a builder talking to the backend at `base_url`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self::with_config(HttpBackendConfigBuilder::with_base_url(base_url).build())
    }

    /// Creates a builder with a complete backend configuration.
    pub fn with_config(config: HttpBackendConfig) -> Self {
        let backend = HttpBackend::new(config);
        let widget_builder = WidgetBuilder::with_backend(backend.clone());
        Self {
            backend,
            widget_builder,
        }
    }

    /// Attaches a callback to be invoked when a message exchange ends.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.widget_builder = self.widget_builder.on_idle(on_idle);
        self
    }

    /// Attaches a callback to be invoked for every appended message.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Self {
        self.widget_builder = self.widget_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new chat. The session is not requested until
    /// [`SupportChat::start`] is called.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn build(self) -> SupportChat {
        SupportChat {
            widget: self.widget_builder.build(),
            backend: self.backend,
        }
    }
}

/// A support chat over HTTP, like a window that displays messages and has
/// an input box.
///
/// It is basically a wrapper around [`Widget`] that also exposes the
/// backend calls a front-end needs besides the widget operations.
#[derive(Clone)]
pub struct SupportChat {
    widget: Widget,
    backend: HttpBackend,
}

impl SupportChat {
    /// Returns the underlying widget.
    #[inline]
    pub fn widget(&self) -> &Widget {
        &self.widget
    }

    /// Requests the session and shows the welcome message.
    #[inline]
    pub fn start(&self) -> Completion<SessionId> {
        self.widget.create_session()
    }

    /// Replaces the draft text in the input box.
    #[inline]
    pub fn set_input<S: Into<String>>(&self, text: S) {
        self.widget.set_input(text);
    }

    /// Sends the draft text in the input box.
    #[inline]
    pub fn submit(&self) -> Completion<Reply> {
        self.widget.submit()
    }

    /// Sends a message directly.
    #[inline]
    pub fn send_message(&self, message: &str) -> Completion<Reply> {
        self.widget.send_message(message)
    }

    /// Escalates the conversation to a human agent.
    #[inline]
    pub fn escalate(&self) -> Completion<()> {
        self.widget.escalate()
    }

    /// Returns the latest state of the chat.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.widget.snapshot()
    }

    /// Fetches what the backend stored for the current session. Empty
    /// until a session is assigned.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, HttpError> {
        let Some(session_id) = self.widget.snapshot().session_id else {
            debug!("no session yet, history is empty");
            return Ok(vec![]);
        };
        self.backend.history(&session_id).await
    }

    /// Checks whether the backend is up.
    #[inline]
    pub async fn health(&self) -> Result<Health, HttpError> {
        self.backend.health().await
    }
}
