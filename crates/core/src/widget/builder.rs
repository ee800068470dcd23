use support_chat_protocol::Backend;
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use super::Widget;
use super::state::{Callbacks, WidgetState};
use crate::backend_client::BackendClient;
use crate::transcript::Message;

/// [`Widget`] builder.
pub struct WidgetBuilder {
    backend: BackendClient,
    callbacks: Callbacks,
}

impl WidgetBuilder {
    /// Creates a new builder with the specified backend.
    #[inline]
    pub fn with_backend<B: Backend + 'static>(backend: B) -> Self {
        Self {
            backend: BackendClient::new(backend),
            callbacks: Callbacks::default(),
        }
    }

    /// Attaches a callback to be invoked when a message exchange ends,
    /// whatever its outcome.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Attaches a callback to be invoked for every appended message.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Builds the widget and spawns the task owning its state.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn build(self) -> Widget {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Default::default());

        let state = WidgetState::new(
            self.backend,
            self.callbacks,
            snapshot_tx,
            command_tx.downgrade(),
        );
        tokio::spawn(state.run(command_rx).instrument(trace_span!("widget")));

        Widget {
            commands: command_tx,
            snapshot: snapshot_rx,
        }
    }
}
