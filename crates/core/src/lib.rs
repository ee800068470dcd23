//! Core logic of the support chat widget: the transcript, the session
//! state machine and the message exchange with a backend.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod backend_client;
mod error;
pub mod transcript;
mod widget;

pub use error::{Error, ErrorKind};
pub use widget::{
    Activity, CONNECTION_ERROR_TEXT, Completion, ESCALATION_NOTICE_TEXT,
    Outcome, Rejection, Snapshot, Stage, WELCOME_TEXT, Widget, WidgetBuilder,
};
