//! A terminal front-end for an AI customer support backend.
//!
//! The crate includes a CLI tool for chatting in the terminal. And you can
//! also use it as a library to embed the support chat in your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod chat;
pub mod render;

pub use chat::{SupportChat, SupportChatBuilder};

/// Re-exports of [`support_chat_core`] crate.
pub mod core {
    pub use support_chat_core::*;
}

/// Re-exports of [`support_chat_protocol`] crate.
pub mod protocol {
    pub use support_chat_protocol::*;
}

/// Re-exports of [`support_chat_http_backend`] crate.
pub mod http {
    pub use support_chat_http_backend::*;
}
