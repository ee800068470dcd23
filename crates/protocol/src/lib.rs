//! The contract between the chat widget and its support backend.
//!
//! This crate establishes the three calls a widget may make against a
//! support backend (creating a session, exchanging a message and
//! escalating a session), so that the widget logic can run against a
//! real HTTP server or an in-process fake without modification.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod backend;
mod error;
mod reply;
mod session;

pub use backend::*;
pub use error::*;
pub use reply::*;
pub use session::*;
