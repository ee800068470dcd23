//! Transcript-related types.

use std::fmt::{self, Display};
use std::slice;

use chrono::{DateTime, Utc};

/// Identifies a message within one transcript.
///
/// Ids start at 1 and strictly increase in insertion order. They carry
/// no other meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl MessageId {
    /// Returns the ordinal value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who a message comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Typed by the user.
    User,
    /// Produced by the support assistant, including welcome and
    /// connection error messages.
    Assistant,
    /// A notice from the widget itself.
    System,
}

/// A message in the transcript. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    text: String,
    origin: Origin,
    timestamp: DateTime<Utc>,
    escalation_suggested: bool,
}

impl Message {
    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the message text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns who the message comes from.
    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns when the message was appended.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns `true` if the backend suggested escalating along with
    /// this message.
    #[inline]
    pub fn escalation_suggested(&self) -> bool {
        self.escalation_suggested
    }
}

/// An ordered, append-only sequence of messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message stamped with the current time and returns it.
    pub fn append<S: Into<String>>(
        &mut self,
        origin: Origin,
        text: S,
        escalation_suggested: bool,
    ) -> &Message {
        let next_id = self.messages.last().map_or(1, |m| m.id.0 + 1);
        self.messages.push(Message {
            id: MessageId(next_id),
            text: text.into(),
            origin,
            timestamp: Utc::now(),
            escalation_suggested,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been appended yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Iterates the messages in insertion order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Returns the messages in insertion order.
    #[inline]
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = slice::Iter<'a, Message>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
