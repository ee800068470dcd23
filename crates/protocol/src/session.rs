use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// An opaque, backend-assigned identifier scoping a conversation.
///
/// A `SessionId` is never empty. Backends must reject empty identifiers
/// instead of constructing one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a `SessionId`, returns `None` if `id` is empty.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            return None;
        }
        Some(Self(id))
    }

    /// Returns the identifier string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened form for display, which is the first 8
    /// characters followed by an ellipsis.
    pub fn short(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{prefix}...")
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("session id must not be empty")
    }
}

impl From<SessionId> for String {
    #[inline]
    fn from(value: SessionId) -> Self {
        value.0
    }
}
