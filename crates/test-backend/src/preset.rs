use serde::{Deserialize, Serialize};
use support_chat_protocol::Reply;

/// The preset outcome for one message exchange.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    /// The backend answers with this reply.
    #[serde(rename = "reply")]
    Reply {
        /// The assistant text.
        response: String,
        /// Whether the reply suggests escalation.
        #[serde(default)]
        requires_escalation: bool,
    },
    /// The backend call fails.
    #[serde(rename = "failure")]
    Failure,
}

impl PresetReply {
    /// Creates a successful reply with the given text.
    #[inline]
    pub fn with_text<S: Into<String>>(response: S) -> Self {
        Self::Reply {
            response: response.into(),
            requires_escalation: false,
        }
    }

    /// Creates a failing exchange.
    #[inline]
    pub fn failure() -> Self {
        Self::Failure
    }

    /// Marks the reply as suggesting escalation. Has no effect on
    /// failures.
    #[inline]
    pub fn requiring_escalation(self) -> Self {
        match self {
            Self::Reply { response, .. } => Self::Reply {
                response,
                requires_escalation: true,
            },
            Self::Failure => Self::Failure,
        }
    }

    pub(crate) fn into_reply(self) -> Option<Reply> {
        match self {
            Self::Reply {
                response,
                requires_escalation,
            } => Some(Reply::new(response, requires_escalation)),
            Self::Failure => None,
        }
    }
}
