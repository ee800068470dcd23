use serde::{Deserialize, Serialize};
use serde_json::Value;
use support_chat_protocol::{Escalation, Reply};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct MessageResponse {
    pub response: String,
    #[serde(default)]
    pub requires_escalation: bool,
    pub next_action: Option<String>,
    pub session_status: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
struct EscalateResponse {
    status: Option<String>,
    summary: Option<String>,
    message: Option<String>,
}

/// One stored message of a session, as returned by the history endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct HistoryEntry {
    /// The message text.
    pub message: String,
    /// Whether the user wrote this message.
    pub is_user: bool,
    /// Whether the backend suggested escalation with this message.
    #[serde(default)]
    pub requires_escalation: bool,
    /// When the backend stored the message, as the backend formats it.
    pub timestamp: Option<String>,
}

/// The backend's health report.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Health {
    /// `"healthy"` when the backend is up.
    pub status: String,
    /// Backend clock reading, as the backend formats it.
    pub timestamp: Option<String>,
}

impl Health {
    /// Returns `true` if the backend reports itself healthy.
    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MessageRequest<'a> {
    pub message: &'a str,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_reply(resp: MessageResponse) -> Reply {
    Reply {
        text: resp.response,
        requires_escalation: resp.requires_escalation,
        next_action: resp.next_action,
        session_status: resp.session_status,
    }
}

/// The escalation body is not part of the contract, so anything that
/// doesn't look like the known shape becomes an empty acknowledgement.
pub fn create_escalation(body: Value) -> Escalation {
    let resp: EscalateResponse = serde_json::from_value(body).unwrap_or_else(|err| {
        debug!("ignoring unexpected escalation body: {err}");
        Default::default()
    });
    Escalation {
        status: resp.status,
        summary: resp.summary,
        message: resp.message,
    }
}
