/// The backend's answer to a user message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Reply {
    /// The assistant text to show to the user.
    pub text: String,
    /// Whether the backend suggests handing the conversation to a human.
    pub requires_escalation: bool,
    /// The next action hinted by the backend, if any.
    pub next_action: Option<String>,
    /// The session status reported by the backend, if any.
    pub session_status: Option<String>,
}

impl Reply {
    /// Creates a reply with the given text and escalation flag.
    #[inline]
    pub fn new<S: Into<String>>(text: S, requires_escalation: bool) -> Self {
        Self {
            text: text.into(),
            requires_escalation,
            next_action: None,
            session_status: None,
        }
    }
}

/// The backend's acknowledgement of an escalation.
///
/// The widget does not interpret any of these fields, they are only
/// kept for logging and for hosts that want to show them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Escalation {
    /// The session status after escalation.
    pub status: Option<String>,
    /// A conversation summary prepared for the human agent.
    pub summary: Option<String>,
    /// A human-readable confirmation.
    pub message: Option<String>,
}
