//! Terminal rendering of the transcript.

use chrono::{DateTime, Local, Utc};
use owo_colors::{AnsiColors, OwoColorize};
use support_chat_core::Rejection;
use support_chat_core::transcript::{Message, Origin};
use support_chat_http_backend::HistoryEntry;
use support_chat_protocol::SessionId;

/// Shown under assistant messages that suggest escalation.
pub const ESCALATION_WARNING_TEXT: &str =
    "⚠️  I recommend escalating this to a human agent";

const BAR_CHAR: &str = "▎";

/// Returns the session indicator shown in the header.
pub fn session_label(session_id: Option<&SessionId>) -> String {
    match session_id {
        Some(session_id) => format!("Session: {}", session_id.short()),
        None => "Session: Loading...".to_owned(),
    }
}

/// Formats `timestamp` as a local wall-clock time.
#[inline]
pub fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Renders one transcript message, possibly over several lines.
pub fn format_message(message: &Message) -> String {
    let (color, icon) = match message.origin() {
        Origin::User => (AnsiColors::BrightGreen, "🧑 "),
        Origin::Assistant => (AnsiColors::BrightCyan, "🤖 "),
        Origin::System => (AnsiColors::BrightYellow, ""),
    };
    let bar = BAR_CHAR.color(color);

    let mut out = format!("{bar}{icon}{}", message.text().bright_white());
    if message.escalation_suggested() {
        out.push_str(&format!("\n{bar}{}", ESCALATION_WARNING_TEXT.yellow()));
    }
    out.push_str(&format!(
        "\n{bar}{}",
        format_time(message.timestamp()).dimmed()
    ));
    out
}

/// Renders one entry of the backend's stored history.
pub fn format_history_entry(entry: &HistoryEntry) -> String {
    let who = if entry.is_user { "you" } else { "assistant" };
    let timestamp = entry.timestamp.as_deref().unwrap_or("-");
    let mut out = format!("[{timestamp}] {who}: {}", entry.message);
    if entry.requires_escalation {
        out.push_str(" (escalation suggested)");
    }
    out
}

/// Returns what to tell the user about a rejected operation, if anything.
///
/// `session_failed` is set once session creation has failed, after which no
/// session will ever be assigned.
pub fn rejection_hint(
    rejection: Rejection,
    session_failed: bool,
) -> Option<&'static str> {
    match rejection {
        Rejection::NoSession if session_failed => {
            Some("Session unavailable, restart to try again.")
        }
        Rejection::NoSession => Some("No session yet, please wait."),
        Rejection::SendPending => Some("Still waiting for the previous reply."),
        Rejection::EmptyMessage | Rejection::AlreadyStarted => None,
    }
}
