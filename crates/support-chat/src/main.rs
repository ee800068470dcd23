//! A simple program demonstrates how to use `support-chat` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::future::Future;
use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use support_chat::core::transcript::{Message, Origin};
use support_chat::core::Outcome;
use support_chat::http::DEFAULT_BASE_URL;
use support_chat::render::{
    format_history_entry, format_message, rejection_hint, session_label,
};
use support_chat::{SupportChat, SupportChatBuilder};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

const HELP_TEXT: &str =
    "Type a message and press Enter. Commands: /escalate, /history, /quit";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let base_url = env::var("SUPPORT_CHAT_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let chat = SupportChatBuilder::with_base_url(base_url)
        .on_transcript(move |message: &Message| {
            event_tx.send(message.clone()).ok();
        })
        .build();

    match chat.health().await {
        Ok(health) if health.is_healthy() => {
            debug!(status = %health.status, "backend is healthy");
        }
        Ok(health) => {
            warn!(status = %health.status, "backend reports unhealthy");
        }
        Err(err) => warn!("backend health check failed: {err}"),
    }

    println!("{}", "AI Customer Support".bold());
    println!("{}", session_label(None).dimmed());

    let started = wait(chat.start(), &mut event_rx, "Connecting...").await;
    // No retry, a failed start leaves the chat without a session for good.
    let session_failed = !matches!(started, Outcome::Done(_));
    match started {
        Outcome::Done(session_id) => {
            println!("{}", session_label(Some(&session_id)).dimmed());
        }
        _ => {
            println!(
                "{}Could not start a session. Is the backend running?",
                BAR_CHAR.bright_red()
            );
        }
    }
    println!("{}", HELP_TEXT.dimmed());

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        // The text goes out as typed, only the line terminator is dropped.
        let text = line.trim_end_matches(['\r', '\n']);

        match text.trim() {
            "/quit" => break,
            "/escalate" => {
                let outcome =
                    wait(chat.escalate(), &mut event_rx, "Escalating...").await;
                report_rejection(&outcome, session_failed);
            }
            "/history" => print_history(&chat).await,
            _ => {
                chat.set_input(text);
                let outcome =
                    wait(chat.submit(), &mut event_rx, "🤔 Thinking...").await;
                report_rejection(&outcome, session_failed);
            }
        }
    }
}

/// Shows a spinner and prints transcript messages until `completion` ends.
async fn wait<T>(
    completion: impl Future<Output = Outcome<T>>,
    event_rx: &mut mpsc::UnboundedReceiver<Message>,
    progress_message: &'static str,
) -> Outcome<T> {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut completion = pin!(completion);
    let mut progress_bar = None;

    let outcome = loop {
        // Create a new progress bar if it has been finished.
        progress_bar
            .get_or_insert_with(|| {
                let progress_bar = ProgressBar::new_spinner();
                progress_bar.set_style(progress_style.clone());
                progress_bar.set_message(progress_message);
                progress_bar
            })
            .inc(1);

        let sleep = sleep(Duration::from_millis(100));
        let message = select! {
            outcome = &mut completion => break outcome,
            Some(message) = event_rx.recv() => message,
            _ = sleep => continue,
        };

        // Finish the progress bar before printing anything else.
        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        print_message(&message);
    };

    if let Some(progress_bar) = progress_bar {
        progress_bar.finish_and_clear();
    }
    // Messages appended right before the completion resolved.
    while let Ok(message) = event_rx.try_recv() {
        print_message(&message);
    }
    outcome
}

fn print_message(message: &Message) {
    // The user's own lines are already on screen.
    if message.origin() != Origin::User {
        println!("{}", format_message(message));
    }
}

fn report_rejection<T>(outcome: &Outcome<T>, session_failed: bool) {
    let Outcome::Rejected(rejection) = outcome else {
        return;
    };
    let Some(hint) = rejection_hint(*rejection, session_failed) else {
        return;
    };
    println!("{}{}", BAR_CHAR.bright_yellow(), hint.dimmed());
}

async fn print_history(chat: &SupportChat) {
    match chat.history().await {
        Ok(entries) if entries.is_empty() => {
            println!("{}", "No history yet.".dimmed());
        }
        Ok(entries) => {
            for entry in &entries {
                println!("{}", format_history_entry(entry).dimmed());
            }
        }
        Err(err) => {
            error!("failed to fetch history: {err}");
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
