use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use support_chat_protocol::Reply;
use support_chat_test_backend::{Call, PresetReply, TestBackend};
use tokio::time::timeout;

use super::*;
use crate::transcript::Origin;

fn origins(snapshot: &Snapshot) -> Vec<Origin> {
    snapshot.transcript.iter().map(|m| m.origin()).collect()
}

fn texts(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .transcript
        .iter()
        .map(|m| m.text().to_owned())
        .collect()
}

fn is_send(call: &Call) -> bool {
    matches!(call, Call::SendMessage { .. })
}

fn is_escalate(call: &Call) -> bool {
    matches!(call, Call::Escalate { .. })
}

async fn ready_widget(backend: &TestBackend) -> Widget {
    let widget = WidgetBuilder::with_backend(backend.clone()).build();
    let session = widget.create_session().await.done().unwrap();
    assert_eq!(session.as_str(), "abc123");
    widget
}

#[tokio::test]
async fn test_create_session() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = WidgetBuilder::with_backend(backend.clone()).build();
    assert_eq!(widget.snapshot().stage, Stage::Uninitialized);

    let outcome = widget.create_session().await;
    assert_eq!(outcome.done().unwrap().as_str(), "abc123");

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.stage, Stage::Ready(Activity::Idle));
    assert_eq!(snapshot.session_id.unwrap().as_str(), "abc123");
    assert_eq!(origins(&widget.snapshot()), [Origin::Assistant]);
    assert_eq!(texts(&widget.snapshot()), [WELCOME_TEXT]);
    assert_eq!(backend.calls(), [Call::CreateSession]);
}

#[tokio::test]
async fn test_create_session_only_once() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = ready_widget(&backend).await;

    let outcome = widget.create_session().await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::AlreadyStarted));
    assert_eq!(backend.calls(), [Call::CreateSession]);
    assert_eq!(widget.snapshot().transcript.len(), 1);
}

#[tokio::test]
async fn test_session_creation_failure() {
    let backend = TestBackend::default();
    backend.add_reply(PresetReply::with_text("unused"));
    let widget = WidgetBuilder::with_backend(backend.clone()).build();

    assert_eq!(widget.create_session().await, Outcome::Failed);

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.stage, Stage::AwaitingSession);
    assert!(snapshot.session_id.is_none());
    assert!(snapshot.transcript.is_empty());

    // No retry, and the exchanger stays blocked.
    let outcome = widget.create_session().await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::AlreadyStarted));
    let outcome = widget.send_message("Hello?").await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::NoSession));
    let outcome = widget.escalate().await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::NoSession));

    assert_eq!(backend.calls(), [Call::CreateSession]);
    assert!(widget.snapshot().transcript.is_empty());
}

#[tokio::test]
async fn test_operations_before_session() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = WidgetBuilder::with_backend(backend.clone()).build();

    let outcome = widget.send_message("Hi").await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::NoSession));
    let outcome = widget.escalate().await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::NoSession));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_send_message() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(PresetReply::with_text("I can help with that."));
    let widget = ready_widget(&backend).await;

    let outcome = widget.send_message("I need a refund").await;
    assert_eq!(
        outcome,
        Outcome::Done(Reply::new("I can help with that.", false))
    );

    let snapshot = widget.snapshot();
    assert_eq!(
        origins(&snapshot),
        [Origin::Assistant, Origin::User, Origin::Assistant]
    );
    assert_eq!(
        texts(&snapshot)[1..],
        ["I need a refund", "I can help with that."]
    );
    assert!(!snapshot.transcript.last().unwrap().escalation_suggested());
    assert!(!snapshot.is_pending());

    assert_eq!(
        backend.calls()[1..],
        [Call::SendMessage {
            session: "abc123".to_owned(),
            text: "I need a refund".to_owned(),
        }]
    );
    assert_eq!(backend.count_calls(is_escalate), 0);
}

#[tokio::test]
async fn test_ids_strictly_increase() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(PresetReply::with_text("One"));
    backend.add_reply(PresetReply::failure());
    backend.add_reply(PresetReply::with_text("Three").requiring_escalation());
    let widget = ready_widget(&backend).await;

    for text in ["first", "second", "third"] {
        widget.send_message(text).await;
    }

    let snapshot = widget.snapshot();
    let ids: Vec<u64> = snapshot.transcript.iter().map(|m| m.id().get()).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_user_message_is_appended_before_reply() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = ready_widget(&backend).await;
    backend.set_delay(Duration::from_secs(3));
    backend.add_reply(PresetReply::with_text("I can help with that."));

    widget.set_input("I need a refund");
    let mut snapshots = widget.subscribe();
    let completion = widget.submit();

    let snapshot = snapshots
        .wait_for(|s| s.is_pending())
        .await
        .unwrap()
        .clone();
    assert_eq!(origins(&snapshot), [Origin::Assistant, Origin::User]);
    assert_eq!(texts(&snapshot)[1], "I need a refund");
    assert_eq!(snapshot.input, "");
    assert_eq!(backend.count_calls(is_send), 1);

    let outcome = completion.await;
    assert!(matches!(outcome, Outcome::Done(_)));
    let snapshot = widget.snapshot();
    assert!(!snapshot.is_pending());
    assert_eq!(snapshot.transcript.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_send_while_pending_is_rejected() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = ready_widget(&backend).await;
    backend.set_delay(Duration::from_secs(1));
    backend.add_reply(PresetReply::with_text("First answer"));
    backend.add_reply(PresetReply::with_text("Second answer"));

    let first = widget.send_message("first");
    let second = widget.send_message("second");

    assert_eq!(second.await, Outcome::Rejected(Rejection::SendPending));
    assert_eq!(
        first.await,
        Outcome::Done(Reply::new("First answer", false))
    );

    let snapshot = widget.snapshot();
    assert_eq!(texts(&snapshot)[1..], ["first", "First answer"]);
    assert_eq!(backend.count_calls(is_send), 1);

    // The flag is cleared, so sending works again.
    let outcome = widget.send_message("second").await;
    assert_eq!(outcome, Outcome::Done(Reply::new("Second answer", false)));
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(PresetReply::with_text("unused"));
    let widget = ready_widget(&backend).await;

    for text in ["", "   ", "\n\t "] {
        let outcome = widget.send_message(text).await;
        assert_eq!(outcome, Outcome::Rejected(Rejection::EmptyMessage));
    }

    widget.set_input("  ");
    let outcome = widget.submit().await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::EmptyMessage));
    // A rejected draft stays in the buffer.
    assert_eq!(widget.snapshot().input, "  ");

    assert_eq!(widget.snapshot().transcript.len(), 1);
    assert_eq!(backend.count_calls(is_send), 0);
}

#[tokio::test]
async fn test_text_is_sent_untrimmed() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(PresetReply::with_text("Sure."));
    let widget = ready_widget(&backend).await;

    widget.send_message("  hello there \n").await;
    assert_eq!(texts(&widget.snapshot())[1], "  hello there \n");
    assert_eq!(
        backend.calls()[1],
        Call::SendMessage {
            session: "abc123".to_owned(),
            text: "  hello there \n".to_owned(),
        }
    );
}

#[tokio::test]
async fn test_reply_requiring_escalation() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(
        PresetReply::with_text("Let me find a human for you.")
            .requiring_escalation(),
    );
    let widget = ready_widget(&backend).await;

    let outcome = widget.send_message("I want to speak to a manager").await;
    assert_eq!(
        outcome,
        Outcome::Done(Reply::new("Let me find a human for you.", true))
    );

    let snapshot = widget.snapshot();
    assert_eq!(
        origins(&snapshot),
        [
            Origin::Assistant,
            Origin::User,
            Origin::Assistant,
            Origin::System
        ]
    );
    assert!(snapshot.transcript.as_slice()[2].escalation_suggested());
    assert_eq!(texts(&snapshot)[3], ESCALATION_NOTICE_TEXT);
    assert!(!snapshot.is_pending());

    // The escalation call follows the message call.
    assert_eq!(
        backend.calls()[1..],
        [
            Call::SendMessage {
                session: "abc123".to_owned(),
                text: "I want to speak to a manager".to_owned(),
            },
            Call::Escalate {
                session: "abc123".to_owned(),
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pending_until_automatic_escalation_ends() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = ready_widget(&backend).await;
    backend.set_delay(Duration::from_secs(2));
    backend.add_reply(PresetReply::with_text("Escalating.").requiring_escalation());

    let mut snapshots = widget.subscribe();
    let completion = widget.send_message("Help");

    // The assistant message shows up while the escalation is in flight.
    let snapshot = snapshots
        .wait_for(|s| s.transcript.len() == 3)
        .await
        .unwrap()
        .clone();
    assert!(snapshot.is_pending());
    assert_eq!(backend.count_calls(is_escalate), 1);

    let outcome = widget.send_message("Another").await;
    assert_eq!(outcome, Outcome::Rejected(Rejection::SendPending));

    assert!(matches!(completion.await, Outcome::Done(_)));
    let snapshot = widget.snapshot();
    assert!(!snapshot.is_pending());
    assert_eq!(snapshot.transcript.last().unwrap().origin(), Origin::System);
}

#[tokio::test]
async fn test_failed_automatic_escalation() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(PresetReply::with_text("Escalating.").requiring_escalation());
    backend.fail_escalations(1);
    let widget = ready_widget(&backend).await;

    let outcome = widget.send_message("Help").await;
    assert_eq!(outcome, Outcome::Done(Reply::new("Escalating.", true)));

    let snapshot = widget.snapshot();
    assert_eq!(
        origins(&snapshot),
        [Origin::Assistant, Origin::User, Origin::Assistant]
    );
    assert!(!snapshot.is_pending());
    assert_eq!(backend.count_calls(is_escalate), 1);
}

#[tokio::test]
async fn test_send_failure() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(PresetReply::failure());
    let widget = ready_widget(&backend).await;

    let outcome = widget.send_message("I need a refund").await;
    assert_eq!(outcome, Outcome::Failed);

    let snapshot = widget.snapshot();
    assert_eq!(
        origins(&snapshot),
        [Origin::Assistant, Origin::User, Origin::Assistant]
    );
    assert_eq!(texts(&snapshot)[2], CONNECTION_ERROR_TEXT);
    assert!(!snapshot.is_pending());
    assert_eq!(backend.count_calls(is_send), 1);
    assert_eq!(backend.count_calls(is_escalate), 0);
}

#[tokio::test]
async fn test_manual_escalation_twice() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = ready_widget(&backend).await;

    // Escalations are not deduplicated.
    assert_eq!(widget.escalate().await, Outcome::Done(()));
    assert_eq!(widget.escalate().await, Outcome::Done(()));

    let snapshot = widget.snapshot();
    assert_eq!(
        origins(&snapshot),
        [Origin::Assistant, Origin::System, Origin::System]
    );
    assert_eq!(backend.count_calls(is_escalate), 2);
}

#[tokio::test]
async fn test_manual_escalation_failure() {
    let backend = TestBackend::with_session_id("abc123");
    backend.fail_escalations(1);
    let widget = ready_widget(&backend).await;

    assert_eq!(widget.escalate().await, Outcome::Failed);
    assert_eq!(widget.snapshot().transcript.len(), 1);
    assert_eq!(backend.count_calls(is_escalate), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_escalation_while_sending() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = ready_widget(&backend).await;
    backend.add_reply(PresetReply::with_text("Working on it."));
    backend.set_delay(Duration::from_secs(1));

    let send = widget.send_message("Where is my order?");
    let escalate = widget.escalate();

    assert_eq!(escalate.await, Outcome::Done(()));
    assert!(matches!(send.await, Outcome::Done(_)));
    assert_eq!(backend.count_calls(is_escalate), 1);
    assert_eq!(widget.snapshot().transcript.len(), 4);
}

#[tokio::test]
async fn test_callbacks() {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(PresetReply::with_text("I can help with that."));
    backend.add_reply(PresetReply::failure());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let idle_count = Arc::new(AtomicUsize::new(0));
    let widget = WidgetBuilder::with_backend(backend.clone())
        .on_transcript({
            let seen = Arc::clone(&seen);
            move |message| {
                seen.lock().unwrap().push((message.id(), message.origin()));
            }
        })
        .on_idle({
            let idle_count = Arc::clone(&idle_count);
            move || {
                idle_count.fetch_add(1, Ordering::Relaxed);
            }
        })
        .build();

    widget.create_session().await;
    widget.send_message("I need a refund").await;
    widget.send_message("Hello?").await;

    let seen = seen.lock().unwrap().clone();
    let origins: Vec<_> = seen.iter().map(|(_, origin)| *origin).collect();
    assert_eq!(
        origins,
        [
            Origin::Assistant,
            Origin::User,
            Origin::Assistant,
            Origin::User,
            Origin::Assistant,
        ]
    );
    assert_eq!(idle_count.load(Ordering::Relaxed), 2);
}

async fn idle_count_after_escalating_reply(escalation_fails: bool) -> usize {
    let backend = TestBackend::with_session_id("abc123");
    backend.add_reply(
        PresetReply::with_text("Let me get a human.").requiring_escalation(),
    );
    if escalation_fails {
        backend.fail_escalations(1);
    }

    let idle_count = Arc::new(AtomicUsize::new(0));
    let widget = WidgetBuilder::with_backend(backend.clone())
        .on_idle({
            let idle_count = Arc::clone(&idle_count);
            move || {
                idle_count.fetch_add(1, Ordering::Relaxed);
            }
        })
        .build();

    widget.create_session().await;
    let outcome = widget.send_message("Get me a manager").await;
    assert!(matches!(outcome, Outcome::Done(_)));
    assert_eq!(backend.count_calls(is_escalate), 1);
    assert!(!widget.snapshot().is_pending());
    idle_count.load(Ordering::Relaxed)
}

#[tokio::test]
async fn test_idle_once_after_escalation() {
    assert_eq!(idle_count_after_escalating_reply(false).await, 1);
}

#[tokio::test]
async fn test_idle_once_after_failed_escalation() {
    assert_eq!(idle_count_after_escalating_reply(true).await, 1);
}

#[tokio::test]
async fn test_task_stops_after_handles_dropped() {
    let backend = TestBackend::with_session_id("abc123");
    let widget = ready_widget(&backend).await;
    let mut snapshots = widget.subscribe();
    snapshots.borrow_and_update();
    drop(widget);

    // The snapshot sender goes away with the task.
    timeout(Duration::from_millis(500), snapshots.changed())
        .await
        .unwrap()
        .unwrap_err();
}
