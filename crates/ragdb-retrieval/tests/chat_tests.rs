use std::sync::Arc;

use parking_lot::Mutex;
use ragdb_core::config::Settings;
use ragdb_core::traits::Completer;
use ragdb_core::types::{ChatMessage, Role};
use ragdb_embed::FakeEmbedder;
use ragdb_retrieval::chat::{answer, build_messages, last_user_message, prepare_messages, NO_QUESTION_REPLY};
use ragdb_retrieval::RetrievalService;

#[derive(Default)]
struct RecordingCompleter {
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl Completer for RecordingCompleter {
    fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.seen.lock().push(messages.to_vec());
        Ok("an answer".to_string())
    }
}

fn service_with(text: Option<&str>) -> RetrievalService {
    let service = RetrievalService::in_memory(Arc::new(FakeEmbedder::default()), &Settings::default()).unwrap();
    if let Some(text) = text {
        service.add_text(text).unwrap();
    }
    service
}

#[test]
fn finds_latest_user_message() {
    let history = vec![
        ChatMessage::user("first question"),
        ChatMessage::assistant("a reply"),
        ChatMessage::user("second question"),
        ChatMessage::assistant("another reply"),
    ];
    assert_eq!(last_user_message(&history), Some("second question"));
    assert_eq!(last_user_message(&[ChatMessage::assistant("hi")]), None);
}

#[test]
fn system_message_is_prepended() {
    let history = vec![ChatMessage::user("q")];
    let plain = build_messages(&history, None);
    assert_eq!(plain.len(), 2);
    assert_eq!(plain[0], ChatMessage::system("You are a helpful assistant."));
    assert_eq!(plain[1], history[0]);

    let with_ctx = build_messages(&history, Some("CTX"));
    assert_eq!(with_ctx[0].role, Role::System);
    assert!(with_ctx[0].content.ends_with("\n\nContext:\nCTX"));
    assert!(with_ctx[0].content.starts_with("You are a helpful assistant. Use the following context"));
}

#[test]
fn context_attached_only_when_requested_and_indexed() {
    let history = vec![ChatMessage::user("what do lighthouses do")];

    let empty = service_with(None);
    let msgs = prepare_messages(&empty, &history, true).unwrap().unwrap();
    assert_eq!(msgs[0].content, "You are a helpful assistant.");

    let full = service_with(Some("Lighthouses warn ships away from rocks."));
    let msgs = prepare_messages(&full, &history, false).unwrap().unwrap();
    assert_eq!(msgs[0].content, "You are a helpful assistant.");
    let msgs = prepare_messages(&full, &history, true).unwrap().unwrap();
    assert!(msgs[0].content.contains("Lighthouses warn ships away from rocks."));
}

#[test]
fn no_question_skips_the_model() {
    let completer = RecordingCompleter::default();
    let service = service_with(None);
    let reply = answer(&service, &completer, &[ChatMessage::assistant("hello")], true).unwrap();
    assert_eq!(reply, NO_QUESTION_REPLY);
    assert!(completer.seen.lock().is_empty());
}

#[test]
fn answer_passes_history_through_completer() {
    let completer = RecordingCompleter::default();
    let service = service_with(Some("Tides follow the moon around the earth."));
    let history = vec![ChatMessage::user("why are there tides")];
    assert_eq!(answer(&service, &completer, &history, true).unwrap(), "an answer");
    let seen = completer.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 2);
    assert_eq!(seen[0][1], history[0]);
}

#[test]
fn roles_serialize_lowercase() {
    let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
    assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
}
