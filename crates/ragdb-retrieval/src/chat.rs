//! Chat message assembly around retrieval.
//!
//! Retrieved context travels as one system message placed before the
//! caller's history; the completion itself is an opaque `Completer`.

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Completer;
use ragdb_core::types::{ChatMessage, Role};

use crate::service::RetrievalService;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const NO_QUESTION_REPLY: &str = "I can't seem to find your question.";

/// The most recent user message, if any.
pub fn last_user_message(history: &[ChatMessage]) -> Option<&str> {
    history.iter().rev().find(|m| m.role == Role::User).map(|m| m.content.as_str())
}

pub fn system_prompt(context: Option<&str>) -> String {
    match context {
        Some(context) => format!(
            "{DEFAULT_SYSTEM_PROMPT} Use the following context from a PDF document to answer the user's question.\n\nContext:\n{context}"
        ),
        None => DEFAULT_SYSTEM_PROMPT.to_string(),
    }
}

/// `history` with one system message prepended.
pub fn build_messages(history: &[ChatMessage], context: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(system_prompt(context)));
    messages.extend_from_slice(history);
    messages
}

/// Messages for the latest question, with retrieval context attached only
/// when `use_rag` is set and the index holds something. `None` when the
/// history has no user message.
pub fn prepare_messages(service: &RetrievalService, history: &[ChatMessage], use_rag: bool) -> Result<Option<Vec<ChatMessage>>> {
    let Some(question) = last_user_message(history) else {
        return Ok(None);
    };
    let context = if use_rag && !service.is_empty() { Some(service.search(question)?) } else { None };
    Ok(Some(build_messages(history, context.as_deref())))
}

pub fn answer(
    service: &RetrievalService,
    completer: &dyn Completer,
    history: &[ChatMessage],
    use_rag: bool,
) -> Result<String> {
    let Some(messages) = prepare_messages(service, history, use_rag)? else {
        return Ok(NO_QUESTION_REPLY.to_string());
    };
    completer
        .complete(&messages)
        .map_err(|e| Error::Completion(format!("{e:#}")))
}
