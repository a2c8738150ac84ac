//! Chat log and memory facts.
//!
//! Appends never trim. The session trims the chat log once per action, after
//! the action's new messages have been collected, so indices taken at the
//! start of an action stay valid until it finishes.

use chrono::Utc;
use cubicle_types::{Channel, ChatMessage, GameState, MessageKind};

/// Display name used for engine-authored messages.
pub const SYSTEM_SENDER: &str = "System";

/// Append a message to the chat log.
pub fn post(
    state: &mut GameState,
    kind: MessageKind,
    sender: impl Into<String>,
    content: impl Into<String>,
    channel: &Channel,
) {
    let message = ChatMessage {
        kind,
        sender: sender.into(),
        content: content.into(),
        channel: channel.clone(),
        week: state.week,
        timestamp: Utc::now(),
    };
    state.chat_history.push(message);
}

/// Append a system message.
pub fn system(state: &mut GameState, content: impl Into<String>, channel: &Channel) {
    post(state, MessageKind::System, SYSTEM_SENDER, content, channel);
}

/// Record a notable fact. Blank and duplicate facts are ignored; the list
/// keeps only the newest `limit` entries.
pub fn remember(state: &mut GameState, fact: impl Into<String>, limit: usize) {
    let fact = fact.into();
    let fact = fact.trim();
    if fact.is_empty() || state.memory_facts.iter().any(|f| f == fact) {
        return;
    }
    state.memory_facts.push(fact.to_owned());
    let excess = state.memory_facts.len().saturating_sub(limit);
    if excess > 0 {
        state.memory_facts.drain(..excess);
    }
}

/// Drop the oldest chat messages beyond `limit`.
pub fn trim(state: &mut GameState, limit: usize) {
    let excess = state.chat_history.len().saturating_sub(limit);
    if excess > 0 {
        state.chat_history.drain(..excess);
    }
}

/// Messages appended since the log had `mark` entries.
pub fn since(state: &GameState, mark: usize) -> Vec<ChatMessage> {
    state.chat_history.get(mark..).map(<[ChatMessage]>::to_vec).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit;

    #[test]
    fn facts_are_capped_and_deduplicated() {
        let mut state = testkit::state();
        for i in 0..30 {
            remember(&mut state, format!("fact {i}"), 20);
            remember(&mut state, format!("fact {i}"), 20);
        }
        remember(&mut state, "   ", 20);
        assert_eq!(state.memory_facts.len(), 20);
        assert_eq!(state.memory_facts.first().unwrap(), "fact 10");
        assert_eq!(state.memory_facts.last().unwrap(), "fact 29");
    }

    #[test]
    fn trim_keeps_newest_messages() {
        let mut state = testkit::state();
        state.chat_history.clear();
        for i in 0..5 {
            system(&mut state, format!("m{i}"), &Channel::Group);
        }
        trim(&mut state, 3);
        let contents: Vec<_> = state.chat_history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m2", "m3", "m4"]);
    }

    #[test]
    fn since_returns_new_tail() {
        let mut state = testkit::state();
        let mark = state.chat_history.len();
        system(&mut state, "hello", &Channel::Workbench);
        let fresh = since(&state, mark);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh.first().unwrap().channel, Channel::Workbench);
        assert!(since(&state, usize::MAX).is_empty());
    }
}
