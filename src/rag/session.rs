//! Conversation history per session.

use std::collections::HashMap;

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
        }
    }
}

/// Keeps a bounded conversation history for each session.
#[derive(Debug)]
pub struct SessionManager {
    max_history: usize,
    next_id: u64,
    sessions: HashMap<String, Vec<(Speaker, String)>>,
}

impl SessionManager {
    /// Create a manager keeping the last `max_history` exchanges per session.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            next_id: 0,
            sessions: HashMap::new(),
        }
    }

    /// Start a new, empty session and return its id.
    pub fn create_session(&mut self) -> String {
        self.next_id += 1;
        let id = format!("session_{}", self.next_id);
        self.sessions.insert(id.clone(), Vec::new());
        id
    }

    /// Record one question and answer.
    pub fn add_exchange(&mut self, session_id: &str, question: &str, answer: &str) {
        let messages = self.sessions.entry(session_id.to_string()).or_default();
        messages.push((Speaker::User, question.to_string()));
        messages.push((Speaker::Assistant, answer.to_string()));

        let keep = self.max_history * 2;
        if messages.len() > keep {
            messages.drain(..messages.len() - keep);
        }
    }

    /// Rendered history for a session, or `None` when there is none.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let messages = self.sessions.get(session_id)?;
        if messages.is_empty() {
            return None;
        }

        Some(
            messages
                .iter()
                .map(|(speaker, text)| format!("{}: {}", speaker.label(), text))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget all messages of a session.
    pub fn clear(&mut self, session_id: &str) {
        if let Some(messages) = self.sessions.get_mut(session_id) {
            messages.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_sequential() {
        let mut manager = SessionManager::new(2);
        assert_eq!(manager.create_session(), "session_1");
        assert_eq!(manager.create_session(), "session_2");
    }

    #[test]
    fn test_history_rendering_and_trimming() {
        let mut manager = SessionManager::new(1);
        let id = manager.create_session();
        assert_eq!(manager.history(&id), None);

        manager.add_exchange(&id, "What is a unit test?", "A test of one unit.");
        assert_eq!(
            manager.history(&id).unwrap(),
            "User: What is a unit test?\nAssistant: A test of one unit."
        );

        manager.add_exchange(&id, "And integration?", "Several units together.");
        assert_eq!(
            manager.history(&id).unwrap(),
            "User: And integration?\nAssistant: Several units together."
        );
    }

    #[test]
    fn test_clear_and_unknown_sessions() {
        let mut manager = SessionManager::new(2);
        let id = manager.create_session();
        manager.add_exchange(&id, "q", "a");
        manager.clear(&id);
        assert_eq!(manager.history(&id), None);
        assert_eq!(manager.history("session_99"), None);
    }
}
