//! Short-lived notices for whatever front end drives a session.

use std::time::{Duration, Instant};

use crate::autosave::{SaveState, SaveStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageType {
    fn lifetime(self) -> Duration {
        match self {
            Self::Info => Duration::from_secs(3),
            Self::Success => Duration::from_secs(2),
            Self::Warning => Duration::from_secs(5),
            Self::Error => Duration::from_secs(7),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub content: String,
    pub message_type: MessageType,
    created_at: Instant,
}

impl StatusMessage {
    pub fn new(content: impl Into<String>, message_type: MessageType) -> Self {
        Self {
            content: content.into(),
            message_type,
            created_at: Instant::now(),
        }
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.message_type.lifetime()
    }
}

/// Holds at most one notice. Save results arrive through
/// [`StatusManager::observe_save`]; the session posts the rest.
#[derive(Debug, Default)]
pub struct StatusManager {
    current: Option<StatusMessage>,
    seen_saves: u64,
}

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, message_type: MessageType, content: impl Into<String>) {
        self.current = Some(StatusMessage::new(content, message_type));
    }

    /// Post a notice for a save that finished since the last call, then drop
    /// an expired notice.
    pub fn observe_save(&mut self, state: &SaveState) {
        if state.completed > self.seen_saves {
            self.seen_saves = state.completed;
            match &state.status {
                SaveStatus::Saved => self.post(MessageType::Success, "Document saved"),
                SaveStatus::Failed(reason) => self.post(
                    MessageType::Error,
                    format!("Failed to save document: {}", reason),
                ),
                _ => {}
            }
        }
        self.update();
    }

    pub fn update(&mut self) {
        if self.current.as_ref().is_some_and(StatusMessage::is_expired) {
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_notices() {
        let mut manager = StatusManager::new();
        let mut state = SaveState {
            status: SaveStatus::Saved,
            completed: 1,
            ..SaveState::default()
        };

        manager.observe_save(&state);
        let message = manager.current().unwrap();
        assert_eq!(message.content, "Document saved");
        assert_eq!(message.message_type, MessageType::Success);

        // the same save is not announced twice
        manager.post(MessageType::Info, "typing");
        manager.observe_save(&state);
        assert_eq!(manager.current().unwrap().content, "typing");

        state.status = SaveStatus::Failed("disk full".to_string());
        state.completed = 2;
        manager.observe_save(&state);
        let message = manager.current().unwrap();
        assert_eq!(message.message_type, MessageType::Error);
        assert!(message.content.contains("disk full"));
    }

    #[test]
    fn test_expired_notice_is_dropped() {
        let mut manager = StatusManager::new();
        manager.post(MessageType::Warning, "Add a title before saving");
        manager.update();
        assert!(manager.current().is_some());

        if let Some(message) = manager.current.as_mut() {
            message.created_at = Instant::now() - Duration::from_secs(6);
        }
        manager.update();
        assert!(manager.current().is_none());
    }
}
