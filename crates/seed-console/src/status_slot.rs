use crate::bounded_log::{BoundedLog, LogRecord};
use seed_core::{ChatRole, LogLevel};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EphemeralStatus {
    pub label: String,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Active(EphemeralStatus),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotChange {
    Created,
    Updated,
}

/// Holds at most one live "working" indicator for a conversation stream.
#[derive(Clone, Debug, Default)]
pub struct EphemeralStatusSlot {
    state: SlotState,
}

impl EphemeralStatusSlot {
    pub fn progress(&mut self, label: impl Into<String>, detail: impl Into<String>) -> SlotChange {
        let label = label.into();
        let detail = detail.into();
        match &mut self.state {
            SlotState::Active(current) => {
                current.label = label;
                current.detail = detail;
                SlotChange::Updated
            }
            SlotState::Empty => {
                self.state = SlotState::Active(EphemeralStatus { label, detail });
                SlotChange::Created
            }
        }
    }

    pub fn terminate(&mut self) -> Option<EphemeralStatus> {
        match std::mem::take(&mut self.state) {
            SlotState::Active(status) => Some(status),
            SlotState::Empty => None,
        }
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn current(&self) -> Option<&EphemeralStatus> {
        match &self.state {
            SlotState::Active(status) => Some(status),
            SlotState::Empty => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SlotState::Active(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl LogRecord for ChatMessage {
    fn level(&self) -> LogLevel {
        match self.role {
            ChatRole::Error => LogLevel::Error,
            ChatRole::System => LogLevel::Debug,
            ChatRole::User => LogLevel::Command,
            ChatRole::Agent => LogLevel::Info,
        }
    }
}

/// A chat transcript paired with its status slot.
#[derive(Clone, Debug)]
pub struct ConversationStream {
    slot: EphemeralStatusSlot,
    transcript: BoundedLog<ChatMessage>,
}

impl ConversationStream {
    pub fn new(cap: usize) -> Self {
        Self {
            slot: EphemeralStatusSlot::default(),
            transcript: BoundedLog::new(cap),
        }
    }

    pub fn progress(&mut self, label: impl Into<String>, detail: impl Into<String>) -> SlotChange {
        self.slot.progress(label, detail)
    }

    /// Terminal event: the status row goes away, then the outcome is appended.
    pub fn finish(&mut self, role: ChatRole, text: impl Into<String>) {
        self.slot.terminate();
        self.append(role, text.into());
    }

    /// Terminal event without a payload to show.
    pub fn settle(&mut self) {
        self.slot.terminate();
    }

    pub fn push(&mut self, role: ChatRole, text: impl Into<String>) {
        if role.is_terminal() {
            self.slot.terminate();
        }
        self.append(role, text.into());
    }

    pub fn clear(&mut self) {
        self.slot.terminate();
        self.transcript.clear();
    }

    pub fn status(&self) -> Option<&EphemeralStatus> {
        self.slot.current()
    }

    pub fn slot(&self) -> &EphemeralStatusSlot {
        &self.slot
    }

    pub fn transcript(&self) -> &BoundedLog<ChatMessage> {
        &self.transcript
    }

    fn append(&mut self, role: ChatRole, text: String) {
        self.transcript.append(ChatMessage { role, text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_creates_then_updates_in_place() {
        let mut slot = EphemeralStatusSlot::default();
        assert_eq!(slot.progress("thinking", "A"), SlotChange::Created);
        assert_eq!(slot.progress("thinking", "B"), SlotChange::Updated);
        assert_eq!(slot.progress("executing", "C"), SlotChange::Updated);
        assert_eq!(
            slot.current(),
            Some(&EphemeralStatus {
                label: "executing".to_string(),
                detail: "C".to_string(),
            })
        );
    }

    #[test]
    fn terminate_always_returns_to_empty() {
        let mut slot = EphemeralStatusSlot::default();
        assert_eq!(slot.terminate(), None);
        assert_eq!(slot.state(), &SlotState::Empty);

        slot.progress("thinking", "A");
        assert!(slot.terminate().is_some());
        assert!(!slot.is_active());
        assert_eq!(slot.progress("thinking", "again"), SlotChange::Created);
    }

    #[test]
    fn finish_leaves_one_entry_and_no_status() {
        for progress_events in 0..4 {
            let mut stream = ConversationStream::new(10);
            for idx in 0..progress_events {
                stream.progress("thinking", format!("step {idx}"));
                assert!(stream.slot().is_active());
            }
            stream.finish(ChatRole::Agent, "done");
            assert!(stream.status().is_none());
            assert_eq!(stream.transcript().len(), 1);
            assert_eq!(
                stream.transcript().last(),
                Some(&ChatMessage {
                    role: ChatRole::Agent,
                    text: "done".to_string(),
                })
            );
        }
    }

    #[test]
    fn streams_do_not_share_status() {
        let mut primary = ConversationStream::new(10);
        let mut adversary = ConversationStream::new(10);
        primary.progress("thinking", "A");
        adversary.progress("scouting", "north");
        primary.finish(ChatRole::Agent, "done");
        assert!(primary.status().is_none());
        assert_eq!(
            adversary.status().map(|status| status.detail.as_str()),
            Some("north")
        );
    }

    #[test]
    fn user_message_keeps_status_but_agent_reply_clears_it() {
        let mut stream = ConversationStream::new(10);
        stream.progress("thinking", "A");
        stream.push(ChatRole::User, "hurry");
        assert!(stream.slot().is_active());
        stream.push(ChatRole::Agent, "ok");
        assert!(!stream.slot().is_active());
        assert_eq!(stream.transcript().len(), 2);
    }

    #[test]
    fn settle_clears_without_appending() {
        let mut stream = ConversationStream::new(10);
        stream.progress("thinking", "A");
        stream.settle();
        assert!(stream.status().is_none());
        assert!(stream.transcript().is_empty());
    }
}
