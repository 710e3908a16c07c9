//! Pure conversation state. No I/O; the session feeds it relay deliveries
//! and REST results.

use chrono::{DateTime, Utc};
use mindmate_models::account::{AccountKind, CounterpartSummary};
use mindmate_models::gateway::SendMessage;
use mindmate_models::message::{Message, RecipientKind};

/// Contact-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterpart {
    pub id: i64,
    pub name: String,
    pub kind: RecipientKind,
    pub has_unread: bool,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl From<CounterpartSummary> for Counterpart {
    fn from(summary: CounterpartSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            kind: match summary.kind {
                AccountKind::User => RecipientKind::User,
                AccountKind::Caretaker => RecipientKind::Caretaker,
            },
            has_unread: false,
            last_message_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineId {
    /// Store-assigned id of a confirmed message.
    Server(i64),
    /// `local-<millis>` placeholder for an optimistic line.
    Local(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub id: LineId,
    pub sender: i64,
    pub receiver: i64,
    pub body: String,
    pub at: DateTime<Utc>,
}

impl ChatLine {
    pub fn is_optimistic(&self) -> bool {
        matches!(self.id, LineId::Local(_))
    }
}

impl From<Message> for ChatLine {
    fn from(message: Message) -> Self {
        Self {
            id: LineId::Server(message.id),
            sender: message.sender,
            receiver: message.receiver,
            body: message.message,
            at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEffect {
    /// Our own echo; the optimistic line already covers it.
    OwnEcho,
    /// Appended to the open conversation and flagged.
    Appended,
    /// Sender flagged unread and moved to the front.
    Flagged,
    /// Sender is not in the contact list.
    UnknownSender,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored,
    /// Assistant conversations never touch the relay.
    Assistant { counterpart: i64, text: String },
    Relay(SendMessage),
}

/// Identifies one history load. Stale tickets are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub counterpart: i64,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    self_id: i64,
    counterparts: Vec<Counterpart>,
    open: Option<i64>,
    lines: Vec<ChatLine>,
    generation: u64,
}

impl ConversationState {
    pub fn new(self_id: i64) -> Self {
        Self {
            self_id,
            counterparts: Vec::new(),
            open: None,
            lines: Vec::new(),
            generation: 0,
        }
    }

    pub fn self_id(&self) -> i64 {
        self.self_id
    }

    pub fn counterparts(&self) -> &[Counterpart] {
        &self.counterparts
    }

    pub fn counterpart(&self, id: i64) -> Option<&Counterpart> {
        self.counterparts.iter().find(|c| c.id == id)
    }

    pub fn open_counterpart(&self) -> Option<i64> {
        self.open
    }

    pub fn lines(&self) -> &[ChatLine] {
        &self.lines
    }

    /// Replace the contact list, keeping flags for entries that survive.
    pub fn set_counterparts(&mut self, summaries: Vec<CounterpartSummary>) {
        let previous = std::mem::take(&mut self.counterparts);
        self.counterparts = summaries
            .into_iter()
            .filter(|s| s.id != self.self_id)
            .map(|summary| {
                let mut entry = Counterpart::from(summary);
                if let Some(old) = previous.iter().find(|c| c.id == entry.id) {
                    entry.has_unread = old.has_unread;
                    entry.last_message_at = old.last_message_at;
                }
                entry
            })
            .chain(previous.iter().filter(|c| c.kind == RecipientKind::Ai).cloned())
            .collect();
    }

    /// Add the assistant entry at the end of the list.
    pub fn add_assistant(&mut self, id: i64, name: &str) {
        if self.counterpart(id).is_some() {
            return;
        }
        self.counterparts.push(Counterpart {
            id,
            name: name.to_string(),
            kind: RecipientKind::Ai,
            has_unread: false,
            last_message_at: None,
        });
    }

    pub fn apply_delivery(&mut self, message: &Message) -> DeliveryEffect {
        if message.sender == self.self_id {
            return DeliveryEffect::OwnEcho;
        }
        let appended = self.open == Some(message.sender);
        if appended {
            self.lines.push(ChatLine::from(message.clone()));
        }
        let Some(entry) = self.promote(message.sender) else {
            return if appended {
                DeliveryEffect::Appended
            } else {
                DeliveryEffect::UnknownSender
            };
        };
        entry.has_unread = true;
        entry.last_message_at = Some(message.created_at);
        if appended {
            DeliveryEffect::Appended
        } else {
            DeliveryEffect::Flagged
        }
    }

    /// Optimistically append `text` to the open conversation.
    pub fn submit(&mut self, text: &str, now: DateTime<Utc>) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        let Some(counterpart) = self.open else {
            return SubmitOutcome::Ignored;
        };
        let kind = self
            .counterpart(counterpart)
            .map(|c| c.kind)
            .unwrap_or(RecipientKind::User);

        self.lines.push(ChatLine {
            id: LineId::Local(format!("local-{}", now.timestamp_millis())),
            sender: self.self_id,
            receiver: counterpart,
            body: text.to_string(),
            at: now,
        });
        if let Some(entry) = self.promote(counterpart) {
            entry.has_unread = false;
            entry.last_message_at = Some(now);
        }

        if kind == RecipientKind::Ai {
            return SubmitOutcome::Assistant {
                counterpart,
                text: text.to_string(),
            };
        }
        SubmitOutcome::Relay(SendMessage {
            receiver: Some(counterpart.to_string()),
            receiver_type: Some(kind.as_str().to_string()),
            message: Some(text.to_string()),
        })
    }

    /// Switch conversations. The list is cleared until the returned ticket
    /// is redeemed with [`ConversationState::replace_history`].
    pub fn open(&mut self, counterpart: i64) -> LoadTicket {
        self.generation += 1;
        self.open = Some(counterpart);
        self.lines.clear();
        if let Some(entry) = self.counterparts.iter_mut().find(|c| c.id == counterpart) {
            entry.has_unread = false;
        }
        LoadTicket {
            counterpart,
            generation: self.generation,
        }
    }

    /// Returns false when the ticket is stale and the history was dropped.
    pub fn replace_history(&mut self, ticket: LoadTicket, messages: Vec<Message>) -> bool {
        if ticket.generation != self.generation || self.open != Some(ticket.counterpart) {
            return false;
        }
        self.lines = messages.into_iter().map(ChatLine::from).collect();
        true
    }

    fn promote(&mut self, id: i64) -> Option<&mut Counterpart> {
        let index = self.counterparts.iter().position(|c| c.id == id)?;
        let entry = self.counterparts.remove(index);
        self.counterparts.insert(0, entry);
        self.counterparts.first_mut()
    }
}
