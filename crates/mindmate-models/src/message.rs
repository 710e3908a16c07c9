use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of participant categories a message can be addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    User,
    Caretaker,
    /// Automated assistant. Handled client-side, never persisted.
    Ai,
}

impl RecipientKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Caretaker => "caretaker",
            Self::Ai => "ai",
        }
    }

    pub fn is_persistable(self) -> bool {
        !matches!(self, Self::Ai)
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecipientKind(pub String);

impl fmt::Display for UnknownRecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown recipient kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownRecipientKind {}

impl FromStr for RecipientKind {
    type Err = UnknownRecipientKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "caretaker" => Ok(Self::Caretaker),
            "ai" => Ok(Self::Ai),
            _ => Err(UnknownRecipientKind(raw.to_string())),
        }
    }
}

/// A persisted chat message, as returned by history reads and pushed in
/// `receive_message` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(with = "crate::id")]
    pub id: i64,
    #[serde(with = "crate::id")]
    pub sender: i64,
    #[serde(with = "crate::id")]
    pub receiver: i64,
    pub receiver_type: RecipientKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_kind_parses_case_insensitively() {
        assert_eq!("User".parse::<RecipientKind>(), Ok(RecipientKind::User));
        assert_eq!(" CARETAKER ".parse::<RecipientKind>(), Ok(RecipientKind::Caretaker));
        assert_eq!("AI".parse::<RecipientKind>(), Ok(RecipientKind::Ai));
        assert!("admin".parse::<RecipientKind>().is_err());
    }

    #[test]
    fn message_serializes_ids_as_strings() {
        let msg = Message {
            id: 42,
            sender: 7,
            receiver: 9,
            receiver_type: RecipientKind::Caretaker,
            message: "hello".into(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["id"], "42");
        assert_eq!(value["sender"], "7");
        assert_eq!(value["receiverType"], "caretaker");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }
}
