use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Participant category of a stored account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Caretaker,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Caretaker => "caretaker",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "caretaker" => Ok(Self::Caretaker),
            other => Err(format!("unknown account kind '{other}'")),
        }
    }
}

/// Contact-list entry for one counterpart identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartSummary {
    #[serde(with = "crate::id")]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub kind: AccountKind,
}

/// Raw message counts where the caller is sender or recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCounts {
    pub total_interactions: i64,
    pub today_interactions: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerIds {
    #[serde(with = "crate::id::vec")]
    pub user_ids: Vec<i64>,
}

/// Gamification counters after a `message_sent` activity was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCounters {
    pub points: i64,
    pub chat_messages: i64,
}
