// Participant lists and draw history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to a list created without one.
pub const DEFAULT_LIST_NAME: &str = "Untitled list";

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// A raffle entrant. Contact fields ride along untouched through draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A participant that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewParticipant {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewParticipant {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Assign a fresh id.
    pub fn into_participant(self) -> Participant {
        Participant {
            id: new_id("p"),
            name: self.name,
            email: self.email,
            phone: self.phone,
        }
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleList {
    pub id: String,
    pub name: String,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl RaffleList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id("list"),
            name: name.into(),
            participants: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// The inputs a draw was run with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawSettings {
    pub number_of_winners: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

/// One entry in the draw history. Keeps a copy of the list name and winners
/// so it stays readable after the list is edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleResult {
    pub id: String,
    pub list_id: String,
    pub list_name: String,
    pub drawn_at: DateTime<Utc>,
    pub winners: Vec<Participant>,
    pub settings: DrawSettings,
}

impl RaffleResult {
    pub fn new(list: &RaffleList, winners: Vec<Participant>, settings: DrawSettings) -> Self {
        Self {
            id: new_id("hist"),
            list_id: list.id.clone(),
            list_name: list.name.clone(),
            drawn_at: Utc::now(),
            winners,
            settings,
        }
    }
}

/// Generate a prefixed unique identifier, e.g. `list-6f1c…`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
