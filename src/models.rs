use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Entity types ──────────────────────────────────────────────

/// A to-do item. Owned by exactly one user; every lookup is scoped by
/// `user_id` and a mismatch reads as "not found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned, monotonically increasing. Never reused.
    pub id: u64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// What clients get to see of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// One conversation per user, created lazily on the first chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation log.
///
/// `tool_calls` is the JSON-encoded list of tool calls the assistant made
/// for this turn, or `None` when it made none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub conversation_id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tool_calls: Option<String>,
}

// ── Query / mutation inputs ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
        }
    }
}

/// How `set_completed` should change the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionUpdate {
    Set(bool),
    /// Flip whatever the current value is.
    Toggle,
}

impl CompletionUpdate {
    pub fn apply(self, current: bool) -> bool {
        match self {
            CompletionUpdate::Set(value) => value,
            CompletionUpdate::Toggle => !current,
        }
    }
}

/// Partial update. `None` fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// A `{role, content}` pair replayed to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryTurn {
    fn from(message: &Message) -> Self {
        HistoryTurn {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(completed: bool) -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            user_id: "u1".into(),
            title: "Water plants".into(),
            description: None,
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn toggle_flips_and_set_overrides() {
        assert!(CompletionUpdate::Toggle.apply(false));
        assert!(!CompletionUpdate::Toggle.apply(true));
        assert!(CompletionUpdate::Set(true).apply(true));
        assert!(!CompletionUpdate::Set(false).apply(true));
    }

    #[test]
    fn status_filter_matches_completion() {
        assert!(StatusFilter::Completed.matches(&task(true)));
        assert!(!StatusFilter::Completed.matches(&task(false)));
        assert!(StatusFilter::Pending.matches(&task(false)));
        assert!(!StatusFilter::Pending.matches(&task(true)));
    }

    #[test]
    fn user_response_drops_password_hash() {
        let user = User {
            id: "abc".into(),
            email: "a@example.com".into(),
            name: "Ada".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&UserResponse::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("a@example.com"));
    }
}
