//! Keyword-driven command interpreter for the chat endpoint.
//!
//! text → [`intent::classify`] → [`slots`] → [`dispatch::dispatch`] → store
//! call → reply + tool calls.

pub mod dispatch;
pub mod intent;
pub mod slots;

pub use dispatch::{AgentReply, ToolCall};
pub use intent::{classify, Intent};

use crate::models::HistoryTurn;
use crate::store::{StoreError, TaskStore};

/// Stateless interpreter over a borrowed store. Cheap to build per request.
pub struct TodoAgent<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: TaskStore + ?Sized> TodoAgent<'a, S> {
    pub fn new(store: &'a S) -> Self {
        TodoAgent { store }
    }

    /// Interpret one chat message for `user_id`.
    ///
    /// `history` is the conversation so far; routing does not depend on it.
    /// Only store failures come back as `Err`.
    pub fn process(
        &self,
        text: &str,
        user_id: &str,
        history: &[HistoryTurn],
    ) -> Result<AgentReply, StoreError> {
        let intent = classify(text);
        tracing::debug!(user_id, ?intent, history_len = history.len(), "classified chat command");
        dispatch::dispatch(self.store, intent, text, user_id)
    }
}
