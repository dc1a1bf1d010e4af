use super::internal_error;
use crate::agent::{AgentReply, TodoAgent};
use crate::models::{HistoryTurn, Role, User};
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<u64>,
    pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Serialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
}

// POST /api/chat
//
// Logs the user turn, runs the interpreter, logs the assistant turn with its
// tool calls. Store failures surface as 500s, never as chat replies.
pub async fn chat(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<AgentReply>, (StatusCode, String)> {
    if payload.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message must not be empty".to_string()));
    }
    let store = &state.store;

    store
        .append_message(&user.id, Role::User, &payload.message, None)
        .map_err(internal_error)?;

    let history: Vec<HistoryTurn> = store
        .messages(&user.id)
        .map_err(internal_error)?
        .iter()
        .map(HistoryTurn::from)
        .collect();

    let reply = TodoAgent::new(store)
        .process(&payload.message, &user.id, &history)
        .map_err(internal_error)?;

    let tool_calls = if reply.tool_calls.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&reply.tool_calls).map_err(internal_error)?)
    };
    store
        .append_message(&user.id, Role::Assistant, &reply.response, tool_calls)
        .map_err(internal_error)?;

    tracing::info!(user_id = %user.id, tool_calls = reply.tool_calls.len(), "chat turn handled");
    Ok(Json(reply))
}

// GET /api/chat/history
pub async fn history(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let conversation = state.store.conversation(&user.id).map_err(internal_error)?;
    let messages = state
        .store
        .messages(&user.id)
        .map_err(internal_error)?
        .into_iter()
        .map(|message| HistoryMessage {
            role: message.role,
            tool_calls: message
                .tool_calls
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            content: message.content,
            timestamp: message.timestamp,
        })
        .collect();

    Ok(Json(HistoryResponse {
        conversation_id: conversation.map(|c| c.id),
        messages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tasks::tests::{test_state, test_user};
    use crate::store::TaskStore;

    async fn say(state: &SharedState, user: &str, message: &str) -> AgentReply {
        let Json(reply) = chat(
            State(state.clone()),
            Extension(test_user(user)),
            Json(ChatRequest {
                message: message.into(),
            }),
        )
        .await
        .unwrap();
        reply
    }

    #[tokio::test]
    async fn chat_mutates_tasks_and_logs_both_turns() {
        let (state, _dir) = test_state();

        let reply = say(&state, "u1", "Add a task to buy groceries").await;
        assert_eq!(reply.response, "Successfully added task: a task to buy groceries");
        assert_eq!(state.store.list_tasks("u1", None).unwrap().len(), 1);

        let Json(history) = history(State(state.clone()), Extension(test_user("u1")))
            .await
            .unwrap();
        assert!(history.conversation_id.is_some());
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages[0].role, Role::User);
        assert_eq!(history.messages[0].content, "Add a task to buy groceries");
        assert_eq!(history.messages[1].role, Role::Assistant);
        let calls = history.messages[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0]["name"], "add_task");
    }

    #[tokio::test]
    async fn replies_without_tool_calls_log_none() {
        let (state, _dir) = test_state();

        say(&state, "u1", "good morning").await;

        let messages = state.store.messages("u1").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].tool_calls.is_none());
    }

    #[tokio::test]
    async fn history_is_empty_before_first_message() {
        let (state, _dir) = test_state();

        let Json(history) = history(State(state.clone()), Extension(test_user("u1")))
            .await
            .unwrap();

        assert!(history.conversation_id.is_none());
        assert!(history.messages.is_empty());
    }

    #[tokio::test]
    async fn conversations_are_per_user() {
        let (state, _dir) = test_state();

        say(&state, "u1", "add walk the dog").await;
        let reply = say(&state, "u2", "list my tasks").await;

        assert_eq!(reply.response, "You don't have any tasks.");
        assert_eq!(state.store.messages("u1").unwrap().len(), 2);
        assert_eq!(state.store.messages("u2").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let (state, _dir) = test_state();

        let err = chat(
            State(state.clone()),
            Extension(test_user("u1")),
            Json(ChatRequest { message: "  ".into() }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(state.store.messages("u1").unwrap().is_empty());
    }
}
