//! Turn a classified command into a store call and a reply.
//!
//! Each intent has one handler. Handlers that reach the store record what
//! they did as a [`ToolCall`]; handlers that stop early (missing title or
//! id, update, unknown) return no tool calls.

use super::intent::Intent;
use super::slots::{extract_status_filter, extract_task_draft, extract_task_id};
use crate::models::{CompletionUpdate, StatusFilter, Task};
use crate::store::{StoreError, TaskStore};
use serde::Serialize;

const NOT_FOUND: &str = "Task not found or unauthorized";

// ── Reply types ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReply {
    pub response: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AgentReply {
    fn text(response: impl Into<String>) -> Self {
        AgentReply {
            response: response.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// Audit record of one store call. Serializes as
/// `{"name": "...", "arguments": {...}, "result": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    AddTask {
        arguments: AddTaskArgs,
        result: TaskOutcome,
    },
    ListTasks {
        arguments: ListTasksArgs,
        result: TaskList,
    },
    CompleteTask {
        arguments: TaskRef,
        result: TaskOutcome,
    },
    DeleteTask {
        arguments: TaskRef,
        result: TaskOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddTaskArgs {
    pub title: String,
    pub description: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListTasksArgs {
    pub user_id: String,
    pub status: Option<StatusFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRef {
    pub task_id: u64,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    pub message: String,
}

impl TaskOutcome {
    fn done(task: Task, message: String) -> Self {
        TaskOutcome {
            success: true,
            task: Some(task),
            message,
        }
    }

    fn not_found() -> Self {
        TaskOutcome {
            success: false,
            task: None,
            message: NOT_FOUND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub count: usize,
    pub message: String,
}

// ── Dispatch ──────────────────────────────────────────────────

/// Run the handler for `intent`. Store failures propagate; everything else
/// becomes a reply.
pub fn dispatch<S: TaskStore + ?Sized>(
    store: &S,
    intent: Intent,
    text: &str,
    user_id: &str,
) -> Result<AgentReply, StoreError> {
    match intent {
        Intent::Add => add_task(store, text, user_id),
        Intent::List => list_tasks(store, text, user_id),
        Intent::Complete => complete_task(store, text, user_id),
        Intent::Delete => delete_task(store, text, user_id),
        Intent::Update => Ok(update_task(text)),
        Intent::Unknown => Ok(AgentReply::text(format!(
            "I understand you said: '{text}'. I can help you manage your tasks. \
             You can ask me to add, list, complete, delete, or update tasks."
        ))),
    }
}

fn add_task<S: TaskStore + ?Sized>(
    store: &S,
    text: &str,
    user_id: &str,
) -> Result<AgentReply, StoreError> {
    let draft = extract_task_draft(text);
    if draft.title.is_empty() {
        return Ok(AgentReply::text(
            "I couldn't understand what task you want to add. Please specify the task title.",
        ));
    }

    let description = (!draft.description.is_empty()).then_some(draft.description.as_str());
    let task = store.create_task(user_id, &draft.title, description)?;
    let message = format!("Task '{}' added successfully", task.title);

    Ok(AgentReply {
        response: format!("Successfully added task: {}", task.title),
        tool_calls: vec![ToolCall::AddTask {
            arguments: AddTaskArgs {
                title: draft.title,
                description: draft.description,
                user_id: user_id.to_string(),
            },
            result: TaskOutcome::done(task, message),
        }],
    })
}

fn list_tasks<S: TaskStore + ?Sized>(
    store: &S,
    text: &str,
    user_id: &str,
) -> Result<AgentReply, StoreError> {
    let status = extract_status_filter(text);
    let tasks = store.list_tasks(user_id, status)?;

    let response = if tasks.is_empty() {
        "You don't have any tasks.".to_string()
    } else {
        let lines: Vec<String> = tasks
            .iter()
            .map(|task| {
                let state = if task.completed { "COMPLETED" } else { "PENDING" };
                format!("- {}: {} ({state})", task.id, task.title)
            })
            .collect();
        format!("Here are your tasks:\n{}", lines.join("\n"))
    };

    let count = tasks.len();
    Ok(AgentReply {
        response,
        tool_calls: vec![ToolCall::ListTasks {
            arguments: ListTasksArgs {
                user_id: user_id.to_string(),
                status,
            },
            result: TaskList {
                tasks,
                count,
                message: format!("Found {count} tasks"),
            },
        }],
    })
}

/// Toggles rather than sets: completing a completed task reopens it.
fn complete_task<S: TaskStore + ?Sized>(
    store: &S,
    text: &str,
    user_id: &str,
) -> Result<AgentReply, StoreError> {
    let task_id = extract_task_id(text);
    if task_id == 0 {
        return Ok(AgentReply::text(
            "I couldn't identify which task to complete. Please specify the task number.",
        ));
    }

    let arguments = TaskRef {
        task_id,
        user_id: user_id.to_string(),
    };
    let toggled = store.set_completed(task_id, user_id, CompletionUpdate::Toggle)?;
    let (response, result) = match toggled {
        Some(task) => {
            let (verb, state) = if task.completed {
                ("completed", "completed")
            } else {
                ("marked as pending", "pending")
            };
            let message = format!("Task '{}' marked as {state}", task.title);
            (
                format!("Successfully {verb} task: {}", task.title),
                TaskOutcome::done(task, message),
            )
        }
        None => (
            format!("Failed to complete task: {NOT_FOUND}"),
            TaskOutcome::not_found(),
        ),
    };

    Ok(AgentReply {
        response,
        tool_calls: vec![ToolCall::CompleteTask { arguments, result }],
    })
}

fn delete_task<S: TaskStore + ?Sized>(
    store: &S,
    text: &str,
    user_id: &str,
) -> Result<AgentReply, StoreError> {
    let task_id = extract_task_id(text);
    if task_id == 0 {
        return Ok(AgentReply::text(
            "I couldn't identify which task to delete. Please specify the task number.",
        ));
    }

    let arguments = TaskRef {
        task_id,
        user_id: user_id.to_string(),
    };
    let (response, result) = match store.delete_task(task_id, user_id)? {
        Some(task) => {
            let message = format!("Task '{}' deleted successfully", task.title);
            (message.clone(), TaskOutcome::done(task, message))
        }
        None => (
            format!("Failed to delete task: {NOT_FOUND}"),
            TaskOutcome::not_found(),
        ),
    };

    Ok(AgentReply {
        response,
        tool_calls: vec![ToolCall::DeleteTask { arguments, result }],
    })
}

/// Updating through chat only asks for details; nothing is written.
fn update_task(text: &str) -> AgentReply {
    match extract_task_id(text) {
        0 => AgentReply::text(
            "I couldn't identify which task to update. Please specify the task number.",
        ),
        task_id => AgentReply::text(format!(
            "I can help you update task #{task_id}. Please specify what you'd like to change \
             (title, description, or completion status)."
        )),
    }
}
