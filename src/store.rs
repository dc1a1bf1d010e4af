//! Tasks, users and the conversation log, persisted in redb.
//!
//! Every public operation runs in exactly one redb transaction. Reads that
//! lead to a write (toggle, update, delete) happen inside the same write
//! transaction, and redb only admits one writer at a time, so concurrent
//! read-modify-write calls on one task cannot lose an update.

use crate::models::{
    CompletionUpdate, Conversation, Message, Role, StatusFilter, Task, TaskPatch, User,
};
use chrono::Utc;
use redb::{Database, ReadableTable, Table, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const TASKS: TableDefinition<u64, &[u8]> = TableDefinition::new("tasks");
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("email_index");
/// Keyed by user id: one conversation per user.
const CONVERSATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("conversations");
/// Keyed by (conversation id, message id) so a range scan yields one
/// conversation in insertion order.
const MESSAGES: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("messages");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_TASK_ID: &str = "next_task_id";
const NEXT_CONVERSATION_ID: &str = "next_conversation_id";
const NEXT_MESSAGE_ID: &str = "next_message_id";

// ── Task store seam ───────────────────────────────────────────

/// The operations the command interpreter and the task API need.
///
/// Every id-based call is scoped by `user_id`. A task owned by someone else
/// comes back as `None`, exactly like a missing one.
pub trait TaskStore {
    fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, StoreError>;

    /// The caller's tasks in ascending id order.
    fn list_tasks(
        &self,
        user_id: &str,
        filter: Option<StatusFilter>,
    ) -> Result<Vec<Task>, StoreError>;

    fn get_task(&self, id: u64, user_id: &str) -> Result<Option<Task>, StoreError>;

    fn update_task(
        &self,
        id: u64,
        user_id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError>;

    fn set_completed(
        &self,
        id: u64,
        user_id: &str,
        update: CompletionUpdate,
    ) -> Result<Option<Task>, StoreError>;

    /// Removes the task and hands it back, so callers can report its title.
    fn delete_task(&self, id: u64, user_id: &str) -> Result<Option<Task>, StoreError>;
}

/// Handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database at `path` and make sure every table
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(TASKS)?;
            let _ = txn.open_table(USERS)?;
            let _ = txn.open_table(EMAIL_INDEX)?;
            let _ = txn.open_table(CONVERSATIONS)?;
            let _ = txn.open_table(MESSAGES)?;
            let _ = txn.open_table(META)?;
        }
        txn.commit()?;

        Ok(Store { db: Arc::new(db) })
    }

    /// Read-modify-write on one owned task inside a single write transaction.
    fn modify_task(
        &self,
        id: u64,
        user_id: &str,
        edit: impl FnOnce(&mut Task),
    ) -> Result<Option<Task>, StoreError> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut tasks = txn.open_table(TASKS)?;
            let owned = load_owned(&tasks, id, user_id)?;
            match owned {
                Some(mut task) => {
                    edit(&mut task);
                    task.updated_at = Utc::now();
                    tasks.insert(id, encode(&task)?.as_slice())?;
                    Some(task)
                }
                None => None,
            }
        };

        match updated {
            Some(task) => {
                txn.commit()?;
                Ok(Some(task))
            }
            None => {
                txn.abort()?;
                Ok(None)
            }
        }
    }

    // ── Users ─────────────────────────────────────────────────

    /// Insert a new user. Returns false (and writes nothing) when the email
    /// is already registered.
    pub fn insert_user(&self, user: &User) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let taken = {
            let index = txn.open_table(EMAIL_INDEX)?;
            let taken = index.get(user.email.as_str())?.is_some();
            taken
        };
        if taken {
            txn.abort()?;
            return Ok(false);
        }

        {
            let mut users = txn.open_table(USERS)?;
            let mut index = txn.open_table(EMAIL_INDEX)?;
            users.insert(user.id.as_str(), encode(user)?.as_slice())?;
            index.insert(user.email.as_str(), user.id.as_str())?;
        }
        txn.commit()?;
        tracing::debug!(user_id = %user.id, "user created");
        Ok(true)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        let user = match users.get(id)? {
            Some(bytes) => Some(decode(bytes.value())?),
            None => None,
        };
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(EMAIL_INDEX)?;
        let id = match index.get(email)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };

        let users = txn.open_table(USERS)?;
        let user = match users.get(id.as_str())? {
            Some(bytes) => Some(decode(bytes.value())?),
            None => None,
        };
        Ok(user)
    }

    // ── Conversation log ──────────────────────────────────────

    pub fn conversation(&self, user_id: &str) -> Result<Option<Conversation>, StoreError> {
        let txn = self.db.begin_read()?;
        let conversations = txn.open_table(CONVERSATIONS)?;
        let conversation = match conversations.get(user_id)? {
            Some(bytes) => Some(decode(bytes.value())?),
            None => None,
        };
        Ok(conversation)
    }

    /// Append a turn to the user's conversation, creating the conversation
    /// on first use.
    pub fn append_message(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
        tool_calls: Option<String>,
    ) -> Result<Message, StoreError> {
        let txn = self.db.begin_write()?;
        let message = {
            let mut conversations = txn.open_table(CONVERSATIONS)?;
            let mut messages = txn.open_table(MESSAGES)?;
            let mut meta = txn.open_table(META)?;

            let existing: Option<Conversation> = match conversations.get(user_id)? {
                Some(bytes) => Some(decode(bytes.value())?),
                None => None,
            };
            let conversation = match existing {
                Some(conversation) => conversation,
                None => {
                    let conversation = Conversation {
                        id: next_id(&mut meta, NEXT_CONVERSATION_ID)?,
                        user_id: user_id.to_string(),
                        created_at: Utc::now(),
                    };
                    conversations.insert(user_id, encode(&conversation)?.as_slice())?;
                    tracing::debug!(
                        user_id,
                        conversation_id = conversation.id,
                        "conversation opened"
                    );
                    conversation
                }
            };

            let message = Message {
                id: next_id(&mut meta, NEXT_MESSAGE_ID)?,
                conversation_id: conversation.id,
                role,
                content: content.to_string(),
                timestamp: Utc::now(),
                tool_calls,
            };
            messages.insert((conversation.id, message.id), encode(&message)?.as_slice())?;
            message
        };
        txn.commit()?;
        Ok(message)
    }

    /// Every message of the user's conversation, oldest first. Empty when
    /// the user never chatted.
    pub fn messages(&self, user_id: &str) -> Result<Vec<Message>, StoreError> {
        let Some(conversation) = self.conversation(user_id)? else {
            return Ok(Vec::new());
        };

        let txn = self.db.begin_read()?;
        let table = txn.open_table(MESSAGES)?;
        let mut messages = Vec::new();
        for entry in table.range((conversation.id, 0)..=(conversation.id, u64::MAX))? {
            let (_, value) = entry?;
            messages.push(decode(value.value())?);
        }
        Ok(messages)
    }
}

impl TaskStore for Store {
    fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, StoreError> {
        let txn = self.db.begin_write()?;
        let task = {
            let mut tasks = txn.open_table(TASKS)?;
            let mut meta = txn.open_table(META)?;

            let now = Utc::now();
            let task = Task {
                id: next_id(&mut meta, NEXT_TASK_ID)?,
                user_id: user_id.to_string(),
                title: title.to_string(),
                description: description.map(str::to_string),
                completed: false,
                created_at: now,
                updated_at: now,
            };
            tasks.insert(task.id, encode(&task)?.as_slice())?;
            task
        };
        txn.commit()?;
        tracing::debug!(task_id = task.id, user_id, "task created");
        Ok(task)
    }

    fn list_tasks(
        &self,
        user_id: &str,
        filter: Option<StatusFilter>,
    ) -> Result<Vec<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TASKS)?;

        // Linear scan over all tenants. Keys are ascending ids, so the
        // result comes out in creation order.
        let mut tasks = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let task: Task = decode(value.value())?;
            if task.user_id != user_id {
                continue;
            }
            if filter.map_or(true, |f| f.matches(&task)) {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    fn get_task(&self, id: u64, user_id: &str) -> Result<Option<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let tasks = txn.open_table(TASKS)?;
        load_owned(&tasks, id, user_id)
    }

    fn update_task(
        &self,
        id: u64,
        user_id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        self.modify_task(id, user_id, |task| {
            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = Some(description);
            }
            if let Some(completed) = patch.completed {
                task.completed = completed;
            }
        })
    }

    fn set_completed(
        &self,
        id: u64,
        user_id: &str,
        update: CompletionUpdate,
    ) -> Result<Option<Task>, StoreError> {
        self.modify_task(id, user_id, |task| {
            task.completed = update.apply(task.completed);
        })
    }

    fn delete_task(&self, id: u64, user_id: &str) -> Result<Option<Task>, StoreError> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut tasks = txn.open_table(TASKS)?;
            let owned = load_owned(&tasks, id, user_id)?;
            if owned.is_some() {
                tasks.remove(id)?;
            }
            owned
        };

        match removed {
            Some(task) => {
                txn.commit()?;
                tracing::debug!(task_id = id, user_id, "task deleted");
                Ok(Some(task))
            }
            None => {
                txn.abort()?;
                Ok(None)
            }
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────

/// Fetch a task, hiding it when `user_id` does not own it.
fn load_owned(
    tasks: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
    user_id: &str,
) -> Result<Option<Task>, StoreError> {
    let Some(bytes) = tasks.get(id)? else {
        return Ok(None);
    };
    let task: Task = decode(bytes.value())?;
    Ok((task.user_id == user_id).then_some(task))
}

/// Hand out the next value of a persisted counter. Counters start at 1 and
/// only move forward, so ids are never reissued.
fn next_id(meta: &mut Table<'_, &'static str, u64>, key: &str) -> Result<u64, StoreError> {
    let id = meta.get(key)?.map(|v| v.value()).unwrap_or(1);
    meta.insert(key, id + 1)?;
    Ok(id)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(value).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redb: {0}")]
    Redb(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("encode: {0}")]
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into StoreError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for StoreError {
            fn from(e: $t) -> Self { StoreError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (Store, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("todo.redb")).unwrap();
        (store, dir)
    }

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            email: email.into(),
            name: "Test".into(),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_assigns_increasing_ids() {
        let (store, _dir) = temp_store();

        let a = store.create_task("u1", "First", None).unwrap();
        let b = store.create_task("u2", "Second", Some("details")).unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(!a.completed);
        assert_eq!(b.description.as_deref(), Some("details"));
    }

    #[test]
    fn ids_are_not_reused_after_delete_or_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("todo.redb");

        {
            let store = Store::open(&path).unwrap();
            store.create_task("u1", "One", None).unwrap();
            let two = store.create_task("u1", "Two", None).unwrap();
            store.delete_task(two.id, "u1").unwrap();
        }

        let store = Store::open(&path).unwrap();
        let next = store.create_task("u1", "Three", None).unwrap();
        assert_eq!(next.id, 3);
    }

    #[test]
    fn foreign_tasks_read_as_missing() {
        let (store, _dir) = temp_store();
        let task = store.create_task("owner", "Private", None).unwrap();

        assert!(store.get_task(task.id, "intruder").unwrap().is_none());
        assert!(store
            .set_completed(task.id, "intruder", CompletionUpdate::Toggle)
            .unwrap()
            .is_none());
        assert!(store.delete_task(task.id, "intruder").unwrap().is_none());

        // Untouched for the owner.
        let still_there = store.get_task(task.id, "owner").unwrap().unwrap();
        assert!(!still_there.completed);
    }

    #[test]
    fn toggle_flips_each_call() {
        let (store, _dir) = temp_store();
        let task = store.create_task("u1", "Flip me", None).unwrap();

        let once = store
            .set_completed(task.id, "u1", CompletionUpdate::Toggle)
            .unwrap()
            .unwrap();
        assert!(once.completed);

        let twice = store
            .set_completed(task.id, "u1", CompletionUpdate::Toggle)
            .unwrap()
            .unwrap();
        assert!(!twice.completed);

        let set = store
            .set_completed(task.id, "u1", CompletionUpdate::Set(true))
            .unwrap()
            .unwrap();
        assert!(set.completed);
    }

    #[test]
    fn list_is_scoped_and_filtered() {
        let (store, _dir) = temp_store();
        let a = store.create_task("u1", "A", None).unwrap();
        store.create_task("u1", "B", None).unwrap();
        store.create_task("u2", "Not mine", None).unwrap();
        store.set_completed(a.id, "u1", CompletionUpdate::Set(true)).unwrap();

        let all = store.list_tasks("u1", None).unwrap();
        assert_eq!(all.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), ["A", "B"]);

        let done = store.list_tasks("u1", Some(StatusFilter::Completed)).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "A");

        let pending = store.list_tasks("u1", Some(StatusFilter::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "B");

        assert!(store.list_tasks("nobody", None).unwrap().is_empty());
    }

    #[test]
    fn update_applies_only_given_fields() {
        let (store, _dir) = temp_store();
        let task = store.create_task("u1", "Old", Some("keep me")).unwrap();

        let patch = TaskPatch {
            title: Some("New".into()),
            ..TaskPatch::default()
        };
        let updated = store.update_task(task.id, "u1", patch).unwrap().unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert!(updated.updated_at >= task.updated_at);
        assert!(store
            .update_task(task.id, "u2", TaskPatch::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn delete_returns_removed_task() {
        let (store, _dir) = temp_store();
        let task = store.create_task("u1", "Doomed", None).unwrap();

        let removed = store.delete_task(task.id, "u1").unwrap().unwrap();
        assert_eq!(removed.title, "Doomed");
        assert!(store.get_task(task.id, "u1").unwrap().is_none());
        assert!(store.delete_task(task.id, "u1").unwrap().is_none());
    }

    #[test]
    fn users_are_unique_by_email() {
        let (store, _dir) = temp_store();

        assert!(store.insert_user(&user("id-1", "a@example.com")).unwrap());
        assert!(!store.insert_user(&user("id-2", "a@example.com")).unwrap());

        let found = store.get_user_by_email("a@example.com").unwrap().unwrap();
        assert_eq!(found.id, "id-1");
        assert!(store.get_user("id-2").unwrap().is_none());
        assert!(store.get_user_by_email("b@example.com").unwrap().is_none());
    }

    #[test]
    fn conversation_log_keeps_order_per_user() {
        let (store, _dir) = temp_store();

        assert!(store.conversation("u1").unwrap().is_none());
        assert!(store.messages("u1").unwrap().is_empty());

        store.append_message("u1", Role::User, "list my tasks", None).unwrap();
        store.append_message("u2", Role::User, "hello", None).unwrap();
        store
            .append_message("u1", Role::Assistant, "You don't have any tasks.", Some("[]".into()))
            .unwrap();

        let conversation = store.conversation("u1").unwrap().unwrap();
        let messages = store.messages("u1").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.conversation_id == conversation.id));
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].tool_calls.as_deref(), Some("[]"));

        assert_eq!(store.messages("u2").unwrap().len(), 1);
        assert_ne!(store.conversation("u2").unwrap().unwrap().id, conversation.id);
    }
}
