//! Multi-tenant to-do service with a keyword-driven chat interface.

pub mod agent;
pub mod api;
pub mod auth;
pub mod models;
pub mod routes;
pub mod settings;
pub mod state;
pub mod store;

pub use agent::{AgentReply, Intent, TodoAgent, ToolCall};
pub use settings::Settings;
pub use store::{Store, StoreError, TaskStore};
