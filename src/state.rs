use crate::settings::Settings;
use crate::store::Store;
use std::sync::Arc;

/// Everything a handler needs. The store is the only mutable resource and
/// it does its own locking.
pub struct AppState {
    pub store: Store,
    pub settings: Settings,
}

pub type SharedState = Arc<AppState>;
