//! Application state

use std::path::PathBuf;
use std::sync::Arc;

use tasky_core::task::FileTaskStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    task_store: FileTaskStore,
}

impl AppState {
    /// Load the task store from `tasks_path` and wrap it for the handlers
    pub async fn new(tasks_path: PathBuf) -> tasky_core::Result<Self> {
        let task_store = FileTaskStore::load(tasks_path).await?;

        Ok(Self {
            inner: Arc::new(AppStateInner { task_store }),
        })
    }

    /// Get reference to the task store
    pub fn task_store(&self) -> &FileTaskStore {
        &self.inner.task_store
    }
}
