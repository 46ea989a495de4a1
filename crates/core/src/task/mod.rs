//! Task module
//!
//! This module contains task-related types and logic.

mod file_store;
mod model;
mod repository;

pub use file_store::{FileTaskStore, TASKS_FILE_NAME};
pub use model::*;
pub use repository::TaskRepository;
