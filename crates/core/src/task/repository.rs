//! Task repository trait
//!
//! Defines the interface for task storage operations.

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Board, NewTask, Task, TaskMove, TaskUpdate};
use crate::Result;

/// Repository interface for task CRUD operations
///
/// Every mutating method is durable on return: the whole collection has been
/// written to the backing store before `Ok` comes back.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create a new task at the end of its status column
    async fn create(&self, new_task: NewTask) -> Result<Task>;

    /// Get a task by ID
    async fn get(&self, id: Uuid) -> Result<Task>;

    /// Get all tasks, in insertion order
    async fn list(&self) -> Result<Vec<Task>>;

    /// Update the title and/or description of a task
    async fn update(&self, id: Uuid, update: TaskUpdate) -> Result<Task>;

    /// Change the status and/or order of a task
    async fn move_task(&self, id: Uuid, task_move: TaskMove) -> Result<Task>;

    /// Delete a task by ID
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Get the tasks grouped into board columns
    async fn board(&self) -> Result<Board> {
        let tasks = self.list().await?;
        Ok(Board::from_tasks(&tasks))
    }
}
