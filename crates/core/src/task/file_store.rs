//! File-based task storage implementation
//!
//! Stores the whole task list as one JSON array on disk. Every mutation
//! rewrites the file atomically (temp file, fsync, rename).

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::model::{next_order, NewTask, Task, TaskMove, TaskUpdate};
use super::repository::TaskRepository;
use crate::{Error, Result};

/// File name of the task list inside the data directory
pub const TASKS_FILE_NAME: &str = "tasks_db.json";

/// File-based task store using JSON
pub struct FileTaskStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory task list, the source of truth while the process runs
    tasks: Arc<Mutex<Vec<Task>>>,
}

impl FileTaskStore {
    /// Load the store from `path`
    ///
    /// A missing file yields an empty store. A file that cannot be decoded
    /// into valid tasks is logged and replaced by an empty store on the next
    /// save. Other read failures are returned.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        tokio::fs::create_dir_all(parent_dir(&path)).await?;

        let tasks = match tokio::fs::read(&path).await {
            Ok(bytes) => match decode_tasks(&bytes) {
                Ok(tasks) => {
                    info!("Loaded {} tasks from {}", tasks.len(), path.display());
                    tasks
                }
                Err(reason) => {
                    let err = Error::CorruptStore {
                        path: path.clone(),
                        reason,
                    };
                    error!("{}; starting with an empty task list", err);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No task file at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            tasks: Arc::new(Mutex::new(tasks)),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole in-memory task list to disk
    pub async fn save(&self) -> Result<()> {
        let tasks = self.tasks.lock().await;
        write_tasks(&self.path, &tasks).await
    }

    /// Run `op` against the task list and save the result, under one lock
    ///
    /// The critical section runs on its own tokio task so that dropping the
    /// caller (e.g. a client disconnect) cannot interrupt a save halfway.
    /// When `op` fails nothing is written.
    async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut tasks = Arc::clone(&self.tasks).lock_owned().await;
        let path = self.path.clone();

        tokio::spawn(async move {
            let output = op(&mut *tasks)?;
            write_tasks(&path, &tasks[..]).await?;
            Ok::<_, Error>(output)
        })
        .await
        .map_err(|e| Error::Storage(format!("Task store write did not complete: {}", e)))?
    }
}

fn find_mut(tasks: &mut [Task], id: Uuid) -> Result<&mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id() == id)
        .ok_or(Error::TaskNotFound(id))
}

fn decode_tasks(bytes: &[u8]) -> std::result::Result<Vec<Task>, String> {
    let content = std::str::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {}", e))?;
    let tasks: Vec<Task> = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if !seen.insert(task.id()) {
            return Err(format!("duplicate task id {}", task.id()));
        }
    }
    Ok(tasks)
}

fn encode_tasks(tasks: &[Task]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    tasks.serialize(&mut serializer)?;
    Ok(buf)
}

async fn write_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    let content = encode_tasks(tasks)?;
    write_atomic(path, &content).await.map_err(|source| {
        error!("Failed to save tasks to {}: {}", path.display(), source);
        Error::Persistence {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!("Saved {} tasks to {}", tasks.len(), path.display());
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Replace the contents of `path` with `bytes` without ever exposing a
/// partially written file
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_atomic_with(path, bytes, |_| Ok(())).await
}

/// [`write_atomic`] with a hook that runs after the temp file is durable and
/// before it is renamed into place
async fn write_atomic_with<F>(path: &Path, bytes: &[u8], before_rename: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let dir = parent_dir(path);
    tokio::fs::create_dir_all(dir).await?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| TASKS_FILE_NAME.to_string());
    let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let result = async {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        before_rename(&tmp_path)?;
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(err) = result {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove temp file {}: {}",
                    tmp_path.display(),
                    cleanup
                );
            }
        }
        return Err(err);
    }

    // Make the rename itself durable
    if let Err(e) = sync_dir(dir).await {
        debug!("Failed to sync directory {}: {}", dir.display(), e);
    }

    Ok(())
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[async_trait]
impl TaskRepository for FileTaskStore {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        let task = self
            .mutate(move |tasks| {
                let order = next_order(tasks, new_task.status);
                let task = new_task.into_task(order)?;
                tasks.push(task.clone());
                Ok(task)
            })
            .await?;
        info!("Created task {} in '{}'", task.id(), task.status());
        Ok(task)
    }

    async fn get(&self, id: Uuid) -> Result<Task> {
        let tasks = self.tasks.lock().await;
        tasks
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or(Error::TaskNotFound(id))
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.clone())
    }

    async fn update(&self, id: Uuid, update: TaskUpdate) -> Result<Task> {
        self.mutate(move |tasks| {
            let task = find_mut(tasks, id)?;
            update.apply(task)?;
            Ok(task.clone())
        })
        .await
    }

    async fn move_task(&self, id: Uuid, task_move: TaskMove) -> Result<Task> {
        let task = self
            .mutate(move |tasks| {
                let task = find_mut(tasks, id)?;
                task_move.apply(task)?;
                Ok(task.clone())
            })
            .await?;
        debug!(
            "Moved task {} to '{}' at order {}",
            task.id(),
            task.status(),
            task.order()
        );
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.mutate(move |tasks| {
            let index = tasks
                .iter()
                .position(|t| t.id() == id)
                .ok_or(Error::TaskNotFound(id))?;
            tasks.remove(index);
            Ok(())
        })
        .await?;
        info!("Deleted task {}", id);
        Ok(())
    }
}
