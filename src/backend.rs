use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::{Result, TaskboardError};
use crate::http_service::HttpService;
use crate::task::Task;
use crate::task_board::TaskBoard;
use crate::task_form::TaskMutation;
use crate::user::{Credentials, User, UserStore};

#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// `None` when no user matches.
    async fn login(&self, credentials: &Credentials) -> Result<Option<User>>;

    async fn tasks_for_user(&self, user_name: &str) -> Result<Vec<Task>>;

    /// Applies a mutation. `None` mirrors a `null` response: nothing changed.
    async fn apply(&self, mutation: &TaskMutation) -> Result<Option<Value>>;
}

/// Static users and an in-memory task array, optionally mirrored to a file.
#[derive(Debug)]
pub struct LocalBackend {
    users: UserStore,
    board: RwLock<TaskBoard>,
    tasks_file: Option<PathBuf>,
}

impl LocalBackend {
    pub fn new(users: UserStore, board: TaskBoard) -> Self {
        Self {
            users,
            board: RwLock::new(board),
            tasks_file: None,
        }
    }

    /// Loads the board from `path` if it exists, otherwise starts from
    /// `seed`; every applied mutation is written back.
    pub fn with_tasks_file(users: UserStore, seed: Vec<Task>, path: PathBuf) -> Result<Self> {
        let board = TaskBoard::load_from_file(&path)?.unwrap_or_else(|| TaskBoard::new(seed));
        Ok(Self {
            users,
            board: RwLock::new(board),
            tasks_file: Some(path),
        })
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.board.read().await.tasks.clone()
    }
}

#[async_trait]
impl TaskBackend for LocalBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Option<User>> {
        Ok(self.users.find_by_credentials(credentials).cloned())
    }

    async fn tasks_for_user(&self, user_name: &str) -> Result<Vec<Task>> {
        Ok(self.board.read().await.tasks_for_user(user_name))
    }

    async fn apply(&self, mutation: &TaskMutation) -> Result<Option<Value>> {
        let mut board = self.board.write().await;
        let response = match mutation {
            TaskMutation::Add(task) => Some(serde_json::to_value(board.add_task(task.clone()))?),
            TaskMutation::Update { task_id, patch } => match board.update_task(*task_id, patch) {
                Ok(task) => Some(serde_json::to_value(task)?),
                Err(TaskboardError::TaskNotFound { .. }) => None,
                Err(e) => return Err(e),
            },
            TaskMutation::Delete { task_id } => match board.delete_task(*task_id) {
                Ok(_) => Some(serde_json::json!({ "taskId": task_id })),
                Err(TaskboardError::TaskNotFound { .. }) => None,
                Err(e) => return Err(e),
            },
        };
        if response.is_some() {
            if let Some(path) = &self.tasks_file {
                board.save_to_file(path)?;
                debug!(path = %path.display(), "saved tasks");
            }
        }
        Ok(response)
    }
}

/// The placeholder REST API, reached through [`HttpService`].
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    http: HttpService,
}

impl RemoteBackend {
    pub fn connect(base_url: impl Into<String>) -> Result<Self> {
        let http = HttpService::new(base_url)?;
        info!(base_url = http.base_url(), "using remote backend");
        Ok(Self { http })
    }
}

#[async_trait]
impl TaskBackend for RemoteBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Option<User>> {
        self.http
            .post_service_data("/api/users/login", credentials)
            .await
    }

    async fn tasks_for_user(&self, user_name: &str) -> Result<Vec<Task>> {
        self.http
            .get_service_data_at(&["api", "tasks", "user", user_name])
            .await
    }

    async fn apply(&self, mutation: &TaskMutation) -> Result<Option<Value>> {
        self.http
            .post_service_data(&mutation.path(), &mutation.payload())
            .await
    }
}
