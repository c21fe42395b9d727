use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::backend::TaskBackend;
use crate::errors::{Result, TaskboardError};
use crate::session::SessionStorage;
use crate::task::{Task, TaskStatus};
use crate::task_form::{TaskForm, TaskMutation};
use crate::user::User;

pub const TABLE_COLUMNS: [&str; 5] = ["name", "description", "added", "updated", "status"];

pub struct TasksView {
    backend: Arc<dyn TaskBackend>,
    user: User,
    table_data: Vec<Task>,
}

impl TasksView {
    /// Reads the session user and loads their tasks.
    pub async fn open(backend: Arc<dyn TaskBackend>, session: &SessionStorage) -> Result<Self> {
        let user = session.user().ok_or(TaskboardError::NotLoggedIn)?;
        let mut view = Self {
            backend,
            user,
            table_data: Vec::new(),
        };
        view.refresh().await?;
        Ok(view)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn table_data(&self) -> &[Task] {
        &self.table_data
    }

    /// First visible task with `task_id`. Ids can repeat, so callers holding
    /// a row should use it directly.
    pub fn find(&self, task_id: u32) -> Option<&Task> {
        self.table_data.iter().find(|t| t.task_id == task_id)
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.table_data.iter().filter(|t| t.status == status).collect()
    }

    /// Re-fetches the table. On failure the previous rows stay in place.
    pub async fn refresh(&mut self) -> Result<()> {
        self.table_data = self.backend.tasks_for_user(&self.user.user_name).await?;
        Ok(())
    }

    pub fn add_form(&self) -> TaskForm {
        TaskForm::add(&self.user.user_name)
    }

    pub fn edit_form(&self, task_id: u32) -> Result<TaskForm> {
        let task = self.find(task_id).ok_or(TaskboardError::TaskNotFound { task_id })?;
        Ok(self.edit_form_for(task))
    }

    pub fn edit_form_for(&self, task: &Task) -> TaskForm {
        TaskForm::edit(&self.user.user_name, task)
    }

    pub async fn submit(&mut self, form: &TaskForm) -> Result<bool> {
        let mutation = form.submit(&self.table_data, Utc::now());
        self.manage(mutation).await
    }

    pub async fn delete(&mut self, task_id: u32) -> Result<bool> {
        self.manage(TaskMutation::Delete { task_id }).await
    }

    pub async fn move_task(&mut self, task_id: u32, direction: isize) -> Result<bool> {
        let task = self
            .find(task_id)
            .cloned()
            .ok_or(TaskboardError::TaskNotFound { task_id })?;
        self.move_task_for(&task, direction).await
    }

    /// Moves a task one status step through an edit of its status.
    pub async fn move_task_for(&mut self, task: &Task, direction: isize) -> Result<bool> {
        let mut form = self.edit_form_for(task);
        form.values.status = task.status.step(direction);
        self.submit(&form).await
    }

    /// Sends the mutation and re-fetches on any non-null response. Returns
    /// whether the backend reported a change.
    async fn manage(&mut self, mutation: TaskMutation) -> Result<bool> {
        let path = mutation.path();
        match self.backend.apply(&mutation).await? {
            Some(_) => {
                info!(%path, user = %self.user.user_name, "task mutation applied");
                self.refresh().await?;
                Ok(true)
            }
            None => {
                warn!(%path, "backend returned null; table left as is");
                Ok(false)
            }
        }
    }
}
