use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskPatch, TaskStatus};

/// The four fields the form edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFormValues {
    pub user: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
}

impl TaskFormValues {
    pub fn for_user(user_name: impl Into<String>) -> Self {
        Self {
            user: user_name.into(),
            name: "New Task".to_string(),
            description: "My new task description".to_string(),
            status: TaskStatus::Do,
        }
    }

    pub fn to_task(&self, task_id: u32, now: DateTime<Utc>) -> Task {
        Task {
            task_id,
            user: self.user.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            added: now,
            updated: now,
            is_active: true,
        }
    }

    pub fn to_patch(&self, now: DateTime<Utc>) -> TaskPatch {
        TaskPatch {
            user: self.user.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            updated: now,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit { task_id: u32 },
}

impl FormMode {
    pub fn title(&self) -> &'static str {
        match self {
            FormMode::Add => "Add Task",
            FormMode::Edit { .. } => "Edit Task",
        }
    }
}

/// A path + payload pair ready to be posted, or applied locally.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskMutation {
    Add(Task),
    Update { task_id: u32, patch: TaskPatch },
    Delete { task_id: u32 },
}

impl TaskMutation {
    pub fn path(&self) -> String {
        match self {
            TaskMutation::Add(_) => "/api/tasks/add".to_string(),
            TaskMutation::Update { task_id, .. } => format!("/api/tasks/update/{task_id}"),
            TaskMutation::Delete { .. } => "/api/tasks/delete".to_string(),
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        let value = match self {
            TaskMutation::Add(task) => serde_json::to_value(task),
            TaskMutation::Update { patch, .. } => serde_json::to_value(patch),
            TaskMutation::Delete { task_id } => {
                serde_json::to_value(crate::task::DeleteRequest { task_id: *task_id })
            }
        };
        // Plain structs with string keys always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    pub mode: FormMode,
    pub values: TaskFormValues,
}

impl TaskForm {
    pub fn add(user_name: &str) -> Self {
        Self {
            mode: FormMode::Add,
            values: TaskFormValues::for_user(user_name),
        }
    }

    /// Opens the form on an existing task. Only name, description and status
    /// are patched in; `user` stays the session user's.
    pub fn edit(user_name: &str, task: &Task) -> Self {
        let mut values = TaskFormValues::for_user(user_name);
        values.name = task.name.clone();
        values.description = task.description.clone();
        values.status = task.status;
        Self {
            mode: FormMode::Edit {
                task_id: task.task_id,
            },
            values,
        }
    }

    pub fn title(&self) -> &'static str {
        self.mode.title()
    }

    /// `table_data` is the list the user currently sees; a new task takes
    /// its length + 1 as id.
    pub fn submit(&self, table_data: &[Task], now: DateTime<Utc>) -> TaskMutation {
        match self.mode {
            FormMode::Add => {
                TaskMutation::Add(self.values.to_task(table_data.len() as u32 + 1, now))
            }
            FormMode::Edit { task_id } => TaskMutation::Update {
                task_id,
                patch: self.values.to_patch(now),
            },
        }
    }
}
