use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Do,
    Doing,
    Done,
}

impl TaskStatus {
    /// Board order, left to right.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Do, TaskStatus::Doing, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Do => "do",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// Steps along the board, clamped at both ends.
    pub fn step(&self, direction: isize) -> TaskStatus {
        let next = (self.index() as isize + direction).clamp(0, Self::ALL.len() as isize - 1);
        Self::ALL[next as usize]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "do" => Ok(TaskStatus::Do),
            "doing" => Ok(TaskStatus::Doing),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown status '{other}', expected do, doing or done")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: u32,
    pub user: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Body of `POST /api/tasks/update/:taskId`: the edit form values plus a
/// fresh `updated` stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub user: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub updated: DateTime<Utc>,
    pub is_active: bool,
}

impl Task {
    /// Spreads the patch over the task; `taskId` and `added` are kept.
    pub fn apply(&mut self, patch: &TaskPatch) {
        self.user = patch.user.clone();
        self.name = patch.name.clone();
        self.description = patch.description.clone();
        self.status = patch.status;
        self.updated = patch.updated;
        self.is_active = patch.is_active;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub task_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Task {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        Task {
            task_id: 7,
            user: "jonnygold".into(),
            name: "Groceries".into(),
            description: "Milk and eggs".into(),
            status: TaskStatus::Doing,
            added: at,
            updated: at,
            is_active: true,
        }
    }

    #[test]
    fn test_task_uses_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["taskId"], 7);
        assert_eq!(json["isActive"], true);
        assert_eq!(json["status"], "doing");
        assert_eq!(json["added"], "2024-03-01T09:30:00Z");
    }

    #[test]
    fn test_task_parses_browser_timestamps() {
        let json = r#"{
            "taskId": 1, "user": "jonnygold", "name": "a", "description": "b",
            "status": "done", "added": "2024-03-01T09:30:00.000Z",
            "updated": "2024-03-02T10:00:00.000Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.is_active);
        assert!(task.updated > task.added);
    }

    #[test]
    fn test_status_step_clamps() {
        assert_eq!(TaskStatus::Do.step(1), TaskStatus::Doing);
        assert_eq!(TaskStatus::Done.step(1), TaskStatus::Done);
        assert_eq!(TaskStatus::Do.step(-1), TaskStatus::Do);
        assert_eq!(TaskStatus::Done.step(-2), TaskStatus::Do);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Doing".parse::<TaskStatus>(), Ok(TaskStatus::Doing));
        assert!("later".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_apply_patch_keeps_identity() {
        let mut task = sample();
        let later = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        task.apply(&TaskPatch {
            user: "jonnygold".into(),
            name: "Groceries (weekend)".into(),
            description: "Milk, eggs, bread".into(),
            status: TaskStatus::Done,
            updated: later,
            is_active: true,
        });
        assert_eq!(task.task_id, 7);
        assert_eq!(task.added, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        assert_eq!(task.updated, later);
        assert_eq!(task.status, TaskStatus::Done);
    }
}
