use std::{fs, path::Path};

use tracing::debug;

use crate::errors::{Result, TaskboardError};
use crate::task::{Task, TaskPatch};

/// Tasks owned by `user_name`, in stored order.
pub fn filter_by_user(tasks: &[Task], user_name: &str) -> Vec<Task> {
    tasks.iter().filter(|t| t.user == user_name).cloned().collect()
}

/// Copy-on-write append: the input slice is left as it was.
pub fn append_task(tasks: &[Task], task: Task) -> Vec<Task> {
    let mut next = Vec::with_capacity(tasks.len() + 1);
    next.extend_from_slice(tasks);
    next.push(task);
    next
}

#[derive(Debug, Default, Clone)]
pub struct TaskBoard {
    pub tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.tasks)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| TaskboardError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| TaskboardError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns `None` when the file does not exist yet.
    pub fn load_from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path).map_err(|source| TaskboardError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tasks: Vec<Task> = serde_json::from_str(&data)?;
        debug!(path = %path.display(), count = tasks.len(), "loaded tasks");
        Ok(Some(Self { tasks }))
    }

    pub fn tasks_for_user(&self, user_name: &str) -> Vec<Task> {
        filter_by_user(&self.tasks, user_name)
    }

    pub fn add_task(&mut self, task: Task) -> &Task {
        self.tasks = append_task(&self.tasks, task);
        &self.tasks[self.tasks.len() - 1]
    }

    /// Patches the first of `patch.user`'s tasks carrying `task_id`. Ids can
    /// repeat across users, so another user's task is never taken over.
    pub fn update_task(&mut self, task_id: u32, patch: &TaskPatch) -> Result<&Task> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.task_id == task_id && t.user == patch.user)
            .ok_or(TaskboardError::TaskNotFound { task_id })?;
        task.apply(patch);
        Ok(&*task)
    }

    /// Removes every task carrying `task_id`, whoever owns it. The delete body
    /// is only `{ taskId }`, so there is no user to narrow it by.
    pub fn delete_task(&mut self, task_id: u32) -> Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.task_id != task_id);
        match before - self.tasks.len() {
            0 => Err(TaskboardError::TaskNotFound { task_id }),
            removed => Ok(removed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::task_form::TaskFormValues;
    use chrono::Utc;

    #[test]
    fn test_filter_returns_exact_subset() {
        let tasks = data::seed_tasks();
        let mine = filter_by_user(&tasks, "jonnygold");
        assert_eq!(mine.len(), 3);
        assert!(mine.iter().all(|t| t.user == "jonnygold"));
        let expected = tasks.iter().filter(|t| t.user == "jonnygold").count();
        assert_eq!(mine.len(), expected);
        assert_eq!(
            mine.iter().map(|t| t.task_id).collect::<Vec<_>>(),
            vec![1, 2, 4]
        );
    }

    #[test]
    fn test_filter_unknown_user_is_empty() {
        assert!(filter_by_user(&data::seed_tasks(), "").is_empty());
        assert!(filter_by_user(&data::seed_tasks(), "JonnyGold").is_empty());
    }

    #[test]
    fn test_append_is_copy_on_write() {
        let tasks = data::seed_tasks();
        let now = Utc::now();
        let task = TaskFormValues::for_user("jonnygold").to_task(tasks.len() as u32 + 1, now);
        let next = append_task(&tasks, task);
        assert_eq!(next.len(), tasks.len() + 1);
        assert_eq!(tasks.len(), data::seed_tasks().len());
        let last = next.last().unwrap();
        assert_eq!((last.added, last.updated), (now, now));
    }

    #[test]
    fn test_delete_then_add_can_reuse_id() {
        let mut board = TaskBoard::new(data::seed_tasks());
        board.delete_task(2).unwrap();
        let id = board.tasks.len() as u32 + 1;
        board.add_task(TaskFormValues::for_user("jonnygold").to_task(id, Utc::now()));
        assert_eq!(board.tasks.iter().filter(|t| t.task_id == 6).count(), 2);
    }

    #[test]
    fn test_update_and_delete_unknown_task() {
        let mut board = TaskBoard::new(data::seed_tasks());
        let patch = TaskFormValues::for_user("jonnygold").to_patch(Utc::now());
        assert!(matches!(
            board.update_task(99, &patch),
            Err(TaskboardError::TaskNotFound { task_id: 99 })
        ));
        assert!(board.delete_task(99).is_err());
    }

    #[test]
    fn test_update_stays_within_patch_user() {
        let mut board = TaskBoard::new(data::seed_tasks());
        let mut values = TaskFormValues::for_user("peterpan");
        board.add_task(values.to_task(2, Utc::now()));

        values.name = "Find shadow".into();
        let updated = board.update_task(2, &values.to_patch(Utc::now())).unwrap();
        assert_eq!(updated.user, "peterpan");
        assert_eq!(updated.name, "Find shadow");

        let car = board.tasks.iter().find(|t| t.name == "Car service").unwrap();
        assert_eq!((car.task_id, car.user.as_str()), (2, "jonnygold"));
        let names: Vec<_> = board
            .tasks_for_user("peterpan")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Flying lessons", "Find shadow"]);
    }

    #[test]
    fn test_update_other_users_id_is_not_found() {
        let mut board = TaskBoard::new(data::seed_tasks());
        let patch = TaskFormValues::for_user("peterpan").to_patch(Utc::now());
        assert!(matches!(
            board.update_task(1, &patch),
            Err(TaskboardError::TaskNotFound { task_id: 1 })
        ));
        assert_eq!(board.tasks, data::seed_tasks());
    }

    #[test]
    fn test_delete_reaches_every_owner_of_an_id() {
        let mut board = TaskBoard::new(data::seed_tasks());
        board.add_task(TaskFormValues::for_user("peterpan").to_task(2, Utc::now()));
        assert_eq!(board.delete_task(2).unwrap(), 2);
        assert!(board.tasks.iter().all(|t| t.task_id != 2));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        assert!(TaskBoard::load_from_file(&path).unwrap().is_none());

        TaskBoard::new(data::seed_tasks()).save_to_file(&path).unwrap();
        let loaded = TaskBoard::load_from_file(&path).unwrap().unwrap();
        assert_eq!(loaded.tasks, data::seed_tasks());
    }
}
