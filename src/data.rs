use chrono::{TimeZone, Utc};

use crate::task::{Task, TaskStatus};
use crate::user::User;

pub fn seed_users() -> Vec<User> {
    [
        ("jonnygold", "jonnygold@gmail.com", "1234"),
        ("maryjane", "maryjane@gmail.com", "abcd"),
        ("peterpan", "peterpan@gmail.com", "neverland"),
    ]
    .into_iter()
    .map(|(user_name, email, password)| User {
        user_name: user_name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
    .collect()
}

pub fn seed_tasks() -> Vec<Task> {
    let rows = [
        ("jonnygold", "Groceries", "Buy milk, eggs and bread", TaskStatus::Do),
        ("jonnygold", "Car service", "Book the annual service", TaskStatus::Doing),
        ("maryjane", "Tax return", "File before the deadline", TaskStatus::Do),
        ("jonnygold", "Dentist", "Six month check-up", TaskStatus::Done),
        ("peterpan", "Flying lessons", "Teach Wendy to fly", TaskStatus::Doing),
        ("maryjane", "Gym", "Renew membership", TaskStatus::Done),
    ];
    rows.into_iter()
        .enumerate()
        .map(|(i, (user, name, description, status))| {
            let added = Utc
                .with_ymd_and_hms(2024, 1, 1 + i as u32, 9, 0, 0)
                .single()
                .unwrap_or_default();
            Task {
                task_id: i as u32 + 1,
                user: user.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                status,
                added,
                updated: added,
                is_active: true,
            }
        })
        .collect()
}
