pub mod backend;
pub mod config;
pub mod data;
pub mod details;
pub mod errors;
pub mod http_service;
pub mod logging;
pub mod login;
pub mod server;
pub mod session;
pub mod task;
pub mod task_board;
pub mod task_form;
pub mod tasks_view;
pub mod ui;
pub mod user;

pub use errors::{Result, TaskboardError};
