//! Mock REST backend serving the task and login endpoints over in-memory
//! seed data.
//!
//! | Method | Path                           | Body         | Response            |
//! |--------|--------------------------------|--------------|---------------------|
//! | GET    | `/api/tasks/user/{userName}`   |              | `Task[]`            |
//! | POST   | `/api/tasks/add`               | `Task`       | stored `Task`       |
//! | POST   | `/api/tasks/update/{taskId}`   | `TaskPatch`  | `Task` or `null`    |
//! | POST   | `/api/tasks/delete`            | `{ taskId }` | `{ taskId }`/`null` |
//! | POST   | `/api/users/login`             | credentials  | `User` or `null`    |
//!
//! A `null` body means nothing matched; clients treat it as "no change".
//! Update only touches a task owned by the patch's `user`; delete removes
//! every task with the id.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info};

use crate::errors::{Result, TaskboardError};
use crate::task::{DeleteRequest, Task, TaskPatch};
use crate::task_board::TaskBoard;
use crate::user::{Credentials, User, UserStore};

#[derive(Debug)]
pub(crate) struct ServerState {
    users: UserStore,
    board: TaskBoard,
}

type SharedState = Arc<RwLock<ServerState>>;

pub struct MockServer {
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockServer {
    pub fn new(users: UserStore, board: TaskBoard) -> Self {
        Self {
            state: Arc::new(RwLock::new(ServerState { users, board })),
            shutdown_tx: None,
        }
    }

    /// Binds `addr` (port 0 picks a free one) and serves in the background.
    /// Returns the base URL.
    pub async fn start(&mut self, addr: SocketAddr) -> Result<String> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TaskboardError::Bind { addr, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| TaskboardError::Bind { addr, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let app = build_router(self.state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %e, "mock server stopped");
            }
        });

        let url = format!("http://{addr}");
        info!(%url, "mock server listening");
        Ok(url)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.board.tasks.clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(crate) fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/tasks/user/{user_name}", get(user_tasks_handler))
        .route("/api/tasks/add", post(add_handler))
        .route("/api/tasks/update/{task_id}", post(update_handler))
        .route("/api/tasks/delete", post(delete_handler))
        .route("/api/users/login", post(login_handler))
        .with_state(state)
}

async fn user_tasks_handler(
    State(state): State<SharedState>,
    Path(user_name): Path<String>,
) -> Json<Vec<Task>> {
    Json(state.read().await.board.tasks_for_user(&user_name))
}

async fn add_handler(State(state): State<SharedState>, Json(task): Json<Task>) -> Json<Task> {
    let mut state = state.write().await;
    info!(task_id = task.task_id, user = %task.user, "add task");
    Json(state.board.add_task(task).clone())
}

async fn update_handler(
    State(state): State<SharedState>,
    Path(task_id): Path<u32>,
    Json(patch): Json<TaskPatch>,
) -> Json<Option<Task>> {
    let mut state = state.write().await;
    info!(task_id, "update task");
    Json(state.board.update_task(task_id, &patch).ok().cloned())
}

async fn delete_handler(
    State(state): State<SharedState>,
    Json(request): Json<DeleteRequest>,
) -> Json<Option<DeleteRequest>> {
    let mut state = state.write().await;
    info!(task_id = request.task_id, "delete task");
    Json(state.board.delete_task(request.task_id).ok().map(|_| request))
}

async fn login_handler(
    State(state): State<SharedState>,
    Json(credentials): Json<Credentials>,
) -> Json<Option<User>> {
    let state = state.read().await;
    Json(state.users.find_by_credentials(&credentials).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::task_form::TaskFormValues;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router() -> (Router, SharedState) {
        let state = Arc::new(RwLock::new(ServerState {
            users: UserStore::new(data::seed_users()),
            board: TaskBoard::new(data::seed_tasks()),
        }));
        (build_router(state.clone()), state)
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_user_tasks() {
        let (router, _) = test_router();
        let request = Request::builder()
            .uri("/api/tasks/user/maryjane")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(router, request).await;
        assert_eq!(status, StatusCode::OK);
        let tasks = body.as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t["user"] == "maryjane"));
    }

    #[tokio::test]
    async fn test_user_name_with_reserved_characters() {
        let (router, state) = test_router();
        let task = TaskFormValues::for_user("odd/name?x").to_task(1, Utc::now());
        state.write().await.board.add_task(task);

        let request = Request::builder()
            .uri("/api/tasks/user/odd%2Fname%3Fx")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(router, request).await;
        assert_eq!(status, StatusCode::OK);
        let tasks = body.as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["user"], "odd/name?x");
    }

    #[tokio::test]
    async fn test_update_ignores_other_users_task() {
        let (router, state) = test_router();
        let patch = serde_json::to_value(
            TaskFormValues::for_user("peterpan").to_patch(Utc::now()),
        )
        .unwrap();
        let (_, body) = call(router, post_json("/api/tasks/update/2", patch)).await;
        assert!(body.is_null());
        assert_eq!(state.read().await.board.tasks, data::seed_tasks());
    }

    #[tokio::test]
    async fn test_login_match_and_null() {
        let (router, _) = test_router();
        let ok = post_json(
            "/api/users/login",
            serde_json::json!({ "email": "maryjane@gmail.com", "password": "abcd" }),
        );
        let (_, body) = call(router.clone(), ok).await;
        assert_eq!(body["userName"], "maryjane");

        let bad = post_json(
            "/api/users/login",
            serde_json::json!({ "email": "maryjane@gmail.com", "password": "1234" }),
        );
        let (status, body) = call(router, bad).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_add_update_delete() {
        let (router, state) = test_router();
        let task = TaskFormValues::for_user("peterpan").to_task(2, Utc::now());
        let (_, body) = call(
            router.clone(),
            post_json("/api/tasks/add", serde_json::to_value(&task).unwrap()),
        )
        .await;
        assert_eq!(body["name"], "New Task");
        assert_eq!(state.read().await.board.tasks_for_user("peterpan").len(), 2);

        let mut values = TaskFormValues::for_user("peterpan");
        values.name = "Find shadow".into();
        let patch = serde_json::to_value(values.to_patch(Utc::now())).unwrap();
        let (_, body) = call(router.clone(), post_json("/api/tasks/update/5", patch.clone())).await;
        assert_eq!(body["name"], "Find shadow");
        assert_eq!(body["taskId"], 5);

        let (_, body) = call(router.clone(), post_json("/api/tasks/update/404", patch)).await;
        assert!(body.is_null());

        let (_, body) = call(
            router.clone(),
            post_json("/api/tasks/delete", serde_json::json!({ "taskId": 5 })),
        )
        .await;
        assert_eq!(body["taskId"], 5);
        let (_, body) = call(
            router,
            post_json("/api/tasks/delete", serde_json::json!({ "taskId": 5 })),
        )
        .await;
        assert!(body.is_null());
    }
}
