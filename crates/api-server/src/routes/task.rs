//! Task API endpoints
//!
//! RESTful API for task CRUD operations and board moves.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use tasky_core::task::{Board, NewTask, Task, TaskMove, TaskRepository, TaskUpdate};
use tasky_core::Error;

use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !err.is_client_error() {
        tracing::error!("Task request failed: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Ids are opaque to clients, so one that is not a UUID names no task
fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>().map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Task not found: {}", raw),
            }),
        )
    })
}

/// Unreadable request bodies are validation failures like any other
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: rejection.body_text(),
            }),
        )),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks - List all tasks
async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.task_store().list().await.map_err(error_response)?;
    Ok(Json(tasks))
}

/// POST /api/tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let req = json_body(body)?;
    let created = state
        .task_store()
        .create(req)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/tasks/board - Tasks grouped into sorted columns
async fn get_board(State(state): State<AppState>) -> Result<Json<Board>, ApiError> {
    let board = state.task_store().board().await.map_err(error_response)?;
    Ok(Json(board))
}

/// GET /api/tasks/:id - Get a single task
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    let task = state.task_store().get(id).await.map_err(error_response)?;
    Ok(Json(task))
}

/// PUT /api/tasks/:id - Update title and/or description
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TaskUpdate>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    let req = json_body(body)?;
    let updated = state
        .task_store()
        .update(id, req)
        .await
        .map_err(error_response)?;
    Ok(Json(updated))
}

/// PATCH /api/tasks/:id/move - Change status and/or order
async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TaskMove>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    let req = json_body(body)?;
    let moved = state
        .task_store()
        .move_task(id, req)
        .await
        .map_err(error_response)?;
    Ok(Json(moved))
}

/// DELETE /api/tasks/:id - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_task_id(&id)?;
    state
        .task_store()
        .delete(id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/", get(list_tasks).post(create_task))
        .route("/api/tasks/board", get(get_board))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/move", patch(move_task))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tasky_core::task::TASKS_FILE_NAME;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::router;
    use crate::state::AppState;

    async fn build_app() -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::new(temp_dir.path().join(TASKS_FILE_NAME))
            .await
            .unwrap();
        (router().with_state(state), temp_dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, payload)
    }

    async fn create(app: &Router, body: Value) -> Value {
        let (status, payload) = send(app, "POST", "/api/tasks", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        payload
    }

    #[tokio::test]
    async fn list_tasks_returns_empty_list_initially() {
        let (app, _temp_dir) = build_app().await;

        for uri in ["/api/tasks", "/api/tasks/"] {
            let (status, payload) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(payload, json!([]));
        }
    }

    #[tokio::test]
    async fn create_task_returns_created_task() {
        let (app, _temp_dir) = build_app().await;

        let payload = create(&app, json!({ "title": "Write spec" })).await;

        assert_eq!(payload["title"], "Write spec");
        assert_eq!(payload["status"], "To Do");
        assert_eq!(payload["order"], 1.0);
        assert!(payload["description"].is_null());
        assert!(payload["id"].is_string());

        let second = create(&app, json!({ "title": "Second", "description": "More" })).await;
        assert_eq!(second["order"], 2.0);
        assert_eq!(second["description"], "More");
    }

    #[tokio::test]
    async fn create_task_validates_title() {
        let (app, _temp_dir) = build_app().await;

        for title in [String::new(), "t".repeat(101)] {
            let (status, payload) =
                send(&app, "POST", "/api/tasks", Some(json!({ "title": title }))).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert!(payload["error"].as_str().unwrap().contains("title"));
        }

        let (_, list) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn create_task_rejects_unknown_status() {
        let (app, _temp_dir) = build_app().await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({ "title": "x", "status": "Blocked" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_task_returns_not_found() {
        let (app, _temp_dir) = build_app().await;
        let uri = format!("/api/tasks/{}", Uuid::new_v4());

        let (status, payload) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(payload["error"].as_str().unwrap().contains("not found"));

        let (status, _) = send(&app, "PUT", &uri, Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("{}/move", uri),
            Some(json!({ "status": "Done" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_task_applies_only_given_fields() {
        let (app, _temp_dir) = build_app().await;
        let task = create(
            &app,
            json!({ "title": "Draft", "description": "Keep", "status": "Done" }),
        )
        .await;
        let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

        let (status, payload) = send(&app, "PUT", &uri, Some(json!({ "title": "Final" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["title"], "Final");
        assert_eq!(payload["description"], "Keep");
        assert_eq!(payload["status"], "Done");

        // status and order are not writable through PUT
        let (_, payload) = send(
            &app,
            "PUT",
            &uri,
            Some(json!({ "description": null, "status": "To Do", "order": 9.0 })),
        )
        .await;
        assert!(payload["description"].is_null());
        assert_eq!(payload["status"], "Done");
        assert_eq!(payload["order"], 1.0);

        let (status, _) = send(&app, "PUT", &uri, Some(json!({ "title": "" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (_, current) = send(&app, "GET", &uri, None).await;
        assert_eq!(current["title"], "Final");
    }

    #[tokio::test]
    async fn move_task_with_only_order_keeps_status() {
        let (app, _temp_dir) = build_app().await;
        let task = create(&app, json!({ "title": "Card", "status": "In Progress" })).await;
        let uri = format!("/api/tasks/{}/move", task["id"].as_str().unwrap());

        let (status, payload) = send(&app, "PATCH", &uri, Some(json!({ "order": 0.5 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "In Progress");
        assert_eq!(payload["order"], 0.5);
    }

    #[tokio::test]
    async fn board_lists_columns_in_order() {
        let (app, _temp_dir) = build_app().await;
        let low = create(&app, json!({ "title": "Low" })).await;
        create(&app, json!({ "title": "High" })).await;
        send(
            &app,
            "PATCH",
            &format!("/api/tasks/{}/move", low["id"].as_str().unwrap()),
            Some(json!({ "order": 10.0 })),
        )
        .await;

        let (status, board) = send(&app, "GET", "/api/tasks/board", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(board["columnOrder"], json!(["To Do", "In Progress", "Done"]));
        assert_eq!(board["columns"][0]["id"], "To Do");
        assert_eq!(board["columns"][0]["tasks"][0]["title"], "High");
        assert_eq!(board["columns"][0]["tasks"][1]["title"], "Low");
    }

    #[tokio::test]
    async fn task_lifecycle() {
        let (app, _temp_dir) = build_app().await;

        let task = create(&app, json!({ "title": "Write spec", "status": "To Do" })).await;
        let id = task["id"].as_str().unwrap().to_string();

        let (_, list) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["order"], 1.0);
        assert_eq!(list[0]["status"], "To Do");

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/api/tasks/{}/move", id),
            Some(json!({ "status": "In Progress", "order": 1.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, list) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(list[0]["status"], "In Progress");

        let (status, body) = send(&app, "DELETE", &format!("/api/tasks/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());

        let (_, list) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(list, json!([]));
    }

    async fn send_raw(
        app: &Router,
        method: &str,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            request = request.header("Content-Type", content_type);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn non_uuid_id_returns_not_found() {
        let (app, _temp_dir) = build_app().await;
        let uri = "/api/tasks/not-a-uuid";

        let (status, payload) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload["error"], "Task not found: not-a-uuid");

        let (status, _) = send(&app, "PUT", uri, Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "PATCH",
            "/api/tasks/not-a-uuid/move",
            Some(json!({ "order": 2.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreadable_body_returns_unprocessable_entity() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) =
            send_raw(&app, "POST", "/api/tasks", Some("application/json"), "{ not json").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(payload["error"].is_string());

        let (status, _) = send_raw(&app, "POST", "/api/tasks", None, r#"{"title":"x"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let task = create(&app, json!({ "title": "Stable" })).await;
        let id = task["id"].as_str().unwrap();

        let (status, _) = send_raw(
            &app,
            "PUT",
            &format!("/api/tasks/{}", id),
            Some("application/json"),
            "[1, 2",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send_raw(
            &app,
            "PATCH",
            &format!("/api/tasks/{}/move", id),
            Some("application/json"),
            r#"{"order":"high"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, list) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(list, json!([task]));
    }

    #[tokio::test]
    async fn save_failure_returns_server_error_and_keeps_task() {
        let (app, temp_dir) = build_app().await;
        // A directory at the target path makes the final rename fail
        std::fs::create_dir(temp_dir.path().join(TASKS_FILE_NAME)).unwrap();

        let (status, payload) =
            send(&app, "POST", "/api/tasks", Some(json!({ "title": "Unsaved" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(payload["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to persist tasks"));

        let (status, list) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["title"], "Unsaved");
    }
}
