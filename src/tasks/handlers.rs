use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthSession,
    error::ApiError,
    state::AppState,
    tasks::{
        dto::{CreateTaskRequest, ListTasksQuery, UpdateTaskRequest},
        repo::{self, Task, TaskChanges},
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", get(get_task))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/:id", patch(update_task).delete(delete_task))
}

#[instrument(skip(state, session, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let description = payload.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::Validation("description must not be empty".into()));
    }

    let task = repo::insert(&state.db, session.user.id, &description).await?;
    info!(task_id = %task.id, owner_id = %task.owner_id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, session))]
pub async fn list_tasks(
    State(state): State<AppState>,
    session: AuthSession,
    Query(q): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks =
        repo::list_by_owner(&state.db, session.user.id, q.completed, q.limit, q.offset).await?;
    Ok(Json(tasks))
}

#[instrument(skip(state, session))]
pub async fn get_task(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    // Owner-scoped lookup: someone else's task id looks exactly like a
    // missing one.
    let task = repo::find_by_id(&state.db, session.user.id, id)
        .await?
        .ok_or(ApiError::NotFound {
            resource: "Task",
            attribute: "id",
        })?;
    Ok(Json(task))
}

#[instrument(skip(state, session, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let changes = task_changes(payload)?;
    let task = repo::update(&state.db, session.user.id, id, changes).await?;
    info!(task_id = %task.id, "task updated");
    Ok(Json(task))
}

#[instrument(skip(state, session))]
pub async fn delete_task(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = repo::delete(&state.db, session.user.id, id).await?;
    info!(task_id = %task.id, "task deleted");
    Ok(Json(task))
}

fn task_changes(payload: UpdateTaskRequest) -> Result<TaskChanges, ApiError> {
    payload.check_shape()?;

    let mut changes = TaskChanges::default();
    if let Some(description) = payload.description {
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(ApiError::Validation("description must not be empty".into()));
        }
        changes.description = Some(description);
    }
    changes.completed = payload.completed;
    Ok(changes)
}

#[cfg(test)]
mod patch_tests {
    use super::*;

    fn parse(json: serde_json::Value) -> UpdateTaskRequest {
        serde_json::from_value(json).expect("deserialize patch")
    }

    #[test]
    fn description_is_trimmed() {
        let changes = task_changes(parse(serde_json::json!({"description": "  walk the dog  "})))
            .expect("changes");
        assert_eq!(changes.description.as_deref(), Some("walk the dog"));
        assert_eq!(changes.completed, None);
    }

    #[test]
    fn blank_description_is_rejected() {
        let err = task_changes(parse(serde_json::json!({"description": "   "})))
            .expect_err("blank description");
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn unknown_key_is_an_invalid_update() {
        let err = task_changes(parse(serde_json::json!({"completed": true, "due": "tomorrow"})))
            .expect_err("unknown key");
        assert!(matches!(err, ApiError::InvalidUpdate));
    }
}
