use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub description: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Optional replacement values for a task patch; `None` keeps the stored
/// value.
#[derive(Debug, Default)]
pub struct TaskChanges {
    pub description: Option<String>,
    pub completed: Option<bool>,
}

pub async fn insert(db: &PgPool, owner_id: Uuid, description: &str) -> anyhow::Result<Task> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks (owner_id, description)
        VALUES ($1, $2)
        RETURNING id, owner_id, description, completed, created_at, updated_at
        "#,
    )
    .bind(owner_id)
    .bind(description)
    .fetch_one(db)
    .await?;
    Ok(task)
}

pub async fn list_by_owner(
    db: &PgPool,
    owner_id: Uuid,
    completed: Option<bool>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT id, owner_id, description, completed, created_at, updated_at
        FROM tasks
        WHERE owner_id = $1 AND ($2::boolean IS NULL OR completed = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(owner_id)
    .bind(completed)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(tasks)
}

pub async fn find_by_id(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        SELECT id, owner_id, description, completed, created_at, updated_at
        FROM tasks
        WHERE id = $1 AND owner_id = $2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    Ok(task)
}

pub async fn update(
    db: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    changes: TaskChanges,
) -> Result<Task, ApiError> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET description = COALESCE($3, description),
            completed = COALESCE($4, completed),
            updated_at = now()
        WHERE id = $1 AND owner_id = $2
        RETURNING id, owner_id, description, completed, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(changes.description)
    .bind(changes.completed)
    .fetch_optional(db)
    .await?;
    task.ok_or(ApiError::NotFound {
        resource: "Task",
        attribute: "id",
    })
}

pub async fn delete(db: &PgPool, owner_id: Uuid, id: Uuid) -> Result<Task, ApiError> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        DELETE FROM tasks
        WHERE id = $1 AND owner_id = $2
        RETURNING id, owner_id, description, completed, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    task.ok_or(ApiError::NotFound {
        resource: "Task",
        attribute: "id",
    })
}
