use sqlx::PgPool;
use uuid::Uuid;

use crate::{auth::password, error::ApiError, users::repo_types::User};

/// Optional replacement values for a profile update. `None` keeps the stored
/// value, so the whole patch is a single COALESCE update.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<i64>,
}

pub async fn insert(
    db: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    age: i64,
) -> Result<User, ApiError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, age)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, email, password_hash, age, activated, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(age)
    .fetch_one(db)
    .await
    .map_err(map_unique_email)?;
    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, age, activated, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Look up a user by email and check the password against the stored hash.
/// Unknown email and wrong password both come back as
/// `IncorrectCredentials`, with no hint which one it was.
pub async fn find_by_credentials(
    db: &PgPool,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let user = find_by_email(db, email)
        .await?
        .ok_or(ApiError::IncorrectCredentials)?;
    if !password::verify_password(password, &user.password_hash)? {
        return Err(ApiError::IncorrectCredentials);
    }
    Ok(user)
}

pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    changes: ProfileChanges,
) -> Result<User, ApiError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            password_hash = COALESCE($4, password_hash),
            age = COALESCE($5, age),
            updated_at = now()
        WHERE id = $1
        RETURNING id, name, email, password_hash, age, activated, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(changes.age)
    .fetch_optional(db)
    .await
    .map_err(map_unique_email)?;
    user.ok_or(ApiError::NotFound {
        resource: "User",
        attribute: "id",
    })
}

pub async fn set_activated(db: &PgPool, id: Uuid) -> Result<User, ApiError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET activated = TRUE, updated_at = now()
        WHERE id = $1
        RETURNING id, name, email, password_hash, age, activated, created_at, updated_at
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    user.ok_or(ApiError::NotFound {
        resource: "User",
        attribute: "id",
    })
}

pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> Result<User, ApiError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET password_hash = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, name, email, password_hash, age, activated, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(password_hash)
    .fetch_optional(db)
    .await?;
    user.ok_or(ApiError::NotFound {
        resource: "User",
        attribute: "id",
    })
}

pub async fn append_session_token(db: &PgPool, user_id: Uuid, token: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO session_tokens (user_id, token)
        VALUES ($1, $2)
        "#,
    )
    .bind(user_id)
    .bind(token)
    .execute(db)
    .await?;
    Ok(())
}

/// Removing a token that is already gone is not an error; logout stays
/// idempotent.
pub async fn remove_session_token(db: &PgPool, user_id: Uuid, token: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM session_tokens
        WHERE user_id = $1 AND token = $2
        "#,
    )
    .bind(user_id)
    .bind(token)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn clear_session_tokens(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM session_tokens
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

/// The session check: a token authenticates only while the exact string sits
/// in the user's stored list, so one query answers both "who" and "still
/// logged in".
pub async fn find_by_id_and_session_token(
    db: &PgPool,
    user_id: Uuid,
    token: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.name, u.email, u.password_hash, u.age, u.activated,
               u.created_at, u.updated_at
        FROM users u
        JOIN session_tokens s ON s.user_id = u.id
        WHERE u.id = $1 AND s.token = $2
        "#,
    )
    .bind(user_id)
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Delete a user and everything they own in one transaction. Child rows go
/// first; the schema carries no ON DELETE CASCADE.
pub async fn delete_with_owned(db: &PgPool, user_id: Uuid) -> Result<User, ApiError> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM session_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        DELETE FROM users
        WHERE id = $1
        RETURNING id, name, email, password_hash, age, activated, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;

    user.ok_or(ApiError::NotFound {
        resource: "User",
        attribute: "id",
    })
}

fn map_unique_email(err: sqlx::Error) -> ApiError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation {
            return ApiError::Validation("email is already registered".into());
        }
    }
    err.into()
}
