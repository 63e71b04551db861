use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::{self, AuthSession},
        jwt::{TokenKeys, TokenKind},
        password,
    },
    email,
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            ActivateRequest, ActivatedResponse, EmailRequest, LoginRequest, LoginResponse,
            MessageResponse, ResetPasswordRequest, SignupRequest, UpdateProfileRequest,
        },
        repo::{self, ProfileChanges},
        repo_types::User,
        validate,
    },
};

/// Routes reachable without a session token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(signup))
        .route("/users/login", post(login))
        .route("/users/activate", post(activate))
        .route("/users/sendActivationEmail", post(send_activation_email))
        .route("/users/sendResetPasswordEmail", post(send_reset_password_email))
        .route("/users/resetPassword", post(reset_password))
}

/// Routes that require an authenticated session.
pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/users/logout", post(logout))
        .route("/users/logoutAll", post(logout_all))
        .route("/users/me", get(get_me).patch(update_me).delete(delete_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    validate::validate_name(&payload.name)?;
    validate::validate_email(&payload.email)?;
    validate::validate_password(&payload.password)?;
    let age = payload.age.unwrap_or(0);
    validate::validate_age(age)?;

    // Pre-check for a friendly message; the UNIQUE constraint backstops the
    // race between two simultaneous signups.
    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "signup with taken email");
        return Err(ApiError::Validation("email is already registered".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    let user = repo::insert(&state.db, &payload.name, &payload.email, &hash, age).await?;

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign(TokenKind::Activation, user.id)?;
    send_best_effort(
        &state,
        email::activation_email(
            &state.config.mail.frontend_base_url,
            &user.email,
            &user.name,
            &token,
        ),
    )
    .await;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = repo::find_by_credentials(&state.db, &payload.email, &payload.password).await?;
    if !user.activated {
        warn!(user_id = %user.id, "login before activation");
        return Err(ApiError::AccountNotActivated);
    }

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign(TokenKind::Session, user.id)?;
    repo::append_session_token(&state.db, user.id, &token).await?;

    info!(user_id = %user.id, "user logged in");
    let cookie = session_cookie_header(&token)?;
    let mut resp = Json(LoginResponse { user, token }).into_response();
    resp.headers_mut().insert(SET_COOKIE, cookie);
    Ok(resp)
}

#[instrument(skip(state, payload))]
pub async fn activate(
    State(state): State<AppState>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Response, ApiError> {
    let keys = TokenKeys::from_ref(&state);
    let user_id = keys.verify(TokenKind::Activation, &payload.token)?;

    // Idempotent: activating twice re-runs the same update and still logs in.
    let user = repo::set_activated(&state.db, user_id).await?;

    let token = keys.sign(TokenKind::Session, user.id)?;
    repo::append_session_token(&state.db, user.id, &token).await?;

    info!(user_id = %user.id, "account activated");
    let cookie = session_cookie_header(&token)?;
    let mut resp = Json(ActivatedResponse {
        activated_user: user,
        token,
    })
    .into_response();
    resp.headers_mut().insert(SET_COOKIE, cookie);
    Ok(resp)
}

#[instrument(skip(state, payload))]
pub async fn send_activation_email(
    State(state): State<AppState>,
    Json(mut payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::NotFound {
            resource: "User",
            attribute: "email",
        })?;

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign(TokenKind::Activation, user.id)?;
    send_best_effort(
        &state,
        email::activation_email(
            &state.config.mail.frontend_base_url,
            &user.email,
            &user.name,
            &token,
        ),
    )
    .await;

    info!(user_id = %user.id, "activation email resent");
    Ok(Json(MessageResponse {
        message: "activation email sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn send_reset_password_email(
    State(state): State<AppState>,
    Json(mut payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::NotFound {
            resource: "User",
            attribute: "email",
        })?;

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign(TokenKind::PasswordReset, user.id)?;
    send_best_effort(
        &state,
        email::reset_password_email(
            &state.config.mail.frontend_base_url,
            &user.email,
            &user.name,
            &token,
        ),
    )
    .await;

    info!(user_id = %user.id, "reset password email sent");
    Ok(Json(MessageResponse {
        message: "reset password email sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let keys = TokenKeys::from_ref(&state);
    let user_id = keys.verify(TokenKind::PasswordReset, &payload.token)?;

    validate::validate_password(&payload.password)?;
    let hash = password::hash_password(&payload.password)?;

    // Existing sessions stay valid; only the hash changes.
    let user = repo::set_password(&state.db, user_id, &hash).await?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "password updated".into(),
    }))
}

#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<MessageResponse>, ApiError> {
    repo::remove_session_token(&state.db, session.user.id, &session.token).await?;
    info!(user_id = %session.user.id, "logged out");
    Ok(Json(MessageResponse {
        message: "logged out".into(),
    }))
}

#[instrument(skip(state, session))]
pub async fn logout_all(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<MessageResponse>, ApiError> {
    repo::clear_session_tokens(&state.db, session.user.id).await?;
    info!(user_id = %session.user.id, "logged out everywhere");
    Ok(Json(MessageResponse {
        message: "logged out everywhere".into(),
    }))
}

#[instrument(skip(session))]
pub async fn get_me(session: AuthSession) -> Json<User> {
    Json(session.user)
}

#[instrument(skip(state, session, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let changes = profile_changes(payload)?;
    let user = repo::update_profile(&state.db, session.user.id, changes).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(user))
}

/// Turn a patch into the repo update, rejecting the whole thing before any
/// field is applied: unknown keys, an empty patch, or any invalid value.
fn profile_changes(payload: UpdateProfileRequest) -> Result<ProfileChanges, ApiError> {
    payload.check_shape()?;

    let mut changes = ProfileChanges::default();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        validate::validate_name(&name)?;
        changes.name = Some(name);
    }
    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        validate::validate_email(&email)?;
        changes.email = Some(email);
    }
    if let Some(password) = payload.password {
        validate::validate_password(&password)?;
        changes.password_hash = Some(password::hash_password(&password)?);
    }
    if let Some(age) = payload.age {
        validate::validate_age(age)?;
        changes.age = Some(age);
    }
    Ok(changes)
}

#[instrument(skip(state, session))]
pub async fn delete_me(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<User>, ApiError> {
    let user = repo::delete_with_owned(&state.db, session.user.id).await?;
    send_best_effort(&state, email::cancellation_email(&user.email, &user.name)).await;
    info!(user_id = %user.id, "account deleted");
    Ok(Json(user))
}

/// Awaited but never fatal: a failed send is logged and the response goes
/// out as if it had worked.
async fn send_best_effort(state: &AppState, message: email::EmailMessage) {
    if let Err(e) = state.mailer.send(&message).await {
        warn!(error = %e, to = %message.to, "email send failed");
    }
}

fn session_cookie_header(token: &str) -> Result<HeaderValue, ApiError> {
    extractors::session_cookie(token).map_err(|e| ApiError::Internal(anyhow::Error::new(e)))
}
