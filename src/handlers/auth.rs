//! Account registration, login, and the authenticated whoami route.
//!
//! Accounts live in the configured `users` resource; passwords are bcrypt
//! hashed before they reach the store and stripped from every response.

use crate::error::AppError;
use crate::extract::AuthClaims;
use crate::handlers::entity::{body_to_map, strip_sensitive};
use crate::state::AppState;
use crate::store::{Page, StoreError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

const USERS_PATH: &str = "users";
const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "password";

fn users_resource(state: &AppState) -> Result<&crate::config::ResolvedResource, AppError> {
    state
        .model
        .resource_by_path(USERS_PATH)
        .ok_or_else(|| AppError::Internal("users resource is not configured".to_string()))
}

fn required_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let resource = users_resource(&state)?;
    let (Some(_username), Some(password)) = (
        required_str(&body, USERNAME_FIELD),
        required_str(&body, PASSWORD_FIELD),
    ) else {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    };

    let hashed = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hash: {e}")))?;
    let mut record = body_to_map(body)?;
    record.insert(PASSWORD_FIELD.to_string(), Value::from(hashed));

    let mut created = match state.store.insert(resource, &record).await {
        Ok(row) => row,
        // Duplicate usernames surface as an opaque server error here.
        Err(StoreError::Conflict(cause)) => {
            return Err(AppError::Internal(format!("register conflict: {cause}")));
        }
        Err(e) => return Err(e.into()),
    };
    strip_sensitive(resource, &mut created);
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let resource = users_resource(&state)?;
    let (Some(username), Some(password)) = (
        required_str(&body, USERNAME_FIELD),
        required_str(&body, PASSWORD_FIELD),
    ) else {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    };

    let filters = vec![(USERNAME_FIELD.to_string(), Value::from(username))];
    let rows = state
        .store
        .list(resource, &filters, Page::new(Some(1), None))
        .await?;
    let account = rows
        .first()
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

    let stored_hash = account
        .get(PASSWORD_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Internal("account has no password hash".to_string()))?;
    let matches = bcrypt::verify(password, stored_hash)
        .map_err(|e| AppError::Internal(format!("password verify: {e}")))?;
    if !matches {
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    let token = state.tokens.issue(username)?;
    Ok(Json(json!({
        "message": format!("Welcome {username}"),
        "token": token,
    }))
    .into_response())
}

pub async fn me(claims: AuthClaims) -> Response {
    Json(json!({ "username": claims.0.sub })).into_response()
}
