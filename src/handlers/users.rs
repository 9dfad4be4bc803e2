use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::{NewUser, UserPatch};
use crate::utils::response::{empty_success, success};
use crate::utils::AppError;

use super::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> Result<Response, AppError> {
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(AppError::ValidationError(
            "A valid email is required".to_string(),
        ));
    }
    if body.name.trim().is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    if body.provider.trim().is_empty() || body.provider_id.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Auth provider and provider id are required".to_string(),
        ));
    }

    let user = state.gateway.create_user(body).await?;
    Ok(success(user, "User created").into_response())
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let user = state
        .gateway
        .user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    Ok(success(user, "User found").into_response())
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Response, AppError> {
    let user = state
        .gateway
        .user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user registered as {email}")))?;
    Ok(success(user, "User found").into_response())
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> Result<Response, AppError> {
    let user = state
        .gateway
        .update_user(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    Ok(success(user, "User updated").into_response())
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.gateway.delete_user(id).await? {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }
    Ok(empty_success("User deleted").into_response())
}
