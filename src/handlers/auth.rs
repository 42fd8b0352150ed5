use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{self, CurrentUser};
use crate::models::user::{ApiToken, UserInfo};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::validation::{LoginPayload, ValidationErrors};

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub user: UserInfo,
}

/// Same rejection whether the account exists or the password is wrong,
/// keyed to the email field.
fn invalid_credentials() -> AppError {
    AppError::ValidationError(ValidationErrors::single(
        "email",
        "The provided credentials are incorrect",
    ))
}

pub async fn token_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, AppError> {
    let data = payload.validate()?;

    let user = state
        .store
        .find_user_by_email(&data.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !auth::verify_password(&data.password, &user.password_hash) {
        return Err(invalid_credentials());
    }

    let token = auth::generate_token();
    let record = ApiToken {
        id: Uuid::new_v4(),
        user_id: user.id,
        name: data.device_name,
        token_hash: auth::token_hash(&token),
        created_at: Utc::now(),
    };
    state.store.insert_token(&record).await?;
    tracing::info!(user_id = %user.id, device = %record.name, "API token issued");

    let response = LoginResponse {
        token,
        token_type: "Bearer",
        user: UserInfo::from(&user),
    };
    Ok(success(response, "Login successful").into_response())
}

/// Revokes exactly the token that authenticated this request.
pub async fn token_logout(
    State(state): State<AppState>,
    requester: CurrentUser,
) -> Result<Response, AppError> {
    state.store.revoke_token(&requester.token_hash).await?;
    tracing::info!(user_id = %requester.user.id, "API token revoked");
    Ok(StatusCode::NO_CONTENT.into_response())
}
