use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;

use crate::auth::CurrentUser;
use crate::models::dashboard::Dashboard;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

/// Landing route: authenticated requesters continue to the dashboard,
/// everyone else gets the welcome payload.
pub async fn home(requester: Option<CurrentUser>) -> Response {
    if requester.is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        empty_success("Welcome to Pauta").into_response()
    }
}

pub async fn show(
    State(state): State<AppState>,
    requester: CurrentUser,
) -> Result<Response, AppError> {
    let events = state.store.events_for_owner(requester.user.id).await?;
    let dashboard = Dashboard::compute(&events, Utc::now());
    Ok(success(dashboard, "Dashboard retrieved successfully").into_response())
}
