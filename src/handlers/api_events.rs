use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::event::Event;
use crate::policy;
use crate::query::ListParams;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::validation::{EventPayload, UpdateEventPayload};

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

/// Token-authenticated listing with the same filter set as the page.
pub async fn index(
    State(state): State<AppState>,
    requester: CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let query = params.validate()?;
    let events = state.store.list_events(requester.user.id, &query).await?;
    Ok(success(events, "Events retrieved successfully").into_response())
}

pub async fn store(
    State(state): State<AppState>,
    requester: CurrentUser,
    Json(payload): Json<EventPayload>,
) -> Result<Response, AppError> {
    let data = payload.validate()?;
    let event = Event::create(requester.user.id, data, Utc::now());
    state.store.insert_event(&event).await?;

    tracing::info!(event_id = %event.id, owner_id = %event.owner_id, "Event created");
    Ok(created(event, "Event created successfully").into_response())
}

pub async fn show(
    State(state): State<AppState>,
    requester: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(event_not_found)?;
    policy::authorize_update(&requester.user, &event)?;

    Ok(success(event, "Event retrieved successfully").into_response())
}

pub async fn update(
    State(state): State<AppState>,
    requester: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventPayload>,
) -> Result<Response, AppError> {
    let mut event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(event_not_found)?;
    policy::authorize_update(&requester.user, &event)?;

    let patch = payload.validate(&event)?;
    event.apply(&patch, Utc::now());
    state.store.update_event(&event).await?;

    Ok(success(event, "Event updated successfully").into_response())
}

pub async fn destroy(
    State(state): State<AppState>,
    requester: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(event_not_found)?;
    policy::authorize_delete(&requester.user, &event)?;

    state.store.delete_event(event.id).await?;
    tracing::info!(event_id = %event.id, owner_id = %event.owner_id, "Event deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
