use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::event::Event;
use crate::policy;
use crate::query::{FiltersEcho, ListParams, Paginated};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};
use crate::validation::{EventPayload, UpdateEventPayload};

/// Props for the events index page: one page of events plus the filter
/// values as submitted, so the controls re-render their state.
#[derive(Serialize)]
pub struct EventsIndexPage {
    pub events: Paginated<Event>,
    pub filters: FiltersEcho,
}

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

pub async fn index(
    State(state): State<AppState>,
    requester: CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let query = params.validate()?;
    let events = state.store.list_events(requester.user.id, &query).await?;

    let page = EventsIndexPage {
        events,
        filters: params.echo(),
    };
    Ok(success(page, "Events retrieved successfully").into_response())
}

/// Every event of the requester, unpaginated, for the calendar widget.
pub async fn calendar(
    State(state): State<AppState>,
    requester: CurrentUser,
) -> Result<Response, AppError> {
    let events = state.store.events_for_owner(requester.user.id).await?;
    Ok(success(events, "Calendar events retrieved successfully").into_response())
}

pub async fn create(_requester: CurrentUser) -> Response {
    empty_success("Ready to create an event").into_response()
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
    Ok(Redirect::to("/events").into_response())
}

pub async fn edit(
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

    Ok(Redirect::to("/events").into_response())
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
    Ok(Redirect::to("/events").into_response())
}
