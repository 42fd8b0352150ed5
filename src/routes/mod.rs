use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{api_events, auth, dashboard, events, health_check};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::home))
        .route("/health", get(health_check))
        .route("/dashboard", get(dashboard::show))
        .route("/events", get(events::index).post(events::store))
        .route("/events/calendar", get(events::calendar))
        .route("/events/create", get(events::create))
        .route("/events/:id/edit", get(events::edit))
        .route("/events/:id", put(events::update).delete(events::destroy))
        .route("/api/token/login", post(auth::token_login))
        .route("/api/token/logout", post(auth::token_logout))
        .route("/api/events", get(api_events::index).post(api_events::store))
        .route(
            "/api/events/:id",
            get(api_events::show)
                .put(api_events::update)
                .delete(api_events::destroy),
        )
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
