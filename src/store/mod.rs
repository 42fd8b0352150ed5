use async_trait::async_trait;
use uuid::Uuid;

use crate::models::event::Event;
use crate::models::user::{ApiToken, User};
use crate::query::{EventQuery, Paginated};
use crate::utils::error::AppError;

pub mod pg;

#[cfg(test)]
pub mod memory;

pub use pg::PgStore;

/// Persistence port for the handlers. The Postgres implementation backs
/// the running server; an in-memory one drives the tests. Every event
/// read is scoped by `owner_id` at this boundary, separately from the
/// caller-supplied filters.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn insert_token(&self, token: &ApiToken) -> Result<(), AppError>;

    /// Resolves the owner of a token by the token's digest.
    async fn user_for_token(&self, token_hash: &str) -> Result<Option<User>, AppError>;

    async fn revoke_token(&self, token_hash: &str) -> Result<(), AppError>;

    /// Filtered, sorted, paginated listing of one owner's events.
    async fn list_events(
        &self,
        owner_id: Uuid,
        query: &EventQuery,
    ) -> Result<Paginated<Event>, AppError>;

    /// Every event of one owner, ordered by `starts_at` ascending. Feeds
    /// the calendar widget and the dashboard aggregation.
    async fn events_for_owner(&self, owner_id: Uuid) -> Result<Vec<Event>, AppError>;

    /// Unscoped lookup by id; callers authorize against the returned
    /// owner before acting.
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, AppError>;

    async fn insert_event(&self, event: &Event) -> Result<(), AppError>;

    /// Persists the full row as given; last write wins.
    async fn update_event(&self, event: &Event) -> Result<(), AppError>;

    async fn delete_event(&self, id: Uuid) -> Result<(), AppError>;
}
