use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::event::Event;
use crate::models::user::{ApiToken, User};
use crate::query::{AllDayFilter, EventFilter, EventQuery, Paginated, PAGE_SIZE};
use crate::store::Store;
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape for the events table. Enum columns come back as text and
/// are converted on the way out so handlers only ever see the closed
/// variants.
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    all_day: bool,
    location: Option<String>,
    status: String,
    visibility: String,
    color: Option<String>,
    capacity: Option<i32>,
    meta: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|()| {
            AppError::InternalServerError(format!(
                "Event {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        let visibility = row.visibility.parse().map_err(|()| {
            AppError::InternalServerError(format!(
                "Event {} has unknown visibility '{}'",
                row.id, row.visibility
            ))
        })?;

        Ok(Event {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            all_day: row.all_day,
            location: row.location,
            status,
            visibility,
            color: row.color,
            capacity: row.capacity,
            meta: row.meta,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `%term%` with LIKE metacharacters escaped, so user input only ever
/// matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends the WHERE clause. The owner predicate is pushed first and
/// unconditionally; the optional filters only ever AND onto it.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, filter: &EventFilter) {
    builder.push(" WHERE owner_id = ");
    builder.push_bind(owner_id);

    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(visibility) = filter.visibility {
        builder.push(" AND visibility = ");
        builder.push_bind(visibility.as_str());
    }
    match filter.all_day {
        AllDayFilter::Unset => {}
        AllDayFilter::RequireTrue => {
            builder.push(" AND all_day = TRUE");
        }
        AllDayFilter::RequireFalse => {
            builder.push(" AND all_day = FALSE");
        }
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND starts_at >= ");
        builder.push_bind(from);
    }
    if let Some(until) = filter.date_until {
        builder.push(" AND starts_at < ");
        builder.push_bind(until);
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR description ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR location ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(location) = &filter.location {
        builder.push(" AND location ILIKE ");
        builder.push_bind(like_pattern(location));
    }
}

fn page_offset(page: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * PAGE_SIZE as i64
}

fn select_events(owner_id: Uuid, query: &EventQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT * FROM events");
    push_filters(&mut builder, owner_id, &query.filter);
    builder.push(" ORDER BY ");
    builder.push(query.sort_by.column());
    builder.push(" ");
    builder.push(query.sort_order.sql());
    builder.push(" LIMIT ");
    builder.push_bind(PAGE_SIZE as i64);
    builder.push(" OFFSET ");
    builder.push_bind(page_offset(query.page));
    builder
}

fn count_events(owner_id: Uuid, filter: &EventFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM events");
    push_filters(&mut builder, owner_id, filter);
    builder
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_token(&self, token: &ApiToken) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO api_tokens (id, user_id, name, token_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.name)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_for_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT users.* FROM users \
             INNER JOIN api_tokens ON api_tokens.user_id = users.id \
             WHERE api_tokens.token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn revoke_token(&self, token_hash: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM api_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_events(
        &self,
        owner_id: Uuid,
        query: &EventQuery,
    ) -> Result<Paginated<Event>, AppError> {
        let total: i64 = count_events(owner_id, &query.filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<EventRow> = select_events(owner_id, query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;
        let data = rows
            .into_iter()
            .map(Event::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::new(data, query.page, total as u64))
    }

    async fn events_for_owner(&self, owner_id: Uuid) -> Result<Vec<Event>, AppError> {
        let rows: Vec<EventRow> =
            sqlx::query_as("SELECT * FROM events WHERE owner_id = $1 ORDER BY starts_at ASC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let row: Option<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Event::try_from).transpose()
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO events (id, owner_id, title, description, starts_at, ends_at, \
             all_day, location, status, visibility, color, capacity, meta, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(event.id)
        .bind(event.owner_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.all_day)
        .bind(&event.location)
        .bind(event.status.as_str())
        .bind(event.visibility.as_str())
        .bind(&event.color)
        .bind(event.capacity)
        .bind(&event.meta)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE events SET title = $1, description = $2, starts_at = $3, ends_at = $4, \
             all_day = $5, location = $6, status = $7, visibility = $8, color = $9, \
             capacity = $10, meta = $11, updated_at = $12 WHERE id = $13",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.all_day)
        .bind(&event.location)
        .bind(event.status.as_str())
        .bind(event.visibility.as_str())
        .bind(&event.color)
        .bind(event.capacity)
        .bind(&event.meta)
        .bind(event.updated_at)
        .bind(event.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventStatus, EventVisibility};
    use crate::query::{SortField, SortOrder};
    use chrono::TimeZone;

    fn full_filter() -> EventFilter {
        EventFilter {
            search: Some("plan".to_string()),
            status: Some(EventStatus::Scheduled),
            visibility: Some(EventVisibility::Private),
            location: Some("hq".to_string()),
            all_day: AllDayFilter::RequireTrue,
            date_from: Some(Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap()),
            date_until: Some(Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn owner_predicate_is_always_present() {
        let owner = Uuid::new_v4();

        let bare = select_events(owner, &EventQuery::default());
        assert!(bare
            .sql()
            .starts_with("SELECT * FROM events WHERE owner_id = $1"));

        let filtered = select_events(
            owner,
            &EventQuery {
                filter: full_filter(),
                ..EventQuery::default()
            },
        );
        assert!(filtered
            .sql()
            .starts_with("SELECT * FROM events WHERE owner_id = $1 AND "));
    }

    #[test]
    fn default_query_orders_and_pages() {
        let builder = select_events(Uuid::new_v4(), &EventQuery::default());
        assert_eq!(
            builder.sql(),
            "SELECT * FROM events WHERE owner_id = $1 \
             ORDER BY starts_at ASC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn filters_become_and_predicates() {
        let query = EventQuery {
            filter: full_filter(),
            ..EventQuery::default()
        };
        let builder = select_events(Uuid::new_v4(), &query);
        let sql = builder.sql().to_string();

        assert!(sql.contains("AND status = "));
        assert!(sql.contains("AND visibility = "));
        assert!(sql.contains("AND all_day = TRUE"));
        assert!(sql.contains("AND starts_at >= "));
        assert!(sql.contains("AND starts_at < "));
        assert!(sql.contains("AND (title ILIKE "));
        assert!(sql.contains(" OR description ILIKE "));
        assert!(sql.contains(" OR location ILIKE "));
        assert!(sql.contains("AND location ILIKE "));
    }

    #[test]
    fn sort_parameters_reach_the_order_clause() {
        let query = EventQuery {
            sort_by: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
            ..EventQuery::default()
        };
        let builder = select_events(Uuid::new_v4(), &query);
        assert!(builder.sql().contains("ORDER BY created_at DESC"));
    }

    #[test]
    fn count_query_shares_the_where_clause() {
        let builder = count_events(Uuid::new_v4(), &EventFilter::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM events WHERE owner_id = $1");
    }

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 20);
    }

    #[test]
    fn like_patterns_escape_metacharacters() {
        assert_eq!(like_pattern("plan"), "%plan%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\d"), "%c:\\\\d%");
    }

    #[test]
    fn event_row_converts_to_domain_event() {
        let now = Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
        let row = EventRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Standup".to_string(),
            description: None,
            starts_at: now,
            ends_at: None,
            all_day: false,
            location: None,
            status: "scheduled".to_string(),
            visibility: "private".to_string(),
            color: None,
            capacity: None,
            meta: None,
            created_at: now,
            updated_at: now,
        };
        let event = Event::try_from(row).unwrap();
        assert_eq!(event.status, EventStatus::Scheduled);
        assert_eq!(event.visibility, EventVisibility::Private);
    }

    #[test]
    fn event_row_with_unknown_status_is_an_error() {
        let now = Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
        let row = EventRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Standup".to_string(),
            description: None,
            starts_at: now,
            ends_at: None,
            all_day: false,
            location: None,
            status: "postponed".to_string(),
            visibility: "private".to_string(),
            color: None,
            capacity: None,
            meta: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            Event::try_from(row),
            Err(AppError::InternalServerError(_))
        ));
    }
}
