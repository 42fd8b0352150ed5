use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth;
use crate::models::event::Event;
use crate::models::user::{ApiToken, User};
use crate::query::{paginate, sort_events, EventQuery, Paginated};
use crate::store::Store;
use crate::utils::error::AppError;

/// Test double backed by plain maps. Listing runs the same pure filter
/// predicate the SQL translation has to agree with.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tokens: RwLock<HashMap<String, ApiToken>>,
    events: RwLock<HashMap<Uuid, Event>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_user(&self, name: &str, email: &str, password: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: auth::hash_password(password).expect("failed to hash password"),
            created_at: now,
            updated_at: now,
        };
        self.users.write().await.insert(user.id, user.clone());
        user
    }

    /// Issues a token for the user and returns its plaintext.
    pub async fn seed_token(&self, user: &User) -> String {
        let token = auth::generate_token();
        let record = ApiToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: "test".to_string(),
            token_hash: auth::token_hash(&token),
            created_at: Utc::now(),
        };
        self.tokens
            .write()
            .await
            .insert(record.token_hash.clone(), record);
        token
    }

    pub async fn seed_event(&self, event: Event) {
        self.events.write().await.insert(event.id, event);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_token(&self, token: &ApiToken) -> Result<(), AppError> {
        self.tokens
            .write()
            .await
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn user_for_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let tokens = self.tokens.read().await;
        let Some(token) = tokens.get(token_hash) else {
            return Ok(None);
        };
        let users = self.users.read().await;
        Ok(users.get(&token.user_id).cloned())
    }

    async fn revoke_token(&self, token_hash: &str) -> Result<(), AppError> {
        self.tokens.write().await.remove(token_hash);
        Ok(())
    }

    async fn list_events(
        &self,
        owner_id: Uuid,
        query: &EventQuery,
    ) -> Result<Paginated<Event>, AppError> {
        let events = self.events.read().await;
        let mut matching: Vec<Event> = events
            .values()
            .filter(|e| e.owner_id == owner_id && query.filter.matches(e))
            .cloned()
            .collect();
        sort_events(&mut matching, query.sort_by, query.sort_order);
        Ok(paginate(matching, query.page))
    }

    async fn events_for_owner(&self, owner_id: Uuid) -> Result<Vec<Event>, AppError> {
        let events = self.events.read().await;
        let mut owned: Vec<Event> = events
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|e| e.starts_at);
        Ok(owned)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<(), AppError> {
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), AppError> {
        self.events.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventStatus, EventVisibility, NewEvent};
    use crate::query::{EventFilter, SortOrder};
    use chrono::{DateTime, TimeZone};

    fn new_event(title: &str, starts_at: DateTime<Utc>) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: None,
            starts_at,
            ends_at: None,
            all_day: false,
            location: None,
            status: EventStatus::Scheduled,
            visibility: EventVisibility::Private,
            color: None,
            capacity: None,
            meta: None,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_owner() {
        let store = MemoryStore::new();
        let ana = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store
            .seed_event(Event::create(ana, new_event("Ana's", at(1, 9)), at(1, 0)))
            .await;
        store
            .seed_event(Event::create(bob, new_event("Bob's", at(1, 9)), at(1, 0)))
            .await;

        let page = store.list_events(ana, &EventQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.data.iter().all(|e| e.owner_id == ana));
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        let ana = Uuid::new_v4();
        for day in 1..=12 {
            store
                .seed_event(Event::create(
                    ana,
                    new_event(&format!("Planning {day}"), at(day, 9)),
                    at(1, 0),
                ))
                .await;
        }
        store
            .seed_event(Event::create(ana, new_event("Standup", at(13, 9)), at(1, 0)))
            .await;

        let query = EventQuery {
            filter: EventFilter {
                search: Some("planning".to_string()),
                ..EventFilter::default()
            },
            sort_order: SortOrder::Desc,
            page: 2,
            ..EventQuery::default()
        };
        let page = store.list_events(ana, &query).await.unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.data.len(), 2);
        // Descending from day 12: page two holds the two earliest.
        assert_eq!(page.data[0].title, "Planning 2");
        assert_eq!(page.data[1].title, "Planning 1");
    }

    #[tokio::test]
    async fn events_round_trip_through_update_and_delete() {
        let store = MemoryStore::new();
        let ana = Uuid::new_v4();
        let mut event = Event::create(ana, new_event("Standup", at(1, 9)), at(1, 0));
        store.insert_event(&event).await.unwrap();

        event.title = "Retro".to_string();
        store.update_event(&event).await.unwrap();
        let found = store.find_event(event.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Retro");

        store.delete_event(event.id).await.unwrap();
        assert!(store.find_event(event.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tokens_resolve_until_revoked() {
        let store = MemoryStore::new();
        let user = store.seed_user("ana", "ana@example.com", "secret").await;
        let token = store.seed_token(&user).await;
        let hash = auth::token_hash(&token);

        let resolved = store.user_for_token(&hash).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));

        store.revoke_token(&hash).await.unwrap();
        assert!(store.user_for_token(&hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn users_are_found_by_email() {
        let store = MemoryStore::new();
        let user = store.seed_user("ana", "ana@example.com", "secret").await;

        let found = store.find_user_by_email("ana@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(store
            .find_user_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
