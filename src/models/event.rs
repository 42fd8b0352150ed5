use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of an event. Stored as the lowercase variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Cancelled,
    Done,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Done => "done",
        }
    }
}

impl FromStr for EventStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EventStatus::Scheduled),
            "cancelled" => Ok(EventStatus::Cancelled),
            "done" => Ok(EventStatus::Done),
            _ => Err(()),
        }
    }
}

/// Stored attribute only: `public` grants no cross-user access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventVisibility {
    Private,
    Public,
}

impl EventVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventVisibility::Private => "private",
            EventVisibility::Public => "public",
        }
    }
}

impl FromStr for EventVisibility {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(EventVisibility::Private),
            "public" => Ok(EventVisibility::Public),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub location: Option<String>,
    pub status: EventStatus,
    pub visibility: EventVisibility,
    pub color: Option<String>,
    pub capacity: Option<i32>,
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating an event. Id, owner and timestamps are
/// assigned by the service, never by the caller.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub location: Option<String>,
    pub status: EventStatus,
    pub visibility: EventVisibility,
    pub color: Option<String>,
    pub capacity: Option<i32>,
    pub meta: Option<serde_json::Value>,
}

/// Validated partial update. The outer `Option` distinguishes "leave as is"
/// from "set"; the inner one (nullable columns only) carries an explicit
/// clear.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<Option<DateTime<Utc>>>,
    pub all_day: Option<bool>,
    pub location: Option<Option<String>>,
    pub status: Option<EventStatus>,
    pub visibility: Option<EventVisibility>,
    pub color: Option<Option<String>>,
    pub capacity: Option<Option<i32>>,
    pub meta: Option<Option<serde_json::Value>>,
}

/// Narrow projection used by dashboard consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub all_day: bool,
}

impl Event {
    pub fn create(owner_id: Uuid, data: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: data.title,
            description: data.description,
            starts_at: data.starts_at,
            ends_at: data.ends_at,
            all_day: data.all_day,
            location: data.location,
            status: data.status,
            visibility: data.visibility,
            color: data.color,
            capacity: data.capacity,
            meta: data.meta,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch in place. `id`, `owner_id` and `created_at` are
    /// immutable by construction: the patch has no slots for them.
    pub fn apply(&mut self, patch: &EventPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(ends_at) = patch.ends_at {
            self.ends_at = ends_at;
        }
        if let Some(all_day) = patch.all_day {
            self.all_day = all_day;
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
        if let Some(meta) = &patch.meta {
            self.meta = meta.clone();
        }
        self.updated_at = now;
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            title: self.title.clone(),
            starts_at: self.starts_at,
            location: self.location.clone(),
            all_day: self.all_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_new(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: None,
            starts_at: Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap(),
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

    #[test]
    fn create_assigns_id_owner_and_timestamps() {
        let owner = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 10, 30, 12, 0, 0).unwrap();
        let event = Event::create(owner, sample_new("Standup"), now);

        assert_eq!(event.owner_id, owner);
        assert_eq!(event.title, "Standup");
        assert_eq!(event.created_at, now);
        assert_eq!(event.updated_at, now);
        assert_eq!(event.status, EventStatus::Scheduled);
        assert_eq!(event.visibility, EventVisibility::Private);
    }

    #[test]
    fn apply_patch_changes_only_supplied_fields() {
        let owner = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 10, 30, 12, 0, 0).unwrap();
        let mut event = Event::create(owner, sample_new("Standup"), now);
        event.description = Some("daily sync".to_string());

        let later = now + chrono::Duration::hours(1);
        let patch = EventPatch {
            title: Some("Planning".to_string()),
            ..EventPatch::default()
        };
        event.apply(&patch, later);

        assert_eq!(event.title, "Planning");
        assert_eq!(event.description.as_deref(), Some("daily sync"));
        assert_eq!(event.updated_at, later);
        assert_eq!(event.created_at, now);
    }

    #[test]
    fn apply_patch_clears_nullable_field_on_explicit_null() {
        let owner = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 10, 30, 12, 0, 0).unwrap();
        let mut event = Event::create(owner, sample_new("Standup"), now);
        event.location = Some("Room 4".to_string());

        let patch = EventPatch {
            location: Some(None),
            ..EventPatch::default()
        };
        event.apply(&patch, now);

        assert_eq!(event.location, None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            EventStatus::Scheduled,
            EventStatus::Cancelled,
            EventStatus::Done,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<EventStatus>().is_err());
    }

    #[test]
    fn visibility_round_trips_through_str() {
        for visibility in [EventVisibility::Private, EventVisibility::Public] {
            assert_eq!(
                visibility.as_str().parse::<EventVisibility>().unwrap(),
                visibility
            );
        }
        assert!("hidden".parse::<EventVisibility>().is_err());
    }

    #[test]
    fn summary_projects_narrow_fields() {
        let owner = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 10, 30, 12, 0, 0).unwrap();
        let mut event = Event::create(owner, sample_new("Standup"), now);
        event.location = Some("HQ".to_string());

        let summary = event.summary();
        assert_eq!(summary.id, event.id);
        assert_eq!(summary.title, "Standup");
        assert_eq!(summary.location.as_deref(), Some("HQ"));
        assert!(!summary.all_day);
    }
}
