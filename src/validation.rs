use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::models::event::{Event, EventPatch, EventStatus, EventVisibility, NewEvent};

pub const TITLE_MAX: usize = 255;
pub const LOCATION_MAX: usize = 255;
pub const COLOR_MAX: usize = 32;

/// Field → messages map collected by the validators. Serializes as a plain
/// JSON object so it can ride in the error envelope's `details` slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }
}

/// Deserializes a field so that an absent key and an explicit `null` stay
/// distinguishable: absent → `None`, `null` → `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Accepts RFC 3339 plus the HTML `datetime-local` shapes the forms submit.
/// Naive values are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Trims and drops empty strings, the way the forms normalise optional
/// text inputs before validation.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn check_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("{field} must be at most {max} characters"));
    }
}

fn parse_status(errors: &mut ValidationErrors, value: &str) -> Option<EventStatus> {
    match value.parse() {
        Ok(status) => Some(status),
        Err(()) => {
            errors.add("status", "status must be one of scheduled, cancelled, done");
            None
        }
    }
}

fn parse_visibility(errors: &mut ValidationErrors, value: &str) -> Option<EventVisibility> {
    match value.parse() {
        Ok(visibility) => Some(visibility),
        Err(()) => {
            errors.add("visibility", "visibility must be one of private, public");
            None
        }
    }
}

fn check_capacity(errors: &mut ValidationErrors, value: i64) -> Option<i32> {
    if value < 1 {
        errors.add("capacity", "capacity must be at least 1");
        None
    } else if value > i64::from(i32::MAX) {
        errors.add("capacity", "capacity is out of range");
        None
    } else {
        Some(value as i32)
    }
}

fn check_meta(errors: &mut ValidationErrors, value: &serde_json::Value) -> bool {
    if value.is_object() || value.is_array() {
        true
    } else {
        errors.add("meta", "meta must be a JSON object or array");
        false
    }
}

/// Raw create payload. Everything optional so missing required fields
/// surface as field errors instead of body-decode rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub visibility: Option<String>,
    pub color: Option<String>,
    pub capacity: Option<i64>,
    pub meta: Option<serde_json::Value>,
}

impl EventPayload {
    pub fn validate(self) -> Result<NewEvent, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = match clean(self.title) {
            Some(title) => {
                check_len(&mut errors, "title", &title, TITLE_MAX);
                Some(title)
            }
            None => {
                errors.add("title", "title is required");
                None
            }
        };

        let starts_at = match clean(self.starts_at) {
            Some(raw) => match parse_datetime(&raw) {
                Some(dt) => Some(dt),
                None => {
                    errors.add("starts_at", "starts_at is not a valid date/time");
                    None
                }
            },
            None => {
                errors.add("starts_at", "starts_at is required");
                None
            }
        };

        let ends_at = match clean(self.ends_at) {
            Some(raw) => match parse_datetime(&raw) {
                Some(dt) => Some(dt),
                None => {
                    errors.add("ends_at", "ends_at is not a valid date/time");
                    None
                }
            },
            None => None,
        };

        if let (Some(starts), Some(ends)) = (starts_at, ends_at) {
            if ends < starts {
                errors.add("ends_at", "ends_at must be on or after starts_at");
            }
        }

        let description = clean(self.description);
        let location = clean(self.location);
        if let Some(location) = &location {
            check_len(&mut errors, "location", location, LOCATION_MAX);
        }
        let color = clean(self.color);
        if let Some(color) = &color {
            check_len(&mut errors, "color", color, COLOR_MAX);
        }

        let status = match clean(self.status) {
            Some(raw) => parse_status(&mut errors, &raw),
            None => Some(EventStatus::Scheduled),
        };
        let visibility = match clean(self.visibility) {
            Some(raw) => parse_visibility(&mut errors, &raw),
            None => Some(EventVisibility::Private),
        };

        let capacity = match self.capacity {
            Some(raw) => check_capacity(&mut errors, raw),
            None => None,
        };

        let meta = match self.meta {
            Some(value) => {
                check_meta(&mut errors, &value);
                Some(value)
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        let (Some(title), Some(starts_at), Some(status), Some(visibility)) =
            (title, starts_at, status, visibility)
        else {
            return Err(errors);
        };

        Ok(NewEvent {
            title,
            description,
            starts_at,
            ends_at,
            all_day: self.all_day.unwrap_or(false),
            location,
            status,
            visibility,
            color,
            capacity,
            meta,
        })
    }
}

/// Raw partial-update payload. Nullable columns use the double-`Option`
/// so an explicit `null` clears the stored value while an absent key
/// leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventPayload {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub starts_at: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ends_at: Option<Option<String>>,
    pub all_day: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    pub status: Option<String>,
    pub visibility: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub capacity: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta: Option<Option<serde_json::Value>>,
}

impl UpdateEventPayload {
    /// Validates against the event being updated so the `ends_at >=
    /// starts_at` invariant holds for the row as it will be stored, not
    /// just for the fields present in the payload.
    pub fn validate(self, current: &Event) -> Result<EventPatch, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut patch = EventPatch::default();

        match self.title.map(clean) {
            None => {}
            Some(None) => errors.add("title", "title is required"),
            Some(Some(title)) => {
                check_len(&mut errors, "title", &title, TITLE_MAX);
                patch.title = Some(title);
            }
        }

        match self.starts_at.map(clean) {
            None => {}
            Some(None) => errors.add("starts_at", "starts_at is required"),
            Some(Some(raw)) => match parse_datetime(&raw) {
                Some(dt) => patch.starts_at = Some(dt),
                None => errors.add("starts_at", "starts_at is not a valid date/time"),
            },
        }

        match self.ends_at.map(clean) {
            None => {}
            Some(None) => patch.ends_at = Some(None),
            Some(Some(raw)) => match parse_datetime(&raw) {
                Some(dt) => patch.ends_at = Some(Some(dt)),
                None => errors.add("ends_at", "ends_at is not a valid date/time"),
            },
        }

        match self.description.map(clean) {
            None => {}
            Some(value) => patch.description = Some(value),
        }

        match self.location.map(clean) {
            None => {}
            Some(None) => patch.location = Some(None),
            Some(Some(location)) => {
                check_len(&mut errors, "location", &location, LOCATION_MAX);
                patch.location = Some(Some(location));
            }
        }

        match self.color.map(clean) {
            None => {}
            Some(None) => patch.color = Some(None),
            Some(Some(color)) => {
                check_len(&mut errors, "color", &color, COLOR_MAX);
                patch.color = Some(Some(color));
            }
        }

        if let Some(raw) = clean(self.status) {
            patch.status = parse_status(&mut errors, &raw);
        }
        if let Some(raw) = clean(self.visibility) {
            patch.visibility = parse_visibility(&mut errors, &raw);
        }
        if let Some(all_day) = self.all_day {
            patch.all_day = Some(all_day);
        }

        match self.capacity {
            None => {}
            Some(None) => patch.capacity = Some(None),
            Some(Some(raw)) => {
                if let Some(capacity) = check_capacity(&mut errors, raw) {
                    patch.capacity = Some(Some(capacity));
                }
            }
        }

        match self.meta {
            None => {}
            Some(None) => patch.meta = Some(None),
            Some(Some(value)) => {
                if check_meta(&mut errors, &value) {
                    patch.meta = Some(Some(value));
                }
            }
        }

        // The stored row must still satisfy the invariant after the patch:
        // compare supplied values against their supplied-or-existing
        // counterparts and key the error to whichever field was sent.
        let effective_starts = patch.starts_at.unwrap_or(current.starts_at);
        let effective_ends = match patch.ends_at {
            Some(ends) => ends,
            None => current.ends_at,
        };
        if let Some(ends) = effective_ends {
            if ends < effective_starts {
                if patch.ends_at.is_some() {
                    errors.add("ends_at", "ends_at must be on or after starts_at");
                } else {
                    errors.add("starts_at", "starts_at must be on or before ends_at");
                }
            }
        }

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginData {
    pub email: String,
    pub password: String,
    pub device_name: String,
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

impl LoginPayload {
    pub fn validate(self) -> Result<LoginData, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = match clean(self.email) {
            Some(email) => {
                if !looks_like_email(&email) {
                    errors.add("email", "email must be a valid email address");
                }
                Some(email)
            }
            None => {
                errors.add("email", "email is required");
                None
            }
        };

        let password = match self.password.filter(|p| !p.is_empty()) {
            Some(password) => Some(password),
            None => {
                errors.add("password", "password is required");
                None
            }
        };

        let device_name = clean(self.device_name).unwrap_or_else(|| "api".to_string());

        if !errors.is_empty() {
            return Err(errors);
        }
        let (Some(email), Some(password)) = (email, password) else {
            return Err(errors);
        };

        Ok(LoginData {
            email,
            password,
            device_name,
        })
    }
}
