use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::event::{Event, EventStatus, EventVisibility};
use crate::validation::{clean, parse_date, ValidationErrors};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    StartsAt,
    CreatedAt,
}

impl SortField {
    /// Column name, safe to splice into SQL because the variants are closed.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::StartsAt => "starts_at",
            SortField::CreatedAt => "created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starts_at" => Ok(SortField::StartsAt),
            "created_at" => Ok(SortField::CreatedAt),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

/// The `all_day` parameter is deliberately tri-state: an absent parameter
/// imposes no filter, while a present truthy/falsy value requires that
/// exact flag. Unset and "require false" stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllDayFilter {
    #[default]
    Unset,
    RequireTrue,
    RequireFalse,
}

impl AllDayFilter {
    fn from_param(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(AllDayFilter::RequireTrue),
            "0" | "false" | "off" | "no" => Some(AllDayFilter::RequireFalse),
            _ => None,
        }
    }

    pub fn allows(&self, all_day: bool) -> bool {
        match self {
            AllDayFilter::Unset => true,
            AllDayFilter::RequireTrue => all_day,
            AllDayFilter::RequireFalse => !all_day,
        }
    }
}

/// Validated filter set. `date_until` is the exclusive upper bound derived
/// from the inclusive `date_to` day (midnight of the following day).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub search: Option<String>,
    pub status: Option<EventStatus>,
    pub visibility: Option<EventVisibility>,
    pub location: Option<String>,
    pub all_day: AllDayFilter,
    pub date_from: Option<DateTime<Utc>>,
    pub date_until: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Pure predicate form of the filter; the in-memory store applies it
    /// directly and it is the reference behavior the SQL translation
    /// must agree with.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(status) = self.status {
            if event.status != status {
                return false;
            }
        }
        if let Some(visibility) = self.visibility {
            if event.visibility != visibility {
                return false;
            }
        }
        if !self.all_day.allows(event.all_day) {
            return false;
        }
        if let Some(from) = self.date_from {
            if event.starts_at < from {
                return false;
            }
        }
        if let Some(until) = self.date_until {
            if event.starts_at >= until {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let matched = event.title.to_lowercase().contains(&term)
                || event
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
                || event
                    .location
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase().contains(&term));
            if !matched {
                return false;
            }
        }
        if let Some(location) = &self.location {
            let location = location.to_lowercase();
            if !event
                .location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&location))
            {
                return false;
            }
        }
        true
    }
}

/// Validated listing request: filter plus ordering plus the 1-based page.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub filter: EventFilter,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u32,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            filter: EventFilter::default(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
        }
    }
}

/// Raw query-string parameters for event listings. Everything arrives as
/// an optional string; `validate` turns them into an `EventQuery` or a
/// field-keyed rejection. Blank parameters count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub visibility: Option<String>,
    pub location: Option<String>,
    pub all_day: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
}

impl ListParams {
    pub fn validate(&self) -> Result<EventQuery, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mut status = None;
        if let Some(raw) = clean(self.status.clone()) {
            match raw.parse() {
                Ok(parsed) => status = Some(parsed),
                Err(()) => errors.add("status", "status must be one of scheduled, cancelled, done"),
            }
        }
        let mut visibility = None;
        if let Some(raw) = clean(self.visibility.clone()) {
            match raw.parse() {
                Ok(parsed) => visibility = Some(parsed),
                Err(()) => errors.add("visibility", "visibility must be one of private, public"),
            }
        }
        let mut all_day = AllDayFilter::Unset;
        if let Some(raw) = clean(self.all_day.clone()) {
            match AllDayFilter::from_param(&raw) {
                Some(parsed) => all_day = parsed,
                None => errors.add("all_day", "all_day must be a boolean"),
            }
        }
        let mut date_from = None;
        if let Some(raw) = clean(self.date_from.clone()) {
            match parse_date(&raw) {
                Some(date) => date_from = Some(date.and_time(NaiveTime::MIN).and_utc()),
                None => errors.add("date_from", "date_from is not a valid date"),
            }
        }
        let mut date_until = None;
        if let Some(raw) = clean(self.date_to.clone()) {
            match parse_date(&raw) {
                // Inclusive through end of day: bound by the next midnight.
                Some(date) => {
                    date_until = Some((date + Days::new(1)).and_time(NaiveTime::MIN).and_utc());
                }
                None => errors.add("date_to", "date_to is not a valid date"),
            }
        }

        let mut sort_by = SortField::default();
        if let Some(raw) = clean(self.sort_by.clone()) {
            match raw.parse() {
                Ok(field) => sort_by = field,
                Err(()) => errors.add("sort_by", "sort_by must be one of starts_at, created_at"),
            }
        }
        let mut sort_order = SortOrder::default();
        if let Some(raw) = clean(self.sort_order.clone()) {
            match raw.parse() {
                Ok(order) => sort_order = order,
                Err(()) => errors.add("sort_order", "sort_order must be asc or desc"),
            }
        }

        let mut page = 1;
        if let Some(raw) = clean(self.page.clone()) {
            match raw.parse::<u32>() {
                Ok(parsed) if parsed >= 1 => page = parsed,
                _ => errors.add("page", "page must be a positive integer"),
            }
        }

        if errors.is_empty() {
            Ok(EventQuery {
                filter: EventFilter {
                    search: clean(self.search.clone()),
                    status,
                    visibility,
                    location: clean(self.location.clone()),
                    all_day,
                    date_from,
                    date_until,
                },
                sort_by,
                sort_order,
                page,
            })
        } else {
            Err(errors)
        }
    }

    /// Raw filter values echoed back to the page so the filter controls
    /// can re-render their state.
    pub fn echo(&self) -> FiltersEcho {
        FiltersEcho {
            search: self.search.clone(),
            status: self.status.clone(),
            visibility: self.visibility.clone(),
            location: self.location.clone(),
            all_day: self.all_day.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FiltersEcho {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

/// A single page of results plus the pagination metadata the clients
/// render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, current_page: u32, total: u64) -> Self {
        Self {
            data,
            current_page,
            per_page: PAGE_SIZE as u32,
            total,
            last_page: last_page(total),
        }
    }
}

/// An empty result set still has one (empty) page.
pub fn last_page(total: u64) -> u32 {
    total.div_ceil(PAGE_SIZE as u64).max(1) as u32
}

pub fn sort_events(events: &mut [Event], sort_by: SortField, sort_order: SortOrder) {
    events.sort_by_key(|event| match sort_by {
        SortField::StartsAt => event.starts_at,
        SortField::CreatedAt => event.created_at,
    });
    if sort_order == SortOrder::Desc {
        events.reverse();
    }
}

/// Slices an already filtered and sorted set down to the requested page.
/// Pages past the end come back empty with the metadata intact.
pub fn paginate<T>(items: Vec<T>, page: u32) -> Paginated<T> {
    let total = items.len() as u64;
    let start = (page as usize).saturating_sub(1) * PAGE_SIZE;
    let data: Vec<T> = items.into_iter().skip(start).take(PAGE_SIZE).collect();
    Paginated::new(data, page, total)
}
