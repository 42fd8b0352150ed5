use chrono::{DateTime, Datelike, Days, Months, NaiveTime, Utc, Weekday};
use serde::Serialize;

use crate::models::event::{Event, EventStatus, EventSummary};

/// Aggregate counters for the dashboard page. Keys keep the page-prop
/// casing the frontend consumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: i64,
    pub today: i64,
    pub this_week: i64,
    pub this_month: i64,
    pub scheduled: i64,
    pub cancelled: i64,
    pub done: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub next_event: Option<Event>,
    pub upcoming_events: Vec<EventSummary>,
}

/// How many upcoming events the dashboard shows, next event included.
pub const UPCOMING_LIMIT: usize = 5;

/// Current UTC calendar day as a half-open `[start, end)` range.
pub fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = now.date_naive();
    (
        day.and_time(NaiveTime::MIN).and_utc(),
        (day + Days::new(1)).and_time(NaiveTime::MIN).and_utc(),
    )
}

/// Start of the current day through the end of the ISO week (Sunday),
/// half-open on the following Monday.
pub fn week_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = now.date_naive();
    let next_monday = day.week(Weekday::Mon).first_day() + Days::new(7);
    (
        day.and_time(NaiveTime::MIN).and_utc(),
        next_monday.and_time(NaiveTime::MIN).and_utc(),
    )
}

/// Current calendar month as a half-open `[first, first-of-next)` range.
pub fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = now.date_naive() - Days::new(u64::from(now.date_naive().day0()));
    (
        first.and_time(NaiveTime::MIN).and_utc(),
        (first + Months::new(1)).and_time(NaiveTime::MIN).and_utc(),
    )
}

impl Dashboard {
    /// Computes the aggregates over an owner's events. Pure; the instant is
    /// a parameter so the windows are deterministic under test.
    pub fn compute(events: &[Event], now: DateTime<Utc>) -> Self {
        let (today_from, today_until) = day_window(now);
        let (week_from, week_until) = week_window(now);
        let (month_from, month_until) = month_window(now);

        let in_window = |event: &Event, from: DateTime<Utc>, until: DateTime<Utc>| {
            event.starts_at >= from && event.starts_at < until
        };

        let count_status = |status: EventStatus| {
            events.iter().filter(|e| e.status == status).count() as i64
        };

        let mut upcoming: Vec<&Event> = events.iter().filter(|e| e.starts_at >= now).collect();
        upcoming.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));

        Dashboard {
            stats: DashboardStats {
                total: events.len() as i64,
                today: events
                    .iter()
                    .filter(|e| in_window(e, today_from, today_until))
                    .count() as i64,
                this_week: events
                    .iter()
                    .filter(|e| in_window(e, week_from, week_until))
                    .count() as i64,
                this_month: events
                    .iter()
                    .filter(|e| in_window(e, month_from, month_until))
                    .count() as i64,
                scheduled: count_status(EventStatus::Scheduled),
                cancelled: count_status(EventStatus::Cancelled),
                done: count_status(EventStatus::Done),
            },
            next_event: upcoming.first().map(|e| (*e).clone()),
            upcoming_events: upcoming
                .iter()
                .take(UPCOMING_LIMIT)
                .map(|e| e.summary())
                .collect(),
        }
    }
}
