//! Shared calendar: general reminders, company work, meetings and leave.

pub mod ui;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike, Property};
use log::info;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::authenticated_user;
use crate::shared::schema::calendar_events;
use crate::shared::state::AppState;

/// Fixed title given to every leave event, whatever the caller supplied.
pub const LEAVE_TITLE: &str = "연차 신청";

/// Number of weekly copies produced by the repeat action.
pub const WEEKLY_REPEAT_COUNT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "GENERAL")]
    General,
    #[serde(rename = "COMPANY")]
    Company,
    #[serde(rename = "MEETING")]
    Meeting,
    #[serde(rename = "LEAVE")]
    Leave,
}

#[derive(Debug, Error)]
#[error("unknown event type: {0}")]
pub struct ParseEventTypeError(String);

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::General => "GENERAL",
            EventType::Company => "COMPANY",
            EventType::Meeting => "MEETING",
            EventType::Leave => "LEAVE",
        }
    }
}

impl FromStr for EventType {
    type Err = ParseEventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERAL" => Ok(EventType::General),
            "COMPANY" => Ok(EventType::Company),
            "MEETING" => Ok(EventType::Meeting),
            "LEAVE" => Ok(EventType::Leave),
            other => Err(ParseEventTypeError(other.to_string())),
        }
    }
}

/// Leave events always carry the fixed title; other types keep what the
/// caller supplied.
pub fn normalize_title(event_type: EventType, title: &str) -> String {
    if event_type == EventType::Leave {
        LEAVE_TITLE.to_string()
    } else {
        title.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = calendar_events)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub event_type: String,
    pub title: String,
    pub description: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub event_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub event_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<Option<DateTime<Utc>>>,
    pub company_id: Option<Option<Uuid>>,
    pub employee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct RepeatWeeklyRequest {
    pub event_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RepeatWeeklyResponse {
    pub created: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub event_type: Option<String>,
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Build the weekly follow-on copies of one event: offsets of 7, 14, ...,
/// `7 * WEEKLY_REPEAT_COUNT` days, end time shifted alongside the start
/// when present, every other field carried over. The source is untouched.
pub fn weekly_copies(event: &CalendarEvent, now: DateTime<Utc>) -> Vec<CalendarEvent> {
    (1..=WEEKLY_REPEAT_COUNT)
        .map(|offset| {
            let shift = Duration::days(7 * offset);
            CalendarEvent {
                id: Uuid::new_v4(),
                event_type: event.event_type.clone(),
                title: event.title.clone(),
                description: event.description.clone(),
                start_at: event.start_at + shift,
                end_at: event.end_at.map(|end| end + shift),
                company_id: event.company_id,
                employee_id: event.employee_id,
                created_by: event.created_by,
                created_at: now,
            }
        })
        .collect()
}

fn event_to_ical(event: &CalendarEvent) -> IcalEvent {
    let mut ical = IcalEvent::new();
    ical.uid(&event.id.to_string());
    ical.summary(&event.title);
    ical.starts(event.start_at);
    if let Some(end) = event.end_at {
        ical.ends(end);
    }
    if !event.description.is_empty() {
        ical.description(&event.description);
    }
    ical.add_property("CATEGORIES", &event.event_type);
    ical.done()
}

/// Export events as an RFC 5545 calendar.
pub fn export_to_ical(events: &[CalendarEvent], calendar_name: &str) -> String {
    let mut calendar = Calendar::new();
    calendar.name(calendar_name);
    calendar.append_property(Property::new("PRODID", "-//Backoffice//Calendar//EN"));

    for event in events {
        calendar.push(event_to_ical(event));
    }

    calendar.done().to_string()
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CalendarEvent>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let limit = query.limit.unwrap_or(200);
    let offset = query.offset.unwrap_or(0);

    let mut q = calendar_events::table.into_boxed();

    if let Some(event_type) = query.event_type {
        EventType::from_str(&event_type)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        q = q.filter(calendar_events::event_type.eq(event_type));
    }

    if let Some(company_id) = query.company_id {
        q = q.filter(calendar_events::company_id.eq(company_id));
    }

    if let Some(employee_id) = query.employee_id {
        q = q.filter(calendar_events::employee_id.eq(employee_id));
    }

    let events: Vec<CalendarEvent> = q
        .order(calendar_events::start_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(events))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<CalendarEvent>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let event_type = match req.event_type {
        Some(raw) => {
            EventType::from_str(&raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        }
        None => EventType::General,
    };

    let created_by = authenticated_user(&headers, &mut conn);

    let event = CalendarEvent {
        id: Uuid::new_v4(),
        event_type: event_type.as_str().to_string(),
        title: normalize_title(event_type, req.title.as_deref().unwrap_or("")),
        description: req.description.unwrap_or_default(),
        start_at: req.start_at,
        end_at: req.end_at,
        company_id: req.company_id,
        employee_id: req.employee_id,
        created_by,
        created_at: Utc::now(),
    };

    diesel::insert_into(calendar_events::table)
        .values(&event)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(event))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CalendarEvent>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let event: CalendarEvent = calendar_events::table
        .filter(calendar_events::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Event not found".to_string()))?;

    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<CalendarEvent>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    if let Some(raw) = &req.event_type {
        EventType::from_str(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::event_type.eq(raw))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(title) = req.title {
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::title.eq(title))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(description) = req.description {
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::description.eq(description))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(start_at) = req.start_at {
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::start_at.eq(start_at))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(end_at) = req.end_at {
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::end_at.eq(end_at))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(company_id) = req.company_id {
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::company_id.eq(company_id))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(employee_id) = req.employee_id {
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::employee_id.eq(employee_id))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    // The leave-title rule holds across updates as well.
    let stored: CalendarEvent = calendar_events::table
        .filter(calendar_events::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Event not found".to_string()))?;

    if stored.event_type == EventType::Leave.as_str() && stored.title != LEAVE_TITLE {
        diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
            .set(calendar_events::title.eq(LEAVE_TITLE))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    get_event(State(state), Path(id)).await
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    diesel::delete(calendar_events::table.filter(calendar_events::id.eq(id)))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete error: {e}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Batch action: create ten weekly follow-ons for each selected event.
///
/// Runs in one transaction so a failure partway leaves no partial series.
/// There is no duplicate detection: repeating the same selection creates
/// the series again.
pub async fn repeat_weekly(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RepeatWeeklyRequest>,
) -> Result<Json<RepeatWeeklyResponse>, (StatusCode, String)> {
    if req.event_ids.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No events selected".to_string()));
    }

    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let now = Utc::now();

    let created = conn
        .transaction::<usize, diesel::result::Error, _>(|conn| {
            let mut created = 0;
            for event_id in &req.event_ids {
                let source: Option<CalendarEvent> = calendar_events::table
                    .filter(calendar_events::id.eq(event_id))
                    .first(conn)
                    .optional()?;
                let Some(source) = source else {
                    continue;
                };
                let copies = weekly_copies(&source, now);
                created += diesel::insert_into(calendar_events::table)
                    .values(&copies)
                    .execute(conn)?;
            }
            Ok(created)
        })
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    info!("Repeat-weekly action created {created} events");
    Ok(Json(RepeatWeeklyResponse { created }))
}

pub async fn export_ical(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let events: Vec<CalendarEvent> = calendar_events::table
        .order(calendar_events::start_at.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let body = export_to_ical(&events, &state.config.site.title);

    Ok((
        [(
            axum::http::header::CONTENT_TYPE,
            "text/calendar; charset=utf-8",
        )],
        body,
    ))
}

pub fn configure_calendar_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calendar/events", get(list_events).post(create_event))
        .route(
            "/api/calendar/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/api/calendar/events/recur", post(repeat_weekly))
        .route("/api/calendar/export.ics", get(export_ical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source_event(end: Option<DateTime<Utc>>) -> CalendarEvent {
        CalendarEvent {
            id: Uuid::new_v4(),
            event_type: EventType::Meeting.as_str().to_string(),
            title: "Weekly sync".to_string(),
            description: "Status round".to_string(),
            start_at: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            end_at: end,
            company_id: Some(Uuid::new_v4()),
            employee_id: Some(Uuid::new_v4()),
            created_by: Some(Uuid::new_v4()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_weekly_copies_spacing_and_count() {
        let end = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let source = source_event(Some(end));
        let copies = weekly_copies(&source, Utc::now());

        assert_eq!(copies.len(), 10);
        assert_eq!(
            copies[0].start_at,
            Utc.with_ymd_and_hms(2025, 1, 13, 9, 0, 0).unwrap()
        );
        assert_eq!(
            copies[1].start_at,
            Utc.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap()
        );
        assert_eq!(
            copies[2].start_at,
            Utc.with_ymd_and_hms(2025, 1, 27, 9, 0, 0).unwrap()
        );
        assert_eq!(
            copies[3].start_at,
            Utc.with_ymd_and_hms(2025, 2, 3, 9, 0, 0).unwrap()
        );
        for (i, copy) in copies.iter().enumerate() {
            let shift = Duration::days(7 * (i as i64 + 1));
            assert_eq!(copy.start_at, source.start_at + shift);
            assert_eq!(copy.end_at, Some(end + shift));
        }
    }

    #[test]
    fn test_weekly_copies_carry_fields() {
        let source = source_event(None);
        for copy in weekly_copies(&source, Utc::now()) {
            assert_ne!(copy.id, source.id);
            assert_eq!(copy.event_type, source.event_type);
            assert_eq!(copy.title, source.title);
            assert_eq!(copy.description, source.description);
            assert_eq!(copy.company_id, source.company_id);
            assert_eq!(copy.employee_id, source.employee_id);
            assert_eq!(copy.created_by, source.created_by);
        }
    }

    #[test]
    fn test_weekly_copies_without_end_stay_open() {
        let source = source_event(None);
        assert!(weekly_copies(&source, Utc::now())
            .iter()
            .all(|c| c.end_at.is_none()));
    }

    #[test]
    fn test_normalize_title_forces_leave() {
        assert_eq!(normalize_title(EventType::Leave, "whatever"), LEAVE_TITLE);
        assert_eq!(normalize_title(EventType::Leave, ""), LEAVE_TITLE);
        assert_eq!(normalize_title(EventType::Meeting, "standup"), "standup");
    }

    #[test]
    fn test_event_type_round_trip() {
        for s in ["GENERAL", "COMPANY", "MEETING", "LEAVE"] {
            assert_eq!(EventType::from_str(s).unwrap().as_str(), s);
        }
        assert!(EventType::from_str("PARTY").is_err());
    }

    #[test]
    fn test_export_to_ical_contains_events() {
        let source = source_event(None);
        let ical = export_to_ical(std::slice::from_ref(&source), "Intranet");
        assert!(ical.contains("BEGIN:VCALENDAR"));
        assert!(ical.contains("Weekly sync"));
        assert!(ical.contains(&source.id.to_string()));
    }
}
