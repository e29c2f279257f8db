//! Server-rendered calendar pages.
//!
//! `/admin/calendar` is the operator screen with the quick-add form; the
//! `/calendar` routes are the plain staff-facing views.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use log::warn;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::authenticated_user;
use crate::calendar::{normalize_title, CalendarEvent, EventType};
use crate::config::SiteConfig;
use crate::shared::schema::{calendar_events, companies, employees, users};
use crate::shared::state::AppState;
use crate::shared::utils::html_escape;

/// Quick-add form on the admin calendar. Every field arrives as a raw
/// string; parsing decides whether anything is created at all.
#[derive(Debug, Default, Deserialize)]
pub struct QuickAddForm {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub event_type: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartParam {
    pub start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublicEventForm {
    pub event_type: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: String,
    pub end_at: Option<String>,
    pub company_id: Option<String>,
    pub employee_id: Option<String>,
}

/// Combine the quick-add date and time fields into event times.
///
/// Returns `None` when the date or the start time is missing or does not
/// parse; the caller then creates nothing. A bad end time only drops the
/// end, the event itself still goes through.
pub fn parse_quick_add(form: &QuickAddForm) -> Option<(DateTime<Utc>, Option<DateTime<Utc>>)> {
    let date = NaiveDate::parse_from_str(form.date.as_deref()?, "%Y-%m-%d").ok()?;
    let start_time = NaiveTime::parse_from_str(form.start_time.as_deref()?, "%H:%M").ok()?;
    let start = date.and_time(start_time).and_utc();

    let end = form
        .end_time
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M").ok())
        .map(|t| date.and_time(t).and_utc());

    Some((start, end))
}

/// Pre-fill value for the start field from a `?start=YYYY-MM-DD` query
/// parameter, at the given hour. Invalid values are ignored.
pub fn prefill_start(param: Option<&str>, hour: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(param?, "%Y-%m-%d").ok()?;
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    Some(date.and_time(time).and_utc())
}

/// Parse an HTML `datetime-local` input value.
pub fn parse_datetime_local(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .ok()
        .map(|dt| dt.and_utc())
}

fn parse_optional_id(raw: &Option<String>) -> Option<Uuid> {
    raw.as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn event_type_label(event_type: &str) -> &'static str {
    match EventType::from_str(event_type) {
        Ok(EventType::General) => "General",
        Ok(EventType::Company) => "Company",
        Ok(EventType::Meeting) => "Meeting",
        Ok(EventType::Leave) => "Leave",
        Err(_) => "Unknown",
    }
}

fn format_range(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> String {
    match end {
        Some(end) => format!(
            "{} - {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%H:%M")
        ),
        None => start.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn render_page(site: &SiteConfig, title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | {site_title}</title>
    <style>
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f5f5; }}
        .container {{ max-width: 1100px; margin: 0 auto; padding: 24px; }}
        .masthead {{ font-size: 14px; color: #666; margin-bottom: 8px; }}
        h1 {{ font-size: 24px; color: #1a1a1a; margin-bottom: 16px; }}
        table {{ width: 100%; border-collapse: collapse; background: white; border-radius: 8px; overflow: hidden; }}
        th, td {{ padding: 10px 12px; text-align: left; border-bottom: 1px solid #eee; font-size: 14px; }}
        th {{ background: #fafafa; color: #666; font-weight: 500; }}
        .badge {{ display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 12px; }}
        .badge-general {{ background: #f5f5f5; color: #666; }}
        .badge-company {{ background: #e3f2fd; color: #1565c0; }}
        .badge-meeting {{ background: #fff3e0; color: #ef6c00; }}
        .badge-leave {{ background: #e8f5e9; color: #2e7d32; }}
        .card {{ background: white; border-radius: 8px; padding: 20px; margin-bottom: 20px; }}
        .form-row {{ margin-bottom: 10px; }}
        label {{ display: inline-block; min-width: 90px; font-size: 13px; color: #444; }}
        input, select, textarea {{ padding: 6px 8px; border: 1px solid #ccc; border-radius: 4px; font-size: 14px; }}
        .btn {{ padding: 8px 16px; border: none; border-radius: 6px; cursor: pointer; background: #0066cc; color: white; font-size: 14px; }}
        .error {{ color: #c62828; margin-bottom: 12px; }}
        a {{ color: #0066cc; text-decoration: none; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="masthead">{header}</div>
        <h1>{title}</h1>
        {body}
    </div>
</body>
</html>"#,
        title = html_escape(title),
        site_title = html_escape(&site.title),
        header = html_escape(&site.header),
        body = body,
    ))
}

fn type_badge(event_type: &str) -> String {
    let class = match EventType::from_str(event_type) {
        Ok(EventType::General) => "badge-general",
        Ok(EventType::Company) => "badge-company",
        Ok(EventType::Meeting) => "badge-meeting",
        Ok(EventType::Leave) => "badge-leave",
        Err(_) => "badge-general",
    };
    format!(
        r#"<span class="badge {}">{}</span>"#,
        class,
        event_type_label(event_type)
    )
}

fn event_rows(events: &[CalendarEvent], link_base: &str) -> String {
    if events.is_empty() {
        return r#"<tr><td colspan="4">No events.</td></tr>"#.to_string();
    }
    events
        .iter()
        .map(|event| {
            format!(
                r#"<tr>
                    <td><input type="checkbox" name="event_ids" value="{id}"></td>
                    <td>{badge}</td>
                    <td><a href="{link_base}/{id}">{title}</a></td>
                    <td>{when}</td>
                </tr>"#,
                id = event.id,
                badge = type_badge(&event.event_type),
                link_base = link_base,
                title = html_escape(if event.title.is_empty() {
                    "(untitled)"
                } else {
                    &event.title
                }),
                when = format_range(event.start_at, event.end_at),
            )
        })
        .collect()
}

fn load_events(conn: &mut PgConnection) -> QueryResult<Vec<CalendarEvent>> {
    calendar_events::table
        .order(calendar_events::start_at.desc())
        .load(conn)
}

fn type_options(selected: &str) -> String {
    [
        EventType::General,
        EventType::Company,
        EventType::Meeting,
        EventType::Leave,
    ]
    .iter()
    .map(|t| {
        format!(
            r#"<option value="{value}"{sel}>{label}</option>"#,
            value = t.as_str(),
            sel = if t.as_str() == selected { " selected" } else { "" },
            label = event_type_label(t.as_str()),
        )
    })
    .collect()
}

// Admin screen

pub async fn admin_calendar_page(
    State(state): State<Arc<AppState>>,
    Query(param): Query<StartParam>,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let events = load_events(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    // A clicked calendar day arrives as ?start=YYYY-MM-DD and pre-fills
    // the form at 09:00.
    let prefill = prefill_start(param.start.as_deref(), 9);
    let date_value = prefill
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let start_value = prefill
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "09:00".to_string());

    let body = format!(
        r#"<div class="card">
            <form method="post" action="/admin/calendar/add">
                <div class="form-row"><label>Date</label><input type="date" name="date" value="{date_value}"></div>
                <div class="form-row"><label>Start</label><input type="time" name="start_time" value="{start_value}"></div>
                <div class="form-row"><label>End</label><input type="time" name="end_time"></div>
                <div class="form-row"><label>Type</label><select name="event_type">{options}</select></div>
                <div class="form-row"><label>Title</label><input type="text" name="title" maxlength="200"></div>
                <button class="btn" type="submit">Add event</button>
            </form>
        </div>
        <table>
            <tr><th></th><th>Type</th><th>Title</th><th>When</th></tr>
            {rows}
        </table>"#,
        date_value = date_value,
        start_value = start_value,
        options = type_options(EventType::General.as_str()),
        rows = event_rows(&events, "/calendar/events"),
    );

    Ok(render_page(&state.config.site, "Calendar", &body))
}

/// Quick-add endpoint behind the admin calendar modal. A missing or
/// malformed date or start time aborts silently back to the calendar.
pub async fn admin_calendar_add(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<QuickAddForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let Some((start_at, end_at)) = parse_quick_add(&form) else {
        warn!("Discarded quick-add submission with unusable date or time");
        return Ok(Redirect::to("/admin/calendar"));
    };

    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let event_type = form
        .event_type
        .as_deref()
        .and_then(|raw| EventType::from_str(raw).ok())
        .unwrap_or(EventType::General);

    let created_by = authenticated_user(&headers, &mut conn);

    let event = CalendarEvent {
        id: Uuid::new_v4(),
        event_type: event_type.as_str().to_string(),
        title: normalize_title(event_type, form.title.as_deref().unwrap_or("")),
        description: String::new(),
        start_at,
        end_at,
        company_id: None,
        employee_id: None,
        created_by,
        created_at: Utc::now(),
    };

    diesel::insert_into(calendar_events::table)
        .values(&event)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Redirect::to("/admin/calendar"))
}

// Public screens

pub async fn calendar_page(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let events = load_events(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let body = format!(
        r#"<p style="margin-bottom: 12px;"><a href="/calendar/new">Add event</a></p>
        <table>
            <tr><th></th><th>Type</th><th>Title</th><th>When</th></tr>
            {rows}
        </table>"#,
        rows = event_rows(&events, "/calendar/events"),
    );

    Ok(render_page(&state.config.site, "Calendar", &body))
}

pub async fn event_detail_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let event: CalendarEvent = calendar_events::table
        .filter(calendar_events::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Event not found".to_string()))?;

    let company_name: Option<String> = match event.company_id {
        Some(company_id) => companies::table
            .filter(companies::id.eq(company_id))
            .select(companies::name)
            .first(&mut conn)
            .optional()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?,
        None => None,
    };

    let employee_name: Option<String> = match event.employee_id {
        Some(employee_id) => employees::table
            .inner_join(users::table)
            .filter(employees::id.eq(employee_id))
            .select(users::username)
            .first(&mut conn)
            .optional()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?,
        None => None,
    };

    let body = format!(
        r#"<div class="card">
            <div class="form-row">{badge}</div>
            <div class="form-row"><label>Title</label>{title}</div>
            <div class="form-row"><label>When</label>{when}</div>
            <div class="form-row"><label>Company</label>{company}</div>
            <div class="form-row"><label>Employee</label>{employee}</div>
            <div class="form-row"><label>Details</label>{description}</div>
        </div>
        <p><a href="/calendar">Back to calendar</a></p>"#,
        badge = type_badge(&event.event_type),
        title = html_escape(if event.title.is_empty() {
            "(untitled)"
        } else {
            &event.title
        }),
        when = format_range(event.start_at, event.end_at),
        company = html_escape(company_name.as_deref().unwrap_or("-")),
        employee = html_escape(employee_name.as_deref().unwrap_or("-")),
        description = html_escape(&event.description),
    );

    Ok(render_page(&state.config.site, "Event", &body))
}

fn company_options(conn: &mut PgConnection) -> QueryResult<String> {
    let rows: Vec<(Uuid, String)> = companies::table
        .order(companies::name.asc())
        .select((companies::id, companies::name))
        .load(conn)?;
    Ok(rows
        .iter()
        .map(|(id, name)| format!(r#"<option value="{id}">{}</option>"#, html_escape(name)))
        .collect())
}

fn employee_options(conn: &mut PgConnection) -> QueryResult<String> {
    let rows: Vec<(Uuid, String)> = employees::table
        .inner_join(users::table)
        .order(users::username.asc())
        .select((employees::id, users::username))
        .load(conn)?;
    Ok(rows
        .iter()
        .map(|(id, name)| format!(r#"<option value="{id}">{}</option>"#, html_escape(name)))
        .collect())
}

fn event_form_body(
    conn: &mut PgConnection,
    start_value: &str,
    error: Option<&str>,
) -> QueryResult<String> {
    let error_html = error
        .map(|e| format!(r#"<div class="error">{}</div>"#, html_escape(e)))
        .unwrap_or_default();

    Ok(format!(
        r#"{error_html}
        <div class="card">
            <form method="post" action="/calendar/new">
                <div class="form-row"><label>Type</label><select name="event_type">{options}</select></div>
                <div class="form-row"><label>Title</label><input type="text" name="title" maxlength="200"></div>
                <div class="form-row"><label>Details</label><textarea name="description" rows="3" cols="48"></textarea></div>
                <div class="form-row"><label>Start</label><input type="datetime-local" name="start_at" value="{start_value}"></div>
                <div class="form-row"><label>End</label><input type="datetime-local" name="end_at"></div>
                <div class="form-row"><label>Company</label><select name="company_id"><option value=""></option>{company_options}</select></div>
                <div class="form-row"><label>Employee</label><select name="employee_id"><option value=""></option>{employee_options}</select></div>
                <button class="btn" type="submit">Save</button>
            </form>
        </div>
        <p><a href="/calendar">Back to calendar</a></p>"#,
        error_html = error_html,
        options = type_options(EventType::General.as_str()),
        start_value = start_value,
        company_options = company_options(conn)?,
        employee_options = employee_options(conn)?,
    ))
}

pub async fn event_create_page(
    State(state): State<Arc<AppState>>,
    Query(param): Query<StartParam>,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    // Clicking a day on the public calendar pre-fills midnight of that day.
    let start_value = prefill_start(param.start.as_deref(), 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default();

    let body = event_form_body(&mut conn, &start_value, None)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(render_page(&state.config.site, "New event", &body))
}

pub async fn event_create_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<PublicEventForm>,
) -> Result<Response, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let event_type = EventType::from_str(&form.event_type).unwrap_or(EventType::General);
    let start_at = parse_datetime_local(&form.start_at);

    let Some(start_at) = start_at else {
        let body = event_form_body(&mut conn, &form.start_at, Some("Enter a valid start time."))
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;
        return Ok(render_page(&state.config.site, "New event", &body).into_response());
    };

    let end_at = form
        .end_at
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(parse_datetime_local);

    let created_by = authenticated_user(&headers, &mut conn);

    let event = CalendarEvent {
        id: Uuid::new_v4(),
        event_type: event_type.as_str().to_string(),
        title: normalize_title(event_type, form.title.as_deref().unwrap_or("")),
        description: form.description.unwrap_or_default(),
        start_at,
        end_at,
        company_id: parse_optional_id(&form.company_id),
        employee_id: parse_optional_id(&form.employee_id),
        created_by,
        created_at: Utc::now(),
    };

    diesel::insert_into(calendar_events::table)
        .values(&event)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Redirect::to("/calendar").into_response())
}

pub fn configure_calendar_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/calendar", get(admin_calendar_page))
        .route(
            "/admin/calendar/add",
            axum::routing::post(admin_calendar_add),
        )
        .route("/calendar", get(calendar_page))
        .route(
            "/calendar/new",
            get(event_create_page).post(event_create_submit),
        )
        .route("/calendar/events/:id", get(event_detail_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quick_add(date: Option<&str>, start: Option<&str>, end: Option<&str>) -> QuickAddForm {
        QuickAddForm {
            date: date.map(String::from),
            start_time: start.map(String::from),
            end_time: end.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_quick_add_full() {
        let form = quick_add(Some("2025-03-10"), Some("14:30"), Some("15:00"));
        let (start, end) = parse_quick_add(&form).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap());
        assert_eq!(
            end,
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_quick_add_requires_date_and_start() {
        assert!(parse_quick_add(&quick_add(None, Some("14:30"), None)).is_none());
        assert!(parse_quick_add(&quick_add(Some("2025-03-10"), None, None)).is_none());
        assert!(parse_quick_add(&quick_add(Some("not-a-date"), Some("14:30"), None)).is_none());
        assert!(parse_quick_add(&quick_add(Some("2025-03-10"), Some("25:99"), None)).is_none());
    }

    #[test]
    fn test_parse_quick_add_bad_end_only_drops_end() {
        let form = quick_add(Some("2025-03-10"), Some("14:30"), Some("nonsense"));
        let (_, end) = parse_quick_add(&form).unwrap();
        assert!(end.is_none());
    }

    #[test]
    fn test_prefill_start_hours() {
        assert_eq!(
            prefill_start(Some("2025-12-09"), 9),
            Some(Utc.with_ymd_and_hms(2025, 12, 9, 9, 0, 0).unwrap())
        );
        assert_eq!(
            prefill_start(Some("2025-12-09"), 0),
            Some(Utc.with_ymd_and_hms(2025, 12, 9, 0, 0, 0).unwrap())
        );
        assert_eq!(prefill_start(Some("12/09/2025"), 9), None);
        assert_eq!(prefill_start(None, 9), None);
    }

    #[test]
    fn test_parse_datetime_local() {
        assert_eq!(
            parse_datetime_local("2025-01-06T09:00"),
            Some(Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime_local("2025-01-06"), None);
    }

    #[test]
    fn test_parse_optional_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_optional_id(&Some(id.to_string())), Some(id));
        assert_eq!(parse_optional_id(&Some(String::new())), None);
        assert_eq!(parse_optional_id(&Some("garbage".to_string())), None);
        assert_eq!(parse_optional_id(&None), None);
    }
}
