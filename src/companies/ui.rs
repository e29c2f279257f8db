//! Server-rendered company screens for operators.
//!
//! Both pages carry the expiration banner so a lapsing hosting or domain
//! registration is visible wherever an operator happens to be working.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::alerts::{current_alerts, ExpirationAlert};
use crate::calendar::CalendarEvent;
use crate::companies::{Company, CompanySite, CompanyTag};
use crate::config::SiteConfig;
use crate::requests::CompanyRequest;
use crate::shared::schema::{
    calendar_events, companies, company_memos, company_sites, company_tags, company_requests,
    users,
};
use crate::shared::state::AppState;
use crate::shared::utils::html_escape;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
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
        h2 {{ font-size: 17px; color: #1a1a1a; margin: 20px 0 10px; }}
        table {{ width: 100%; border-collapse: collapse; background: white; border-radius: 8px; overflow: hidden; }}
        th, td {{ padding: 10px 12px; text-align: left; border-bottom: 1px solid #eee; font-size: 14px; }}
        th {{ background: #fafafa; color: #666; font-weight: 500; }}
        .alert-banner {{ background: #fff3e0; border: 1px solid #ffb74d; border-radius: 8px; padding: 12px 16px; margin-bottom: 20px; }}
        .alert-banner strong {{ color: #ef6c00; }}
        .alert-row {{ font-size: 13px; padding: 3px 0; }}
        .dday {{ font-weight: 600; }}
        .tag {{ display: inline-block; background: #e3f2fd; color: #1565c0; border-radius: 10px; padding: 2px 8px; font-size: 12px; margin-right: 4px; }}
        .card {{ background: white; border-radius: 8px; padding: 20px; margin-bottom: 16px; }}
        .field {{ margin-bottom: 6px; font-size: 14px; }}
        .field label {{ display: inline-block; min-width: 130px; color: #666; }}
        .memo {{ border-bottom: 1px solid #f0f0f0; padding: 8px 0; font-size: 14px; }}
        .memo-meta {{ color: #999; font-size: 12px; }}
        .searchbox {{ margin-bottom: 16px; }}
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

/// The banner shown on every company screen. Each row links to the owning
/// company's admin page.
fn alert_banner(alerts: &[ExpirationAlert]) -> String {
    if alerts.is_empty() {
        return String::new();
    }
    let rows: String = alerts
        .iter()
        .map(|alert| {
            format!(
                r#"<div class="alert-row"><a href="/admin/companies/{company_id}">{company}</a> {kind} expires {date} <span class="dday">{dday}</span></div>"#,
                company_id = alert.company_id,
                company = html_escape(&alert.company),
                kind = alert.kind.as_str(),
                date = alert.date.format("%Y-%m-%d"),
                dday = html_escape(&alert.dday),
            )
        })
        .collect();
    format!(
        r#"<div class="alert-banner"><strong>Expiring soon</strong>{rows}</div>"#,
        rows = rows
    )
}

fn tag_chips(tags: &[CompanyTag]) -> String {
    tags.iter()
        .map(|tag| format!(r#"<span class="tag">#{}</span>"#, html_escape(&tag.name)))
        .collect()
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

pub async fn companies_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let alerts = current_alerts(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let mut q = companies::table
        .left_join(company_sites::table)
        .into_boxed();

    if let Some(search) = &query.q {
        let pattern = format!("%{search}%");
        q = q.filter(
            companies::name
                .ilike(pattern.clone())
                .or(companies::memo.ilike(pattern)),
        );
    }

    let rows: Vec<(Uuid, String, Option<String>)> = q
        .order(companies::name.asc())
        .select((
            companies::id,
            companies::name,
            company_sites::domain.nullable(),
        ))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let tags: Vec<CompanyTag> = company_tags::table
        .order(company_tags::name.asc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let mut tags_by_company: HashMap<Uuid, Vec<CompanyTag>> = HashMap::new();
    for tag in tags {
        tags_by_company.entry(tag.company_id).or_default().push(tag);
    }

    let table_rows: String = if rows.is_empty() {
        r#"<tr><td colspan="3">No companies.</td></tr>"#.to_string()
    } else {
        rows.iter()
            .map(|(id, name, domain)| {
                let chips = tags_by_company
                    .get(id)
                    .map(|tags| tag_chips(tags))
                    .unwrap_or_default();
                format!(
                    r#"<tr>
                        <td><a href="/admin/companies/{id}">{name}</a></td>
                        <td>{domain}</td>
                        <td>{chips}</td>
                    </tr>"#,
                    id = id,
                    name = html_escape(name),
                    domain = html_escape(domain.as_deref().unwrap_or("-")),
                    chips = chips,
                )
            })
            .collect()
    };

    let body = format!(
        r#"{banner}
        <form class="searchbox" method="get" action="/admin/companies">
            <input type="text" name="q" placeholder="Search companies" value="{q}">
            <button type="submit">Search</button>
        </form>
        <table>
            <tr><th>Company</th><th>Domain</th><th>Tags</th></tr>
            {rows}
        </table>"#,
        banner = alert_banner(&alerts),
        q = html_escape(query.q.as_deref().unwrap_or("")),
        rows = table_rows,
    );

    Ok(render_page(&state.config.site, "Companies", &body))
}

fn site_card(site: &CompanySite) -> String {
    format!(
        r#"<div class="card">
            <div class="field"><label>Domain</label>{domain}</div>
            <div class="field"><label>Admin URL</label>{admin_url}</div>
            <div class="field"><label>Hosting company</label>{hosting_company}</div>
            <div class="field"><label>Hosting expires</label>{hosting_expire}</div>
            <div class="field"><label>Domain registrar</label>{registrar}</div>
            <div class="field"><label>Domain expires</label>{domain_expire}</div>
            <div class="field"><label>Memo</label>{memo}</div>
        </div>"#,
        domain = html_escape(&site.domain),
        admin_url = html_escape(&site.admin_url),
        hosting_company = html_escape(&site.hosting_company),
        hosting_expire = site
            .hosting_expire_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
        registrar = html_escape(&site.domain_registrar),
        domain_expire = site
            .domain_expire_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
        memo = html_escape(&site.memo),
    )
}

pub async fn company_detail_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let company: Company = companies::table
        .filter(companies::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Company not found".to_string()))?;

    let alerts = current_alerts(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let site: Option<CompanySite> = company_sites::table
        .filter(company_sites::company_id.eq(id))
        .first(&mut conn)
        .optional()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let tags: Vec<CompanyTag> = company_tags::table
        .filter(company_tags::company_id.eq(id))
        .order(company_tags::name.asc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let events: Vec<CalendarEvent> = calendar_events::table
        .filter(calendar_events::company_id.eq(id))
        .order(calendar_events::start_at.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let memos: Vec<(String, Option<String>, DateTime<Utc>)> = company_memos::table
        .left_join(users::table)
        .filter(company_memos::company_id.eq(id))
        .order(company_memos::created_at.desc())
        .select((
            company_memos::content,
            users::username.nullable(),
            company_memos::created_at,
        ))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let requests: Vec<CompanyRequest> = company_requests::table
        .filter(company_requests::company_id.eq(id))
        .order(company_requests::requested_at.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let event_rows: String = if events.is_empty() {
        r#"<tr><td colspan="3">No linked events.</td></tr>"#.to_string()
    } else {
        events
            .iter()
            .map(|event| {
                format!(
                    r#"<tr>
                        <td>{event_type}</td>
                        <td><a href="/calendar/events/{id}">{title}</a></td>
                        <td>{when}</td>
                    </tr>"#,
                    event_type = html_escape(&event.event_type),
                    id = event.id,
                    title = html_escape(if event.title.is_empty() {
                        "(untitled)"
                    } else {
                        &event.title
                    }),
                    when = format_range(event.start_at, event.end_at),
                )
            })
            .collect()
    };

    let memo_rows: String = if memos.is_empty() {
        "<div class=\"memo\">No consultation memos.</div>".to_string()
    } else {
        memos
            .iter()
            .map(|(content, author, created_at)| {
                format!(
                    r#"<div class="memo">
                        <div class="memo-meta">{created} · {author}</div>
                        {content}
                    </div>"#,
                    created = created_at.format("%Y-%m-%d %H:%M"),
                    author = html_escape(author.as_deref().unwrap_or("(deleted account)")),
                    content = html_escape(content),
                )
            })
            .collect()
    };

    let request_rows: String = if requests.is_empty() {
        r#"<tr><td colspan="3">No requests.</td></tr>"#.to_string()
    } else {
        requests
            .iter()
            .map(|request| {
                format!(
                    r#"<tr>
                        <td>{title}</td>
                        <td>{status}</td>
                        <td>{requested}</td>
                    </tr>"#,
                    title = html_escape(&request.title),
                    status = html_escape(&request.status),
                    requested = request.requested_at.format("%Y-%m-%d"),
                )
            })
            .collect()
    };

    let site_html = site
        .as_ref()
        .map(site_card)
        .unwrap_or_else(|| "<div class=\"card\">No site record.</div>".to_string());

    let body = format!(
        r#"{banner}
        <div class="card">
            <div class="field"><label>Name</label>{name}</div>
            <div class="field"><label>Memo</label>{memo}</div>
            <div class="field"><label>Tags</label>{chips}</div>
        </div>
        <h2>Site</h2>
        {site_html}
        <h2>Linked events</h2>
        <table><tr><th>Type</th><th>Title</th><th>When</th></tr>{event_rows}</table>
        <h2>Requests</h2>
        <table><tr><th>Title</th><th>Status</th><th>Requested</th></tr>{request_rows}</table>
        <h2>Consultation memos</h2>
        <div class="card">{memo_rows}</div>
        <p><a href="/admin/companies">Back to companies</a></p>"#,
        banner = alert_banner(&alerts),
        name = html_escape(&company.name),
        memo = html_escape(&company.memo),
        chips = tag_chips(&tags),
        site_html = site_html,
        event_rows = event_rows,
        request_rows = request_rows,
        memo_rows = memo_rows,
    );

    Ok(render_page(&state.config.site, &company.name, &body))
}

pub fn configure_companies_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/companies", get(companies_page))
        .route("/admin/companies/:id", get(company_detail_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use chrono::NaiveDate;

    #[test]
    fn test_alert_banner_empty_renders_nothing() {
        assert_eq!(alert_banner(&[]), "");
    }

    #[test]
    fn test_alert_banner_links_to_company() {
        let company_id = Uuid::new_v4();
        let alerts = vec![ExpirationAlert {
            company: "Acme".to_string(),
            kind: AlertKind::Hosting,
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            dday: "D-10".to_string(),
            company_id,
        }];
        let html = alert_banner(&alerts);
        assert!(html.contains(&format!("/admin/companies/{company_id}")));
        assert!(html.contains("D-10"));
        assert!(html.contains("hosting"));
    }

    #[test]
    fn test_tag_chips_escape_labels() {
        let tags = vec![CompanyTag {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "<script>".to_string(),
        }];
        let html = tag_chips(&tags);
        assert!(html.contains("#&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
