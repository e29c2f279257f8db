//! Expiration alerts for hosting and domain registrations.
//!
//! A site is flagged when its expiry date falls within the next 30 days.
//! There is deliberately no lower bound, so sites whose registration already
//! lapsed stay flagged until the date is updated or cleared.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{companies, company_sites};
use crate::shared::state::AppState;

/// Lookahead horizon in days.
pub const ALERT_HORIZON_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Hosting,
    Domain,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Hosting => "hosting",
            AlertKind::Domain => "domain",
        }
    }
}

/// The expiry columns of one site row, as fed into [`scan`].
#[derive(Debug, Clone, Queryable)]
pub struct SiteExpiry {
    pub company_id: Uuid,
    pub company: String,
    pub hosting_expire_at: Option<NaiveDate>,
    pub domain_expire_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpirationAlert {
    pub company: String,
    pub kind: AlertKind,
    pub date: NaiveDate,
    pub dday: String,
    pub company_id: Uuid,
}

/// Countdown label for an expiry date: `D-3`, `D-DAY`, `D+12 (expired)`.
pub fn dday_label(expire: NaiveDate, today: NaiveDate) -> String {
    let days = (expire - today).num_days();
    if days > 0 {
        format!("D-{days}")
    } else if days == 0 {
        "D-DAY".to_string()
    } else {
        format!("D+{} (expired)", -days)
    }
}

/// Scan site rows for upcoming or lapsed expirations.
///
/// Two passes over the input: hosting dates first, then domain dates. The
/// output is not merged by date; within a pass alerts keep the input row
/// order.
pub fn scan(sites: &[SiteExpiry], today: NaiveDate) -> Vec<ExpirationAlert> {
    let soon = today + Duration::days(ALERT_HORIZON_DAYS);
    let mut alerts = Vec::new();

    for site in sites {
        if let Some(expire) = site.hosting_expire_at {
            if expire <= soon {
                alerts.push(ExpirationAlert {
                    company: site.company.clone(),
                    kind: AlertKind::Hosting,
                    date: expire,
                    dday: dday_label(expire, today),
                    company_id: site.company_id,
                });
            }
        }
    }

    for site in sites {
        if let Some(expire) = site.domain_expire_at {
            if expire <= soon {
                alerts.push(ExpirationAlert {
                    company: site.company.clone(),
                    kind: AlertKind::Domain,
                    date: expire,
                    dday: dday_label(expire, today),
                    company_id: site.company_id,
                });
            }
        }
    }

    alerts
}

/// Load every site's expiry columns and scan them against today's date.
pub fn current_alerts(conn: &mut PgConnection) -> QueryResult<Vec<ExpirationAlert>> {
    let sites: Vec<SiteExpiry> = company_sites::table
        .inner_join(companies::table)
        .order(companies::name.asc())
        .select((
            companies::id,
            companies::name,
            company_sites::hosting_expire_at,
            company_sites::domain_expire_at,
        ))
        .load(conn)?;

    Ok(scan(&sites, Utc::now().date_naive()))
}

pub async fn list_expiration_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExpirationAlert>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let alerts = current_alerts(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(alerts))
}

pub fn configure_alerts_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/alerts/expirations", get(list_expiration_alerts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn site(
        company: &str,
        hosting: Option<NaiveDate>,
        domain: Option<NaiveDate>,
    ) -> SiteExpiry {
        SiteExpiry {
            company_id: Uuid::new_v4(),
            company: company.to_string(),
            hosting_expire_at: hosting,
            domain_expire_at: domain,
        }
    }

    #[test]
    fn test_dday_label_future() {
        assert_eq!(dday_label(date(2025, 1, 11), date(2025, 1, 1)), "D-10");
        assert_eq!(dday_label(date(2025, 1, 2), date(2025, 1, 1)), "D-1");
    }

    #[test]
    fn test_dday_label_today() {
        assert_eq!(dday_label(date(2025, 1, 1), date(2025, 1, 1)), "D-DAY");
    }

    #[test]
    fn test_dday_label_expired() {
        assert_eq!(
            dday_label(date(2024, 12, 20), date(2025, 1, 1)),
            "D+12 (expired)"
        );
    }

    #[test]
    fn test_scan_selects_within_horizon() {
        let today = date(2025, 1, 1);
        let sites = vec![
            site("inside", Some(date(2025, 1, 31)), None),
            site("boundary", Some(date(2025, 1, 31)), None),
            site("outside", Some(date(2025, 2, 1)), None),
            site("blank", None, None),
        ];
        let alerts = scan(&sites, today);
        let names: Vec<&str> = alerts.iter().map(|a| a.company.as_str()).collect();
        assert_eq!(names, vec!["inside", "boundary"]);
    }

    #[test]
    fn test_scan_keeps_expired_sites_flagged() {
        let today = date(2025, 1, 1);
        let sites = vec![site("old", Some(date(2020, 6, 1)), None)];
        let alerts = scan(&sites, today);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].dday.ends_with("(expired)"));
    }

    #[test]
    fn test_scan_hosting_pass_precedes_domain_pass() {
        let today = date(2025, 1, 1);
        let sites = vec![
            site("a", Some(date(2025, 1, 20)), Some(date(2025, 1, 2))),
            site("b", None, Some(date(2025, 1, 5))),
        ];
        let alerts = scan(&sites, today);
        let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![AlertKind::Hosting, AlertKind::Domain, AlertKind::Domain]
        );
        // Domain alerts are not re-sorted by date, they keep row order.
        assert_eq!(alerts[1].company, "a");
        assert_eq!(alerts[2].company, "b");
    }

    #[test]
    fn test_scan_one_site_can_raise_both_kinds() {
        let today = date(2025, 1, 1);
        let sites = vec![site("dual", Some(date(2025, 1, 3)), Some(date(2025, 1, 4)))];
        let alerts = scan(&sites, today);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::Hosting);
        assert_eq!(alerts[1].kind, AlertKind::Domain);
    }
}
