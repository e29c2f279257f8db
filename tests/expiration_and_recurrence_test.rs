//! End-to-end checks of the two derived computations against the behavior
//! operators rely on: the 30-day expiration scan and the weekly repeat
//! action.

use backoffice::alerts::{dday_label, scan, AlertKind, SiteExpiry};
use backoffice::calendar::{weekly_copies, CalendarEvent, EventType, LEAVE_TITLE};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn alerts_cover_the_documented_examples() {
    let today = date(2025, 1, 1);
    assert_eq!(dday_label(date(2025, 1, 1), today), "D-DAY");
    assert_eq!(dday_label(date(2025, 1, 11), today), "D-10");
    assert_eq!(dday_label(date(2024, 12, 20), today), "D+12 (expired)");
}

#[test]
fn scan_is_inclusive_at_the_horizon_and_unbounded_below() {
    let today = date(2025, 1, 1);
    let horizon = date(2025, 1, 31);
    let sites = vec![
        SiteExpiry {
            company_id: Uuid::new_v4(),
            company: "at-horizon".to_string(),
            hosting_expire_at: Some(horizon),
            domain_expire_at: None,
        },
        SiteExpiry {
            company_id: Uuid::new_v4(),
            company: "past-horizon".to_string(),
            hosting_expire_at: Some(horizon + Duration::days(1)),
            domain_expire_at: None,
        },
        SiteExpiry {
            company_id: Uuid::new_v4(),
            company: "long-expired".to_string(),
            hosting_expire_at: Some(date(2019, 1, 1)),
            domain_expire_at: None,
        },
    ];

    let alerts = scan(&sites, today);
    let names: Vec<&str> = alerts.iter().map(|a| a.company.as_str()).collect();
    assert_eq!(names, vec!["at-horizon", "long-expired"]);
}

#[test]
fn scan_emits_hosting_before_domain() {
    let today = date(2025, 1, 1);
    let sites = vec![SiteExpiry {
        company_id: Uuid::new_v4(),
        company: "both".to_string(),
        hosting_expire_at: Some(date(2025, 1, 20)),
        domain_expire_at: Some(date(2025, 1, 5)),
    }];

    let alerts = scan(&sites, today);
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].kind, AlertKind::Hosting);
    assert_eq!(alerts[1].kind, AlertKind::Domain);
}

#[test]
fn weekly_repeat_produces_ten_shifted_copies() {
    let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
    let source = CalendarEvent {
        id: Uuid::new_v4(),
        event_type: EventType::Leave.as_str().to_string(),
        title: LEAVE_TITLE.to_string(),
        description: String::new(),
        start_at: start,
        end_at: Some(end),
        company_id: Some(Uuid::new_v4()),
        employee_id: Some(Uuid::new_v4()),
        created_by: None,
        created_at: Utc::now(),
    };

    let copies = weekly_copies(&source, Utc::now());
    assert_eq!(copies.len(), 10);

    let expected_firsts = [
        Utc.with_ymd_and_hms(2025, 1, 13, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 27, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 2, 3, 9, 0, 0).unwrap(),
    ];
    for (copy, expected) in copies.iter().zip(expected_firsts) {
        assert_eq!(copy.start_at, expected);
    }

    for (i, copy) in copies.iter().enumerate() {
        let shift = Duration::days(7 * (i as i64 + 1));
        assert_eq!(copy.end_at, Some(end + shift));
        assert_eq!(copy.event_type, source.event_type);
        assert_eq!(copy.title, source.title);
        assert_eq!(copy.company_id, source.company_id);
        assert_eq!(copy.employee_id, source.employee_id);
    }
}
