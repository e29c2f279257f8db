//! Service requests raised by companies and worked by employees.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::schema::company_requests;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "DOING")]
    Doing,
    #[serde(rename = "DONE")]
    Done,
}

#[derive(Debug, Error)]
#[error("unknown request status: {0}")]
pub struct ParseStatusError(String);

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "OPEN",
            RequestStatus::Doing => "DOING",
            RequestStatus::Done => "DONE",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(RequestStatus::Open),
            "DOING" => Ok(RequestStatus::Doing),
            "DONE" => Ok(RequestStatus::Done),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = company_requests)]
pub struct CompanyRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestRequest {
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub company_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// The completion timestamp matching a status value: set when the work is
/// DONE, cleared otherwise.
pub fn completed_at_for(status: RequestStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match status {
        RequestStatus::Done => Some(now),
        _ => None,
    }
}

pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CompanyRequest>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let limit = query.limit.unwrap_or(100);
    let offset = query.offset.unwrap_or(0);

    let mut q = company_requests::table.into_boxed();

    if let Some(status) = query.status {
        RequestStatus::from_str(&status)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        q = q.filter(company_requests::status.eq(status));
    }

    if let Some(company_id) = query.company_id {
        q = q.filter(company_requests::company_id.eq(company_id));
    }

    if let Some(assignee_id) = query.assignee_id {
        q = q.filter(company_requests::assignee_id.eq(assignee_id));
    }

    if let Some(search) = query.search {
        let pattern = format!("%{search}%");
        q = q.filter(
            company_requests::title
                .ilike(pattern.clone())
                .or(company_requests::description.ilike(pattern)),
        );
    }

    let rows: Vec<CompanyRequest> = q
        .order(company_requests::requested_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRequestRequest>,
) -> Result<Json<CompanyRequest>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let request = CompanyRequest {
        id: Uuid::new_v4(),
        company_id: req.company_id,
        assignee_id: req.assignee_id,
        title: req.title,
        description: req.description.unwrap_or_default(),
        status: RequestStatus::Open.as_str().to_string(),
        requested_at: Utc::now(),
        completed_at: None,
    };

    diesel::insert_into(company_requests::table)
        .values(&request)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(request))
}

pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyRequest>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let request: CompanyRequest = company_requests::table
        .filter(company_requests::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Request not found".to_string()))?;

    Ok(Json(request))
}

pub async fn update_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRequestRequest>,
) -> Result<Json<CompanyRequest>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    if let Some(title) = req.title {
        diesel::update(company_requests::table.filter(company_requests::id.eq(id)))
            .set(company_requests::title.eq(title))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(description) = req.description {
        diesel::update(company_requests::table.filter(company_requests::id.eq(id)))
            .set(company_requests::description.eq(description))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(assignee_id) = req.assignee_id {
        diesel::update(company_requests::table.filter(company_requests::id.eq(id)))
            .set(company_requests::assignee_id.eq(assignee_id))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    get_request(State(state), Path(id)).await
}

/// Move a request through OPEN / DOING / DONE. The completion timestamp
/// follows the status: stamped on DONE, cleared when the request is
/// reopened.
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<CompanyRequest>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let status = RequestStatus::from_str(&req.status)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let now = Utc::now();

    diesel::update(company_requests::table.filter(company_requests::id.eq(id)))
        .set((
            company_requests::status.eq(status.as_str()),
            company_requests::completed_at.eq(completed_at_for(status, now)),
        ))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    get_request(State(state), Path(id)).await
}

pub async fn delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    diesel::delete(company_requests::table.filter(company_requests::id.eq(id)))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete error: {e}")))?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_requests_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/requests", get(list_requests).post(create_request))
        .route(
            "/api/requests/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/api/requests/:id/status", put(change_status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["OPEN", "DOING", "DONE"] {
            assert_eq!(RequestStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_status_rejects_unknown() {
        assert!(RequestStatus::from_str("CLOSED").is_err());
        assert!(RequestStatus::from_str("open").is_err());
    }

    #[test]
    fn test_completed_at_follows_status() {
        let now = Utc::now();
        assert_eq!(completed_at_for(RequestStatus::Done, now), Some(now));
        assert_eq!(completed_at_for(RequestStatus::Open, now), None);
        assert_eq!(completed_at_for(RequestStatus::Doing, now), None);
    }
}
