pub mod ui;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::authenticated_user;
use crate::requests::CompanyRequest;
use crate::shared::schema::{companies, company_memos, company_requests, company_sites, company_tags};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = companies)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub memo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Website and registration metadata for one company.
///
/// `admin_id` / `admin_pw` are stored as plain text. The weakness is
/// inherited from the data this system was built around and is recorded in
/// DESIGN.md instead of being silently hidden.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = company_sites)]
pub struct CompanySite {
    pub id: Uuid,
    pub company_id: Uuid,
    pub domain: String,
    pub admin_url: String,
    pub admin_id: String,
    pub admin_pw: String,
    pub hosting_company: String,
    pub hosting_expire_at: Option<NaiveDate>,
    pub domain_registrar: String,
    pub domain_expire_at: Option<NaiveDate>,
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = company_tags)]
pub struct CompanyTag {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = company_memos)]
pub struct CompanyMemo {
    pub id: Uuid,
    pub company_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SiteInput {
    pub domain: Option<String>,
    pub admin_url: Option<String>,
    pub admin_id: Option<String>,
    pub admin_pw: Option<String>,
    pub hosting_company: Option<String>,
    pub hosting_expire_at: Option<NaiveDate>,
    pub domain_registrar: Option<String>,
    pub domain_expire_at: Option<NaiveDate>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddTagRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemoRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A company with every owned record attached, for detail screens.
#[derive(Debug, Serialize)]
pub struct CompanyDetail {
    pub company: Company,
    pub site: Option<CompanySite>,
    pub tags: Vec<CompanyTag>,
    pub memos: Vec<CompanyMemo>,
}

pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Company>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let limit = query.limit.unwrap_or(100);
    let offset = query.offset.unwrap_or(0);

    let mut q = companies::table.into_boxed();

    if let Some(search) = query.search {
        let pattern = format!("%{search}%");
        q = q.filter(
            companies::name
                .ilike(pattern.clone())
                .or(companies::memo.ilike(pattern)),
        );
    }

    let rows: Vec<Company> = q
        .order(companies::name.asc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub async fn create_company(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<Json<Company>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let now = Utc::now();
    let company = Company {
        id: Uuid::new_v4(),
        name: req.name,
        memo: req.memo.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(companies::table)
        .values(&company)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    info!("Created company {}", company.name);
    Ok(Json(company))
}

pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyDetail>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let company: Company = companies::table
        .filter(companies::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Company not found".to_string()))?;

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

    let memos: Vec<CompanyMemo> = company_memos::table
        .filter(company_memos::company_id.eq(id))
        .order(company_memos::created_at.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(CompanyDetail {
        company,
        site,
        tags,
        memos,
    }))
}

pub async fn update_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<Company>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let now = Utc::now();

    diesel::update(companies::table.filter(companies::id.eq(id)))
        .set(companies::updated_at.eq(now))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    if let Some(name) = req.name {
        diesel::update(companies::table.filter(companies::id.eq(id)))
            .set(companies::name.eq(name))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    if let Some(memo) = req.memo {
        diesel::update(companies::table.filter(companies::id.eq(id)))
            .set(companies::memo.eq(memo))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    let company: Company = companies::table
        .filter(companies::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Company not found".to_string()))?;

    Ok(Json(company))
}

/// Delete a company. Tags, memos, the site record and requests go with it;
/// calendar events only lose their company link (schema referential
/// actions).
pub async fn delete_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let deleted = diesel::delete(companies::table.filter(companies::id.eq(id)))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete error: {e}")))?;

    if deleted == 0 {
        return Err((StatusCode::NOT_FOUND, "Company not found".to_string()));
    }

    info!("Deleted company {id}");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanySite>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let site: CompanySite = company_sites::table
        .filter(company_sites::company_id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Site not found".to_string()))?;

    Ok(Json(site))
}

/// Create or replace the single site record of a company.
pub async fn upsert_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SiteInput>,
) -> Result<Json<CompanySite>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    companies::table
        .filter(companies::id.eq(id))
        .select(companies::id)
        .first::<Uuid>(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Company not found".to_string()))?;

    let site = CompanySite {
        id: Uuid::new_v4(),
        company_id: id,
        domain: req.domain.unwrap_or_default(),
        admin_url: req.admin_url.unwrap_or_default(),
        admin_id: req.admin_id.unwrap_or_default(),
        admin_pw: req.admin_pw.unwrap_or_default(),
        hosting_company: req.hosting_company.unwrap_or_default(),
        hosting_expire_at: req.hosting_expire_at,
        domain_registrar: req.domain_registrar.unwrap_or_default(),
        domain_expire_at: req.domain_expire_at,
        memo: req.memo.unwrap_or_default(),
    };

    diesel::insert_into(company_sites::table)
        .values(&site)
        .on_conflict(company_sites::company_id)
        .do_update()
        .set((
            company_sites::domain.eq(&site.domain),
            company_sites::admin_url.eq(&site.admin_url),
            company_sites::admin_id.eq(&site.admin_id),
            company_sites::admin_pw.eq(&site.admin_pw),
            company_sites::hosting_company.eq(&site.hosting_company),
            company_sites::hosting_expire_at.eq(site.hosting_expire_at),
            company_sites::domain_registrar.eq(&site.domain_registrar),
            company_sites::domain_expire_at.eq(site.domain_expire_at),
            company_sites::memo.eq(&site.memo),
        ))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Upsert error: {e}")))?;

    let stored: CompanySite = company_sites::table
        .filter(company_sites::company_id.eq(id))
        .first(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(stored))
}

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CompanyTag>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let tags: Vec<CompanyTag> = company_tags::table
        .filter(company_tags::company_id.eq(id))
        .order(company_tags::name.asc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(tags))
}

pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddTagRequest>,
) -> Result<Json<CompanyTag>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let tag = CompanyTag {
        id: Uuid::new_v4(),
        company_id: id,
        name: req.name,
    };

    diesel::insert_into(company_tags::table)
        .values(&tag)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    diesel::delete(
        company_tags::table
            .filter(company_tags::id.eq(tag_id))
            .filter(company_tags::company_id.eq(id)),
    )
    .execute(&mut conn)
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete error: {e}")))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_memos(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CompanyMemo>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let memos: Vec<CompanyMemo> = company_memos::table
        .filter(company_memos::company_id.eq(id))
        .order(company_memos::created_at.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(memos))
}

/// Record a consultation memo. The author is the authenticated caller when
/// one is present, otherwise the memo is anonymous.
pub async fn add_memo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<AddMemoRequest>,
) -> Result<Json<CompanyMemo>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let author_id = authenticated_user(&headers, &mut conn);

    let memo = CompanyMemo {
        id: Uuid::new_v4(),
        company_id: id,
        author_id,
        content: req.content,
        created_at: Utc::now(),
    };

    diesel::insert_into(company_memos::table)
        .values(&memo)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(memo))
}

pub async fn list_company_requests(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CompanyRequest>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let rows: Vec<CompanyRequest> = company_requests::table
        .filter(company_requests::company_id.eq(id))
        .order(company_requests::requested_at.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub fn configure_companies_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/companies", get(list_companies).post(create_company))
        .route(
            "/api/companies/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route("/api/companies/:id/site", get(get_site).put(upsert_site))
        .route("/api/companies/:id/tags", get(list_tags).post(add_tag))
        .route("/api/companies/:id/tags/:tag_id", delete(delete_tag))
        .route("/api/companies/:id/memos", get(list_memos).post(add_memo))
        .route("/api/companies/:id/requests", get(list_company_requests))
}
