//! Site administration API handlers

use crate::api::{MessageResponse, PaginatedResponse, PaginationQuery, SuccessResponse};
use crate::domain::{CreateSiteInput, StringUuid, UpdateSiteInput};
use crate::error::Result;
use crate::repository::DomainRepository;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// List sites
pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let (sites, total) = state
        .site_service
        .list(pagination.page, pagination.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        sites,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get site by ID
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let site = state.site_service.get(StringUuid(id)).await?;
    Ok(Json(SuccessResponse::new(site)))
}

/// Create a site with its group and canonical domain
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateSiteInput>,
) -> Result<impl IntoResponse> {
    let site = state.site_service.create_site(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(site))))
}

/// Update a site's name and subdomain
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSiteInput>,
) -> Result<impl IntoResponse> {
    let site = state.site_service.update_site(StringUuid(id), input).await?;
    Ok(Json(SuccessResponse::new(site)))
}

/// Archive (soft-delete) a site
pub async fn archive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.site_service.archive_site(StringUuid(id)).await?;
    Ok(Json(MessageResponse::new("Site archived successfully")))
}

#[derive(Debug, Deserialize)]
pub struct AddDomainInput {
    pub domain: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_canonical: bool,
}

/// Attach an additional domain to a site
pub async fn add_domain(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AddDomainInput>,
) -> Result<impl IntoResponse> {
    let domain = state
        .site_service
        .add_domain(
            StringUuid(id),
            &input.domain,
            input.is_primary,
            input.is_canonical,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(domain))))
}

/// List a site's domains
pub async fn list_domains(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let domains = state.domain_repo.list_for_site(StringUuid(id)).await?;
    Ok(Json(SuccessResponse::new(domains)))
}

/// List a site's configuration variables
pub async fn list_vars(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let vars = state.sitevar_service.list(StringUuid(id)).await?;
    Ok(Json(SuccessResponse::new(vars)))
}

#[derive(Debug, Deserialize)]
pub struct SetVarInput {
    pub value: String,
}

/// Set (upsert) a site configuration variable
pub async fn set_var(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
    Json(input): Json<SetVarInput>,
) -> Result<impl IntoResponse> {
    let var = state
        .sitevar_service
        .set_value(StringUuid(id), &name, &input.value)
        .await?;
    Ok(Json(SuccessResponse::new(var)))
}

/// Delete a site configuration variable
pub async fn delete_var(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse> {
    state.sitevar_service.delete(StringUuid(id), &name).await?;
    Ok(Json(MessageResponse::new("Variable deleted successfully")))
}
