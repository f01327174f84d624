//! Company handlers and case-company links.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{ApiResult, CreatedResult, accessible_case, created, ok};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::{ApiJson, ApiQuery, IdPairPath, IdPath};
use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{
    CompanyListParams, CreateCompanyRequest, LinkCompanyParams, MessageResponse,
    parse_limit_param, parse_text_param,
};
use crate::db::{CaseCompanyRecord, CompanyQuery, CompanyRecord, CreateCompanyParams};
use crate::error::ApiError;
use crate::practice::joins::{self, CaseCompanyView};

pub async fn companies_list_handler(
    State(state): State<Arc<GatewayState>>,
    ApiQuery(params): ApiQuery<CompanyListParams>,
) -> ApiResult<Vec<CompanyRecord>> {
    let query = CompanyQuery {
        company_type: parse_text_param(params.company_type),
        search: parse_text_param(params.search),
        limit: parse_limit_param(params.limit.as_deref(), &state.page_limits)?,
    };
    Ok(ok(state.store.list_companies(&query).await?))
}

pub async fn companies_get_handler(
    State(state): State<Arc<GatewayState>>,
    IdPath(id): IdPath,
) -> ApiResult<CompanyRecord> {
    let company = state
        .store
        .get_company(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company"))?;
    Ok(ok(company))
}

pub async fn companies_create_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateCompanyRequest>,
) -> CreatedResult<CompanyRecord> {
    state.access.create_company(&actor)?;
    let params = CreateCompanyParams::try_from(req)?;
    let company = state.store.create_company(&params).await?;
    tracing::info!(company_id = company.id, by = actor.id, "Company created");
    Ok(created(company))
}

/// Path is `/api/companies/{id}/cases/{case_id}`. The case is checked first.
pub async fn company_link_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPairPath(company_id, case_id): IdPairPath,
    ApiQuery(params): ApiQuery<LinkCompanyParams>,
) -> ApiResult<MessageResponse> {
    accessible_case(&state, &actor, case_id).await?;
    if state.store.get_company(company_id).await?.is_none() {
        return Err(ApiError::not_found("Company"));
    }
    state
        .store
        .link_company(&CaseCompanyRecord {
            case_id,
            company_id,
            relationship_type: parse_text_param(params.relationship_type),
        })
        .await?;
    tracing::info!(case_id, company_id, by = actor.id, "Company linked");
    Ok(ok(MessageResponse::new("Company linked to case")))
}

pub async fn company_unlink_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPairPath(company_id, case_id): IdPairPath,
) -> ApiResult<MessageResponse> {
    accessible_case(&state, &actor, case_id).await?;
    if !state.store.unlink_company(case_id, company_id).await? {
        return Err(ApiError::not_found("Link"));
    }
    tracing::info!(case_id, company_id, by = actor.id, "Company unlinked");
    Ok(ok(MessageResponse::new("Company unlinked from case")))
}

/// Companies linked to one case, with their relationship.
pub async fn case_companies_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(case_id): IdPath,
) -> ApiResult<Vec<CaseCompanyView>> {
    accessible_case(&state, &actor, case_id).await?;
    let links = state.store.case_companies(case_id).await?;
    Ok(ok(joins::case_company_views(state.store.as_ref(), links).await?))
}
