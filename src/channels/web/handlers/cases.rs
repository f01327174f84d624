//! Case handlers. Every case leaves the API with its client and primary
//! attorney embedded. Non-owners only reach the cases they work on.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{ApiResult, CreatedResult, accessible_case, created, deleted, ok};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::{ApiJson, ApiQuery, IdPairPath, IdPath};
use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{
    CaseListParams, CreateCaseRequest, MessageResponse, UpdateCaseRequest, parse_case_status,
    parse_id_param, parse_limit_param, parse_nullable_date, parse_optional_date, parse_text_param,
    required_id, required_text,
};
use crate::db::{CaseQuery, CaseStatus, CreateCaseParams, UpdateCaseParams, UserRecord, UserRole};
use crate::error::ApiError;
use crate::practice::joins::{self, CaseView};

pub async fn cases_list_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<CaseListParams>,
) -> ApiResult<Vec<CaseView>> {
    let status = parse_text_param(params.status)
        .as_deref()
        .map(parse_case_status)
        .transpose()?;
    let query = CaseQuery {
        status,
        client_id: parse_id_param("client_id", params.client_id.as_deref())?,
        attorney_id: parse_id_param("attorney_id", params.attorney_id.as_deref())?,
        search: parse_text_param(params.search),
        visible_to: state.access.case_scope(&actor),
        limit: parse_limit_param(params.limit.as_deref(), &state.page_limits)?,
    };
    let cases = state.store.list_cases(&query).await?;
    Ok(ok(joins::case_views(state.store.as_ref(), cases).await?))
}

pub async fn cases_get_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<CaseView> {
    let case = accessible_case(&state, &actor, id).await?;
    Ok(ok(joins::case_view(state.store.as_ref(), case).await?))
}

pub async fn cases_create_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateCaseRequest>,
) -> CreatedResult<CaseView> {
    state.access.create_case(&actor)?;
    let status = match parse_text_param(req.status) {
        Some(raw) => parse_case_status(&raw)?,
        None => CaseStatus::Open,
    };
    let params = CreateCaseParams {
        title: required_text("title", req.title)?,
        description: req.description,
        case_type: req.case_type,
        status,
        client_id: required_id("client_id", req.client_id)?,
        primary_attorney_id: state
            .access
            .default_primary_attorney(&actor, req.primary_attorney_id),
        opened_date: parse_optional_date("opened_date", req.opened_date.as_deref())?,
        next_hearing_date: parse_optional_date(
            "next_hearing_date",
            req.next_hearing_date.as_deref(),
        )?,
        statute_of_limitations: parse_optional_date(
            "statute_of_limitations",
            req.statute_of_limitations.as_deref(),
        )?,
    };
    let case = state.store.create_case(&params).await?;
    tracing::info!(
        case_id = case.id,
        case_number = %case.case_number,
        by = actor.id,
        "Case opened"
    );
    Ok(created(joins::case_view(state.store.as_ref(), case).await?))
}

pub async fn cases_update_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
    ApiJson(req): ApiJson<UpdateCaseRequest>,
) -> ApiResult<CaseView> {
    let existing = accessible_case(&state, &actor, id).await?;
    state.access.update_case(&actor, &existing)?;

    let params = UpdateCaseParams {
        title: req.title,
        description: req.description,
        case_type: req.case_type,
        status: req.status.as_deref().map(parse_case_status).transpose()?,
        client_id: req.client_id,
        primary_attorney_id: req.primary_attorney_id,
        opened_date: parse_nullable_date("opened_date", req.opened_date)?,
        next_hearing_date: parse_nullable_date("next_hearing_date", req.next_hearing_date)?,
        statute_of_limitations: parse_nullable_date(
            "statute_of_limitations",
            req.statute_of_limitations,
        )?,
    };
    let case = state
        .store
        .update_case(id, &params)
        .await?
        .ok_or_else(|| ApiError::not_found("Case"))?;
    Ok(ok(joins::case_view(state.store.as_ref(), case).await?))
}

pub async fn cases_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<MessageResponse> {
    state.access.delete_case(&actor)?;
    if !state.store.delete_case(id).await? {
        return Err(ApiError::not_found("Case"));
    }
    tracing::info!(case_id = id, by = actor.id, "Case deleted");
    Ok(deleted("Case"))
}

pub async fn case_team_list_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<Vec<UserRecord>> {
    accessible_case(&state, &actor, id).await?;
    let mut team = Vec::new();
    for assistant_id in state.store.case_team(id).await? {
        if let Some(user) = state.store.get_user(assistant_id).await? {
            team.push(user);
        }
    }
    Ok(ok(team))
}

pub async fn case_team_assign_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPairPath(id, assistant_id): IdPairPath,
) -> ApiResult<MessageResponse> {
    accessible_case(&state, &actor, id).await?;
    let is_assistant = state
        .store
        .get_user(assistant_id)
        .await?
        .is_some_and(|user| user.role == UserRole::Assistant);
    if !is_assistant {
        return Err(ApiError::not_found("Assistant"));
    }
    state.store.assign_assistant(id, assistant_id).await?;
    tracing::info!(case_id = id, assistant_id, by = actor.id, "Assistant assigned");
    Ok(ok(MessageResponse::new("Assistant assigned")))
}

pub async fn case_team_remove_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPairPath(id, assistant_id): IdPairPath,
) -> ApiResult<MessageResponse> {
    accessible_case(&state, &actor, id).await?;
    if !state.store.remove_assistant(id, assistant_id).await? {
        return Err(ApiError::not_found("Assignment"));
    }
    tracing::info!(case_id = id, assistant_id, by = actor.id, "Assistant removed");
    Ok(ok(MessageResponse::new("Assistant removed")))
}
