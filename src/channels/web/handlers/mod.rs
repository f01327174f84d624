//! Route handlers, one module per resource.

pub mod auth;
pub mod cases;
pub mod clients;
pub mod companies;
pub mod documents;
pub mod notes;
pub mod tasks;
pub mod users;

use axum::Json;
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};

use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{Envelope, MessageResponse};
use crate::db::{CaseRecord, TaskRecord, UserRecord};
use crate::error::ApiError;

pub(crate) type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;
pub(crate) type CreatedResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

pub(crate) fn ok<T>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::new(data))
}

pub(crate) fn created<T>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, Json(Envelope::new(data)))
}

pub(crate) fn deleted(entity: &str) -> Json<Envelope<MessageResponse>> {
    ok(MessageResponse::deleted(entity))
}

/// Calendar date used for overdue and due-today filters.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Load a case the actor works on. A missing case is 404 before any 403.
pub(crate) async fn accessible_case(
    state: &GatewayState,
    actor: &UserRecord,
    case_id: i64,
) -> Result<CaseRecord, ApiError> {
    let case = state
        .store
        .get_case(case_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Case"))?;
    if state.access.case_scope(actor).is_some() {
        let team = state.store.case_team(case_id).await?;
        state.access.view_case(actor, &case, &team)?;
    }
    Ok(case)
}

/// Check the case only when a case-bound listing is filtered to one case.
pub(crate) async fn check_case_filter(
    state: &GatewayState,
    actor: &UserRecord,
    case_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(case_id) = case_id
        && state.access.case_scope(actor).is_some()
    {
        accessible_case(state, actor, case_id).await?;
    }
    Ok(())
}

/// Load a task the actor owns or reaches through its case.
pub(crate) async fn accessible_task(
    state: &GatewayState,
    actor: &UserRecord,
    id: i64,
) -> Result<TaskRecord, ApiError> {
    let task = state
        .store
        .get_task(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    if !state.access.owns_task(actor, &task) {
        accessible_case(state, actor, task.case_id).await?;
    }
    Ok(task)
}
