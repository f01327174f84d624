//! Task handlers.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{
    ApiResult, CreatedResult, accessible_case, accessible_task, check_case_filter, created,
    deleted, ok, today,
};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::{ApiJson, ApiQuery, IdPath};
use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{
    CreateTaskRequest, MessageResponse, TaskListParams, UpdateTaskRequest, parse_flag_param,
    parse_id_param, parse_limit_param, parse_nullable_date, parse_optional_date,
    parse_task_priority, parse_task_status, parse_text_param, required_id, required_text,
};
use crate::db::{CreateTaskParams, TaskPriority, TaskQuery, TaskStatus, UpdateTaskParams};
use crate::error::ApiError;
use crate::practice::joins::{self, TaskView};

pub async fn tasks_list_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<TaskListParams>,
) -> ApiResult<Vec<TaskView>> {
    let status = parse_text_param(params.status)
        .as_deref()
        .map(parse_task_status)
        .transpose()?;
    let query = TaskQuery {
        case_id: parse_id_param("case_id", params.case_id.as_deref())?,
        status,
        assignee_id: parse_id_param("assignee_id", params.assignee_id.as_deref())?,
        overdue_only: parse_flag_param("overdue_only", params.overdue_only.as_deref())?,
        due_today: parse_flag_param("due_today", params.due_today.as_deref())?,
        visible_to: state.access.case_scope(&actor),
        limit: parse_limit_param(params.limit.as_deref(), &state.page_limits)?,
    };
    check_case_filter(&state, &actor, query.case_id).await?;
    let tasks = state.store.list_tasks(&query, today()).await?;
    Ok(ok(joins::task_views(state.store.as_ref(), tasks).await?))
}

pub async fn tasks_get_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<TaskView> {
    let task = accessible_task(&state, &actor, id).await?;
    Ok(ok(joins::task_view(state.store.as_ref(), task).await?))
}

pub async fn tasks_create_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> CreatedResult<TaskView> {
    state.access.create_task(&actor)?;
    let status = match parse_text_param(req.status) {
        Some(raw) => parse_task_status(&raw)?,
        None => TaskStatus::Todo,
    };
    let priority = match parse_text_param(req.priority) {
        Some(raw) => parse_task_priority(&raw)?,
        None => TaskPriority::Medium,
    };
    let params = CreateTaskParams {
        title: required_text("title", req.title)?,
        description: req.description,
        status,
        priority,
        due_date: parse_optional_date("due_date", req.due_date.as_deref())?,
        case_id: required_id("case_id", req.case_id)?,
        assignee_id: state.access.default_assignee(&actor, req.assignee_id),
        created_by_id: actor.id,
    };
    accessible_case(&state, &actor, params.case_id).await?;
    let task = state.store.create_task(&params).await?;
    tracing::info!(task_id = task.id, case_id = task.case_id, by = actor.id, "Task created");
    Ok(created(joins::task_view(state.store.as_ref(), task).await?))
}

pub async fn tasks_update_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<TaskView> {
    let existing = accessible_task(&state, &actor, id).await?;
    let params = UpdateTaskParams {
        title: req.title,
        description: req.description,
        status: req.status.as_deref().map(parse_task_status).transpose()?,
        priority: req.priority.as_deref().map(parse_task_priority).transpose()?,
        due_date: parse_nullable_date("due_date", req.due_date)?,
        case_id: req.case_id,
        assignee_id: req.assignee_id,
    };
    state.access.update_task(&actor, &existing, &params)?;
    if let Some(case_id) = params.case_id
        && case_id != existing.case_id
    {
        accessible_case(&state, &actor, case_id).await?;
    }
    let task = state
        .store
        .update_task(id, &params)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    Ok(ok(joins::task_view(state.store.as_ref(), task).await?))
}

pub async fn tasks_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<MessageResponse> {
    let existing = accessible_task(&state, &actor, id).await?;
    state.access.delete_task(&actor, &existing)?;
    if !state.store.delete_task(id).await? {
        return Err(ApiError::not_found("Task"));
    }
    Ok(deleted("Task"))
}
