//! User directory. Owner-only apart from reading your own record.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{ApiResult, CreatedResult, created, deleted, ok};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::{ApiJson, ApiQuery, IdPath};
use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{
    CreateUserRequest, LimitParams, MessageResponse, UpdateUserRequest, parse_limit_param,
};
use crate::db::{CreateUserParams, UpdateUserParams, UserQuery, UserRecord};
use crate::error::ApiError;

pub async fn users_list_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> ApiResult<Vec<UserRecord>> {
    state.access.manage_users(&actor)?;
    let query = UserQuery {
        limit: parse_limit_param(params.limit.as_deref(), &state.page_limits)?,
    };
    Ok(ok(state.store.list_users(&query).await?))
}

pub async fn users_get_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<UserRecord> {
    state.access.view_user(&actor, id)?;
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ok(user))
}

pub async fn users_create_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> CreatedResult<UserRecord> {
    state.access.manage_users(&actor)?;
    let params = CreateUserParams::try_from(req)?;
    let user = state.store.create_user(&params).await?;
    tracing::info!(user_id = user.id, by = actor.id, "User created");
    Ok(created(user))
}

pub async fn users_update_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<UserRecord> {
    state.access.manage_users(&actor)?;
    let params = UpdateUserParams::try_from(req)?;
    let user = state
        .store
        .update_user(id, &params)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ok(user))
}

pub async fn users_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<MessageResponse> {
    state.access.delete_user(&actor, id)?;
    if !state.store.delete_user(id).await? {
        return Err(ApiError::not_found("User"));
    }
    tracing::info!(user_id = id, by = actor.id, "User deleted");
    Ok(deleted("User"))
}
