//! Case note handlers. Lists come back pinned-first, newest-first.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{
    ApiResult, CreatedResult, accessible_case, check_case_filter, created, deleted, ok,
};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::{ApiJson, ApiQuery, IdPath};
use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{
    CreateNoteRequest, MessageResponse, NoteListParams, UpdateNoteRequest, parse_flag_param,
    parse_id_param, parse_limit_param, required_id, required_text,
};
use crate::db::{CreateNoteParams, NoteQuery, NoteRecord, UpdateNoteParams, UserRecord};
use crate::error::ApiError;
use crate::practice::joins::{self, NoteView};

async fn accessible_note(
    state: &GatewayState,
    actor: &UserRecord,
    id: i64,
) -> Result<NoteRecord, ApiError> {
    let note = state
        .store
        .get_note(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Note"))?;
    accessible_case(state, actor, note.case_id).await?;
    Ok(note)
}

pub async fn notes_list_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<NoteListParams>,
) -> ApiResult<Vec<NoteView>> {
    let query = NoteQuery {
        case_id: parse_id_param("case_id", params.case_id.as_deref())?,
        pinned_only: parse_flag_param("pinned_only", params.pinned_only.as_deref())?,
        visible_to: state.access.case_scope(&actor),
        limit: parse_limit_param(params.limit.as_deref(), &state.page_limits)?,
    };
    check_case_filter(&state, &actor, query.case_id).await?;
    let notes = state.store.list_notes(&query).await?;
    Ok(ok(joins::note_views(state.store.as_ref(), notes).await?))
}

pub async fn notes_get_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<NoteView> {
    let note = accessible_note(&state, &actor, id).await?;
    Ok(ok(joins::note_view(state.store.as_ref(), note).await?))
}

pub async fn notes_create_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateNoteRequest>,
) -> CreatedResult<NoteView> {
    let is_pinned = req.is_pinned.unwrap_or(false);
    if is_pinned {
        state.access.pin_note(&actor)?;
    }
    let params = CreateNoteParams {
        content: required_text("content", req.content)?,
        case_id: required_id("case_id", req.case_id)?,
        author_id: actor.id,
        is_pinned,
    };
    accessible_case(&state, &actor, params.case_id).await?;
    let note = state.store.create_note(&params).await?;
    Ok(created(joins::note_view(state.store.as_ref(), note).await?))
}

pub async fn notes_update_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
    ApiJson(req): ApiJson<UpdateNoteRequest>,
) -> ApiResult<NoteView> {
    let existing = accessible_note(&state, &actor, id).await?;
    state.access.update_note(&actor, &existing)?;
    if req.is_pinned.is_some_and(|pinned| pinned != existing.is_pinned) {
        state.access.pin_note(&actor)?;
    }
    let note = state
        .store
        .update_note(id, &UpdateNoteParams::from(req))
        .await?
        .ok_or_else(|| ApiError::not_found("Note"))?;
    Ok(ok(joins::note_view(state.store.as_ref(), note).await?))
}

pub async fn notes_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<MessageResponse> {
    let existing = accessible_note(&state, &actor, id).await?;
    state.access.delete_note(&actor, &existing)?;
    if !state.store.delete_note(id).await? {
        return Err(ApiError::not_found("Note"));
    }
    Ok(deleted("Note"))
}
