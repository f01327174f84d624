//! Bearer-token authentication for the web gateway.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::channels::web::server::GatewayState;
use crate::db::UserRecord;
use crate::error::ApiError;
use crate::practice::session;

/// The authenticated caller, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve `Authorization: Bearer <token>` to an active user.
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        tracing::warn!(%path, "Request without bearer token");
        return Err(ApiError::Authentication("Not authenticated".to_string()));
    };
    let user = session::authenticate(state.store.as_ref(), &token)
        .await
        .inspect_err(|e| tracing::warn!(%path, "Rejected token: {}", e))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
