//! Login and current-user lookup.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{ApiResult, ok};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::LoginPayload;
use crate::channels::web::server::GatewayState;
use crate::db::UserRecord;
use crate::practice::session::{self, AccessToken};

pub async fn login_handler(
    State(state): State<Arc<GatewayState>>,
    LoginPayload(req): LoginPayload,
) -> ApiResult<AccessToken> {
    let (_, token) = session::login(state.store.as_ref(), &req.username, &req.password).await?;
    Ok(ok(token))
}

pub async fn me_handler(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ApiResult<UserRecord> {
    Ok(ok(user))
}
