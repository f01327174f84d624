//! Client handlers.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{ApiResult, CreatedResult, created, deleted, ok};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::{ApiJson, ApiQuery, IdPath};
use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{
    ClientListParams, CreateClientRequest, MessageResponse, UpdateClientRequest,
    parse_limit_param, parse_text_param,
};
use crate::db::{ClientQuery, ClientRecord, CreateClientParams, UpdateClientParams};
use crate::error::ApiError;

pub async fn clients_list_handler(
    State(state): State<Arc<GatewayState>>,
    ApiQuery(params): ApiQuery<ClientListParams>,
) -> ApiResult<Vec<ClientRecord>> {
    let query = ClientQuery {
        search: parse_text_param(params.search),
        limit: parse_limit_param(params.limit.as_deref(), &state.page_limits)?,
    };
    Ok(ok(state.store.list_clients(&query).await?))
}

pub async fn clients_get_handler(
    State(state): State<Arc<GatewayState>>,
    IdPath(id): IdPath,
) -> ApiResult<ClientRecord> {
    let client = state
        .store
        .get_client(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client"))?;
    Ok(ok(client))
}

pub async fn clients_create_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateClientRequest>,
) -> CreatedResult<ClientRecord> {
    state.access.write_client(&actor)?;
    let params = CreateClientParams::try_from(req)?;
    let client = state.store.create_client(&params).await?;
    tracing::info!(client_id = client.id, by = actor.id, "Client created");
    Ok(created(client))
}

pub async fn clients_update_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
    ApiJson(req): ApiJson<UpdateClientRequest>,
) -> ApiResult<ClientRecord> {
    state.access.write_client(&actor)?;
    let client = state
        .store
        .update_client(id, &UpdateClientParams::from(req))
        .await?
        .ok_or_else(|| ApiError::not_found("Client"))?;
    Ok(ok(client))
}

pub async fn clients_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<MessageResponse> {
    state.access.delete_client(&actor)?;
    if !state.store.delete_client(id).await? {
        return Err(ApiError::not_found("Client"));
    }
    tracing::info!(client_id = id, by = actor.id, "Client deleted");
    Ok(deleted("Client"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::testing::{assistant_token, lawyer_token, owner_token, send, test_router};

    #[tokio::test]
    async fn search_matches_name_case_insensitively() {
        let app = test_router().await;
        let res = send(
            &app,
            Method::GET,
            "/api/clients?search=smith",
            Some(&assistant_token()),
            None,
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"][0]["name"], "Smith & Associates");

        let res = send(
            &app,
            Method::GET,
            "/api/clients?search=nobody",
            Some(&assistant_token()),
            None,
        )
        .await;
        assert_eq!(res.body["data"], json!([]));
    }

    #[tokio::test]
    async fn lawyer_creates_and_updates_client() {
        let app = test_router().await;
        let res = send(
            &app,
            Method::POST,
            "/api/clients",
            Some(&lawyer_token()),
            Some(json!({"name": "Acme Corp", "email": "legal@acme.com"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["data"]["id"], 2);

        let res = send(
            &app,
            Method::PUT,
            "/api/clients/2",
            Some(&lawyer_token()),
            Some(json!({"email": null, "phone": "555-0199"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"]["email"], serde_json::Value::Null);
        assert_eq!(res.body["data"]["phone"], "555-0199");
        assert_eq!(res.body["data"]["name"], "Acme Corp");
    }

    #[tokio::test]
    async fn assistant_cannot_create_client() {
        let app = test_router().await;
        let res = send(
            &app,
            Method::POST,
            "/api/clients",
            Some(&assistant_token()),
            Some(json!({"name": "Acme Corp"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn client_with_cases_cannot_be_deleted() {
        let app = test_router().await;
        let res = send(&app, Method::DELETE, "/api/clients/1", Some(&owner_token()), None).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["detail"], "Cannot delete client with existing cases");

        let res = send(&app, Method::GET, "/api/clients/1", Some(&owner_token()), None).await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_client_is_not_found() {
        let app = test_router().await;
        let res = send(&app, Method::GET, "/api/clients/42", Some(&owner_token()), None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body["detail"], "Client not found");
        assert_eq!(res.body["kind"], "not_found");
    }
}
