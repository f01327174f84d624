//! Document metadata handlers. Uploads keep no bytes; download answers with
//! the stored path only.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;

use super::{
    ApiResult, CreatedResult, accessible_case, check_case_filter, created, deleted, ok,
};
use crate::channels::web::auth::CurrentUser;
use crate::channels::web::extract::{ApiQuery, DocumentUpload, IdPath};
use crate::channels::web::server::GatewayState;
use crate::channels::web::types::{
    DocumentListParams, DownloadResponse, MessageResponse, parse_id_param, parse_limit_param,
    parse_text_param, required_id, required_text,
};
use crate::db::{CreateDocumentParams, DocumentQuery, DocumentRecord, UserRecord};
use crate::error::ApiError;
use crate::practice::joins::{self, DocumentView};

const DOWNLOAD_PLACEHOLDER: &str = "Download would start here";

async fn accessible_document(
    state: &GatewayState,
    actor: &UserRecord,
    id: i64,
) -> Result<DocumentRecord, ApiError> {
    let document = state
        .store
        .get_document(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document"))?;
    accessible_case(state, actor, document.case_id).await?;
    Ok(document)
}

pub async fn documents_list_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<DocumentListParams>,
) -> ApiResult<Vec<DocumentView>> {
    let query = DocumentQuery {
        case_id: parse_id_param("case_id", params.case_id.as_deref())?,
        document_type: parse_text_param(params.document_type),
        visible_to: state.access.case_scope(&actor),
        limit: parse_limit_param(params.limit.as_deref(), &state.page_limits)?,
    };
    check_case_filter(&state, &actor, query.case_id).await?;
    let documents = state.store.list_documents(&query).await?;
    Ok(ok(joins::document_views(state.store.as_ref(), documents).await?))
}

pub async fn documents_get_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<DocumentView> {
    let document = accessible_document(&state, &actor, id).await?;
    Ok(ok(joins::document_view(state.store.as_ref(), document).await?))
}

/// Anyone working on the case may upload.
pub async fn documents_create_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    DocumentUpload(req): DocumentUpload,
) -> CreatedResult<DocumentView> {
    let params = CreateDocumentParams {
        name: required_text("name", req.name)?,
        file_path: parse_text_param(req.file_path),
        file_type: parse_text_param(req.file_type),
        document_type: parse_text_param(req.document_type),
        file_size: req.file_size,
        case_id: required_id("case_id", req.case_id)?,
        uploaded_by_id: actor.id,
    };
    accessible_case(&state, &actor, params.case_id).await?;
    let document = state.store.create_document(&params).await?;
    tracing::info!(
        document_id = document.id,
        case_id = document.case_id,
        size = document.file_size.unwrap_or(0),
        "Document recorded"
    );
    Ok(created(joins::document_view(state.store.as_ref(), document).await?))
}

pub async fn documents_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<MessageResponse> {
    let existing = accessible_document(&state, &actor, id).await?;
    state.access.delete_document(&actor, &existing)?;
    if !state.store.delete_document(id).await? {
        return Err(ApiError::not_found("Document"));
    }
    Ok(deleted("Document"))
}

pub async fn documents_download_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    IdPath(id): IdPath,
) -> ApiResult<DownloadResponse> {
    let document = accessible_document(&state, &actor, id).await?;
    Ok(ok(DownloadResponse {
        message: DOWNLOAD_PLACEHOLDER,
        file_path: document.file_path,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::testing::{assistant_token, lawyer_token, owner_token, send, send_raw, test_router};

    const BOUNDARY: &str = "casepilot-test-boundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, value) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    #[tokio::test]
    async fn list_embeds_uploader() {
        let app = test_router().await;
        let res = send(
            &app,
            Method::GET,
            "/api/documents?case_id=1&document_type=pleading",
            Some(&assistant_token()),
            None,
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let doc = &res.body["data"][0];
        assert_eq!(doc["name"], "Complaint.pdf");
        assert_eq!(doc["file_type"], "pdf");
        assert_eq!(doc["uploaded_by"]["email"], "lawyer@firm.com");
    }

    #[tokio::test]
    async fn json_create_defaults_path_and_type() {
        let app = test_router().await;
        let res = send(
            &app,
            Method::POST,
            "/api/documents",
            Some(&assistant_token()),
            Some(json!({"name": "Exhibit A.docx", "case_id": 1, "document_type": "evidence"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
        let data = &res.body["data"];
        assert_eq!(data["file_path"], "/documents/Exhibit A.docx");
        assert_eq!(data["file_type"], "docx");
        assert_eq!(data["uploaded_by_id"], 3);
    }

    #[tokio::test]
    async fn multipart_upload_records_size_and_filename() {
        let app = test_router().await;
        let body = multipart_body(&[
            ("case_id", None, "1"),
            ("document_type", None, "contract"),
            ("file", Some("retainer.pdf"), "0123456789"),
        ]);
        let res = send_raw(
            &app,
            Method::POST,
            "/api/documents",
            Some(&lawyer_token()),
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            &body,
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
        let data = &res.body["data"];
        assert_eq!(data["name"], "retainer.pdf");
        assert_eq!(data["file_size"], 10);
        assert_eq!(data["document_type"], "contract");
    }

    #[tokio::test]
    async fn multipart_without_case_is_rejected() {
        let app = test_router().await;
        let body = multipart_body(&[("file", Some("orphan.pdf"), "x")]);
        let res = send_raw(
            &app,
            Method::POST,
            "/api/documents",
            Some(&lawyer_token()),
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            &body,
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["detail"], "'case_id' is required");
    }

    #[tokio::test]
    async fn download_returns_placeholder() {
        let app = test_router().await;
        let res = send(
            &app,
            Method::GET,
            "/api/documents/1/download",
            Some(&owner_token()),
            None,
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"]["message"], "Download would start here");
        assert_eq!(res.body["data"]["file_path"], "/documents/Complaint.pdf");
    }

    #[tokio::test]
    async fn only_owner_or_uploader_deletes() {
        let app = test_router().await;
        let res = send(&app, Method::DELETE, "/api/documents/1", Some(&assistant_token()), None)
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);

        let res = send(&app, Method::DELETE, "/api/documents/1", Some(&lawyer_token()), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"]["message"], "Document deleted");
    }

    #[tokio::test]
    async fn documents_stay_within_the_case_team() {
        let app = test_router().await;
        send(
            &app,
            Method::POST,
            "/api/cases",
            Some(&owner_token()),
            Some(json!({"title": "Unstaffed matter", "client_id": 1})),
        )
        .await;
        let res = send(
            &app,
            Method::POST,
            "/api/documents",
            Some(&owner_token()),
            Some(json!({"name": "Sealed.pdf", "case_id": 2})),
        )
        .await;
        let sealed = res.body["data"]["id"].as_i64().expect("document id");

        let res = send(&app, Method::GET, "/api/documents", Some(&lawyer_token()), None).await;
        assert_eq!(res.body["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(res.body["data"][0]["name"], "Complaint.pdf");

        for uri in [
            format!("/api/documents/{sealed}"),
            format!("/api/documents/{sealed}/download"),
            "/api/documents?case_id=2".to_string(),
        ] {
            let res = send(&app, Method::GET, &uri, Some(&assistant_token()), None).await;
            assert_eq!(res.status, StatusCode::FORBIDDEN, "{uri}");
        }

        let res = send(
            &app,
            Method::POST,
            "/api/documents",
            Some(&lawyer_token()),
            Some(json!({"name": "Intrusion.pdf", "case_id": 2})),
        )
        .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
    }
}
