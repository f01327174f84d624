//! Extractors whose rejections use the API error body.
//!
//! axum's stock rejections answer with plain text and a mix of 400/415/422.
//! These wrappers turn every malformed request into a `validation_failure`.

use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use crate::channels::web::types::{CreateDocumentRequest, LoginRequest};
use crate::error::ApiError;

fn content_type_is(req: &Request, expected: &str) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(expected))
}

/// JSON body.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Integer `{id}` path segment.
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation("id must be an integer".to_string()))?;
        Ok(Self(id))
    }
}

/// Two integer segments, such as `{id}/assistants/{assistant_id}`.
pub struct IdPairPath(pub i64, pub i64);

impl<S> FromRequestParts<S> for IdPairPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((first, second)) = Path::<(i64, i64)>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation("ids must be integers".to_string()))?;
        Ok(Self(first, second))
    }
}

/// Login credentials, either form-encoded (OAuth2 password flow) or JSON.
pub struct LoginPayload(pub LoginRequest);

impl<S> FromRequest<S> for LoginPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if content_type_is(&req, "application/x-www-form-urlencoded") {
            let Form(body) = Form::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::Validation(e.body_text()))?;
            return Ok(Self(body));
        }
        let ApiJson(body) = ApiJson::<LoginRequest>::from_request(req, state).await?;
        Ok(Self(body))
    }
}

const DEFAULT_UPLOAD_NAME: &str = "document.pdf";

/// Document metadata from a JSON body or a multipart upload. File bytes are
/// counted and dropped.
pub struct DocumentUpload(pub CreateDocumentRequest);

impl<S> FromRequest<S> for DocumentUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !content_type_is(&req, "multipart/form-data") {
            let ApiJson(body) = ApiJson::<CreateDocumentRequest>::from_request(req, state).await?;
            return Ok(Self(body));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        read_multipart(&mut multipart).await.map(Self)
    }
}

async fn read_multipart(multipart: &mut Multipart) -> Result<CreateDocumentRequest, ApiError> {
    let mut body = CreateDocumentRequest::default();
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart read error: {e}")))?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        if field_name == "file" {
            file_name = field
                .file_name()
                .and_then(|raw| raw.rsplit(['/', '\\']).next())
                .map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read upload body: {e}")))?;
            body.file_size = Some(data.len() as u64);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read field '{field_name}': {e}")))?;
        match field_name.as_str() {
            "name" => body.name = Some(value),
            "document_type" => body.document_type = Some(value),
            "case_id" => {
                let id = value.trim().parse::<i64>().map_err(|_| {
                    ApiError::Validation("'case_id' must be an integer".to_string())
                })?;
                body.case_id = Some(id);
            }
            _ => {}
        }
    }

    let name = body
        .name
        .take()
        .filter(|n| !n.trim().is_empty())
        .or(file_name.filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
    body.file_size = Some(body.file_size.unwrap_or(0));
    body.name = Some(name);
    Ok(body)
}
