//! Request and response DTOs for the web gateway API.

use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::{
    CaseStatus, CreateClientParams, CreateCompanyParams, CreateUserParams, PageLimits,
    TaskPriority, TaskStatus, UpdateClientParams, UpdateNoteParams, UpdateUserParams, UserRole,
};
use crate::error::ApiError;

// --- Envelope ---

/// Every successful response body is `{ "data": ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn deleted(entity: &str) -> Self {
        Self {
            message: format!("{entity} deleted"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub message: &'static str,
    pub file_path: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub uptime_secs: u64,
}

// --- Field helpers ---

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn required_text(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ApiError::Validation(format!("'{field}' is required"))),
    }
}

pub fn required_id(field: &str, value: Option<i64>) -> Result<i64, ApiError> {
    value.ok_or_else(|| ApiError::Validation(format!("'{field}' is required")))
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::Validation(format!("'{field}' must be in YYYY-MM-DD format"))
    })
}

/// Blank strings count as absent.
pub fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_date(field, raw).map(Some),
        _ => Ok(None),
    }
}

/// For update bodies: `null` or blank clears the date.
pub fn parse_nullable_date(
    field: &str,
    value: Option<Option<String>>,
) -> Result<Option<Option<NaiveDate>>, ApiError> {
    value
        .map(|inner| parse_optional_date(field, inner.as_deref()))
        .transpose()
}

fn parse_choice<T>(
    field: &str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ApiError> {
    parse(value.trim()).ok_or_else(|| ApiError::Validation(format!("invalid {field} '{value}'")))
}

pub fn parse_role(value: &str) -> Result<UserRole, ApiError> {
    parse_choice("role", value, UserRole::from_db_value)
}

pub fn parse_case_status(value: &str) -> Result<CaseStatus, ApiError> {
    parse_choice("status", value, CaseStatus::from_db_value)
}

pub fn parse_task_status(value: &str) -> Result<TaskStatus, ApiError> {
    parse_choice("status", value, TaskStatus::from_db_value)
}

pub fn parse_task_priority(value: &str) -> Result<TaskPriority, ApiError> {
    parse_choice("priority", value, TaskPriority::from_db_value)
}

// --- Query-string helpers ---
//
// Query parameters arrive as raw strings so that an empty value means "no
// constraint" and a malformed one is reported by name.

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_id_param(name: &str, value: Option<&str>) -> Result<Option<i64>, ApiError> {
    present(value)
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| ApiError::Validation(format!("'{name}' must be an integer")))
        })
        .transpose()
}

pub fn parse_flag_param(name: &str, value: Option<&str>) -> Result<bool, ApiError> {
    match present(value) {
        None => Ok(false),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ApiError::Validation(format!("'{name}' must be a boolean"))),
        },
    }
}

pub fn parse_limit_param(value: Option<&str>, limits: &PageLimits) -> Result<usize, ApiError> {
    let requested = present(value)
        .map(|raw| {
            raw.parse::<usize>().map_err(|_| {
                ApiError::Validation("'limit' must be a non-negative integer".to_string())
            })
        })
        .transpose()?;
    Ok(limits.resolve(requested))
}

pub fn parse_text_param(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// --- List parameters ---

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientListParams {
    pub search: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CaseListParams {
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub attorney_id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub case_id: Option<String>,
    pub status: Option<String>,
    pub assignee_id: Option<String>,
    pub overdue_only: Option<String>,
    pub due_today: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentListParams {
    pub case_id: Option<String>,
    pub document_type: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoteListParams {
    pub case_id: Option<String>,
    pub pinned_only: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyListParams {
    pub company_type: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
}

/// Query string of the case-company link route.
#[derive(Debug, Default, Deserialize)]
pub struct LinkCompanyParams {
    pub relationship_type: Option<String>,
}

// --- Auth ---

/// Accepts the OAuth2 form field `username` or a JSON `email`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: SecretString,
}

// --- Users ---

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<SecretString>,
}

impl TryFrom<CreateUserRequest> for CreateUserParams {
    type Error = ApiError;

    fn try_from(req: CreateUserRequest) -> Result<Self, Self::Error> {
        let role = req.role.as_deref().map(parse_role).transpose()?;
        Ok(Self {
            email: required_text("email", req.email)?,
            full_name: required_text("full_name", req.full_name)?,
            role: role.ok_or_else(|| ApiError::Validation("'role' is required".to_string()))?,
            is_active: req.is_active.unwrap_or(true),
            password: req.password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<SecretString>,
}

impl TryFrom<UpdateUserRequest> for UpdateUserParams {
    type Error = ApiError;

    fn try_from(req: UpdateUserRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            email: req.email,
            full_name: req.full_name,
            role: req.role.as_deref().map(parse_role).transpose()?,
            is_active: req.is_active,
            password: req.password,
        })
    }
}

// --- Clients ---

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

impl TryFrom<CreateClientRequest> for CreateClientParams {
    type Error = ApiError;

    fn try_from(req: CreateClientRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: required_text("name", req.name)?,
            email: req.email,
            phone: req.phone,
            address: req.address,
            is_active: req.is_active.unwrap_or(true),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl From<UpdateClientRequest> for UpdateClientParams {
    fn from(req: UpdateClientRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            address: req.address,
            is_active: req.is_active,
        }
    }
}

// --- Cases ---

#[derive(Debug, Deserialize)]
pub struct CreateCaseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub case_type: Option<String>,
    pub status: Option<String>,
    pub client_id: Option<i64>,
    pub primary_attorney_id: Option<i64>,
    pub opened_date: Option<String>,
    pub next_hearing_date: Option<String>,
    pub statute_of_limitations: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCaseRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub case_type: Option<Option<String>>,
    pub status: Option<String>,
    pub client_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub primary_attorney_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub opened_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub next_hearing_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub statute_of_limitations: Option<Option<String>>,
}

// --- Tasks ---

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub case_id: Option<i64>,
    pub assignee_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
    pub case_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub assignee_id: Option<Option<i64>>,
}

// --- Documents ---

#[derive(Debug, Default, Deserialize)]
pub struct CreateDocumentRequest {
    pub name: Option<String>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub document_type: Option<String>,
    pub file_size: Option<u64>,
    pub case_id: Option<i64>,
}

// --- Notes ---

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub content: Option<String>,
    pub case_id: Option<i64>,
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
}

impl From<UpdateNoteRequest> for UpdateNoteParams {
    fn from(req: UpdateNoteRequest) -> Self {
        Self {
            content: req.content,
            is_pinned: req.is_pinned,
        }
    }
}

// --- Companies ---

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: Option<String>,
    pub company_type: Option<String>,
    pub contact_info: Option<String>,
}

impl TryFrom<CreateCompanyRequest> for CreateCompanyParams {
    type Error = ApiError;

    fn try_from(req: CreateCompanyRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: required_text("name", req.name)?,
            company_type: req.company_type,
            contact_info: req.contact_info,
        })
    }
}
