//! Persistence layer.
//!
//! Provides a backend-agnostic `Database` trait that unifies all persistence
//! operations. The only shipped implementation is the in-memory backend in
//! [`memory`], which stands in for a relational store. Filters are expressed
//! as [`query`] structs whose predicates map one-to-one onto SQL WHERE
//! clauses, so a SQL backend can implement the same sub-traits.
//!
//! Records hold foreign keys only. Embedding related entities happens at read
//! time in [`crate::practice::joins`].

pub mod memory;
pub mod query;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;

pub use query::{
    CaseQuery, ClientQuery, CompanyQuery, DocumentQuery, MemberScope, NoteQuery, PageLimits,
    TaskQuery, UserQuery,
};

/// Firm role. Closed set; drives write permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Owner,
    Lawyer,
    Assistant,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Lawyer => "lawyer",
            Self::Assistant => "assistant",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "lawyer" => Some(Self::Lawyer),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Case lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Closed,
    OnHold,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
            Self::OnHold => "on_hold",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "closed" => Some(Self::Closed),
            "on_hold" => Some(Self::OnHold),
            _ => None,
        }
    }
}

/// Task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateClientParams {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateClientParams {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: i64,
    pub case_number: String,
    pub title: String,
    pub description: Option<String>,
    pub case_type: Option<String>,
    pub status: CaseStatus,
    pub client_id: i64,
    pub primary_attorney_id: Option<i64>,
    pub opened_date: Option<NaiveDate>,
    pub next_hearing_date: Option<NaiveDate>,
    pub statute_of_limitations: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCaseParams {
    pub title: String,
    pub description: Option<String>,
    pub case_type: Option<String>,
    pub status: CaseStatus,
    pub client_id: i64,
    pub primary_attorney_id: Option<i64>,
    pub opened_date: Option<NaiveDate>,
    pub next_hearing_date: Option<NaiveDate>,
    pub statute_of_limitations: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCaseParams {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub case_type: Option<Option<String>>,
    pub status: Option<CaseStatus>,
    pub client_id: Option<i64>,
    pub primary_attorney_id: Option<Option<i64>>,
    pub opened_date: Option<Option<NaiveDate>>,
    pub next_hearing_date: Option<Option<NaiveDate>>,
    pub statute_of_limitations: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub case_id: i64,
    pub assignee_id: Option<i64>,
    pub created_by_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateTaskParams {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub case_id: i64,
    pub assignee_id: Option<i64>,
    pub created_by_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTaskParams {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub case_id: Option<i64>,
    pub assignee_id: Option<Option<i64>>,
}

/// Document metadata. File bytes are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub name: String,
    pub file_path: String,
    pub file_type: Option<String>,
    pub document_type: Option<String>,
    pub file_size: Option<u64>,
    pub case_id: i64,
    pub uploaded_by_id: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDocumentParams {
    pub name: String,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub document_type: Option<String>,
    pub file_size: Option<u64>,
    pub case_id: i64,
    pub uploaded_by_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: i64,
    pub content: String,
    pub case_id: i64,
    pub author_id: i64,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNoteParams {
    pub content: String,
    pub case_id: i64,
    pub author_id: i64,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateNoteParams {
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
}

/// An outside organisation involved in cases: opposing party, insurer,
/// expert firm and the like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: i64,
    pub name: String,
    pub company_type: Option<String>,
    pub contact_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCompanyParams {
    pub name: String,
    pub company_type: Option<String>,
    pub contact_info: Option<String>,
}

/// Link row between a case and a company. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseCompanyRecord {
    pub case_id: i64,
    pub company_id: i64,
    pub relationship_type: Option<String>,
}

/// Trim a free-text field and drop it when nothing is left.
pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Trim a required text field, rejecting blank input.
pub fn require_text(field: &str, value: &str) -> Result<String, DatabaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::Constraint(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

// ==================== Sub-traits ====================
//
// Each sub-trait groups the persistence methods for one table. The `Database`
// supertrait combines them all; leaf consumers can depend on a specific
// sub-trait instead.

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<UserRecord>, DatabaseError>;
    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;
    async fn create_user(&self, input: &CreateUserParams) -> Result<UserRecord, DatabaseError>;
    async fn update_user(
        &self,
        id: i64,
        input: &UpdateUserParams,
    ) -> Result<Option<UserRecord>, DatabaseError>;
    async fn delete_user(&self, id: i64) -> Result<bool, DatabaseError>;
    /// Check a password against the stored credential. Users without a
    /// credential never verify.
    async fn verify_password(
        &self,
        user_id: i64,
        password: &SecretString,
    ) -> Result<bool, DatabaseError>;
    async fn record_login(&self, user_id: i64) -> Result<Option<UserRecord>, DatabaseError>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn list_clients(&self, query: &ClientQuery) -> Result<Vec<ClientRecord>, DatabaseError>;
    async fn get_client(&self, id: i64) -> Result<Option<ClientRecord>, DatabaseError>;
    async fn create_client(&self, input: &CreateClientParams)
    -> Result<ClientRecord, DatabaseError>;
    async fn update_client(
        &self,
        id: i64,
        input: &UpdateClientParams,
    ) -> Result<Option<ClientRecord>, DatabaseError>;
    /// Rejected with a constraint error while any case references the client.
    async fn delete_client(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn list_cases(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>, DatabaseError>;
    async fn get_case(&self, id: i64) -> Result<Option<CaseRecord>, DatabaseError>;
    async fn create_case(&self, input: &CreateCaseParams) -> Result<CaseRecord, DatabaseError>;
    async fn update_case(
        &self,
        id: i64,
        input: &UpdateCaseParams,
    ) -> Result<Option<CaseRecord>, DatabaseError>;
    /// Removes the case together with its tasks, documents, notes, team rows
    /// and company links.
    async fn delete_case(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(
        &self,
        query: &TaskQuery,
        today: NaiveDate,
    ) -> Result<Vec<TaskRecord>, DatabaseError>;
    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, DatabaseError>;
    async fn create_task(&self, input: &CreateTaskParams) -> Result<TaskRecord, DatabaseError>;
    async fn update_task(
        &self,
        id: i64,
        input: &UpdateTaskParams,
    ) -> Result<Option<TaskRecord>, DatabaseError>;
    async fn delete_task(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(
        &self,
        query: &DocumentQuery,
    ) -> Result<Vec<DocumentRecord>, DatabaseError>;
    async fn get_document(&self, id: i64) -> Result<Option<DocumentRecord>, DatabaseError>;
    async fn create_document(
        &self,
        input: &CreateDocumentParams,
    ) -> Result<DocumentRecord, DatabaseError>;
    async fn delete_document(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Always ordered pinned-first, then newest-first.
    async fn list_notes(&self, query: &NoteQuery) -> Result<Vec<NoteRecord>, DatabaseError>;
    async fn get_note(&self, id: i64) -> Result<Option<NoteRecord>, DatabaseError>;
    async fn create_note(&self, input: &CreateNoteParams) -> Result<NoteRecord, DatabaseError>;
    async fn update_note(
        &self,
        id: i64,
        input: &UpdateNoteParams,
    ) -> Result<Option<NoteRecord>, DatabaseError>;
    async fn delete_note(&self, id: i64) -> Result<bool, DatabaseError>;
}

/// Assistants assigned to work on a case.
#[async_trait]
pub trait CaseTeamStore: Send + Sync {
    /// Assistant ids on the case, ascending.
    async fn case_team(&self, case_id: i64) -> Result<Vec<i64>, DatabaseError>;
    /// Constraint error when either side is missing or the pair exists.
    async fn assign_assistant(&self, case_id: i64, assistant_id: i64)
    -> Result<(), DatabaseError>;
    async fn remove_assistant(&self, case_id: i64, assistant_id: i64)
    -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn list_companies(
        &self,
        query: &CompanyQuery,
    ) -> Result<Vec<CompanyRecord>, DatabaseError>;
    async fn get_company(&self, id: i64) -> Result<Option<CompanyRecord>, DatabaseError>;
    async fn create_company(
        &self,
        input: &CreateCompanyParams,
    ) -> Result<CompanyRecord, DatabaseError>;
    /// Links of one case, ordered by company id.
    async fn case_companies(&self, case_id: i64) -> Result<Vec<CaseCompanyRecord>, DatabaseError>;
    /// Constraint error when either side is missing or the pair is linked.
    async fn link_company(
        &self,
        link: &CaseCompanyRecord,
    ) -> Result<CaseCompanyRecord, DatabaseError>;
    async fn unlink_company(&self, case_id: i64, company_id: i64) -> Result<bool, DatabaseError>;
}

/// Backend-agnostic database supertrait.
#[async_trait]
pub trait Database:
    UserStore
    + ClientStore
    + CaseStore
    + CaseTeamStore
    + TaskStore
    + DocumentStore
    + NoteStore
    + CompanyStore
    + Send
    + Sync
{
    /// Short backend identifier for logs and the health endpoint.
    fn backend_name(&self) -> &'static str;
}
