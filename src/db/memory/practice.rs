//! Table operations for the in-memory backend.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use secrecy::SecretString;

use super::{MemoryBackend, Tables};
use crate::db::query::note_display_order;
use crate::db::{
    CaseCompanyRecord, CaseQuery, CaseRecord, CaseStore, CaseTeamStore, ClientQuery, ClientRecord,
    ClientStore, CompanyQuery, CompanyRecord, CompanyStore, CreateCaseParams, CreateClientParams,
    CreateCompanyParams, CreateDocumentParams, CreateNoteParams, CreateTaskParams,
    CreateUserParams, DocumentQuery, DocumentRecord, DocumentStore, MemberScope, NoteQuery,
    NoteRecord, NoteStore, TaskQuery, TaskRecord, TaskStatus, TaskStore, UpdateCaseParams,
    UpdateClientParams, UpdateNoteParams, UpdateTaskParams, UpdateUserParams, UserQuery,
    UserRecord, UserStore, UserRole, normalize_optional_text, require_text,
};
use crate::error::DatabaseError;
use crate::practice::session::{credential_digest, digest_matches};

fn missing(entity: &str, id: i64) -> DatabaseError {
    DatabaseError::Constraint(format!("{entity} {id} does not exist"))
}

fn ensure_user(tables: &Tables, id: i64) -> Result<(), DatabaseError> {
    if tables.users.contains_key(&id) {
        Ok(())
    } else {
        Err(missing("User", id))
    }
}

fn ensure_client(tables: &Tables, id: i64) -> Result<(), DatabaseError> {
    if tables.clients.contains_key(&id) {
        Ok(())
    } else {
        Err(missing("Client", id))
    }
}

fn ensure_case(tables: &Tables, id: i64) -> Result<(), DatabaseError> {
    if tables.cases.contains_key(&id) {
        Ok(())
    } else {
        Err(missing("Case", id))
    }
}

fn ensure_company(tables: &Tables, id: i64) -> Result<(), DatabaseError> {
    if tables.companies.contains_key(&id) {
        Ok(())
    } else {
        Err(missing("Company", id))
    }
}

/// Cases `user_id` works on, or `None` for an unrestricted listing.
fn member_scope(tables: &Tables, visible_to: Option<i64>) -> Option<MemberScope> {
    let user_id = visible_to?;
    let mut case_ids: HashSet<i64> = tables
        .cases
        .values()
        .filter(|c| c.primary_attorney_id == Some(user_id))
        .map(|c| c.id)
        .collect();
    case_ids.extend(
        tables
            .case_assistants
            .iter()
            .filter(|(_, assistant_id)| *assistant_id == user_id)
            .map(|(case_id, _)| *case_id),
    );
    Some(MemberScope { user_id, case_ids })
}

fn validate_email(raw: &str) -> Result<String, DatabaseError> {
    let email = require_text("email", raw)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DatabaseError::Constraint(format!(
            "'{email}' is not a valid email address"
        ))),
    }
}

fn ensure_email_free(tables: &Tables, email: &str, except: Option<i64>) -> Result<(), DatabaseError> {
    let taken = tables
        .users
        .values()
        .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email));
    if taken {
        return Err(DatabaseError::Constraint(
            "Email already registered".to_string(),
        ));
    }
    Ok(())
}

/// Lowercased extension of a file name, if it has one.
fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

#[async_trait]
impl UserStore for MemoryBackend {
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<UserRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().take(query.limit).cloned().collect())
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn create_user(&self, input: &CreateUserParams) -> Result<UserRecord, DatabaseError> {
        let email = validate_email(&input.email)?;
        let full_name = require_text("full_name", &input.full_name)?;

        let mut tables = self.tables.write().await;
        ensure_email_free(&tables, &email, None)?;

        let Tables {
            users, user_ids, ..
        } = &mut *tables;
        let id = user_ids.allocate(users);
        let record = UserRecord {
            id,
            email,
            full_name,
            role: input.role,
            is_active: input.is_active,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.users.insert(id, record.clone());
        if let Some(password) = &input.password {
            tables.credentials.insert(id, credential_digest(id, password));
        }
        tracing::debug!(user_id = id, role = record.role.as_str(), "Created user");
        Ok(record)
    }

    async fn update_user(
        &self,
        id: i64,
        input: &UpdateUserParams,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(mut record) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(email) = &input.email {
            let email = validate_email(email)?;
            ensure_email_free(&tables, &email, Some(id))?;
            record.email = email;
        }
        if let Some(full_name) = &input.full_name {
            record.full_name = require_text("full_name", full_name)?;
        }
        if let Some(role) = input.role {
            record.role = role;
        }
        if let Some(is_active) = input.is_active {
            record.is_active = is_active;
        }
        if let Some(password) = &input.password {
            tables.credentials.insert(id, credential_digest(id, password));
        }

        tables.users.insert(id, record.clone());
        tracing::debug!(user_id = id, "Updated user");
        Ok(Some(record))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.credentials.remove(&id);
        tables.case_assistants.retain(|(_, assistant_id)| *assistant_id != id);
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tracing::debug!(user_id = id, "Deleted user");
        }
        Ok(removed)
    }

    async fn verify_password(
        &self,
        user_id: i64,
        password: &SecretString,
    ) -> Result<bool, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .credentials
            .get(&user_id)
            .is_some_and(|stored| digest_matches(stored, user_id, password)))
    }

    async fn record_login(&self, user_id: i64) -> Result<Option<UserRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.users.get_mut(&user_id) else {
            return Ok(None);
        };
        record.last_login = Some(Utc::now());
        Ok(Some(record.clone()))
    }
}

#[async_trait]
impl ClientStore for MemoryBackend {
    async fn list_clients(&self, query: &ClientQuery) -> Result<Vec<ClientRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .values()
            .filter(|c| query.matches(c))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn get_client(&self, id: i64) -> Result<Option<ClientRecord>, DatabaseError> {
        Ok(self.tables.read().await.clients.get(&id).cloned())
    }

    async fn create_client(
        &self,
        input: &CreateClientParams,
    ) -> Result<ClientRecord, DatabaseError> {
        let name = require_text("name", &input.name)?;

        let mut tables = self.tables.write().await;
        let Tables {
            clients,
            client_ids,
            ..
        } = &mut *tables;
        let id = client_ids.allocate(clients);
        let now = Utc::now();
        let record = ClientRecord {
            id,
            name,
            email: normalize_optional_text(input.email.clone()),
            phone: normalize_optional_text(input.phone.clone()),
            address: normalize_optional_text(input.address.clone()),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        clients.insert(id, record.clone());
        tracing::debug!(client_id = id, "Created client");
        Ok(record)
    }

    async fn update_client(
        &self,
        id: i64,
        input: &UpdateClientParams,
    ) -> Result<Option<ClientRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.clients.get_mut(&id) else {
            return Ok(None);
        };

        let name = match &input.name {
            Some(name) => require_text("name", name)?,
            None => record.name.clone(),
        };
        record.name = name;
        if let Some(email) = &input.email {
            record.email = normalize_optional_text(email.clone());
        }
        if let Some(phone) = &input.phone {
            record.phone = normalize_optional_text(phone.clone());
        }
        if let Some(address) = &input.address {
            record.address = normalize_optional_text(address.clone());
        }
        if let Some(is_active) = input.is_active {
            record.is_active = is_active;
        }
        record.updated_at = Utc::now();
        tracing::debug!(client_id = id, "Updated client");
        Ok(Some(record.clone()))
    }

    async fn delete_client(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.clients.contains_key(&id) {
            return Ok(false);
        }
        if tables.cases.values().any(|c| c.client_id == id) {
            return Err(DatabaseError::Constraint(
                "Cannot delete client with existing cases".to_string(),
            ));
        }
        tables.clients.remove(&id);
        tracing::debug!(client_id = id, "Deleted client");
        Ok(true)
    }
}

#[async_trait]
impl CaseStore for MemoryBackend {
    async fn list_cases(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        let client_names: HashMap<i64, &str> = if query.needs_client_names() {
            tables
                .clients
                .values()
                .map(|c| (c.id, c.name.as_str()))
                .collect()
        } else {
            HashMap::new()
        };
        let scope = member_scope(&tables, query.visible_to);
        Ok(tables
            .cases
            .values()
            .filter(|case| scope.as_ref().is_none_or(|s| s.covers_case(case.id)))
            .filter(|case| {
                let client_name = client_names.get(&case.client_id).copied();
                query.matches(case, client_name)
            })
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn get_case(&self, id: i64) -> Result<Option<CaseRecord>, DatabaseError> {
        Ok(self.tables.read().await.cases.get(&id).cloned())
    }

    async fn create_case(&self, input: &CreateCaseParams) -> Result<CaseRecord, DatabaseError> {
        let title = require_text("title", &input.title)?;

        let mut tables = self.tables.write().await;
        ensure_client(&tables, input.client_id)?;
        if let Some(attorney_id) = input.primary_attorney_id {
            ensure_user(&tables, attorney_id)?;
        }

        let now = Utc::now();
        let Tables {
            cases,
            case_ids,
            case_numbers,
            ..
        } = &mut *tables;
        let case_number =
            case_numbers.issue(now.year(), cases.values().map(|c| c.case_number.as_str()));
        let id = case_ids.allocate(cases);
        let record = CaseRecord {
            id,
            case_number,
            title,
            description: normalize_optional_text(input.description.clone()),
            case_type: normalize_optional_text(input.case_type.clone()),
            status: input.status,
            client_id: input.client_id,
            primary_attorney_id: input.primary_attorney_id,
            opened_date: input.opened_date,
            next_hearing_date: input.next_hearing_date,
            statute_of_limitations: input.statute_of_limitations,
            created_at: now,
            updated_at: now,
        };
        cases.insert(id, record.clone());
        tracing::debug!(case_id = id, case_number = %record.case_number, "Created case");
        Ok(record)
    }

    async fn update_case(
        &self,
        id: i64,
        input: &UpdateCaseParams,
    ) -> Result<Option<CaseRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(mut record) = tables.cases.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(title) = &input.title {
            record.title = require_text("title", title)?;
        }
        if let Some(description) = &input.description {
            record.description = normalize_optional_text(description.clone());
        }
        if let Some(case_type) = &input.case_type {
            record.case_type = normalize_optional_text(case_type.clone());
        }
        if let Some(status) = input.status {
            record.status = status;
        }
        if let Some(client_id) = input.client_id {
            ensure_client(&tables, client_id)?;
            record.client_id = client_id;
        }
        if let Some(attorney_id) = input.primary_attorney_id {
            if let Some(user_id) = attorney_id {
                ensure_user(&tables, user_id)?;
            }
            record.primary_attorney_id = attorney_id;
        }
        if let Some(opened_date) = input.opened_date {
            record.opened_date = opened_date;
        }
        if let Some(next_hearing_date) = input.next_hearing_date {
            record.next_hearing_date = next_hearing_date;
        }
        if let Some(statute) = input.statute_of_limitations {
            record.statute_of_limitations = statute;
        }
        record.updated_at = Utc::now();

        tables.cases.insert(id, record.clone());
        tracing::debug!(case_id = id, "Updated case");
        Ok(Some(record))
    }

    async fn delete_case(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.cases.remove(&id).is_none() {
            return Ok(false);
        }
        let before = (
            tables.tasks.len(),
            tables.documents.len(),
            tables.notes.len(),
        );
        tables.tasks.retain(|_, t| t.case_id != id);
        tables.documents.retain(|_, d| d.case_id != id);
        tables.notes.retain(|_, n| n.case_id != id);
        tables.case_assistants.retain(|(case_id, _)| *case_id != id);
        tables.case_companies.retain(|(case_id, _), _| *case_id != id);
        tracing::debug!(
            case_id = id,
            tasks = before.0 - tables.tasks.len(),
            documents = before.1 - tables.documents.len(),
            notes = before.2 - tables.notes.len(),
            "Deleted case and dependents"
        );
        Ok(true)
    }
}

#[async_trait]
impl TaskStore for MemoryBackend {
    async fn list_tasks(
        &self,
        query: &TaskQuery,
        today: NaiveDate,
    ) -> Result<Vec<TaskRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        let scope = member_scope(&tables, query.visible_to);
        Ok(tables
            .tasks
            .values()
            .filter(|t| scope.as_ref().is_none_or(|s| s.covers_task(t)))
            .filter(|t| query.matches(t, today))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, DatabaseError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn create_task(&self, input: &CreateTaskParams) -> Result<TaskRecord, DatabaseError> {
        let title = require_text("title", &input.title)?;

        let mut tables = self.tables.write().await;
        ensure_case(&tables, input.case_id)?;
        ensure_user(&tables, input.created_by_id)?;
        if let Some(assignee_id) = input.assignee_id {
            ensure_user(&tables, assignee_id)?;
        }

        let Tables {
            tasks, task_ids, ..
        } = &mut *tables;
        let id = task_ids.allocate(tasks);
        let now = Utc::now();
        let record = TaskRecord {
            id,
            title,
            description: normalize_optional_text(input.description.clone()),
            status: input.status,
            priority: input.priority,
            due_date: input.due_date,
            case_id: input.case_id,
            assignee_id: input.assignee_id,
            created_by_id: input.created_by_id,
            created_at: now,
            updated_at: now,
            completed_at: (input.status == TaskStatus::Done).then_some(now),
        };
        tasks.insert(id, record.clone());
        tracing::debug!(task_id = id, case_id = record.case_id, "Created task");
        Ok(record)
    }

    async fn update_task(
        &self,
        id: i64,
        input: &UpdateTaskParams,
    ) -> Result<Option<TaskRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(mut record) = tables.tasks.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(title) = &input.title {
            record.title = require_text("title", title)?;
        }
        if let Some(description) = &input.description {
            record.description = normalize_optional_text(description.clone());
        }
        if let Some(priority) = input.priority {
            record.priority = priority;
        }
        if let Some(due_date) = input.due_date {
            record.due_date = due_date;
        }
        if let Some(case_id) = input.case_id {
            ensure_case(&tables, case_id)?;
            record.case_id = case_id;
        }
        if let Some(assignee_id) = input.assignee_id {
            if let Some(user_id) = assignee_id {
                ensure_user(&tables, user_id)?;
            }
            record.assignee_id = assignee_id;
        }

        let now = Utc::now();
        if let Some(status) = input.status {
            record.status = status;
        }
        record.completed_at = if record.status == TaskStatus::Done {
            record.completed_at.or(Some(now))
        } else {
            None
        };
        record.updated_at = now;

        tables.tasks.insert(id, record.clone());
        tracing::debug!(task_id = id, status = record.status.as_str(), "Updated task");
        Ok(Some(record))
    }

    async fn delete_task(&self, id: i64) -> Result<bool, DatabaseError> {
        let removed = self.tables.write().await.tasks.remove(&id).is_some();
        if removed {
            tracing::debug!(task_id = id, "Deleted task");
        }
        Ok(removed)
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn list_documents(
        &self,
        query: &DocumentQuery,
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        let scope = member_scope(&tables, query.visible_to);
        Ok(tables
            .documents
            .values()
            .filter(|d| scope.as_ref().is_none_or(|s| s.covers_case(d.case_id)))
            .filter(|d| query.matches(d))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn get_document(&self, id: i64) -> Result<Option<DocumentRecord>, DatabaseError> {
        Ok(self.tables.read().await.documents.get(&id).cloned())
    }

    async fn create_document(
        &self,
        input: &CreateDocumentParams,
    ) -> Result<DocumentRecord, DatabaseError> {
        let name = require_text("name", &input.name)?;

        let mut tables = self.tables.write().await;
        ensure_case(&tables, input.case_id)?;
        ensure_user(&tables, input.uploaded_by_id)?;

        let Tables {
            documents,
            document_ids,
            ..
        } = &mut *tables;
        let id = document_ids.allocate(documents);
        let record = DocumentRecord {
            id,
            file_path: normalize_optional_text(input.file_path.clone())
                .unwrap_or_else(|| format!("/documents/{name}")),
            file_type: normalize_optional_text(input.file_type.clone())
                .or_else(|| extension_of(&name)),
            name,
            document_type: normalize_optional_text(input.document_type.clone()),
            file_size: input.file_size,
            case_id: input.case_id,
            uploaded_by_id: input.uploaded_by_id,
            uploaded_at: Utc::now(),
        };
        documents.insert(id, record.clone());
        tracing::debug!(document_id = id, case_id = record.case_id, "Created document");
        Ok(record)
    }

    async fn delete_document(&self, id: i64) -> Result<bool, DatabaseError> {
        let removed = self.tables.write().await.documents.remove(&id).is_some();
        if removed {
            tracing::debug!(document_id = id, "Deleted document");
        }
        Ok(removed)
    }
}

#[async_trait]
impl NoteStore for MemoryBackend {
    async fn list_notes(&self, query: &NoteQuery) -> Result<Vec<NoteRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        let scope = member_scope(&tables, query.visible_to);
        let mut notes: Vec<NoteRecord> = tables
            .notes
            .values()
            .filter(|n| scope.as_ref().is_none_or(|s| s.covers_case(n.case_id)))
            .filter(|n| query.matches(n))
            .cloned()
            .collect();
        notes.sort_by(note_display_order);
        notes.truncate(query.limit);
        Ok(notes)
    }

    async fn get_note(&self, id: i64) -> Result<Option<NoteRecord>, DatabaseError> {
        Ok(self.tables.read().await.notes.get(&id).cloned())
    }

    async fn create_note(&self, input: &CreateNoteParams) -> Result<NoteRecord, DatabaseError> {
        let content = require_text("content", &input.content)?;

        let mut tables = self.tables.write().await;
        ensure_case(&tables, input.case_id)?;
        ensure_user(&tables, input.author_id)?;

        let Tables {
            notes, note_ids, ..
        } = &mut *tables;
        let id = note_ids.allocate(notes);
        let now = Utc::now();
        let record = NoteRecord {
            id,
            content,
            case_id: input.case_id,
            author_id: input.author_id,
            is_pinned: input.is_pinned,
            created_at: now,
            updated_at: now,
        };
        notes.insert(id, record.clone());
        tracing::debug!(note_id = id, case_id = record.case_id, "Created note");
        Ok(record)
    }

    async fn update_note(
        &self,
        id: i64,
        input: &UpdateNoteParams,
    ) -> Result<Option<NoteRecord>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.notes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = &input.content {
            record.content = require_text("content", content)?;
        }
        if let Some(is_pinned) = input.is_pinned {
            record.is_pinned = is_pinned;
        }
        record.updated_at = Utc::now();
        tracing::debug!(note_id = id, "Updated note");
        Ok(Some(record.clone()))
    }

    async fn delete_note(&self, id: i64) -> Result<bool, DatabaseError> {
        let removed = self.tables.write().await.notes.remove(&id).is_some();
        if removed {
            tracing::debug!(note_id = id, "Deleted note");
        }
        Ok(removed)
    }
}

#[async_trait]
impl CaseTeamStore for MemoryBackend {
    async fn case_team(&self, case_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .case_assistants
            .range((case_id, i64::MIN)..=(case_id, i64::MAX))
            .map(|(_, assistant_id)| *assistant_id)
            .collect())
    }

    async fn assign_assistant(
        &self,
        case_id: i64,
        assistant_id: i64,
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        ensure_case(&tables, case_id)?;
        match tables.users.get(&assistant_id) {
            Some(user) if user.role == UserRole::Assistant => {}
            Some(_) => {
                return Err(DatabaseError::Constraint(format!(
                    "User {assistant_id} is not an assistant"
                )));
            }
            None => return Err(missing("User", assistant_id)),
        }
        if !tables.case_assistants.insert((case_id, assistant_id)) {
            return Err(DatabaseError::Constraint(
                "Assistant already assigned".to_string(),
            ));
        }
        tracing::debug!(case_id, assistant_id, "Assigned assistant");
        Ok(())
    }

    async fn remove_assistant(
        &self,
        case_id: i64,
        assistant_id: i64,
    ) -> Result<bool, DatabaseError> {
        let removed = self
            .tables
            .write()
            .await
            .case_assistants
            .remove(&(case_id, assistant_id));
        if removed {
            tracing::debug!(case_id, assistant_id, "Removed assistant");
        }
        Ok(removed)
    }
}

#[async_trait]
impl CompanyStore for MemoryBackend {
    async fn list_companies(
        &self,
        query: &CompanyQuery,
    ) -> Result<Vec<CompanyRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .companies
            .values()
            .filter(|c| query.matches(c))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn get_company(&self, id: i64) -> Result<Option<CompanyRecord>, DatabaseError> {
        Ok(self.tables.read().await.companies.get(&id).cloned())
    }

    async fn create_company(
        &self,
        input: &CreateCompanyParams,
    ) -> Result<CompanyRecord, DatabaseError> {
        let name = require_text("name", &input.name)?;

        let mut tables = self.tables.write().await;
        let Tables {
            companies,
            company_ids,
            ..
        } = &mut *tables;
        let id = company_ids.allocate(companies);
        let record = CompanyRecord {
            id,
            name,
            company_type: normalize_optional_text(input.company_type.clone()),
            contact_info: normalize_optional_text(input.contact_info.clone()),
            created_at: Utc::now(),
        };
        companies.insert(id, record.clone());
        tracing::debug!(company_id = id, "Created company");
        Ok(record)
    }

    async fn case_companies(&self, case_id: i64) -> Result<Vec<CaseCompanyRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .case_companies
            .range((case_id, i64::MIN)..=(case_id, i64::MAX))
            .map(|(_, link)| link.clone())
            .collect())
    }

    async fn link_company(
        &self,
        link: &CaseCompanyRecord,
    ) -> Result<CaseCompanyRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        ensure_case(&tables, link.case_id)?;
        ensure_company(&tables, link.company_id)?;
        let key = (link.case_id, link.company_id);
        if tables.case_companies.contains_key(&key) {
            return Err(DatabaseError::Constraint(
                "Company already linked to case".to_string(),
            ));
        }
        let record = CaseCompanyRecord {
            relationship_type: normalize_optional_text(link.relationship_type.clone()),
            ..link.clone()
        };
        tables.case_companies.insert(key, record.clone());
        tracing::debug!(
            case_id = link.case_id,
            company_id = link.company_id,
            "Linked company"
        );
        Ok(record)
    }

    async fn unlink_company(&self, case_id: i64, company_id: i64) -> Result<bool, DatabaseError> {
        let removed = self
            .tables
            .write()
            .await
            .case_companies
            .remove(&(case_id, company_id))
            .is_some();
        if removed {
            tracing::debug!(case_id, company_id, "Unlinked company");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::{CaseStatus, Database, TaskPriority, UserRole};

    fn password(raw: &str) -> SecretString {
        SecretString::from(raw.to_string())
    }

    async fn user(db: &MemoryBackend, email: &str, role: UserRole) -> UserRecord {
        db.create_user(&CreateUserParams {
            email: email.to_string(),
            full_name: email.to_string(),
            role,
            is_active: true,
            password: Some(password("password")),
        })
        .await
        .expect("create user")
    }

    async fn client(db: &MemoryBackend, name: &str) -> ClientRecord {
        db.create_client(&CreateClientParams {
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            is_active: true,
        })
        .await
        .expect("create client")
    }

    fn case_params(client_id: i64, title: &str) -> CreateCaseParams {
        CreateCaseParams {
            title: title.to_string(),
            description: None,
            case_type: None,
            status: CaseStatus::Open,
            client_id,
            primary_attorney_id: None,
            opened_date: None,
            next_hearing_date: None,
            statute_of_limitations: None,
        }
    }

    fn task_params(case_id: i64, created_by_id: i64) -> CreateTaskParams {
        CreateTaskParams {
            title: "Draft motion".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            case_id,
            assignee_id: None,
            created_by_id,
        }
    }

    fn note_params(case_id: i64, author_id: i64, pinned: bool) -> CreateNoteParams {
        CreateNoteParams {
            content: "Called opposing counsel".to_string(),
            case_id,
            author_id,
            is_pinned: pinned,
        }
    }

    fn document_params(case_id: i64, uploaded_by_id: i64, name: &str) -> CreateDocumentParams {
        CreateDocumentParams {
            name: name.to_string(),
            file_path: None,
            file_type: None,
            document_type: Some("pleading".to_string()),
            file_size: Some(2048),
            case_id,
            uploaded_by_id,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_server_assigned_fields() {
        let db = MemoryBackend::new();
        let acme = client(&db, "Acme").await;
        let case = db
            .create_case(&case_params(acme.id, "Acme v. Widgets"))
            .await
            .expect("create case");

        let fetched = db.get_case(case.id).await.expect("get").expect("exists");
        assert_eq!(fetched, case);
        assert_eq!(fetched.status, CaseStatus::Open);
        let year = Utc::now().year();
        assert_eq!(fetched.case_number, format!("CASE-{year}-001"));
        assert_eq!(db.backend_name(), "memory");
    }

    #[tokio::test]
    async fn case_numbers_increase_within_the_year() {
        let db = MemoryBackend::new();
        let acme = client(&db, "Acme").await;
        let mut numbers = Vec::new();
        for title in ["One", "Two", "Three"] {
            let case = db
                .create_case(&case_params(acme.id, title))
                .await
                .expect("create case");
            numbers.push(case.case_number);
        }
        db.delete_case(3).await.expect("delete");
        let fourth = db
            .create_case(&case_params(acme.id, "Four"))
            .await
            .expect("create case");

        let year = Utc::now().year();
        assert_eq!(numbers[2], format!("CASE-{year}-003"));
        assert_eq!(fourth.id, 4);
        assert_eq!(fourth.case_number, format!("CASE-{year}-004"));
    }

    #[tokio::test]
    async fn deleting_a_case_cascades_only_to_its_dependents() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;
        let acme = client(&db, "Acme").await;
        let doomed = db.create_case(&case_params(acme.id, "A")).await.expect("case");
        let kept = db.create_case(&case_params(acme.id, "B")).await.expect("case");

        for case_id in [doomed.id, kept.id] {
            db.create_task(&task_params(case_id, owner.id)).await.expect("task");
            db.create_note(&note_params(case_id, owner.id, false))
                .await
                .expect("note");
            db.create_document(&document_params(case_id, owner.id, "brief.pdf"))
                .await
                .expect("document");
        }

        assert!(db.delete_case(doomed.id).await.expect("delete"));
        assert!(!db.delete_case(doomed.id).await.expect("second delete"));

        let today = Utc::now().date_naive();
        let tasks = db.list_tasks(&TaskQuery::default(), today).await.expect("tasks");
        let notes = db.list_notes(&NoteQuery::default()).await.expect("notes");
        let docs = db
            .list_documents(&DocumentQuery::default())
            .await
            .expect("docs");
        assert!(tasks.iter().all(|t| t.case_id == kept.id) && tasks.len() == 1);
        assert!(notes.iter().all(|n| n.case_id == kept.id) && notes.len() == 1);
        assert!(docs.iter().all(|d| d.case_id == kept.id) && docs.len() == 1);
    }

    #[tokio::test]
    async fn completed_at_follows_done_transitions() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;
        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");
        let task = db.create_task(&task_params(case.id, owner.id)).await.expect("task");
        assert_eq!(task.completed_at, None);

        let done = UpdateTaskParams {
            status: Some(TaskStatus::Done),
            ..UpdateTaskParams::default()
        };
        let first = db.update_task(task.id, &done).await.expect("update").expect("exists");
        let stamp = first.completed_at.expect("completed_at set");

        let again = db.update_task(task.id, &done).await.expect("update").expect("exists");
        assert_eq!(again.completed_at, Some(stamp));

        let renamed = db
            .update_task(
                task.id,
                &UpdateTaskParams {
                    title: Some("Renamed".to_string()),
                    ..UpdateTaskParams::default()
                },
            )
            .await
            .expect("update")
            .expect("exists");
        assert_eq!(renamed.completed_at, Some(stamp));

        let reopened = db
            .update_task(
                task.id,
                &UpdateTaskParams {
                    status: Some(TaskStatus::InProgress),
                    ..UpdateTaskParams::default()
                },
            )
            .await
            .expect("update")
            .expect("exists");
        assert_eq!(reopened.completed_at, None);
    }

    #[tokio::test]
    async fn overdue_listing_skips_done_and_future_tasks() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;
        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).expect("date");

        for (status, due) in [
            (TaskStatus::Todo, Some(today - Duration::days(2))),
            (TaskStatus::Done, Some(today - Duration::days(2))),
            (TaskStatus::Todo, Some(today)),
            (TaskStatus::Todo, Some(today + Duration::days(1))),
            (TaskStatus::Todo, None),
        ] {
            db.create_task(&CreateTaskParams {
                status,
                due_date: due,
                ..task_params(case.id, owner.id)
            })
            .await
            .expect("task");
        }

        let overdue = db
            .list_tasks(
                &TaskQuery {
                    overdue_only: true,
                    ..TaskQuery::default()
                },
                today,
            )
            .await
            .expect("overdue");
        assert_eq!(overdue.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1]);

        let due_today = db
            .list_tasks(
                &TaskQuery {
                    due_today: true,
                    ..TaskQuery::default()
                },
                today,
            )
            .await
            .expect("due today");
        assert_eq!(due_today.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn notes_list_pinned_first_then_newest() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;
        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");
        for pinned in [false, true, false, true] {
            db.create_note(&note_params(case.id, owner.id, pinned))
                .await
                .expect("note");
        }

        let notes = db.list_notes(&NoteQuery::default()).await.expect("notes");
        assert_eq!(
            notes.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![4, 2, 3, 1]
        );

        let pinned = db
            .list_notes(&NoteQuery {
                pinned_only: true,
                limit: 1,
                ..NoteQuery::default()
            })
            .await
            .expect("pinned");
        assert_eq!(pinned.iter().map(|n| n.id).collect::<Vec<_>>(), vec![4]);
    }

    #[tokio::test]
    async fn client_with_cases_cannot_be_deleted() {
        let db = MemoryBackend::new();
        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");

        let err = db.delete_client(acme.id).await.expect_err("restricted");
        assert_eq!(err.to_string(), "Cannot delete client with existing cases");

        db.delete_case(case.id).await.expect("delete case");
        assert!(db.delete_client(acme.id).await.expect("delete client"));
        assert!(!db.delete_client(acme.id).await.expect("already gone"));
    }

    #[tokio::test]
    async fn writes_reject_dangling_references() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;

        let err = db
            .create_case(&case_params(41, "Orphan"))
            .await
            .expect_err("missing client");
        assert_eq!(err.to_string(), "Client 41 does not exist");

        let err = db
            .create_task(&task_params(9, owner.id))
            .await
            .expect_err("missing case");
        assert!(matches!(err, DatabaseError::Constraint(_)));

        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");
        let err = db
            .update_case(
                case.id,
                &UpdateCaseParams {
                    primary_attorney_id: Some(Some(77)),
                    ..UpdateCaseParams::default()
                },
            )
            .await
            .expect_err("missing attorney");
        assert_eq!(err.to_string(), "User 77 does not exist");
    }

    #[tokio::test]
    async fn explicit_null_clears_nullable_fields() {
        let db = MemoryBackend::new();
        let created = db
            .create_client(&CreateClientParams {
                name: "Acme".to_string(),
                email: Some("legal@acme.test".to_string()),
                phone: Some("555-0199".to_string()),
                address: None,
                is_active: true,
            })
            .await
            .expect("client");

        let updated = db
            .update_client(
                created.id,
                &UpdateClientParams {
                    email: Some(None),
                    ..UpdateClientParams::default()
                },
            )
            .await
            .expect("update")
            .expect("exists");
        assert_eq!(updated.email, None);
        assert_eq!(updated.phone.as_deref(), Some("555-0199"));
        assert!(updated.updated_at >= created.updated_at);

        assert!(
            db.update_client(99, &UpdateClientParams::default())
                .await
                .expect("update")
                .is_none()
        );
    }

    #[tokio::test]
    async fn emails_are_unique_ignoring_case() {
        let db = MemoryBackend::new();
        user(&db, "owner@firm.com", UserRole::Owner).await;
        let err = db
            .create_user(&CreateUserParams {
                email: "Owner@Firm.com".to_string(),
                full_name: "Copy".to_string(),
                role: UserRole::Lawyer,
                is_active: true,
                password: None,
            })
            .await
            .expect_err("duplicate");
        assert_eq!(err.to_string(), "Email already registered");

        let found = db
            .find_user_by_email("OWNER@firm.com")
            .await
            .expect("lookup");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn password_checks_use_stored_digest() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;
        assert!(db.verify_password(owner.id, &password("password")).await.expect("verify"));
        assert!(!db.verify_password(owner.id, &password("nope")).await.expect("verify"));

        db.update_user(
            owner.id,
            &UpdateUserParams {
                password: Some(password("rotated")),
                ..UpdateUserParams::default()
            },
        )
        .await
        .expect("rotate");
        assert!(db.verify_password(owner.id, &password("rotated")).await.expect("verify"));

        let no_password = db
            .create_user(&CreateUserParams {
                email: "clerk@firm.com".to_string(),
                full_name: "Clerk".to_string(),
                role: UserRole::Assistant,
                is_active: true,
                password: None,
            })
            .await
            .expect("user");
        assert!(!db.verify_password(no_password.id, &password("")).await.expect("verify"));
    }

    #[tokio::test]
    async fn documents_default_path_and_type_from_name() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;
        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");

        let doc = db
            .create_document(&document_params(case.id, owner.id, "Complaint.PDF"))
            .await
            .expect("document");
        assert_eq!(doc.file_path, "/documents/Complaint.PDF");
        assert_eq!(doc.file_type.as_deref(), Some("pdf"));

        let filtered = db
            .list_documents(&DocumentQuery {
                document_type: Some("evidence".to_string()),
                ..DocumentQuery::default()
            })
            .await
            .expect("list");
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn list_limit_returns_a_prefix_in_id_order() {
        let db = MemoryBackend::new();
        for name in ["A", "B", "C", "D"] {
            client(&db, name).await;
        }
        let page = db
            .list_clients(&ClientQuery {
                limit: 2,
                ..ClientQuery::default()
            })
            .await
            .expect("list");
        assert_eq!(page.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn case_delete_drops_team_rows_and_company_links() {
        let db = MemoryBackend::new();
        let assistant = user(&db, "aide@firm.com", UserRole::Assistant).await;
        let acme = client(&db, "Acme").await;
        let doomed = db.create_case(&case_params(acme.id, "A")).await.expect("case");
        let kept = db.create_case(&case_params(acme.id, "B")).await.expect("case");
        let insurer = db
            .create_company(&CreateCompanyParams {
                name: "Shield Mutual".to_string(),
                company_type: Some("insurer".to_string()),
                contact_info: None,
            })
            .await
            .expect("company");

        for case_id in [doomed.id, kept.id] {
            db.assign_assistant(case_id, assistant.id).await.expect("assign");
            db.link_company(&CaseCompanyRecord {
                case_id,
                company_id: insurer.id,
                relationship_type: Some(" insurer ".to_string()),
            })
            .await
            .expect("link");
        }

        assert!(db.delete_case(doomed.id).await.expect("delete"));

        assert!(db.case_team(doomed.id).await.expect("team").is_empty());
        assert!(db.case_companies(doomed.id).await.expect("links").is_empty());
        assert_eq!(db.case_team(kept.id).await.expect("team"), vec![assistant.id]);
        let links = db.case_companies(kept.id).await.expect("links");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].relationship_type.as_deref(), Some("insurer"));
    }

    #[tokio::test]
    async fn team_assignment_rejects_duplicates_and_non_assistants() {
        let db = MemoryBackend::new();
        let lawyer = user(&db, "lawyer@firm.com", UserRole::Lawyer).await;
        let assistant = user(&db, "aide@firm.com", UserRole::Assistant).await;
        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");

        db.assign_assistant(case.id, assistant.id).await.expect("assign");
        let dup = db
            .assign_assistant(case.id, assistant.id)
            .await
            .expect_err("duplicate");
        assert_eq!(dup.to_string(), "Assistant already assigned");
        assert!(db.assign_assistant(case.id, lawyer.id).await.is_err());
        assert!(db.assign_assistant(99, assistant.id).await.is_err());

        assert!(db.delete_user(assistant.id).await.expect("delete user"));
        assert!(db.case_team(case.id).await.expect("team").is_empty());
        assert!(!db.remove_assistant(case.id, assistant.id).await.expect("remove"));
    }

    #[tokio::test]
    async fn member_listings_cover_only_their_cases() {
        let db = MemoryBackend::new();
        let owner = user(&db, "owner@firm.com", UserRole::Owner).await;
        let lawyer = user(&db, "lawyer@firm.com", UserRole::Lawyer).await;
        let assistant = user(&db, "aide@firm.com", UserRole::Assistant).await;
        let acme = client(&db, "Acme").await;
        let mine = db
            .create_case(&CreateCaseParams {
                primary_attorney_id: Some(lawyer.id),
                ..case_params(acme.id, "Mine")
            })
            .await
            .expect("case");
        let other = db.create_case(&case_params(acme.id, "Other")).await.expect("case");
        db.assign_assistant(other.id, assistant.id).await.expect("assign");

        for case_id in [mine.id, other.id] {
            db.create_note(&note_params(case_id, owner.id, false))
                .await
                .expect("note");
            db.create_document(&document_params(case_id, owner.id, "brief.pdf"))
                .await
                .expect("document");
        }
        let assigned_off_team = db
            .create_task(&CreateTaskParams {
                assignee_id: Some(lawyer.id),
                ..task_params(other.id, owner.id)
            })
            .await
            .expect("task");
        db.create_task(&task_params(other.id, owner.id)).await.expect("task");

        let cases = db
            .list_cases(&CaseQuery {
                visible_to: Some(lawyer.id),
                ..CaseQuery::default()
            })
            .await
            .expect("cases");
        assert_eq!(cases.iter().map(|c| c.id).collect::<Vec<_>>(), vec![mine.id]);

        let today = Utc::now().date_naive();
        let tasks = db
            .list_tasks(
                &TaskQuery {
                    visible_to: Some(lawyer.id),
                    ..TaskQuery::default()
                },
                today,
            )
            .await
            .expect("tasks");
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![assigned_off_team.id]
        );

        let notes = db
            .list_notes(&NoteQuery {
                visible_to: Some(assistant.id),
                ..NoteQuery::default()
            })
            .await
            .expect("notes");
        assert!(notes.iter().all(|n| n.case_id == other.id) && notes.len() == 1);

        let docs = db
            .list_documents(&DocumentQuery {
                visible_to: Some(assistant.id),
                ..DocumentQuery::default()
            })
            .await
            .expect("docs");
        assert!(docs.iter().all(|d| d.case_id == other.id) && docs.len() == 1);

        let everything = db.list_cases(&CaseQuery::default()).await.expect("cases");
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn companies_filter_and_refuse_double_links() {
        let db = MemoryBackend::new();
        let acme = client(&db, "Acme").await;
        let case = db.create_case(&case_params(acme.id, "A")).await.expect("case");
        for (name, kind) in [("Shield Mutual", "insurer"), ("Forensic Partners", "expert")] {
            db.create_company(&CreateCompanyParams {
                name: name.to_string(),
                company_type: Some(kind.to_string()),
                contact_info: None,
            })
            .await
            .expect("company");
        }

        let experts = db
            .list_companies(&CompanyQuery {
                company_type: Some("expert".to_string()),
                ..CompanyQuery::default()
            })
            .await
            .expect("list");
        assert_eq!(experts.len(), 1);
        assert_eq!(experts[0].name, "Forensic Partners");

        let link = CaseCompanyRecord {
            case_id: case.id,
            company_id: 1,
            relationship_type: None,
        };
        db.link_company(&link).await.expect("link");
        let dup = db.link_company(&link).await.expect_err("duplicate");
        assert_eq!(dup.to_string(), "Company already linked to case");
        assert!(
            db.link_company(&CaseCompanyRecord {
                company_id: 42,
                ..link.clone()
            })
            .await
            .is_err()
        );
        assert!(db.unlink_company(case.id, 1).await.expect("unlink"));
        assert!(!db.unlink_company(case.id, 1).await.expect("unlink again"));
    }
}
