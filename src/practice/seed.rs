//! Demo data for a fresh store.
//!
//! Rows are created through the regular store calls, so they get ids, case
//! numbers and timestamps exactly as API-created rows do.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use secrecy::SecretString;
use serde::Deserialize;

use crate::db::{
    CaseCompanyRecord, CaseStatus, CreateCaseParams, CreateClientParams, CreateCompanyParams,
    CreateDocumentParams, CreateNoteParams, CreateTaskParams, CreateUserParams, Database,
    TaskPriority, TaskStatus, UserQuery, UserRole,
};
use crate::error::DatabaseError;

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    clients: Vec<SeedClient>,
    #[serde(default)]
    cases: Vec<SeedCase>,
    #[serde(default)]
    tasks: Vec<SeedTask>,
    #[serde(default)]
    documents: Vec<SeedDocument>,
    #[serde(default)]
    notes: Vec<SeedNote>,
    #[serde(default)]
    case_assistants: Vec<SeedAssignment>,
    #[serde(default)]
    companies: Vec<SeedCompany>,
    #[serde(default)]
    case_companies: Vec<SeedCompanyLink>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    email: String,
    full_name: String,
    role: String,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedClient {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedCase {
    title: String,
    description: Option<String>,
    case_type: Option<String>,
    status: String,
    client: String,
    primary_attorney: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedTask {
    case: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<NaiveDate>,
    assignee: Option<String>,
    created_by: String,
}

#[derive(Debug, Deserialize)]
struct SeedDocument {
    case: String,
    name: String,
    document_type: Option<String>,
    file_size: Option<u64>,
    uploaded_by: String,
}

#[derive(Debug, Deserialize)]
struct SeedNote {
    case: String,
    author: String,
    content: String,
    #[serde(default)]
    pinned: bool,
}

#[derive(Debug, Deserialize)]
struct SeedAssignment {
    case: String,
    assistant: String,
}

#[derive(Debug, Deserialize)]
struct SeedCompany {
    name: String,
    company_type: Option<String>,
    contact_info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedCompanyLink {
    case: String,
    company: String,
    relationship_type: Option<String>,
}

static SEED: LazyLock<Result<SeedFile, String>> = LazyLock::new(|| {
    toml::from_str(include_str!("seed.toml")).map_err(|e| format!("invalid seed TOML: {}", e))
});

/// Row counts written by [`seed_store`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub clients: usize,
    pub cases: usize,
    pub tasks: usize,
    pub documents: usize,
    pub notes: usize,
    pub case_assistants: usize,
    pub companies: usize,
    pub case_companies: usize,
}

fn bad_seed(message: String) -> DatabaseError {
    DatabaseError::Serialization(message)
}

fn lookup(index: &HashMap<String, i64>, kind: &str, key: &str) -> Result<i64, DatabaseError> {
    index
        .get(key)
        .copied()
        .ok_or_else(|| bad_seed(format!("seed {kind} '{key}' is not defined")))
}

/// Load the bundled demo data. A store that already has users is left alone.
pub async fn seed_store(db: &dyn Database) -> Result<SeedSummary, DatabaseError> {
    if !db.list_users(&UserQuery { limit: 1 }).await?.is_empty() {
        tracing::info!("Store already populated, skipping seed data");
        return Ok(SeedSummary::default());
    }
    let seed = SEED.as_ref().map_err(|e| bad_seed(e.clone()))?;
    let mut summary = SeedSummary::default();

    let mut users = HashMap::new();
    for user in &seed.users {
        let role = UserRole::from_db_value(&user.role)
            .ok_or_else(|| bad_seed(format!("invalid role '{}' in seed data", user.role)))?;
        let record = db
            .create_user(&CreateUserParams {
                email: user.email.clone(),
                full_name: user.full_name.clone(),
                role,
                is_active: true,
                password: user.password.clone().map(SecretString::from),
            })
            .await?;
        users.insert(record.email.clone(), record.id);
        summary.users += 1;
    }

    let mut clients = HashMap::new();
    for client in &seed.clients {
        let record = db
            .create_client(&CreateClientParams {
                name: client.name.clone(),
                email: client.email.clone(),
                phone: client.phone.clone(),
                address: client.address.clone(),
                is_active: true,
            })
            .await?;
        clients.insert(record.name.clone(), record.id);
        summary.clients += 1;
    }

    let mut cases = HashMap::new();
    for case in &seed.cases {
        let status = CaseStatus::from_db_value(&case.status)
            .ok_or_else(|| bad_seed(format!("invalid case status '{}'", case.status)))?;
        let primary_attorney_id = case
            .primary_attorney
            .as_deref()
            .map(|email| lookup(&users, "user", email))
            .transpose()?;
        let record = db
            .create_case(&CreateCaseParams {
                title: case.title.clone(),
                description: case.description.clone(),
                case_type: case.case_type.clone(),
                status,
                client_id: lookup(&clients, "client", &case.client)?,
                primary_attorney_id,
                opened_date: None,
                next_hearing_date: None,
                statute_of_limitations: None,
            })
            .await?;
        cases.insert(record.title.clone(), record.id);
        summary.cases += 1;
    }

    for task in &seed.tasks {
        let status = TaskStatus::from_db_value(&task.status)
            .ok_or_else(|| bad_seed(format!("invalid task status '{}'", task.status)))?;
        let priority = TaskPriority::from_db_value(&task.priority)
            .ok_or_else(|| bad_seed(format!("invalid task priority '{}'", task.priority)))?;
        let assignee_id = task
            .assignee
            .as_deref()
            .map(|email| lookup(&users, "user", email))
            .transpose()?;
        db.create_task(&CreateTaskParams {
            title: task.title.clone(),
            description: task.description.clone(),
            status,
            priority,
            due_date: task.due_date,
            case_id: lookup(&cases, "case", &task.case)?,
            assignee_id,
            created_by_id: lookup(&users, "user", &task.created_by)?,
        })
        .await?;
        summary.tasks += 1;
    }

    for document in &seed.documents {
        db.create_document(&CreateDocumentParams {
            name: document.name.clone(),
            file_path: None,
            file_type: None,
            document_type: document.document_type.clone(),
            file_size: document.file_size,
            case_id: lookup(&cases, "case", &document.case)?,
            uploaded_by_id: lookup(&users, "user", &document.uploaded_by)?,
        })
        .await?;
        summary.documents += 1;
    }

    for note in &seed.notes {
        db.create_note(&CreateNoteParams {
            content: note.content.clone(),
            case_id: lookup(&cases, "case", &note.case)?,
            author_id: lookup(&users, "user", &note.author)?,
            is_pinned: note.pinned,
        })
        .await?;
        summary.notes += 1;
    }

    for assignment in &seed.case_assistants {
        db.assign_assistant(
            lookup(&cases, "case", &assignment.case)?,
            lookup(&users, "user", &assignment.assistant)?,
        )
        .await?;
        summary.case_assistants += 1;
    }

    let mut companies = HashMap::new();
    for company in &seed.companies {
        let record = db
            .create_company(&CreateCompanyParams {
                name: company.name.clone(),
                company_type: company.company_type.clone(),
                contact_info: company.contact_info.clone(),
            })
            .await?;
        companies.insert(record.name.clone(), record.id);
        summary.companies += 1;
    }

    for link in &seed.case_companies {
        db.link_company(&CaseCompanyRecord {
            case_id: lookup(&cases, "case", &link.case)?,
            company_id: lookup(&companies, "company", &link.company)?,
            relationship_type: link.relationship_type.clone(),
        })
        .await?;
        summary.case_companies += 1;
    }

    tracing::info!(
        users = summary.users,
        clients = summary.clients,
        cases = summary.cases,
        tasks = summary.tasks,
        documents = summary.documents,
        notes = summary.notes,
        case_assistants = summary.case_assistants,
        companies = summary.companies,
        "Loaded seed data"
    );
    Ok(summary)
}
