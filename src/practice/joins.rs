//! Read-time embeds.
//!
//! Stored rows carry foreign keys only. Before a row leaves the API it is
//! wrapped in a view that flattens the record and attaches snapshots of the
//! rows it points at. A reference to a row that no longer exists embeds as
//! `null`. List variants load each referenced table once per call instead of
//! once per row.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{
    CaseCompanyRecord, CaseQuery, CaseRecord, ClientQuery, ClientRecord, CompanyRecord, Database,
    DocumentRecord, NoteRecord, TaskRecord, UserQuery, UserRecord,
};
use crate::error::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseView {
    #[serde(flatten)]
    pub case: CaseRecord,
    pub client: Option<ClientRecord>,
    pub primary_attorney: Option<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: TaskRecord,
    pub case: Option<CaseRecord>,
    pub assignee: Option<UserRecord>,
    pub creator: Option<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: DocumentRecord,
    pub uploaded_by: Option<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteView {
    #[serde(flatten)]
    pub note: NoteRecord,
    pub author: Option<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseCompanyView {
    #[serde(flatten)]
    pub link: CaseCompanyRecord,
    pub company: Option<CompanyRecord>,
}

async fn user_index(db: &dyn Database) -> Result<HashMap<i64, UserRecord>, DatabaseError> {
    Ok(db
        .list_users(&UserQuery::unbounded())
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

async fn client_index(db: &dyn Database) -> Result<HashMap<i64, ClientRecord>, DatabaseError> {
    Ok(db
        .list_clients(&ClientQuery::unbounded())
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

async fn case_index(db: &dyn Database) -> Result<HashMap<i64, CaseRecord>, DatabaseError> {
    Ok(db
        .list_cases(&CaseQuery::unbounded())
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

async fn optional_user(
    db: &dyn Database,
    id: Option<i64>,
) -> Result<Option<UserRecord>, DatabaseError> {
    match id {
        Some(id) => db.get_user(id).await,
        None => Ok(None),
    }
}

pub async fn case_view(db: &dyn Database, case: CaseRecord) -> Result<CaseView, DatabaseError> {
    let client = db.get_client(case.client_id).await?;
    let primary_attorney = optional_user(db, case.primary_attorney_id).await?;
    Ok(CaseView {
        case,
        client,
        primary_attorney,
    })
}

pub async fn case_views(
    db: &dyn Database,
    cases: Vec<CaseRecord>,
) -> Result<Vec<CaseView>, DatabaseError> {
    if cases.is_empty() {
        return Ok(Vec::new());
    }
    let users = user_index(db).await?;
    let clients = client_index(db).await?;
    Ok(cases
        .into_iter()
        .map(|case| CaseView {
            client: clients.get(&case.client_id).cloned(),
            primary_attorney: case
                .primary_attorney_id
                .and_then(|id| users.get(&id).cloned()),
            case,
        })
        .collect())
}

pub async fn task_view(db: &dyn Database, task: TaskRecord) -> Result<TaskView, DatabaseError> {
    let case = db.get_case(task.case_id).await?;
    let assignee = optional_user(db, task.assignee_id).await?;
    let creator = db.get_user(task.created_by_id).await?;
    Ok(TaskView {
        task,
        case,
        assignee,
        creator,
    })
}

pub async fn task_views(
    db: &dyn Database,
    tasks: Vec<TaskRecord>,
) -> Result<Vec<TaskView>, DatabaseError> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }
    let users = user_index(db).await?;
    let cases = case_index(db).await?;
    Ok(tasks
        .into_iter()
        .map(|task| TaskView {
            case: cases.get(&task.case_id).cloned(),
            assignee: task.assignee_id.and_then(|id| users.get(&id).cloned()),
            creator: users.get(&task.created_by_id).cloned(),
            task,
        })
        .collect())
}

pub async fn document_view(
    db: &dyn Database,
    document: DocumentRecord,
) -> Result<DocumentView, DatabaseError> {
    let uploaded_by = db.get_user(document.uploaded_by_id).await?;
    Ok(DocumentView {
        document,
        uploaded_by,
    })
}

pub async fn document_views(
    db: &dyn Database,
    documents: Vec<DocumentRecord>,
) -> Result<Vec<DocumentView>, DatabaseError> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }
    let users = user_index(db).await?;
    Ok(documents
        .into_iter()
        .map(|document| DocumentView {
            uploaded_by: users.get(&document.uploaded_by_id).cloned(),
            document,
        })
        .collect())
}

pub async fn note_view(db: &dyn Database, note: NoteRecord) -> Result<NoteView, DatabaseError> {
    let author = db.get_user(note.author_id).await?;
    Ok(NoteView { note, author })
}

pub async fn note_views(
    db: &dyn Database,
    notes: Vec<NoteRecord>,
) -> Result<Vec<NoteView>, DatabaseError> {
    if notes.is_empty() {
        return Ok(Vec::new());
    }
    let users = user_index(db).await?;
    Ok(notes
        .into_iter()
        .map(|note| NoteView {
            author: users.get(&note.author_id).cloned(),
            note,
        })
        .collect())
}

pub async fn case_company_views(
    db: &dyn Database,
    links: Vec<CaseCompanyRecord>,
) -> Result<Vec<CaseCompanyView>, DatabaseError> {
    let mut views = Vec::with_capacity(links.len());
    for link in links {
        let company = db.get_company(link.company_id).await?;
        views.push(CaseCompanyView { link, company });
    }
    Ok(views)
}
