//! Role-gated permissions.
//!
//! The Owner sees every case. Everyone else sees the cases they work on: as
//! primary attorney or as an assistant on the case team. Tasks, documents and
//! notes follow their case, except that a task stays visible to its assignee
//! and creator. Clients, companies and the owner-only user directory are not
//! case-bound.
//!
//! Writes depend on the actor's role and, for some rows, on whether the actor
//! is the row's attorney, assignee, creator, uploader or author. Turning
//! enforcement off lets every active user do everything; the self-delete
//! guard on users stays on regardless.

use crate::db::{
    CaseRecord, DocumentRecord, NoteRecord, TaskRecord, UpdateTaskParams, UserRecord, UserRole,
};
use crate::error::ApiError;

const DENIED: &str = "Not enough permissions";

fn denied() -> ApiError {
    ApiError::Forbidden(DENIED.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    enforce: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self { enforce: true }
    }
}

impl AccessPolicy {
    pub fn new(enforce: bool) -> Self {
        Self { enforce }
    }

    pub fn enforced(&self) -> bool {
        self.enforce
    }

    fn require(&self, allowed: bool) -> Result<(), ApiError> {
        if !self.enforce || allowed {
            Ok(())
        } else {
            Err(denied())
        }
    }

    fn is_owner(actor: &UserRecord) -> bool {
        actor.role == UserRole::Owner
    }

    fn is_owner_or_lawyer(actor: &UserRecord) -> bool {
        matches!(actor.role, UserRole::Owner | UserRole::Lawyer)
    }

    // ---- users ----

    /// Listing, creating and editing accounts.
    pub fn manage_users(&self, actor: &UserRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor))
    }

    pub fn view_user(&self, actor: &UserRecord, target_id: i64) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor) || actor.id == target_id)
    }

    pub fn delete_user(&self, actor: &UserRecord, target_id: i64) -> Result<(), ApiError> {
        if actor.id == target_id {
            return Err(ApiError::Validation("Cannot delete yourself".to_string()));
        }
        self.require(Self::is_owner(actor))
    }

    // ---- case access ----

    /// Member id to restrict case-bound listings to, or `None` when the actor
    /// sees everything.
    pub fn case_scope(&self, actor: &UserRecord) -> Option<i64> {
        (self.enforce && !Self::is_owner(actor)).then_some(actor.id)
    }

    /// `team` holds the assistant ids assigned to the case.
    pub fn view_case(
        &self,
        actor: &UserRecord,
        case: &CaseRecord,
        team: &[i64],
    ) -> Result<(), ApiError> {
        self.require(
            Self::is_owner(actor)
                || case.primary_attorney_id == Some(actor.id)
                || team.contains(&actor.id),
        )
    }

    /// Assignees and creators keep a task even without access to its case.
    pub fn owns_task(&self, actor: &UserRecord, task: &TaskRecord) -> bool {
        !self.enforce
            || Self::is_owner(actor)
            || task.assignee_id == Some(actor.id)
            || task.created_by_id == actor.id
    }

    // ---- clients ----

    pub fn write_client(&self, actor: &UserRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner_or_lawyer(actor))
    }

    pub fn delete_client(&self, actor: &UserRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor))
    }

    // ---- cases ----

    pub fn create_case(&self, actor: &UserRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner_or_lawyer(actor))
    }

    /// Lawyers who open a case without naming an attorney take it on.
    pub fn default_primary_attorney(
        &self,
        actor: &UserRecord,
        requested: Option<i64>,
    ) -> Option<i64> {
        requested.or_else(|| (actor.role == UserRole::Lawyer).then_some(actor.id))
    }

    pub fn update_case(&self, actor: &UserRecord, case: &CaseRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor) || case.primary_attorney_id == Some(actor.id))
    }

    pub fn delete_case(&self, actor: &UserRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor))
    }

    // ---- tasks ----

    pub fn create_task(&self, actor: &UserRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner_or_lawyer(actor))
    }

    pub fn default_assignee(&self, actor: &UserRecord, requested: Option<i64>) -> Option<i64> {
        requested.or_else(|| (actor.role == UserRole::Lawyer).then_some(actor.id))
    }

    /// Assistants may only move the status or edit the description of tasks
    /// assigned to them.
    pub fn update_task(
        &self,
        actor: &UserRecord,
        task: &TaskRecord,
        changes: &UpdateTaskParams,
    ) -> Result<(), ApiError> {
        if actor.role != UserRole::Assistant {
            return Ok(());
        }
        self.require(task.assignee_id == Some(actor.id))?;
        let restricted = changes.title.is_some()
            || changes.priority.is_some()
            || changes.due_date.is_some()
            || changes.case_id.is_some()
            || changes.assignee_id.is_some();
        if self.enforce && restricted {
            return Err(ApiError::Forbidden(
                "Assistants can only update task status and description".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delete_task(&self, actor: &UserRecord, task: &TaskRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor) || task.created_by_id == actor.id)
    }

    // ---- documents ----

    pub fn delete_document(
        &self,
        actor: &UserRecord,
        document: &DocumentRecord,
    ) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor) || document.uploaded_by_id == actor.id)
    }

    // ---- notes ----

    /// Assistants may write notes but not pin or unpin them.
    pub fn pin_note(&self, actor: &UserRecord) -> Result<(), ApiError> {
        if self.enforce && actor.role == UserRole::Assistant {
            return Err(ApiError::Forbidden(
                "Assistants cannot pin notes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn update_note(&self, actor: &UserRecord, note: &NoteRecord) -> Result<(), ApiError> {
        self.require(Self::is_owner(actor) || note.author_id == actor.id)
    }

    pub fn delete_note(&self, actor: &UserRecord, note: &NoteRecord) -> Result<(), ApiError> {
        self.update_note(actor, note)
    }

    // ---- companies ----

    pub fn create_company(&self, actor: &UserRecord) -> Result<(), ApiError> {
        if self.enforce && actor.role == UserRole::Assistant {
            return Err(ApiError::Forbidden(
                "Assistants cannot create companies".to_string(),
            ));
        }
        Ok(())
    }
}
