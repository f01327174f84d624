//! Allow-listed list filters.
//!
//! Every predicate here is a plain conjunction of optional constraints, the
//! same shape a `WHERE` clause would take. Backends scan, call `matches`, and
//! keep at most `limit` rows.
//!
//! Case-bound queries also carry `visible_to`. When set, the backend builds a
//! [`MemberScope`] for that user and drops rows outside it before `limit`.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use super::{
    CaseRecord, CaseStatus, ClientRecord, CompanyRecord, DocumentRecord, NoteRecord, TaskRecord,
    TaskStatus,
};

pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Row-count bounds applied to every list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default: usize,
    pub max: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default: DEFAULT_PAGE_LIMIT,
            max: MAX_PAGE_LIMIT,
        }
    }
}

impl PageLimits {
    /// Absent or zero falls back to the default; anything above the maximum
    /// is clamped.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        match requested {
            None | Some(0) => self.default,
            Some(n) => n.min(self.max),
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn lowered(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// The cases one user works on, as primary attorney or assigned assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberScope {
    pub user_id: i64,
    pub case_ids: HashSet<i64>,
}

impl MemberScope {
    pub fn covers_case(&self, case_id: i64) -> bool {
        self.case_ids.contains(&case_id)
    }

    /// Tasks assigned to or created by the user stay visible off-team.
    pub fn covers_task(&self, task: &TaskRecord) -> bool {
        self.covers_case(task.case_id)
            || task.assignee_id == Some(self.user_id)
            || task.created_by_id == self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub limit: usize,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl UserQuery {
    /// Every row, for building join indexes.
    pub fn unbounded() -> Self {
        Self { limit: usize::MAX }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientQuery {
    pub search: Option<String>,
    pub limit: usize,
}

impl Default for ClientQuery {
    fn default() -> Self {
        Self {
            search: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ClientQuery {
    pub fn unbounded() -> Self {
        Self {
            limit: usize::MAX,
            ..Self::default()
        }
    }

    pub fn matches(&self, client: &ClientRecord) -> bool {
        let Some(needle) = lowered(&self.search) else {
            return true;
        };
        contains_ci(&client.name, &needle)
            || client
                .email
                .as_deref()
                .is_some_and(|email| contains_ci(email, &needle))
            || client
                .phone
                .as_deref()
                .is_some_and(|phone| contains_ci(phone, &needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseQuery {
    pub status: Option<CaseStatus>,
    pub client_id: Option<i64>,
    pub attorney_id: Option<i64>,
    /// Matches title, case number, or the owning client's name.
    pub search: Option<String>,
    pub visible_to: Option<i64>,
    pub limit: usize,
}

impl Default for CaseQuery {
    fn default() -> Self {
        Self {
            status: None,
            client_id: None,
            attorney_id: None,
            search: None,
            visible_to: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CaseQuery {
    pub fn unbounded() -> Self {
        Self {
            limit: usize::MAX,
            ..Self::default()
        }
    }

    /// `client_name` is the name of the case's client, when it still exists.
    pub fn matches(&self, case: &CaseRecord, client_name: Option<&str>) -> bool {
        if self.status.is_some_and(|status| status != case.status) {
            return false;
        }
        if self.client_id.is_some_and(|id| id != case.client_id) {
            return false;
        }
        if let Some(attorney_id) = self.attorney_id
            && case.primary_attorney_id != Some(attorney_id)
        {
            return false;
        }
        let Some(needle) = lowered(&self.search) else {
            return true;
        };
        contains_ci(&case.title, &needle)
            || contains_ci(&case.case_number, &needle)
            || client_name.is_some_and(|name| contains_ci(name, &needle))
    }

    pub fn needs_client_names(&self) -> bool {
        lowered(&self.search).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub case_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<i64>,
    pub overdue_only: bool,
    pub due_today: bool,
    pub visible_to: Option<i64>,
    pub limit: usize,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            case_id: None,
            status: None,
            assignee_id: None,
            overdue_only: false,
            due_today: false,
            visible_to: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl TaskQuery {
    /// `today` is the caller's UTC calendar date.
    pub fn matches(&self, task: &TaskRecord, today: NaiveDate) -> bool {
        if self.case_id.is_some_and(|id| id != task.case_id) {
            return false;
        }
        if self.status.is_some_and(|status| status != task.status) {
            return false;
        }
        if let Some(assignee_id) = self.assignee_id
            && task.assignee_id != Some(assignee_id)
        {
            return false;
        }
        let open = task.status != TaskStatus::Done;
        if self.overdue_only && !(open && task.due_date.is_some_and(|due| due < today)) {
            return false;
        }
        if self.due_today && !(open && task.due_date == Some(today)) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub case_id: Option<i64>,
    pub document_type: Option<String>,
    pub visible_to: Option<i64>,
    pub limit: usize,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            case_id: None,
            document_type: None,
            visible_to: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl DocumentQuery {
    pub fn matches(&self, document: &DocumentRecord) -> bool {
        if self.case_id.is_some_and(|id| id != document.case_id) {
            return false;
        }
        match self.document_type.as_deref() {
            Some(wanted) => document.document_type.as_deref() == Some(wanted),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    pub case_id: Option<i64>,
    pub pinned_only: bool,
    pub visible_to: Option<i64>,
    pub limit: usize,
}

impl Default for NoteQuery {
    fn default() -> Self {
        Self {
            case_id: None,
            pinned_only: false,
            visible_to: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl NoteQuery {
    pub fn matches(&self, note: &NoteRecord) -> bool {
        if self.case_id.is_some_and(|id| id != note.case_id) {
            return false;
        }
        !self.pinned_only || note.is_pinned
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyQuery {
    /// Exact match.
    pub company_type: Option<String>,
    /// Substring of the name, case-insensitive.
    pub search: Option<String>,
    pub limit: usize,
}

impl Default for CompanyQuery {
    fn default() -> Self {
        Self {
            company_type: None,
            search: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CompanyQuery {
    pub fn matches(&self, company: &CompanyRecord) -> bool {
        if let Some(wanted) = self.company_type.as_deref()
            && company.company_type.as_deref() != Some(wanted)
        {
            return false;
        }
        lowered(&self.search).is_none_or(|needle| contains_ci(&company.name, &needle))
    }
}

/// Pinned first, then newest first. Equal timestamps fall back to the higher
/// id so the order is total.
pub fn note_display_order(a: &NoteRecord, b: &NoteRecord) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}
