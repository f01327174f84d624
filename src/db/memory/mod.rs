//! In-memory database backend.
//!
//! All tables live behind one `tokio::sync::RwLock`, so every store call,
//! including a cascading case delete, is atomic with respect to the others.
//! Rows are kept in `BTreeMap`s keyed by id, which makes unfiltered scans come
//! out in ascending id order.

mod practice;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::{
    CaseCompanyRecord, CaseRecord, ClientRecord, CompanyRecord, Database, DocumentRecord,
    NoteRecord, TaskRecord, UserRecord,
};
use crate::practice::case_number::CaseNumberSequence;

/// Per-table id allocator. Hands out `max(existing) + 1` but never goes
/// backwards, so an id freed by a delete is not issued again.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IdSequence {
    next: i64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdSequence {
    pub(crate) fn allocate<T>(&mut self, table: &BTreeMap<i64, T>) -> i64 {
        let after_max = table.keys().next_back().map_or(1, |max| max + 1);
        let id = self.next.max(after_max);
        self.next = id + 1;
        id
    }
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) users: BTreeMap<i64, UserRecord>,
    /// Password digests by user id. Kept apart from the records so they never
    /// reach a serializer.
    pub(crate) credentials: HashMap<i64, [u8; 32]>,
    pub(crate) clients: BTreeMap<i64, ClientRecord>,
    pub(crate) cases: BTreeMap<i64, CaseRecord>,
    pub(crate) tasks: BTreeMap<i64, TaskRecord>,
    pub(crate) documents: BTreeMap<i64, DocumentRecord>,
    pub(crate) notes: BTreeMap<i64, NoteRecord>,
    /// `(case_id, assistant_id)` pairs.
    pub(crate) case_assistants: BTreeSet<(i64, i64)>,
    pub(crate) companies: BTreeMap<i64, CompanyRecord>,
    /// Keyed by `(case_id, company_id)`.
    pub(crate) case_companies: BTreeMap<(i64, i64), CaseCompanyRecord>,
    pub(crate) user_ids: IdSequence,
    pub(crate) client_ids: IdSequence,
    pub(crate) case_ids: IdSequence,
    pub(crate) task_ids: IdSequence,
    pub(crate) document_ids: IdSequence,
    pub(crate) note_ids: IdSequence,
    pub(crate) company_ids: IdSequence,
    pub(crate) case_numbers: CaseNumberSequence,
}

/// Process-lifetime store. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    pub(crate) tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
