#![forbid(unsafe_code)]

//! The CRUD port and its in-memory implementation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use mdaform_core::FieldMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DataError, DataResult};
use crate::query::Query;
use crate::record::{Record, RecordId};

/// CRUD over one entity type.
///
/// Implementations are handles: methods take `&self` and callers clone the
/// handle freely. Calls complete before returning; a remote implementation
/// blocks the caller's event loop turn for the round trip.
pub trait EntityService<R: Record> {
    /// Fetch one record.
    fn get(&self, id: RecordId) -> DataResult<R>;

    /// List records matching `query`.
    fn get_all(&self, query: &Query) -> DataResult<Vec<R>>;

    /// Create a record from form values.
    fn create(&self, fields: &FieldMap) -> DataResult<R>;

    /// Apply form values to an existing record.
    fn update(&self, id: RecordId, fields: &FieldMap) -> DataResult<R>;

    /// Delete a record.
    fn delete(&self, id: RecordId) -> DataResult<()>;
}

// ---------------------------------------------------------------------------
// MemoryService
// ---------------------------------------------------------------------------

struct Inner<R> {
    rows: Vec<R>,
    fail_next: Option<DataError>,
    calls: usize,
}

/// In-process store for one entity type.
///
/// Clones share the same rows. [`fail_next`](Self::fail_next) makes the next
/// call return a chosen error, for exercising failure paths.
pub struct MemoryService<R> {
    inner: Rc<RefCell<Inner<R>>>,
}

impl<R> Clone for MemoryService<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: Record> Default for MemoryService<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> fmt::Debug for MemoryService<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryService")
            .field("entity", &R::ENTITY)
            .field("rows", &inner.rows.len())
            .field("calls", &inner.calls)
            .finish()
    }
}

impl<R: Record> MemoryService<R> {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                rows: Vec::new(),
                fail_next: None,
                calls: 0,
            })),
        }
    }

    /// Store with pre-existing rows.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        let service = Self::new();
        service.inner.borrow_mut().rows.extend(records);
        service
    }

    /// Insert or replace a row without validation.
    pub fn insert(&self, record: R) {
        let mut inner = self.inner.borrow_mut();
        let id = record.id();
        match inner.rows.iter_mut().find(|r| r.id() == id) {
            Some(slot) => *slot = record,
            None => inner.rows.push(record),
        }
    }

    /// Make the next service call fail with `error`.
    pub fn fail_next(&self, error: DataError) {
        self.inner.borrow_mut().fail_next = Some(error);
    }

    /// Number of service calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.inner.borrow().calls
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().rows.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count the call and consume any injected failure.
    fn begin(&self, op: &'static str) -> DataResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls += 1;
        match inner.fail_next.take() {
            Some(err) => {
                tracing::debug!(entity = R::ENTITY, op, error = %err, "injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn not_found(id: RecordId) -> DataError {
        DataError::NotFound {
            entity: R::ENTITY,
            id,
        }
    }
}

impl<R: Record + DeserializeOwned> MemoryService<R> {
    /// Append rows from a JSON array.
    pub fn seed_json(&self, json: &str) -> DataResult<usize> {
        let rows: Vec<R> = serde_json::from_str(json)?;
        let n = rows.len();
        for row in rows {
            self.insert(row);
        }
        tracing::debug!(entity = R::ENTITY, rows = n, "seeded from json");
        Ok(n)
    }
}

impl<R: Record + Serialize> MemoryService<R> {
    /// All rows as a JSON array.
    pub fn export_json(&self) -> DataResult<String> {
        Ok(serde_json::to_string(&self.inner.borrow().rows)?)
    }
}

impl<R: Record> EntityService<R> for MemoryService<R> {
    fn get(&self, id: RecordId) -> DataResult<R> {
        self.begin("get")?;
        self.inner
            .borrow()
            .rows
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    fn get_all(&self, query: &Query) -> DataResult<Vec<R>> {
        self.begin("get_all")?;
        let inner = self.inner.borrow();
        let mut rows: Vec<(FieldMap, &R)> = inner
            .rows
            .iter()
            .map(|r| (r.to_fields(), r))
            .filter(|(fields, _)| query.matches(fields))
            .collect();
        rows.sort_by(|(a, _), (b, _)| query.compare(a, b));
        let limit = query.top.unwrap_or(usize::MAX);
        Ok(rows.into_iter().take(limit).map(|(_, r)| r.clone()).collect())
    }

    fn create(&self, fields: &FieldMap) -> DataResult<R> {
        self.begin("create")?;
        let mut record = R::blank(RecordId::new());
        record.apply_fields(fields)?;
        record.validate()?;
        record.touch(Utc::now());
        self.inner.borrow_mut().rows.push(record.clone());
        tracing::debug!(entity = R::ENTITY, id = %record.id(), "created");
        Ok(record)
    }

    fn update(&self, id: RecordId, fields: &FieldMap) -> DataResult<R> {
        self.begin("update")?;
        let mut inner = self.inner.borrow_mut();
        let slot = inner
            .rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(id))?;
        let mut record = slot.clone();
        record.apply_fields(fields)?;
        record.validate()?;
        record.touch(Utc::now());
        *slot = record.clone();
        tracing::debug!(entity = R::ENTITY, id = %id, fields = fields.len(), "updated");
        Ok(record)
    }

    fn delete(&self, id: RecordId) -> DataResult<()> {
        self.begin("delete")?;
        let mut inner = self.inner.borrow_mut();
        let before = inner.rows.len();
        inner.rows.retain(|r| r.id() != id);
        if inner.rows.len() == before {
            return Err(Self::not_found(id));
        }
        tracing::debug!(entity = R::ENTITY, id = %id, "deleted");
        Ok(())
    }
}
