//! Idempotent merge of row changes into a table mirror
//!
//! Direct write results and pushed notifications both land here, so the echo
//! of a local insert finds its row already present and replaces it instead of
//! appending a duplicate.

use shared::{ChangeEvent, ChangeKind, Entity, RowId};

use crate::error::{AppError, AppResult};

/// Appends `incoming`, or merges it into the row with the same id
pub fn upsert<T: Entity>(rows: &mut Vec<T>, incoming: T) {
    match rows.iter_mut().find(|r| r.id() == incoming.id()) {
        Some(existing) => existing.merge_from(incoming),
        None => rows.push(incoming),
    }
}

/// Merges `incoming` in place; returns false, changing nothing, when the id is absent
pub fn replace<T: Entity>(rows: &mut [T], incoming: T) -> bool {
    match rows.iter_mut().find(|r| r.id() == incoming.id()) {
        Some(existing) => {
            existing.merge_from(incoming);
            true
        }
        None => false,
    }
}

/// Removes the row with this id, if any
pub fn remove<T: Entity>(rows: &mut Vec<T>, id: RowId) -> bool {
    match rows.iter().position(|r| r.id() == id) {
        Some(index) => {
            rows.remove(index);
            true
        }
        None => false,
    }
}

/// Applies one change event; returns whether the collection changed
pub fn apply_event<T: Entity>(rows: &mut Vec<T>, event: &ChangeEvent) -> AppResult<bool> {
    match event.kind {
        ChangeKind::Insert => {
            let row = T::decode(event.record.clone()).map_err(|e| AppError::decode(T::TABLE, e))?;
            upsert(rows, row);
            Ok(true)
        }
        ChangeKind::Update => {
            let row = T::decode(event.record.clone()).map_err(|e| AppError::decode(T::TABLE, e))?;
            Ok(replace(rows, row))
        }
        ChangeKind::Delete => {
            let key = T::TABLE.key_column();
            let id = event
                .record_id(key)
                .ok_or_else(|| AppError::decode(T::TABLE, format!("delete without {}", key)))?;
            Ok(remove(rows, id))
        }
    }
}
