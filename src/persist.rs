use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::domain::task::{Task, TaskCollection, TaskId};
use crate::store::{KeyValueStore, StoreError};

/// Key the whole collection is stored under.
pub const STORAGE_KEY: &str = "todos";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode tasks: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write tasks: {0}")]
    Write(#[source] StoreError),
    #[error("failed to read tasks: {0}")]
    Read(#[source] StoreError),
    #[error("stored tasks are malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Default)]
pub struct Loaded {
    pub tasks: TaskCollection,
    /// Records skipped because they failed shape validation.
    pub dropped: usize,
}

/// Persistence adapter between a [`TaskCollection`] and a key-value store.
pub struct TaskStorage<S> {
    store: S,
}

impl<S: KeyValueStore> TaskStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Serializes the full collection, replacing whatever was stored before.
    pub fn save(&mut self, tasks: &TaskCollection) -> Result<(), PersistError> {
        let json = serde_json::to_string(tasks.as_slice()).map_err(PersistError::Encode)?;
        self.store
            .set(STORAGE_KEY, &json)
            .map_err(PersistError::Write)?;
        debug!("event=save status=ok tasks={} bytes={}", tasks.len(), json.len());
        Ok(())
    }

    /// Reads the stored collection. Missing data is an empty collection;
    /// individual malformed records are dropped; an unparseable payload is an error.
    pub fn load(&self) -> Result<Loaded, PersistError> {
        let Some(raw) = self.store.get(STORAGE_KEY).map_err(PersistError::Read)? else {
            return Ok(Loaded::default());
        };
        if raw.is_empty() {
            return Ok(Loaded::default());
        }
        let loaded = decode(&raw)?;
        if loaded.dropped > 0 {
            warn!(
                "event=load status=partial kept={} dropped={}",
                loaded.tasks.len(),
                loaded.dropped
            );
        } else {
            debug!("event=load status=ok kept={}", loaded.tasks.len());
        }
        Ok(loaded)
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

fn decode(raw: &str) -> Result<Loaded, PersistError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| PersistError::Malformed(e.to_string()))?;
    let Value::Array(records) = value else {
        return Err(PersistError::Malformed(
            "expected a JSON array of tasks".to_string(),
        ));
    };
    let tasks = TaskCollection::from_tasks(records.iter().filter_map(decode_record));
    Ok(Loaded {
        dropped: records.len() - tasks.len(),
        tasks,
    })
}

fn decode_record(record: &Value) -> Option<Task> {
    let id = record.get("id")?.as_str()?;
    let text = record.get("text")?.as_str()?;
    let completed = record.get("completed")?.as_bool()?;
    if text.trim().is_empty() {
        return None;
    }
    // Records without a usable timestamp sort as the oldest.
    let created_at = record
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    Some(Task::restore(
        TaskId::from(id),
        text.to_owned(),
        completed,
        created_at,
    ))
}
