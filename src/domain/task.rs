use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque task identifier. Ids produced here are hex UUIDs, but any string
/// loaded from storage is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    text: String,
    completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl Task {
    /// Rebuilds a task from persisted parts. Callers are responsible for
    /// rejecting empty text.
    pub fn restore(id: TaskId, text: String, completed: bool, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            text,
            completed,
            created_at,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

/// Tasks in insertion order. Insertion order is what gets persisted; display
/// order is derived in [`crate::view`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCollection {
    tasks: Vec<Task>,
}

impl TaskCollection {
    /// Builds a collection, keeping only the first task for any repeated id.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut collection = Self::default();
        for task in tasks {
            if !collection.contains(task.id()) {
                collection.tasks.push(task);
            }
        }
        collection
    }

    /// Appends a new incomplete task stamped with the current time.
    /// Returns `None` without touching the collection when `text` trims to empty.
    pub fn add(&mut self, text: &str) -> Option<&Task> {
        self.add_at(text, OffsetDateTime::now_utc())
    }

    pub fn add_at(&mut self, text: &str, created_at: OffsetDateTime) -> Option<&Task> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut id = TaskId::generate();
        while self.contains(&id) {
            id = TaskId::generate();
        }
        self.tasks.push(Task {
            id,
            text: text.to_owned(),
            completed: false,
            created_at,
        });
        self.tasks.last()
    }

    pub fn toggle(&mut self, id: &TaskId) -> Option<&Task> {
        let task = self.tasks.iter_mut().find(|t| &t.id == id)?;
        task.completed = !task.completed;
        Some(&*task)
    }

    pub fn delete(&mut self, id: &TaskId) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| &t.id == id)?;
        Some(self.tasks.remove(pos))
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn add_rejects_blank_text() {
        let mut tasks = TaskCollection::default();
        assert!(tasks.add("").is_none());
        assert!(tasks.add("   \t\n").is_none());
        assert_eq!(tasks.len(), 0);
    }

    #[test]
    fn add_appends_one_incomplete_trimmed_task() {
        let mut tasks = TaskCollection::default();
        tasks.add("first").unwrap();
        let added = tasks.add("  buy milk  ").unwrap().clone();

        assert_eq!(tasks.len(), 2);
        assert_eq!(added.text(), "buy milk");
        assert!(!added.completed());
        assert_eq!(tasks.as_slice().last(), Some(&added));
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut tasks = TaskCollection::default();
        for i in 0..200 {
            tasks.add(&format!("task {i}")).unwrap();
        }
        let mut ids: Vec<_> = tasks.iter().map(|t| t.id().clone()).collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.dedup();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn toggle_flips_only_completed_and_twice_restores() {
        let mut tasks = TaskCollection::default();
        let original = tasks
            .add_at("write docs", datetime!(2024-05-01 10:00 UTC))
            .unwrap()
            .clone();

        let toggled = tasks.toggle(original.id()).unwrap().clone();
        assert!(toggled.completed());
        assert_eq!(toggled.id(), original.id());
        assert_eq!(toggled.text(), original.text());
        assert_eq!(toggled.created_at(), original.created_at());

        tasks.toggle(original.id()).unwrap();
        assert_eq!(tasks.get(original.id()), Some(&original));
    }

    #[test]
    fn unknown_ids_leave_collection_unchanged() {
        let mut tasks = TaskCollection::default();
        tasks.add("a").unwrap();
        tasks.add("b").unwrap();
        let before = tasks.clone();

        let missing = TaskId::from("does-not-exist");
        assert!(tasks.toggle(&missing).is_none());
        assert!(tasks.delete(&missing).is_none());
        assert_eq!(tasks, before);
    }

    #[test]
    fn delete_removes_and_keeps_insertion_order() {
        let mut tasks = TaskCollection::default();
        let a = tasks.add("a").unwrap().id().clone();
        let b = tasks.add("b").unwrap().id().clone();
        let c = tasks.add("c").unwrap().id().clone();

        let removed = tasks.delete(&b).unwrap();
        assert_eq!(removed.text(), "b");
        let order: Vec<_> = tasks.iter().map(|t| t.id().clone()).collect();
        assert_eq!(order, vec![a, c]);
    }

    #[test]
    fn from_tasks_drops_repeated_ids() {
        let at = datetime!(2024-01-01 0:00 UTC);
        let tasks = TaskCollection::from_tasks([
            Task::restore("x".into(), "one".into(), false, at),
            Task::restore("x".into(), "two".into(), true, at),
            Task::restore("y".into(), "three".into(), false, at),
        ]);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks.get(&"x".into()).unwrap().text(), "one");
    }

    #[test]
    fn serializes_with_camel_case_and_iso_timestamp() {
        let task = Task::restore(
            "abc".into(),
            "hello".into(),
            true,
            datetime!(2024-03-02 8:30:00 UTC),
        );
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["completed"], true);
        assert_eq!(value["createdAt"], "2024-03-02T08:30:00Z");
    }
}
