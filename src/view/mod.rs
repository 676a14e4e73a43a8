//! Read-only projection of a [`TaskCollection`] into what the user sees.
//!
//! Nothing here mutates application state; both the terminal UI and the
//! HTML export draw from the same [`View`].

pub mod html;

use crate::domain::task::{Task, TaskCollection, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
}

impl Stats {
    pub fn of(tasks: &TaskCollection) -> Self {
        Self {
            total: tasks.len(),
            completed: tasks.completed_count(),
        }
    }

    pub fn total_label(&self) -> String {
        let plural = if self.total == 1 { "" } else { "s" };
        format!("{} task{plural}", self.total)
    }

    pub fn completed_label(&self) -> String {
        format!("{} completed", self.completed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub task: &'a Task,
}

impl<'a> Row<'a> {
    pub fn id(&self) -> &'a TaskId {
        self.task.id()
    }

    pub fn text(&self) -> &'a str {
        self.task.text()
    }

    pub fn completed(&self) -> bool {
        self.task.completed()
    }

    pub fn toggle_label(&self) -> &'static str {
        if self.completed() {
            "Mark task as incomplete"
        } else {
            "Mark task as complete"
        }
    }

    pub fn delete_label(&self) -> String {
        format!("Delete task: {}", self.text())
    }
}

#[derive(Debug, Clone)]
pub struct View<'a> {
    pub rows: Vec<Row<'a>>,
    pub stats: Stats,
}

impl<'a> View<'a> {
    /// An empty view shows the empty-state indicator instead of a list.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }
}

pub fn project(tasks: &TaskCollection) -> View<'_> {
    View {
        rows: display_order(tasks)
            .into_iter()
            .map(|task| Row { task })
            .collect(),
        stats: Stats::of(tasks),
    }
}

/// Incomplete tasks first, newest first within each group. Storage order is untouched.
pub fn display_order(tasks: &TaskCollection) -> Vec<&Task> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by(|a, b| {
        a.completed()
            .cmp(&b.completed())
            .then_with(|| b.created_at().cmp(&a.created_at()))
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn incomplete_first_then_newest_first() {
        let tasks = TaskCollection::from_tasks([
            Task::restore("A".into(), "a".into(), false, datetime!(2024-01-01 0:00 UTC)),
            Task::restore("B".into(), "b".into(), true, datetime!(2024-01-02 0:00 UTC)),
            Task::restore("C".into(), "c".into(), false, datetime!(2024-01-03 0:00 UTC)),
        ]);
        let before = tasks.clone();

        let order: Vec<_> = display_order(&tasks)
            .iter()
            .map(|t| t.id().as_str())
            .collect();
        assert_eq!(order, vec!["C", "A", "B"]);
        assert_eq!(tasks, before);
    }

    #[test]
    fn stats_labels_pluralize() {
        let one = Stats {
            total: 1,
            completed: 0,
        };
        assert_eq!(one.total_label(), "1 task");
        assert_eq!(one.completed_label(), "0 completed");

        let two = Stats {
            total: 2,
            completed: 1,
        };
        assert_eq!(two.total_label(), "2 tasks");
        assert_eq!(two.completed_label(), "1 completed");
    }

    #[test]
    fn project_counts_and_locates_rows() {
        let mut tasks = TaskCollection::default();
        let old = tasks
            .add_at("old", datetime!(2024-01-01 0:00 UTC))
            .unwrap()
            .id()
            .clone();
        let new = tasks
            .add_at("new", datetime!(2024-01-05 0:00 UTC))
            .unwrap()
            .id()
            .clone();
        tasks.toggle(&new);

        let view = project(&tasks);
        assert!(!view.is_empty());
        assert_eq!(view.stats, Stats { total: 2, completed: 1 });
        assert_eq!(view.position(&old), Some(0));
        assert_eq!(view.position(&new), Some(1));
        assert_eq!(view.rows[1].toggle_label(), "Mark task as incomplete");
        assert_eq!(view.rows[0].delete_label(), "Delete task: old");
    }

    #[test]
    fn empty_collection_projects_empty_view() {
        let tasks = TaskCollection::default();
        let view = project(&tasks);
        assert!(view.is_empty());
        assert_eq!(view.stats.total_label(), "0 tasks");
    }
}
