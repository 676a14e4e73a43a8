use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::domain::task::{TaskCollection, TaskId};
use crate::persist::TaskStorage;
use crate::store::KeyValueStore;
use crate::view::{self, View};

/// How long a notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

const SAVE_FAILED: &str = "Failed to save your todos. Please check your storage settings.";
const LOAD_FAILED: &str = "Failed to load your saved todos. Starting with a fresh list.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Every user action goes through [`App::dispatch`] as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Toggle(TaskId),
    Delete(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Toggle,
    Delete,
}

/// Focused control, addressed by row in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    pub row: usize,
    pub control: Control,
}

impl Default for Focus {
    fn default() -> Self {
        Self {
            row: 0,
            control: Control::Toggle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    raised_at: Instant,
}

impl Notice {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= NOTICE_TTL
    }
}

pub struct App<S: KeyValueStore> {
    storage: TaskStorage<S>,
    tasks: TaskCollection,
    pub focus: Focus,
    pub mode: InputMode,
    pub input: String,
    pub status: Option<String>,
    notices: Vec<Notice>,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(store: S) -> Self {
        let mut app = Self {
            storage: TaskStorage::new(store),
            tasks: TaskCollection::default(),
            focus: Focus::default(),
            mode: InputMode::Normal,
            input: String::new(),
            status: None,
            notices: Vec::new(),
        };
        app.load();
        app
    }

    pub fn tasks(&self) -> &TaskCollection {
        &self.tasks
    }

    pub fn view(&self) -> View<'_> {
        view::project(&self.tasks)
    }

    /// Applies one command, then persists if anything changed.
    /// Returns whether the collection changed.
    pub fn dispatch(&mut self, command: Command) -> bool {
        let changed = match &command {
            Command::Add(text) => match self.tasks.add(text) {
                Some(task) => {
                    info!("event=task_add status=ok id={}", task.id());
                    true
                }
                None => false,
            },
            Command::Toggle(id) => match self.tasks.toggle(id) {
                Some(task) => {
                    info!(
                        "event=task_toggle status=ok id={} completed={}",
                        id,
                        task.completed()
                    );
                    true
                }
                None => false,
            },
            Command::Delete(id) => {
                let removed = self.tasks.delete(id).is_some();
                if removed {
                    info!("event=task_delete status=ok id={id}");
                }
                removed
            }
        };
        if changed {
            self.persist();
            self.clamp_focus();
        }
        changed
    }

    /// Overwrites in-memory state with whatever is persisted. Called when the
    /// view becomes visible again; the last persisted state wins.
    pub fn reload(&mut self) {
        info!("event=reload status=start");
        self.load();
        self.clamp_focus();
    }

    fn load(&mut self) {
        match self.storage.load() {
            Ok(loaded) => {
                info!(
                    "event=load status=ok kept={} dropped={}",
                    loaded.tasks.len(),
                    loaded.dropped
                );
                self.tasks = loaded.tasks;
            }
            Err(err) => {
                error!("event=load status=error error={err}");
                self.tasks = TaskCollection::default();
                self.raise_notice(LOAD_FAILED);
            }
        }
    }

    fn persist(&mut self) {
        // The mutation stays applied in memory; the next successful save picks it up.
        if let Err(err) = self.storage.save(&self.tasks) {
            warn!("event=save status=error error={err}");
            self.raise_notice(SAVE_FAILED);
        }
    }

    pub fn raise_notice(&mut self, message: &str) {
        self.raise_notice_at(message, Instant::now());
    }

    fn raise_notice_at(&mut self, message: &str, now: Instant) {
        self.notices.push(Notice {
            message: message.to_string(),
            raised_at: now,
        });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn expire_notices(&mut self, now: Instant) {
        self.notices.retain(|n| !n.is_expired(now));
    }

    pub fn start_editing(&mut self) {
        self.mode = InputMode::Editing;
        self.input.clear();
        self.set_status("Type new task and press Enter");
    }

    pub fn cancel_editing(&mut self) {
        self.mode = InputMode::Normal;
        self.input.clear();
        self.set_status("Canceled");
    }

    /// Submits the input line. Blank input is ignored and editing continues.
    pub fn submit_input(&mut self) {
        let text = self.input.trim().to_owned();
        if text.is_empty() {
            return;
        }
        if !self.dispatch(Command::Add(text)) {
            return;
        }
        self.input.clear();
        self.mode = InputMode::Normal;
        // adds always append
        let added = self.tasks.as_slice().last().map(|t| t.id().clone());
        if let Some(row) = added.and_then(|id| self.view().position(&id)) {
            self.focus = Focus {
                row,
                control: Control::Toggle,
            };
        }
        self.set_status("Added");
    }

    pub fn focus_next(&mut self) {
        let len = self.tasks.len();
        if len > 0 {
            self.focus = Focus {
                row: (self.focus.row + 1).min(len - 1),
                control: Control::Toggle,
            };
        }
    }

    pub fn focus_previous(&mut self) {
        self.focus = Focus {
            row: self.focus.row.saturating_sub(1),
            control: Control::Toggle,
        };
    }

    pub fn switch_control(&mut self) {
        self.focus.control = match self.focus.control {
            Control::Toggle => Control::Delete,
            Control::Delete => Control::Toggle,
        };
    }

    pub fn focused_id(&self) -> Option<TaskId> {
        self.view()
            .rows
            .get(self.focus.row)
            .map(|row| row.id().clone())
    }

    /// Presses the focused control.
    pub fn activate(&mut self) {
        match self.focus.control {
            Control::Toggle => self.toggle_focused(),
            Control::Delete => self.delete_focused(),
        }
    }

    pub fn toggle_focused(&mut self) {
        if let Some(id) = self.focused_id() {
            self.dispatch(Command::Toggle(id.clone()));
            // keep focus on the same task after it moves groups
            if let Some(row) = self.view().position(&id) {
                self.focus.row = row;
            }
            self.set_status("Toggled completion");
        }
    }

    pub fn delete_focused(&mut self) {
        if let Some(id) = self.focused_id() {
            self.dispatch(Command::Delete(id));
            self.focus.control = Control::Toggle;
            self.set_status("Deleted");
        }
    }

    fn clamp_focus(&mut self) {
        let len = self.tasks.len();
        if len == 0 {
            self.focus = Focus::default();
        } else if self.focus.row >= len {
            self.focus.row = len - 1;
        }
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status = Some(msg.to_string());
    }
}
