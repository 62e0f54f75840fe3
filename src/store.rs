// Board store: current document, undo/redo history, persistence, notification

use crate::filter::FiltersPatch;
use crate::models::{Column, Document, Task, TaskPatch, Theme, now_ms};
use crate::persist::{self, KvBackend};
use crate::seed::seed_document;
use crate::subscribers::{Subscribers, Subscription};
use eyre::Result;
use tracing::{debug, info};

/// Owner of the board document
///
/// Every mutation builds a new document from a copy of the current one and
/// commits it: the previous document goes onto the undo stack, the redo stack
/// is cleared, the new document is persisted and subscribers are notified.
/// Callers only ever see owned copies, never the store's own document.
pub struct Store {
    current: Document,
    undo_stack: Vec<Document>,
    redo_stack: Vec<Document>,
    backend: Box<dyn KvBackend>,
    subscribers: Subscribers,
}

impl Store {
    /// Create a store around an explicit initial document
    ///
    /// Nothing is persisted until the first commit.
    pub fn create<B: KvBackend + 'static>(initial: Document, backend: B) -> Self {
        Self {
            current: initial,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            backend: Box::new(backend),
            subscribers: Subscribers::default(),
        }
    }

    /// Load the persisted document, or seed and persist the demo board
    pub fn open<B: KvBackend + 'static>(backend: B) -> Result<Self> {
        let mut store = match persist::load(&backend) {
            Some(document) => {
                debug!(tasks = document.tasks.len(), "Loaded persisted document");
                Self::create(document, backend)
            }
            None => {
                info!("No persisted document, seeding demo board");
                Self::create(seed_document(), backend)
            }
        };

        // Baseline write; also normalizes whatever was loaded
        persist::save(&mut *store.backend, &store.current)?;
        Ok(store)
    }

    /// Independent copy of the current document
    pub fn get_state(&self) -> Document {
        self.current.clone()
    }

    /// Borrow the backing key-value store
    pub fn backend(&self) -> &dyn KvBackend {
        &*self.backend
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Filtered tasks in a column, in board order
    pub fn visible_tasks(&self, column: Column) -> Vec<Task> {
        self.current.visible_in(column).cloned().collect()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Merge the given fields into the active filters
    pub fn set_filters(&mut self, patch: FiltersPatch) -> Result<()> {
        let mut next = self.current.clone();
        next.filters.merge(patch);
        self.commit(next)
    }

    /// Append a fully-formed task at the end of the sequence
    ///
    /// A task with an empty title or an id already on the board is ignored.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if task.title.trim().is_empty() {
            debug!(id = %task.id, "add_task: empty title, ignoring");
            return Ok(());
        }
        if self.current.get(&task.id).is_some() {
            debug!(id = %task.id, "add_task: duplicate id, ignoring");
            return Ok(());
        }

        let mut next = self.current.clone();
        next.tasks.push(task);
        self.commit(next)
    }

    /// Apply `patch` to the task with this id, keeping its position
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<()> {
        let Some(pos) = self.current.position(id) else {
            debug!(id, "update_task: unknown id, ignoring");
            return Ok(());
        };
        if patch.title.as_ref().is_some_and(|t| t.trim().is_empty()) {
            debug!(id, "update_task: empty title, ignoring");
            return Ok(());
        }

        let mut next = self.current.clone();
        let task = &mut next.tasks[pos];
        patch.apply(task);
        task.updated_at = now_ms();
        self.commit(next)
    }

    /// Remove the task with this id
    pub fn delete_task(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.current.position(id) else {
            debug!(id, "delete_task: unknown id, ignoring");
            return Ok(());
        };

        let mut next = self.current.clone();
        next.tasks.remove(pos);
        self.commit(next)
    }

    /// Move a task into `column` at `index` among that column's tasks
    ///
    /// `index` counts the tasks already in the target column once the moved
    /// task has been taken out. The task is inserted just before the task at
    /// that index in the full sequence, or appended to the end of the
    /// sequence when the index is past the column's last task.
    pub fn move_task(&mut self, id: &str, column: Column, index: usize) -> Result<()> {
        let Some(pos) = self.current.position(id) else {
            debug!(id, "move_task: unknown id, ignoring");
            return Ok(());
        };

        let mut next = self.current.clone();
        let mut task = next.tasks.remove(pos);
        task.column = column;
        task.updated_at = now_ms();

        let anchor = next
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.column == column)
            .nth(index)
            .map(|(i, _)| i);

        match anchor {
            Some(i) => next.tasks.insert(i, task),
            None => next.tasks.push(task),
        }
        self.commit(next)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Restore the previous document; no-op when there is nothing to undo
    pub fn undo(&mut self) -> Result<()> {
        let Some(previous) = self.undo_stack.last() else {
            debug!("undo: history empty");
            return Ok(());
        };

        persist::save(&mut *self.backend, previous)?;

        if let Some(previous) = self.undo_stack.pop() {
            let current = std::mem::replace(&mut self.current, previous);
            self.redo_stack.push(current);
        }
        self.notify();
        Ok(())
    }

    /// Re-apply the most recently undone document; no-op when nothing was undone
    pub fn redo(&mut self) -> Result<()> {
        let Some(next) = self.redo_stack.last() else {
            debug!("redo: history empty");
            return Ok(());
        };

        persist::save(&mut *self.backend, next)?;

        if let Some(next) = self.redo_stack.pop() {
            let current = std::mem::replace(&mut self.current, next);
            self.undo_stack.push(current);
        }
        self.notify();
        Ok(())
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Register a callback run with a fresh snapshot after every commit
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&Document) + 'static,
    {
        self.subscribers.add(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // ========================================================================
    // Theme
    // ========================================================================

    /// Persisted theme; independent of the document and its history
    pub fn theme(&self) -> Theme {
        persist::load_theme(&*self.backend)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        persist::save_theme(&mut *self.backend, theme)
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.theme().toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Persist `next`, then swap it in and record history
    ///
    /// The write happens before any in-memory change, so a failed write leaves
    /// the store exactly as it was.
    fn commit(&mut self, next: Document) -> Result<()> {
        persist::save(&mut *self.backend, &next)?;

        let previous = std::mem::replace(&mut self.current, next);
        self.undo_stack.push(previous);
        self.redo_stack.clear();

        debug!(
            tasks = self.current.tasks.len(),
            undo_depth = self.undo_stack.len(),
            "Committed document"
        );
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        let snapshot = self.get_state();
        self.subscribers.notify(&snapshot);
    }
}
