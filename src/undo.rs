use crate::event::{EventKind, ListenerId};
use crate::{GraphModel, UndoableEdit};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Default number of edits kept in the history
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Bounded undo history of sealed edits.
///
/// `index_of_next_add` splits the history: edits before it can be undone,
/// edits from it on can be redone.
#[derive(Debug, Clone)]
pub struct UndoManager {
    /// Maximum number of edits kept; 0 keeps everything
    size: usize,
    history: Vec<UndoableEdit>,
    index_of_next_add: usize,
}

impl UndoManager {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            history: Vec::new(),
            index_of_next_add: 0,
        }
    }

    /// Subscribe a shared manager to the model's sealed edits.
    ///
    /// Cells only reachable through an evicted edit are purged from the model.
    pub fn attach(manager: &Rc<RefCell<UndoManager>>, model: &mut GraphModel) -> ListenerId {
        let manager = Rc::clone(manager);
        model.add_listener(EventKind::Undo, move |model, event| {
            let Some(edit) = event.edit() else { return };
            match manager.try_borrow_mut() {
                Ok(mut history) => {
                    if history.undoable_edit_happened(edit.clone()) {
                        model.purge_detached(history.history());
                    }
                }
                // Edits sealed by listeners during a replay are not recorded
                Err(_) => warn!(changes = edit.len(), "undo history busy, dropping edit"),
            }
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history(&self) -> &[UndoableEdit] {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.index_of_next_add > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index_of_next_add < self.history.len()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.index_of_next_add = 0;
    }

    /// Clear the history and free the cells it was keeping alive
    pub fn reset(&mut self, model: &mut GraphModel) -> usize {
        self.clear();
        self.purge(model)
    }

    /// Free detached cells that no edit in the history refers to
    pub fn purge(&self, model: &mut GraphModel) -> usize {
        model.purge_detached(&self.history)
    }

    /// Record a sealed edit, dropping any redo tail and the oldest entry when full.
    /// Returns true if edits were discarded.
    pub fn undoable_edit_happened(&mut self, edit: UndoableEdit) -> bool {
        let mut discarded = self.index_of_next_add < self.history.len();
        self.trim();

        if self.size > 0 && self.size == self.history.len() {
            self.history.remove(0);
            discarded = true;
        }

        self.history.push(edit);
        self.index_of_next_add = self.history.len();
        debug!(history = self.history.len(), "edit recorded");
        discarded
    }

    /// Undo edits until a significant one has been undone.
    /// Returns false if nothing significant was left to undo.
    pub fn undo(&mut self, model: &mut GraphModel) -> bool {
        while self.index_of_next_add > 0 {
            self.index_of_next_add -= 1;
            let edit = &mut self.history[self.index_of_next_add];
            edit.undo(model);

            if edit.is_significant() {
                debug!(index = self.index_of_next_add, "undo");
                return true;
            }
        }
        false
    }

    /// Redo edits until a significant one has been redone.
    /// Returns false if nothing significant was left to redo.
    pub fn redo(&mut self, model: &mut GraphModel) -> bool {
        while self.index_of_next_add < self.history.len() {
            let edit = &mut self.history[self.index_of_next_add];
            self.index_of_next_add += 1;
            edit.redo(model);

            if edit.is_significant() {
                debug!(index = self.index_of_next_add, "redo");
                return true;
            }
        }
        false
    }

    fn trim(&mut self) {
        self.history.truncate(self.index_of_next_add);
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
