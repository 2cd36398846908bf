use crate::{Change, GraphModel, ModelEvent};
use chrono::{DateTime, Utc};
use tracing::trace;

/// Ordered batch of changes forming one undo unit
#[derive(Debug, Clone, PartialEq)]
pub struct UndoableEdit {
    changes: Vec<Change>,
    significant: bool,
    undone: bool,
    redone: bool,
    sealed_at: Option<DateTime<Utc>>,
}

impl UndoableEdit {
    /// Create an empty edit. Insignificant edits are skipped over by an undo history.
    pub fn new(significant: bool) -> Self {
        Self {
            changes: Vec::new(),
            significant,
            undone: false,
            redone: false,
            sealed_at: None,
        }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn is_significant(&self) -> bool {
        self.significant
    }

    pub fn is_undone(&self) -> bool {
        self.undone
    }

    pub fn is_redone(&self) -> bool {
        self.redone
    }

    /// When the owning transaction closed; `None` while still collecting
    pub fn sealed_at(&self) -> Option<DateTime<Utc>> {
        self.sealed_at
    }

    pub fn add(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub(crate) fn append(&mut self, other: UndoableEdit) {
        self.changes.extend(other.changes);
    }

    pub(crate) fn seal(&mut self) {
        self.sealed_at = Some(Utc::now());
    }

    /// Broadcast `Change` then `Notify` for this edit on the model
    pub fn notify(&self, model: &mut GraphModel) {
        model.fire(&ModelEvent::Change(self));
        model.fire(&ModelEvent::Notify(self));
    }

    /// Reverse the edit by re-executing its changes last to first
    pub fn undo(&mut self, model: &mut GraphModel) {
        if !self.undone {
            trace!(changes = self.changes.len(), "undoing edit");
            model.fire(&ModelEvent::StartEdit);
            for change in self.changes.iter_mut().rev() {
                change.execute(model);
                model.fire(&ModelEvent::Executed(change));
            }
            self.undone = true;
            self.redone = false;
            model.fire(&ModelEvent::EndEdit);
        }
        self.notify(model);
    }

    /// Re-apply the edit by re-executing its changes first to last
    pub fn redo(&mut self, model: &mut GraphModel) {
        if !self.redone {
            trace!(changes = self.changes.len(), "redoing edit");
            model.fire(&ModelEvent::StartEdit);
            for change in self.changes.iter_mut() {
                change.execute(model);
                model.fire(&ModelEvent::Executed(change));
            }
            self.undone = false;
            self.redone = true;
            model.fire(&ModelEvent::EndEdit);
        }
        self.notify(model);
    }
}

impl Default for UndoableEdit {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Geometry, Style};
    use serde_json::json;

    #[test]
    fn test_empty_edit() {
        let edit = UndoableEdit::new(false);
        assert!(edit.is_empty());
        assert!(!edit.is_significant());
        assert!(edit.sealed_at().is_none());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model
            .add_vertex(layer, None, json!("A"), Geometry::new(0.0, 0.0, 10.0, 10.0), Style::new())
            .unwrap();

        let captured = model.capture_edit(|m| {
            m.set_value(v, json!("B")).unwrap();
            m.set_visible(v, false).unwrap();
        });
        let mut edit = captured.expect("edit sealed");
        assert_eq!(edit.len(), 2);
        assert!(edit.sealed_at().is_some());

        edit.undo(&mut model);
        assert!(edit.is_undone());
        assert_eq!(model.value(v), Some(&json!("A")));
        assert!(model.is_visible(v));

        // A second undo is guarded
        edit.undo(&mut model);
        assert_eq!(model.value(v), Some(&json!("A")));

        edit.redo(&mut model);
        assert!(edit.is_redone());
        assert_eq!(model.value(v), Some(&json!("B")));
        assert!(!model.is_visible(v));
    }
}
