use crate::{Change, GraphModel, UndoableEdit};
use std::fmt;
use std::rc::Rc;

/// Notifications emitted by a [`GraphModel`] during a transaction
#[derive(Debug, Clone, Copy)]
pub enum ModelEvent<'a> {
    /// Fired on every `begin_update`
    BeginUpdate,

    /// Fired when the outermost transaction opens
    StartEdit,

    /// A change was applied to the store
    Executed(&'a Change),

    /// Fired when the outermost transaction closes
    EndEdit,

    /// Fired on every `end_update` outside finalization, with the edit so far
    EndUpdate(&'a UndoableEdit),

    /// The edit is about to be sealed
    BeforeUndo(&'a UndoableEdit),

    /// Broadcast by the edit's notify, for the view layer
    Change(&'a UndoableEdit),

    /// Broadcast by the edit's notify, after `Change`
    Notify(&'a UndoableEdit),

    /// A sealed edit is ready for an undo history
    Undo(&'a UndoableEdit),
}

impl ModelEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            ModelEvent::BeginUpdate => EventKind::BeginUpdate,
            ModelEvent::StartEdit => EventKind::StartEdit,
            ModelEvent::Executed(_) => EventKind::Executed,
            ModelEvent::EndEdit => EventKind::EndEdit,
            ModelEvent::EndUpdate(_) => EventKind::EndUpdate,
            ModelEvent::BeforeUndo(_) => EventKind::BeforeUndo,
            ModelEvent::Change(_) => EventKind::Change,
            ModelEvent::Notify(_) => EventKind::Notify,
            ModelEvent::Undo(_) => EventKind::Undo,
        }
    }

    /// The edit carried by the event, if any
    pub fn edit(&self) -> Option<&UndoableEdit> {
        match *self {
            ModelEvent::EndUpdate(edit)
            | ModelEvent::BeforeUndo(edit)
            | ModelEvent::Change(edit)
            | ModelEvent::Notify(edit)
            | ModelEvent::Undo(edit) => Some(edit),
            _ => None,
        }
    }
}

/// Event names used to subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeginUpdate,
    StartEdit,
    Executed,
    EndEdit,
    EndUpdate,
    BeforeUndo,
    Change,
    Notify,
    Undo,
}

/// Token returned by [`EventBus::add_listener`], used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener callback. Receives the model so it can react with further
/// mutations; those join the transaction that is currently open.
pub type Listener = Rc<dyn Fn(&mut GraphModel, &ModelEvent<'_>)>;

/// Per-model listener registry
pub struct EventBus {
    listeners: Vec<(ListenerId, Option<EventKind>, Listener)>,
    next_id: u64,
    enabled: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
            enabled: true,
        }
    }

    /// Register a listener for one event kind, or for all events when `kind` is `None`
    pub fn add_listener(&mut self, kind: Option<EventKind>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Snapshot of listeners subscribed to `kind`, in registration order
    pub(crate) fn matching(&self, kind: EventKind) -> Vec<Listener> {
        if !self.enabled {
            return Vec::new();
        }
        self.listeners
            .iter()
            .filter(|(_, k, _)| k.is_none() || *k == Some(kind))
            .map(|(_, _, l)| Rc::clone(l))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Rc::new(|_: &mut GraphModel, _: &ModelEvent<'_>| {})
    }

    #[test]
    fn test_add_and_remove_listener() {
        let mut bus = EventBus::new();
        let a = bus.add_listener(Some(EventKind::Change), noop());
        let b = bus.add_listener(None, noop());
        assert_eq!(bus.len(), 2);

        assert!(bus.remove_listener(a));
        assert!(!bus.remove_listener(a));
        assert_eq!(bus.len(), 1);
        assert!(bus.remove_listener(b));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_matching_filters_by_kind() {
        let mut bus = EventBus::new();
        bus.add_listener(Some(EventKind::Change), noop());
        bus.add_listener(Some(EventKind::Undo), noop());
        bus.add_listener(None, noop());

        assert_eq!(bus.matching(EventKind::Change).len(), 2);
        assert_eq!(bus.matching(EventKind::Executed).len(), 1);
    }

    #[test]
    fn test_disabled_bus_matches_nothing() {
        let mut bus = EventBus::new();
        bus.add_listener(None, noop());
        bus.set_enabled(false);
        assert!(bus.matching(EventKind::Change).is_empty());
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(ModelEvent::StartEdit.kind(), EventKind::StartEdit);
        assert!(ModelEvent::BeginUpdate.edit().is_none());
        let edit = UndoableEdit::new(true);
        assert!(ModelEvent::Undo(&edit).edit().is_some());
    }
}
