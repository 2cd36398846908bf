use crate::change::{
    ChildChange, CollapseChange, GeometryChange, RootChange, StyleChange, TerminalChange,
    ValueChange, VisibleChange,
};
use crate::event::{EventBus, EventKind, ListenerId};
use crate::id_generator::IdGenerator;
use crate::{
    Cell, CellKey, CellType, Change, Geometry, ModelConfig, ModelError, ModelEvent, Point, Result,
    Style, UndoableEdit,
};
use serde_json::Value;
use std::cell::{Cell as Flag, RefCell};
use std::collections::{HashMap, HashSet};
use std::mem;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Clears the finalization flag when dropped, however `end_update` exits
struct FinalizeGuard(Rc<Flag<bool>>);

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Observable, undoable tree of cells.
///
/// Every mutation is recorded as a [`Change`] in the current [`UndoableEdit`].
/// Edits are sealed and broadcast when the outermost transaction closes.
#[derive(Debug)]
pub struct GraphModel {
    /// Every cell the model has created, attached or not
    cells: HashMap<CellKey, Cell>,

    /// Id index over the cells reachable from the root
    index: HashMap<String, CellKey>,

    root: Option<CellKey>,
    ids: IdGenerator,
    config: ModelConfig,

    current_edit: UndoableEdit,
    update_level: usize,
    ending_update: Rc<Flag<bool>>,

    events: EventBus,
}

impl GraphModel {
    /// Create a model holding a root and one default layer
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        let mut model = Self {
            cells: HashMap::new(),
            index: HashMap::new(),
            root: None,
            ids: IdGenerator::with_affixes(config.id_prefix.clone(), config.id_postfix.clone()),
            config,
            current_edit: UndoableEdit::new(true),
            update_level: 0,
            ending_update: Rc::new(Flag::new(false)),
            events: EventBus::new(),
        };
        model.clear();
        model
    }

    /// Replace the tree with a fresh root and default layer
    pub fn clear(&mut self) {
        let root = self.create_root();
        self.execute(Change::Root(RootChange::new(Some(root))));
    }

    /// Create a detached root cell with one layer beneath it
    pub fn create_root(&mut self) -> CellKey {
        let root = self.create(Cell::new(CellType::Plain));
        let layer = self.create(Cell::new(CellType::Plain));
        self.insert_child_raw(root, layer, 0);
        root
    }

    /// Take ownership of a detached cell and return its handle.
    ///
    /// Structural links on the given cell are discarded; use [`add`](Self::add)
    /// and [`set_terminal`](Self::set_terminal) to place it.
    pub fn create(&mut self, mut cell: Cell) -> CellKey {
        if self.cells.contains_key(&cell.key) {
            cell.key = CellKey::new();
        }
        cell.parent = None;
        cell.children.clear();
        cell.edges.clear();
        cell.source = None;
        cell.target = None;

        let key = cell.key;
        self.cells.insert(key, cell);
        key
    }

    /// Free detached cells that no edit can bring back.
    ///
    /// A detached tree survives if one of its cells is named by a change in
    /// `live` or in the current edit, or is linked through an edge or terminal
    /// to a surviving cell. Every other detached cell is dropped and its handle
    /// stops resolving, including fresh clones not yet added. Returns the number
    /// of cells freed.
    pub fn purge_detached<'a>(&mut self, live: impl IntoIterator<Item = &'a UndoableEdit>) -> usize {
        let mut pending: Vec<CellKey> = self.root.into_iter().collect();
        for edit in live {
            pending.extend(edit.changes().iter().flat_map(Change::cells));
        }
        pending.extend(self.current_edit.changes().iter().flat_map(Change::cells));

        let mut keep = HashSet::new();
        while let Some(key) = pending.pop() {
            if keep.contains(&key) || !self.cells.contains_key(&key) {
                continue;
            }
            for cell in self.descendants(self.topmost(key)) {
                if !keep.insert(cell) {
                    continue;
                }
                if let Some(c) = self.cells.get(&cell) {
                    pending.extend(c.source);
                    pending.extend(c.target);
                    pending.extend(c.edges.iter().copied());
                }
            }
        }

        let before = self.cells.len();
        self.cells.retain(|key, _| keep.contains(key));
        let purged = before - self.cells.len();
        if purged > 0 {
            debug!(purged, remaining = self.cells.len(), "purged detached cells");
        }
        purged
    }

    /// Number of cells held, attached or not
    pub fn arena_len(&self) -> usize {
        self.cells.len()
    }

    // ========== Configuration ==========

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn is_maintain_edge_parent(&self) -> bool {
        self.config.maintain_edge_parent
    }

    pub fn set_maintain_edge_parent(&mut self, value: bool) {
        self.config.maintain_edge_parent = value;
    }

    pub fn is_ignore_relative_edge_parent(&self) -> bool {
        self.config.ignore_relative_edge_parent
    }

    pub fn set_ignore_relative_edge_parent(&mut self, value: bool) {
        self.config.ignore_relative_edge_parent = value;
    }

    pub fn is_create_ids(&self) -> bool {
        self.config.create_ids
    }

    pub fn set_create_ids(&mut self, value: bool) {
        self.config.create_ids = value;
    }

    /// Counter the next generated id is built from
    pub fn next_id(&self) -> u64 {
        self.ids.next_id()
    }

    // ========== Events ==========

    /// Subscribe to one event kind
    pub fn add_listener<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&mut GraphModel, &ModelEvent<'_>) + 'static,
    {
        self.events.add_listener(Some(kind), Rc::new(listener))
    }

    /// Subscribe to every event
    pub fn add_global_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&mut GraphModel, &ModelEvent<'_>) + 'static,
    {
        self.events.add_listener(None, Rc::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    pub fn is_events_enabled(&self) -> bool {
        self.events.is_enabled()
    }

    /// Suppress or resume listener dispatch. State changes still happen.
    pub fn set_events_enabled(&mut self, enabled: bool) {
        self.events.set_enabled(enabled);
    }

    pub(crate) fn fire(&mut self, event: &ModelEvent<'_>) {
        for listener in self.events.matching(event.kind()) {
            listener(self, event);
        }
    }

    // ========== Transactions ==========

    /// Execute a change, record it in the current edit and notify listeners
    pub fn execute(&mut self, mut change: Change) {
        change.execute(self);
        self.begin_update();
        self.current_edit.add(change.clone());
        self.fire(&ModelEvent::Executed(&change));
        self.end_update();
    }

    pub fn begin_update(&mut self) {
        self.update_level += 1;
        self.fire(&ModelEvent::BeginUpdate);

        if self.update_level == 1 {
            self.fire(&ModelEvent::StartEdit);
        }
    }

    pub fn end_update(&mut self) {
        if self.update_level == 0 {
            warn!("end_update without matching begin_update");
        }
        self.update_level = self.update_level.saturating_sub(1);

        if self.update_level == 0 {
            self.fire(&ModelEvent::EndEdit);
        }

        if self.ending_update.get() {
            return;
        }

        self.ending_update.set(self.update_level == 0);
        let _guard = FinalizeGuard(Rc::clone(&self.ending_update));

        let edit = mem::take(&mut self.current_edit);
        self.fire(&ModelEvent::EndUpdate(&edit));
        self.restore_current_edit(edit);

        if self.ending_update.get() && !self.current_edit.is_empty() {
            let edit = mem::take(&mut self.current_edit);
            self.fire(&ModelEvent::BeforeUndo(&edit));
            self.restore_current_edit(edit);

            let mut sealed = mem::take(&mut self.current_edit);
            sealed.seal();
            debug!(changes = sealed.len(), "sealed edit");

            sealed.notify(self);
            self.fire(&ModelEvent::Undo(&sealed));
        }
    }

    /// Put the edit back as current, keeping changes listeners made meanwhile
    fn restore_current_edit(&mut self, edit: UndoableEdit) {
        let added = mem::replace(&mut self.current_edit, edit);
        self.current_edit.append(added);
    }

    /// Run `f` inside one transaction
    pub fn batch_update<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    /// Run `f` inside one transaction and return the edit it sealed.
    ///
    /// Returns `None` when nothing changed, or when an enclosing transaction
    /// is still open so no edit was sealed.
    pub fn capture_edit(&mut self, f: impl FnOnce(&mut Self)) -> Option<UndoableEdit> {
        let captured = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&captured);
        let id = self.add_listener(EventKind::Undo, move |_, event| {
            if let Some(edit) = event.edit() {
                *slot.borrow_mut() = Some(edit.clone());
            }
        });

        self.batch_update(f);
        self.remove_listener(id);

        captured.take()
    }

    /// Current transaction depth
    pub fn update_level(&self) -> usize {
        self.update_level
    }

    /// Changes recorded so far in the open transaction
    pub fn current_edit(&self) -> &UndoableEdit {
        &self.current_edit
    }

    // ========== Cell Store Queries ==========

    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(&key)
    }

    #[cfg(test)]
    pub(crate) fn cell_mut(&mut self, key: CellKey) -> Option<&mut Cell> {
        self.cells.get_mut(&key)
    }

    pub(crate) fn require(&self, key: CellKey) -> Result<&Cell> {
        self.cells.get(&key).ok_or(ModelError::CellNotFound(key))
    }

    /// Look up an attached cell by id
    pub fn get_cell(&self, id: &str) -> Option<CellKey> {
        self.index.get(id).copied()
    }

    /// Id index entries, in no particular order
    pub fn indexed_cells(&self) -> impl Iterator<Item = (&str, CellKey)> {
        self.index.iter().map(|(id, key)| (id.as_str(), *key))
    }

    /// Number of attached cells
    pub fn cell_count(&self) -> usize {
        self.index.len()
    }

    pub fn root(&self) -> Option<CellKey> {
        self.root
    }

    /// First layer of the root, where new top-level cells usually go
    pub fn default_parent(&self) -> Option<CellKey> {
        self.root.and_then(|root| self.child_at(root, 0))
    }

    pub fn is_root(&self, cell: CellKey) -> bool {
        self.root == Some(cell)
    }

    pub fn is_layer(&self, cell: CellKey) -> bool {
        self.parent(cell).is_some_and(|p| self.is_root(p))
    }

    pub fn id(&self, cell: CellKey) -> Option<&str> {
        self.cell(cell).and_then(Cell::id)
    }

    pub fn parent(&self, cell: CellKey) -> Option<CellKey> {
        self.cell(cell).and_then(Cell::parent)
    }

    pub fn children(&self, cell: CellKey) -> Vec<CellKey> {
        self.cell(cell)
            .map(|c| c.children.clone())
            .unwrap_or_default()
    }

    pub fn child_count(&self, cell: CellKey) -> usize {
        self.cell(cell).map_or(0, |c| c.children.len())
    }

    pub fn child_at(&self, cell: CellKey, index: usize) -> Option<CellKey> {
        self.cell(cell).and_then(|c| c.children.get(index).copied())
    }

    /// Position of the cell among its parent's children
    pub fn index_in_parent(&self, cell: CellKey) -> Option<usize> {
        let parent = self.parent(cell)?;
        self.cell(parent)?.index_of(cell)
    }

    /// Topmost ancestor of the cell, the cell itself if detached
    pub fn topmost(&self, cell: CellKey) -> CellKey {
        let mut current = cell;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// True if `parent` is `child` or one of its ancestors
    pub fn is_ancestor(&self, parent: CellKey, child: CellKey) -> bool {
        let mut current = Some(child);
        while let Some(cell) = current {
            if cell == parent {
                return true;
            }
            current = self.parent(cell);
        }
        false
    }

    /// True if the cell is reachable from the root
    pub fn contains(&self, cell: CellKey) -> bool {
        self.root.is_some_and(|root| self.is_ancestor(root, cell))
    }

    pub fn value(&self, cell: CellKey) -> Option<&Value> {
        self.cell(cell).map(Cell::value)
    }

    pub fn style(&self, cell: CellKey) -> Option<&Style> {
        self.cell(cell).map(Cell::style)
    }

    pub fn geometry(&self, cell: CellKey) -> Option<&Geometry> {
        self.cell(cell).and_then(Cell::geometry)
    }

    pub fn is_vertex(&self, cell: CellKey) -> bool {
        self.cell(cell).is_some_and(Cell::is_vertex)
    }

    pub fn is_edge(&self, cell: CellKey) -> bool {
        self.cell(cell).is_some_and(Cell::is_edge)
    }

    pub fn is_visible(&self, cell: CellKey) -> bool {
        self.cell(cell).is_some_and(Cell::is_visible)
    }

    pub fn is_collapsed(&self, cell: CellKey) -> bool {
        self.cell(cell).is_some_and(Cell::is_collapsed)
    }

    pub fn terminal(&self, edge: CellKey, is_source: bool) -> Option<CellKey> {
        self.cell(edge).and_then(|c| c.terminal(is_source))
    }

    pub fn edge_count(&self, cell: CellKey) -> usize {
        self.cell(cell).map_or(0, |c| c.edges.len())
    }

    pub fn edge_at(&self, cell: CellKey, index: usize) -> Option<CellKey> {
        self.cell(cell).and_then(|c| c.edges.get(index).copied())
    }

    /// Edges connected to the cell, filtered by direction
    pub fn edges(
        &self,
        cell: CellKey,
        incoming: bool,
        outgoing: bool,
        include_loops: bool,
    ) -> Vec<CellKey> {
        let Some(c) = self.cell(cell) else {
            return Vec::new();
        };

        c.edges
            .iter()
            .copied()
            .filter(|edge| {
                let source = self.terminal(*edge, true);
                let target = self.terminal(*edge, false);
                (include_loops && source == target)
                    || (source != target
                        && ((incoming && target == Some(cell))
                            || (outgoing && source == Some(cell))))
            })
            .collect()
    }

    /// Connected edges, excluding loops
    pub fn connections(&self, cell: CellKey) -> Vec<CellKey> {
        self.edges(cell, true, true, false)
    }

    pub fn incoming_edges(&self, cell: CellKey) -> Vec<CellKey> {
        self.edges(cell, true, false, false)
    }

    pub fn outgoing_edges(&self, cell: CellKey) -> Vec<CellKey> {
        self.edges(cell, false, true, false)
    }

    /// Count edges with the cell as source (`outgoing`) or target
    pub fn directed_edge_count(
        &self,
        cell: CellKey,
        outgoing: bool,
        ignored_edge: Option<CellKey>,
    ) -> usize {
        self.cell(cell).map_or(0, |c| {
            c.edges
                .iter()
                .filter(|edge| {
                    Some(**edge) != ignored_edge && self.terminal(**edge, outgoing) == Some(cell)
                })
                .count()
        })
    }

    /// Edges connecting `source` and `target`, in either direction unless `directed`
    pub fn edges_between(&self, source: CellKey, target: CellKey, directed: bool) -> Vec<CellKey> {
        // Scan the shorter edge list
        let terminal = if self.edge_count(target) < self.edge_count(source) {
            target
        } else {
            source
        };

        self.cell(terminal)
            .map(|c| c.edges.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|edge| {
                let src = self.terminal(*edge, true);
                let trg = self.terminal(*edge, false);
                let directed_match = src == Some(source) && trg == Some(target);
                let opposite_match = trg == Some(source) && src == Some(target);
                directed_match || (!directed && opposite_match)
            })
            .collect()
    }

    /// Terminals at the other end of `edges` as seen from `terminal`
    pub fn opposites(
        &self,
        edges: &[CellKey],
        terminal: CellKey,
        sources: bool,
        targets: bool,
    ) -> Vec<CellKey> {
        let mut result = Vec::new();
        for edge in edges {
            let source = self.terminal(*edge, true);
            let target = self.terminal(*edge, false);

            if source == Some(terminal) && targets {
                if let Some(t) = target.filter(|t| *t != terminal) {
                    result.push(t);
                }
            } else if target == Some(terminal) && sources {
                if let Some(s) = source.filter(|s| *s != terminal) {
                    result.push(s);
                }
            }
        }
        result
    }

    /// Cells whose ancestors are not in the given set
    pub fn topmost_cells(&self, cells: &[CellKey]) -> Vec<CellKey> {
        let set: HashSet<CellKey> = cells.iter().copied().collect();
        cells
            .iter()
            .copied()
            .filter(|cell| {
                let mut parent = self.parent(*cell);
                while let Some(p) = parent {
                    if set.contains(&p) {
                        return false;
                    }
                    parent = self.parent(p);
                }
                true
            })
            .collect()
    }

    /// Distinct parents of the given cells, in first-seen order
    pub fn parents(&self, cells: &[CellKey]) -> Vec<CellKey> {
        let mut seen = HashSet::new();
        cells
            .iter()
            .filter_map(|cell| self.parent(*cell))
            .filter(|p| seen.insert(*p))
            .collect()
    }

    /// The cell and all of its descendants, depth-first
    pub fn descendants(&self, cell: CellKey) -> Vec<CellKey> {
        self.filter_descendants(cell, |_| true)
    }

    pub fn filter_descendants(&self, cell: CellKey, filter: impl Fn(&Cell) -> bool) -> Vec<CellKey> {
        let mut result = Vec::new();
        let mut stack = vec![cell];
        while let Some(key) = stack.pop() {
            let Some(c) = self.cell(key) else { continue };
            if filter(c) {
                result.push(key);
            }
            stack.extend(c.children.iter().rev().copied());
        }
        result
    }

    /// Children filtered by type. With both flags off every child is returned.
    pub fn child_cells(&self, parent: CellKey, vertices: bool, edges: bool) -> Vec<CellKey> {
        self.children(parent)
            .into_iter()
            .filter(|child| {
                (!vertices && !edges)
                    || (vertices && self.is_vertex(*child))
                    || (edges && self.is_edge(*child))
            })
            .collect()
    }

    pub fn child_vertices(&self, parent: CellKey) -> Vec<CellKey> {
        self.child_cells(parent, true, false)
    }

    pub fn child_edges(&self, parent: CellKey) -> Vec<CellKey> {
        self.child_cells(parent, false, true)
    }

    /// Absolute origin of the cell's coordinate space: the summed positions
    /// of the cell and its ancestors, skipping edges and relative geometries
    pub fn origin(&self, cell: CellKey) -> Point {
        let mut result = Point::default();
        let mut current = Some(cell);
        while let Some(key) = current {
            if let Some(c) = self.cell(key) {
                if !c.is_edge() {
                    if let Some(geo) = c.geometry.as_ref().filter(|g| !g.relative) {
                        result.x += geo.x;
                        result.y += geo.y;
                    }
                }
            }
            current = self.parent(key);
        }
        result
    }

    /// Dot-separated child indices from the topmost ancestor down to the cell.
    /// The topmost cell has the empty path.
    pub fn cell_path(&self, cell: CellKey) -> String {
        let mut indices = Vec::new();
        let mut current = cell;
        while let Some(index) = self.index_in_parent(current) {
            indices.push(index.to_string());
            current = match self.parent(current) {
                Some(parent) => parent,
                None => break,
            };
        }
        indices.reverse();
        indices.join(".")
    }

    /// Resolve a path produced by [`cell_path`](Self::cell_path) from `from`
    pub fn cell_at_path(&self, from: CellKey, path: &str) -> Result<CellKey> {
        let mut current = from;
        if path.is_empty() {
            return Ok(current);
        }
        for token in path.split('.') {
            let index: usize = token
                .parse()
                .map_err(|_| ModelError::InvalidPath(path.to_string()))?;
            current = self
                .child_at(current, index)
                .ok_or_else(|| ModelError::InvalidPath(path.to_string()))?;
        }
        Ok(current)
    }

    // ========== Mutations ==========

    /// Replace the root. `None` empties the model.
    pub fn set_root(&mut self, root: Option<CellKey>) -> Result<Option<CellKey>> {
        if let Some(root) = root {
            self.require(root)?;
        }
        self.execute(Change::Root(RootChange::new(root)));
        Ok(root)
    }

    /// Insert `child` into `parent` at `index`, appending when `index` is `None`
    pub fn add(&mut self, parent: CellKey, child: CellKey, index: Option<usize>) -> Result<CellKey> {
        if parent == child {
            return Ok(child);
        }
        self.require(parent)?;
        self.require(child)?;

        if self.is_ancestor(child, parent) {
            return Err(ModelError::CyclicInsert { parent, child });
        }

        let count = self.child_count(parent);
        let index = index.unwrap_or(count).min(count);
        let parent_changed = self.parent(child) != Some(parent);

        self.execute(Change::Child(ChildChange::new(Some(parent), child, index)));

        if self.config.maintain_edge_parent && parent_changed {
            let root = self.topmost(child);
            self.update_edge_parents(child, root);
        }

        Ok(child)
    }

    /// Create a vertex and append it to `parent`
    pub fn add_vertex(
        &mut self,
        parent: CellKey,
        id: Option<&str>,
        value: impl Into<Value>,
        geometry: Geometry,
        style: Style,
    ) -> Result<CellKey> {
        self.require(parent)?;

        let mut cell = Cell::vertex(value, geometry).with_style(style);
        cell.id = id.map(str::to_string);
        let vertex = self.create(cell);
        self.add(parent, vertex, None)
    }

    /// Create an edge, append it to `parent` and connect it, as one transaction.
    /// Handles are checked first, so a failed call leaves nothing behind.
    pub fn add_edge(
        &mut self,
        parent: CellKey,
        id: Option<&str>,
        value: impl Into<Value>,
        source: Option<CellKey>,
        target: Option<CellKey>,
    ) -> Result<CellKey> {
        self.require(parent)?;
        for terminal in source.iter().chain(&target) {
            self.require(*terminal)?;
        }

        let mut cell = Cell::edge(value);
        cell.id = id.map(str::to_string);
        let edge = self.create(cell);

        self.batch_update(|model| {
            model.add(parent, edge, None)?;
            model.set_terminals(edge, source, target)?;
            Ok(edge)
        })
    }

    /// Detach the cell from its parent. Removing the root empties the model.
    pub fn remove(&mut self, cell: CellKey) -> Result<CellKey> {
        self.require(cell)?;

        if self.is_root(cell) {
            self.set_root(None)?;
        } else if self.parent(cell).is_some() {
            self.execute(Change::Child(ChildChange::new(None, cell, 0)));
        }
        Ok(cell)
    }

    /// Connect one end of an edge, or disconnect it with `None`
    pub fn set_terminal(
        &mut self,
        edge: CellKey,
        terminal: Option<CellKey>,
        is_source: bool,
    ) -> Result<Option<CellKey>> {
        if !self.require(edge)?.is_edge() {
            return Err(ModelError::NotAnEdge(edge));
        }
        if let Some(terminal) = terminal {
            self.require(terminal)?;
        }

        if terminal == self.terminal(edge, is_source) {
            return Ok(terminal);
        }
        self.execute(Change::Terminal(TerminalChange::new(edge, terminal, is_source)));

        if self.config.maintain_edge_parent {
            if let Some(root) = self.root {
                self.update_edge_parent(edge, root);
            }
        }
        Ok(terminal)
    }

    /// Set both terminals of an edge in one transaction
    pub fn set_terminals(
        &mut self,
        edge: CellKey,
        source: Option<CellKey>,
        target: Option<CellKey>,
    ) -> Result<()> {
        self.batch_update(|model| {
            model.set_terminal(edge, source, true)?;
            model.set_terminal(edge, target, false)?;
            Ok(())
        })
    }

    pub fn set_value(&mut self, cell: CellKey, value: Value) -> Result<Value> {
        if self.require(cell)?.value != value {
            self.execute(Change::Value(ValueChange::new(cell, value.clone())));
        }
        Ok(value)
    }

    pub fn set_style(&mut self, cell: CellKey, style: Style) -> Result<Style> {
        if self.require(cell)?.style != style {
            self.execute(Change::Style(StyleChange::new(cell, style.clone())));
        }
        Ok(style)
    }

    pub fn set_geometry(&mut self, cell: CellKey, geometry: Geometry) -> Result<Geometry> {
        if self.require(cell)?.geometry.as_ref() != Some(&geometry) {
            self.execute(Change::Geometry(GeometryChange::new(
                cell,
                Some(geometry.clone()),
            )));
        }
        Ok(geometry)
    }

    pub fn set_collapsed(&mut self, cell: CellKey, collapsed: bool) -> Result<bool> {
        if self.require(cell)?.collapsed != collapsed {
            self.execute(Change::Collapse(CollapseChange::new(cell, collapsed)));
        }
        Ok(collapsed)
    }

    pub fn set_visible(&mut self, cell: CellKey, visible: bool) -> Result<bool> {
        if self.require(cell)?.visible != visible {
            self.execute(Change::Visible(VisibleChange::new(cell, visible)));
        }
        Ok(visible)
    }

    // ========== Store Primitives (applied by changes) ==========

    pub(crate) fn root_changed(&mut self, root: Option<CellKey>) -> Option<CellKey> {
        let previous = mem::replace(&mut self.root, root);
        self.ids.reset();
        self.index.clear();

        if let Some(root) = root {
            self.cell_added(root);
        }
        debug!(cells = self.index.len(), "root replaced");
        previous
    }

    pub(crate) fn parent_for_cell_changed(
        &mut self,
        cell: CellKey,
        parent: Option<CellKey>,
        index: usize,
    ) -> Option<CellKey> {
        let previous = self.parent(cell);

        if let Some(parent) = parent {
            if Some(parent) != previous || self.index_in_parent(cell) != Some(index) {
                self.insert_child_raw(parent, cell, index);
            }
        } else if let Some(previous) = previous {
            self.remove_child_raw(previous, cell);
        }

        let attached_now = parent.is_some_and(|p| self.contains(p));
        let attached_before = previous.is_some_and(|p| self.contains(p));

        if attached_now && !attached_before {
            self.cell_added(cell);
        } else if attached_before && !attached_now {
            self.cell_removed(cell);
        }
        previous
    }

    pub(crate) fn terminal_for_cell_changed(
        &mut self,
        edge: CellKey,
        terminal: Option<CellKey>,
        is_source: bool,
    ) -> Option<CellKey> {
        let previous = self.terminal(edge, is_source);

        if let Some(terminal) = terminal {
            self.insert_edge(terminal, edge, is_source);
        } else if let Some(previous) = previous {
            self.remove_edge(previous, edge, is_source);
        }
        previous
    }

    pub(crate) fn value_for_cell_changed(&mut self, cell: CellKey, value: Value) -> Value {
        match self.cells.get_mut(&cell) {
            Some(c) => mem::replace(&mut c.value, value),
            None => value,
        }
    }

    pub(crate) fn style_for_cell_changed(&mut self, cell: CellKey, style: Style) -> Style {
        match self.cells.get_mut(&cell) {
            Some(c) => mem::replace(&mut c.style, style),
            None => style,
        }
    }

    pub(crate) fn geometry_for_cell_changed(
        &mut self,
        cell: CellKey,
        geometry: Option<Geometry>,
    ) -> Option<Geometry> {
        match self.cells.get_mut(&cell) {
            Some(c) => mem::replace(&mut c.geometry, geometry),
            None => geometry,
        }
    }

    pub(crate) fn collapsed_state_for_cell_changed(&mut self, cell: CellKey, collapsed: bool) -> bool {
        match self.cells.get_mut(&cell) {
            Some(c) => mem::replace(&mut c.collapsed, collapsed),
            None => collapsed,
        }
    }

    pub(crate) fn visible_state_for_cell_changed(&mut self, cell: CellKey, visible: bool) -> bool {
        match self.cells.get_mut(&cell) {
            Some(c) => mem::replace(&mut c.visible, visible),
            None => visible,
        }
    }

    /// Register (`is_connect`) or unregister the cell and its descendants
    /// with their terminals. The edges keep their own terminal references.
    pub(crate) fn connect(&mut self, cell: CellKey, is_connect: bool) {
        let Some(c) = self.cell(cell) else { return };
        let source = c.source;
        let target = c.target;
        let children = c.children.clone();

        if source.is_some() {
            self.terminal_for_cell_changed(cell, if is_connect { source } else { None }, true);
        }
        if target.is_some() {
            self.terminal_for_cell_changed(cell, if is_connect { target } else { None }, false);
        }

        if let Some(c) = self.cells.get_mut(&cell) {
            c.source = source;
            c.target = target;
        }

        for child in children {
            self.connect(child, is_connect);
        }
    }

    /// Index the cell and its subtree, assigning and de-duplicating ids
    pub(crate) fn cell_added(&mut self, cell: CellKey) {
        let Some(c) = self.cell(cell) else { return };
        let mut id = c.id.clone();

        if id.is_none() && self.config.create_ids {
            id = Some(self.ids.next());
        }

        if let Some(mut id) = id {
            let mut collision = self.index.get(&id).copied();
            if collision != Some(cell) {
                while collision.is_some() {
                    let regenerated = self.ids.next();
                    trace!(%id, %regenerated, "id collision");
                    id = regenerated;
                    collision = self.index.get(&id).copied();
                }
                self.index.insert(id.clone(), cell);
            }

            self.ids.observe(&id);
            if let Some(c) = self.cells.get_mut(&cell) {
                c.id = Some(id);
            }
        }

        for child in self.children(cell) {
            self.cell_added(child);
        }
    }

    /// Drop the cell and its subtree from the id index
    pub(crate) fn cell_removed(&mut self, cell: CellKey) {
        for child in self.children(cell).into_iter().rev() {
            self.cell_removed(child);
        }

        if let Some(id) = self.cell(cell).and_then(|c| c.id.clone()) {
            if self.index.get(&id) == Some(&cell) {
                self.index.remove(&id);
            }
        }
    }

    pub(crate) fn insert_child_raw(&mut self, parent: CellKey, child: CellKey, index: usize) {
        if let Some(previous) = self.parent(child) {
            self.remove_child_raw(previous, child);
        }
        if let Some(p) = self.cells.get_mut(&parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.cells.get_mut(&child) {
            c.parent = Some(parent);
        }
    }

    fn remove_child_raw(&mut self, parent: CellKey, child: CellKey) {
        if let Some(p) = self.cells.get_mut(&parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.cells.get_mut(&child) {
            c.parent = None;
        }
    }

    pub(crate) fn insert_edge(&mut self, terminal: CellKey, edge: CellKey, is_outgoing: bool) {
        if let Some(previous) = self.terminal(edge, is_outgoing) {
            self.remove_edge(previous, edge, is_outgoing);
        }
        if let Some(e) = self.cells.get_mut(&edge) {
            e.set_terminal(Some(terminal), is_outgoing);
        }
        if let Some(t) = self.cells.get_mut(&terminal) {
            if !t.edges.contains(&edge) {
                t.edges.push(edge);
            }
        }
    }

    fn remove_edge(&mut self, terminal: CellKey, edge: CellKey, is_outgoing: bool) {
        // A loop stays listed while its other end still points here
        if self.terminal(edge, !is_outgoing) != Some(terminal) {
            if let Some(t) = self.cells.get_mut(&terminal) {
                t.edges.retain(|e| *e != edge);
            }
        }
        if let Some(e) = self.cells.get_mut(&edge) {
            e.set_terminal(None, is_outgoing);
        }
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn geo() -> Geometry {
        Geometry::new(0.0, 0.0, 10.0, 10.0)
    }

    fn recorder(model: &mut GraphModel) -> Rc<RefCell<Vec<EventKind>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        model.add_global_listener(move |_, event| sink.borrow_mut().push(event.kind()));
        log
    }

    #[test]
    fn test_model_creation() {
        let model = GraphModel::new();
        let root = model.root().unwrap();
        let layer = model.default_parent().unwrap();

        assert_eq!(model.cell_count(), 2);
        assert_eq!(model.id(root), Some("0"));
        assert_eq!(model.id(layer), Some("1"));
        assert!(model.is_layer(layer));
        assert_eq!(model.update_level(), 0);
    }

    #[test]
    fn test_get_cell_by_id() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, Some("a"), json!("A"), geo(), Style::new()).unwrap();

        assert_eq!(model.get_cell("a"), Some(v));
        assert_eq!(model.get_cell("missing"), None);
    }

    #[test]
    fn test_single_mutation_event_sequence() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let log = recorder(&mut model);

        model.set_value(v, json!("B")).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                EventKind::BeginUpdate,
                EventKind::StartEdit,
                EventKind::Executed,
                EventKind::EndEdit,
                EventKind::EndUpdate,
                EventKind::BeforeUndo,
                EventKind::Change,
                EventKind::Notify,
                EventKind::Undo,
            ]
        );
    }

    #[test]
    fn test_nested_updates_seal_once() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();

        let sealed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sealed);
        model.add_listener(EventKind::Undo, move |_, event| {
            sink.borrow_mut().push(event.edit().map_or(0, UndoableEdit::len));
        });

        model.begin_update();
        model.set_value(v, json!("B")).unwrap();
        model.begin_update();
        model.set_visible(v, false).unwrap();
        model.end_update();
        assert!(sealed.borrow().is_empty());
        model.set_collapsed(v, true).unwrap();
        model.end_update();

        assert_eq!(*sealed.borrow(), vec![3]);
        assert!(model.current_edit().is_empty());
    }

    #[test]
    fn test_no_op_mutations_record_nothing() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let e = model.add_edge(layer, None, json!(null), Some(v), None).unwrap();

        let edit = model.capture_edit(|m| {
            m.set_value(v, json!("A")).unwrap();
            m.set_style(v, Style::new()).unwrap();
            m.set_geometry(v, geo()).unwrap();
            m.set_visible(v, true).unwrap();
            m.set_collapsed(v, false).unwrap();
            m.set_terminal(e, Some(v), true).unwrap();
            m.set_terminal(e, None, false).unwrap();
        });
        assert!(edit.is_none());
        assert_eq!(model.edge_count(v), 1);
    }

    #[test]
    fn test_empty_transaction_emits_no_change() {
        let mut model = GraphModel::new();
        let log = recorder(&mut model);

        model.batch_update(|_| {});

        assert_eq!(
            *log.borrow(),
            vec![
                EventKind::BeginUpdate,
                EventKind::StartEdit,
                EventKind::EndEdit,
                EventKind::EndUpdate,
            ]
        );
    }

    #[test]
    fn test_listener_reentering_end_update_finalizes_once() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();

        let undo_count = Rc::new(Flag::new(0));
        let counter = Rc::clone(&undo_count);
        model.add_listener(EventKind::Undo, move |_, _| counter.set(counter.get() + 1));

        // Reacts to the broadcast with a change of its own
        model.add_listener(EventKind::Change, move |m, _| {
            if m.value(v) == Some(&json!("B")) {
                m.set_visible(v, false).unwrap();
            }
        });

        model.set_value(v, json!("B")).unwrap();

        assert_eq!(undo_count.get(), 1);
        assert!(!model.is_visible(v));
        // The listener's change waits in the fresh edit
        assert_eq!(model.current_edit().len(), 1);
    }

    #[test]
    fn test_listener_changes_during_end_update_join_edit() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();

        model.add_listener(EventKind::EndUpdate, move |m, _| {
            if m.update_level() == 0 && m.is_visible(v) && m.value(v) == Some(&json!("B")) {
                m.set_visible(v, false).unwrap();
            }
        });

        let edit = model.capture_edit(|m| {
            m.set_value(v, json!("B")).unwrap();
        });

        let edit = edit.unwrap();
        assert_eq!(edit.len(), 2);
        assert_matches!(edit.changes()[0], Change::Value(_));
        assert_matches!(edit.changes()[1], Change::Visible(_));
    }

    #[test]
    fn test_add_rejects_cycles() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let b = model.add_vertex(a, None, json!("B"), geo(), Style::new()).unwrap();

        assert_matches!(
            model.add(b, a, None),
            Err(ModelError::CyclicInsert { parent, child }) if parent == b && child == a
        );
        // Self-insertion is a no-op
        assert_eq!(model.add(a, a, None), Ok(a));
    }

    #[test]
    fn test_unknown_cell_fails_fast() {
        let mut model = GraphModel::new();
        let stranger = CellKey::new();
        assert_matches!(model.set_visible(stranger, false), Err(ModelError::CellNotFound(_)));
        assert_matches!(model.remove(stranger), Err(ModelError::CellNotFound(_)));

        // Failed constructors leave nothing behind in the arena
        let layer = model.default_parent().unwrap();
        let held = model.arena_len();
        assert_matches!(
            model.add_vertex(stranger, None, json!(null), geo(), Style::new()),
            Err(ModelError::CellNotFound(_))
        );
        assert_matches!(
            model.add_edge(layer, None, json!(null), Some(stranger), None),
            Err(ModelError::CellNotFound(_))
        );
        assert_eq!(model.arena_len(), held);
        assert_eq!(model.update_level(), 0);
    }

    #[test]
    fn test_set_terminal_requires_edge() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let b = model.add_vertex(layer, None, json!("B"), geo(), Style::new()).unwrap();

        assert_matches!(model.set_terminal(a, Some(b), true), Err(ModelError::NotAnEdge(_)));
    }

    #[test]
    fn test_insert_at_index_and_move() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, Some("a"), json!("A"), geo(), Style::new()).unwrap();
        let b = model.add_vertex(layer, Some("b"), json!("B"), geo(), Style::new()).unwrap();
        let c = model.create(Cell::vertex("C", geo()));

        model.add(layer, c, Some(0)).unwrap();
        assert_eq!(model.children(layer), vec![c, a, b]);

        // Out-of-range index is clamped
        model.add(layer, c, Some(99)).unwrap();
        assert_eq!(model.children(layer), vec![a, b, c]);

        model.add(layer, b, None).unwrap();
        assert_eq!(model.children(layer), vec![a, c, b]);
    }

    #[test]
    fn test_remove_detaches_subtree_from_index() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, Some("a"), json!("A"), geo(), Style::new()).unwrap();
        model.add_vertex(a, Some("a1"), json!("A1"), geo(), Style::new()).unwrap();

        model.remove(a).unwrap();

        assert!(model.get_cell("a").is_none());
        assert!(model.get_cell("a1").is_none());
        assert!(!model.contains(a));
        // The detached cell is still known to the store
        assert!(model.cell(a).is_some());
    }

    #[test]
    fn test_remove_root_empties_model() {
        let mut model = GraphModel::new();
        let root = model.root().unwrap();
        model.remove(root).unwrap();

        assert_eq!(model.root(), None);
        assert_eq!(model.cell_count(), 0);
        assert_eq!(model.default_parent(), None);
    }

    #[test]
    fn test_id_collision_regenerates() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let first = model.add_vertex(layer, Some("7"), json!(1), geo(), Style::new()).unwrap();
        let second = model.add_vertex(layer, Some("7"), json!(2), geo(), Style::new()).unwrap();

        assert_eq!(model.id(first), Some("7"));
        assert_eq!(model.id(second), Some("8"));
        assert_eq!(model.get_cell("8"), Some(second));
    }

    #[test]
    fn test_numeric_ids_advance_counter() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, Some("100"), json!(1), geo(), Style::new()).unwrap();
        model.remove(v).unwrap();

        let w = model.add_vertex(layer, None, json!(2), geo(), Style::new()).unwrap();
        assert_eq!(model.id(w), Some("101"));
    }

    #[test]
    fn test_create_ids_disabled_leaves_cells_unindexed() {
        let mut model = GraphModel::new();
        model.set_create_ids(false);
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!(1), geo(), Style::new()).unwrap();

        assert_eq!(model.id(v), None);
        assert!(model.contains(v));
    }

    #[test]
    fn test_id_affixes_from_config() {
        let config = ModelConfig {
            id_prefix: "n".to_string(),
            id_postfix: "_".to_string(),
            ..ModelConfig::default()
        };
        let mut model = GraphModel::with_config(config);
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!(1), geo(), Style::new()).unwrap();

        assert_eq!(model.id(v), Some("n2_"));
    }

    #[test]
    fn test_set_root_reindexes() {
        let mut model = GraphModel::new();
        let old_root = model.root().unwrap();

        let root = model.create(Cell::new(CellType::Plain).with_id("r"));
        let layer = model.create(Cell::new(CellType::Plain));
        model.insert_child_raw(root, layer, 0);
        model.set_root(Some(root)).unwrap();

        assert_eq!(model.get_cell("r"), Some(root));
        assert_eq!(model.id(layer), Some("0"));
        assert!(!model.contains(old_root));
        assert_eq!(model.cell_count(), 2);
    }

    #[test]
    fn test_root_change_executed_twice_restores_tree() {
        let mut model = GraphModel::new();
        let old_root = model.root().unwrap();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, Some("v"), json!("V"), geo(), Style::new()).unwrap();
        let new_root = model.create_root();

        let mut change = Change::Root(RootChange::new(Some(new_root)));
        change.execute(&mut model);
        assert_eq!(model.root(), Some(new_root));
        assert!(model.get_cell("v").is_none());
        assert_eq!(model.cell_count(), 2);

        change.execute(&mut model);
        assert_eq!(model.root(), Some(old_root));
        assert_eq!(model.get_cell("v"), Some(v));
        assert_eq!(model.get_cell("0"), Some(old_root));
        assert_eq!(model.cell_count(), 3);
    }

    #[test]
    fn test_purge_detached_frees_replaced_trees() {
        let mut model = GraphModel::new();
        let old_root = model.root().unwrap();
        for _ in 0..10 {
            model.clear();
        }

        assert_eq!(model.purge_detached(std::iter::empty()), 20);
        assert!(model.cell(old_root).is_none());
        assert_eq!(model.arena_len(), 2);
        assert_eq!(model.purge_detached(std::iter::empty()), 0);
    }

    #[test]
    fn test_purge_keeps_cells_an_edit_can_restore() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!("V"), geo(), Style::new()).unwrap();
        let child = model.add_vertex(v, None, json!("C"), geo(), Style::new()).unwrap();
        let w = model.add_vertex(layer, None, json!("W"), geo(), Style::new()).unwrap();

        let mut edit = model.capture_edit(|m| {
            m.remove(v).unwrap();
        }).unwrap();
        let stray = model.clone_cell(w, false).unwrap();

        assert_eq!(model.purge_detached([&edit]), 1);
        assert!(model.cell(stray).is_none());
        assert!(model.cell(child).is_some());

        edit.undo(&mut model);
        assert!(model.contains(child));
    }

    #[test]
    fn test_unbalanced_end_update_from_listener_is_absorbed() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let v = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        model.add_listener(EventKind::Undo, |m, _| m.end_update());

        model.set_value(v, json!("B")).unwrap();
        assert_eq!(model.update_level(), 0);

        let edit = model.capture_edit(|m| {
            m.set_value(v, json!("C")).unwrap();
        });
        assert_eq!(edit.map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_edge_queries() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let b = model.add_vertex(layer, None, json!("B"), geo(), Style::new()).unwrap();
        let ab = model.add_edge(layer, None, json!(null), Some(a), Some(b)).unwrap();
        let ba = model.add_edge(layer, None, json!(null), Some(b), Some(a)).unwrap();
        let aa = model.add_edge(layer, None, json!(null), Some(a), Some(a)).unwrap();

        assert_eq!(model.edge_count(a), 3);
        assert_eq!(model.outgoing_edges(a), vec![ab]);
        assert_eq!(model.incoming_edges(a), vec![ba]);
        assert_eq!(model.connections(a), vec![ab, ba]);
        assert_eq!(model.edges(a, false, false, true), vec![aa]);
        assert_eq!(model.edges_between(a, b, true), vec![ab]);
        assert_eq!(model.edges_between(a, b, false), vec![ab, ba]);
        assert_eq!(model.opposites(&[ab, ba, aa], a, true, true), vec![b, b]);
        assert_eq!(model.directed_edge_count(a, true, Some(aa)), 1);
        assert_eq!(model.child_edges(layer), vec![ab, ba, aa]);
        assert_eq!(model.child_vertices(layer), vec![a, b]);
    }

    #[test]
    fn test_loop_disconnect_keeps_listing_until_both_ends_gone() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let aa = model.add_edge(layer, None, json!(null), Some(a), Some(a)).unwrap();

        model.set_terminal(aa, None, true).unwrap();
        assert_eq!(model.edge_count(a), 1);
        model.set_terminal(aa, None, false).unwrap();
        assert_eq!(model.edge_count(a), 0);
    }

    #[test]
    fn test_removed_edge_unregisters_from_terminals() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let b = model.add_vertex(layer, None, json!("B"), geo(), Style::new()).unwrap();
        let e = model.add_edge(layer, None, json!(null), Some(a), Some(b)).unwrap();

        model.remove(e).unwrap();
        assert_eq!(model.edge_count(a), 0);
        assert_eq!(model.edge_count(b), 0);
        // The edge remembers its ends so it can be restored
        assert_eq!(model.terminal(e, true), Some(a));

        model.add(layer, e, None).unwrap();
        assert_eq!(model.edges_between(a, b, true), vec![e]);
    }

    #[test]
    fn test_structural_queries() {
        let mut model = GraphModel::new();
        let root = model.root().unwrap();
        let layer = model.default_parent().unwrap();
        let a = model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();
        let a1 = model.add_vertex(a, None, json!("A1"), geo(), Style::new()).unwrap();
        let b = model.add_vertex(layer, None, json!("B"), geo(), Style::new()).unwrap();

        assert!(model.is_ancestor(layer, a1));
        assert!(model.is_ancestor(a1, a1));
        assert!(!model.is_ancestor(b, a1));
        assert_eq!(model.topmost(a1), root);
        assert_eq!(model.descendants(a), vec![a, a1]);
        assert_eq!(model.descendants(layer), vec![layer, a, a1, b]);
        assert_eq!(model.topmost_cells(&[a, a1, b]), vec![a, b]);
        assert_eq!(model.parents(&[a, b, a1]), vec![layer, a]);
        assert_eq!(model.cell_path(a1), "0.0.0");
        assert_eq!(model.cell_path(root), "");
        assert_eq!(model.cell_at_path(root, "0.1"), Ok(b));
        assert_matches!(model.cell_at_path(root, "0.9"), Err(ModelError::InvalidPath(_)));
    }

    #[test]
    fn test_origin_skips_relative_geometry() {
        let mut model = GraphModel::new();
        let layer = model.default_parent().unwrap();
        let a = model
            .add_vertex(layer, None, json!("A"), Geometry::new(10.0, 20.0, 100.0, 100.0), Style::new())
            .unwrap();
        let port = model
            .add_vertex(a, None, json!("P"), Geometry::new(0.5, 0.5, 5.0, 5.0).with_relative(true), Style::new())
            .unwrap();
        let b = model
            .add_vertex(a, None, json!("B"), Geometry::new(5.0, 5.0, 10.0, 10.0), Style::new())
            .unwrap();

        assert_eq!(model.origin(port), Point::new(10.0, 20.0));
        assert_eq!(model.origin(b), Point::new(15.0, 25.0));
    }

    #[test]
    fn test_events_disabled_suppresses_listeners() {
        let mut model = GraphModel::new();
        let log = recorder(&mut model);
        model.set_events_enabled(false);
        let layer = model.default_parent().unwrap();
        model.add_vertex(layer, None, json!("A"), geo(), Style::new()).unwrap();

        assert!(log.borrow().is_empty());
        assert_eq!(model.cell_count(), 3);
    }
}
