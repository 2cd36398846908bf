//! Reversible mutation records.
//!
//! Every change stores the state it will apply next in `previous`. Executing
//! swaps that state with what the store currently holds, so executing a change
//! a second time restores the store exactly. Undo and redo are both a plain
//! re-execution.

use crate::{CellKey, Geometry, GraphModel, Style};
use serde_json::Value;

/// One atomic, self-inverting mutation of the cell store
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Root(RootChange),
    Child(ChildChange),
    Terminal(TerminalChange),
    Value(ValueChange),
    Style(StyleChange),
    Geometry(GeometryChange),
    Collapse(CollapseChange),
    Visible(VisibleChange),
}

impl Change {
    /// Apply the change, swapping its stored state with the store's
    pub fn execute(&mut self, model: &mut GraphModel) {
        match self {
            Change::Root(c) => c.execute(model),
            Change::Child(c) => c.execute(model),
            Change::Terminal(c) => c.execute(model),
            Change::Value(c) => c.execute(model),
            Change::Style(c) => c.execute(model),
            Change::Geometry(c) => c.execute(model),
            Change::Collapse(c) => c.execute(model),
            Change::Visible(c) => c.execute(model),
        }
    }

    /// The cell the change applies to; root changes have none
    pub fn cell(&self) -> Option<CellKey> {
        match self {
            Change::Root(_) => None,
            Change::Child(c) => Some(c.child),
            Change::Terminal(c) => Some(c.cell),
            Change::Value(c) => Some(c.cell),
            Change::Style(c) => Some(c.cell),
            Change::Geometry(c) => Some(c.cell),
            Change::Collapse(c) => Some(c.cell),
            Change::Visible(c) => Some(c.cell),
        }
    }

    /// Every cell the change touches, in either direction of execution
    pub fn cells(&self) -> Vec<CellKey> {
        match self {
            Change::Root(c) => c.root.into_iter().chain(c.previous).collect(),
            Change::Child(c) => [Some(c.child), c.parent, c.previous].into_iter().flatten().collect(),
            Change::Terminal(c) => [Some(c.cell), c.terminal, c.previous].into_iter().flatten().collect(),
            _ => self.cell().into_iter().collect(),
        }
    }
}

/// Replaces the model root and rebuilds the id index
#[derive(Debug, Clone, PartialEq)]
pub struct RootChange {
    pub root: Option<CellKey>,
    pub previous: Option<CellKey>,
}

impl RootChange {
    pub fn new(root: Option<CellKey>) -> Self {
        Self {
            root,
            previous: root,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        self.root = self.previous;
        self.previous = model.root_changed(self.previous);
    }
}

/// Inserts `child` into `parent` at `index`, or removes it when `parent` is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct ChildChange {
    pub parent: Option<CellKey>,
    pub previous: Option<CellKey>,
    pub child: CellKey,
    pub index: usize,
    pub previous_index: usize,
}

impl ChildChange {
    pub fn new(parent: Option<CellKey>, child: CellKey, index: usize) -> Self {
        Self {
            parent,
            previous: parent,
            child,
            index,
            previous_index: index,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        let old_index = model.index_in_parent(self.child).unwrap_or(0);

        if self.previous.is_none() {
            model.connect(self.child, false);
        }

        let old_parent =
            model.parent_for_cell_changed(self.child, self.previous, self.previous_index);

        if self.previous.is_some() {
            model.connect(self.child, true);
        }

        self.parent = self.previous;
        self.previous = old_parent;
        self.index = self.previous_index;
        self.previous_index = old_index;
    }
}

/// Connects or disconnects one end of an edge
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalChange {
    pub cell: CellKey,
    pub terminal: Option<CellKey>,
    pub previous: Option<CellKey>,
    pub is_source: bool,
}

impl TerminalChange {
    pub fn new(cell: CellKey, terminal: Option<CellKey>, is_source: bool) -> Self {
        Self {
            cell,
            terminal,
            previous: terminal,
            is_source,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        self.terminal = self.previous;
        self.previous = model.terminal_for_cell_changed(self.cell, self.previous, self.is_source);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub cell: CellKey,
    pub value: Value,
    pub previous: Value,
}

impl ValueChange {
    pub fn new(cell: CellKey, value: Value) -> Self {
        Self {
            cell,
            previous: value.clone(),
            value,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        self.value = self.previous.clone();
        self.previous = model.value_for_cell_changed(self.cell, self.value.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleChange {
    pub cell: CellKey,
    pub style: Style,
    pub previous: Style,
}

impl StyleChange {
    pub fn new(cell: CellKey, style: Style) -> Self {
        Self {
            cell,
            previous: style.clone(),
            style,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        self.style = self.previous.clone();
        self.previous = model.style_for_cell_changed(self.cell, self.style.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryChange {
    pub cell: CellKey,
    pub geometry: Option<Geometry>,
    pub previous: Option<Geometry>,
}

impl GeometryChange {
    pub fn new(cell: CellKey, geometry: Option<Geometry>) -> Self {
        Self {
            cell,
            previous: geometry.clone(),
            geometry,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        self.geometry = self.previous.clone();
        self.previous = model.geometry_for_cell_changed(self.cell, self.geometry.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollapseChange {
    pub cell: CellKey,
    pub collapsed: bool,
    pub previous: bool,
}

impl CollapseChange {
    pub fn new(cell: CellKey, collapsed: bool) -> Self {
        Self {
            cell,
            collapsed,
            previous: collapsed,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        self.collapsed = self.previous;
        self.previous = model.collapsed_state_for_cell_changed(self.cell, self.previous);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleChange {
    pub cell: CellKey,
    pub visible: bool,
    pub previous: bool,
}

impl VisibleChange {
    pub fn new(cell: CellKey, visible: bool) -> Self {
        Self {
            cell,
            visible,
            previous: visible,
        }
    }

    fn execute(&mut self, model: &mut GraphModel) {
        self.visible = self.previous;
        self.previous = model.visible_state_for_cell_changed(self.cell, self.previous);
    }
}
