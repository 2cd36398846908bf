//! Edge reparenting.
//!
//! An edge lives in the nearest common ancestor of its two terminals. When a
//! terminal changes, or a cell carrying connected edges moves, the affected
//! edges are moved to their new container and their geometry is shifted by the
//! difference between the old and new container origins, so the edge stays put
//! on screen.

use crate::{CellKey, GraphModel};
use tracing::debug;

impl GraphModel {
    /// Re-home every edge connected to `cell` or one of its descendants.
    ///
    /// Descendants are processed before the cell itself. Edges no longer
    /// under `root` are left alone.
    pub fn update_edge_parents(&mut self, cell: CellKey, root: CellKey) {
        for child in self.children(cell) {
            self.update_edge_parents(child, root);
        }

        let edges = self.cell(cell).map(|c| c.edges().to_vec()).unwrap_or_default();
        for edge in edges {
            if self.is_ancestor(root, edge) {
                self.update_edge_parent(edge, root);
            }
        }
    }

    /// Move `edge` into the nearest common ancestor of its terminals
    pub fn update_edge_parent(&mut self, edge: CellKey, root: CellKey) {
        let Some(source) = self.terminal(edge, true) else { return };
        let Some(target) = self.terminal(edge, false) else { return };

        let source = self.absolute_anchor(source);
        let target = if self.config().ignore_relative_edge_parent {
            self.absolute_anchor(target)
        } else {
            target
        };

        if !self.is_ancestor(root, source) || !self.is_ancestor(root, target) {
            return;
        }

        let container = if source == target {
            self.parent(source)
        } else {
            self.nearest_common_ancestor(source, target)
        };
        let Some(container) = container else { return };

        // Layers only take edges that already live beneath them
        let on_layer = self.parent(container) == self.root();
        if on_layer && !self.is_ancestor(container, edge) {
            return;
        }

        let previous = self.parent(edge);
        if previous == Some(container) || self.is_ancestor(edge, container) {
            return;
        }

        if let Some(mut geometry) = self.geometry(edge).cloned() {
            let old_origin = previous.map(|p| self.origin(p)).unwrap_or_default();
            let new_origin = self.origin(container);
            let dx = new_origin.x - old_origin.x;
            let dy = new_origin.y - old_origin.y;

            geometry.translate(-dx, -dy);
            let moved = self.set_geometry(edge, geometry);
            debug_assert!(moved.is_ok());
            debug!(%edge, %container, dx, dy, "reparenting edge");
        }

        let index = self.child_count(container);
        let moved = self.add(container, edge, Some(index));
        debug_assert!(moved.is_ok());
    }

    /// Deepest cell that has a parent and is a strict ancestor of the deeper
    /// of the two cells, walking up from the shallower one.
    ///
    /// Identical cells yield their parent. The root is never returned.
    pub fn nearest_common_ancestor(&self, a: CellKey, b: CellKey) -> Option<CellKey> {
        let (shorter, longer) = if self.depth(b) < self.depth(a) {
            (b, a)
        } else {
            (a, b)
        };

        let mut current = Some(shorter);
        while let Some(cell) = current {
            let parent = self.parent(cell);
            if parent.is_some() && cell != longer && self.is_ancestor(cell, longer) {
                return Some(cell);
            }
            current = parent;
        }
        None
    }

    /// First ancestor-or-self that can anchor an edge in absolute coordinates
    fn absolute_anchor(&self, terminal: CellKey) -> CellKey {
        let mut current = terminal;
        while let Some(cell) = self.cell(current) {
            if cell.is_edge() || !cell.has_relative_geometry() {
                break;
            }
            match cell.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    fn depth(&self, cell: CellKey) -> usize {
        let mut depth = 0;
        let mut current = self.parent(cell);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }
}
