use crate::change::ChildChange;
use crate::{CellKey, Change, GraphModel, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A merged edge whose terminals are reconnected once the whole subtree
/// exists. Terminals are source-model cell paths.
#[derive(Debug)]
struct PendingEdge {
    cell: CellKey,
    source: Option<String>,
    target: Option<String>,
}

impl GraphModel {
    /// Detached deep (or shallow) copy of a single cell
    pub fn clone_cell(&mut self, cell: CellKey, include_children: bool) -> Result<CellKey> {
        let clones = self.clone_cells(&[cell], include_children)?;
        Ok(clones[0])
    }

    /// Detached copies of `cells`, optionally with their descendants.
    ///
    /// Clones get fresh keys and no ids. Terminal links are restored only
    /// where both ends were cloned together; other ends dangle.
    pub fn clone_cells(&mut self, cells: &[CellKey], include_children: bool) -> Result<Vec<CellKey>> {
        for cell in cells {
            self.require(*cell)?;
        }

        let mut mapping = HashMap::new();
        let clones: Vec<CellKey> = cells
            .iter()
            .map(|cell| self.clone_subtree(*cell, include_children, &mut mapping))
            .collect();

        for (clone, cell) in clones.iter().zip(cells) {
            self.restore_clone(*clone, *cell, &mapping);
        }
        Ok(clones)
    }

    fn clone_subtree(
        &mut self,
        cell: CellKey,
        include_children: bool,
        mapping: &mut HashMap<CellKey, CellKey>,
    ) -> CellKey {
        if let Some(clone) = mapping.get(&cell) {
            return *clone;
        }

        let detached = match self.cell(cell) {
            Some(c) => c.clone_detached(),
            None => return cell,
        };
        let clone = self.create(detached);
        mapping.insert(cell, clone);

        if include_children {
            for child in self.children(cell) {
                let child_clone = self.clone_subtree(child, true, mapping);
                let index = self.child_count(clone);
                self.insert_child_raw(clone, child_clone, index);
            }
        }
        clone
    }

    fn restore_clone(&mut self, clone: CellKey, cell: CellKey, mapping: &HashMap<CellKey, CellKey>) {
        for is_source in [true, false] {
            let terminal = self
                .terminal(cell, is_source)
                .and_then(|t| mapping.get(&t).copied());
            if let Some(terminal) = terminal {
                self.insert_edge(terminal, clone, is_source);
            }
        }

        let pairs: Vec<_> = self.children(clone).into_iter().zip(self.children(cell)).collect();
        for (clone_child, child) in pairs {
            self.restore_clone(clone_child, child, mapping);
        }
    }

    /// Merge the children of `from` in `source` beneath `to` in this model.
    ///
    /// A child whose id already names a cell here is reused instead of
    /// cloned, except edges when `clone_all_edges` is set. Clones keep their
    /// original id. Once the whole subtree is in place, every merged edge is
    /// reconnected to the counterparts of its source terminals; a terminal
    /// outside the merged subtree is disconnected.
    pub fn merge_children(
        &mut self,
        source: &GraphModel,
        from: CellKey,
        to: CellKey,
        clone_all_edges: bool,
    ) -> Result<()> {
        source.require(from)?;
        self.require(to)?;

        self.batch_update(|model| {
            let mut mapping = BTreeMap::new();
            let mut pending = Vec::new();
            model.merge_subtree(source, from, to, clone_all_edges, &mut mapping, &mut pending);

            debug!(
                mapped = mapping.len(),
                edges = pending.len(),
                "merged children"
            );

            for edge in pending {
                for (is_source, path) in [(true, edge.source), (false, edge.target)] {
                    let Some(path) = path else { continue };
                    let terminal = mapping.get(&path).copied();
                    model.set_terminal(edge.cell, terminal, is_source)?;
                }
            }
            Ok(())
        })
    }

    fn merge_subtree(
        &mut self,
        source: &GraphModel,
        from: CellKey,
        to: CellKey,
        clone_all_edges: bool,
        mapping: &mut BTreeMap<String, CellKey>,
        pending: &mut Vec<PendingEdge>,
    ) {
        for child in source.children(from) {
            let Some(cell) = source.cell(child) else { continue };

            let existing = cell
                .id()
                .filter(|_| !cell.is_edge() || !clone_all_edges)
                .and_then(|id| self.get_cell(id));

            let target = match existing {
                Some(target) => target,
                None => {
                    let mut clone = cell.clone_detached();
                    clone.id = cell.id().map(str::to_string);
                    let key = self.create(clone);

                    // Recorded as a plain insert so edges are not reparented
                    // before their terminals exist
                    let index = self.child_count(to);
                    self.execute(Change::Child(ChildChange::new(Some(to), key, index)));
                    key
                }
            };

            if cell.is_edge() && self.is_edge(target) {
                let source_path = cell.terminal(true).map(|t| source.cell_path(t));
                let target_path = cell.terminal(false).map(|t| source.cell_path(t));
                if source_path.is_some() || target_path.is_some() {
                    pending.push(PendingEdge {
                        cell: target,
                        source: source_path,
                        target: target_path,
                    });
                }
            }

            mapping.insert(source.cell_path(child), target);
            self.merge_subtree(source, child, target, clone_all_edges, mapping, pending);
        }
    }
}
