//! Swimlane sizing.
//!
//! Swimlanes stacked along a layout axis share their extent across that axis:
//! a lane added next to others takes over their cross-axis size, and resizing
//! a lane pushes the new size from its outermost ancestor down through every
//! nested lane. Each lane reserves a header band (its start size) that is
//! subtracted before the size is handed to its children.

use crate::style::{
    CellStyleResolver, StyleResolver, DEFAULT_START_SIZE, SHAPE_SWIMLANE, STYLE_HORIZONTAL,
    STYLE_SHAPE, STYLE_START_SIZE,
};
use crate::{CellKey, GraphModel, Rectangle, Result, SwimlaneConfig};
use tracing::{debug, trace};

/// Keeps sibling and nested swimlane sizes consistent
#[derive(Debug, Clone, Default)]
pub struct SwimlaneManager<R: StyleResolver = CellStyleResolver> {
    config: SwimlaneConfig,
    resolver: R,
}

impl SwimlaneManager {
    pub fn new(config: SwimlaneConfig) -> Self {
        Self::with_resolver(config, CellStyleResolver)
    }
}

impl<R: StyleResolver> SwimlaneManager<R> {
    pub fn with_resolver(config: SwimlaneConfig, resolver: R) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &SwimlaneConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SwimlaneConfig {
        &mut self.config
    }

    /// A swimlane is a non-edge cell below layer level whose shape is `swimlane`
    pub fn is_swimlane(&self, model: &GraphModel, cell: CellKey) -> bool {
        let Some(c) = model.cell(cell) else {
            return false;
        };
        if c.is_edge() || c.parent().is_none() || model.is_layer(cell) {
            return false;
        }
        self.resolver.resolve(model, cell).get(STYLE_SHAPE) == Some(SHAPE_SWIMLANE)
    }

    /// Cells the manager never resizes
    pub fn is_swimlane_ignored(&self, model: &GraphModel, cell: CellKey) -> bool {
        !self.is_swimlane(model, cell)
    }

    /// Orientation of the lane's children. Cells that are not swimlanes
    /// follow the manager default.
    pub fn is_cell_horizontal(&self, model: &GraphModel, cell: CellKey) -> bool {
        if self.is_swimlane(model, cell) {
            self.resolver
                .resolve(model, cell)
                .get_bool(STYLE_HORIZONTAL, true)
        } else {
            self.config.horizontal
        }
    }

    /// Header band reserved by a swimlane: its height for horizontal lanes,
    /// its width for vertical ones. Empty for every other cell.
    pub fn start_size(&self, model: &GraphModel, cell: CellKey) -> Rectangle {
        if !self.is_swimlane(model, cell) {
            return Rectangle::default();
        }

        let style = self.resolver.resolve(model, cell);
        let size = style.get_f32(STYLE_START_SIZE, DEFAULT_START_SIZE);
        if style.get_bool(STYLE_HORIZONTAL, true) {
            Rectangle::new(0.0, 0.0, 0.0, size)
        } else {
            Rectangle::new(0.0, 0.0, size, 0.0)
        }
    }

    /// Notification entry point, honoring the enabled switches
    pub fn on_cells_added(&self, model: &mut GraphModel, cells: &[CellKey]) -> Result<()> {
        if self.config.enabled && self.config.add_enabled {
            self.cells_added(model, cells)?;
        }
        Ok(())
    }

    /// Notification entry point, honoring the enabled switches
    pub fn on_cells_resized(&self, model: &mut GraphModel, cells: &[CellKey]) -> Result<()> {
        if self.config.enabled && self.config.resize_enabled {
            self.cells_resized(model, cells)?;
        }
        Ok(())
    }

    /// Size every added swimlane like its first sized sibling
    pub fn cells_added(&self, model: &mut GraphModel, cells: &[CellKey]) -> Result<()> {
        model.batch_update(|model| {
            for cell in cells {
                if !self.is_swimlane_ignored(model, *cell) {
                    self.swimlane_added(model, *cell)?;
                }
            }
            Ok(())
        })
    }

    fn swimlane_added(&self, model: &mut GraphModel, swimlane: CellKey) -> Result<()> {
        let Some(parent) = model.parent(swimlane) else {
            return Ok(());
        };

        let reference = model
            .children(parent)
            .into_iter()
            .filter(|child| *child != swimlane && !self.is_swimlane_ignored(model, *child))
            .find_map(|child| model.geometry(child).cloned());

        if let Some(geo) = reference {
            let parent_horizontal = self.is_cell_horizontal(model, parent);
            self.resize_swimlane(model, swimlane, geo.width, geo.height, parent_horizontal)?;
        }
        Ok(())
    }

    /// Re-apply sizes from the outermost ancestor of every resized swimlane
    pub fn cells_resized(&self, model: &mut GraphModel, cells: &[CellKey]) -> Result<()> {
        model.batch_update(|model| {
            for cell in cells {
                if self.is_swimlane_ignored(model, *cell) {
                    continue;
                }
                let Some(geo) = model.geometry(*cell) else {
                    continue;
                };

                let mut width = geo.width;
                let mut height = geo.height;
                let mut top = *cell;
                let mut current = model.parent(*cell);

                while let Some(ancestor) = current {
                    top = ancestor;
                    let chrome = self.start_size(model, ancestor);
                    width += chrome.width;
                    height += chrome.height;
                    current = model.parent(ancestor);
                }

                trace!(%top, width, height, "propagating swimlane size");
                self.resize_swimlane(model, top, width, height, self.config.horizontal)?;
            }
            Ok(())
        })
    }

    /// Set the cross-axis size of `swimlane` and push the remaining space down.
    ///
    /// With a horizontal parent only the height is touched, otherwise only
    /// the width. Children are visited whether or not this cell changed.
    pub fn resize_swimlane(
        &self,
        model: &mut GraphModel,
        swimlane: CellKey,
        width: f32,
        height: f32,
        parent_horizontal: bool,
    ) -> Result<()> {
        model.batch_update(|model| {
            let horizontal = self.is_cell_horizontal(model, swimlane);

            if !self.is_swimlane_ignored(model, swimlane) {
                if let Some(geo) = model.geometry(swimlane) {
                    let mut geo = geo.clone();
                    let changed = if parent_horizontal {
                        std::mem::replace(&mut geo.height, height) != height
                    } else {
                        std::mem::replace(&mut geo.width, width) != width
                    };

                    if changed {
                        debug!(%swimlane, width = geo.width, height = geo.height, "resizing swimlane");
                        model.set_geometry(swimlane, geo)?;
                    }
                }
            }

            let chrome = self.start_size(model, swimlane);
            let width = width - chrome.width;
            let height = height - chrome.height;

            for child in model.children(swimlane) {
                self.resize_swimlane(model, child, width, height, horizontal)?;
            }
            Ok(())
        })
    }
}
