use crate::{CellKey, GraphModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STYLE_SHAPE: &str = "shape";
pub const STYLE_HORIZONTAL: &str = "horizontal";
pub const STYLE_START_SIZE: &str = "startSize";
pub const SHAPE_SWIMLANE: &str = "swimlane";

/// Header band reserved by a swimlane when its style does not say otherwise
pub const DEFAULT_START_SIZE: f32 = 40.0;

/// Key/value style descriptor attached to a cell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(BTreeMap<String, String>);

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style with the swimlane shape and the given orientation
    pub fn swimlane(horizontal: bool) -> Self {
        Self::new()
            .with(STYLE_SHAPE, SHAPE_SWIMLANE)
            .with(STYLE_HORIZONTAL, if horizontal { "1" } else { "0" })
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Boolean lookup accepting `1`/`0` and `true`/`false`
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            _ => default,
        }
    }

    pub fn get_f32(&self, key: &str, default: f32) -> f32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolves the effective style of a cell.
///
/// The view layer usually merges named stylesheet entries here; the model only
/// needs lookups.
pub trait StyleResolver {
    fn resolve(&self, model: &GraphModel, cell: CellKey) -> Style;
}

/// Resolver returning the style stored on the cell itself
#[derive(Debug, Clone, Copy, Default)]
pub struct CellStyleResolver;

impl StyleResolver for CellStyleResolver {
    fn resolve(&self, model: &GraphModel, cell: CellKey) -> Style {
        model
            .cell(cell)
            .map(|c| c.style().clone())
            .unwrap_or_default()
    }
}

impl<F> StyleResolver for F
where
    F: Fn(&GraphModel, CellKey) -> Style,
{
    fn resolve(&self, model: &GraphModel, cell: CellKey) -> Style {
        self(model, cell)
    }
}
