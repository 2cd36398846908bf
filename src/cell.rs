use crate::Style;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ulid::Ulid;

/// Opaque handle to a cell owned by a [`GraphModel`](crate::GraphModel).
///
/// Handles are unique across models, so a handle from one model never
/// resolves to a cell in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey(Ulid);

impl CellKey {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CellKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the diagram tree
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Store handle, fixed for the lifetime of the cell
    pub(crate) key: CellKey,

    /// Externally visible id, assigned by the model on insertion if absent
    pub(crate) id: Option<String>,

    /// User payload
    pub(crate) value: Value,

    pub(crate) style: Style,

    /// Position and size; relative geometries are positioned by an ancestor
    pub(crate) geometry: Option<Geometry>,

    /// Vertex/edge classification, fixed at creation
    pub(crate) cell_type: CellType,

    pub(crate) visible: bool,
    pub(crate) collapsed: bool,

    pub(crate) parent: Option<CellKey>,
    pub(crate) children: Vec<CellKey>,

    /// Edges for which this cell is a terminal
    pub(crate) edges: Vec<CellKey>,

    pub(crate) source: Option<CellKey>,
    pub(crate) target: Option<CellKey>,
}

impl Cell {
    /// Create a new detached cell of the given type
    pub fn new(cell_type: CellType) -> Self {
        Self {
            key: CellKey::new(),
            id: None,
            value: Value::Null,
            style: Style::default(),
            geometry: None,
            cell_type,
            visible: true,
            collapsed: false,
            parent: None,
            children: Vec::new(),
            edges: Vec::new(),
            source: None,
            target: None,
        }
    }

    /// Create a vertex with the given payload and geometry
    pub fn vertex(value: impl Into<Value>, geometry: Geometry) -> Self {
        Self::new(CellType::Vertex)
            .with_value(value)
            .with_geometry(geometry)
    }

    /// Create an edge with the given payload and a default relative geometry
    pub fn edge(value: impl Into<Value>) -> Self {
        Self::new(CellType::Edge)
            .with_value(value)
            .with_geometry(Geometry::default().with_relative(true))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    /// Copy of this cell's attributes with a fresh key and no id, parent,
    /// children, edges or terminals
    pub fn clone_detached(&self) -> Self {
        Self {
            value: self.value.clone(),
            style: self.style.clone(),
            geometry: self.geometry.clone(),
            visible: self.visible,
            collapsed: self.collapsed,
            ..Self::new(self.cell_type)
        }
    }

    pub fn key(&self) -> CellKey {
        self.key
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn is_vertex(&self) -> bool {
        self.cell_type == CellType::Vertex
    }

    pub fn is_edge(&self) -> bool {
        self.cell_type == CellType::Edge
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn parent(&self) -> Option<CellKey> {
        self.parent
    }

    pub fn children(&self) -> &[CellKey] {
        &self.children
    }

    pub fn edges(&self) -> &[CellKey] {
        &self.edges
    }

    /// Source (`is_source`) or target terminal of an edge
    pub fn terminal(&self, is_source: bool) -> Option<CellKey> {
        if is_source {
            self.source
        } else {
            self.target
        }
    }

    /// Whether the geometry is positioned relative to the parent
    pub fn has_relative_geometry(&self) -> bool {
        self.geometry.as_ref().is_some_and(|geo| geo.relative)
    }

    pub(crate) fn set_terminal(&mut self, terminal: Option<CellKey>, is_source: bool) {
        if is_source {
            self.source = terminal;
        } else {
            self.target = terminal;
        }
    }

    pub(crate) fn index_of(&self, child: CellKey) -> Option<usize> {
        self.children.iter().position(|c| *c == child)
    }
}

/// Cell classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CellType {
    /// Structural cell such as the root or a layer
    Plain,
    Vertex,
    Edge,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rectangle representing position and size
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    /// Create a new rectangle
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Cell geometry.
///
/// For vertices `x`/`y` are offsets into the parent. When `relative` is set the
/// position is expressed relative to the parent's size instead and the cell does
/// not serve as an absolute anchor. Edges keep their routing in `points` and the
/// optional dangling end points.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub relative: bool,
    pub source_point: Option<Point>,
    pub target_point: Option<Point>,
    pub points: Vec<Point>,
}

impl Geometry {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    /// Move the geometry by the given deltas. Relative positions are left
    /// alone; end points and control points always move.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        if !self.relative {
            self.x += dx;
            self.y += dy;
        }

        for point in self
            .source_point
            .iter_mut()
            .chain(self.target_point.iter_mut())
            .chain(self.points.iter_mut())
        {
            point.x += dx;
            point.y += dy;
        }
    }
}
