// Diagram Model - Core Library

pub mod cell;
pub mod change;
pub mod config;
mod edge_parent;
pub mod edit;
pub mod error;
pub mod event;
pub mod id_generator;
mod merge;
pub mod model;
pub mod style;
pub mod swimlane;
pub mod undo;
pub mod validation;

// Re-export main types for convenience
pub use cell::{Cell, CellKey, CellType, Geometry, Point, Rectangle};
pub use change::{
    Change, ChildChange, CollapseChange, GeometryChange, RootChange, StyleChange, TerminalChange,
    ValueChange, VisibleChange,
};
pub use config::{EditorConfig, ModelConfig, SwimlaneConfig};
pub use edit::UndoableEdit;
pub use error::{ModelError, Result};
pub use event::{EventBus, EventKind, Listener, ListenerId, ModelEvent};
pub use id_generator::IdGenerator;
pub use model::GraphModel;
pub use style::{CellStyleResolver, Style, StyleResolver};
pub use swimlane::SwimlaneManager;
pub use undo::UndoManager;
pub use validation::{
    ValidatedModel, ValidationIssue, ValidationIssueType, ValidationResult, ValidationSeverity,
    Validator,
};
