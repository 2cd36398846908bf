use crate::CellKey;
use thiserror::Error;

/// Caller-contract violations reported by the graph model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Cell not found: {0}")]
    CellNotFound(CellKey),

    #[error("Cell is not an edge: {0}")]
    NotAnEdge(CellKey),

    #[error("Cannot insert {child} beneath its own descendant {parent}")]
    CyclicInsert { parent: CellKey, child: CellKey },

    #[error("Invalid cell path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
