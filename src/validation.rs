use crate::{CellKey, GraphModel};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Validation severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,    // worth knowing, harmless
    Warning, // legal but probably unintended
    Error,   // structural invariant broken
}

/// Validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
    pub affected_cells: Vec<CellKey>,
    pub issue_type: ValidationIssueType,
}

/// Types of validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssueType {
    /// A cell is reachable twice from the root
    Cycle,
    /// Child list and parent reference disagree
    BrokenParentLink,
    /// Id index does not mirror the attached cells
    IndexMismatch,
    /// Attached cell without an id while ids are generated
    MissingId,
    /// Edge list and terminal reference disagree
    BrokenEdgeLink,
    /// Edge connected to a cell outside the tree
    DetachedTerminal,
    /// Edge with an open end
    DanglingEdge,
}

/// Complete validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    fn report(
        &mut self,
        severity: ValidationSeverity,
        issue_type: ValidationIssueType,
        affected_cells: Vec<CellKey>,
        message: String,
    ) {
        self.add_issue(ValidationIssue {
            severity,
            message,
            affected_cells,
            issue_type,
        });
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Get all errors
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.by_severity(ValidationSeverity::Error)
    }

    /// Get all warnings
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.by_severity(ValidationSeverity::Warning)
    }

    /// Get all info messages
    pub fn info(&self) -> Vec<&ValidationIssue> {
        self.by_severity(ValidationSeverity::Info)
    }

    fn by_severity(&self, severity: ValidationSeverity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect()
    }

    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

/// Structural checker for graph models
pub struct Validator;

impl Validator {
    /// Run all validations on a model
    pub fn validate(model: &GraphModel) -> ValidationResult {
        let mut result = ValidationResult::new();
        let attached = Self::check_tree(model, &mut result);
        Self::check_index(model, &attached, &mut result);
        Self::check_edges(model, &attached, &mut result);
        result
    }

    /// Walk the tree from the root, checking parent links and repeats.
    /// Returns every cell reached.
    fn check_tree(model: &GraphModel, result: &mut ValidationResult) -> HashSet<CellKey> {
        let mut visited = HashSet::new();
        let Some(root) = model.root() else {
            return visited;
        };

        if let Some(parent) = model.parent(root) {
            result.report(
                ValidationSeverity::Error,
                ValidationIssueType::BrokenParentLink,
                vec![root, parent],
                "Root cell has a parent".to_string(),
            );
        }

        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            if !visited.insert(key) {
                result.report(
                    ValidationSeverity::Error,
                    ValidationIssueType::Cycle,
                    vec![key],
                    format!("Cell {} is reachable more than once", key),
                );
                continue;
            }

            for child in model.children(key) {
                if model.cell(child).is_none() {
                    result.report(
                        ValidationSeverity::Error,
                        ValidationIssueType::BrokenParentLink,
                        vec![key],
                        format!("Child {} of {} does not exist", child, key),
                    );
                    continue;
                }
                if model.parent(child) != Some(key) {
                    result.report(
                        ValidationSeverity::Error,
                        ValidationIssueType::BrokenParentLink,
                        vec![key, child],
                        format!("Cell {} lists {} as child, but its parent differs", key, child),
                    );
                }
                stack.push(child);
            }
        }
        visited
    }

    fn check_index(model: &GraphModel, attached: &HashSet<CellKey>, result: &mut ValidationResult) {
        for (id, key) in model.indexed_cells() {
            if !attached.contains(&key) {
                result.report(
                    ValidationSeverity::Error,
                    ValidationIssueType::IndexMismatch,
                    vec![key],
                    format!("Id '{}' indexes a cell outside the tree", id),
                );
            } else if model.id(key) != Some(id) {
                result.report(
                    ValidationSeverity::Error,
                    ValidationIssueType::IndexMismatch,
                    vec![key],
                    format!("Id '{}' indexes a cell with a different id", id),
                );
            }
        }

        let mut missing_ids = Vec::new();
        for key in attached {
            match model.id(*key) {
                Some(id) if model.get_cell(id) != Some(*key) => {
                    result.report(
                        ValidationSeverity::Error,
                        ValidationIssueType::IndexMismatch,
                        vec![*key],
                        format!("Attached cell '{}' is not indexed", id),
                    );
                }
                None => missing_ids.push(*key),
                _ => {}
            }
        }

        if !missing_ids.is_empty() && model.is_create_ids() {
            result.report(
                ValidationSeverity::Warning,
                ValidationIssueType::MissingId,
                missing_ids,
                "Attached cells without an id".to_string(),
            );
        }
    }

    fn check_edges(model: &GraphModel, attached: &HashSet<CellKey>, result: &mut ValidationResult) {
        let mut dangling = Vec::new();

        for key in attached {
            let Some(cell) = model.cell(*key) else { continue };

            for edge in cell.edges() {
                let connected = model.terminal(*edge, true) == Some(*key)
                    || model.terminal(*edge, false) == Some(*key);
                if !connected {
                    result.report(
                        ValidationSeverity::Error,
                        ValidationIssueType::BrokenEdgeLink,
                        vec![*key, *edge],
                        format!("Cell {} lists edge {} that does not connect to it", key, edge),
                    );
                }
            }

            if !cell.is_edge() {
                continue;
            }

            for is_source in [true, false] {
                let Some(terminal) = cell.terminal(is_source) else {
                    dangling.push(*key);
                    continue;
                };

                let listed = model
                    .cell(terminal)
                    .is_some_and(|t| t.edges().contains(key));
                if !listed {
                    result.report(
                        ValidationSeverity::Error,
                        ValidationIssueType::BrokenEdgeLink,
                        vec![*key, terminal],
                        format!("Terminal {} does not list edge {}", terminal, key),
                    );
                } else if !attached.contains(&terminal) {
                    result.report(
                        ValidationSeverity::Warning,
                        ValidationIssueType::DetachedTerminal,
                        vec![*key, terminal],
                        format!("Edge {} connects to detached cell {}", key, terminal),
                    );
                }
            }
        }

        dangling.sort();
        dangling.dedup();
        if !dangling.is_empty() {
            result.report(
                ValidationSeverity::Info,
                ValidationIssueType::DanglingEdge,
                dangling,
                "Edges with an unconnected end".to_string(),
            );
        }
    }
}

/// Extension trait for GraphModel to add validation
pub trait ValidatedModel {
    /// Validate the model
    fn validate(&self) -> ValidationResult;

    /// Get cells with validation issues
    fn cells_with_issues(&self, result: &ValidationResult) -> HashMap<CellKey, ValidationSeverity>;
}

impl ValidatedModel for GraphModel {
    fn validate(&self) -> ValidationResult {
        Validator::validate(self)
    }

    fn cells_with_issues(&self, result: &ValidationResult) -> HashMap<CellKey, ValidationSeverity> {
        let mut cells = HashMap::new();

        for issue in &result.issues {
            for cell_id in &issue.affected_cells {
                cells
                    .entry(*cell_id)
                    .and_modify(|severity| {
                        // Keep the highest severity
                        if issue.severity as u8 > *severity as u8 {
                            *severity = issue.severity;
                        }
                    })
                    .or_insert(issue.severity);
            }
        }

        cells
    }
}
