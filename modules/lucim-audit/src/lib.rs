//! Deterministic LUCIM compliance auditors.
//!
//! Each auditor takes an already-produced artifact and returns an
//! [`AuditResult`](lucim_common::AuditResult): no I/O, no shared state, and
//! the same input always yields the same violations in the same order.

pub mod block;
pub mod diagram;
pub mod model;
pub mod operation_model;
pub mod plantuml;
pub mod scenario;
pub mod suggest;

pub use diagram::DiagramAuditor;
pub use model::ModelIndex;
pub use operation_model::OperationModelAuditor;
pub use scenario::{ScenarioAuditor, ScenarioInput};
pub use suggest::{fix_suggestion, ChangeType, FixSuggestion};
