pub mod config;
pub mod error;
pub mod naming;
pub mod rules;
pub mod types;

pub use config::AuditConfig;
pub use error::AuditError;
pub use naming::*;
pub use rules::{Artifact, RuleDefinition, RuleId, RULE_CATALOGUE_VERSION};
pub use types::*;
