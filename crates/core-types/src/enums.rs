use serde::{Deserialize, Serialize};
use std::fmt;

/// Distinguishes the seller's own storefront from a tracked competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    OwnStore,
    Competitor,
}

/// Whether a source takes part in comparison aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceStatus {
    #[default]
    Active,
    Inactive,
}

impl SourceStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SourceStatus::Active)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Active => write!(f, "Active"),
            SourceStatus::Inactive => write!(f, "Inactive"),
        }
    }
}
