use thiserror::Error;

use crate::model::{ContractTypeId, DraftId, DraftStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("editing is locked while the draft is in {status}")]
    EditingLocked { status: DraftStatus },

    #[error("no draft is open")]
    NoDraft,

    #[error("the draft must be saved first")]
    NotPersisted,

    #[error("cannot move a draft from {from} to {to}")]
    InvalidTransition { from: DraftStatus, to: DraftStatus },

    #[error("contract type {0} not found")]
    UnknownContractType(ContractTypeId),

    #[error("draft {0} has no contract type")]
    MissingContractType(DraftId),

    #[error("role {0:?} is not declared by the contract type")]
    UnknownRole(String),

    #[error("clause index {index} out of range (length {len})")]
    ClauseOutOfRange { index: usize, len: usize },

    #[error("imported content has no non-blank paragraph")]
    EmptyImport,
}

impl DraftError {
    /// Blocked edits are shown as a persistent banner rather than a transient error.
    pub fn is_blocked_edit(&self) -> bool {
        matches!(self, Self::EditingLocked { .. })
    }
}
