//! Contract drafting core: interpolation, qualification blocks, clause
//! ordering and the DRAFT → REVIEW → FINAL lifecycle. No I/O.

pub mod clauses;
pub mod document;
pub mod draft;
pub mod error;
pub mod events;
pub mod format;
pub mod markup;
pub mod model;
pub mod qualification;
pub mod template;

pub use clauses::{Appended, ClauseSequence};
pub use document::DocumentLayout;
pub use draft::{Draft, WorkingState};
pub use error::DraftError;
pub use events::{AttachmentRequested, Notice, NoticeLevel};
pub use format::{IdKind, ValidationError};
pub use model::{
    Attachment, Clause, ClauseId, ContractType, DraftId, DraftPayload, DraftRecord, DraftStatus,
    Entity, HistoryEntry, PartyAssignment, QualificationTemplate, VariableValues,
};
