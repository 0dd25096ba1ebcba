//! Award nomination intake, review, and audit.
//!
//! A nomination is filed against the term that is both current and open for registration. Its
//! header, classification detail, and attachment rows are written in one transaction, and every
//! later classification or status change is paired with an audit entry.

pub mod attachments;
pub mod domain;
pub mod input;
pub mod profile;
pub mod repository;
pub mod router;
pub mod search;
pub mod service;

#[cfg(test)]
mod tests;

pub use attachments::{
    AttachmentPolicy, AttachmentStorage, AttachmentUpload, AttachmentViolation,
    LocalAttachmentStorage, StorageError, StoredFile,
};
pub use domain::{
    ActivityDetail, ActorId, ActorKind, Attachment, AuditEntry, AwardClassification, AwardDetail,
    CreativityDetail, FormStatus, NomineeIdentity, NomineeParticulars, OrganizationSnapshot,
    Submission, SubmissionId, SubmissionRecord,
};
pub use input::{
    InputViolation, NomineeInput, OrganizationNomination, StudentNomination, SubmissionInput,
};
pub use profile::{
    ActorDirectory, ActorProfile, ActorProfileResolver, DirectoryError, OrganizationProfile,
    ProfileError, StudentProfile,
};
pub use repository::{
    AuditLogRepository, ChangeOutcome, FieldChange, NewAttachment, NewAuditEntry, NewSubmission,
    SubmissionRepository,
};
pub use router::{submission_router, ACTOR_HEADER, CAMPUS_HEADER};
pub use search::{ActorQuery, ActorRequest, Page, SearchQuery, SearchRequest, SortOrder};
pub use service::{AuditAnnotation, ClassificationView, SubmissionService, SubmissionServiceError};
