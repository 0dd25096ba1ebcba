use chrono::{DateTime, Utc};

use super::domain::{
    ActorId, ActorKind, AuditEntry, AwardClassification, AwardDetail, FormStatus,
    NomineeIdentity, NomineeParticulars, OrganizationSnapshot, Submission, SubmissionId,
    SubmissionRecord,
};
use super::search::{ActorQuery, SearchQuery};
use crate::workflows::terms::Semester;
use crate::workflows::RepositoryError;

/// Fully assembled nomination, written as header + detail + attachments in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub actor_id: ActorId,
    pub actor_kind: ActorKind,
    pub nominee: NomineeIdentity,
    pub organization: Option<OrganizationSnapshot>,
    pub academic_year: i32,
    pub semester: Semester,
    pub status: FormStatus,
    pub particulars: NomineeParticulars,
    pub detail: AwardDetail,
    pub attachments: Vec<NewAttachment>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub file_type: String,
    pub size_bytes: u64,
    pub path: String,
}

/// A guarded mutation. Applying one either changes nothing or changes the field and appends
/// exactly one audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Classification(AwardClassification),
    /// Compared on `status` alone. When the status already matches, the change is `Unchanged`
    /// and `reject_reason` is not written.
    Status {
        status: FormStatus,
        reject_reason: Option<String>,
    },
}

impl FieldChange {
    pub const fn field_name(&self) -> &'static str {
        match self {
            FieldChange::Classification(_) => "award_classification",
            FieldChange::Status { .. } => "form_status",
        }
    }

    pub fn new_value(&self) -> &'static str {
        match self {
            FieldChange::Classification(classification) => classification.label(),
            FieldChange::Status { status, .. } => status.label(),
        }
    }

    /// Current value of the targeted field on `submission`.
    pub fn current_value(&self, submission: &Submission) -> &'static str {
        match self {
            FieldChange::Classification(_) => submission.classification.label(),
            FieldChange::Status { .. } => submission.status.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Unchanged,
    Recorded(AuditEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub submission_id: SubmissionId,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub changed_by: ActorId,
    pub recorded_at: DateTime<Utc>,
}

/// Storage abstraction for award forms.
pub trait SubmissionRepository: Send + Sync {
    /// Fails with `Conflict` when the actor already filed for the same term.
    fn create(&self, submission: NewSubmission) -> Result<SubmissionRecord, RepositoryError>;
    fn exists_for_term(
        &self,
        actor: &ActorId,
        academic_year: i32,
        semester: Semester,
    ) -> Result<bool, RepositoryError>;
    fn fetch(&self, id: SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError>;
    /// Matching headers for the page plus the unpaged match count.
    fn search(&self, query: &SearchQuery) -> Result<(Vec<Submission>, u64), RepositoryError>;
    fn for_actor(&self, query: &ActorQuery) -> Result<(Vec<Submission>, u64), RepositoryError>;
    fn for_actor_in_term(
        &self,
        actor: &ActorId,
        academic_year: i32,
        semester: Semester,
    ) -> Result<Vec<SubmissionRecord>, RepositoryError>;
    /// Compare and set inside one transaction, appending the audit entry with the update.
    fn apply_change(
        &self,
        id: SubmissionId,
        change: &FieldChange,
        changed_by: &ActorId,
        at: DateTime<Utc>,
    ) -> Result<ChangeOutcome, RepositoryError>;
}

/// Append-only audit storage.
pub trait AuditLogRepository: Send + Sync {
    /// Fails with `NotFound` when the submission does not exist.
    fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, RepositoryError>;
    /// Entries for one submission, newest first.
    fn trail(&self, id: SubmissionId) -> Result<Vec<AuditEntry>, RepositoryError>;
}
