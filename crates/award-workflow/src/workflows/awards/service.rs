use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::attachments::{
    AttachmentPolicy, AttachmentStorage, AttachmentUpload, AttachmentViolation, StorageError,
    StoredFile,
};
use super::domain::{
    ActorId, ActorKind, AuditEntry, AwardClassification, FormStatus, NomineeIdentity,
    OrganizationSnapshot, Submission, SubmissionId, SubmissionRecord,
};
use super::input::{InputViolation, SubmissionInput};
use super::profile::{ActorProfile, ActorProfileResolver, ProfileError};
use super::repository::{
    AuditLogRepository, ChangeOutcome, FieldChange, NewAttachment, NewAuditEntry, NewSubmission,
    SubmissionRepository,
};
use super::search::{ActorQuery, Page, SearchQuery};
use crate::error::ErrorKind;
use crate::workflows::terms::{AcademicTerm, Semester, TermResolver};
use crate::workflows::RepositoryError;

/// Caller-supplied audit entry recorded outside the two guarded mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAnnotation {
    pub field_name: String,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationView {
    pub classification: AwardClassification,
    pub name: &'static str,
}

/// Orchestrates nomination intake, guarded mutations, and read models.
pub struct SubmissionService<R> {
    repository: Arc<R>,
    terms: Arc<dyn TermResolver>,
    profiles: Arc<dyn ActorProfileResolver>,
    storage: Arc<dyn AttachmentStorage>,
    policy: AttachmentPolicy,
}

impl<R> SubmissionService<R>
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        terms: Arc<dyn TermResolver>,
        profiles: Arc<dyn ActorProfileResolver>,
        storage: Arc<dyn AttachmentStorage>,
        policy: AttachmentPolicy,
    ) -> Self {
        Self {
            repository,
            terms,
            profiles,
            storage,
            policy,
        }
    }

    pub fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }

    /// File a nomination for the term that is current and open for registration.
    ///
    /// Nothing touches storage until the actor, the input, the term, and the attachment batch
    /// have all been accepted. Files written before a failed transaction are removed again.
    pub fn submit(
        &self,
        actor: &ActorId,
        input: SubmissionInput,
        uploads: Vec<AttachmentUpload>,
    ) -> Result<SubmissionRecord, SubmissionServiceError> {
        let profile = self
            .profiles
            .resolve(actor)?
            .ok_or_else(|| SubmissionServiceError::ActorNotEligible(actor.clone()))?;

        input.validate().inspect_err(|violation| {
            warn!(actor = %actor, %violation, "nomination rejected");
        })?;

        let term = self
            .terms
            .registrable_term()
            .map_err(SubmissionServiceError::Persistence)?
            .ok_or(SubmissionServiceError::RegistrationClosed)?;

        let mut submission = assemble(actor, profile, input, &term).inspect_err(|violation| {
            warn!(actor = %actor, %violation, "nomination rejected");
        })?;

        self.policy.validate(&uploads).inspect_err(|violation| {
            warn!(actor = %actor, %violation, "attachments rejected");
        })?;

        if self
            .repository
            .exists_for_term(actor, term.year, term.semester)
            .map_err(SubmissionServiceError::Persistence)?
        {
            return Err(SubmissionServiceError::duplicate(actor, &term));
        }

        let stored = self.store_uploads(&uploads)?;
        submission.attachments = stored
            .iter()
            .map(|file| NewAttachment {
                file_type: file.file_type.clone(),
                size_bytes: file.size_bytes,
                path: file.path.clone(),
            })
            .collect();

        match self.repository.create(submission) {
            Ok(record) => {
                info!(
                    form_id = %record.submission.id,
                    actor = %actor,
                    term = %term.position(),
                    classification = %record.submission.classification,
                    attachments = record.attachments.len(),
                    "award nomination submitted"
                );
                Ok(record)
            }
            Err(err) => {
                self.discard(&stored);
                match err {
                    RepositoryError::Conflict(_) => {
                        Err(SubmissionServiceError::duplicate(actor, &term))
                    }
                    other => Err(SubmissionServiceError::Persistence(other)),
                }
            }
        }
    }

    pub fn reclassify(
        &self,
        id: SubmissionId,
        classification: AwardClassification,
        changed_by: &ActorId,
    ) -> Result<ChangeOutcome, SubmissionServiceError> {
        self.apply(id, FieldChange::Classification(classification), changed_by)
    }

    pub fn change_status(
        &self,
        id: SubmissionId,
        status: FormStatus,
        reject_reason: Option<String>,
        changed_by: &ActorId,
    ) -> Result<ChangeOutcome, SubmissionServiceError> {
        let reject_reason = reject_reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        if let Some(reason) = &reject_reason {
            // A new reason is only recorded together with a status move.
            if let Some(record) = self.repository.fetch(id)? {
                let current = &record.submission;
                let new_reason = current.reject_reason.as_deref() != Some(reason.as_str());
                if current.status == status && new_reason {
                    return Err(InputViolation::ReasonWithoutStatusChange {
                        status: status.label(),
                    }
                    .into());
                }
            }
        }
        self.apply(
            id,
            FieldChange::Status {
                status,
                reject_reason,
            },
            changed_by,
        )
    }

    pub fn audit_trail(&self, id: SubmissionId) -> Result<Vec<AuditEntry>, SubmissionServiceError> {
        if self.repository.fetch(id)?.is_none() {
            return Err(SubmissionServiceError::NotFound(format!("submission {id}")));
        }
        Ok(self.repository.trail(id)?)
    }

    pub fn annotate(
        &self,
        id: SubmissionId,
        annotation: AuditAnnotation,
        changed_by: &ActorId,
    ) -> Result<AuditEntry, SubmissionServiceError> {
        let field_name = annotation.field_name.trim();
        if field_name.is_empty() {
            return Err(InputViolation::MissingField { field: "field_name" }.into());
        }

        let entry = self.repository.append(NewAuditEntry {
            submission_id: id,
            field_name: field_name.to_string(),
            old_value: annotation.old_value,
            new_value: annotation.new_value,
            changed_by: changed_by.clone(),
            recorded_at: Utc::now(),
        })?;
        info!(form_id = %id, field = %entry.field_name, changed_by = %changed_by, "audit entry recorded");
        Ok(entry)
    }

    pub fn get(&self, id: SubmissionId) -> Result<SubmissionRecord, SubmissionServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| SubmissionServiceError::NotFound(format!("submission {id}")))
    }

    pub fn search(&self, query: &SearchQuery) -> Result<Page<Submission>, SubmissionServiceError> {
        let (items, total) = self.repository.search(query)?;
        Ok(Page::new(items, total, query.page, query.limit))
    }

    pub fn for_actor(&self, query: &ActorQuery) -> Result<Page<Submission>, SubmissionServiceError> {
        let (items, total) = self.repository.for_actor(query)?;
        Ok(Page::new(items, total, query.page, query.limit))
    }

    /// The caller's nominations in the current term.
    pub fn for_actor_current_term(
        &self,
        actor: &ActorId,
    ) -> Result<Vec<SubmissionRecord>, SubmissionServiceError> {
        let term = self
            .terms
            .current_term()
            .map_err(SubmissionServiceError::Persistence)?
            .ok_or_else(|| SubmissionServiceError::NotFound("current academic term".into()))?;
        Ok(self
            .repository
            .for_actor_in_term(actor, term.year, term.semester)?)
    }

    pub fn classifications(&self) -> Vec<ClassificationView> {
        AwardClassification::ALL
            .into_iter()
            .map(|classification| ClassificationView {
                classification,
                name: classification.display_name(),
            })
            .collect()
    }

    fn apply(
        &self,
        id: SubmissionId,
        change: FieldChange,
        changed_by: &ActorId,
    ) -> Result<ChangeOutcome, SubmissionServiceError> {
        let outcome = self
            .repository
            .apply_change(id, &change, changed_by, Utc::now())?;

        match &outcome {
            ChangeOutcome::Unchanged => {
                debug!(form_id = %id, field = change.field_name(), "value unchanged; no audit entry");
            }
            ChangeOutcome::Recorded(entry) => {
                info!(
                    form_id = %id,
                    field = %entry.field_name,
                    old = %entry.old_value,
                    new = %entry.new_value,
                    changed_by = %changed_by,
                    "guarded change applied"
                );
            }
        }
        Ok(outcome)
    }

    fn store_uploads(
        &self,
        uploads: &[AttachmentUpload],
    ) -> Result<Vec<StoredFile>, SubmissionServiceError> {
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let file_type = upload.extension().unwrap_or_default();
            match self.storage.store(&file_type, &upload.content) {
                Ok(file) => stored.push(file),
                Err(err) => {
                    self.discard(&stored);
                    return Err(err.into());
                }
            }
        }
        Ok(stored)
    }

    fn discard(&self, stored: &[StoredFile]) {
        for file in stored {
            if let Err(err) = self.storage.remove(&file.path) {
                warn!(path = %file.path, error = %err, "failed to remove orphaned attachment");
            }
        }
    }
}

/// Merge the actor's profile with the role-specific input into one nomination.
fn assemble(
    actor: &ActorId,
    profile: ActorProfile,
    input: SubmissionInput,
    term: &AcademicTerm,
) -> Result<NewSubmission, InputViolation> {
    let (actor_kind, nominee, organization, particulars, detail) = match (profile, input) {
        (ActorProfile::Student(student), SubmissionInput::Student(nomination)) => {
            let nominee = NomineeIdentity {
                first_name: student.first_name,
                last_name: student.last_name,
                email: student.email,
                student_number: student.student_number,
                faculty_id: student.faculty_id,
                department_id: student.department_id,
                campus_id: student.campus_id,
            };
            (
                ActorKind::Student,
                nominee,
                None,
                nomination.particulars,
                nomination.detail,
            )
        }
        (ActorProfile::Organization(org), SubmissionInput::Organization(nomination)) => {
            let nominee = NomineeIdentity {
                first_name: nomination.nominee.first_name,
                last_name: nomination.nominee.last_name,
                email: nomination.nominee.email,
                student_number: nomination.nominee.student_number,
                faculty_id: nomination.nominee.faculty_id,
                department_id: nomination.nominee.department_id,
                campus_id: org.campus_id,
            };
            let organization = OrganizationSnapshot {
                name: org.name,
                organization_type: org.organization_type,
                location: org.location,
            };
            (
                ActorKind::Organization,
                nominee,
                Some(organization),
                nomination.particulars,
                nomination.detail,
            )
        }
        (profile, input) => {
            return Err(InputViolation::RoleMismatch {
                profile: profile.kind().label(),
                input: input.actor_kind().label(),
            })
        }
    };

    Ok(NewSubmission {
        actor_id: actor.clone(),
        actor_kind,
        nominee,
        organization,
        academic_year: term.year,
        semester: term.semester,
        status: FormStatus::INITIAL,
        particulars,
        detail,
        attachments: Vec::new(),
        submitted_at: Utc::now(),
    })
}

/// Error raised by the submission service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionServiceError {
    #[error("actor '{0}' has no student or organization profile")]
    ActorNotEligible(ActorId),
    #[error(transparent)]
    Validation(#[from] InputViolation),
    #[error(transparent)]
    Attachment(#[from] AttachmentViolation),
    #[error("no academic term is open for registration")]
    RegistrationClosed,
    #[error("actor '{actor}' already submitted a nomination for {year}/{semester}")]
    DuplicateSubmission {
        actor: ActorId,
        year: i32,
        semester: Semester,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("unable to persist nomination: {0}")]
    Persistence(RepositoryError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl SubmissionServiceError {
    fn duplicate(actor: &ActorId, term: &AcademicTerm) -> Self {
        SubmissionServiceError::DuplicateSubmission {
            actor: actor.clone(),
            year: term.year,
            semester: term.semester,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmissionServiceError::ActorNotEligible(_) => ErrorKind::ActorNotEligible,
            SubmissionServiceError::Validation(_) | SubmissionServiceError::Attachment(_) => {
                ErrorKind::Validation
            }
            SubmissionServiceError::RegistrationClosed => ErrorKind::RegistrationClosed,
            SubmissionServiceError::DuplicateSubmission { .. } => ErrorKind::Conflict,
            SubmissionServiceError::NotFound(_) => ErrorKind::NotFound,
            SubmissionServiceError::Storage(_) => ErrorKind::StorageFailure,
            SubmissionServiceError::Persistence(err) => match ErrorKind::from(err) {
                ErrorKind::Conflict => ErrorKind::Conflict,
                ErrorKind::NotFound => ErrorKind::NotFound,
                _ => ErrorKind::PersistenceFailure,
            },
            SubmissionServiceError::Profile(_) => ErrorKind::Internal,
        }
    }
}

impl From<RepositoryError> for SubmissionServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => SubmissionServiceError::NotFound("submission".into()),
            other => SubmissionServiceError::Persistence(other),
        }
    }
}
