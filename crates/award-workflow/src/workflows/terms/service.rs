use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{AcademicTerm, TermDraft, TermFlag, TermId};
use super::repository::{TermRepository, TermWriteError};
use super::rules::{validate_draft, TermRuleViolation};
use crate::error::ErrorKind;
use crate::workflows::RepositoryError;

/// Narrow view of the term service consumed by the submission workflow.
pub trait TermResolver: Send + Sync {
    /// The term that is both current and open for registration, if any.
    fn registrable_term(&self) -> Result<Option<AcademicTerm>, RepositoryError>;
    fn current_term(&self) -> Result<Option<AcademicTerm>, RepositoryError>;
}

/// Enforces the ordering rules and routes flag changes through the exclusive toggle.
pub struct TermService<T> {
    repository: Arc<T>,
}

impl<T> TermService<T>
where
    T: TermRepository + 'static,
{
    pub fn new(repository: Arc<T>) -> Self {
        Self { repository }
    }

    /// Validates and inserts under the store's write lock, so the ordering rules see every
    /// committed term.
    pub fn create(&self, draft: TermDraft) -> Result<AcademicTerm, TermServiceError> {
        let stored = self
            .repository
            .insert(&|existing| validate_draft(existing, &draft, None))
            .inspect_err(|err| {
                if let TermWriteError::Rule(violation) = err {
                    warn!(
                        year = draft.year,
                        semester = draft.semester,
                        %violation,
                        "term rejected"
                    );
                }
            })?;
        info!(term_id = %stored.id, position = %stored.position(), "academic term created");
        Ok(stored)
    }

    /// A term that submissions reference keeps its (year, semester); only its dates may change.
    pub fn update(&self, id: TermId, draft: TermDraft) -> Result<AcademicTerm, TermServiceError> {
        let stored = self
            .repository
            .update(id, &|existing| validate_draft(existing, &draft, Some(id)))
            .inspect_err(|err| {
                if let TermWriteError::Rule(violation) = err {
                    warn!(term_id = %id, %violation, "term update rejected");
                }
            })?;
        info!(term_id = %stored.id, position = %stored.position(), "academic term updated");
        Ok(stored)
    }

    pub fn delete(&self, id: TermId) -> Result<(), TermServiceError> {
        self.repository.delete(id)?;
        info!(term_id = %id, "academic term deleted");
        Ok(())
    }

    pub fn get(&self, id: TermId) -> Result<AcademicTerm, TermServiceError> {
        let term = self.repository.find(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(term)
    }

    pub fn list(&self) -> Result<Vec<AcademicTerm>, TermServiceError> {
        Ok(self.repository.list()?)
    }

    /// Highest (year, semester) in the store.
    pub fn latest(&self) -> Result<AcademicTerm, TermServiceError> {
        let latest = self
            .repository
            .list()?
            .into_iter()
            .max_by_key(AcademicTerm::position)
            .ok_or(RepositoryError::NotFound)?;
        Ok(latest)
    }

    pub fn set_current(&self, id: TermId) -> Result<AcademicTerm, TermServiceError> {
        self.toggle(id, TermFlag::Current)
    }

    pub fn open_for_registration(&self, id: TermId) -> Result<AcademicTerm, TermServiceError> {
        self.toggle(id, TermFlag::OpenForRegistration)
    }

    pub fn current(&self) -> Result<AcademicTerm, TermServiceError> {
        let term = self.repository.current()?.ok_or(RepositoryError::NotFound)?;
        Ok(term)
    }

    pub fn registrable(&self) -> Result<AcademicTerm, TermServiceError> {
        let term = self
            .repository
            .registrable()?
            .ok_or(RepositoryError::NotFound)?;
        Ok(term)
    }

    fn toggle(&self, id: TermId, flag: TermFlag) -> Result<AcademicTerm, TermServiceError> {
        let term = self.repository.set_exclusive(id, flag)?;
        info!(term_id = %id, flag = flag.label(), "term flag moved");
        Ok(term)
    }
}

impl<T> TermResolver for TermService<T>
where
    T: TermRepository + 'static,
{
    fn registrable_term(&self) -> Result<Option<AcademicTerm>, RepositoryError> {
        self.repository.registrable()
    }

    fn current_term(&self) -> Result<Option<AcademicTerm>, RepositoryError> {
        self.repository.current()
    }
}

/// Error raised by the term service.
#[derive(Debug, thiserror::Error)]
pub enum TermServiceError {
    #[error(transparent)]
    Rule(#[from] TermRuleViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TermServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TermServiceError::Rule(_) => ErrorKind::Validation,
            TermServiceError::Repository(err) => ErrorKind::from(err),
        }
    }
}

impl From<TermWriteError> for TermServiceError {
    fn from(err: TermWriteError) -> Self {
        match err {
            TermWriteError::Rule(violation) => TermServiceError::Rule(violation),
            TermWriteError::Repository(err) => TermServiceError::Repository(err),
        }
    }
}
