use super::domain::{AcademicTerm, NewTerm, TermFlag, TermId};
use super::rules::TermRuleViolation;
use crate::workflows::RepositoryError;

/// Places a term given every stored term, newest first.
pub type TermPlacement<'a> = dyn Fn(&[AcademicTerm]) -> Result<NewTerm, TermRuleViolation> + 'a;

/// Failure of a term write that is validated against the stored calendar.
#[derive(Debug, thiserror::Error)]
pub enum TermWriteError {
    #[error(transparent)]
    Rule(#[from] TermRuleViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Storage abstraction for academic terms.
///
/// `insert` and `update` run `place` and write its result under one write lock, so two
/// concurrent placements never both see the same latest term. `set_exclusive` is the only write
/// path for the current / open flags: it clears the flag on every term and sets it on `id`
/// inside one transaction.
pub trait TermRepository: Send + Sync {
    fn insert(&self, place: &TermPlacement<'_>) -> Result<AcademicTerm, TermWriteError>;
    /// Fails with `InUse` when the term moves to another (year, semester) while submissions
    /// reference its current one.
    fn update(&self, id: TermId, place: &TermPlacement<'_>)
        -> Result<AcademicTerm, TermWriteError>;
    /// Fails with `InUse` while submissions reference the term's (year, semester).
    fn delete(&self, id: TermId) -> Result<(), RepositoryError>;
    fn find(&self, id: TermId) -> Result<Option<AcademicTerm>, RepositoryError>;
    /// Every term, newest (year, semester) first.
    fn list(&self) -> Result<Vec<AcademicTerm>, RepositoryError>;
    fn set_exclusive(&self, id: TermId, flag: TermFlag) -> Result<AcademicTerm, RepositoryError>;
    fn current(&self) -> Result<Option<AcademicTerm>, RepositoryError>;
    fn registrable(&self) -> Result<Option<AcademicTerm>, RepositoryError>;
}
