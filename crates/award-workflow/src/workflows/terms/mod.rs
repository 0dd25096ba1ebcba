//! Academic term registry.
//!
//! Terms are created strictly in (year, semester) order. Exactly one term may be current and at
//! most one may be open for registration; both flags only move through the exclusive toggle.

pub mod domain;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;


pub use domain::{AcademicTerm, NewTerm, Semester, TermDraft, TermFlag, TermId, TermPosition};
pub use repository::{TermPlacement, TermRepository, TermWriteError};
pub use router::term_router;
pub use rules::{validate_draft, TermRuleViolation, MAX_TERM_YEAR};
pub use service::{TermResolver, TermService, TermServiceError};
