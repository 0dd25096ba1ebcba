use chrono::NaiveDate;

use super::domain::{AcademicTerm, NewTerm, Semester, TermDraft, TermId, TermPosition};

/// Latest academic year a term may be placed in.
pub const MAX_TERM_YEAR: i32 = 9999;

/// Validation errors raised while placing a term in the academic calendar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermRuleViolation {
    #[error("semester must be 1 or 2 (found {found})")]
    InvalidSemester { found: u8 },
    #[error("year must be between 1 and {MAX_TERM_YEAR} (found {found})")]
    InvalidYear { found: i32 },
    #[error("end date {end} precedes start date {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    #[error("semester {semester} already exists for year {year}")]
    AlreadyExists { year: i32, semester: Semester },
    #[error("cannot create semester 1 because semester 2 already exists for year {year}")]
    SecondSemesterExists { year: i32 },
    #[error("semester 2 requires semester 1 for year {year}")]
    MissingFirstSemester { year: i32 },
    #[error("term {requested} does not follow the latest term {latest}; expected one of {}", format_positions(.expected))]
    OutOfOrder {
        requested: TermPosition,
        latest: TermPosition,
        expected: Vec<TermPosition>,
    },
}

fn format_positions(positions: &[TermPosition]) -> String {
    positions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a draft against every existing term, ignoring `exclude` (the term being edited).
pub fn validate_draft(
    existing: &[AcademicTerm],
    draft: &TermDraft,
    exclude: Option<TermId>,
) -> Result<NewTerm, TermRuleViolation> {
    let semester = Semester::from_number(draft.semester).ok_or(
        TermRuleViolation::InvalidSemester {
            found: draft.semester,
        },
    )?;
    if !(1..=MAX_TERM_YEAR).contains(&draft.year) {
        return Err(TermRuleViolation::InvalidYear { found: draft.year });
    }
    if draft.end_date < draft.start_date {
        return Err(TermRuleViolation::InvalidWindow {
            start: draft.start_date,
            end: draft.end_date,
        });
    }

    let accepted = NewTerm {
        year: draft.year,
        semester,
        start_date: draft.start_date,
        end_date: draft.end_date,
    };

    // An edit that keeps its calendar slot only changes dates.
    let requested = TermPosition::new(draft.year, semester);
    if existing
        .iter()
        .any(|term| Some(term.id) == exclude && term.position() == requested)
    {
        return Ok(accepted);
    }

    let others: Vec<&AcademicTerm> = existing
        .iter()
        .filter(|term| Some(term.id) != exclude)
        .collect();

    let has_semester = |wanted: Semester| {
        others
            .iter()
            .any(|term| term.year == draft.year && term.semester == wanted)
    };
    let has_first = has_semester(Semester::First);
    let has_second = has_semester(Semester::Second);

    match semester {
        Semester::First if has_first => {
            return Err(TermRuleViolation::AlreadyExists {
                year: draft.year,
                semester,
            })
        }
        Semester::Second if has_second => {
            return Err(TermRuleViolation::AlreadyExists {
                year: draft.year,
                semester,
            })
        }
        Semester::First if has_second => {
            return Err(TermRuleViolation::SecondSemesterExists { year: draft.year })
        }
        Semester::Second if !has_first => {
            return Err(TermRuleViolation::MissingFirstSemester { year: draft.year })
        }
        _ => {}
    }

    if let Some(latest) = others.iter().map(|term| term.position()).max() {
        let expected = latest.successors();
        if !expected.contains(&requested) {
            return Err(TermRuleViolation::OutOfOrder {
                requested,
                latest,
                expected,
            });
        }
    }

    Ok(accepted)
}
