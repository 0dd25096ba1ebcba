use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for academic term rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(pub i64);

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two semesters an academic year is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    pub const fn number(self) -> u8 {
        match self {
            Semester::First => 1,
            Semester::Second => 2,
        }
    }

    pub const fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(Semester::First),
            2 => Some(Semester::Second),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Semester {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Semester::from_number(value).ok_or_else(|| format!("semester must be 1 or 2 (found {value})"))
    }
}

impl From<Semester> for u8 {
    fn from(value: Semester) -> Self {
        value.number()
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Position of a term in the (year, semester) successor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TermPosition {
    pub year: i32,
    pub semester: Semester,
}

impl TermPosition {
    pub const fn new(year: i32, semester: Semester) -> Self {
        Self { year, semester }
    }

    /// Positions a new term may take directly after `self`: the next semester of the same
    /// year, or the first semester of the following year.
    pub fn successors(self) -> Vec<TermPosition> {
        let next_year = self
            .year
            .checked_add(1)
            .map(|year| TermPosition::new(year, Semester::First));
        let same_year = match self.semester {
            Semester::First => Some(TermPosition::new(self.year, Semester::Second)),
            Semester::Second => None,
        };
        same_year.into_iter().chain(next_year).collect()
    }
}

impl fmt::Display for TermPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.semester)
    }
}

/// Persisted academic term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicTerm {
    pub id: TermId,
    pub year: i32,
    pub semester: Semester,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
    pub is_open_for_registration: bool,
}

impl AcademicTerm {
    pub fn position(&self) -> TermPosition {
        TermPosition::new(self.year, self.semester)
    }

    /// A term accepts new submissions only while it is both current and open.
    pub fn is_registrable(&self) -> bool {
        self.is_current && self.is_open_for_registration
    }
}

/// Administrator input for creating or editing a term. The semester stays raw so that an
/// out-of-range value is reported by the ordering rules rather than by deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDraft {
    pub year: i32,
    pub semester: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Validated term ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTerm {
    pub year: i32,
    pub semester: Semester,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// The two singleton flags. Each is held by at most one term at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermFlag {
    Current,
    OpenForRegistration,
}

impl TermFlag {
    pub const fn column(self) -> &'static str {
        match self {
            TermFlag::Current => "is_current",
            TermFlag::OpenForRegistration => "is_open_for_registration",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TermFlag::Current => "current",
            TermFlag::OpenForRegistration => "open_for_registration",
        }
    }
}
