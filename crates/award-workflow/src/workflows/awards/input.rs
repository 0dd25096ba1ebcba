use serde::{Deserialize, Serialize};

use super::domain::{ActorKind, AwardDetail, NomineeParticulars};

/// Role-specific nomination payload. Students nominate themselves; organizations name the
/// nominee explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum SubmissionInput {
    Student(StudentNomination),
    Organization(OrganizationNomination),
}

impl SubmissionInput {
    pub fn actor_kind(&self) -> ActorKind {
        match self {
            SubmissionInput::Student(_) => ActorKind::Student,
            SubmissionInput::Organization(_) => ActorKind::Organization,
        }
    }

    pub fn particulars(&self) -> &NomineeParticulars {
        match self {
            SubmissionInput::Student(nomination) => &nomination.particulars,
            SubmissionInput::Organization(nomination) => &nomination.particulars,
        }
    }

    pub fn detail(&self) -> &AwardDetail {
        match self {
            SubmissionInput::Student(nomination) => &nomination.detail,
            SubmissionInput::Organization(nomination) => &nomination.detail,
        }
    }

    /// Reject incomplete or out-of-range input before anything is written.
    pub fn validate(&self) -> Result<(), InputViolation> {
        if let SubmissionInput::Organization(nomination) = self {
            nomination.nominee.validate()?;
        }
        validate_particulars(self.particulars())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentNomination {
    pub particulars: NomineeParticulars,
    pub detail: AwardDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationNomination {
    pub nominee: NomineeInput,
    pub particulars: NomineeParticulars,
    pub detail: AwardDetail,
}

/// Nominee named by an organization; campus comes from the organization's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomineeInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_number: String,
    pub faculty_id: i64,
    pub department_id: i64,
}

impl NomineeInput {
    fn validate(&self) -> Result<(), InputViolation> {
        require("nominee.first_name", &self.first_name)?;
        require("nominee.last_name", &self.last_name)?;
        require("nominee.email", &self.email)?;
        require("nominee.student_number", &self.student_number)?;
        if self.faculty_id <= 0 {
            return Err(InputViolation::InvalidReference {
                field: "nominee.faculty_id",
                value: self.faculty_id,
            });
        }
        if self.department_id <= 0 {
            return Err(InputViolation::InvalidReference {
                field: "nominee.department_id",
                value: self.department_id,
            });
        }
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), InputViolation> {
    if value.trim().is_empty() {
        Err(InputViolation::MissingField { field })
    } else {
        Ok(())
    }
}

fn validate_particulars(particulars: &NomineeParticulars) -> Result<(), InputViolation> {
    if particulars.student_year < 1 {
        return Err(InputViolation::InvalidStudentYear {
            found: particulars.student_year,
        });
    }
    require("particulars.advisor_name", &particulars.advisor_name)?;
    require("particulars.phone_number", &particulars.phone_number)?;
    require("particulars.address", &particulars.address)?;
    if !particulars.gpa.is_finite() || !(0.0..=4.0).contains(&particulars.gpa) {
        return Err(InputViolation::InvalidGpa {
            found: particulars.gpa,
        });
    }
    Ok(())
}

/// Input problems reported back to the caller as validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputViolation {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} must reference an existing record (found {value})")]
    InvalidReference { field: &'static str, value: i64 },
    #[error("student year must be at least 1 (found {found})")]
    InvalidStudentYear { found: u8 },
    #[error("gpa must be between 0.00 and 4.00 (found {found})")]
    InvalidGpa { found: f64 },
    #[error("actor is registered as {profile} but submitted a {input} nomination")]
    RoleMismatch {
        profile: &'static str,
        input: &'static str,
    },
    #[error("unknown form status '{0}'")]
    UnknownStatus(String),
    #[error("unknown award classification '{0}'")]
    UnknownClassification(String),
    #[error("malformed submission payload: {0}")]
    Malformed(String),
    #[error("a reject reason needs a status change (form is already {status})")]
    ReasonWithoutStatusChange { status: &'static str },
}
