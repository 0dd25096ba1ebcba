use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::terms::Semester;

/// Identifier wrapper for award forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub i64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account identifier supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Student,
    Organization,
}

impl ActorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ActorKind::Student => "student",
            ActorKind::Organization => "organization",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "student" => Some(ActorKind::Student),
            "organization" => Some(ActorKind::Organization),
            _ => None,
        }
    }
}

/// Award category a nomination is filed under. Each one selects a detail shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardClassification {
    Extracurricular,
    CreativityInnovation,
    GoodBehavior,
}

impl AwardClassification {
    pub const ALL: [AwardClassification; 3] = [
        AwardClassification::Extracurricular,
        AwardClassification::CreativityInnovation,
        AwardClassification::GoodBehavior,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AwardClassification::Extracurricular => "extracurricular",
            AwardClassification::CreativityInnovation => "creativity_innovation",
            AwardClassification::GoodBehavior => "good_behavior",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            AwardClassification::Extracurricular => "Extracurricular Activities",
            AwardClassification::CreativityInnovation => "Creativity and Innovation",
            AwardClassification::GoodBehavior => "Good Behavior",
        }
    }
}

impl fmt::Display for AwardClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AwardClassification {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        AwardClassification::ALL
            .into_iter()
            .find(|classification| classification.label() == raw.trim())
            .ok_or_else(|| raw.to_string())
    }
}

/// Position of a nomination in the approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormStatus {
    #[serde(rename = "Send_to_HoD")]
    SendToHoD,
    #[serde(rename = "Send_to_AsD")]
    SendToAsD,
    #[serde(rename = "Rejected_by_HoD")]
    RejectedByHoD,
    #[serde(rename = "Send_to_Dean")]
    SendToDean,
    #[serde(rename = "Rejected_by_AsD")]
    RejectedByAsD,
    #[serde(rename = "Send_to_StD")]
    SendToStD,
    #[serde(rename = "Rejected_by_Dean")]
    RejectedByDean,
    #[serde(rename = "Send_to_Com")]
    SendToCom,
    #[serde(rename = "Rejected_by_StD")]
    RejectedByStD,
    #[serde(rename = "Send_to_ComPres")]
    SendToComPres,
    #[serde(rename = "Rejected_by_Com")]
    RejectedByCom,
    #[serde(rename = "Send_to_Chan")]
    SendToChan,
    #[serde(rename = "Rejected_by_ComPres")]
    RejectedByComPres,
    #[serde(rename = "Accepted_By_Chan")]
    AcceptedByChan,
    #[serde(rename = "Rejected_by_Chan")]
    RejectedByChan,
}

impl FormStatus {
    /// Every new nomination waits for the head of department first.
    pub const INITIAL: FormStatus = FormStatus::SendToHoD;

    pub const ALL: [FormStatus; 15] = [
        FormStatus::SendToHoD,
        FormStatus::SendToAsD,
        FormStatus::RejectedByHoD,
        FormStatus::SendToDean,
        FormStatus::RejectedByAsD,
        FormStatus::SendToStD,
        FormStatus::RejectedByDean,
        FormStatus::SendToCom,
        FormStatus::RejectedByStD,
        FormStatus::SendToComPres,
        FormStatus::RejectedByCom,
        FormStatus::SendToChan,
        FormStatus::RejectedByComPres,
        FormStatus::AcceptedByChan,
        FormStatus::RejectedByChan,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            FormStatus::SendToHoD => "Send_to_HoD",
            FormStatus::SendToAsD => "Send_to_AsD",
            FormStatus::RejectedByHoD => "Rejected_by_HoD",
            FormStatus::SendToDean => "Send_to_Dean",
            FormStatus::RejectedByAsD => "Rejected_by_AsD",
            FormStatus::SendToStD => "Send_to_StD",
            FormStatus::RejectedByDean => "Rejected_by_Dean",
            FormStatus::SendToCom => "Send_to_Com",
            FormStatus::RejectedByStD => "Rejected_by_StD",
            FormStatus::SendToComPres => "Send_to_ComPres",
            FormStatus::RejectedByCom => "Rejected_by_Com",
            FormStatus::SendToChan => "Send_to_Chan",
            FormStatus::RejectedByComPres => "Rejected_by_ComPres",
            FormStatus::AcceptedByChan => "Accepted_By_Chan",
            FormStatus::RejectedByChan => "Rejected_by_Chan",
        }
    }

    pub fn is_rejection(self) -> bool {
        self.label().starts_with("Rejected_")
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FormStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        FormStatus::ALL
            .into_iter()
            .find(|status| status.label() == raw.trim())
            .ok_or_else(|| raw.to_string())
    }
}

/// The student a nomination is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomineeIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_number: String,
    pub faculty_id: i64,
    pub department_id: i64,
    pub campus_id: i64,
}

/// Filing organization, captured when an organization nominates a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSnapshot {
    pub name: String,
    pub organization_type: String,
    pub location: String,
}

/// Contact and academic particulars collected on every nomination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomineeParticulars {
    pub student_year: u8,
    pub advisor_name: String,
    pub phone_number: String,
    pub address: String,
    pub gpa: f64,
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDetail {
    pub qualification_type: String,
    pub date_received: NaiveDate,
    pub team_name: String,
    pub project_title: String,
    pub prize: String,
    pub organized_by: String,
    pub competition_level: String,
    pub activity_category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativityDetail {
    pub date_received: NaiveDate,
    pub team_name: String,
    pub project_title: String,
    pub prize: String,
    pub organized_by: String,
    pub competition_level: String,
    pub activity_category: String,
}

/// Classification-specific detail record, tagged by classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "classification", rename_all = "snake_case")]
pub enum AwardDetail {
    Extracurricular(ActivityDetail),
    CreativityInnovation(CreativityDetail),
    GoodBehavior,
}

impl AwardDetail {
    pub fn classification(&self) -> AwardClassification {
        match self {
            AwardDetail::Extracurricular(_) => AwardClassification::Extracurricular,
            AwardDetail::CreativityInnovation(_) => AwardClassification::CreativityInnovation,
            AwardDetail::GoodBehavior => AwardClassification::GoodBehavior,
        }
    }
}

/// Award form header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub actor_id: ActorId,
    pub actor_kind: ActorKind,
    pub nominee: NomineeIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationSnapshot>,
    pub academic_year: i32,
    pub semester: Semester,
    pub classification: AwardClassification,
    pub status: FormStatus,
    pub particulars: NomineeParticulars,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub submission_id: SubmissionId,
    pub file_type: String,
    pub size_bytes: u64,
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Header, detail and attachments hydrated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submission: Submission,
    pub detail: AwardDetail,
    pub attachments: Vec<Attachment>,
}

/// Immutable record of one field change on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub submission_id: SubmissionId,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub changed_by: ActorId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_from_str() {
        for status in FormStatus::ALL {
            assert_eq!(status.label().parse::<FormStatus>(), Ok(status));
        }
        assert!("Send_to_Nobody".parse::<FormStatus>().is_err());
        assert_eq!(FormStatus::INITIAL.label(), "Send_to_HoD");
        assert!(FormStatus::RejectedByDean.is_rejection());
        assert!(!FormStatus::AcceptedByChan.is_rejection());
    }

    #[test]
    fn detail_is_tagged_by_classification() {
        let detail: AwardDetail =
            serde_json::from_str(r#"{"classification":"good_behavior"}"#).expect("parse");
        assert_eq!(detail.classification(), AwardClassification::GoodBehavior);

        let value = serde_json::to_value(AwardDetail::CreativityInnovation(CreativityDetail {
            date_received: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid"),
            team_name: "Lumen".into(),
            project_title: "Solar kiln".into(),
            prize: "Gold".into(),
            organized_by: "NSTDA".into(),
            competition_level: "national".into(),
            activity_category: "engineering".into(),
        }))
        .expect("serialize");
        assert_eq!(value["classification"], "creativity_innovation");
        assert_eq!(value["team_name"], "Lumen");
    }

    #[test]
    fn status_serializes_as_catalogue_label() {
        let value = serde_json::to_value(FormStatus::SendToComPres).expect("serialize");
        assert_eq!(value, "Send_to_ComPres");
    }
}
