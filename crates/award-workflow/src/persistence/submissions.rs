use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::audit::insert_entry;
use super::{
    conversion_error, date_at, format_date, format_timestamp, like_pattern, timestamp_at,
    SqliteStore, UnknownLabel,
};
use crate::workflows::awards::{
    ActivityDetail, ActorId, ActorKind, ActorQuery, Attachment, AwardClassification, AwardDetail,
    ChangeOutcome, CreativityDetail, FieldChange, NewAuditEntry, NewSubmission,
    NomineeIdentity, NomineeParticulars, OrganizationSnapshot, SearchQuery, Submission,
    SubmissionId, SubmissionRecord, SubmissionRepository,
};
use crate::workflows::terms::Semester;
use crate::workflows::RepositoryError;

const HEADER_COLUMNS: &str = "id, actor_id, actor_kind, first_name, last_name, email, \
     student_number, faculty_id, department_id, campus_id, organization_name, organization_type, \
     organization_location, academic_year, semester, classification, status, student_year, \
     advisor_name, phone_number, address, gpa, date_of_birth, reject_reason, created_at, \
     updated_at";

fn label_at<T>(
    row: &Row<'_>,
    index: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    parse(&raw).ok_or_else(|| conversion_error(index, UnknownLabel(raw)))
}

fn semester_at(row: &Row<'_>, index: usize) -> rusqlite::Result<Semester> {
    let number: u8 = row.get(index)?;
    Semester::from_number(number)
        .ok_or_else(|| conversion_error(index, UnknownLabel(number.to_string())))
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<Submission> {
    let organization_name: Option<String> = row.get(10)?;
    let organization = match organization_name {
        Some(name) => Some(OrganizationSnapshot {
            name,
            organization_type: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
            location: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Submission {
        id: SubmissionId(row.get(0)?),
        actor_id: ActorId(row.get(1)?),
        actor_kind: label_at(row, 2, ActorKind::parse)?,
        nominee: NomineeIdentity {
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            email: row.get(5)?,
            student_number: row.get(6)?,
            faculty_id: row.get(7)?,
            department_id: row.get(8)?,
            campus_id: row.get(9)?,
        },
        organization,
        academic_year: row.get(13)?,
        semester: semester_at(row, 14)?,
        classification: label_at(row, 15, |raw| raw.parse().ok())?,
        status: label_at(row, 16, |raw| raw.parse().ok())?,
        particulars: NomineeParticulars {
            student_year: row.get(17)?,
            advisor_name: row.get(18)?,
            phone_number: row.get(19)?,
            address: row.get(20)?,
            gpa: row.get(21)?,
            date_of_birth: date_at(row, 22)?,
        },
        reject_reason: row.get(23)?,
        created_at: timestamp_at(row, 24)?,
        updated_at: timestamp_at(row, 25)?,
    })
}

fn attachment_from_row(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        submission_id: SubmissionId(row.get(1)?),
        file_type: row.get(2)?,
        size_bytes: row.get::<_, i64>(3)?.max(0) as u64,
        path: row.get(4)?,
        uploaded_at: timestamp_at(row, 5)?,
    })
}

fn insert_header(
    conn: &Connection,
    submission: &NewSubmission,
) -> Result<SubmissionId, RepositoryError> {
    let stamp = format_timestamp(submission.submitted_at);
    let organization = submission.organization.as_ref();
    conn.execute(
        "INSERT INTO award_forms (
            actor_id, actor_kind, first_name, last_name, email, student_number, faculty_id,
            department_id, campus_id, organization_name, organization_type, organization_location,
            academic_year, semester, classification, detail_kind, status, student_year,
            advisor_name, phone_number, address, gpa, date_of_birth, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
            ?19, ?20, ?21, ?22, ?23, ?24, ?24
        )",
        params![
            submission.actor_id.as_str(),
            submission.actor_kind.label(),
            submission.nominee.first_name,
            submission.nominee.last_name,
            submission.nominee.email,
            submission.nominee.student_number,
            submission.nominee.faculty_id,
            submission.nominee.department_id,
            submission.nominee.campus_id,
            organization.map(|org| org.name.as_str()),
            organization.map(|org| org.organization_type.as_str()),
            organization.map(|org| org.location.as_str()),
            submission.academic_year,
            submission.semester.number(),
            submission.detail.classification().label(),
            submission.detail.classification().label(),
            submission.status.label(),
            submission.particulars.student_year,
            submission.particulars.advisor_name,
            submission.particulars.phone_number,
            submission.particulars.address,
            submission.particulars.gpa,
            format_date(submission.particulars.date_of_birth),
            stamp,
        ],
    )?;
    Ok(SubmissionId(conn.last_insert_rowid()))
}

fn insert_detail(
    conn: &Connection,
    id: SubmissionId,
    detail: &AwardDetail,
) -> Result<(), RepositoryError> {
    match detail {
        AwardDetail::Extracurricular(activity) => {
            conn.execute(
                "INSERT INTO extracurricular_details (
                    form_id, qualification_type, date_received, team_name, project_title, prize,
                    organized_by, competition_level, activity_category
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.0,
                    activity.qualification_type,
                    format_date(activity.date_received),
                    activity.team_name,
                    activity.project_title,
                    activity.prize,
                    activity.organized_by,
                    activity.competition_level,
                    activity.activity_category,
                ],
            )?;
        }
        AwardDetail::CreativityInnovation(creativity) => {
            conn.execute(
                "INSERT INTO creativity_details (
                    form_id, date_received, team_name, project_title, prize, organized_by,
                    competition_level, activity_category
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.0,
                    format_date(creativity.date_received),
                    creativity.team_name,
                    creativity.project_title,
                    creativity.prize,
                    creativity.organized_by,
                    creativity.competition_level,
                    creativity.activity_category,
                ],
            )?;
        }
        AwardDetail::GoodBehavior => {
            conn.execute(
                "INSERT INTO good_behavior_details (form_id) VALUES (?1)",
                params![id.0],
            )?;
        }
    }
    Ok(())
}

fn fetch_detail(
    conn: &Connection,
    id: SubmissionId,
    kind: AwardClassification,
) -> Result<AwardDetail, RepositoryError> {
    let detail = match kind {
        AwardClassification::Extracurricular => conn.query_row(
            "SELECT qualification_type, date_received, team_name, project_title, prize,
                    organized_by, competition_level, activity_category
             FROM extracurricular_details WHERE form_id = ?1",
            params![id.0],
            |row| {
                Ok(AwardDetail::Extracurricular(ActivityDetail {
                    qualification_type: row.get(0)?,
                    date_received: date_at(row, 1)?,
                    team_name: row.get(2)?,
                    project_title: row.get(3)?,
                    prize: row.get(4)?,
                    organized_by: row.get(5)?,
                    competition_level: row.get(6)?,
                    activity_category: row.get(7)?,
                }))
            },
        )?,
        AwardClassification::CreativityInnovation => conn.query_row(
            "SELECT date_received, team_name, project_title, prize, organized_by,
                    competition_level, activity_category
             FROM creativity_details WHERE form_id = ?1",
            params![id.0],
            |row| {
                Ok(AwardDetail::CreativityInnovation(CreativityDetail {
                    date_received: date_at(row, 0)?,
                    team_name: row.get(1)?,
                    project_title: row.get(2)?,
                    prize: row.get(3)?,
                    organized_by: row.get(4)?,
                    competition_level: row.get(5)?,
                    activity_category: row.get(6)?,
                }))
            },
        )?,
        AwardClassification::GoodBehavior => {
            conn.query_row(
                "SELECT form_id FROM good_behavior_details WHERE form_id = ?1",
                params![id.0],
                |row| row.get::<_, i64>(0),
            )?;
            AwardDetail::GoodBehavior
        }
    };
    Ok(detail)
}

/// Header, detail and attachments for one form, read through `conn` (which may be a
/// transaction that has not committed yet).
fn hydrate(
    conn: &Connection,
    id: SubmissionId,
) -> Result<Option<SubmissionRecord>, RepositoryError> {
    let sql = format!("SELECT {HEADER_COLUMNS}, detail_kind FROM award_forms WHERE id = ?1");
    let header = conn
        .query_row(&sql, params![id.0], |row| {
            let submission = submission_from_row(row)?;
            let detail_kind = label_at(row, 26, |raw| raw.parse::<AwardClassification>().ok())?;
            Ok((submission, detail_kind))
        })
        .optional()?;

    let Some((submission, detail_kind)) = header else {
        return Ok(None);
    };

    let detail = fetch_detail(conn, id, detail_kind)?;
    let mut stmt = conn.prepare(
        "SELECT id, form_id, file_type, size_bytes, path, uploaded_at
         FROM award_attachments WHERE form_id = ?1 ORDER BY id",
    )?;
    let attachments = stmt
        .query_map(params![id.0], attachment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(SubmissionRecord {
        submission,
        detail,
        attachments,
    }))
}

fn count_and_page(
    conn: &Connection,
    filter: &str,
    values: Vec<Value>,
    order: &str,
    limit: u32,
    offset: u64,
) -> Result<(Vec<Submission>, u64), RepositoryError> {
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM award_forms WHERE {filter}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let mut paged = values;
    paged.push(Value::Integer(i64::from(limit)));
    paged.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

    let sql = format!(
        "SELECT {HEADER_COLUMNS} FROM award_forms WHERE {filter}
         ORDER BY created_at {order}, id {order} LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(paged.iter()), submission_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((items, total.max(0) as u64))
}

impl SubmissionRepository for SqliteStore {
    fn create(&self, submission: NewSubmission) -> Result<SubmissionRecord, RepositoryError> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let id = insert_header(&tx, &submission)?;
            insert_detail(&tx, id, &submission.detail)?;
            let uploaded_at = format_timestamp(submission.submitted_at);
            for attachment in &submission.attachments {
                tx.execute(
                    "INSERT INTO award_attachments (form_id, file_type, size_bytes, path, uploaded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id.0,
                        attachment.file_type,
                        i64::try_from(attachment.size_bytes).unwrap_or(i64::MAX),
                        attachment.path,
                        uploaded_at,
                    ],
                )?;
            }
            let record = hydrate(&tx, id)?.ok_or(RepositoryError::NotFound)?;
            tx.commit()?;
            Ok(record)
        })
    }

    fn exists_for_term(
        &self,
        actor: &ActorId,
        academic_year: i32,
        semester: Semester,
    ) -> Result<bool, RepositoryError> {
        self.with_connection(|conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM award_forms
                     WHERE actor_id = ?1 AND academic_year = ?2 AND semester = ?3",
                    params![actor.as_str(), academic_year, semester.number()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(exists.is_some())
        })
    }

    fn fetch(&self, id: SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        self.with_connection(|conn| hydrate(conn, id))
    }

    fn search(&self, query: &SearchQuery) -> Result<(Vec<Submission>, u64), RepositoryError> {
        let mut clauses = vec!["campus_id = ?".to_string()];
        let mut values = vec![Value::Integer(query.campus_id)];

        if let Some(keyword) = &query.keyword {
            clauses.push(
                "(LOWER(first_name) LIKE ? ESCAPE '\\' \
                 OR LOWER(last_name) LIKE ? ESCAPE '\\' \
                 OR LOWER(student_number) LIKE ? ESCAPE '\\' \
                 OR CAST(semester AS TEXT) LIKE ? ESCAPE '\\' \
                 OR CAST(academic_year AS TEXT) LIKE ? ESCAPE '\\' \
                 OR LOWER(classification) LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            let pattern = like_pattern(keyword);
            values.extend(std::iter::repeat(Value::Text(pattern)).take(6));
        }
        if let Some(date) = query.date {
            clauses.push("substr(created_at, 1, 10) = ?".to_string());
            values.push(Value::Text(format_date(date)));
        }
        if let Some(student_year) = query.student_year {
            clauses.push("student_year = ?".to_string());
            values.push(Value::Integer(i64::from(student_year)));
        }
        if let Some(classification) = query.classification {
            clauses.push("classification = ?".to_string());
            values.push(Value::Text(classification.label().to_string()));
        }

        let filter = clauses.join(" AND ");
        self.with_connection(|conn| {
            count_and_page(
                conn,
                &filter,
                values,
                query.order.sql(),
                query.limit,
                query.offset(),
            )
        })
    }

    fn for_actor(&self, query: &ActorQuery) -> Result<(Vec<Submission>, u64), RepositoryError> {
        let mut filter = "actor_id = ?".to_string();
        let mut values = vec![Value::Text(query.actor_id.as_str().to_string())];
        if !query.years.is_empty() {
            let placeholders = vec!["?"; query.years.len()].join(", ");
            filter.push_str(&format!(" AND academic_year IN ({placeholders})"));
            values.extend(query.years.iter().map(|year| Value::Integer(i64::from(*year))));
        }

        self.with_connection(|conn| {
            count_and_page(conn, &filter, values, "DESC", query.limit, query.offset())
        })
    }

    fn for_actor_in_term(
        &self,
        actor: &ActorId,
        academic_year: i32,
        semester: Semester,
    ) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM award_forms
                 WHERE actor_id = ?1 AND academic_year = ?2 AND semester = ?3
                 ORDER BY created_at DESC, id DESC",
            )?;
            let ids = stmt
                .query_map(
                    params![actor.as_str(), academic_year, semester.number()],
                    |row| row.get::<_, i64>(0),
                )?
                .collect::<Result<Vec<_>, _>>()?;

            let mut records = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(record) = hydrate(conn, SubmissionId(id))? {
                    records.push(record);
                }
            }
            Ok(records)
        })
    }

    fn apply_change(
        &self,
        id: SubmissionId,
        change: &FieldChange,
        changed_by: &ActorId,
        at: DateTime<Utc>,
    ) -> Result<ChangeOutcome, RepositoryError> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let sql = format!("SELECT {HEADER_COLUMNS} FROM award_forms WHERE id = ?1");
            let current = tx
                .query_row(&sql, params![id.0], submission_from_row)
                .optional()?
                .ok_or(RepositoryError::NotFound)?;

            let old_value = change.current_value(&current);
            let new_value = change.new_value();
            if old_value == new_value {
                return Ok(ChangeOutcome::Unchanged);
            }

            let stamp = format_timestamp(at);
            match change {
                FieldChange::Classification(classification) => {
                    tx.execute(
                        "UPDATE award_forms SET classification = ?1, updated_at = ?2 WHERE id = ?3",
                        params![classification.label(), stamp, id.0],
                    )?;
                }
                FieldChange::Status {
                    status,
                    reject_reason,
                } => {
                    tx.execute(
                        "UPDATE award_forms
                         SET status = ?1, reject_reason = COALESCE(?2, reject_reason), updated_at = ?3
                         WHERE id = ?4",
                        params![status.label(), reject_reason.as_deref(), stamp, id.0],
                    )?;
                }
            }

            let entry = insert_entry(
                &tx,
                &NewAuditEntry {
                    submission_id: id,
                    field_name: change.field_name().to_string(),
                    old_value: old_value.to_string(),
                    new_value: new_value.to_string(),
                    changed_by: changed_by.clone(),
                    recorded_at: at,
                },
            )?;
            tx.commit()?;
            Ok(ChangeOutcome::Recorded(entry))
        })
    }
}
