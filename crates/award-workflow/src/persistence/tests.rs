use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rusqlite::params;

use super::{like_pattern, SqliteStore};
use crate::workflows::awards::{
    ActivityDetail, ActorId, ActorKind, ActorQuery, AuditLogRepository, AwardClassification,
    AwardDetail, ChangeOutcome, FieldChange, FormStatus, NewAttachment, NewAuditEntry,
    NewSubmission, NomineeIdentity, NomineeParticulars, OrganizationSnapshot, SearchRequest,
    SortOrder, SubmissionId, SubmissionRepository,
};
use crate::workflows::terms::{
    validate_draft, AcademicTerm, NewTerm, Semester, TermDraft, TermFlag, TermId,
    TermRepository, TermRuleViolation, TermWriteError,
};
use crate::workflows::RepositoryError;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn new_term(year: i32, semester: Semester) -> NewTerm {
    NewTerm {
        year,
        semester,
        start_date: date(year, 6, 1),
        end_date: date(year, 10, 31),
    }
}

/// A placement that ignores the stored calendar.
fn placed(
    year: i32,
    semester: Semester,
) -> impl Fn(&[AcademicTerm]) -> Result<NewTerm, TermRuleViolation> {
    let term = new_term(year, semester);
    move |_: &[AcademicTerm]| Ok(term.clone())
}

fn nomination(actor: &str, year: i32, detail: AwardDetail) -> NewSubmission {
    NewSubmission {
        actor_id: ActorId::new(actor),
        actor_kind: ActorKind::Student,
        nominee: NomineeIdentity {
            first_name: "Anan".into(),
            last_name: "Chaiyo".into(),
            email: format!("{actor}@example.edu"),
            student_number: format!("65{actor}"),
            faculty_id: 1,
            department_id: 4,
            campus_id: 1,
        },
        organization: None,
        academic_year: year,
        semester: Semester::First,
        status: FormStatus::INITIAL,
        particulars: NomineeParticulars {
            student_year: 3,
            advisor_name: "Dr. Kanya".into(),
            phone_number: "0812345678".into(),
            address: "Khon Kaen".into(),
            gpa: 3.5,
            date_of_birth: date(2003, 4, 9),
        },
        detail,
        attachments: vec![NewAttachment {
            file_type: "pdf".into(),
            size_bytes: 2048,
            path: format!("uploads/pdf/{actor}.pdf"),
        }],
        submitted_at: Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 0).single().expect("valid"),
    }
}

fn activity() -> AwardDetail {
    AwardDetail::Extracurricular(ActivityDetail {
        qualification_type: "competition".into(),
        date_received: date(2024, 3, 12),
        team_name: "Sprocket".into(),
        project_title: "Line follower".into(),
        prize: "First prize".into(),
        organized_by: "IEEE".into(),
        competition_level: "national".into(),
        activity_category: "robotics".into(),
    })
}

fn count(store: &SqliteStore, table: &str) -> i64 {
    store
        .with_connection(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        })
        .expect("count rows")
}

#[test]
fn partial_indexes_refuse_a_second_current_term() {
    let store = SqliteStore::in_memory().expect("store");
    let first = store.insert(&placed(2024, Semester::First)).expect("first");
    let second = store.insert(&placed(2024, Semester::Second)).expect("second");

    store
        .set_exclusive(first.id, TermFlag::Current)
        .expect("toggle");

    let direct = store.with_connection(|conn| {
        conn.execute(
            "UPDATE academic_terms SET is_current = 1 WHERE id = ?1",
            params![second.id.0],
        )?;
        Ok(())
    });
    assert!(matches!(direct, Err(RepositoryError::Conflict(_))));

    let moved = store
        .set_exclusive(second.id, TermFlag::Current)
        .expect("toggle moves flag");
    assert!(moved.is_current);
    let current = store.current().expect("lookup").expect("current term");
    assert_eq!(current.id, second.id);
}

#[test]
fn toggling_unknown_term_keeps_the_previous_holder() {
    let store = SqliteStore::in_memory().expect("store");
    let first = store.insert(&placed(2024, Semester::First)).expect("first");
    store
        .set_exclusive(first.id, TermFlag::OpenForRegistration)
        .expect("open");

    let err = store
        .set_exclusive(TermId(404), TermFlag::OpenForRegistration)
        .expect_err("unknown id");
    assert!(matches!(err, RepositoryError::NotFound));

    let still_open = store.find(first.id).expect("fetch").expect("exists");
    assert!(still_open.is_open_for_registration);
}

#[test]
fn registrable_requires_both_flags_on_one_term() {
    let store = SqliteStore::in_memory().expect("store");
    let first = store.insert(&placed(2024, Semester::First)).expect("first");
    let second = store.insert(&placed(2024, Semester::Second)).expect("second");

    store.set_exclusive(first.id, TermFlag::Current).expect("current");
    store
        .set_exclusive(second.id, TermFlag::OpenForRegistration)
        .expect("open");
    assert!(store.registrable().expect("lookup").is_none());

    store
        .set_exclusive(first.id, TermFlag::OpenForRegistration)
        .expect("open first");
    assert_eq!(
        store.registrable().expect("lookup").map(|term| term.id),
        Some(first.id)
    );
}

#[test]
fn duplicate_year_and_semester_is_a_conflict() {
    let store = SqliteStore::in_memory().expect("store");
    store.insert(&placed(2024, Semester::First)).expect("first");
    let err = store
        .insert(&placed(2024, Semester::First))
        .expect_err("duplicate");
    assert!(matches!(
        err,
        TermWriteError::Repository(RepositoryError::Conflict(_))
    ));
}

#[test]
fn terms_list_newest_first_and_delete_checks_references() {
    let store = SqliteStore::in_memory().expect("store");
    let first = store.insert(&placed(2024, Semester::First)).expect("first");
    let second = store.insert(&placed(2024, Semester::Second)).expect("second");

    let listed: Vec<TermId> = store.list().expect("list").iter().map(|t| t.id).collect();
    assert_eq!(listed, vec![second.id, first.id]);

    store
        .create(nomination("stu-001", 2024, AwardDetail::GoodBehavior))
        .expect("submission");

    let err = store.delete(first.id).expect_err("referenced");
    assert!(matches!(err, RepositoryError::InUse(_)));

    store.delete(second.id).expect("unreferenced delete");
    assert!(store.find(second.id).expect("fetch").is_none());
    assert!(matches!(
        store.delete(second.id),
        Err(RepositoryError::NotFound)
    ));
}

#[test]
fn referenced_term_cannot_move_to_another_slot() {
    let store = SqliteStore::in_memory().expect("store");
    let first = store.insert(&placed(2024, Semester::First)).expect("first");
    store
        .create(nomination("stu-001", 2024, AwardDetail::GoodBehavior))
        .expect("submission");

    let err = store
        .update(first.id, &placed(2025, Semester::First))
        .expect_err("submissions reference 2024/1");
    assert!(matches!(
        err,
        TermWriteError::Repository(RepositoryError::InUse(_))
    ));
    let stored = store.find(first.id).expect("find").expect("still stored");
    assert_eq!((stored.year, stored.semester), (2024, Semester::First));

    let mut extended = new_term(2024, Semester::First);
    extended.end_date = date(2024, 12, 20);
    let updated = store
        .update(first.id, &move |_: &[AcademicTerm]| Ok(extended.clone()))
        .expect("dates may change");
    assert_eq!(updated.end_date, date(2024, 12, 20));
    assert!(matches!(
        store.delete(first.id),
        Err(RepositoryError::InUse(_))
    ));
}

#[test]
fn placement_sees_committed_terms_and_reports_rule_violations() {
    let store = SqliteStore::in_memory().expect("store");
    let first = store.insert(&placed(2024, Semester::First)).expect("first");

    let skipped = TermDraft {
        year: 2026,
        semester: 1,
        start_date: date(2026, 6, 1),
        end_date: date(2026, 10, 31),
    };
    let err = store
        .insert(&|existing| validate_draft(existing, &skipped, None))
        .expect_err("2026/1 skips a term");
    assert!(matches!(
        err,
        TermWriteError::Rule(TermRuleViolation::OutOfOrder { .. })
    ));
    assert_eq!(store.list().expect("list").len(), 1);

    assert!(matches!(
        store.update(TermId(first.id.0 + 100), &placed(2024, Semester::Second)),
        Err(TermWriteError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn create_hydrates_header_detail_and_attachments() {
    let store = SqliteStore::in_memory().expect("store");
    let mut submission = nomination("org-robotics", 2024, activity());
    submission.actor_kind = ActorKind::Organization;
    submission.organization = Some(OrganizationSnapshot {
        name: "Robotics Club".into(),
        organization_type: "club".into(),
        location: "Engineering 2".into(),
    });

    let record = store.create(submission).expect("created");
    assert_eq!(record.submission.status, FormStatus::SendToHoD);
    assert_eq!(
        record.submission.classification,
        AwardClassification::Extracurricular
    );
    assert_eq!(record.detail, activity());
    assert_eq!(record.attachments.len(), 1);
    assert_eq!(record.attachments[0].size_bytes, 2048);
    assert_eq!(
        record
            .submission
            .organization
            .as_ref()
            .map(|org| org.name.as_str()),
        Some("Robotics Club")
    );

    let fetched = store
        .fetch(record.submission.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(fetched, record);
}

#[test]
fn second_submission_for_same_term_is_a_conflict() {
    let store = SqliteStore::in_memory().expect("store");
    store
        .create(nomination("stu-001", 2024, AwardDetail::GoodBehavior))
        .expect("first");

    let err = store
        .create(nomination("stu-001", 2024, activity()))
        .expect_err("duplicate");
    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert_eq!(count(&store, "award_forms"), 1);
    assert_eq!(count(&store, "award_attachments"), 1);
    assert!(store
        .exists_for_term(&ActorId::new("stu-001"), 2024, Semester::First)
        .expect("lookup"));
    assert!(!store
        .exists_for_term(&ActorId::new("stu-001"), 2024, Semester::Second)
        .expect("lookup"));
}

#[test]
fn failed_detail_insert_rolls_back_the_whole_form() {
    let store = SqliteStore::in_memory().expect("store");
    store
        .with_connection(|conn| {
            conn.execute_batch("DROP TABLE good_behavior_details")?;
            Ok(())
        })
        .expect("drop detail table");

    let err = store
        .create(nomination("stu-001", 2024, AwardDetail::GoodBehavior))
        .expect_err("detail insert fails");
    assert!(matches!(err, RepositoryError::Unavailable(_)));

    assert_eq!(count(&store, "award_forms"), 0);
    assert_eq!(count(&store, "award_attachments"), 0);
    assert_eq!(count(&store, "award_audit_log"), 0);
}

#[test]
fn guarded_change_pairs_update_with_audit_entry() {
    let store = SqliteStore::in_memory().expect("store");
    let record = store
        .create(nomination("stu-001", 2024, AwardDetail::GoodBehavior))
        .expect("created");
    let id = record.submission.id;
    let admin = ActorId::new("admin-7");
    let at = Utc::now();

    let change = FieldChange::Status {
        status: FormStatus::RejectedByHoD,
        reject_reason: Some("missing transcript".into()),
    };
    let outcome = store
        .apply_change(id, &change, &admin, at)
        .expect("change applied");
    let ChangeOutcome::Recorded(entry) = outcome else {
        panic!("expected an audit entry");
    };
    assert_eq!(entry.field_name, "form_status");
    assert_eq!(entry.old_value, "Send_to_HoD");
    assert_eq!(entry.new_value, "Rejected_by_HoD");
    assert_eq!(entry.changed_by, admin);

    let again = store
        .apply_change(id, &change, &admin, at)
        .expect("no-op");
    assert_eq!(again, ChangeOutcome::Unchanged);
    assert_eq!(store.trail(id).expect("trail").len(), 1);

    let fetched = store.fetch(id).expect("fetch").expect("present");
    assert_eq!(fetched.submission.status, FormStatus::RejectedByHoD);
    assert_eq!(
        fetched.submission.reject_reason.as_deref(),
        Some("missing transcript")
    );

    let reclassified = store
        .apply_change(
            id,
            &FieldChange::Classification(AwardClassification::Extracurricular),
            &admin,
            at + Duration::seconds(1),
        )
        .expect("reclassify");
    assert!(matches!(reclassified, ChangeOutcome::Recorded(_)));

    let fetched = store.fetch(id).expect("fetch").expect("present");
    assert_eq!(
        fetched.submission.classification,
        AwardClassification::Extracurricular
    );
    // detail rows are not rewritten by a reclassification
    assert_eq!(fetched.detail, AwardDetail::GoodBehavior);

    let trail = store.trail(id).expect("trail");
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].field_name, "award_classification");
    assert_eq!(trail[1].field_name, "form_status");
}

#[test]
fn change_on_missing_form_is_not_found() {
    let store = SqliteStore::in_memory().expect("store");
    let err = store
        .apply_change(
            SubmissionId(99),
            &FieldChange::Classification(AwardClassification::GoodBehavior),
            &ActorId::new("admin"),
            Utc::now(),
        )
        .expect_err("missing");
    assert!(matches!(err, RepositoryError::NotFound));
}

#[test]
fn audit_log_is_append_only() {
    let store = SqliteStore::in_memory().expect("store");
    let record = store
        .create(nomination("stu-001", 2024, AwardDetail::GoodBehavior))
        .expect("created");
    store
        .append(NewAuditEntry {
            submission_id: record.submission.id,
            field_name: "note".into(),
            old_value: String::new(),
            new_value: "checked documents".into(),
            changed_by: ActorId::new("admin"),
            recorded_at: Utc::now(),
        })
        .expect("appended");

    let tampered = store.with_connection(|conn| {
        conn.execute("UPDATE award_audit_log SET new_value = 'forged'", [])?;
        Ok(())
    });
    assert!(tampered.is_err());

    let removed = store.with_connection(|conn| {
        conn.execute("DELETE FROM award_audit_log", [])?;
        Ok(())
    });
    assert!(removed.is_err());
    assert_eq!(count(&store, "award_audit_log"), 1);

    let orphan = store.append(NewAuditEntry {
        submission_id: SubmissionId(404),
        field_name: "note".into(),
        old_value: String::new(),
        new_value: "ghost".into(),
        changed_by: ActorId::new("admin"),
        recorded_at: Utc::now(),
    });
    assert!(matches!(orphan, Err(RepositoryError::NotFound)));
}

#[test]
fn search_is_campus_scoped_and_paginated() {
    let store = SqliteStore::in_memory().expect("store");
    let base = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).single().expect("valid");
    for index in 0..25 {
        let mut submission = nomination(&format!("stu-{index:03}"), 2024, AwardDetail::GoodBehavior);
        submission.submitted_at = base + Duration::minutes(index);
        store.create(submission).expect("created");
    }
    let mut elsewhere = nomination("stu-remote", 2024, AwardDetail::GoodBehavior);
    elsewhere.nominee.campus_id = 2;
    store.create(elsewhere).expect("created");

    let query = SearchRequest {
        page: Some(3),
        limit: Some(10),
        ..SearchRequest::default()
    }
    .into_query(1);
    let (items, total) = store.search(&query).expect("search");
    assert_eq!(total, 25);
    assert_eq!(items.len(), 5);
    // newest first by default, so the last page holds the oldest forms
    assert_eq!(items.last().map(|s| s.actor_id.as_str()), Some("stu-000"));

    let ascending = SearchRequest {
        order: Some("asc".into()),
        limit: Some(1),
        ..SearchRequest::default()
    }
    .into_query(1);
    assert_eq!(ascending.order, SortOrder::Ascending);
    let (items, _) = store.search(&ascending).expect("search");
    assert_eq!(items[0].actor_id.as_str(), "stu-000");
}

#[test]
fn search_filters_by_keyword_date_year_and_classification() {
    let store = SqliteStore::in_memory().expect("store");
    let mut ploy = nomination("stu-ploy", 2024, activity());
    ploy.nominee.first_name = "Ploy".into();
    ploy.particulars.student_year = 2;
    ploy.submitted_at = Utc.with_ymd_and_hms(2024, 7, 2, 23, 59, 0).single().expect("valid");
    store.create(ploy).expect("created");

    let mut anan = nomination("stu-anan", 2024, AwardDetail::GoodBehavior);
    anan.submitted_at = Utc.with_ymd_and_hms(2024, 7, 3, 0, 1, 0).single().expect("valid");
    store.create(anan).expect("created");

    let search = |request: SearchRequest| store.search(&request.into_query(1)).expect("search");

    let (items, total) = search(SearchRequest {
        keyword: Some("PLOY".into()),
        ..SearchRequest::default()
    });
    assert_eq!(total, 1);
    assert_eq!(items[0].nominee.first_name, "Ploy");

    let (_, total) = search(SearchRequest {
        keyword: Some("65stu-anan".into()),
        ..SearchRequest::default()
    });
    assert_eq!(total, 1);

    let (_, total) = search(SearchRequest {
        keyword: Some("2024".into()),
        ..SearchRequest::default()
    });
    assert_eq!(total, 2);

    let (_, total) = search(SearchRequest {
        keyword: Some("%".into()),
        ..SearchRequest::default()
    });
    assert_eq!(total, 0);

    let (items, total) = search(SearchRequest {
        date: Some(date(2024, 7, 3)),
        ..SearchRequest::default()
    });
    assert_eq!(total, 1);
    assert_eq!(items[0].actor_id.as_str(), "stu-anan");

    let (_, total) = search(SearchRequest {
        student_year: Some(2),
        ..SearchRequest::default()
    });
    assert_eq!(total, 1);

    let (items, _) = search(SearchRequest {
        classification: Some(AwardClassification::GoodBehavior),
        ..SearchRequest::default()
    });
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].actor_id.as_str(), "stu-anan");
}

#[test]
fn actor_listing_filters_years() {
    let store = SqliteStore::in_memory().expect("store");
    for year in [2023, 2024, 2025] {
        store
            .create(nomination("stu-001", year, AwardDetail::GoodBehavior))
            .expect("created");
    }

    let query = ActorQuery {
        actor_id: ActorId::new("stu-001"),
        years: vec![2023, 2025],
        page: 1,
        limit: 4,
    };
    let (items, total) = store.for_actor(&query).expect("listing");
    assert_eq!(total, 2);
    assert!(items.iter().all(|item| item.academic_year != 2024));

    let in_term = store
        .for_actor_in_term(&ActorId::new("stu-001"), 2024, Semester::First)
        .expect("term listing");
    assert_eq!(in_term.len(), 1);
    assert_eq!(in_term[0].detail, AwardDetail::GoodBehavior);
}

#[test]
fn file_store_reopens_with_existing_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("awards.db");
    {
        let store = SqliteStore::open(&path).expect("store");
        store.insert(&placed(2024, Semester::First)).expect("term");
    }
    let reopened = SqliteStore::open(&path).expect("reopen");
    assert_eq!(reopened.list().expect("list").len(), 1);
    reopened.ping().expect("ping");
}

#[test]
fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("Ab_c%"), "%ab\\_c\\%%");
}
