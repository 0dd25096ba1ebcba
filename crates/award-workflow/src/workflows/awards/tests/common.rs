use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tempfile::TempDir;

use crate::persistence::SqliteStore;
use crate::workflows::awards::{
    ActivityDetail, ActorDirectory, ActorId, ActorProfile, ActorQuery, AttachmentPolicy,
    AttachmentStorage, AttachmentUpload, AuditEntry, AuditLogRepository, AwardDetail,
    ChangeOutcome, FieldChange, LocalAttachmentStorage, NewAuditEntry, NewSubmission,
    NomineeInput, NomineeParticulars, OrganizationNomination, OrganizationProfile, SearchQuery,
    StorageError, StoredFile, StudentNomination, StudentProfile, Submission, SubmissionId,
    SubmissionInput, SubmissionRecord, SubmissionRepository, SubmissionService,
};
use crate::workflows::terms::{AcademicTerm, Semester, TermDraft, TermService};
use crate::workflows::RepositoryError;

pub(super) const STUDENT: &str = "stu-6501";
pub(super) const ORGANIZATION: &str = "org-robotics";
pub(super) const STRANGER: &str = "visitor-42";
pub(super) const CAMPUS: i64 = 1;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn directory() -> ActorDirectory {
    let directory = ActorDirectory::new();
    directory
        .insert(
            ActorId::new(STUDENT),
            ActorProfile::Student(StudentProfile {
                first_name: "Anan".to_string(),
                last_name: "Chaiyo".to_string(),
                email: "anan.c@example.edu".to_string(),
                student_number: "653040001".to_string(),
                faculty_id: 1,
                department_id: 4,
                campus_id: CAMPUS,
            }),
        )
        .expect("student profile");
    directory
        .insert(
            ActorId::new(ORGANIZATION),
            ActorProfile::Organization(OrganizationProfile {
                name: "Robotics Club".to_string(),
                organization_type: "club".to_string(),
                location: "Engineering building".to_string(),
                campus_id: CAMPUS,
            }),
        )
        .expect("organization profile");
    directory
}

/// Creates 2024/1 and, when `registrable`, marks it current and open.
pub(super) fn seeded_terms(
    store: Arc<SqliteStore>,
    registrable: bool,
) -> (Arc<TermService<SqliteStore>>, AcademicTerm) {
    let terms = Arc::new(TermService::new(store));
    let term = terms
        .create(TermDraft {
            year: 2024,
            semester: 1,
            start_date: date(2024, 6, 1),
            end_date: date(2024, 10, 31),
        })
        .expect("term created");
    let term = if registrable {
        terms.set_current(term.id).expect("current");
        terms.open_for_registration(term.id).expect("open")
    } else {
        term
    };
    (terms, term)
}

pub(super) struct Harness<R> {
    pub(super) service: Arc<SubmissionService<R>>,
    pub(super) store: Arc<SqliteStore>,
    pub(super) terms: Arc<TermService<SqliteStore>>,
    pub(super) term: AcademicTerm,
    pub(super) uploads: TempDir,
}

pub(super) fn harness() -> Harness<SqliteStore> {
    let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
    build(store.clone(), store, true)
}

pub(super) fn closed_harness() -> Harness<SqliteStore> {
    let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
    build(store.clone(), store, false)
}

pub(super) fn failing_create_harness() -> Harness<FailingCreateRepository> {
    let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
    let repository = Arc::new(FailingCreateRepository {
        inner: store.clone(),
    });
    build(repository, store, true)
}

fn build<R>(repository: Arc<R>, store: Arc<SqliteStore>, registrable: bool) -> Harness<R>
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let uploads = TempDir::new().expect("upload dir");
    let (terms, term) = seeded_terms(store.clone(), registrable);
    let service = Arc::new(SubmissionService::new(
        repository,
        terms.clone(),
        Arc::new(directory()),
        Arc::new(LocalAttachmentStorage::new(uploads.path())),
        AttachmentPolicy::default(),
    ));
    Harness {
        service,
        store,
        terms,
        term,
        uploads,
    }
}

pub(super) fn particulars() -> NomineeParticulars {
    NomineeParticulars {
        student_year: 3,
        advisor_name: "Dr. Kanya Srisuk".to_string(),
        phone_number: "0812345678".to_string(),
        address: "99 Moo 1, Khon Kaen".to_string(),
        gpa: 3.42,
        date_of_birth: date(2003, 4, 9),
    }
}

pub(super) fn activity() -> AwardDetail {
    AwardDetail::Extracurricular(ActivityDetail {
        qualification_type: "competition".to_string(),
        date_received: date(2024, 3, 12),
        team_name: "Sprocket".to_string(),
        project_title: "Line follower".to_string(),
        prize: "First prize".to_string(),
        organized_by: "IEEE Thailand".to_string(),
        competition_level: "national".to_string(),
        activity_category: "robotics".to_string(),
    })
}

pub(super) fn student_input() -> SubmissionInput {
    SubmissionInput::Student(StudentNomination {
        particulars: particulars(),
        detail: activity(),
    })
}

pub(super) fn organization_input() -> SubmissionInput {
    SubmissionInput::Organization(OrganizationNomination {
        nominee: NomineeInput {
            first_name: "Ploy".to_string(),
            last_name: "Sukjai".to_string(),
            email: "ploy.s@example.edu".to_string(),
            student_number: "653040077".to_string(),
            faculty_id: 2,
            department_id: 7,
        },
        particulars: particulars(),
        detail: AwardDetail::GoodBehavior,
    })
}

pub(super) fn pdf(name: &str) -> AttachmentUpload {
    AttachmentUpload::new(name, b"%PDF-1.7 certificate".to_vec())
}

/// Regular files written anywhere below `root`.
pub(super) fn files_under(root: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                files_under(&path)
            } else {
                1
            }
        })
        .sum()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Delegates to SQLite but refuses every insert.
pub(super) struct FailingCreateRepository {
    inner: Arc<SqliteStore>,
}

impl SubmissionRepository for FailingCreateRepository {
    fn create(&self, _submission: NewSubmission) -> Result<SubmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("disk I/O error".to_string()))
    }

    fn exists_for_term(
        &self,
        actor: &ActorId,
        academic_year: i32,
        semester: Semester,
    ) -> Result<bool, RepositoryError> {
        self.inner.exists_for_term(actor, academic_year, semester)
    }

    fn fetch(&self, id: SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn search(&self, query: &SearchQuery) -> Result<(Vec<Submission>, u64), RepositoryError> {
        self.inner.search(query)
    }

    fn for_actor(&self, query: &ActorQuery) -> Result<(Vec<Submission>, u64), RepositoryError> {
        self.inner.for_actor(query)
    }

    fn for_actor_in_term(
        &self,
        actor: &ActorId,
        academic_year: i32,
        semester: Semester,
    ) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        self.inner.for_actor_in_term(actor, academic_year, semester)
    }

    fn apply_change(
        &self,
        id: SubmissionId,
        change: &FieldChange,
        changed_by: &ActorId,
        at: DateTime<Utc>,
    ) -> Result<ChangeOutcome, RepositoryError> {
        self.inner.apply_change(id, change, changed_by, at)
    }
}

impl AuditLogRepository for FailingCreateRepository {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, RepositoryError> {
        self.inner.append(entry)
    }

    fn trail(&self, id: SubmissionId) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.inner.trail(id)
    }
}

/// Local storage that fails once `accept` files have been written, remembering removals.
pub(super) struct FlakyStorage {
    inner: LocalAttachmentStorage,
    accept: usize,
    written: Mutex<usize>,
    pub(super) removed: Mutex<Vec<String>>,
}

impl FlakyStorage {
    pub(super) fn new(root: &Path, accept: usize) -> Self {
        Self {
            inner: LocalAttachmentStorage::new(root),
            accept,
            written: Mutex::new(0),
            removed: Mutex::new(Vec::new()),
        }
    }
}

impl AttachmentStorage for FlakyStorage {
    fn store(&self, file_type: &str, content: &[u8]) -> Result<StoredFile, StorageError> {
        let mut written = self.written.lock().expect("lock");
        if *written >= self.accept {
            return Err(StorageError::Write {
                path: format!("{file_type}/refused"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "device full"),
            });
        }
        *written += 1;
        self.inner.store(file_type, content)
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.removed.lock().expect("lock").push(path.to_string());
        self.inner.remove(path)
    }
}
