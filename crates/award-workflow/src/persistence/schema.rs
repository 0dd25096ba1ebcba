use rusqlite::Connection;

/// Idempotent schema for terms, award forms, their detail and attachment rows, and the audit
/// log. The partial unique indexes let the store itself refuse a second current or open term.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS academic_terms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    year INTEGER NOT NULL CHECK (year BETWEEN 1 AND 9999),
    semester INTEGER NOT NULL CHECK (semester IN (1, 2)),
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    is_current INTEGER NOT NULL DEFAULT 0 CHECK (is_current IN (0, 1)),
    is_open_for_registration INTEGER NOT NULL DEFAULT 0 CHECK (is_open_for_registration IN (0, 1)),
    UNIQUE (year, semester)
);

CREATE UNIQUE INDEX IF NOT EXISTS academic_terms_single_current
    ON academic_terms (is_current) WHERE is_current = 1;
CREATE UNIQUE INDEX IF NOT EXISTS academic_terms_single_open
    ON academic_terms (is_open_for_registration) WHERE is_open_for_registration = 1;

CREATE TABLE IF NOT EXISTS award_forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id TEXT NOT NULL,
    actor_kind TEXT NOT NULL CHECK (actor_kind IN ('student', 'organization')),
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    student_number TEXT NOT NULL,
    faculty_id INTEGER NOT NULL,
    department_id INTEGER NOT NULL,
    campus_id INTEGER NOT NULL,
    organization_name TEXT,
    organization_type TEXT,
    organization_location TEXT,
    academic_year INTEGER NOT NULL,
    semester INTEGER NOT NULL CHECK (semester IN (1, 2)),
    classification TEXT NOT NULL,
    detail_kind TEXT NOT NULL,
    status TEXT NOT NULL,
    student_year INTEGER NOT NULL CHECK (student_year >= 1),
    advisor_name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    address TEXT NOT NULL,
    gpa REAL NOT NULL CHECK (gpa >= 0.0 AND gpa <= 4.0),
    date_of_birth TEXT NOT NULL,
    reject_reason TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (actor_id, academic_year, semester)
);

CREATE INDEX IF NOT EXISTS award_forms_campus_created
    ON award_forms (campus_id, created_at);
CREATE INDEX IF NOT EXISTS award_forms_term
    ON award_forms (academic_year, semester);

CREATE TABLE IF NOT EXISTS extracurricular_details (
    form_id INTEGER PRIMARY KEY REFERENCES award_forms (id) ON DELETE CASCADE,
    qualification_type TEXT NOT NULL,
    date_received TEXT NOT NULL,
    team_name TEXT NOT NULL,
    project_title TEXT NOT NULL,
    prize TEXT NOT NULL,
    organized_by TEXT NOT NULL,
    competition_level TEXT NOT NULL,
    activity_category TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS creativity_details (
    form_id INTEGER PRIMARY KEY REFERENCES award_forms (id) ON DELETE CASCADE,
    date_received TEXT NOT NULL,
    team_name TEXT NOT NULL,
    project_title TEXT NOT NULL,
    prize TEXT NOT NULL,
    organized_by TEXT NOT NULL,
    competition_level TEXT NOT NULL,
    activity_category TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS good_behavior_details (
    form_id INTEGER PRIMARY KEY REFERENCES award_forms (id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS award_attachments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id INTEGER NOT NULL REFERENCES award_forms (id) ON DELETE CASCADE,
    file_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL CHECK (size_bytes >= 0),
    path TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS award_audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id INTEGER NOT NULL REFERENCES award_forms (id),
    field_name TEXT NOT NULL,
    old_value TEXT NOT NULL,
    new_value TEXT NOT NULL,
    changed_by TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS award_audit_log_form
    ON award_audit_log (form_id, created_at);

CREATE TRIGGER IF NOT EXISTS award_audit_log_no_update
BEFORE UPDATE ON award_audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit entries are append-only');
END;

CREATE TRIGGER IF NOT EXISTS award_audit_log_no_delete
BEFORE DELETE ON award_audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit entries are append-only');
END;
"#;

pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)
}
