use crate::infra::{open_store, parse_date};
use award_workflow::config::AppConfig;
use award_workflow::error::AppError;
use award_workflow::persistence::SqliteStore;
use award_workflow::workflows::awards::{
    AuditEntry, AuditLogRepository, SubmissionId, SubmissionRepository,
};
use award_workflow::workflows::terms::{AcademicTerm, TermDraft, TermId, TermService};
use award_workflow::workflows::RepositoryError;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Subcommand, Debug)]
pub(crate) enum TermsCommand {
    /// List every academic term, newest first
    List,
    /// Create the next academic term
    Create(CreateTermArgs),
    /// Mark a term as the current term
    SetCurrent(TermIdArgs),
    /// Open a term for award registration
    Open(TermIdArgs),
}

#[derive(Args, Debug)]
pub(crate) struct CreateTermArgs {
    /// Academic year, e.g. 2024
    #[arg(long)]
    pub(crate) year: i32,
    /// Semester number (1 or 2)
    #[arg(long)]
    pub(crate) semester: u8,
    /// First day of the term (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: NaiveDate,
    /// Last day of the term (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) end: NaiveDate,
}

#[derive(Args, Debug)]
pub(crate) struct TermIdArgs {
    /// Term identifier as shown by `terms list`
    pub(crate) id: i64,
}

#[derive(Args, Debug)]
pub(crate) struct AuditArgs {
    /// Award form identifier
    pub(crate) form_id: i64,
}

pub(crate) fn run_terms(command: TermsCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = open_store(&config)?;
    print!("{}", execute_terms(&store, command)?);
    Ok(())
}

pub(crate) fn run_audit(args: AuditArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = open_store(&config)?;
    print!("{}", audit_report(&store, SubmissionId(args.form_id))?);
    Ok(())
}

fn execute_terms(store: &SqliteStore, command: TermsCommand) -> Result<String, AppError> {
    let service = TermService::new(Arc::new(store.clone()));
    let output = match command {
        TermsCommand::List => render_terms(&service.list()?),
        TermsCommand::Create(args) => {
            let term = service.create(TermDraft {
                year: args.year,
                semester: args.semester,
                start_date: args.start,
                end_date: args.end,
            })?;
            format!("created {}\n", describe(&term))
        }
        TermsCommand::SetCurrent(args) => {
            let term = service.set_current(TermId(args.id))?;
            format!("current term is now {}\n", describe(&term))
        }
        TermsCommand::Open(args) => {
            let term = service.open_for_registration(TermId(args.id))?;
            format!("registration open for {}\n", describe(&term))
        }
    };
    Ok(output)
}

fn audit_report(store: &SqliteStore, form_id: SubmissionId) -> Result<String, AppError> {
    if store.fetch(form_id)?.is_none() {
        return Err(RepositoryError::NotFound.into());
    }
    Ok(render_trail(form_id, &store.trail(form_id)?))
}

fn describe(term: &AcademicTerm) -> String {
    format!(
        "#{} {} ({} to {})",
        term.id,
        term.position(),
        term.start_date,
        term.end_date
    )
}

fn render_terms(terms: &[AcademicTerm]) -> String {
    if terms.is_empty() {
        return "no academic terms\n".to_string();
    }

    let mut output = String::new();
    for term in terms {
        let mut flags = Vec::new();
        if term.is_current {
            flags.push("current");
        }
        if term.is_open_for_registration {
            flags.push("open");
        }
        if flags.is_empty() {
            let _ = writeln!(output, "{}", describe(term));
        } else {
            let _ = writeln!(output, "{} {}", describe(term), flags.join(","));
        }
    }
    output
}

fn render_trail(form_id: SubmissionId, entries: &[AuditEntry]) -> String {
    let mut output = format!("audit trail for form {form_id} ({} entries)\n", entries.len());
    for entry in entries {
        let _ = writeln!(
            output,
            "{} {} {}: '{}' -> '{}'",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.changed_by,
            entry.field_name,
            entry.old_value,
            entry.new_value
        );
    }
    output
}
