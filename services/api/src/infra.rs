use award_workflow::config::AppConfig;
use award_workflow::error::AppError;
use award_workflow::persistence::SqliteStore;
use award_workflow::workflows::awards::{
    ActorDirectory, AttachmentPolicy, LocalAttachmentStorage, SubmissionService,
};
use award_workflow::workflows::terms::TermService;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: SqliteStore,
}

/// Services sharing one SQLite store.
pub(crate) struct Workflow {
    pub(crate) store: SqliteStore,
    pub(crate) terms: Arc<TermService<SqliteStore>>,
    pub(crate) submissions: Arc<SubmissionService<SqliteStore>>,
}

pub(crate) fn open_store(config: &AppConfig) -> Result<SqliteStore, AppError> {
    let store = SqliteStore::from_config(&config.database)?;
    info!(path = %config.database.path, "database ready");
    Ok(store)
}

pub(crate) fn load_directory(config: &AppConfig) -> Result<ActorDirectory, AppError> {
    match &config.actor_directory {
        Some(path) => {
            let directory = ActorDirectory::from_path(path)?;
            info!(path = %path.display(), actors = directory.len(), "actor directory loaded");
            Ok(directory)
        }
        None => {
            warn!("APP_ACTOR_DIRECTORY not set; every submission will be refused as ineligible");
            Ok(ActorDirectory::new())
        }
    }
}

pub(crate) fn build_workflow(config: &AppConfig) -> Result<Workflow, AppError> {
    let store = open_store(config)?;
    let directory = load_directory(config)?;
    std::fs::create_dir_all(&config.storage.upload_dir)?;

    let repository = Arc::new(store.clone());
    let terms = Arc::new(TermService::new(repository.clone()));
    let submissions = Arc::new(SubmissionService::new(
        repository,
        terms.clone(),
        Arc::new(directory),
        Arc::new(LocalAttachmentStorage::new(&config.storage.upload_dir)),
        AttachmentPolicy::from_config(&config.storage),
    ));

    Ok(Workflow {
        store,
        terms,
        submissions,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(
            parse_date(" 2024-06-01 "),
            Ok(NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid"))
        );
        let err = parse_date("01/06/2024").expect_err("not iso");
        assert!(err.contains("01/06/2024"));
    }
}
