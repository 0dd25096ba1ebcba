/// Error enumeration for store failures shared by every repository trait.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record conflicts with an existing record: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("record is still referenced: {0}")]
    InUse(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
