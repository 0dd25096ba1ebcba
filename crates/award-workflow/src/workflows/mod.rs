pub mod awards;
pub mod repository;
pub mod terms;

pub use repository::RepositoryError;
