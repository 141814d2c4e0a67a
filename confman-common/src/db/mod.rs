//! Database schema and models

pub mod init;
pub mod lifecycle;
pub mod models;

pub use init::{init_database, init_memory_database, init_schema};
pub use lifecycle::{ReviewStatus, Score, SubmissionStatus};
pub use models::*;
