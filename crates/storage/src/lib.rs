#![forbid(unsafe_code)]

pub mod fixtures;
pub mod http;
pub mod repository;

pub use fixtures::FixtureError;
pub use http::{BackendConfig, HttpBackend, HttpInitError};
pub use repository::{
    AuthToken, InMemoryRepository, QuizRepository, Storage, StorageError, SubmissionAck,
    SubmissionService,
};
