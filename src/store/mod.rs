//! Persistence layer.

pub mod libsql_backend;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{InterviewState, InterviewType, UserRecord, UserStore, NAME_PLACEHOLDER};
