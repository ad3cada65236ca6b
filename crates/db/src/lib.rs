pub mod connection;
pub mod migrations;
pub mod persistence;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use persistence::{
    NoopWorkflowPersistence, PersistenceEvent, RecordingPersistence, SqlWorkflowPersistence,
    WorkflowPersistence,
};
pub use repositories::RepositoryError;
