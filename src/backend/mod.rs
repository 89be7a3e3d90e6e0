//! Capability interface implemented by each store adapter.
//!
//! A [`Connector`] knows how to open a [`Session`]; the session is the
//! exclusively owned handle used for one load or benchmark phase and is
//! consumed by [`Session::close`].

use std::fmt;

use async_trait::async_trait;

use crate::core::BackendError;
use crate::dataset::Record;

pub mod mongo;
pub mod postgres;
mod query;

pub use mongo::{MongoConnector, MongoSession};
pub use postgres::{PostgresConnector, PostgresSession};
pub use query::{QueryClass, QueryParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Document store (MongoDB).
    Document,
    /// Relational store (PostgreSQL).
    Relational,
}

impl BackendKind {
    pub fn display_name(self) -> &'static str {
        match self {
            BackendKind::Document => "MongoDB",
            BackendKind::Relational => "PostgreSQL",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single record the backend refused while the rest of its batch committed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordError {
    /// Position of the record within its batch.
    pub index: usize,
    pub tweet_id: i64,
    pub reason: String,
}

/// Result of one unordered batch write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWrite {
    pub inserted: usize,
    pub errors: Vec<RecordError>,
}

impl BatchWrite {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    fn kind(&self) -> BackendKind;

    /// Connection target for logs. Must not contain credentials.
    fn target(&self) -> String;

    /// Open and verify one session. Called again by the retry loop on failure.
    async fn connect(&self) -> Result<Self::Session, BackendError>;
}

#[async_trait]
pub trait Session: Send {
    fn kind(&self) -> BackendKind;

    /// Drop any previous data and recreate the schema.
    async fn reset(&mut self) -> Result<(), BackendError>;

    /// Write one batch with unordered semantics: a rejected record is
    /// reported in [`BatchWrite::errors`] and does not stop the others.
    /// An `Err` means the batch as a whole could not be submitted.
    async fn insert_batch(&mut self, records: &[Record]) -> Result<BatchWrite, BackendError>;

    /// Post-load work such as building secondary indexes.
    async fn finalize(&mut self) -> Result<(), BackendError>;

    /// Run one query class to completion and return the number of rows.
    async fn execute(&mut self, class: QueryClass, params: &QueryParams) -> Result<u64, BackendError>;

    /// Number of records currently stored.
    async fn count(&mut self) -> Result<u64, BackendError>;

    async fn close(self) -> Result<(), BackendError>
    where
        Self: Sized;
}
