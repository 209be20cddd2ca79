//! Database connectivity and schema for the SurrealDB backend
//!
//! Accounts live in the `user` table, pets in the `pet` table. The only
//! schema the hub depends on is the unique username index and the `owner2`
//! lookup index used by the co-owner fallback resolution.

use miette::Diagnostic;
use surrealdb::{Surreal, engine::any::Any};
use thiserror::Error;

pub mod store;

pub use store::SurrealStore;

/// Core database error type
#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("Connection failed")]
    #[diagnostic(help("Check the database URL and ensure the engine is available"))]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Query failed")]
    #[diagnostic(help("Check the query syntax and table schema"))]
    QueryFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Record not found: {entity}")]
    NotFound { entity: String },

    #[error("Malformed record")]
    #[diagnostic(help("The database returned a record key that is not a valid typed id"))]
    MalformedRecord(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DatabaseError {
    pub(crate) fn query(err: surrealdb::Error) -> Self {
        DatabaseError::QueryFailed(Box::new(err))
    }

    pub(crate) fn malformed(err: crate::id::IdError) -> Self {
        DatabaseError::MalformedRecord(Box::new(err))
    }
}

const SCHEMA: &str = "
    DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS user_username ON TABLE user COLUMNS username UNIQUE;
    DEFINE TABLE IF NOT EXISTS pet SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS pet_owner2 ON TABLE pet COLUMNS owner2;
";

/// Connect to the database and apply schema definitions.
///
/// `url` accepts any engine the SDK supports; `mem://` for tests,
/// `surrealkv://path` for an embedded on-disk database.
pub async fn connect(url: &str) -> Result<Surreal<Any>, DatabaseError> {
    let db = surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(Box::new(e)))?;

    db.use_ns("motchi")
        .use_db("game")
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(Box::new(e)))?;

    db.query(SCHEMA).await.map_err(DatabaseError::query)?;

    Ok(db)
}

/// SurrealDB string keys render wrapped in delimiters whose style varies by
/// SDK version (`⟨⟩` in older releases, backticks in newer ones); strip both
/// so the bare UUID can be parsed back out of a record id.
pub fn strip_key_delimiters(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, '⟨' | '⟩' | '`'))
}
