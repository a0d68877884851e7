//! Typed error types for the parsing/mapping/storage layers.
//!
//! Library-level code returns these so callers can match on what went wrong.
//! `main.rs` is the only place that collapses everything into `anyhow`.

/// A byte offset into the source being parsed, used to locate syntax errors.
pub type BytePosition = usize;

/// A malformed Turtle document: bad escape, unterminated string, stray `^`,
/// unknown directive, undeclared prefix, or a structural violation of the
/// subject/predicate/object grammar.
#[derive(Debug, thiserror::Error)]
#[error("Turtle syntax error at byte {position}: {message}")]
pub struct TurtleSyntaxError {
    pub position: BytePosition,
    pub message: String,
}

impl TurtleSyntaxError {
    pub fn new(position: BytePosition, message: impl Into<String>) -> Self {
        Self { position, message: message.into() }
    }
}

/// A malformed SPARQL query: unexpected token, undeclared prefix, or
/// structural violation of the grammar in spec.md §4.E.
#[derive(Debug, thiserror::Error)]
#[error("SPARQL syntax error at byte {position}: {message}")]
pub struct SparqlSyntaxError {
    pub position: BytePosition,
    pub message: String,
}

impl SparqlSyntaxError {
    pub fn new(position: BytePosition, message: impl Into<String>) -> Self {
        Self { position, message: message.into() }
    }
}

/// A query that is syntactically valid but cannot be mapped to SQL: an
/// unsupported expression operator, or a projected/ordered variable that is
/// never bound by the graph pattern.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("variable \"{0}\" is not bound by the graph pattern")]
    UnboundVariable(String),
    #[error("unsupported expression operator: {0}")]
    UnsupportedOperator(&'static str),
}

/// Failures talking to the relational store: anything the underlying driver
/// reports that is not `OK`/`ROW`/`DONE`, plus node-interning failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database is busy")]
    Busy,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to generate a node identifier for ({lexical:?}, datatype {datatype})")]
    NodeInterningFailed { lexical: String, datatype: i64 },
}

/// The union of failures the SPARQL→SQL mapper can hit: a read-only store
/// lookup can fail the same way any store access can, and the mapping
/// itself can reject a query as semantically invalid.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mapper(#[from] MapperError),
}

impl StoreError {
    pub fn from_sqlite(err: rusqlite::Error) -> Self {
        if matches!(
            err,
            rusqlite::Error::SqliteFailure(ref e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy
        ) {
            StoreError::Busy
        } else {
            StoreError::Sqlite(err)
        }
    }
}
