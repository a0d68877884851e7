//! Components F and K (plus SPEC_FULL §4.L): node interning, schema
//! management, and transaction glue around a single SQLite connection.
//!
//! Grounded on the SQLite-backed RDF adapter in the retrieval pack (see
//! `DESIGN.md`) rather than on the teacher's own storage layer, which is
//! RocksDB-based and has no SQL surface to imitate. The explicit
//! `BEGIN`/`COMMIT`/`ROLLBACK` calls and `params!`-based statement execution
//! follow that adapter's shape.

use crate::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};

/// `Node.oid` for the sentinel meaning "this node is an IRI".
pub const DATATYPE_IRI: i64 = 0;
/// `Node.oid` for the sentinel meaning "plain literal, no datatype".
pub const DATATYPE_PLAIN: i64 = 1;

const RESERVED_XSD_BOOLEAN: i64 = 2;
const RESERVED_XSD_INTEGER: i64 = 3;
const RESERVED_XSD_DATETIME: i64 = 4;
const RESERVED_XSD_FLOAT: i64 = 5;
const RESERVED_XSD_DOUBLE: i64 = 6;

/// An id returned by a read-only lookup that found no matching node.
/// Callers never create nodes as a side effect of querying or exporting —
/// see §3's "Nodes are ... looked up read-only during query/export".
pub const NOT_FOUND: i64 = -1;

pub struct StoredQuad {
    pub oid: i64,
    pub subject: i64,
    pub predicate: i64,
    pub object: i64,
}

pub enum ExportObject {
    Resource(String),
    Literal { lexical: String, datatype: Option<String> },
}

pub struct ExportRow {
    pub subject: String,
    pub predicate: String,
    pub object: ExportObject,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::from_sqlite)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StoreError::from_sqlite)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from_sqlite)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS Node (oid INTEGER PRIMARY KEY, l TEXT, d INTEGER);
                 CREATE UNIQUE INDEX IF NOT EXISTS node_l_d ON Node(l, d);
                 CREATE TABLE IF NOT EXISTS Quad (
                     oid INTEGER PRIMARY KEY, m INTEGER, s INTEGER, p INTEGER, o INTEGER
                 );
                 CREATE UNIQUE INDEX IF NOT EXISTS quad_m_s_p_o ON Quad(m, s, p, o);",
            )
            .map_err(StoreError::from_sqlite)?;
        self.conn
            .execute(
                "INSERT OR IGNORE INTO Node (oid, l, d) VALUES
                    (0, NULL, NULL),
                    (1, NULL, NULL),
                    (?1, 'http://www.w3.org/2001/XMLSchema#boolean', 0),
                    (?2, 'http://www.w3.org/2001/XMLSchema#integer', 0),
                    (?3, 'http://www.w3.org/2001/XMLSchema#dateTime', 0),
                    (?4, 'http://www.w3.org/2001/XMLSchema#float', 0),
                    (?5, 'http://www.w3.org/2001/XMLSchema#double', 0)",
                params![
                    RESERVED_XSD_BOOLEAN,
                    RESERVED_XSD_INTEGER,
                    RESERVED_XSD_DATETIME,
                    RESERVED_XSD_FLOAT,
                    RESERVED_XSD_DOUBLE
                ],
            )
            .map_err(StoreError::from_sqlite)?;
        Ok(())
    }

    /// `nid(lexical, datatype_id) -> node_id`, creating the node if absent.
    /// Used during import; never used by query/export lookups.
    pub fn nid(&self, lexical: &str, datatype: i64) -> Result<i64, StoreError> {
        let mut select = self
            .conn
            .prepare_cached("SELECT oid FROM Node WHERE l = ?1 AND d = ?2")
            .map_err(StoreError::from_sqlite)?;
        let found: Option<i64> = select
            .query_row(params![lexical, datatype], |row| row.get(0))
            .optional()
            .map_err(StoreError::from_sqlite)?;
        if let Some(id) = found {
            return Ok(id);
        }
        let mut insert = self
            .conn
            .prepare_cached("INSERT INTO Node (l, d) VALUES (?1, ?2)")
            .map_err(StoreError::from_sqlite)?;
        insert.execute(params![lexical, datatype]).map_err(|err| {
            tracing::error!(lexical, datatype, error = %err, "failed to intern node");
            StoreError::NodeInterningFailed { lexical: lexical.to_string(), datatype }
        })?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn resource_nid(&self, iri: &str) -> Result<i64, StoreError> {
        self.nid(iri, DATATYPE_IRI)
    }

    /// Read-only node lookup for SPARQL constants: returns [`NOT_FOUND`]
    /// rather than creating a node, so running a query never writes.
    pub fn lookup(&self, lexical: &str, datatype: i64) -> Result<i64, StoreError> {
        let mut select = self
            .conn
            .prepare_cached("SELECT oid FROM Node WHERE l = ?1 AND d = ?2")
            .map_err(StoreError::from_sqlite)?;
        select
            .query_row(params![lexical, datatype], |row| row.get(0))
            .optional()
            .map_err(StoreError::from_sqlite)
            .map(|found| found.unwrap_or(NOT_FOUND))
    }

    pub fn lookup_resource(&self, iri: &str) -> Result<i64, StoreError> {
        self.lookup(iri, DATATYPE_IRI)
    }

    pub fn begin(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(StoreError::from_sqlite)
    }

    pub fn commit(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(StoreError::from_sqlite)
    }

    pub fn rollback(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(StoreError::from_sqlite)
    }

    /// Stored quads for `model_id`, ordered `(s, p, o)` to line up with the
    /// differ's sorted in-memory triples.
    pub fn model_quads_sorted(&self, model_id: i64) -> Result<Vec<StoredQuad>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT oid, s, p, o FROM Quad WHERE m = ?1 ORDER BY s, p, o")
            .map_err(StoreError::from_sqlite)?;
        let rows = stmt
            .query_map(params![model_id], |row| {
                Ok(StoredQuad {
                    oid: row.get(0)?,
                    subject: row.get(1)?,
                    predicate: row.get(2)?,
                    object: row.get(3)?,
                })
            })
            .map_err(StoreError::from_sqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from_sqlite)
    }

    pub fn insert_quad(&self, model_id: i64, s: i64, p: i64, o: i64) -> Result<(), StoreError> {
        self.conn
            .prepare_cached("INSERT INTO Quad (m, s, p, o) VALUES (?1, ?2, ?3, ?4)")
            .map_err(StoreError::from_sqlite)?
            .execute(params![model_id, s, p, o])
            .map_err(StoreError::from_sqlite)?;
        Ok(())
    }

    pub fn delete_quad(&self, oid: i64) -> Result<(), StoreError> {
        self.conn
            .prepare_cached("DELETE FROM Quad WHERE oid = ?1")
            .map_err(StoreError::from_sqlite)?
            .execute(params![oid])
            .map_err(StoreError::from_sqlite)?;
        Ok(())
    }

    /// Rows for export, ordered `(s, p)` so the serializer can compact
    /// repeated subjects/predicates with `;`/`,`.
    pub fn export_rows(&self, model_id: i64) -> Result<Vec<ExportRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT sN.l, pN.l, oN.l, oN.d, dtN.l
                 FROM Quad q
                 JOIN Node sN ON sN.oid = q.s
                 JOIN Node pN ON pN.oid = q.p
                 JOIN Node oN ON oN.oid = q.o
                 LEFT JOIN Node dtN ON dtN.oid = oN.d AND oN.d NOT IN (0, 1)
                 WHERE q.m = ?1
                 ORDER BY q.s, q.p",
            )
            .map_err(StoreError::from_sqlite)?;
        let rows = stmt
            .query_map(params![model_id], |row| {
                let subject: String = row.get(0)?;
                let predicate: String = row.get(1)?;
                let object_lexical: String = row.get(2)?;
                let object_datatype_id: i64 = row.get(3)?;
                let datatype_iri: Option<String> = row.get(4)?;
                let object = if object_datatype_id == DATATYPE_IRI {
                    ExportObject::Resource(object_lexical)
                } else if object_datatype_id == DATATYPE_PLAIN {
                    ExportObject::Literal { lexical: object_lexical, datatype: None }
                } else {
                    ExportObject::Literal { lexical: object_lexical, datatype: datatype_iri }
                };
                Ok(ExportRow { subject, predicate, object })
            })
            .map_err(StoreError::from_sqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from_sqlite)
    }

    /// Executes mapper-generated SQL and hands each row to `f` along with
    /// the column count, for the query executor (component J).
    pub fn run_mapped_query(
        &self,
        sql: &str,
        mut f: impl FnMut(&rusqlite::Row<'_>, usize) -> rusqlite::Result<()>,
    ) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(StoreError::from_sqlite)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query([]).map_err(StoreError::from_sqlite)?;
        while let Some(row) = rows.next().map_err(StoreError::from_sqlite)? {
            f(row, column_count).map_err(StoreError::from_sqlite)?;
        }
        Ok(())
    }
}
