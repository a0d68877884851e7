//! Component G: the import differ.
//!
//! Sorts the fully-parsed in-memory triples, merge-diffs them against the
//! stored model (already ordered `(s, p, o)` by the query in
//! [`crate::store::Store::model_quads_sorted`]), and applies the minimal
//! insert/delete set inside one transaction. Node interning runs in its own
//! earlier transaction so a large parse doesn't hold write locks for the
//! whole import — see §5's two-transaction split.

use crate::store::{Store, DATATYPE_PLAIN};
use crate::turtle::Triple;
use crate::error::StoreError;
use std::cmp::Ordering;

#[derive(Debug, Default, Clone, Copy)]
pub struct DiffResult {
    pub duplicates_removed: usize,
    pub added: usize,
    pub removed: usize,
}

fn intern_triple(store: &Store, triple: &Triple) -> Result<(i64, i64, i64), StoreError> {
    let s = store.resource_nid(&triple.subject)?;
    let p = store.resource_nid(&triple.predicate)?;
    let o = if let Some(object) = &triple.object {
        store.resource_nid(object)?
    } else {
        let lexical = triple.lexical.as_deref().unwrap_or_default();
        let datatype = match &triple.datatype {
            Some(iri) => store.resource_nid(iri)?,
            None => DATATYPE_PLAIN,
        };
        store.nid(lexical, datatype)?
    };
    Ok((s, p, o))
}

/// Imports `triples` into `model_iri`, returning counts of what changed.
pub fn import(
    store: &Store,
    model_iri: &str,
    triples: impl IntoIterator<Item = Triple>,
) -> Result<DiffResult, StoreError> {
    store.begin()?;
    let model_id = match store.resource_nid(model_iri) {
        Ok(id) => id,
        Err(e) => {
            let _ = store.rollback();
            return Err(e);
        }
    };

    let mut id_triples = Vec::new();
    for triple in triples {
        match intern_triple(store, &triple) {
            Ok(t) => id_triples.push(t),
            Err(e) => {
                let _ = store.rollback();
                return Err(e);
            }
        }
    }
    store.commit()?;
    tracing::info!(parsed = id_triples.len(), "interned parsed triples");

    id_triples.sort_unstable();
    let before_dedup = id_triples.len();
    id_triples.dedup();
    let duplicates_removed = before_dedup - id_triples.len();
    tracing::info!(duplicates_removed, "sorted and deduplicated parsed triples");

    let stored = store.model_quads_sorted(model_id)?;

    let mut to_remove = Vec::new();
    let mut to_add = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < id_triples.len() && j < stored.len() {
        let parsed = id_triples[i];
        let current = (stored[j].subject, stored[j].predicate, stored[j].object);
        match parsed.cmp(&current) {
            Ordering::Less => {
                to_add.push(parsed);
                i += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Greater => {
                to_remove.push(stored[j].oid);
                j += 1;
            }
        }
    }
    while i < id_triples.len() {
        to_add.push(id_triples[i]);
        i += 1;
    }
    while j < stored.len() {
        to_remove.push(stored[j].oid);
        j += 1;
    }
    tracing::info!(to_add = to_add.len(), to_remove = to_remove.len(), "computed diff");

    store.begin()?;
    let apply_result = (|| -> Result<(), StoreError> {
        for oid in &to_remove {
            store.delete_quad(*oid)?;
        }
        for (s, p, o) in &to_add {
            store.insert_quad(model_id, *s, *p, *o)?;
        }
        Ok(())
    })();
    match apply_result {
        Ok(()) => store.commit()?,
        Err(e) => {
            let _ = store.rollback();
            return Err(e);
        }
    }
    tracing::info!("committed diff");

    Ok(DiffResult { duplicates_removed, added: to_add.len(), removed: to_remove.len() })
}
