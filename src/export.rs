//! Component H: the Turtle export serializer.
//!
//! Consumes the subject/predicate-ordered rows from
//! [`crate::store::Store::export_rows`] and renders Turtle text, assigning
//! `@prefix` abbreviations to namespaces on first use. Prefix declarations
//! are buffered separately from the statement body so they can be written
//! first even though both are produced in the same pass over the rows.

use crate::store::{ExportObject, ExportRow};
use std::collections::HashMap;

fn escape(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// 1-indexed base-26 label: 1 -> "a", 26 -> "z", 27 -> "aa", ...
fn base26_label(mut n: u64) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

struct PrefixTable {
    order: Vec<(String, String)>,
    lookup: HashMap<String, String>,
}

impl PrefixTable {
    fn new() -> Self {
        Self { order: Vec::new(), lookup: HashMap::new() }
    }

    fn namespace_of(iri: &str) -> Option<(&str, &str)> {
        iri.rfind('#').map(|idx| (&iri[..=idx], &iri[idx + 1..]))
    }

    fn abbreviate(&mut self, iri: &str) -> String {
        match Self::namespace_of(iri) {
            Some((ns, local)) => {
                let label = self.get_or_insert(ns);
                format!("{label}:{local}")
            }
            None => format!("<{}>", escape(iri, '>')),
        }
    }

    fn get_or_insert(&mut self, ns: &str) -> String {
        if let Some(label) = self.lookup.get(ns) {
            return label.clone();
        }
        let label = base26_label(self.order.len() as u64 + 1);
        self.lookup.insert(ns.to_string(), label.clone());
        self.order.push((label.clone(), ns.to_string()));
        label
    }

    fn declarations(&self) -> String {
        let mut out = String::new();
        for (label, ns) in &self.order {
            out.push_str(&format!("@prefix {label}: <{}>.\n", escape(ns, '>')));
        }
        out
    }
}

fn render_object(object: &ExportObject, table: &mut PrefixTable) -> String {
    match object {
        ExportObject::Resource(iri) => table.abbreviate(iri),
        ExportObject::Literal { lexical, datatype } => {
            let quoted = format!("\"{}\"", escape(lexical, '"'));
            match datatype {
                None => quoted,
                Some(dt) => format!("{quoted}^^{}", table.abbreviate(dt)),
            }
        }
    }
}

/// Renders `rows` (already ordered `(subject, predicate)`) as Turtle text.
pub fn export(rows: &[ExportRow]) -> String {
    let mut table = PrefixTable::new();
    let mut body = String::new();
    let mut last: Option<(&str, &str)> = None;

    for row in rows {
        let same_subject = last.is_some_and(|(s, _)| s == row.subject);
        let same_predicate = same_subject && last.is_some_and(|(_, p)| p == row.predicate);

        if last.is_none() {
            body.push_str(&table.abbreviate(&row.subject));
            body.push(' ');
            body.push_str(&table.abbreviate(&row.predicate));
            body.push(' ');
        } else if same_predicate {
            body.push_str(", ");
        } else if same_subject {
            body.push_str(";\n\t");
            body.push_str(&table.abbreviate(&row.predicate));
            body.push(' ');
        } else {
            body.push_str(".\n");
            body.push_str(&table.abbreviate(&row.subject));
            body.push(' ');
            body.push_str(&table.abbreviate(&row.predicate));
            body.push(' ');
        }
        body.push_str(&render_object(&row.object, &mut table));
        last = Some((&row.subject, &row.predicate));
    }
    if last.is_some() {
        body.push_str(".\n");
    }

    format!("{}{body}", table.declarations())
}
