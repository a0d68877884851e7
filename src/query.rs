//! Component J: runs a [`MappedQuery`] and renders results as the SPARQL XML
//! results format (spec.md §6).
//!
//! The mapper always emits two columns for a [`ProjectionKind::Literal`]
//! variable — a datatype marker and a lexical form — using the same
//! NULL/""/IRI convention [`crate::store::Store::export_rows`] uses for
//! export rows. That lets a variable that is only ever seen in an object
//! position still come back as `<uri>` when the matched node happens to be
//! a resource (concrete scenario 5), without the mapper needing to know the
//! shape of the data in advance.

use crate::mapper::{MappedQuery, ProjectionKind};
use crate::store::Store;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{self, Write};

pub enum BindingValue {
    Uri(String),
    Literal { lexical: String, datatype: Option<String> },
}

pub struct ResultSet {
    pub variables: Vec<String>,
    pub rows: Vec<Vec<Option<BindingValue>>>,
}

/// Runs `mapped.sql` against `store` and collects every row.
pub fn execute(store: &Store, mapped: &MappedQuery) -> Result<ResultSet, crate::error::StoreError> {
    let variables: Vec<String> = mapped.projection.iter().map(|(name, _)| name.clone()).collect();
    let mut rows = Vec::new();

    store.run_mapped_query(&mapped.sql, |row, _column_count| {
        let mut values = Vec::with_capacity(mapped.projection.len());
        let mut col = 0;
        for (_, kind) in &mapped.projection {
            match kind {
                ProjectionKind::Resource => {
                    let lexical: Option<String> = row.get(col)?;
                    col += 1;
                    values.push(lexical.map(BindingValue::Uri));
                }
                ProjectionKind::Literal => {
                    let datatype: Option<String> = row.get(col)?;
                    let lexical: Option<String> = row.get(col + 1)?;
                    col += 2;
                    values.push(lexical.map(|lex| match datatype {
                        None => BindingValue::Uri(lex),
                        Some(dt) if dt.is_empty() => BindingValue::Literal { lexical: lex, datatype: None },
                        Some(dt) => BindingValue::Literal { lexical: lex, datatype: Some(dt) },
                    }));
                }
            }
        }
        rows.push(values);
        Ok(())
    })?;

    Ok(ResultSet { variables, rows })
}

const XMLNS: &str = "http://www.w3.org/2005/sparql-results#";

fn quick_xml_err(err: quick_xml::Error) -> io::Error {
    io::Error::other(err.to_string())
}

fn sparql_start() -> BytesStart<'static> {
    let mut start = BytesStart::new("sparql");
    start.push_attribute(("xmlns", XMLNS));
    start
}

/// Writes the full `<sparql>` results document for `result` to `out`.
pub fn write_results_xml(out: impl Write, result: &ResultSet) -> io::Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(quick_xml_err)?;
    writer.write_event(Event::Start(sparql_start())).map_err(quick_xml_err)?;

    writer.write_event(Event::Start(BytesStart::new("head"))).map_err(quick_xml_err)?;
    for name in &result.variables {
        let mut variable = BytesStart::new("variable");
        variable.push_attribute(("name", name.as_str()));
        writer.write_event(Event::Empty(variable)).map_err(quick_xml_err)?;
    }
    writer.write_event(Event::End(BytesEnd::new("head"))).map_err(quick_xml_err)?;

    writer.write_event(Event::Start(BytesStart::new("results"))).map_err(quick_xml_err)?;
    for row in &result.rows {
        writer.write_event(Event::Start(BytesStart::new("result"))).map_err(quick_xml_err)?;
        for (name, value) in result.variables.iter().zip(row.iter()) {
            let Some(value) = value else { continue };
            let mut binding = BytesStart::new("binding");
            binding.push_attribute(("name", name.as_str()));
            writer.write_event(Event::Start(binding)).map_err(quick_xml_err)?;
            match value {
                BindingValue::Uri(iri) => {
                    writer.write_event(Event::Start(BytesStart::new("uri"))).map_err(quick_xml_err)?;
                    writer.write_event(Event::Text(BytesText::new(iri))).map_err(quick_xml_err)?;
                    writer.write_event(Event::End(BytesEnd::new("uri"))).map_err(quick_xml_err)?;
                }
                BindingValue::Literal { lexical, datatype } => {
                    let mut literal = BytesStart::new("literal");
                    if let Some(dt) = datatype {
                        literal.push_attribute(("datatype", dt.as_str()));
                    }
                    writer.write_event(Event::Start(literal)).map_err(quick_xml_err)?;
                    writer.write_event(Event::Text(BytesText::new(lexical))).map_err(quick_xml_err)?;
                    writer.write_event(Event::End(BytesEnd::new("literal"))).map_err(quick_xml_err)?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new("binding"))).map_err(quick_xml_err)?;
        }
        writer.write_event(Event::End(BytesEnd::new("result"))).map_err(quick_xml_err)?;
    }
    writer.write_event(Event::End(BytesEnd::new("results"))).map_err(quick_xml_err)?;
    writer.write_event(Event::End(BytesEnd::new("sparql"))).map_err(quick_xml_err)?;
    writer.get_mut().write_all(b"\n")
}

/// Writes a `<sparql>` document carrying an error instead of results.
pub fn write_error_xml(out: impl Write, message: &str) -> io::Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(quick_xml_err)?;
    writer.write_event(Event::Start(sparql_start())).map_err(quick_xml_err)?;
    writer.write_event(Event::Start(BytesStart::new("head"))).map_err(quick_xml_err)?;
    writer.write_event(Event::Start(BytesStart::new("error"))).map_err(quick_xml_err)?;
    writer.write_event(Event::CData(BytesCData::new(message))).map_err(quick_xml_err)?;
    writer.write_event(Event::End(BytesEnd::new("error"))).map_err(quick_xml_err)?;
    writer.write_event(Event::End(BytesEnd::new("head"))).map_err(quick_xml_err)?;
    writer.write_event(Event::End(BytesEnd::new("sparql"))).map_err(quick_xml_err)?;
    writer.get_mut().write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ;
    use crate::mapper;
    use crate::sparql;
    use crate::turtle::Triple;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        differ::import(
            &store,
            "http://e/m",
            vec![
                Triple { subject: "http://e/a".into(), predicate: "http://e/p".into(), object: Some("http://e/b".into()), lexical: None, datatype: None, language: None },
                Triple { subject: "http://e/a".into(), predicate: "http://e/q".into(), object: None, lexical: Some("v".into()), datatype: None, language: None },
            ],
        )
        .unwrap();
        store
    }

    #[test]
    fn object_position_variable_resolves_resource_and_literal_dynamically() {
        let store = seeded_store();
        let query = sparql::parse("SELECT ?o WHERE { <http://e/a> ?p ?o }").unwrap();
        let mapped = mapper::map(&store, &query).unwrap();
        let results = execute(&store, &mapped).unwrap();
        let rendered: Vec<_> = results
            .rows
            .iter()
            .map(|row| match &row[0] {
                Some(BindingValue::Uri(iri)) => iri.clone(),
                Some(BindingValue::Literal { lexical, .. }) => lexical.clone(),
                None => "<unbound>".into(),
            })
            .collect();
        assert!(rendered.contains(&"http://e/b".to_string()));
        assert!(rendered.contains(&"v".to_string()));
    }

    #[test]
    fn xml_renders_uri_and_literal_bindings() {
        let store = seeded_store();
        let query = sparql::parse("SELECT ?s ?p ?o WHERE { ?s ?p ?o }").unwrap();
        let mapped = mapper::map(&store, &query).unwrap();
        let results = execute(&store, &mapped).unwrap();
        let mut buf = Vec::new();
        write_results_xml(&mut buf, &results).unwrap();
        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.contains("<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">"));
        assert!(xml.contains("<variable name=\"s\"/>"));
        assert!(xml.contains("<uri>http://e/a</uri>"));
        assert!(xml.contains("<literal>v</literal>"));
    }

    #[test]
    fn error_xml_wraps_message_in_cdata() {
        let mut buf = Vec::new();
        write_error_xml(&mut buf, "variable \"z\" is not bound").unwrap();
        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.contains("<![CDATA[variable \"z\" is not bound]]>"));
    }
}
