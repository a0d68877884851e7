//! Component C: the Turtle parser.
//!
//! A three-state machine (subject / predicate / object) built directly on
//! top of [`Tokenizer`]. Triples are reported to a caller-supplied sink
//! closure rather than collected into a `Vec` internally, mirroring the
//! original's callback boundary (see the Design Notes' "sink callback vs.
//! iterator" remark) while using an `Option<T>` return instead of a C `int`
//! to signal abort-with-value.

use super::tokenizer::{TokenKind, Tokenizer};
use crate::error::TurtleSyntaxError;
use crate::reader::ByteReader;
use std::collections::HashMap;

/// One parsed statement. Exactly one of `object`/`lexical` is set: a
/// resource object carries `object`, a literal object carries `lexical`
/// (and optionally `datatype` or `language`, never both).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Option<String>,
    pub lexical: Option<String>,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

struct Parser<R> {
    tok: Tokenizer<R>,
    prefixes: HashMap<String, String>,
    pending: Option<(TokenKind, Vec<u8>)>,
}

fn to_string(bytes: Vec<u8>, pos: usize) -> Result<String, TurtleSyntaxError> {
    String::from_utf8(bytes)
        .map_err(|_| TurtleSyntaxError::new(pos, "token is not valid UTF-8"))
}

impl<R: ByteReader> Parser<R> {
    fn raw_advance(&mut self) -> Result<(TokenKind, Vec<u8>), TurtleSyntaxError> {
        let kind = self
            .tok
            .advance()
            .map_err(|e| TurtleSyntaxError::new(0, format!("I/O error: {e}")))?;
        if !self.tok.good() {
            return Err(TurtleSyntaxError::new(0, "malformed token"));
        }
        Ok((kind, self.tok.slice().to_vec()))
    }

    fn peek(&mut self) -> Result<(TokenKind, Vec<u8>), TurtleSyntaxError> {
        if self.pending.is_none() {
            self.pending = Some(self.raw_advance()?);
        }
        Ok(self.pending.clone().unwrap())
    }

    fn take(&mut self) -> Result<(TokenKind, Vec<u8>), TurtleSyntaxError> {
        match self.pending.take() {
            Some(t) => Ok(t),
            None => self.raw_advance(),
        }
    }

    fn resolve_name(&self, bytes: &[u8]) -> Result<String, TurtleSyntaxError> {
        let colon = bytes
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| TurtleSyntaxError::new(0, "name is missing ':'"))?;
        let prefix = std::str::from_utf8(&bytes[..colon])
            .map_err(|_| TurtleSyntaxError::new(0, "prefix is not valid UTF-8"))?;
        let local = std::str::from_utf8(&bytes[colon + 1..])
            .map_err(|_| TurtleSyntaxError::new(0, "local name is not valid UTF-8"))?;
        let ns = self
            .prefixes
            .get(prefix)
            .ok_or_else(|| TurtleSyntaxError::new(0, format!("undeclared prefix \"{prefix}\"")))?;
        Ok(format!("{ns}{local}"))
    }

    fn parse_resource(&mut self) -> Result<String, TurtleSyntaxError> {
        let (kind, bytes) = self.take()?;
        match kind {
            TokenKind::Uri => to_string(bytes, 0),
            TokenKind::Name => self.resolve_name(&bytes),
            _ => Err(TurtleSyntaxError::new(0, "expected a resource")),
        }
    }

    fn parse_prefix_directive(&mut self) -> Result<(), TurtleSyntaxError> {
        let (kind, bytes) = self.take()?;
        if kind != TokenKind::Name || bytes.last() != Some(&b':') {
            return Err(TurtleSyntaxError::new(0, "expected \"prefix:\" after @prefix"));
        }
        let name = to_string(bytes[..bytes.len() - 1].to_vec(), 0)?;
        let (kind, bytes) = self.take()?;
        if kind != TokenKind::Uri {
            return Err(TurtleSyntaxError::new(0, "expected an IRI in @prefix directive"));
        }
        let iri = to_string(bytes, 0)?;
        let (kind, _) = self.take()?;
        if kind != TokenKind::Dot {
            return Err(TurtleSyntaxError::new(0, "expected '.' closing @prefix directive"));
        }
        self.prefixes.insert(name, iri);
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn parse_object(
        &mut self,
    ) -> Result<(Option<String>, Option<String>, Option<String>, Option<String>), TurtleSyntaxError>
    {
        let (kind, bytes) = self.take()?;
        match kind {
            TokenKind::Uri => Ok((Some(to_string(bytes, 0)?), None, None, None)),
            TokenKind::Name => Ok((Some(self.resolve_name(&bytes)?), None, None, None)),
            TokenKind::String => {
                let lexical = to_string(bytes, 0)?;
                let (peeked_kind, peeked_bytes) = self.peek()?;
                match peeked_kind {
                    TokenKind::Directive => {
                        self.take()?;
                        if peeked_bytes.last() == Some(&b'-') {
                            return Err(TurtleSyntaxError::new(
                                0,
                                "language tag must not end with '-'",
                            ));
                        }
                        let lang = to_string(peeked_bytes, 0)?;
                        Ok((None, Some(lexical), None, Some(lang)))
                    }
                    TokenKind::Carets => {
                        self.take()?;
                        let datatype = self.parse_resource()?;
                        Ok((None, Some(lexical), Some(datatype), None))
                    }
                    _ => Ok((None, Some(lexical), None, None)),
                }
            }
            _ => Err(TurtleSyntaxError::new(0, "expected an object (resource or literal)")),
        }
    }
}

/// Parses `reader` as Turtle, invoking `sink` once per statement. `sink`
/// returns `None` to continue or `Some(value)` to abort; `value` is
/// propagated out as the `Ok(Some(_))` result.
pub fn parse<R: ByteReader, T>(
    reader: R,
    mut sink: impl FnMut(Triple) -> Option<T>,
) -> Result<Option<T>, TurtleSyntaxError> {
    let mut p = Parser {
        tok: Tokenizer::new(reader),
        prefixes: HashMap::new(),
        pending: None,
    };

    'document: loop {
        loop {
            let (kind, bytes) = p.peek()?;
            if kind == TokenKind::Directive && bytes == b"prefix" {
                p.take()?;
                p.parse_prefix_directive()?;
            } else {
                break;
            }
        }

        let (kind, _) = p.peek()?;
        if kind == TokenKind::Finished {
            return Ok(None);
        }

        let subject = p.parse_resource()?;

        loop {
            let predicate = p.parse_resource()?;

            'object: loop {
                let (object, lexical, datatype, language) = p.parse_object()?;
                if let Some(abort) = sink(Triple {
                    subject: subject.clone(),
                    predicate: predicate.clone(),
                    object,
                    lexical,
                    datatype,
                    language,
                }) {
                    return Ok(Some(abort));
                }

                let (kind, _) = p.take()?;
                match kind {
                    TokenKind::Dot => continue 'document,
                    TokenKind::Semicolon => {
                        let (peeked, _) = p.peek()?;
                        if peeked == TokenKind::Dot {
                            p.take()?;
                            continue 'document;
                        }
                        break 'object;
                    }
                    TokenKind::Comma => continue 'object,
                    _ => {
                        return Err(TurtleSyntaxError::new(
                            0,
                            "expected '.', ';' or ',' after object",
                        ))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &[u8]) -> Vec<Triple> {
        let mut out = Vec::new();
        parse::<_, ()>(input, |t| {
            out.push(t);
            None
        })
        .unwrap();
        out
    }

    #[test]
    fn parses_scenario_one() {
        let input = br#"@prefix ex: <http://e/>. ex:a ex:p "v"; ex:q ex:a, ex:b ."#;
        let triples = parse_all(input);
        assert_eq!(triples.len(), 3);
        assert_eq!(triples[0].subject, "http://e/a");
        assert_eq!(triples[0].predicate, "http://e/p");
        assert_eq!(triples[0].lexical.as_deref(), Some("v"));
        assert_eq!(triples[0].object, None);
        assert_eq!(triples[1].subject, "http://e/a");
        assert_eq!(triples[1].predicate, "http://e/q");
        assert_eq!(triples[1].object.as_deref(), Some("http://e/a"));
        assert_eq!(triples[2].object.as_deref(), Some("http://e/b"));
    }

    #[test]
    fn parses_datatype_and_language() {
        let input = br#"@prefix ex: <http://e/>.
            ex:a ex:p "3"^^ex:int .
            ex:a ex:q "hi"@en ."#;
        let triples = parse_all(input);
        assert_eq!(triples[0].datatype.as_deref(), Some("http://e/int"));
        assert_eq!(triples[0].language, None);
        assert_eq!(triples[1].language.as_deref(), Some("en"));
        assert_eq!(triples[1].datatype, None);
    }

    #[test]
    fn rejects_language_tag_ending_in_dash() {
        let input = br#"@prefix ex: <http://e/>. ex:a ex:p "hi"@en- ."#;
        let err = parse::<_, ()>(input, |_| None).unwrap_err();
        assert!(err.message.contains("language tag"));
    }

    #[test]
    fn rejects_undeclared_prefix() {
        let input = b"ex:a ex:p ex:o .";
        let err = parse::<_, ()>(input, |_| None).unwrap_err();
        assert!(err.message.contains("undeclared prefix"));
    }

    #[test]
    fn sink_abort_propagates_value() {
        let input = br#"@prefix ex: <http://e/>. ex:a ex:p ex:o, ex:o2 ."#;
        let result = parse(input, |t| if t.object.is_some() { Some(42) } else { None }).unwrap();
        assert_eq!(result, Some(42));
    }

    #[test]
    fn empty_document_is_ok() {
        let triples = parse_all(b"   # just a comment\n");
        assert!(triples.is_empty());
    }
}
