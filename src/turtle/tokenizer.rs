//! Component B: the Turtle tokenizer.
//!
//! Owns a growable byte buffer seeded from a [`ByteReader`]. The buffer is
//! represented as an owned `Vec<u8>` with plain `usize` offsets rather than
//! raw pointers, so sliding/doubling the buffer on pressure is just subtracting
//! a delta from every index instead of pointer-relocation bookkeeping — see
//! `DESIGN.md` for the original's pointer-based version of the same idea.

use crate::reader::ByteReader;
use std::io;

const INITIAL_BUFFER_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Finished,
    Directive,
    String,
    Uri,
    Name,
    Integer,
    Dot,
    Semicolon,
    Comma,
    Carets,
}

pub struct Tokenizer<R> {
    reader: R,
    buffer: Vec<u8>,
    cur: usize,
    eob: usize,
    t_begin: usize,
    t_end: usize,
    kind: TokenKind,
    error: bool,
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b':' || c >= 0x80
}

impl<R: ByteReader> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0; INITIAL_BUFFER_SIZE],
            cur: 0,
            eob: 0,
            t_begin: 0,
            t_end: 0,
            kind: TokenKind::Finished,
            error: false,
        }
    }

    /// `false` once a malformed byte sequence has been seen; sticky.
    pub fn good(&self) -> bool {
        !self.error
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The decoded bytes of the current token (escapes already resolved for
    /// strings/IRIs).
    pub fn slice(&self) -> &[u8] {
        &self.buffer[self.t_begin..self.t_end]
    }

    fn refill_buffer(&mut self) -> io::Result<bool> {
        self.cur = 0;
        self.eob = self.reader.read(&mut self.buffer)?;
        Ok(self.cur != self.eob)
    }

    fn extend_buffer(&mut self) -> io::Result<bool> {
        if 4 * self.t_begin > self.buffer.len() {
            let shift = self.t_begin;
            self.buffer.copy_within(shift..self.eob, 0);
            self.cur -= shift;
            self.t_end -= shift;
            self.eob -= shift;
            self.t_begin = 0;
        }
        if 2 * self.eob > self.buffer.len() {
            let new_size = self.buffer.len() * 2;
            self.buffer.resize(new_size, 0);
        }
        let read = self.reader.read(&mut self.buffer[self.eob..])?;
        self.eob += read;
        Ok(self.cur != self.eob)
    }

    fn fail(&mut self) -> io::Result<TokenKind> {
        self.error = true;
        self.kind = TokenKind::Finished;
        Ok(self.kind)
    }

    /// Scans a `"..."` or `<...>` literal, decoding `\\ \t \n \r \"`/`\>`
    /// escapes in place so the resulting slice is already the decoded value.
    fn parse_delimited(&mut self, end_char: u8) -> io::Result<bool> {
        let mut escape = false;
        self.cur += 1;
        self.t_begin = self.cur;
        self.t_end = self.cur;
        loop {
            while self.cur != self.eob {
                let c = self.buffer[self.cur];
                if escape {
                    let decoded = match c {
                        b'\\' => b'\\',
                        b't' => 0x09,
                        b'n' => 0x0A,
                        b'r' => 0x0D,
                        other if other == end_char => end_char,
                        _ => return Ok(false),
                    };
                    self.buffer[self.t_end] = decoded;
                    self.t_end += 1;
                    escape = false;
                } else if c == b'\\' {
                    escape = true;
                } else if c == end_char {
                    self.cur += 1;
                    return Ok(true);
                } else {
                    self.buffer[self.t_end] = c;
                    self.t_end += 1;
                }
                self.cur += 1;
            }
            if !self.extend_buffer()? {
                return Ok(false);
            }
        }
    }

    fn parse_directive(&mut self) -> io::Result<()> {
        self.cur += 1;
        self.t_begin = self.cur;
        loop {
            while self.cur != self.eob
                && (self.buffer[self.cur] == b'-'
                    || self.buffer[self.cur].is_ascii_alphanumeric())
            {
                self.cur += 1;
            }
            if self.cur == self.eob && self.extend_buffer()? {
                continue;
            }
            break;
        }
        self.t_end = self.cur;
        Ok(())
    }

    pub fn advance(&mut self) -> io::Result<TokenKind> {
        if self.error {
            self.kind = TokenKind::Finished;
            return Ok(self.kind);
        }

        loop {
            while self.cur != self.eob
                && matches!(self.buffer[self.cur], 0x09 | 0x0A | 0x0D | 0x20)
            {
                self.cur += 1;
            }
            if self.cur == self.eob {
                if self.refill_buffer()? {
                    continue;
                }
                self.kind = TokenKind::Finished;
                return Ok(self.kind);
            }

            if self.buffer[self.cur] == b'#' {
                loop {
                    while self.cur != self.eob
                        && self.buffer[self.cur] != 0x0A
                        && self.buffer[self.cur] != 0x0D
                    {
                        self.cur += 1;
                    }
                    if self.cur != self.eob {
                        break;
                    }
                    if !self.refill_buffer()? {
                        self.kind = TokenKind::Finished;
                        return Ok(self.kind);
                    }
                }
                continue;
            }

            break;
        }

        match self.buffer[self.cur] {
            b'"' => {
                if self.parse_delimited(b'"')? {
                    self.kind = TokenKind::String;
                    Ok(self.kind)
                } else {
                    self.fail()
                }
            }
            b'<' => {
                if self.parse_delimited(b'>')? {
                    self.kind = TokenKind::Uri;
                    Ok(self.kind)
                } else {
                    self.fail()
                }
            }
            b',' => {
                self.t_begin = self.cur;
                self.cur += 1;
                self.t_end = self.cur;
                self.kind = TokenKind::Comma;
                Ok(self.kind)
            }
            b'.' => {
                self.t_begin = self.cur;
                self.cur += 1;
                self.t_end = self.cur;
                self.kind = TokenKind::Dot;
                Ok(self.kind)
            }
            b';' => {
                self.t_begin = self.cur;
                self.cur += 1;
                self.t_end = self.cur;
                self.kind = TokenKind::Semicolon;
                Ok(self.kind)
            }
            b'^' => {
                self.t_begin = self.cur;
                self.cur += 1;
                if self.cur == self.eob && !self.extend_buffer()? {
                    return self.fail();
                }
                if self.cur != self.eob && self.buffer[self.cur] == b'^' {
                    self.cur += 1;
                    self.t_end = self.cur;
                    self.kind = TokenKind::Carets;
                    Ok(self.kind)
                } else {
                    self.fail()
                }
            }
            b'@' => {
                self.parse_directive()?;
                self.kind = TokenKind::Directive;
                Ok(self.kind)
            }
            b'+' | b'-' | b'0'..=b'9' => {
                self.t_begin = self.cur;
                loop {
                    loop {
                        self.cur += 1;
                        if !(self.cur != self.eob && self.buffer[self.cur].is_ascii_digit()) {
                            break;
                        }
                    }
                    if self.cur == self.eob && self.extend_buffer()? {
                        continue;
                    }
                    break;
                }
                self.t_end = self.cur;
                let sign_only = self.t_begin + 1 == self.t_end
                    && matches!(self.buffer[self.t_begin], b'+' | b'-');
                if !sign_only {
                    self.kind = TokenKind::Integer;
                    return Ok(self.kind);
                }
                self.fail()
            }
            c if is_name_char(c) => {
                self.t_begin = self.cur;
                self.cur += 1;
                loop {
                    while self.cur != self.eob && is_name_char(self.buffer[self.cur]) {
                        self.cur += 1;
                    }
                    if self.cur == self.eob && self.extend_buffer()? {
                        continue;
                    }
                    break;
                }
                self.t_end = self.cur;
                self.kind = TokenKind::Name;
                Ok(self.kind)
            }
            _ => self.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<(TokenKind, Vec<u8>)> {
        let mut tok = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            let kind = tok.advance().unwrap();
            if kind == TokenKind::Finished {
                break;
            }
            out.push((kind, tok.slice().to_vec()));
        }
        out
    }

    #[test]
    fn skips_whitespace_and_comments() {
        let t = tokens(b"  # a comment\n <http://a/> ");
        assert_eq!(t, vec![(TokenKind::Uri, b"http://a/".to_vec())]);
    }

    #[test]
    fn decodes_string_escapes() {
        let t = tokens(b"\"a\\tb\\nc\\\\d\\\"e\"");
        assert_eq!(t, vec![(TokenKind::String, b"a\tb\nc\\d\"e".to_vec())]);
    }

    #[test]
    fn rejects_unknown_escape() {
        let mut tok = Tokenizer::new(&b"\"a\\xb\""[..]);
        tok.advance().unwrap();
        assert!(!tok.good());
    }

    #[test]
    fn recognizes_punctuation() {
        let t = tokens(b". ; , ^^");
        assert_eq!(
            t,
            vec![
                (TokenKind::Dot, b".".to_vec()),
                (TokenKind::Semicolon, b";".to_vec()),
                (TokenKind::Comma, b",".to_vec()),
                (TokenKind::Carets, b"^^".to_vec()),
            ]
        );
    }

    #[test]
    fn lone_caret_is_an_error() {
        let mut tok = Tokenizer::new(&b"^ "[..]);
        tok.advance().unwrap();
        assert!(!tok.good());
    }

    #[test]
    fn parses_signed_integers() {
        let t = tokens(b"+12 -3 42");
        assert_eq!(
            t,
            vec![
                (TokenKind::Integer, b"+12".to_vec()),
                (TokenKind::Integer, b"-3".to_vec()),
                (TokenKind::Integer, b"42".to_vec()),
            ]
        );
    }

    #[test]
    fn lone_sign_is_an_error() {
        let mut tok = Tokenizer::new(&b"+ "[..]);
        tok.advance().unwrap();
        assert!(!tok.good());
    }

    #[test]
    fn tokenizes_names_with_colon() {
        let t = tokens(b"ex:subject");
        assert_eq!(t, vec![(TokenKind::Name, b"ex:subject".to_vec())]);
    }

    #[test]
    fn directive_token() {
        let t = tokens(b"@prefix");
        assert_eq!(t, vec![(TokenKind::Directive, b"prefix".to_vec())]);
    }

    #[test]
    fn buffer_growth_is_transparent_to_tokens() {
        // a string far longer than the initial 512-byte buffer must still
        // tokenize to a single String token with the right contents.
        let body = "x".repeat(2000);
        let input = format!("\"{body}\"");
        let t = tokens(input.as_bytes());
        assert_eq!(t, vec![(TokenKind::String, body.into_bytes())]);
    }
}
