//! Minimal S-expression reader for KiCad's text formats.
//!
//! KiCad files are a single list whose first atom names the file kind,
//! e.g. `(kicad_pcb (version 20221018) ...)`. Quoted strings and bare
//! symbols both become [`SExp::Atom`]; numbers are left as text and parsed
//! by whoever consumes them.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token at position {pos}: {message}")]
    UnexpectedToken { pos: usize, message: String },
    #[error("Trailing content at position {0}")]
    TrailingContent(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// The leading atom of a list, e.g. `segment` for `(segment ...)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExp::as_atom)
    }

    /// Atom at `index` within a list (index 0 is the tag).
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.get(index))
            .and_then(SExp::as_atom)
    }

    /// Child lists, skipping the tag and any bare atoms.
    pub fn children(&self) -> impl Iterator<Item = &SExp> {
        self.as_list()
            .unwrap_or(&[])
            .iter()
            .skip(1)
            .filter(|item| item.as_list().is_some())
    }

    /// First direct child list whose tag is `key`.
    pub fn find(&self, key: &str) -> Option<&SExp> {
        self.children().find(|child| child.tag() == Some(key))
    }

    /// All direct child lists whose tag is `key`.
    pub fn find_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SExp> + 'a {
        self.children().filter(move |child| child.tag() == Some(key))
    }

    /// First value of the child `(key value ...)`.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(|child| child.atom_at(1))
    }
}

pub struct SExpParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SExpParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse exactly one expression; anything but whitespace after it is an error.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        let expr = self.parse_expr()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError::TrailingContent(self.pos));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnexpectedToken {
                pos: self.pos,
                message: "unbalanced ')'".to_string(),
            }),
            Some('"') => self.parse_string(),
            Some(_) => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.bump();
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof),
                Some(')') => {
                    self.bump();
                    return Ok(SExp::List(items));
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        self.bump();
        let mut s = String::new();

        while let Some(ch) = self.bump() {
            match ch {
                '"' => return Ok(SExp::Atom(s)),
                '\\' => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(other) => s.push(other),
                    None => return Err(ParseError::UnexpectedEof),
                },
                _ => s.push(ch),
            }
        }

        Err(ParseError::UnexpectedEof)
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.bump();
        }
        Ok(SExp::Atom(self.input[start..self.pos].to_string()))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }
}
