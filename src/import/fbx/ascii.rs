//! ASCII FBX reader.
//!
//! Records look like `Name: prop, prop { children }`. Arrays are written as
//! `Name: *N { a: v, v, ... }` from version 7 on and as bare comma lists
//! before that; both become a single array property.

use super::{Document, Node, Property};
use crate::error::{ConvertError, Result};

const MAX_DEPTH: usize = 128;

pub(super) fn parse(text: &str) -> Result<Document> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let nodes = parser.nodes(0)?;

    let version = nodes
        .iter()
        .find(|n| n.name == "FBXHeaderExtension")
        .and_then(|h| h.child("FBXVersion"))
        .and_then(|v| v.properties.first())
        .and_then(Property::as_i64)
        .and_then(|v| u32::try_from(v).ok())
        .or_else(|| version_from_comment(text));

    Ok(Document { version, nodes })
}

fn error(message: impl std::fmt::Display) -> ConvertError {
    ConvertError::Import(format!("FBX: {}", message))
}

/// `; FBX 7.4.0 project file` → 7400.
fn version_from_comment(text: &str) -> Option<u32> {
    let line = text.lines().next()?.trim_start_matches(';').trim();
    let dotted = line.strip_prefix("FBX")?.split_whitespace().next()?;
    let mut parts = dotted.split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some(major * 1000 + minor * 100 + patch * 10)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Key(String),
    Str(String),
    Number(String),
    Word(String),
    Count(usize),
    Comma,
    Open,
    Close,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' => {
                while let Some((_, c)) = chars.next() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' => {
                chars.next();
                tokens.push(Token::Open);
            }
            '}' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(error(format!("unterminated string at byte {}", start)));
                }
                tokens.push(Token::Str(value));
            }
            '*' => {
                chars.next();
                let mut digits = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    digits.push(c);
                    chars.next();
                }
                let count = digits
                    .parse()
                    .map_err(|_| error(format!("bad array length at byte {}", start)))?;
                tokens.push(Token::Count(count));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut number = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')) {
                        break;
                    }
                    number.push(c);
                    chars.next();
                }
                tokens.push(Token::Number(number));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || matches!(c, ':' | ',' | '{' | '}' | '"' | ';') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                if chars.peek().map(|&(_, c)| c) == Some(':') {
                    chars.next();
                    tokens.push(Token::Key(word));
                } else if word.is_empty() {
                    return Err(error(format!("unexpected {:?} at byte {}", c, start)));
                } else {
                    tokens.push(Token::Word(word));
                }
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn nodes(&mut self, depth: usize) -> Result<Vec<Node>> {
        if depth > MAX_DEPTH {
            return Err(error("nodes are nested too deeply"));
        }
        let mut nodes = Vec::new();
        loop {
            match self.next() {
                None if depth == 0 => return Ok(nodes),
                None => return Err(error("unexpected end of file inside a block")),
                Some(Token::Close) if depth > 0 => return Ok(nodes),
                Some(Token::Key(name)) => nodes.push(self.node(name, depth)?),
                Some(other) => return Err(error(format!("unexpected {:?}", other))),
            }
        }
    }

    fn node(&mut self, name: String, depth: usize) -> Result<Node> {
        let mut node = Node::new(name);
        let mut array_len = None;

        loop {
            let property = match self.peek() {
                Some(Token::Str(s)) | Some(Token::Word(s)) => Property::String(s.clone()),
                Some(Token::Number(n)) => parse_number(n)?,
                Some(Token::Count(n)) => {
                    array_len = Some(*n);
                    self.pos += 1;
                    break;
                }
                _ => break,
            };
            self.pos += 1;
            node.properties.push(property);
            if self.peek() == Some(&Token::Comma) {
                self.pos += 1;
            } else {
                break;
            }
        }

        if self.peek() == Some(&Token::Open) {
            self.pos += 1;
            let children = self.nodes(depth + 1)?;
            match array_len {
                Some(expected) => {
                    let values = children
                        .iter()
                        .find(|c| c.name == "a")
                        .map(|a| a.properties.as_slice())
                        .unwrap_or(&[]);
                    if values.len() != expected {
                        return Err(error(format!(
                            "{} declares {} values but holds {}",
                            node.name,
                            expected,
                            values.len()
                        )));
                    }
                    node.properties.push(array_property(values));
                }
                None => node.children = children,
            }
        }
        Ok(node)
    }
}

fn parse_number(text: &str) -> Result<Property> {
    let is_float = text.contains(['.', 'e', 'E']);
    if !is_float {
        if let Ok(v) = text.parse::<i64>() {
            return Ok(Property::I64(v));
        }
    }
    text.parse::<f64>()
        .map(Property::F64)
        .map_err(|_| error(format!("bad number {:?}", text)))
}

/// Collapse scalar values into one typed array.
fn array_property(values: &[Property]) -> Property {
    if values.iter().all(|v| matches!(v, Property::I64(_))) {
        Property::I64Array(values.iter().filter_map(Property::as_i64).collect())
    } else {
        Property::F64Array(values.iter().filter_map(Property::as_f64).collect())
    }
}
