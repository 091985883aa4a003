//! Minimal JSON path expressions for locating a token in a response body.
//!
//! Supported: `$`, `.name`, `['name']`, `["name"]` and `[index]`, e.g.
//! `$.data.tokens[0].value`. A bare `access_token` is read as `$.access_token`.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(expr: &str) -> Result<Self, String> {
        let expr = expr.trim();
        let rest = match expr.strip_prefix('$') {
            Some(rest) => rest,
            None => return Self::parse(&format!("$.{expr}")),
        };

        let mut segments = Vec::new();
        let mut chars = rest.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next == '.' || next == '[' {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if name.is_empty() {
                        return Err(format!("empty field name in '{expr}'"));
                    }
                    segments.push(Segment::Field(name));
                }
                '[' => {
                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(c) => inner.push(c),
                            None => return Err(format!("unclosed '[' in '{expr}'")),
                        }
                    }
                    let inner = inner.trim();
                    let quoted = inner
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
                    match quoted {
                        Some(name) => segments.push(Segment::Field(name.to_string())),
                        None => {
                            let index = inner
                                .parse()
                                .map_err(|_| format!("invalid index '{inner}' in '{expr}'"))?;
                            segments.push(Segment::Index(index));
                        }
                    }
                }
                other => return Err(format!("unexpected '{other}' in '{expr}'")),
            }
        }
        Ok(Self { segments })
    }

    pub fn select<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments.iter().try_fold(root, |value, segment| match segment {
            Segment::Field(name) => value.get(name.as_str()),
            Segment::Index(index) => value.get(*index),
        })
    }
}
