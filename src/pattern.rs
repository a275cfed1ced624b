//! Path patterns.
//!
//! A pattern is a `/`-separated list of segments, each either a literal or a
//! `{name}` variable that spans the whole segment:
//!
//! ```text
//! /users/{id}/posts/{postId}
//! ```
//!
//! Literals match byte-for-byte; a variable matches any single non-empty
//! segment. A single trailing slash is ignored on both patterns and request
//! paths, so `/users/` and `/users` are the same route.

use std::collections::HashMap;
use std::fmt;

use crate::error::RegistrationError;

/// One segment of a [`PathPattern`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

impl Segment {
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }
}

/// A parsed route path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, RegistrationError> {
        let invalid = |reason: &str| RegistrationError::InvalidPattern {
            pattern: raw.to_owned(),
            reason: reason.to_owned(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with `/`"));
        }

        let mut segments = Vec::new();
        for part in split_path(raw) {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            let segment = match part.strip_prefix('{') {
                Some(rest) => {
                    let name = rest
                        .strip_suffix('}')
                        .ok_or_else(|| invalid("variable must span a whole segment"))?;
                    if name.is_empty() {
                        return Err(invalid("variable name is empty"));
                    }
                    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(invalid("variable names may only contain letters, digits and `_`"));
                    }
                    if segments.iter().any(|s| matches!(s, Segment::Variable(v) if v == name)) {
                        return Err(invalid("variable declared twice"));
                    }
                    Segment::Variable(name.to_owned())
                }
                None if part.contains(['{', '}']) => {
                    return Err(invalid("variable must span a whole segment"));
                }
                None => Segment::Literal(part.to_owned()),
            };
            segments.push(segment);
        }

        Ok(Self { raw: raw.to_owned(), segments })
    }

    pub fn as_str(&self) -> &str { &self.raw }
    pub fn segments(&self) -> &[Segment] { &self.segments }
    pub fn len(&self) -> usize { self.segments.len() }
    pub fn is_empty(&self) -> bool { self.segments.is_empty() }

    /// Variable names in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables().any(|v| v == name)
    }

    /// The literal at position 0, if the pattern starts with one.
    pub(crate) fn first_literal(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Literal(l)) => Some(l),
            _ => None,
        }
    }

    /// Same literals in the same positions and variables in the same
    /// positions, whatever the variables are called.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Variable(_), Segment::Variable(_)) => true,
                _ => false,
            })
    }

    /// Per-segment "is a variable" flags. Comparing these lexicographically
    /// orders patterns most-specific-first: the first position where two
    /// patterns differ decides, and a literal there beats a variable.
    pub(crate) fn specificity_key(&self) -> Vec<bool> {
        self.segments.iter().map(Segment::is_variable).collect()
    }

    /// Matches already-split request segments, binding variables by name.
    pub fn capture(&self, parts: &[&str]) -> Option<HashMap<String, String>> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Variable(name) if !part.is_empty() => {
                    params.insert(name.clone(), (*part).to_owned());
                }
                _ => return None,
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits a path into segments, dropping the leading slash and one trailing
/// slash. The root path has no segments.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Joins a prefix and a route path with exactly one slash between them.
/// A root path under a prefix is the prefix itself.
pub(crate) fn join(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.to_owned();
    }
    match path {
        "" | "/" => prefix.to_owned(),
        p if p.starts_with('/') => format!("{prefix}{p}"),
        p => format!("{prefix}/{p}"),
    }
}
