use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use crate::node::SchemaNode;
use crate::{Reference, RefsplitError};

/// A generation root: a path expression selecting a collection of schemas.
///
/// Segments are separated by `.`; a bracket segment holds a quoted key or an
/// array index: `components.schemas`, `components["my.schemas"]`, `items[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootPath {
    raw: String,
    segments: Vec<String>,
}

impl RootPath {
    /// Parses a root path expression.
    ///
    /// # Errors
    ///
    /// - [`RefsplitError::AbsoluteRootPath`] for absolute paths,
    /// - [`RefsplitError::InvalidRootPath`] for malformed expressions.
    pub fn parse(raw: &str) -> Result<Self, RefsplitError> {
        if is_absolute(raw) {
            return Err(RefsplitError::AbsoluteRootPath {
                root: raw.to_string(),
            });
        }
        let invalid = |reason: &str| RefsplitError::InvalidRootPath {
            root: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.trim().is_empty() {
            return Err(invalid("empty path"));
        }

        let mut segments = Vec::new();
        let mut rest = raw;
        loop {
            if let Some(bracket) = rest.strip_prefix('[') {
                let (segment, tail) = parse_bracket(bracket).map_err(invalid)?;
                segments.push(segment);
                rest = tail;
            } else {
                let end = rest.find(['.', '[', ']']).unwrap_or(rest.len());
                let (key, tail) = rest.split_at(end);
                if key.is_empty() {
                    return Err(invalid("empty segment"));
                }
                segments.push(key.to_string());
                rest = tail;
            }

            if rest.is_empty() {
                break;
            }
            if let Some(tail) = rest.strip_prefix('.') {
                if tail.is_empty() || tail.starts_with('[') {
                    return Err(invalid("empty segment"));
                }
                rest = tail;
            } else if !rest.starts_with('[') {
                return Err(invalid("unexpected character after a segment"));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The decoded segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The reference of the child `key` of this root.
    #[must_use]
    pub fn child_reference(&self, key: &str) -> Reference {
        Reference::from_segments(
            self.segments
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(key)),
        )
    }

    /// Walks `document` down to the node selected by this root.
    ///
    /// Objects are walked by key, arrays by index, link markers are followed.
    ///
    /// # Errors
    ///
    /// Returns [`RefsplitError::RootNotFound`] naming the first missing segment.
    pub fn resolve<'a>(&self, document: &'a SchemaNode) -> Result<&'a SchemaNode, RefsplitError> {
        let mut current = document;
        for segment in &self.segments {
            let next = match current.resolved() {
                Some(SchemaNode::Object(entries)) => entries.get(segment),
                Some(SchemaNode::Array(items)) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            };
            current = next.ok_or_else(|| RefsplitError::RootNotFound {
                root: self.raw.clone(),
                segment: segment.clone(),
            })?;
        }
        Ok(current)
    }
}

impl FromStr for RootPath {
    type Err = RefsplitError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl Display for RootPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_absolute(raw: &str) -> bool {
    let mut chars = raw.chars();
    let has_drive = matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    );
    raw.starts_with(['/', '\\']) || has_drive || Path::new(raw).is_absolute()
}

/// Parses the inside of a bracket segment, returning the key and the remaining input.
fn parse_bracket(input: &str) -> Result<(String, &str), &'static str> {
    let Some(quote) = input.chars().next().filter(|ch| matches!(ch, '"' | '\'')) else {
        let (index, tail) = input.split_once(']').ok_or("unterminated bracket")?;
        if index.is_empty() {
            return Err("empty segment");
        }
        if !index.chars().all(|ch| ch.is_ascii_digit()) {
            return Err("bracket segments must be quoted keys or array indices");
        }
        return Ok((index.to_string(), tail));
    };

    let quoted = input.get(quote.len_utf8()..).unwrap_or_default();
    let (key, tail) = quoted.split_once(quote).ok_or("unterminated quoted key")?;
    let tail = tail.strip_prefix(']').ok_or("unterminated bracket")?;
    if key.is_empty() {
        return Err("empty segment");
    }
    Ok((key.to_string(), tail))
}
