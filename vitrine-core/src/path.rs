//! Key path parsing.
//!
//! A flat key such as `treatments[0].details` is split on `.` into segments.
//! Each segment is either a plain field name or a field followed by a single
//! trailing `[<digits>]` array index. Parsing never fails: anything that does
//! not match the indexed form is taken literally as a field name.

use once_cell::sync::Lazy;
use regex::Regex;

static INDEXED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)\[(\d+)\]$").expect("Invalid indexed segment regex"));

/// One step of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// `name`
    Field { name: String },
    /// `name[index]`
    Index { name: String, index: usize },
}

impl Segment {
    pub fn field(name: impl Into<String>) -> Self {
        Segment::Field { name: name.into() }
    }

    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Segment::Index {
            name: name.into(),
            index,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Segment::Field { name } | Segment::Index { name, .. } => name,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Segment::Field { .. } => None,
            Segment::Index { index, .. } => Some(*index),
        }
    }
}

/// Parse a single segment (the text between two dots).
///
/// Digits that overflow `usize` fall back to a literal field, like any other
/// malformed bracket.
pub fn parse_segment(raw: &str) -> Segment {
    INDEXED_SEGMENT
        .captures(raw)
        .and_then(|caps| {
            let name = caps.get(1)?.as_str();
            let index = caps.get(2)?.as_str().parse::<usize>().ok()?;
            Some(Segment::indexed(name, index))
        })
        .unwrap_or_else(|| Segment::field(raw))
}

/// Parse a full dotted key. The empty key yields an empty path.
pub fn parse_key(key: &str) -> Vec<Segment> {
    if key.is_empty() {
        return Vec::new();
    }
    key.split('.').map(parse_segment).collect()
}

/// Render a path back to its flat key form.
pub fn render_key(path: &[Segment]) -> String {
    path.iter()
        .map(|segment| match segment {
            Segment::Field { name } => name.clone(),
            Segment::Index { name, index } => format!("{}[{}]", name, index),
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_field() {
        assert_eq!(parse_segment("details"), Segment::field("details"));
    }

    #[test]
    fn test_indexed_field() {
        assert_eq!(parse_segment("treatments[12]"), Segment::indexed("treatments", 12));
    }

    #[test]
    fn test_malformed_brackets_are_literal() {
        assert_eq!(parse_segment("items[x]"), Segment::field("items[x]"));
        assert_eq!(parse_segment("items[3"), Segment::field("items[3"));
        assert_eq!(parse_segment("items[-1]"), Segment::field("items[-1]"));
        assert_eq!(parse_segment("items[]"), Segment::field("items[]"));
        assert_eq!(
            parse_segment("items[99999999999999999999999]"),
            Segment::field("items[99999999999999999999999]")
        );
    }

    #[test]
    fn test_only_trailing_bracket_is_an_index() {
        assert_eq!(parse_segment("grid[0][1]"), Segment::indexed("grid[0]", 1));
        assert_eq!(parse_segment("a[1]b"), Segment::field("a[1]b"));
    }

    #[test]
    fn test_bare_index_has_empty_name() {
        assert_eq!(parse_segment("[2]"), Segment::indexed("", 2));
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(
            parse_key("tratamentos.treatments[0].details"),
            vec![
                Segment::field("tratamentos"),
                Segment::indexed("treatments", 0),
                Segment::field("details"),
            ]
        );
        assert!(parse_key("").is_empty());
    }

    #[test]
    fn test_render_key_inverts_parse() {
        let key = "hero.cards[3].cta.label";
        assert_eq!(render_key(&parse_key(key)), key);
    }
}
