//! Hierarchical property names
//!
//! A [`PropName`] is a parsed sequence of key and index segments, written
//! in dotted form with bracketed indices: `server.hosts[0].port`. Names
//! are canonicalized to lowercase on parse. A purely numeric dotted
//! segment is treated as an index, so `hosts.0.port` and `hosts[0].port`
//! are the same name.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BindError;

/// Keys are lowercase alphanumerics plus `-` and `_`, starting with an
/// alphanumeric.
static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-z0-9][a-z0-9_-]*$").expect("hardcoded pattern is valid"));

/// One element of a hierarchical name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object field access: `.key`
    Key(String),
    /// Indexed access: `[0]`
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{}", k),
            Segment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A hierarchical configuration property name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropName {
    segments: Vec<Segment>,
}

impl PropName {
    /// The empty (root) name
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a dotted name like `server.hosts[0].port`
    ///
    /// The empty string parses to the root name.
    pub fn parse(text: &str) -> Result<Self, BindError> {
        if text.is_empty() {
            return Ok(Self::empty());
        }
        let mut segments = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(invalid(text, "empty segment"));
            }
            parse_part(part, text, &mut segments)?;
        }
        Ok(Self { segments })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Append a key segment, producing a child name
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_ascii_lowercase()));
        Self { segments }
    }

    /// Append an index segment, producing an indexed child name
    pub fn index_child(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// Whether `self` is a strict prefix of `other`
    pub fn is_ancestor_of(&self, other: &PropName) -> bool {
        self.len() < other.len() && other.segments[..self.len()] == self.segments[..]
    }

    /// Whether `other` is exactly one segment below `self`
    pub fn is_parent_of(&self, other: &PropName) -> bool {
        other.len() == self.len() + 1 && self.is_ancestor_of(other)
    }

    /// Truncate `self` to the direct child of `ancestor` it descends
    /// through, or `None` if `ancestor` is not an ancestor.
    ///
    /// `a.b.c.child_in(a)` is `a.b`.
    pub fn child_in(&self, ancestor: &PropName) -> Option<PropName> {
        if !ancestor.is_ancestor_of(self) {
            return None;
        }
        Some(PropName {
            segments: self.segments[..ancestor.len() + 1].to_vec(),
        })
    }
}

fn parse_part(part: &str, full: &str, segments: &mut Vec<Segment>) -> Result<(), BindError> {
    let (head, mut rest) = match part.find('[') {
        Some(pos) => part.split_at(pos),
        None => (part, ""),
    };
    if !head.is_empty() {
        let key = head.to_ascii_lowercase();
        if let Ok(index) = key.parse::<usize>() {
            segments.push(Segment::Index(index));
        } else if KEY_PATTERN.is_match(&key) {
            segments.push(Segment::Key(key));
        } else {
            return Err(invalid(full, "keys must be lowercase alphanumerics, '-' or '_'"));
        }
    } else if rest.is_empty() {
        return Err(invalid(full, "empty segment"));
    }
    while !rest.is_empty() {
        let Some(close) = rest.find(']') else {
            return Err(invalid(full, "unclosed '['"));
        };
        let index: usize = rest[1..close]
            .parse()
            .map_err(|_| invalid(full, "index must be an unsigned integer"))?;
        segments.push(Segment::Index(index));
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(invalid(full, "unexpected text after ']'"));
        }
    }
    Ok(())
}

fn invalid(name: &str, reason: &str) -> BindError {
    BindError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for PropName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, Segment::Key(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for PropName {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_name() {
        let name = PropName::parse("server.port").unwrap();
        assert_eq!(
            name.segments(),
            &[
                Segment::Key("server".to_string()),
                Segment::Key("port".to_string()),
            ]
        );
    }

    #[test]
    fn parse_with_index() {
        let name = PropName::parse("server.hosts[0].port").unwrap();
        assert_eq!(
            name.segments(),
            &[
                Segment::Key("server".to_string()),
                Segment::Key("hosts".to_string()),
                Segment::Index(0),
                Segment::Key("port".to_string()),
            ]
        );
    }

    #[test]
    fn numeric_dotted_segment_is_an_index() {
        assert_eq!(
            PropName::parse("hosts.0.port").unwrap(),
            PropName::parse("hosts[0].port").unwrap()
        );
    }

    #[test]
    fn parse_canonicalizes_to_lowercase() {
        assert_eq!(
            PropName::parse("Server.Port").unwrap(),
            PropName::parse("server.port").unwrap()
        );
    }

    #[test]
    fn empty_string_is_root() {
        let name = PropName::parse("").unwrap();
        assert!(name.is_empty());
    }

    #[test]
    fn rejects_bad_segments() {
        assert!(PropName::parse("a..b").is_err());
        assert!(PropName::parse("a.").is_err());
        assert!(PropName::parse("a[b]").is_err());
        assert!(PropName::parse("a[0").is_err());
        assert!(PropName::parse("white space").is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in ["server.port", "server.hosts[0].port", "list[0][1]", ""] {
            let name = PropName::parse(text).unwrap();
            assert_eq!(name.to_string(), text);
            assert_eq!(PropName::parse(&name.to_string()).unwrap(), name);
        }
    }

    #[test]
    fn child_and_index_child_append() {
        let name = PropName::parse("server").unwrap();
        assert_eq!(name.child("port").to_string(), "server.port");
        assert_eq!(name.index_child(2).to_string(), "server[2]");
    }

    #[test]
    fn ancestry() {
        let root = PropName::empty();
        let server = PropName::parse("server").unwrap();
        let port = PropName::parse("server.port").unwrap();

        assert!(root.is_ancestor_of(&server));
        assert!(server.is_ancestor_of(&port));
        assert!(server.is_parent_of(&port));
        assert!(!root.is_parent_of(&port));
        assert!(!port.is_ancestor_of(&server));
        assert!(!server.is_ancestor_of(&server));
    }

    #[test]
    fn child_in_truncates_to_direct_child() {
        let deep = PropName::parse("a.b.c").unwrap();
        let a = PropName::parse("a").unwrap();
        assert_eq!(deep.child_in(&a), Some(PropName::parse("a.b").unwrap()));
        assert_eq!(
            deep.child_in(&PropName::empty()),
            Some(PropName::parse("a").unwrap())
        );
        assert_eq!(deep.child_in(&PropName::parse("x").unwrap()), None);
    }
}
