//! Property sources
//!
//! A [`PropertySource`] answers exact-name lookups and descendant
//! presence queries over hierarchical property names. Sources are
//! queried in caller-given order; the binder never merges or reorders
//! them.

use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;

use crate::error::BindError;
use crate::name::PropName;

/// Answer to a descendant-presence query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descendants {
    /// At least one descendant of the name is present
    Present,
    /// No descendant of the name is present
    Absent,
    /// The source cannot tell (treated as "maybe present")
    Unknown,
}

/// A resolved property: name, raw value and the origin it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigProperty {
    pub name: PropName,
    pub value: Value,
    pub origin: String,
}

impl fmt::Display for ConfigProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.name, self.origin)
    }
}

/// A queryable provider of hierarchical properties
pub trait PropertySource: Send + Sync {
    /// Human-readable origin label, carried into bound properties and
    /// error diagnostics.
    fn origin(&self) -> &str;

    /// The property exactly matching `name`, if present
    fn property(&self, name: &PropName) -> Option<ConfigProperty>;

    /// Whether any strict descendant of `name` is present
    fn descendants_of(&self, name: &PropName) -> Descendants;

    /// All present names, in source order. Aggregate binders use this to
    /// discover candidate children.
    fn names(&self) -> Vec<PropName>;
}

/// In-memory source over ordered `dotted-key -> value` pairs
///
/// Insertion order is preserved and drives first-seen key order during
/// map binding.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    origin: String,
    order: Vec<PropName>,
    values: FxHashMap<PropName, Value>,
}

impl MapSource {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            order: Vec::new(),
            values: FxHashMap::default(),
        }
    }

    /// Insert a property under a dotted name. Re-inserting an existing
    /// name replaces its value but keeps its original position.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Result<(), BindError> {
        let name = PropName::parse(key)?;
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value.into());
        Ok(())
    }

    /// Chainable [`insert`](Self::insert)
    pub fn try_with(mut self, key: &str, value: impl Into<Value>) -> Result<Self, BindError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

impl PropertySource for MapSource {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn property(&self, name: &PropName) -> Option<ConfigProperty> {
        self.values.get(name).map(|value| ConfigProperty {
            name: name.clone(),
            value: value.clone(),
            origin: self.origin.clone(),
        })
    }

    fn descendants_of(&self, name: &PropName) -> Descendants {
        if self.order.iter().any(|key| name.is_ancestor_of(key)) {
            Descendants::Present
        } else {
            Descendants::Absent
        }
    }

    fn names(&self) -> Vec<PropName> {
        self.order.clone()
    }
}

/// Snapshot of process environment variables under a prefix
///
/// Variable names are relaxed into property names: the prefix is
/// stripped, the rest lowercased and underscores become dots, so with
/// prefix `APP_` the variable `APP_SERVER_PORT` exposes `server.port`.
/// Numeric segments become indices (`APP_HOSTS_0` exposes `hosts[0]`).
/// Variables that do not relax to a valid name are skipped.
#[derive(Debug, Clone)]
pub struct EnvSource {
    inner: MapSource,
}

impl EnvSource {
    /// Snapshot the current process environment
    pub fn with_prefix(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Build from an explicit variable list (used by tests)
    pub fn from_vars(
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut inner = MapSource::new(format!("env:{}", prefix));
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            let dotted = rest.to_ascii_lowercase().replace('_', ".");
            match inner.insert(&dotted, value) {
                Ok(()) => {}
                Err(_) => trace!(var = %key, "skipping environment variable with unrelaxable name"),
            }
        }
        Self { inner }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl PropertySource for EnvSource {
    fn origin(&self) -> &str {
        self.inner.origin()
    }

    fn property(&self, name: &PropName) -> Option<ConfigProperty> {
        self.inner.property(name)
    }

    fn descendants_of(&self, name: &PropName) -> Descendants {
        self.inner.descendants_of(name)
    }

    fn names(&self) -> Vec<PropName> {
        self.inner.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name(text: &str) -> PropName {
        PropName::parse(text).unwrap()
    }

    #[test]
    fn insert_and_lookup() {
        let source = MapSource::new("test")
            .try_with("server.port", 8080)
            .unwrap();

        let property = source.property(&name("server.port")).unwrap();
        assert_eq!(property.value, json!(8080));
        assert_eq!(property.origin, "test");
        assert!(source.property(&name("server.host")).is_none());
    }

    #[test]
    fn reinsert_keeps_position() {
        let source = MapSource::new("test")
            .try_with("a", 1)
            .unwrap()
            .try_with("b", 2)
            .unwrap()
            .try_with("a", 3)
            .unwrap();

        assert_eq!(source.names(), vec![name("a"), name("b")]);
        assert_eq!(source.property(&name("a")).unwrap().value, json!(3));
    }

    #[test]
    fn descendants_query() {
        let source = MapSource::new("test")
            .try_with("server.port", 8080)
            .unwrap();

        assert_eq!(source.descendants_of(&name("server")), Descendants::Present);
        assert_eq!(source.descendants_of(&PropName::empty()), Descendants::Present);
        // exact match is not a descendant
        assert_eq!(
            source.descendants_of(&name("server.port")),
            Descendants::Absent
        );
        assert_eq!(source.descendants_of(&name("client")), Descendants::Absent);
    }

    #[test]
    fn env_source_relaxes_names() {
        let source = EnvSource::from_vars(
            "APP_",
            vec![
                ("APP_SERVER_PORT".to_string(), "8080".to_string()),
                ("APP_HOSTS_0".to_string(), "alpha".to_string()),
                ("OTHER_THING".to_string(), "ignored".to_string()),
            ],
        );

        assert_eq!(
            source.property(&name("server.port")).unwrap().value,
            json!("8080")
        );
        assert_eq!(
            source.property(&name("hosts[0]")).unwrap().value,
            json!("alpha")
        );
        assert!(source.property(&name("other.thing")).is_none());
    }

    #[test]
    fn env_source_skips_unrelaxable_names() {
        let source = EnvSource::from_vars(
            "APP_",
            vec![("APP__DOUBLE".to_string(), "x".to_string())],
        );
        assert!(source.is_empty());
    }
}
