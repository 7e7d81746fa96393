//! Placeholder resolution
//!
//! Raw property values may embed `${name}` or `${name:default}`
//! references to other properties. Templates are tokenized once in a
//! single pass and cached; resolution walks the token list, looking
//! names up against a source list and recursing into resolved values so
//! chains like `a=${b}`, `b=${c}` settle. A depth cap turns circular
//! chains into an error instead of a hang.

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use crate::convert::render;
use crate::error::BindError;
use crate::name::PropName;
use crate::source::PropertySource;

/// Longest placeholder chain followed before assuming a cycle
const MAX_CHAIN_DEPTH: usize = 8;

/// Resolves placeholder references inside raw property values
pub trait PlaceholderResolver: Send + Sync {
    fn resolve(&self, value: Value) -> Result<Value, BindError>;
}

/// Leaves values untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpResolver;

impl PlaceholderResolver for NoOpResolver {
    fn resolve(&self, value: Value) -> Result<Value, BindError> {
        Ok(value)
    }
}

/// Parsed template fragment
#[derive(Debug, Clone)]
enum Token {
    /// Literal text (range into the original string)
    Literal(Range<usize>),
    /// `${name}` or `${name:default}`
    Placeholder {
        name: String,
        default: Option<String>,
    },
}

/// Resolves `${...}` references against a fixed source list
///
/// Unresolvable references without a default are left verbatim in the
/// output, matching the behavior callers expect from partially
/// populated environments.
pub struct SourcePlaceholderResolver {
    sources: Vec<Arc<dyn PropertySource>>,
    cache: DashMap<String, Arc<Vec<Token>>>,
}

impl SourcePlaceholderResolver {
    pub fn new(sources: Vec<Arc<dyn PropertySource>>) -> Self {
        Self {
            sources,
            cache: DashMap::new(),
        }
    }

    /// Parse a template into tokens (with caching)
    fn tokenize(&self, template: &str) -> Arc<Vec<Token>> {
        if let Some(cached) = self.cache.get(template) {
            return Arc::clone(&cached);
        }

        let mut tokens = Vec::new();
        let mut literal_start = 0;
        let mut rest = template;
        let mut offset = 0;

        while let Some(open) = rest.find("${") {
            let open = offset + open;
            match template[open + 2..].find('}') {
                Some(close) => {
                    let close = open + 2 + close;
                    if open > literal_start {
                        tokens.push(Token::Literal(literal_start..open));
                    }
                    let content = &template[open + 2..close];
                    let (name, default) = match content.split_once(':') {
                        Some((name, default)) => (name, Some(default.to_string())),
                        None => (content, None),
                    };
                    tokens.push(Token::Placeholder {
                        name: name.to_string(),
                        default,
                    });
                    literal_start = close + 1;
                    offset = close + 1;
                }
                // unterminated reference, treat the rest as literal
                None => break,
            }
            rest = &template[offset..];
        }
        if literal_start < template.len() {
            tokens.push(Token::Literal(literal_start..template.len()));
        }

        let tokens = Arc::new(tokens);
        self.cache.insert(template.to_string(), Arc::clone(&tokens));
        tokens
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        let parsed = PropName::parse(name).ok()?;
        for source in &self.sources {
            if let Some(property) = source.property(&parsed) {
                return Some(property.value);
            }
        }
        None
    }

    fn resolve_value(&self, value: Value, depth: usize) -> Result<Value, BindError> {
        match value {
            Value::String(s) => self.resolve_string(&s, depth),
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.resolve_value(item, depth))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, self.resolve_value(v, depth)?)))
                .collect::<Result<serde_json::Map<_, _>, BindError>>()
                .map(Value::Object),
            other => Ok(other),
        }
    }

    fn resolve_string(&self, template: &str, depth: usize) -> Result<Value, BindError> {
        if depth > MAX_CHAIN_DEPTH {
            return Err(BindError::Conversion {
                value: template.to_string(),
                to: "string".to_string(),
                reason: format!(
                    "placeholder chain exceeds {} levels (circular reference?)",
                    MAX_CHAIN_DEPTH
                ),
            });
        }
        let tokens = self.tokenize(template);

        // A template that is exactly one placeholder keeps the resolved
        // value's type instead of flattening it to a string.
        if let [Token::Placeholder { name, default }] = tokens.as_slice() {
            return match self.lookup(name) {
                Some(found) => self.resolve_value(found, depth + 1),
                None => match default {
                    Some(default) => self.resolve_string(default, depth + 1),
                    None => {
                        trace!(placeholder = %name, "unresolvable placeholder left verbatim");
                        Ok(Value::String(template.to_string()))
                    }
                },
            };
        }

        let mut result = String::with_capacity(template.len() * 2);
        for token in tokens.iter() {
            match token {
                Token::Literal(range) => result.push_str(&template[range.clone()]),
                Token::Placeholder { name, default } => match self.lookup(name) {
                    Some(found) => {
                        let resolved = self.resolve_value(found, depth + 1)?;
                        result.push_str(&render(&resolved));
                    }
                    None => match default {
                        Some(default) => {
                            let resolved = self.resolve_string(default, depth + 1)?;
                            result.push_str(&render(&resolved));
                        }
                        None => {
                            trace!(placeholder = %name, "unresolvable placeholder left verbatim");
                            result.push_str(&format!("${{{}}}", name));
                        }
                    },
                },
            }
        }
        Ok(Value::String(result))
    }
}

impl PlaceholderResolver for SourcePlaceholderResolver {
    fn resolve(&self, value: Value) -> Result<Value, BindError> {
        self.resolve_value(value, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MapSource;
    use serde_json::json;

    fn resolver(pairs: &[(&str, Value)]) -> SourcePlaceholderResolver {
        let mut source = MapSource::new("test");
        for (key, value) in pairs {
            source.insert(key, value.clone()).unwrap();
        }
        SourcePlaceholderResolver::new(vec![Arc::new(source)])
    }

    #[test]
    fn literal_untouched() {
        let r = resolver(&[]);
        assert_eq!(r.resolve(json!("plain")).unwrap(), json!("plain"));
        assert_eq!(r.resolve(json!(42)).unwrap(), json!(42));
    }

    #[test]
    fn substitutes_into_larger_string() {
        let r = resolver(&[("host", json!("example.org")), ("port", json!(8080))]);
        assert_eq!(
            r.resolve(json!("http://${host}:${port}/")).unwrap(),
            json!("http://example.org:8080/")
        );
    }

    #[test]
    fn whole_value_placeholder_keeps_type() {
        let r = resolver(&[("port", json!(8080))]);
        assert_eq!(r.resolve(json!("${port}")).unwrap(), json!(8080));
    }

    #[test]
    fn chain_resolves() {
        let r = resolver(&[
            ("a", json!("${b}")),
            ("b", json!("${c}")),
            ("c", json!("v")),
        ]);
        assert_eq!(r.resolve(json!("${a}")).unwrap(), json!("v"));
    }

    #[test]
    fn circular_chain_errors() {
        let r = resolver(&[("a", json!("${b}")), ("b", json!("${a}"))]);
        let err = r.resolve(json!("${a}")).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn default_used_when_missing() {
        let r = resolver(&[]);
        assert_eq!(r.resolve(json!("${missing:fallback}")).unwrap(), json!("fallback"));
    }

    #[test]
    fn missing_without_default_left_verbatim() {
        let r = resolver(&[]);
        assert_eq!(r.resolve(json!("${missing}")).unwrap(), json!("${missing}"));
        assert_eq!(r.resolve(json!("x ${missing} y")).unwrap(), json!("x ${missing} y"));
    }

    #[test]
    fn resolves_inside_containers() {
        let r = resolver(&[("host", json!("h"))]);
        assert_eq!(
            r.resolve(json!({"url": "${host}", "list": ["${host}"]})).unwrap(),
            json!({"url": "h", "list": ["h"]})
        );
    }

    #[test]
    fn tokenized_templates_are_cached() {
        let r = resolver(&[("host", json!("h"))]);
        let template = "a ${host} b";
        let first = r.tokenize(template);
        let second = r.tokenize(template);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unterminated_reference_is_literal() {
        let r = resolver(&[]);
        assert_eq!(r.resolve(json!("oops ${half")).unwrap(), json!("oops ${half"));
    }
}
