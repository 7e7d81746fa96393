//! Per-invocation binding state
//!
//! A [`BindContext`] is created fresh for every top-level bind call and
//! threaded exclusively through that call's recursion. All scoped state
//! (depth, source overrides, the two type stacks) is acquired and
//! released around closures so it stays balanced on every exit path,
//! including errors.

use std::sync::Arc;

use crate::source::{ConfigProperty, PropertySource};

/// Mutable state carried through one recursive bind invocation tree
#[derive(Default)]
pub struct BindContext {
    depth: usize,
    source_overrides: Vec<Arc<dyn PropertySource>>,
    object_bindings: Vec<String>,
    constructor_bindings: Vec<String>,
    last_property: Option<ConfigProperty>,
}

impl BindContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current recursion depth. Depth 0 tolerates "no property and no
    /// descendant" as plain not-found; deeper levels prune such
    /// branches without error.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The last directly-matched property, kept for error diagnostics
    pub fn last_property(&self) -> Option<&ConfigProperty> {
        self.last_property.as_ref()
    }

    pub(crate) fn set_last_property(&mut self, property: ConfigProperty) {
        self.last_property = Some(property);
    }

    /// Whether `type_name` is currently being object-bound somewhere up
    /// the stack (the cycle guard)
    pub fn is_binding_object(&self, type_name: &str) -> bool {
        self.object_bindings.iter().any(|t| t == type_name)
    }

    /// Whether a constructor-style binding is active anywhere up the
    /// stack. Conversion and introspection collaborators use this to
    /// decide whether nested constructor binding is permitted.
    pub fn in_constructor_binding(&self) -> bool {
        !self.constructor_bindings.is_empty()
    }

    /// The innermost active source override, if any
    pub(crate) fn source_override(&self) -> Option<&Arc<dyn PropertySource>> {
        self.source_overrides.last()
    }

    /// Run `body` with lookups scoped to `source`. A `None` source runs
    /// `body` unscoped. Overrides nest: the innermost wins, and each is
    /// popped when its body returns, errors included.
    pub(crate) fn with_source<R>(
        &mut self,
        source: Option<Arc<dyn PropertySource>>,
        body: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let Some(source) = source else {
            return body(self);
        };
        self.source_overrides.push(source);
        let result = body(self);
        self.source_overrides.pop();
        result
    }

    pub(crate) fn with_increased_depth<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    /// Run `body` with `type_name` marked as under object construction,
    /// at increased depth
    pub(crate) fn with_object_binding<R>(
        &mut self,
        type_name: &str,
        body: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.object_bindings.push(type_name.to_string());
        let result = self.with_increased_depth(body);
        self.object_bindings.pop();
        result
    }

    /// Run `body` with `type_name` marked as under constructor-style
    /// binding
    pub(crate) fn with_constructor_binding<R>(
        &mut self,
        type_name: &str,
        body: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.constructor_bindings.push(type_name.to_string());
        let result = body(self);
        self.constructor_bindings.pop();
        result
    }
}
