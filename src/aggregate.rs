//! Aggregate binders (map, list, array)
//!
//! Containers bind element-by-element: the map binder discovers direct
//! children of the aggregate name across the active sources, the
//! list/array binders walk consecutive indexed children. Every element
//! is bound through a fresh recursive bind scoped to the source it was
//! discovered in, so one aggregate entry never mixes values from two
//! sources.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use tracing::trace;

use crate::binder::Binder;
use crate::context::BindContext;
use crate::error::BindError;
use crate::handler::BindHandler;
use crate::name::{PropName, Segment};
use crate::source::{Descendants, PropertySource};
use crate::target::{Bindable, TypeDesc};

/// The closed set of aggregate kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AggregateBinder {
    Map,
    List,
    Array,
}

impl AggregateBinder {
    /// Select the aggregate binder for a target, if it is an aggregate
    pub(crate) fn for_target(target: &Bindable) -> Option<Self> {
        match target.type_desc() {
            TypeDesc::Map { .. } => Some(AggregateBinder::Map),
            TypeDesc::List { .. } => Some(AggregateBinder::List),
            TypeDesc::Array { .. } => Some(AggregateBinder::Array),
            _ => None,
        }
    }

    /// Whether elements from the aggregate's own source may re-enter a
    /// type already on the object-binding stack. Map values may (a map
    /// of self-typed entries is well-founded: each entry has a distinct
    /// key); indexed sequences may not.
    pub(crate) fn allows_recursive_binding(&self) -> bool {
        matches!(self, AggregateBinder::Map)
    }

    pub(crate) fn bind(
        &self,
        binder: &Binder,
        name: &PropName,
        target: &Bindable,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
    ) -> Result<Option<Value>, BindError> {
        match self {
            AggregateBinder::Map => bind_map(binder, name, target, handler, ctx),
            AggregateBinder::List | AggregateBinder::Array => {
                bind_indexed(binder, name, target, handler, ctx)
            }
        }
    }
}

/// Bind one aggregate element: a fresh recursive bind at the current
/// (already increased) depth, scoped to the element's originating
/// source.
fn bind_element(
    binder: &Binder,
    name: &PropName,
    target: &Bindable,
    source: Option<Arc<dyn PropertySource>>,
    allow_recursive: bool,
    handler: &dyn BindHandler,
    ctx: &mut BindContext,
) -> Result<Option<Value>, BindError> {
    ctx.with_source(source, |ctx| {
        binder.bind_internal(name, target, handler, ctx, allow_recursive, false)
    })
}

fn bind_map(
    binder: &Binder,
    name: &PropName,
    target: &Bindable,
    handler: &dyn BindHandler,
    ctx: &mut BindContext,
) -> Result<Option<Value>, BindError> {
    let TypeDesc::Map { value: value_type, .. } = target.type_desc() else {
        return Ok(None);
    };
    let value_type = (**value_type).clone();
    let allow_recursive = AggregateBinder::Map.allows_recursive_binding();

    let mut entries = Map::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let sources: Vec<Arc<dyn PropertySource>> = binder.active_sources(ctx).to_vec();

    for source in &sources {
        for candidate in source.names() {
            let Some(child) = candidate.child_in(name) else {
                continue;
            };
            let key = match child.last() {
                Some(Segment::Key(key)) => key.clone(),
                Some(Segment::Index(index)) => index.to_string(),
                None => continue,
            };
            // first-seen source wins a key, even if it binds to absent
            if !seen.insert(key.clone()) {
                continue;
            }
            let item_target = Bindable::of(value_type.clone());
            let bound = bind_element(
                binder,
                &child,
                &item_target,
                Some(Arc::clone(source)),
                allow_recursive,
                handler,
                ctx,
            )?;
            if let Some(value) = bound {
                entries.insert(key, value);
            }
        }
    }

    if seen.is_empty() {
        trace!(name = %name, "no map children discovered");
        Ok(None)
    } else {
        Ok(Some(Value::Object(entries)))
    }
}

/// Shared list/array binding: consecutive indexed children, stopping at
/// the first gap. The first source with any content wins; sequences are
/// never merged across sources.
fn bind_indexed(
    binder: &Binder,
    name: &PropName,
    target: &Bindable,
    handler: &dyn BindHandler,
    ctx: &mut BindContext,
) -> Result<Option<Value>, BindError> {
    let element_type = match target.type_desc() {
        TypeDesc::List { element } | TypeDesc::Array { element } => (**element).clone(),
        _ => return Ok(None),
    };
    let sources: Vec<Arc<dyn PropertySource>> = binder.active_sources(ctx).to_vec();

    for source in &sources {
        // A property at the aggregate name itself binds as a whole: a
        // raw array element-wise, any other raw value as a one-element
        // sequence.
        if let Some(property) = source.property(name) {
            ctx.set_last_property(property.clone());
            let raw = binder.placeholder_resolver().resolve(property.value)?;
            let items = match raw {
                Value::Array(items) => items,
                other => vec![other],
            };
            let mut out = existing_elements(target);
            for item in items {
                let converted = binder
                    .converter()
                    .convert(&item, &Bindable::of(element_type.clone()))?;
                out.push(converted);
            }
            return Ok(Some(Value::Array(out)));
        }

        let mut collected = Vec::new();
        let mut index = 0;
        loop {
            let child = name.index_child(index);
            let known = source.property(&child).is_some()
                || source.descendants_of(&child) == Descendants::Present;
            if !known {
                break;
            }
            let item_target = Bindable::of(element_type.clone());
            let bound = bind_element(
                binder,
                &child,
                &item_target,
                Some(Arc::clone(source)),
                false,
                handler,
                ctx,
            )?;
            match bound {
                Some(value) => collected.push(value),
                None => break,
            }
            index += 1;
        }
        if !collected.is_empty() {
            let mut out = existing_elements(target);
            out.extend(collected);
            return Ok(Some(Value::Array(out)));
        }
    }

    Ok(None)
}

fn existing_elements(target: &Bindable) -> Vec<Value> {
    match target.existing() {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}
