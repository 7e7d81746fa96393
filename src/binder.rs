//! The binder facade, dispatcher and outcome pipeline
//!
//! A [`Binder`] wires a fixed source list, a placeholder resolver, a
//! conversion service, a type introspector and a default handler, and
//! exposes `bind` / `bind_or_create`. Each call runs the recursive
//! dispatch: aggregate binding for maps/lists/arrays, direct property
//! binding for matched names, object binding for everything else, with
//! the converter-not-found fallback between the last two. Every attempt
//! flows through the handler's lifecycle hooks, and every error funnels
//! through the failure hook before being normalized.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::aggregate::AggregateBinder;
use crate::context::BindContext;
use crate::convert::{ConversionService, DefaultConversionService};
use crate::error::BindError;
use crate::handler::{BindHandler, NoOpHandler};
use crate::name::PropName;
use crate::object::binders_for;
use crate::placeholder::{NoOpResolver, PlaceholderResolver, SourcePlaceholderResolver};
use crate::schema::{ObjectSchema, SchemaRegistry, TypeIntrospector};
use crate::source::{ConfigProperty, Descendants, PropertySource};
use crate::target::{BindRestriction, Bindable, TypeDesc};

/// Binds objects from one or more property sources
///
/// Immutable after construction; safe to share across threads. Every
/// top-level call allocates its own [`BindContext`], so concurrent
/// binds share nothing mutable.
pub struct Binder {
    sources: Vec<Arc<dyn PropertySource>>,
    placeholder_resolver: Arc<dyn PlaceholderResolver>,
    converter: Arc<dyn ConversionService>,
    introspector: Arc<dyn TypeIntrospector>,
    default_handler: Arc<dyn BindHandler>,
}

impl Binder {
    /// A binder over `sources` with default collaborators everywhere
    /// else: no placeholder resolution, [`DefaultConversionService`],
    /// an empty schema registry and the no-op handler.
    pub fn new(sources: Vec<Arc<dyn PropertySource>>) -> Self {
        Binder::builder().sources(sources).build()
    }

    pub fn builder() -> BinderBuilder {
        BinderBuilder::default()
    }

    /// Bind `name` to `target` using the default handler
    ///
    /// `Ok(None)` means nothing matched — absence is not an error.
    pub fn bind(&self, name: &str, target: &Bindable) -> Result<Option<Value>, BindError> {
        self.bind_with(name, target, self.default_handler.as_ref())
    }

    /// Bind `name` to `target` with an explicit handler
    pub fn bind_with(
        &self,
        name: &str,
        target: &Bindable,
        handler: &dyn BindHandler,
    ) -> Result<Option<Value>, BindError> {
        let name = PropName::parse(name)?;
        debug!(name = %name, ty = %target.type_desc(), "bind");
        let mut ctx = BindContext::new();
        self.bind_internal(&name, target, handler, &mut ctx, false, false)
    }

    /// Bind `name` to `target`, default-constructing the target when
    /// nothing matched. Raises [`BindError::Creation`] when no object
    /// binder can create an instance either.
    pub fn bind_or_create(&self, name: &str, target: &Bindable) -> Result<Value, BindError> {
        self.bind_or_create_with(name, target, self.default_handler.as_ref())
    }

    pub fn bind_or_create_with(
        &self,
        name: &str,
        target: &Bindable,
        handler: &dyn BindHandler,
    ) -> Result<Value, BindError> {
        let name = PropName::parse(name)?;
        debug!(name = %name, ty = %target.type_desc(), "bind_or_create");
        let mut ctx = BindContext::new();
        let result = self.bind_internal(&name, target, handler, &mut ctx, false, true)?;
        // a recovering failure handler can still swallow the created
        // instance; surface that as a creation failure
        result.ok_or_else(|| BindError::Creation {
            type_name: target.type_desc().to_string(),
        })
    }

    /// Bind and deserialize into a concrete type
    pub fn bind_as<T: DeserializeOwned>(
        &self,
        name: &str,
        target: &Bindable,
    ) -> Result<Option<T>, BindError> {
        match self.bind(name, target)? {
            Some(value) => deserialize(value, target).map(Some),
            None => Ok(None),
        }
    }

    /// Bind-or-create and deserialize into a concrete type
    pub fn bind_or_create_as<T: DeserializeOwned>(
        &self,
        name: &str,
        target: &Bindable,
    ) -> Result<T, BindError> {
        let value = self.bind_or_create(name, target)?;
        deserialize(value, target)
    }

    // ─────────────────────────────────────────────────────────────
    // Collaborator access for the aggregate and object binders
    // ─────────────────────────────────────────────────────────────

    /// The sources visible to the current call frame: the innermost
    /// scoped override if one is active, else the full configured list.
    pub(crate) fn active_sources<'a>(
        &'a self,
        ctx: &'a BindContext,
    ) -> &'a [Arc<dyn PropertySource>] {
        match ctx.source_override() {
            Some(source) => std::slice::from_ref(source),
            None => &self.sources,
        }
    }

    pub(crate) fn placeholder_resolver(&self) -> &dyn PlaceholderResolver {
        self.placeholder_resolver.as_ref()
    }

    pub(crate) fn converter(&self) -> &dyn ConversionService {
        self.converter.as_ref()
    }

    // ─────────────────────────────────────────────────────────────
    // Outcome pipeline
    // ─────────────────────────────────────────────────────────────

    /// One full bind attempt: start hook, dispatch, finalize; errors
    /// funnel through the failure hook.
    pub(crate) fn bind_internal(
        &self,
        name: &PropName,
        target: &Bindable,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
        allow_recursive: bool,
        create: bool,
    ) -> Result<Option<Value>, BindError> {
        match self.attempt_bind(name, target, handler, ctx, allow_recursive, create) {
            Ok(result) => Ok(result),
            Err(error) => self.handle_bind_error(name, target, handler, ctx, error),
        }
    }

    fn attempt_bind(
        &self,
        name: &PropName,
        target: &Bindable,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
        allow_recursive: bool,
        create: bool,
    ) -> Result<Option<Value>, BindError> {
        match handler.on_start(name, target, ctx) {
            None => {
                trace!(name = %name, "bind bypassed by handler");
                self.finalize(name, target, handler, ctx, None, create)
            }
            Some(replacement) => {
                let bound = self.bind_object(name, &replacement, handler, ctx, allow_recursive)?;
                self.finalize(name, &replacement, handler, ctx, bound, create)
            }
        }
    }

    fn finalize(
        &self,
        name: &PropName,
        target: &Bindable,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
        bound: Option<Value>,
        create: bool,
    ) -> Result<Option<Value>, BindError> {
        let mut result = match bound {
            Some(value) => match handler.on_success(name, target, ctx, value) {
                Some(transformed) => Some(self.converter.convert(&transformed, target)?),
                None => None,
            },
            None => None,
        };

        if result.is_none() && create {
            let schema = self.schema_for(target);
            let mut created = None;
            if let Some(schema) = &schema {
                for object_binder in binders_for(target.bind_method()) {
                    if let Some(instance) = object_binder.create(target, schema, ctx) {
                        created = Some(instance);
                        break;
                    }
                }
            }
            let created = match handler.on_create(name, target, ctx, created) {
                Some(instance) => Some(self.converter.convert(&instance, target)?),
                None => None,
            };
            match created {
                Some(instance) => result = Some(instance),
                None => {
                    let error = BindError::Creation {
                        type_name: target.type_desc().to_string(),
                    };
                    if schema.is_some() {
                        for object_binder in binders_for(target.bind_method()) {
                            object_binder.on_unable_to_create(target, ctx, &error);
                        }
                    }
                    return Err(error);
                }
            }
        }

        handler.on_finish(name, target, ctx, result.as_ref());
        Ok(result)
    }

    /// Give the failure hook one chance to recover, then normalize
    fn handle_bind_error(
        &self,
        name: &PropName,
        target: &Bindable,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        match handler.on_failure(name, target, ctx, error) {
            Ok(Some(recovered)) => self
                .converter
                .convert(&recovered, target)
                .map(Some)
                .map_err(|e| self.wrap_error(name, target, ctx, e)),
            Ok(None) => Ok(None),
            Err(error) => Err(self.wrap_error(name, target, ctx, error)),
        }
    }

    /// Normalize into `Binding` exactly once. Creation failures are a
    /// terminal kind of their own and pass through unwrapped.
    fn wrap_error(
        &self,
        name: &PropName,
        target: &Bindable,
        ctx: &BindContext,
        error: BindError,
    ) -> BindError {
        if matches!(error, BindError::Binding { .. } | BindError::Creation { .. }) {
            return error;
        }
        BindError::Binding {
            name: name.to_string(),
            type_name: target.type_desc().to_string(),
            property: ctx.last_property().map(|p| p.to_string()),
            source: Box::new(error),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Dispatcher
    // ─────────────────────────────────────────────────────────────

    fn bind_object(
        &self,
        name: &PropName,
        target: &Bindable,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
        allow_recursive: bool,
    ) -> Result<Option<Value>, BindError> {
        let property = self.find_property(name, target, ctx);
        if property.is_none() && ctx.depth() != 0 && self.contains_no_descendant_of(ctx, name) {
            return Ok(None);
        }
        if let Some(aggregate) = AggregateBinder::for_target(target) {
            return ctx
                .with_increased_depth(|ctx| aggregate.bind(self, name, target, handler, ctx));
        }
        if let Some(property) = property {
            return match self.bind_property(target, ctx, property) {
                Err(error) if error.is_no_converter() => {
                    // the object binders might still handle it
                    debug!(name = %name, ty = %target.type_desc(),
                        "no converter for direct property, trying object binders");
                    match self.bind_data_object(name, target, handler, ctx, allow_recursive)? {
                        Some(instance) => Ok(Some(instance)),
                        None => Err(error),
                    }
                }
                other => other.map(Some),
            };
        }
        self.bind_data_object(name, target, handler, ctx, allow_recursive)
    }

    fn find_property(
        &self,
        name: &PropName,
        target: &Bindable,
        ctx: &BindContext,
    ) -> Option<ConfigProperty> {
        if name.is_empty() || target.has_restriction(BindRestriction::NoDirectProperty) {
            return None;
        }
        self.active_sources(ctx)
            .iter()
            .find_map(|source| source.property(name))
    }

    fn contains_no_descendant_of(&self, ctx: &BindContext, name: &PropName) -> bool {
        self.active_sources(ctx)
            .iter()
            .all(|source| source.descendants_of(name) == Descendants::Absent)
    }

    fn bind_property(
        &self,
        target: &Bindable,
        ctx: &mut BindContext,
        property: ConfigProperty,
    ) -> Result<Value, BindError> {
        trace!(property = %property, "direct property match");
        ctx.set_last_property(property.clone());
        let resolved = self.placeholder_resolver.resolve(property.value)?;
        self.converter.convert(&resolved, target)
    }

    fn bind_data_object(
        &self,
        name: &PropName,
        target: &Bindable,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
        allow_recursive: bool,
    ) -> Result<Option<Value>, BindError> {
        if self.is_unbindable(name, target, ctx) {
            return Ok(None);
        }
        let TypeDesc::Object { name: type_name } = target.type_desc() else {
            return Ok(None);
        };
        if !allow_recursive && ctx.is_binding_object(type_name) {
            trace!(name = %name, type_name = %type_name, "cycle guard: already binding this type");
            return Ok(None);
        }
        let Some(schema) = self.introspector.schema_of(type_name) else {
            debug!(type_name = %type_name, "no schema registered, treating as absent");
            return Ok(None);
        };

        ctx.with_object_binding(type_name, |ctx| {
            for object_binder in binders_for(target.bind_method()) {
                if let Some(instance) =
                    object_binder.bind(self, name, target, &schema, handler, ctx)?
                {
                    return Ok(Some(instance));
                }
            }
            Ok(None)
        })
    }

    /// Cheap rejection of leaf types: when no active source reports a
    /// present descendant and the target is a scalar, neither object
    /// strategy can possibly apply.
    fn is_unbindable(&self, name: &PropName, target: &Bindable, ctx: &BindContext) -> bool {
        let any_present = self
            .active_sources(ctx)
            .iter()
            .any(|source| source.descendants_of(name) == Descendants::Present);
        if any_present {
            return false;
        }
        target.type_desc().is_scalar()
    }

    fn schema_for(&self, target: &Bindable) -> Option<ObjectSchema> {
        match target.type_desc() {
            TypeDesc::Object { name } => self.introspector.schema_of(name),
            _ => None,
        }
    }
}

fn deserialize<T: DeserializeOwned>(value: Value, target: &Bindable) -> Result<T, BindError> {
    serde_json::from_value(value).map_err(|e| BindError::Conversion {
        value: "bound value".to_string(),
        to: target.type_desc().to_string(),
        reason: e.to_string(),
    })
}

/// Fluent construction of a [`Binder`]
#[derive(Default)]
pub struct BinderBuilder {
    sources: Vec<Arc<dyn PropertySource>>,
    placeholder_resolver: Option<Arc<dyn PlaceholderResolver>>,
    resolve_from_sources: bool,
    converter: Option<Arc<dyn ConversionService>>,
    introspector: Option<Arc<dyn TypeIntrospector>>,
    default_handler: Option<Arc<dyn BindHandler>>,
}

impl BinderBuilder {
    /// Append one source (sources are queried in the order added)
    pub fn source(mut self, source: impl PropertySource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Append already-shared sources
    pub fn sources(mut self, sources: Vec<Arc<dyn PropertySource>>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn placeholder_resolver(mut self, resolver: impl PlaceholderResolver + 'static) -> Self {
        self.placeholder_resolver = Some(Arc::new(resolver));
        self
    }

    /// Resolve `${...}` placeholders against the binder's own sources
    pub fn resolve_placeholders(mut self) -> Self {
        self.resolve_from_sources = true;
        self
    }

    pub fn converter(mut self, converter: impl ConversionService + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    pub fn introspector(mut self, introspector: impl TypeIntrospector + 'static) -> Self {
        self.introspector = Some(Arc::new(introspector));
        self
    }

    pub fn default_handler(mut self, handler: impl BindHandler + 'static) -> Self {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Binder {
        let placeholder_resolver = match self.placeholder_resolver {
            Some(resolver) => resolver,
            None if self.resolve_from_sources => {
                Arc::new(SourcePlaceholderResolver::new(self.sources.clone()))
            }
            None => Arc::new(NoOpResolver),
        };
        Binder {
            sources: self.sources,
            placeholder_resolver,
            converter: self
                .converter
                .unwrap_or_else(|| Arc::new(DefaultConversionService)),
            introspector: self
                .introspector
                .unwrap_or_else(|| Arc::new(SchemaRegistry::new())),
            default_handler: self.default_handler.unwrap_or_else(|| Arc::new(NoOpHandler)),
        }
    }
}
