//! Data object binders
//!
//! Two construction strategies share one contract: the constructor
//! binder resolves each constructor parameter recursively and only
//! constructs when the required set bound; the properties binder takes
//! an existing or default instance and assigns each property that
//! binds. When the target declares no preference they are tried in
//! that order and the first non-absent result wins.

use serde_json::{Map, Value};
use tracing::debug;

use crate::binder::Binder;
use crate::context::BindContext;
use crate::error::BindError;
use crate::handler::BindHandler;
use crate::name::PropName;
use crate::schema::ObjectSchema;
use crate::target::{BindMethod, Bindable};

/// Shared contract for the object construction strategies
pub(crate) trait DataObjectBinder: Sync {
    /// Bind the object from properties below `name`, or report absent
    fn bind(
        &self,
        binder: &Binder,
        name: &PropName,
        target: &Bindable,
        schema: &ObjectSchema,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
    ) -> Result<Option<Value>, BindError>;

    /// Default-construct an instance without binding any properties, or
    /// report absent
    fn create(&self, target: &Bindable, schema: &ObjectSchema, ctx: &mut BindContext)
        -> Option<Value>;

    /// Diagnostic notification sent to every applicable binder when no
    /// strategy could create an instance
    fn on_unable_to_create(&self, target: &Bindable, _ctx: &BindContext, error: &BindError) {
        debug!(ty = %target.type_desc(), %error, "unable to create instance");
    }
}

/// Binds immutable value objects through their constructor
pub(crate) struct ConstructorBinder;

impl DataObjectBinder for ConstructorBinder {
    fn bind(
        &self,
        binder: &Binder,
        name: &PropName,
        target: &Bindable,
        schema: &ObjectSchema,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
    ) -> Result<Option<Value>, BindError> {
        let Some(parameters) = schema.constructor.as_deref() else {
            return Ok(None);
        };
        if parameters.is_empty() {
            return Ok(None);
        }

        ctx.with_constructor_binding(&schema.name, |ctx| {
            let mut arguments = Map::new();
            let mut any_bound = false;
            let mut missing_required = false;

            for parameter in parameters {
                let parameter_name = name.child(&parameter.name);
                let parameter_target = Bindable::of(parameter.type_desc.clone());
                let bound =
                    binder.bind_internal(&parameter_name, &parameter_target, handler, ctx, false, false)?;
                match bound {
                    Some(value) => {
                        any_bound = true;
                        arguments.insert(parameter.name.clone(), value);
                    }
                    None if parameter.required => missing_required = true,
                    None => {
                        arguments.insert(
                            parameter.name.clone(),
                            parameter.default.clone().unwrap_or(Value::Null),
                        );
                    }
                }
            }

            if !any_bound || missing_required {
                return Ok(None);
            }
            Ok(Some(Value::Object(arguments)))
        })
    }

    fn create(
        &self,
        _target: &Bindable,
        schema: &ObjectSchema,
        _ctx: &mut BindContext,
    ) -> Option<Value> {
        let parameters = schema.constructor.as_deref()?;
        let mut arguments = Map::new();
        for parameter in parameters {
            if parameter.required {
                return None;
            }
            arguments.insert(
                parameter.name.clone(),
                parameter.default.clone().unwrap_or(Value::Null),
            );
        }
        Some(Value::Object(arguments))
    }
}

/// Binds mutable objects by assigning each discoverable property
pub(crate) struct PropertiesBinder;

impl DataObjectBinder for PropertiesBinder {
    fn bind(
        &self,
        binder: &Binder,
        name: &PropName,
        target: &Bindable,
        schema: &ObjectSchema,
        handler: &dyn BindHandler,
        ctx: &mut BindContext,
    ) -> Result<Option<Value>, BindError> {
        if schema.fields.is_empty() {
            return Ok(None);
        }

        let mut instance = match target.existing() {
            Some(Value::Object(existing)) => existing.clone(),
            _ => match schema.default_instance() {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        };
        let mut any_bound = false;

        for field in &schema.fields {
            let field_name = name.child(&field.name);
            let mut field_target = Bindable::of(field.type_desc.clone());
            if let Some(current) = instance.get(&field.name) {
                field_target = field_target.with_existing(current.clone());
            }
            let bound =
                binder.bind_internal(&field_name, &field_target, handler, ctx, false, false)?;
            if let Some(value) = bound {
                instance.insert(field.name.clone(), value);
                any_bound = true;
            }
        }

        if any_bound {
            Ok(Some(Value::Object(instance)))
        } else {
            Ok(None)
        }
    }

    fn create(
        &self,
        _target: &Bindable,
        schema: &ObjectSchema,
        _ctx: &mut BindContext,
    ) -> Option<Value> {
        if schema.fields.is_empty() {
            return None;
        }
        Some(schema.default_instance())
    }
}

static CONSTRUCTOR_BINDER: ConstructorBinder = ConstructorBinder;
static PROPERTIES_BINDER: PropertiesBinder = PropertiesBinder;

/// The ordered strategy chain for a bind-method preference: a declared
/// method narrows the chain to that strategy, no declaration tries
/// constructor-style first and falls back to property-style.
pub(crate) fn binders_for(method: Option<BindMethod>) -> &'static [&'static dyn DataObjectBinder] {
    static CONSTRUCTOR_ONLY: [&dyn DataObjectBinder; 1] = [&CONSTRUCTOR_BINDER];
    static PROPERTIES_ONLY: [&dyn DataObjectBinder; 1] = [&PROPERTIES_BINDER];
    static FALLBACK_CHAIN: [&dyn DataObjectBinder; 2] = [&CONSTRUCTOR_BINDER, &PROPERTIES_BINDER];
    match method {
        Some(BindMethod::Constructor) => &CONSTRUCTOR_ONLY,
        Some(BindMethod::Properties) => &PROPERTIES_ONLY,
        None => &FALLBACK_CHAIN,
    }
}
