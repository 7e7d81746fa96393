//! Bind lifecycle hooks
//!
//! A [`BindHandler`] observes and can alter every bind attempt: replace
//! or veto the target before lookup, transform a successful result,
//! supply or replace a created instance, recover from a failure, and
//! observe the final outcome. All callbacks have no-op defaults.

use serde_json::Value;
use tracing::debug;

use crate::context::BindContext;
use crate::error::BindError;
use crate::name::PropName;
use crate::target::Bindable;

/// Lifecycle hooks invoked around every bind attempt
pub trait BindHandler: Send + Sync {
    /// Called before any lookup. Return a (possibly replaced) target to
    /// continue, or `None` to bypass the attempt entirely — the result
    /// is then treated as absent before any source is consulted.
    fn on_start(
        &self,
        _name: &PropName,
        target: &Bindable,
        _ctx: &BindContext,
    ) -> Option<Bindable> {
        Some(target.clone())
    }

    /// Called when a value was bound. Return the (possibly transformed)
    /// value, or `None` to discard it.
    fn on_success(
        &self,
        _name: &PropName,
        _target: &Bindable,
        _ctx: &BindContext,
        value: Value,
    ) -> Option<Value> {
        Some(value)
    }

    /// Called on the creation path with whatever instance the object
    /// binders produced (possibly none). Return the instance to use.
    fn on_create(
        &self,
        _name: &PropName,
        _target: &Bindable,
        _ctx: &BindContext,
        created: Option<Value>,
    ) -> Option<Value> {
        created
    }

    /// Called when binding raised an error. Return `Ok(Some(value))` to
    /// recover with that value, `Ok(None)` to recover to absent, or
    /// `Err` to (re-)raise. The default re-raises the original error.
    fn on_failure(
        &self,
        _name: &PropName,
        _target: &Bindable,
        _ctx: &BindContext,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        Err(error)
    }

    /// Called last with the final outcome, for observation only
    fn on_finish(
        &self,
        _name: &PropName,
        _target: &Bindable,
        _ctx: &BindContext,
        _result: Option<&Value>,
    ) {
    }
}

/// The default handler: every hook is a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl BindHandler for NoOpHandler {}

/// Recovers every failure to the target's existing value, or absent
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreErrorsHandler;

impl BindHandler for IgnoreErrorsHandler {
    fn on_failure(
        &self,
        name: &PropName,
        target: &Bindable,
        _ctx: &BindContext,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        debug!(name = %name, %error, "ignoring bind failure");
        Ok(target.existing().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TypeDesc;
    use serde_json::json;

    #[test]
    fn noop_handler_passes_values_through() {
        let handler = NoOpHandler;
        let ctx = BindContext::new();
        let name = PropName::empty();
        let target = Bindable::of(TypeDesc::Integer);

        assert!(handler.on_start(&name, &target, &ctx).is_some());
        assert_eq!(
            handler.on_success(&name, &target, &ctx, json!(5)),
            Some(json!(5))
        );
        assert_eq!(
            handler.on_create(&name, &target, &ctx, Some(json!(1))),
            Some(json!(1))
        );
    }

    #[test]
    fn noop_handler_reraises_failures() {
        let handler = NoOpHandler;
        let ctx = BindContext::new();
        let error = BindError::Creation {
            type_name: "server".to_string(),
        };
        let result = handler.on_failure(
            &PropName::empty(),
            &Bindable::of(TypeDesc::Integer),
            &ctx,
            error,
        );
        assert!(matches!(result, Err(BindError::Creation { .. })));
    }

    #[test]
    fn ignore_errors_recovers_to_existing_or_absent() {
        let handler = IgnoreErrorsHandler;
        let ctx = BindContext::new();
        let name = PropName::empty();
        let error = || BindError::Conversion {
            value: "x".to_string(),
            to: "integer".to_string(),
            reason: "bad".to_string(),
        };

        let bare = Bindable::of(TypeDesc::Integer);
        assert_eq!(handler.on_failure(&name, &bare, &ctx, error()).unwrap(), None);

        let with_existing = Bindable::of(TypeDesc::Integer).with_existing(json!(7));
        assert_eq!(
            handler
                .on_failure(&name, &with_existing, &ctx, error())
                .unwrap(),
            Some(json!(7))
        );
    }
}
