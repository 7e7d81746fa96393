//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All failures surfaced by the binder.
///
/// Absence is never an error: a name with no matching property or
/// descendant binds to `Ok(None)`. Errors escaping a top-level bind are
/// normalized into the `Binding` variant exactly once, so callers see a
/// single error shape regardless of where in the recursion it arose.
#[derive(Error, Debug)]
pub enum BindError {
    /// The conversion subsystem has no rule for this value/type pair.
    /// The dispatcher treats this variant specially: a direct property
    /// that fails with it is retried through the object binders before
    /// the error is re-raised.
    #[error("no converter registered for {from} -> {to}")]
    NoConverter { from: String, to: String },

    /// A conversion rule exists but rejected the value.
    #[error("cannot convert '{value}' to {to}: {reason}")]
    Conversion {
        value: String,
        to: String,
        reason: String,
    },

    /// Fatal: no object binder could default-construct the target after
    /// all fallbacks were exhausted.
    #[error("unable to create instance of {type_name}")]
    Creation { type_name: String },

    /// Malformed property-name text.
    #[error("invalid property name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Normalization wrapper: records the name and target at which the
    /// failure occurred, the last directly-matched property (if any) for
    /// diagnostics, and the original cause.
    #[error("failed to bind '{name}' to {type_name}")]
    Binding {
        name: String,
        type_name: String,
        property: Option<String>,
        #[source]
        source: Box<BindError>,
    },
}

impl BindError {
    /// Whether this is the converter-not-found failure the dispatcher
    /// may retry via the object-binding fallback.
    pub fn is_no_converter(&self) -> bool {
        matches!(self, BindError::NoConverter { .. })
    }

    /// The root cause, unwrapping any `Binding` layers.
    pub fn root_cause(&self) -> &BindError {
        match self {
            BindError::Binding { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl FixSuggestion for BindError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            BindError::NoConverter { .. } => {
                Some("Register a schema for the target type or supply a custom ConversionService")
            }
            BindError::Conversion { .. } => {
                Some("Check the raw property value matches the target type")
            }
            BindError::Creation { .. } => {
                Some("Provide defaults for every required constructor parameter or bind real data")
            }
            BindError::InvalidName { .. } => {
                Some("Use lowercase dotted names like server.hosts[0].port")
            }
            BindError::Binding { .. } => {
                Some("Inspect the wrapped cause for the failing property")
            }
        }
    }
}
