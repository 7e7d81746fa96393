//! Bind targets
//!
//! A [`Bindable`] describes what is being bound: the target type, an
//! optional existing value to bind onto, an optional preferred object
//! construction method, and restriction flags. Its [`TypeDesc`] drives
//! every dispatch decision in the binder.

use std::fmt;

use serde_json::Value;

/// Target type descriptor
///
/// Object types are opaque names resolved through the
/// [`TypeIntrospector`](crate::schema::TypeIntrospector).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDesc {
    String,
    Bool,
    Integer,
    Float,
    Map {
        key: Box<TypeDesc>,
        value: Box<TypeDesc>,
    },
    List {
        element: Box<TypeDesc>,
    },
    Array {
        element: Box<TypeDesc>,
    },
    Object {
        name: String,
    },
}

impl TypeDesc {
    pub fn map_of(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn list_of(element: TypeDesc) -> Self {
        TypeDesc::List {
            element: Box::new(element),
        }
    }

    pub fn array_of(element: TypeDesc) -> Self {
        TypeDesc::Array {
            element: Box::new(element),
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeDesc::Object { name: name.into() }
    }

    /// Map, list or array
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            TypeDesc::Map { .. } | TypeDesc::List { .. } | TypeDesc::Array { .. }
        )
    }

    /// A leaf type that can never be treated as a bindable object
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeDesc::String | TypeDesc::Bool | TypeDesc::Integer | TypeDesc::Float
        )
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::String => write!(f, "string"),
            TypeDesc::Bool => write!(f, "bool"),
            TypeDesc::Integer => write!(f, "integer"),
            TypeDesc::Float => write!(f, "float"),
            TypeDesc::Map { key, value } => write!(f, "map<{}, {}>", key, value),
            TypeDesc::List { element } => write!(f, "list<{}>", element),
            TypeDesc::Array { element } => write!(f, "array<{}>", element),
            TypeDesc::Object { name } => write!(f, "{}", name),
        }
    }
}

/// Object construction method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMethod {
    /// Immutable value object built by invoking a constructor with
    /// recursively bound parameters
    Constructor,
    /// Mutable object built by binding and assigning each discoverable
    /// property
    Properties,
}

/// Restrictions applied during binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindRestriction {
    /// Never match the name directly against a scalar property
    NoDirectProperty,
}

/// Description of what is being bound
#[derive(Debug, Clone)]
pub struct Bindable {
    type_desc: TypeDesc,
    existing: Option<Value>,
    bind_method: Option<BindMethod>,
    restrictions: Vec<BindRestriction>,
}

impl Bindable {
    pub fn of(type_desc: TypeDesc) -> Self {
        Self {
            type_desc,
            existing: None,
            bind_method: None,
            restrictions: Vec::new(),
        }
    }

    /// Supply an existing value to bind onto (merged-into for
    /// collections, field-merged for property-style objects)
    pub fn with_existing(mut self, value: Value) -> Self {
        self.existing = Some(value);
        self
    }

    /// Force a specific object construction method instead of the
    /// constructor-then-properties fallback chain
    pub fn with_bind_method(mut self, method: BindMethod) -> Self {
        self.bind_method = Some(method);
        self
    }

    pub fn with_restriction(mut self, restriction: BindRestriction) -> Self {
        if !self.restrictions.contains(&restriction) {
            self.restrictions.push(restriction);
        }
        self
    }

    pub fn type_desc(&self) -> &TypeDesc {
        &self.type_desc
    }

    pub fn existing(&self) -> Option<&Value> {
        self.existing.as_ref()
    }

    pub fn bind_method(&self) -> Option<BindMethod> {
        self.bind_method
    }

    pub fn has_restriction(&self, restriction: BindRestriction) -> bool {
        self.restrictions.contains(&restriction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_desc_display() {
        assert_eq!(TypeDesc::Integer.to_string(), "integer");
        assert_eq!(
            TypeDesc::map_of(TypeDesc::String, TypeDesc::Integer).to_string(),
            "map<string, integer>"
        );
        assert_eq!(
            TypeDesc::list_of(TypeDesc::object("server")).to_string(),
            "list<server>"
        );
    }

    #[test]
    fn aggregate_and_scalar_classification() {
        assert!(TypeDesc::list_of(TypeDesc::String).is_aggregate());
        assert!(TypeDesc::map_of(TypeDesc::String, TypeDesc::String).is_aggregate());
        assert!(!TypeDesc::object("server").is_aggregate());
        assert!(TypeDesc::Bool.is_scalar());
        assert!(!TypeDesc::object("server").is_scalar());
    }

    #[test]
    fn restrictions_deduplicate() {
        let target = Bindable::of(TypeDesc::String)
            .with_restriction(BindRestriction::NoDirectProperty)
            .with_restriction(BindRestriction::NoDirectProperty);
        assert!(target.has_restriction(BindRestriction::NoDirectProperty));
        assert_eq!(target.restrictions.len(), 1);
    }

    #[test]
    fn builder_carries_existing_and_method() {
        let target = Bindable::of(TypeDesc::object("server"))
            .with_existing(json!({"port": 1}))
            .with_bind_method(BindMethod::Properties);
        assert_eq!(target.existing(), Some(&json!({"port": 1})));
        assert_eq!(target.bind_method(), Some(BindMethod::Properties));
    }
}
