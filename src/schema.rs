//! Object schemas and type introspection
//!
//! Rust has no runtime reflection, so the binder's view of a data
//! object is an [`ObjectSchema`]: an optional eligible constructor
//! (ordered parameters) plus the mutable properties. Schemas are served
//! by a [`TypeIntrospector`]; the crate ships [`SchemaRegistry`], a
//! map-backed implementation populated by the caller.

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::target::TypeDesc;

/// One constructor parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_desc: TypeDesc,
    pub required: bool,
    pub default: Option<Value>,
}

impl Parameter {
    pub fn required(name: impl Into<String>, type_desc: TypeDesc) -> Self {
        Self {
            name: name.into(),
            type_desc,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, type_desc: TypeDesc) -> Self {
        Self {
            name: name.into(),
            type_desc,
            required: false,
            default: None,
        }
    }

    /// A default makes the parameter optional
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }
}

/// One mutable property
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub type_desc: TypeDesc,
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, type_desc: TypeDesc) -> Self {
        Self {
            name: name.into(),
            type_desc,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// The bindable surface of one object type
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    pub name: String,
    /// The single eligible constructor, if the type supports
    /// constructor-style binding
    pub constructor: Option<Vec<Parameter>>,
    /// Mutable properties, if the type supports property-style binding
    pub fields: Vec<Field>,
}

impl ObjectSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
            fields: Vec::new(),
        }
    }

    pub fn with_constructor(mut self, parameters: Vec<Parameter>) -> Self {
        self.constructor = Some(parameters);
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Instance holding only the declared field defaults
    pub fn default_instance(&self) -> Value {
        let mut map = Map::new();
        for field in &self.fields {
            if let Some(default) = &field.default {
                map.insert(field.name.clone(), default.clone());
            }
        }
        Value::Object(map)
    }
}

/// Enumerates the bindable surface of object types
pub trait TypeIntrospector: Send + Sync {
    fn schema_of(&self, type_name: &str) -> Option<ObjectSchema>;
}

/// Map-backed [`TypeIntrospector`]
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: FxHashMap<String, ObjectSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: ObjectSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    /// Chainable [`register`](Self::register)
    pub fn with(mut self, schema: ObjectSchema) -> Self {
        self.register(schema);
        self
    }
}

impl TypeIntrospector for SchemaRegistry {
    fn schema_of(&self, type_name: &str) -> Option<ObjectSchema> {
        self.schemas.get(type_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_default_makes_parameter_optional() {
        let parameter = Parameter::required("port", TypeDesc::Integer).with_default(8080);
        assert!(!parameter.required);
        assert_eq!(parameter.default, Some(json!(8080)));
    }

    #[test]
    fn default_instance_holds_declared_defaults_only() {
        let schema = ObjectSchema::new("server")
            .with_field(Field::new("host", TypeDesc::String).with_default("localhost"))
            .with_field(Field::new("port", TypeDesc::Integer));

        assert_eq!(schema.default_instance(), json!({"host": "localhost"}));
    }

    #[test]
    fn registry_lookup() {
        let registry = SchemaRegistry::new().with(ObjectSchema::new("server"));
        assert!(registry.schema_of("server").is_some());
        assert!(registry.schema_of("client").is_none());
    }
}
