//! propbind - binds hierarchical configuration properties to typed object graphs
//!
//! Properties live in ordered [`PropertySource`]s keyed by dotted names
//! like `server.hosts[0].port`. A [`Binder`] resolves a name against
//! those sources and assembles the target described by a [`Bindable`]:
//! scalars, maps, lists, arrays, or data objects built through a
//! registered [`ObjectSchema`]. Raw values pass through placeholder
//! resolution and type conversion on the way; lifecycle hooks on a
//! [`BindHandler`] can observe, rewrite, recover from, or veto any
//! outcome.
//!
//! ```
//! use propbind::{Binder, Bindable, MapSource, TypeDesc};
//!
//! let source = MapSource::new("demo").try_with("server.port", "8080")?;
//! let binder = Binder::builder().source(source).build();
//! let port = binder.bind("server.port", &Bindable::of(TypeDesc::Integer))?;
//! assert_eq!(port, Some(serde_json::json!(8080)));
//! # Ok::<(), propbind::BindError>(())
//! ```

pub mod binder;
pub mod context;
pub mod convert;
pub mod error;
pub mod handler;
pub mod name;
pub mod placeholder;
pub mod schema;
pub mod source;
pub mod target;

mod aggregate;
mod object;

pub use binder::{Binder, BinderBuilder};
pub use context::BindContext;
pub use convert::{ConversionService, DefaultConversionService};
pub use error::{BindError, FixSuggestion};
pub use handler::{BindHandler, IgnoreErrorsHandler, NoOpHandler};
pub use name::{PropName, Segment};
pub use placeholder::{NoOpResolver, PlaceholderResolver, SourcePlaceholderResolver};
pub use schema::{Field, ObjectSchema, Parameter, SchemaRegistry, TypeIntrospector};
pub use source::{ConfigProperty, Descendants, EnvSource, MapSource, PropertySource};
pub use target::{BindMethod, BindRestriction, Bindable, TypeDesc};
