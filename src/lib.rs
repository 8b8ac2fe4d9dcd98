//! An embeddable ES3 runtime core.
//!
//! The crate provides the object model a script compiler targets: dynamic
//! values, copy-on-write property tables, prototype-chain lookup, pooled call
//! frames, per-execution realms cloned from a shared gold master, and the
//! native built-in library (`Object`, `Function`, `Array`, `String`,
//! `Boolean`, `Number`, `Math`, `Date`, `RegExp` and the global functions).
//! Parsing and code generation are left to the embedder, who supplies
//! function bodies through [`CompiledCode`].
//!
//! # Example
//!
//! ```
//! use escore::{JsValue, Realm, RealmOptions};
//!
//! let realm = Realm::new(RealmOptions::default());
//! let joined = realm.with_call(|call| {
//!     let array = call.new_scope("Array", &[JsValue::from(3), JsValue::from(1), JsValue::from(2)])?;
//!     call.call_method(&array, "sort", &[])?;
//!     call.call_method(&array, "join", &[JsValue::from("-")])
//! })?;
//! assert_eq!(joined.as_str(), Some("1-2-3"));
//! realm.teardown();
//! # Ok::<(), escore::JsError>(())
//! ```

pub mod api;
pub mod builtins;
pub mod call;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod function;
pub mod host;
pub mod object;
pub mod platform;
pub mod property;
pub mod realm;
pub mod string_dict;
pub mod value;

pub use api::{Engine, FnScript, GlobalClosure, RealmBuilder, RealmHandle, Script};
pub use call::Call;
pub use config::{ConfigError, EngineConfig};
pub use error::{JsError, SourceLocation, StackFrame};
pub use format::sprintf;
pub use function::{Closure, CompiledCode};
pub use host::{HostObject, HostValue};
pub use object::{JsObject, ObjectKind, ObjectRef};
pub use property::{PropertyFlags, PropertyTable};
pub use realm::{Realm, RealmGuard, RealmOptions};
pub use value::{CheapClone, Hint, JsString, JsValue};
