//! Embedding API.
//!
//! An [`Engine`] holds the configuration shared by the realms it creates.
//! A [`RealmHandle`] owns one realm: host globals go in through a
//! [`RealmBuilder`], a compiled [`Script`] is bound to it with
//! [`RealmHandle::init_class`], and the resulting [`GlobalClosure`] runs the
//! script and calls its top-level functions by name.
//!
//! # Example
//!
//! ```
//! use escore::api::{Engine, FnScript};
//! use escore::{JsString, JsValue};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let realm = engine.realm().property("base", json!(40)).build();
//!
//! let script = FnScript::new("add.js", |call, _argc| {
//!     let global = call.global_object()?;
//!     let base = global.get("base")?;
//!     global.set_property(JsString::from("answer"), base.add(&JsValue::Number(2.0))?)?;
//!     Ok(JsValue::Undefined)
//! });
//! let closure = realm.init_class(&script);
//! closure.execute()?;
//! assert_eq!(closure.get("answer")?, Some(JsValue::Number(42.0)));
//! # Ok::<(), escore::JsError>(())
//! ```

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::call::Call;
use crate::config::{ConfigError, EngineConfig};
use crate::error::JsError;
use crate::function::CompiledCode;
use crate::host::{self, HostObject, HostValue};
use crate::object::{JsObject, ObjectKind, ObjectRef};
use crate::platform::{RandomProvider, StdRandomProvider, StdTimeProvider, TimeProvider};
use crate::property::PropertyFlags;
use crate::realm::{Realm, RealmOptions};
use crate::string_dict;
use crate::value::{CheapClone, JsValue};

/// Factory for realms sharing one configuration
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    time: Arc<dyn TimeProvider>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            time: Arc::new(StdTimeProvider::new()),
        }
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            time: Arc::new(StdTimeProvider::new()),
        })
    }

    /// Clock used by realms that do not set their own
    pub fn with_time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start building a realm.
    pub fn realm(&self) -> RealmBuilder<'_> {
        RealmBuilder {
            engine: self,
            properties: Vec::new(),
            prototype: None,
            time: None,
            random: None,
        }
    }

    /// A realm whose globals are the given host bindings
    pub fn create_realm<K, V>(&self, properties: impl IntoIterator<Item = (K, V)>) -> RealmHandle
    where
        K: Into<String>,
        V: Into<HostValue>,
    {
        self.realm().properties(properties).build()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Collects host globals and providers for a new realm
pub struct RealmBuilder<'e> {
    engine: &'e Engine,
    properties: Vec<(String, HostValue)>,
    prototype: Option<HostValue>,
    time: Option<Arc<dyn TimeProvider>>,
    random: Option<Box<dyn RandomProvider>>,
}

impl RealmBuilder<'_> {
    /// Bind a host global. Script assignments to the same name shadow it.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    pub fn properties<K, V>(mut self, properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<HostValue>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Host object the global inherits from.
    ///
    /// Names it answers take priority over the host properties; whatever
    /// it does not know falls through to `Object.prototype`.
    pub fn prototype(mut self, prototype: impl Into<HostValue>) -> Self {
        self.prototype = Some(prototype.into());
        self
    }

    pub fn time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn random_provider(mut self, random: Box<dyn RandomProvider>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn build(self) -> RealmHandle {
        let placeholder = self.prototype.as_ref().map(|proto| match proto {
            HostValue::Object(host) => ObjectRef::new(JsObject::with_kind(
                host.class_name(),
                None,
                ObjectKind::Host(host.clone()),
            )),
            HostValue::Json(_) => ObjectRef::new(JsObject::new("Object", None)),
        });

        let realm = Realm::new(RealmOptions {
            config: self.engine.config.clone(),
            host_prototype: placeholder.clone(),
            time: self.time.unwrap_or_else(|| self.engine.time.clone()),
            random: self
                .random
                .unwrap_or_else(|| Box::new(StdRandomProvider::new())),
        });

        if let (Some(proto), Some(HostValue::Json(json))) = (&placeholder, &self.prototype) {
            if let JsValue::Object(filled) = host::json_to_value(&realm, json) {
                for key in filled.own_keys() {
                    if let Ok(value) = filled.get(key.as_str()) {
                        proto.put(key, value, PropertyFlags::EMPTY);
                    }
                }
            }
        }
        if let Some(proto) = &placeholder {
            proto.set_prototype_unchecked(Some(realm.intrinsics().object_prototype.cheap_clone()));
        }

        for (name, value) in &self.properties {
            realm.define_host_property(string_dict::intern(name), host::wrap(&realm, value));
        }
        RealmHandle { realm }
    }
}

/// Owner of a realm. Dropping it tears the realm down.
pub struct RealmHandle {
    realm: Realm,
}

impl RealmHandle {
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn global(&self) -> &ObjectRef {
        self.realm.global()
    }

    /// Bind a compiled script to this realm.
    pub fn init_class(&self, script: &dyn Script) -> GlobalClosure<'_> {
        script.init_class(&self.realm)
    }

    /// Marshal a host value into this realm.
    pub fn wrap(&self, value: &HostValue) -> JsValue {
        host::wrap(&self.realm, value)
    }

    pub fn wrap_object(&self, host: Arc<dyn HostObject>) -> ObjectRef {
        host::wrap_object(&self.realm, host)
    }

    /// Run `f` with this realm current, in a pooled frame.
    pub fn with_call<R>(
        &self,
        f: impl FnOnce(&mut Call) -> Result<R, JsError>,
    ) -> Result<R, JsError> {
        self.realm.with_call(f)
    }
}

impl Drop for RealmHandle {
    fn drop(&mut self) {
        self.realm.teardown();
    }
}

impl std::fmt::Debug for RealmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmHandle").field("realm", &self.realm).finish()
    }
}

/// A compiled script unit.
///
/// The compiler lives outside this crate; it hands over the top-level body
/// as [`CompiledCode`].
pub trait Script: Send + Sync {
    /// File name used in stack traces
    fn name(&self) -> &str;

    fn code(&self) -> Arc<dyn CompiledCode>;

    fn init_class<'r>(&self, realm: &'r Realm) -> GlobalClosure<'r> {
        GlobalClosure::new(realm, self.name(), self.code())
    }
}

/// A [`Script`] whose body is a Rust closure
#[derive(Clone)]
pub struct FnScript {
    name: String,
    code: Arc<dyn CompiledCode>,
}

impl FnScript {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Call, usize) -> Result<JsValue, JsError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            code: Arc::new(body),
        }
    }
}

impl Script for FnScript {
    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Arc<dyn CompiledCode> {
        self.code.clone()
    }
}

/// A script bound to a realm.
///
/// One handle serves one thread at a time; independent handles over
/// independent realms may run concurrently.
pub struct GlobalClosure<'r> {
    realm: &'r Realm,
    name: String,
    code: Arc<dyn CompiledCode>,
    _single_threaded: PhantomData<Cell<()>>,
}

impl<'r> GlobalClosure<'r> {
    pub fn new(realm: &'r Realm, name: &str, code: Arc<dyn CompiledCode>) -> Self {
        Self {
            realm,
            name: name.to_string(),
            code,
            _single_threaded: PhantomData,
        }
    }

    pub fn realm(&self) -> &Realm {
        self.realm
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the top-level body with the global object as scope and `this`.
    pub fn execute(&self) -> Result<JsValue, JsError> {
        tracing::debug!(realm = self.realm.id(), script = %self.name, "executing script");
        let code = self.code.clone();
        self.realm.with_call(|call| {
            call.set_this(JsValue::Object(self.realm.global().cheap_clone()));
            if let Some(location) = code.location() {
                call.set_location(location);
            }
            code.execute(call, 0)
        })
    }

    /// Call a top-level function with JSON arguments.
    ///
    /// An array is spread into individual arguments; anything else is
    /// passed as the single argument.
    pub fn call(
        &self,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<serde_json::Value, JsError> {
        let args: Vec<JsValue> = match args {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| host::json_to_value(self.realm, item))
                .collect(),
            other => vec![host::json_to_value(self.realm, other)],
        };
        let result = self.call_values(name, &args)?;
        host::unwrap(&result)
    }

    pub fn call_values(&self, name: &str, args: &[JsValue]) -> Result<JsValue, JsError> {
        self.realm.with_call(|call| call.call_scope(name, args))
    }

    /// Read a global binding.
    pub fn get(&self, name: &str) -> Result<Option<JsValue>, JsError> {
        let _guard = self.realm.enter();
        self.realm.global().get_property(name)
    }
}
