//! Objects and the prototype-chain resolver.
//!
//! Every object is an [`ObjectRef`]: a shared handle to a lock-protected
//! [`JsObject`]. The per-kind behavior that a class hierarchy would express
//! with overrides (array `length`, string indices, function arity, global
//! resolution, host delegation) is dispatched explicitly on [`ObjectKind`].
//!
//! Locks are never held while calling into script code: every path that
//! may invoke a function (watch handlers, `valueOf`/`toString`, host
//! callbacks) copies what it needs out of the guard first.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::builtins::regexp::RegExpData;
use crate::call::{self, Call};
use crate::convert;
use crate::error::JsError;
use crate::function::Function;
use crate::host::HostObject;
use crate::property::{PropertyFlags, PropertyTable, SetOutcome};
use crate::realm::{GlobalData, Realm};
use crate::string_dict;
use crate::value::{CheapClone, Hint, JsString, JsValue};

/// Longest prototype chain a lookup will walk
pub const MAX_PROTOTYPE_DEPTH: usize = 1024;

/// Built-in payload of an object
#[derive(Clone)]
pub enum ObjectKind {
    Ordinary,
    Array { length: u32 },
    Function(Function),
    Boolean(bool),
    Number(f64),
    String(JsString),
    Date(f64),
    RegExp(Arc<RegExpData>),
    Arguments,
    /// The realm's global object
    Global(GlobalData),
    /// A wrapped host value
    Host(Arc<dyn HostObject>),
}

impl ObjectKind {
    fn name(&self) -> &'static str {
        match self {
            ObjectKind::Ordinary => "Ordinary",
            ObjectKind::Array { .. } => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::Date(_) => "Date",
            ObjectKind::RegExp(_) => "RegExp",
            ObjectKind::Arguments => "Arguments",
            ObjectKind::Global(_) => "Global",
            ObjectKind::Host(_) => "Host",
        }
    }
}

/// Constructor/prototype back-links of the built-ins.
///
/// Kept outside the property table so a realm clone can re-point them at
/// its own objects without un-sharing the copied table.
#[derive(Clone)]
pub(crate) enum IntrinsicLink {
    /// On a constructor: its `prototype`
    Prototype(ObjectRef),
    /// On a prototype: its `constructor`
    Constructor(ObjectRef),
}

/// Object state behind an [`ObjectRef`]
pub struct JsObject {
    class_name: JsString,
    prototype: Option<ObjectRef>,
    pub(crate) properties: PropertyTable,
    pub(crate) kind: ObjectKind,
    pub(crate) link: Option<IntrinsicLink>,
    /// Memoize successful chain lookups into this object's own table
    snap: bool,
    /// Frozen gold-realm object; writes are dropped
    template: bool,
    /// Recursion mark for `join`
    visiting: bool,
}

impl JsObject {
    pub fn new(class_name: impl Into<JsString>, prototype: Option<ObjectRef>) -> Self {
        Self::with_kind(class_name, prototype, ObjectKind::Ordinary)
    }

    pub fn with_kind(
        class_name: impl Into<JsString>,
        prototype: Option<ObjectRef>,
        kind: ObjectKind,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            prototype,
            properties: PropertyTable::new(),
            kind,
            link: None,
            snap: false,
            template: false,
            visiting: false,
        }
    }

    pub fn class_name(&self) -> &JsString {
        &self.class_name
    }

    pub fn prototype(&self) -> Option<&ObjectRef> {
        self.prototype.as_ref()
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    pub fn is_template(&self) -> bool {
        self.template
    }

    pub fn snaps(&self) -> bool {
        self.snap
    }

    pub(crate) fn set_snap(&mut self, snap: bool) {
        self.snap = snap;
    }

    /// Attributes of properties that exist by virtue of the object kind.
    fn virtual_property(&self, key: &str) -> Option<(JsValue, PropertyFlags)> {
        let by_kind = match &self.kind {
            ObjectKind::Array { length } if key == "length" => Some((
                JsValue::Number(*length as f64),
                PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
            )),
            ObjectKind::String(s) if key == "length" => {
                Some((JsValue::Number(s.utf16_len() as f64), PropertyFlags::CONSTANT))
            }
            ObjectKind::String(s) => convert::array_index(key)
                .and_then(|index| s.char_at(index as usize))
                .map(|unit| {
                    (
                        JsValue::String(unit),
                        PropertyFlags::READ_ONLY | PropertyFlags::DONT_DELETE,
                    )
                }),
            ObjectKind::Function(f) if key == "length" => {
                Some((JsValue::Number(f.arity() as f64), PropertyFlags::CONSTANT))
            }
            _ => None,
        };
        by_kind.or_else(|| match (&self.link, key) {
            (Some(IntrinsicLink::Prototype(proto)), "prototype") => {
                Some((JsValue::Object(proto.cheap_clone()), PropertyFlags::CONSTANT))
            }
            (Some(IntrinsicLink::Constructor(ctor)), "constructor") => {
                Some((JsValue::Object(ctor.cheap_clone()), PropertyFlags::HIDDEN))
            }
            _ => None,
        })
    }
}

/// Shared handle to an object
pub struct ObjectRef(Arc<RwLock<JsObject>>);

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        ObjectRef(Arc::clone(&self.0))
    }
}

impl CheapClone for ObjectRef {}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        ObjectRef::ptr_eq(self, other)
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_read() {
            Some(obj) => match &obj.kind {
                ObjectKind::Function(func) => {
                    write!(f, "[Function: {}]", func.name().as_str())
                }
                ObjectKind::Array { length } => write!(f, "[Array({})]", length),
                kind => write!(f, "[object {} ({})]", obj.class_name, kind.name()),
            },
            None => write!(f, "[object <locked>]"),
        }
    }
}

impl ObjectRef {
    pub fn new(obj: JsObject) -> Self {
        ObjectRef(Arc::new(RwLock::new(obj)))
    }

    pub fn borrow(&self) -> RwLockReadGuard<'_, JsObject> {
        self.0.read()
    }

    pub fn borrow_mut(&self) -> RwLockWriteGuard<'_, JsObject> {
        self.0.write()
    }

    pub fn ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Identity usable as a map key
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn class_name(&self) -> JsString {
        self.borrow().class_name.cheap_clone()
    }

    pub fn is_callable(&self) -> bool {
        match &self.borrow().kind {
            ObjectKind::Function(_) => true,
            ObjectKind::Host(host) => host.is_callable(),
            _ => false,
        }
    }

    pub fn function_name(&self) -> Option<JsString> {
        match &self.borrow().kind {
            ObjectKind::Function(f) => Some(f.name()),
            _ => None,
        }
    }

    pub fn array_length(&self) -> Option<u32> {
        match self.borrow().kind {
            ObjectKind::Array { length } => Some(length),
            _ => None,
        }
    }

    pub fn prototype(&self) -> Option<ObjectRef> {
        self.borrow().prototype.clone()
    }

    /// Replace the prototype, refusing to create a cycle.
    pub fn set_prototype(&self, prototype: Option<ObjectRef>) -> Result<(), JsError> {
        let mut cursor = prototype.clone();
        let mut depth = 0;
        while let Some(candidate) = cursor {
            if ObjectRef::ptr_eq(&candidate, self) {
                return Err(JsError::type_error("cyclic prototype chain"));
            }
            depth += 1;
            if depth > MAX_PROTOTYPE_DEPTH {
                return Err(JsError::type_error("prototype chain too deep"));
            }
            cursor = candidate.prototype();
        }
        let mut obj = self.borrow_mut();
        if obj.template {
            return Ok(());
        }
        obj.prototype = prototype;
        Ok(())
    }

    /// Realm wiring; the caller guarantees the chain stays acyclic.
    pub(crate) fn set_prototype_unchecked(&self, prototype: Option<ObjectRef>) {
        self.borrow_mut().prototype = prototype;
    }

    /// Own property, including the ones implied by the object kind.
    pub fn get_own_property(&self, key: &str) -> Result<Option<JsValue>, JsError> {
        let host = {
            let obj = self.borrow();
            if let Some(value) = obj.properties.get(key) {
                return Ok(Some(value.clone()));
            }
            if let Some((value, _)) = obj.virtual_property(key) {
                return Ok(Some(value));
            }
            match &obj.kind {
                ObjectKind::Host(host) => Some(host.clone()),
                ObjectKind::Function(Function::Closure(_)) if key == "prototype" => None,
                _ => return Ok(None),
            }
        };
        match host {
            Some(host) => host.get_property(key),
            None => self.materialize_prototype().map(Some),
        }
    }

    /// Attributes of an own property
    pub fn own_flags(&self, key: &str) -> Option<PropertyFlags> {
        let obj = self.borrow();
        obj.properties
            .flags(key)
            .or_else(|| obj.virtual_property(key).map(|(_, flags)| flags))
    }

    pub fn has_own_property(&self, key: &str) -> Result<bool, JsError> {
        Ok(self.get_own_property(key)?.is_some())
    }

    /// Chain lookup. `None` means no such property anywhere on the chain.
    ///
    /// A miss on a global object falls through to its realm's resolution
    /// order. When the queried object snaps, an inherited hit is copied
    /// into its own table as a hidden property.
    pub fn get_property(&self, key: &str) -> Result<Option<JsValue>, JsError> {
        if let Some(value) = self.get_own_property(key)? {
            return Ok(Some(value));
        }

        let (next, global, snap) = {
            let obj = self.borrow();
            let global = match &obj.kind {
                ObjectKind::Global(data) => Some(data.clone()),
                _ => None,
            };
            (obj.prototype.clone(), global, obj.snap)
        };

        let found = match global {
            Some(data) => data.resolve(key)?,
            None => Self::chain_lookup(next, key)?,
        };

        if snap {
            if let Some(value) = &found {
                tracing::trace!(key, "snap");
                self.put(string_dict::intern(key), value.clone(), PropertyFlags::HIDDEN);
            }
        }
        Ok(found)
    }

    fn chain_lookup(start: Option<ObjectRef>, key: &str) -> Result<Option<JsValue>, JsError> {
        let mut cursor = start;
        let mut depth = 0;
        while let Some(obj) = cursor {
            depth += 1;
            if depth > MAX_PROTOTYPE_DEPTH {
                return Err(JsError::type_error("prototype chain too deep"));
            }
            if obj.snaps() || obj.is_global() {
                return obj.get_property(key);
            }
            if let Some(value) = obj.get_own_property(key)? {
                return Ok(Some(value));
            }
            cursor = obj.prototype();
        }
        Ok(None)
    }

    fn snaps(&self) -> bool {
        self.borrow().snap
    }

    fn is_global(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Global(_))
    }

    /// `get_property` with a missing property read as undefined
    pub fn get(&self, key: &str) -> Result<JsValue, JsError> {
        Ok(self.get_property(key)?.unwrap_or_default())
    }

    /// False when `key` is read-only here or on the nearest object of the
    /// chain that has it.
    pub fn can_put(&self, key: &str) -> bool {
        let mut cursor = Some(self.cheap_clone());
        let mut depth = 0;
        while let Some(obj) = cursor {
            if let Some(flags) = obj.own_flags(key) {
                return !flags.is_read_only();
            }
            depth += 1;
            if depth > MAX_PROTOTYPE_DEPTH {
                return true;
            }
            cursor = obj.prototype();
        }
        true
    }

    /// Plain assignment (`obj[key] = value`).
    ///
    /// Read-only targets, inherited read-only properties and writes to
    /// gold templates are silent no-ops.
    pub fn set_property(&self, key: JsString, value: JsValue) -> Result<(), JsError> {
        let (watcher, host, template) = {
            let obj = self.borrow();
            let host = match &obj.kind {
                ObjectKind::Host(host) => Some(host.clone()),
                _ => None,
            };
            (obj.properties.watcher(key.as_str()), host, obj.template)
        };
        if template {
            return Ok(());
        }

        let value = match watcher {
            Some(handler) => {
                let old = self.get_own_property(key.as_str())?.unwrap_or_default();
                let this = JsValue::Object(self.cheap_clone());
                call::with_frame(|call| {
                    call.invoke(&handler, this, &[JsValue::String(key.cheap_clone()), old, value])
                })?
            }
            None => value,
        };

        if let Some(host) = host {
            if host.set_property(key.as_str(), &value)? {
                return Ok(());
            }
        }

        if self.array_length().is_some() && key.as_str() == "length" {
            let requested = value.to_number()?;
            let length = convert::to_uint32(requested);
            let length = if length as f64 == requested { length } else { 0 };
            self.set_array_length(length);
            return Ok(());
        }

        let inherited_read_only = {
            let obj = self.borrow();
            if let Some((_, flags)) = obj.virtual_property(key.as_str()) {
                if flags.is_read_only() {
                    return Ok(());
                }
            }
            if let ObjectKind::Global(data) = &obj.kind {
                if data.is_constant(key.as_str()) {
                    return Ok(());
                }
            }
            if obj.properties.contains(key.as_str()) {
                None
            } else {
                obj.prototype.clone()
            }
        };
        if let Some(proto) = inherited_read_only {
            if !proto.can_put(key.as_str()) {
                return Ok(());
            }
        }

        let mut obj = self.borrow_mut();
        let outcome = obj.properties.set(&key, value);
        if outcome == SetOutcome::ReadOnly {
            return Ok(());
        }
        if let ObjectKind::Array { length } = &mut obj.kind {
            if let Some(index) = convert::array_index(key.as_str()) {
                if index >= *length {
                    *length = index + 1;
                }
            }
        }
        Ok(())
    }

    /// Define an own property with explicit attributes, ignoring read-only.
    pub fn put(&self, key: impl Into<JsString>, value: JsValue, flags: PropertyFlags) {
        let key = key.into();
        let mut obj = self.borrow_mut();
        if obj.template {
            return;
        }
        obj.properties.define(&key, value, flags);
        if let ObjectKind::Array { length } = &mut obj.kind {
            if let Some(index) = convert::array_index(key.as_str()) {
                if index >= *length {
                    *length = index + 1;
                }
            }
        }
    }

    /// Bootstrap-time define, allowed before the object is sealed
    pub(crate) fn define_builtin(&self, key: &str, value: JsValue, flags: PropertyFlags) {
        self.put(string_dict::intern(key), value, flags);
    }

    /// `delete obj[key]`; false for DontDelete properties.
    pub fn delete_property(&self, key: &str) -> Result<bool, JsError> {
        let mut obj = self.borrow_mut();
        if obj.template {
            return Ok(false);
        }
        if !obj.properties.contains(key) {
            if let Some((_, flags)) = obj.virtual_property(key) {
                return Ok(flags.is_deletable());
            }
        }
        Ok(obj.properties.delete(key))
    }

    /// Truncate or extend an array, dropping indices at or past `length`.
    pub fn set_array_length(&self, length: u32) {
        let mut obj = self.borrow_mut();
        let ObjectKind::Array { length: current } = obj.kind else {
            return;
        };
        if length < current {
            let doomed: Vec<JsString> = obj
                .properties
                .iter()
                .filter(|(name, _, _)| {
                    convert::array_index(name.as_str()).is_some_and(|index| index >= length)
                })
                .map(|(name, _, _)| name.cheap_clone())
                .collect();
            for name in doomed {
                obj.properties.delete(name.as_str());
            }
        }
        obj.kind = ObjectKind::Array { length };
    }

    pub fn watch(&self, key: JsString, handler: JsValue) {
        let mut obj = self.borrow_mut();
        if !obj.template {
            obj.properties.watch(&key, handler);
        }
    }

    pub fn unwatch(&self, key: &str) {
        let mut obj = self.borrow_mut();
        if !obj.template {
            obj.properties.unwatch(key);
        }
    }

    /// Enumerable own property names in slot order
    pub fn own_keys(&self) -> Vec<JsString> {
        let (mut keys, host) = {
            let obj = self.borrow();
            let host = match &obj.kind {
                ObjectKind::Host(host) => Some(host.clone()),
                _ => None,
            };
            (obj.properties.enumerable_keys(), host)
        };
        if let Some(host) = host {
            for name in host.keys() {
                if !keys.iter().any(|k| k.as_str() == name) {
                    keys.push(JsString::from(name));
                }
            }
        }
        keys
    }

    /// `for-in` order: own keys, then each prototype's, skipping hidden and
    /// already-seen names.
    pub fn enumerate(&self) -> Vec<JsString> {
        let mut seen: Vec<JsString> = Vec::new();
        let mut out = Vec::new();
        let mut cursor = Some(self.cheap_clone());
        let mut depth = 0;
        while let Some(obj) = cursor {
            depth += 1;
            if depth > MAX_PROTOTYPE_DEPTH {
                break;
            }
            let own: Vec<(JsString, bool)> = {
                let guard = obj.borrow();
                guard
                    .properties
                    .iter()
                    .map(|(name, _, flags)| (name.cheap_clone(), flags.is_enumerable()))
                    .collect()
            };
            for (name, enumerable) in own {
                if seen.contains(&name) {
                    continue;
                }
                if enumerable {
                    out.push(name.cheap_clone());
                }
                seen.push(name);
            }
            for name in obj.own_keys() {
                if !seen.contains(&name) {
                    out.push(name.cheap_clone());
                    seen.push(name);
                }
            }
            cursor = obj.prototype();
        }
        out
    }

    /// ToPrimitive for objects
    pub fn to_primitive(&self, hint: Hint) -> Result<JsValue, JsError> {
        let hint = match (hint, &self.borrow().kind) {
            (Hint::Default, ObjectKind::Date(_)) => Hint::String,
            (hint, _) => hint,
        };
        let order = if hint == Hint::String {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in order {
            let Some(method) = self.get_property(name)? else {
                continue;
            };
            if !method.is_callable() {
                continue;
            }
            let this = JsValue::Object(self.cheap_clone());
            let result = call::with_frame(|call| call.invoke(&method, this, &[]))?;
            if !result.is_object() {
                return Ok(result);
            }
        }
        Err(JsError::type_error("cannot convert object to primitive type"))
    }

    /// Invoke as a function; the frame holds `this` and the arguments.
    pub fn call(&self, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
        let (function, host) = {
            let obj = self.borrow();
            match &obj.kind {
                ObjectKind::Function(f) => (Some(f.clone()), None),
                ObjectKind::Host(host) => (None, Some(host.clone())),
                _ => (None, None),
            }
        };
        match (function, host) {
            (Some(Function::Native(native)), _) => native.op.call(call, argc),
            (Some(Function::Closure(closure)), _) => closure.invoke(self, call, argc),
            (None, Some(host)) if host.is_callable() => {
                let this = call.this_value();
                let args = call.args(argc);
                host.call(&this, &args)
            }
            _ => Err(JsError::not_a_function(
                JsValue::Object(self.cheap_clone()).describe(),
            )),
        }
    }

    /// Invoke as a constructor (`new`)
    pub fn construct(&self, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
        let function = match &self.borrow().kind {
            ObjectKind::Function(f) => Some(f.clone()),
            _ => None,
        };
        match function {
            Some(Function::Native(native)) => native.op.construct(call, argc),
            Some(Function::Closure(closure)) => {
                let realm = call.realm()?.clone();
                let prototype = match self.get_property("prototype")? {
                    Some(JsValue::Object(proto)) => proto,
                    _ => realm.intrinsics().object_prototype.cheap_clone(),
                };
                let instance = ObjectRef::new(JsObject::new("Object", Some(prototype)));
                call.set_this(JsValue::Object(instance.cheap_clone()));
                match closure.invoke(self, call, argc)? {
                    JsValue::Object(result) => Ok(JsValue::Object(result)),
                    _ => Ok(JsValue::Object(instance)),
                }
            }
            None => Err(JsError::not_a_constructor(
                JsValue::Object(self.cheap_clone()).describe(),
            )),
        }
    }

    /// Lazily create a closure's `prototype` object with its back-link.
    fn materialize_prototype(&self) -> Result<JsValue, JsError> {
        let realm = Realm::current_or_err()?;
        let proto = realm.create_object();
        proto.put(
            string_dict::intern("constructor"),
            JsValue::Object(self.cheap_clone()),
            PropertyFlags::HIDDEN,
        );
        let mut obj = self.borrow_mut();
        if let Some(existing) = obj.properties.get("prototype") {
            return Ok(existing.clone());
        }
        let value = JsValue::Object(proto);
        obj.properties.define(
            &string_dict::intern("prototype"),
            value.clone(),
            PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
        );
        Ok(value)
    }

    /// Clone for a new realm, sharing the property table copy-on-write.
    ///
    /// The copy keeps this object's prototype and class; the realm rewires
    /// prototypes and intrinsic links afterwards.
    pub fn resin_copy(&self) -> ObjectRef {
        let mut src = self.borrow_mut();
        let properties = src.properties.share();
        ObjectRef::new(JsObject {
            class_name: src.class_name.cheap_clone(),
            prototype: src.prototype.clone(),
            properties,
            kind: src.kind.clone(),
            link: None,
            snap: src.snap,
            template: false,
            visiting: false,
        })
    }

    /// Freeze a gold-realm object.
    pub(crate) fn seal_template(&self) {
        let mut obj = self.borrow_mut();
        obj.properties.set_clean();
        obj.template = true;
    }

    pub(crate) fn set_link(&self, link: IntrinsicLink) {
        self.borrow_mut().link = Some(link);
    }

    /// Mark for recursion guards; false if already marked.
    pub(crate) fn begin_visit(&self) -> bool {
        let mut obj = self.borrow_mut();
        if obj.visiting {
            return false;
        }
        obj.visiting = true;
        true
    }

    pub(crate) fn end_visit(&self) {
        self.borrow_mut().visiting = false;
    }

    /// Objects directly reachable from this one
    pub(crate) fn children(&self) -> Vec<ObjectRef> {
        let obj = self.borrow();
        let mut out = Vec::new();
        if let Some(proto) = &obj.prototype {
            out.push(proto.cheap_clone());
        }
        match &obj.link {
            Some(IntrinsicLink::Prototype(o) | IntrinsicLink::Constructor(o)) => {
                out.push(o.cheap_clone())
            }
            None => {}
        }
        for (_, value, _) in obj.properties.iter() {
            if let JsValue::Object(o) = value {
                out.push(o.cheap_clone());
            }
        }
        if let ObjectKind::Function(Function::Closure(closure)) = &obj.kind {
            for value in closure.scope().iter() {
                if let JsValue::Object(o) = value {
                    out.push(o.cheap_clone());
                }
            }
        }
        out
    }

    /// Release everything this object references.
    pub(crate) fn clear_for_teardown(&self) {
        let mut obj = self.borrow_mut();
        if obj.template {
            return;
        }
        obj.properties.clear();
        obj.prototype = None;
        obj.link = None;
        if matches!(
            obj.kind,
            ObjectKind::Function(Function::Closure(_)) | ObjectKind::Global(_) | ObjectKind::Host(_)
        ) {
            obj.kind = ObjectKind::Ordinary;
        }
    }
}
