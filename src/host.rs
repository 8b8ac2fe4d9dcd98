//! Host value marshalling.
//!
//! Host data enters a realm either as plain JSON, which becomes ordinary
//! objects and arrays, or as a [`HostObject`] trait object, which stays
//! live and answers property reads, writes and calls itself.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::JsError;
use crate::object::{JsObject, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::string_dict;
use crate::value::{CheapClone, JsString, JsValue};

/// An object owned by the embedder and exposed to scripts
pub trait HostObject: Send + Sync {
    /// `[[Class]]` reported to scripts
    fn class_name(&self) -> &str {
        "Object"
    }

    /// Own property lookup; `None` falls through to the prototype chain.
    fn get_property(&self, key: &str) -> Result<Option<JsValue>, JsError>;

    /// Handle an assignment. Returning `false` stores the value as an
    /// ordinary own property of the wrapper instead.
    fn set_property(&self, _key: &str, _value: &JsValue) -> Result<bool, JsError> {
        Ok(false)
    }

    /// Enumerable names, reported after the wrapper's own properties
    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_callable(&self) -> bool {
        false
    }

    fn call(&self, _this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
        Err(JsError::not_a_function(self.class_name()))
    }
}

/// A value handed to the engine by the embedder
#[derive(Clone)]
pub enum HostValue {
    Json(serde_json::Value),
    Object(Arc<dyn HostObject>),
}

impl From<serde_json::Value> for HostValue {
    fn from(value: serde_json::Value) -> Self {
        HostValue::Json(value)
    }
}

impl From<Arc<dyn HostObject>> for HostValue {
    fn from(value: Arc<dyn HostObject>) -> Self {
        HostValue::Object(value)
    }
}

impl std::fmt::Debug for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
            HostValue::Object(host) => write!(f, "Object([{}])", host.class_name()),
        }
    }
}

/// Convert a host value into a script value owned by `realm`.
pub fn wrap(realm: &Realm, value: &HostValue) -> JsValue {
    match value {
        HostValue::Json(json) => json_to_value(realm, json),
        HostValue::Object(host) => JsValue::Object(wrap_object(realm, host.clone())),
    }
}

/// Wrap a host object so scripts see it as an object of its class.
pub fn wrap_object(realm: &Realm, host: Arc<dyn HostObject>) -> ObjectRef {
    let prototype = if host.is_callable() {
        &realm.intrinsics().function_prototype
    } else {
        &realm.intrinsics().object_prototype
    };
    let class_name = JsString::from(host.class_name());
    ObjectRef::new(JsObject::with_kind(
        class_name,
        Some(prototype.cheap_clone()),
        ObjectKind::Host(host),
    ))
}

/// Build plain objects and arrays from JSON.
pub fn json_to_value(realm: &Realm, json: &serde_json::Value) -> JsValue {
    match json {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Boolean(*b),
        serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsValue::String(JsString::from(s.as_str())),
        serde_json::Value::Array(items) => {
            let elements = items.iter().map(|item| json_to_value(realm, item)).collect();
            JsValue::Object(realm.create_array(elements))
        }
        serde_json::Value::Object(map) => {
            let obj = realm.create_object();
            for (key, value) in map {
                obj.put(
                    string_dict::intern(key),
                    json_to_value(realm, value),
                    crate::property::PropertyFlags::EMPTY,
                );
            }
            JsValue::Object(obj)
        }
    }
}

/// Convert a script value back into JSON.
///
/// Functions become `null`, as do non-finite numbers and `undefined`.
/// Object properties holding `undefined` are skipped. A cycle is a
/// TypeError.
pub fn unwrap(value: &JsValue) -> Result<serde_json::Value, JsError> {
    let mut visited = HashSet::new();
    unwrap_with_visited(value, &mut visited)
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 && !(n == 0.0 && n.is_sign_negative())
    {
        return serde_json::Value::Number(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn unwrap_with_visited(
    value: &JsValue,
    visited: &mut HashSet<usize>,
) -> Result<serde_json::Value, JsError> {
    let obj = match value {
        JsValue::Undefined | JsValue::Null => return Ok(serde_json::Value::Null),
        JsValue::Boolean(b) => return Ok(serde_json::Value::Bool(*b)),
        JsValue::Number(n) => return Ok(number_to_json(*n)),
        JsValue::String(s) => return Ok(serde_json::Value::String(s.to_string())),
        JsValue::Object(obj) => obj,
    };

    let primitive = match &obj.borrow().kind {
        ObjectKind::Function(_) => Some(serde_json::Value::Null),
        ObjectKind::Host(host) if host.is_callable() => Some(serde_json::Value::Null),
        ObjectKind::Boolean(b) => Some(serde_json::Value::Bool(*b)),
        ObjectKind::Number(n) => Some(number_to_json(*n)),
        ObjectKind::String(s) => Some(serde_json::Value::String(s.to_string())),
        ObjectKind::Date(t) => Some(date_to_json(*t)),
        _ => None,
    };
    if let Some(primitive) = primitive {
        return Ok(primitive);
    }

    let id = obj.id();
    if !visited.insert(id) {
        return Err(JsError::type_error("cannot unwrap a cyclic structure"));
    }

    let result = match obj.array_length() {
        Some(length) => {
            let mut items = Vec::with_capacity(length as usize);
            for i in 0..length {
                let element = obj.get(string_dict::index_name(i).as_str())?;
                items.push(unwrap_with_visited(&element, visited)?);
            }
            serde_json::Value::Array(items)
        }
        None => {
            let mut map = serde_json::Map::new();
            for key in obj.own_keys() {
                let property = obj.get(key.as_str())?;
                if property.is_undefined() {
                    continue;
                }
                map.insert(key.to_string(), unwrap_with_visited(&property, visited)?);
            }
            serde_json::Value::Object(map)
        }
    };

    visited.remove(&id);
    Ok(result)
}

fn date_to_json(time: f64) -> serde_json::Value {
    if !time.is_finite() {
        return serde_json::Value::Null;
    }
    match chrono::DateTime::<chrono::Utc>::from_timestamp_millis(time as i64) {
        Some(datetime) => serde_json::Value::String(
            datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        ),
        None => serde_json::Value::Null,
    }
}
