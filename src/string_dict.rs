//! String dictionary for deduplicating property-name strings.
//!
//! Built-in property names and the small array-index names `"0"` to `"127"`
//! are interned once per process, so every realm shares the same
//! `Arc<str>` for them.

use std::sync::LazyLock;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::value::{CheapClone, JsString};

/// Number of index names (`"0"`..`"127"`) kept pre-built
pub const INDEX_CACHE_SIZE: u32 = 128;

static DICT: LazyLock<Mutex<StringDict>> =
    LazyLock::new(|| Mutex::new(StringDict::with_common_strings()));

static INDEX_NAMES: LazyLock<Vec<JsString>> = LazyLock::new(|| {
    (0..INDEX_CACHE_SIZE)
        .map(|i| JsString::from(i.to_string()))
        .collect()
});

/// Intern `s` in the process-wide dictionary.
pub fn intern(s: &str) -> JsString {
    DICT.lock().get_or_insert(s)
}

/// The canonical name for array index `index`
pub fn index_name(index: u32) -> JsString {
    match INDEX_NAMES.get(index as usize) {
        Some(name) => name.cheap_clone(),
        None => JsString::from(index.to_string()),
    }
}

/// A dictionary for deduplicating JsString instances.
pub struct StringDict {
    strings: FxHashMap<Box<str>, JsString>,
}

impl StringDict {
    pub fn new() -> Self {
        Self {
            strings: FxHashMap::default(),
        }
    }

    /// Create a dictionary pre-populated with the built-in property names.
    pub fn with_common_strings() -> Self {
        let mut dict = Self::new();
        for s in COMMON_STRINGS {
            dict.get_or_insert(s);
        }
        dict
    }

    /// Get an existing string or insert a new one.
    pub fn get_or_insert(&mut self, s: &str) -> JsString {
        if let Some(existing) = self.strings.get(s) {
            return existing.cheap_clone();
        }
        let js_str = JsString::from(s);
        self.strings.insert(s.into(), js_str.cheap_clone());
        js_str
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringDict {
    fn default() -> Self {
        Self::new()
    }
}

const COMMON_STRINGS: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "toString",
    "valueOf",
    "arguments",
    "callee",
    "lastIndex",
    "source",
    "global",
    "ignoreCase",
    "multiline",
    "index",
    "input",
    "Object",
    "Function",
    "Array",
    "String",
    "Boolean",
    "Number",
    "Date",
    "Math",
    "RegExp",
    "NaN",
    "Infinity",
    "undefined",
];
