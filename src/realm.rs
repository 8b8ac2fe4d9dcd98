//! Realms: the gold master and its per-execution clones.
//!
//! The gold realm is built once per process and holds every built-in
//! constructor, prototype and native function. It is sealed after
//! bootstrap: gold objects drop writes. Each [`Realm`] clones the
//! constructors and prototypes out of gold with copy-on-write property
//! tables, so a script that patches `Array.prototype` only patches its own
//! realm's copy.
//!
//! The realm an execution runs in is published through a thread-local
//! binding held by a [`RealmGuard`]; native code recovers it with
//! [`Realm::current`].

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, OnceLock, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;

use crate::builtins::date::Calendar;
use crate::builtins::{self, Builder, Intrinsic};
use crate::call::{self, Call};
use crate::config::EngineConfig;
use crate::error::JsError;
use crate::function::{Closure, Function};
use crate::object::{JsObject, ObjectKind, ObjectRef};
use crate::platform::{RandomProvider, StdRandomProvider, StdTimeProvider, TimeProvider};
use crate::property::PropertyFlags;
use crate::string_dict;
use crate::value::{CheapClone, JsString, JsValue};

/// Built-in constructors and prototypes of one realm
#[derive(Clone)]
pub struct Intrinsics {
    pub object_prototype: ObjectRef,
    pub object_constructor: ObjectRef,
    pub function_prototype: ObjectRef,
    pub function_constructor: ObjectRef,
    pub array_prototype: ObjectRef,
    pub array_constructor: ObjectRef,
    pub string_prototype: ObjectRef,
    pub string_constructor: ObjectRef,
    pub boolean_prototype: ObjectRef,
    pub boolean_constructor: ObjectRef,
    pub number_prototype: ObjectRef,
    pub number_constructor: ObjectRef,
    pub date_prototype: ObjectRef,
    pub date_constructor: ObjectRef,
    pub math: ObjectRef,
}

impl Intrinsics {
    /// Constructor bound to a global name
    fn by_name(&self, name: &str) -> Option<&ObjectRef> {
        Some(match name {
            "Object" => &self.object_constructor,
            "Function" => &self.function_constructor,
            "Array" => &self.array_constructor,
            "String" => &self.string_constructor,
            "Boolean" => &self.boolean_constructor,
            "Number" => &self.number_constructor,
            "Date" => &self.date_constructor,
            "Math" => &self.math,
            _ => return None,
        })
    }

    fn roots(&self) -> [&ObjectRef; 15] {
        [
            &self.object_prototype,
            &self.object_constructor,
            &self.function_prototype,
            &self.function_constructor,
            &self.array_prototype,
            &self.array_constructor,
            &self.string_prototype,
            &self.string_constructor,
            &self.boolean_prototype,
            &self.boolean_constructor,
            &self.number_prototype,
            &self.number_constructor,
            &self.date_prototype,
            &self.date_constructor,
            &self.math,
        ]
    }
}

/// The RegExp pair, built on first use
#[derive(Clone)]
pub struct RegExpIntrinsics {
    pub prototype: ObjectRef,
    pub constructor: ObjectRef,
}

/// The process-wide template every realm is cloned from
struct GoldRealm {
    intrinsics: Intrinsics,
    regexp: RegExpIntrinsics,
    /// Global functions and constants (`parseInt`, `NaN`, ...)
    globals: ObjectRef,
}

static GOLD: LazyLock<GoldRealm> = LazyLock::new(GoldRealm::bootstrap);

static NEXT_REALM_ID: AtomicU64 = AtomicU64::new(1);

impl GoldRealm {
    fn bootstrap() -> GoldRealm {
        tracing::debug!("bootstrapping gold realm");
        let object_prototype = ObjectRef::new(JsObject::new("Object", None));
        let function_prototype = ObjectRef::new(JsObject::with_kind(
            "Function",
            Some(object_prototype.cheap_clone()),
            ObjectKind::Function(Function::Native(builtins::function::empty())),
        ));
        let b = Builder::new(object_prototype.cheap_clone(), function_prototype.cheap_clone());

        let object_constructor = builtins::object::init(&b);
        let function_constructor = builtins::function::init(&b);
        let array = builtins::array::init(&b);
        let string = builtins::string::init(&b);
        let boolean = builtins::boolean::init(&b);
        let number = builtins::number::init(&b);
        let date = builtins::date::init(&b);
        let regexp = builtins::regexp::init(&b);
        let math = builtins::math::init(&b);
        let globals = builtins::global::init(&b);

        let gold = GoldRealm {
            intrinsics: Intrinsics {
                object_prototype,
                object_constructor,
                function_prototype,
                function_constructor,
                array_prototype: array.prototype,
                array_constructor: array.constructor,
                string_prototype: string.prototype,
                string_constructor: string.constructor,
                boolean_prototype: boolean.prototype,
                boolean_constructor: boolean.constructor,
                number_prototype: number.prototype,
                number_constructor: number.constructor,
                date_prototype: date.prototype,
                date_constructor: date.constructor,
                math,
            },
            regexp: RegExpIntrinsics {
                prototype: regexp.prototype,
                constructor: regexp.constructor,
            },
            globals,
        };

        let mut roots: Vec<ObjectRef> = gold.intrinsics.roots().into_iter().cloned().collect();
        roots.push(gold.regexp.prototype.cheap_clone());
        roots.push(gold.regexp.constructor.cheap_clone());
        roots.push(gold.globals.cheap_clone());
        let sealed = reachable(&roots);
        for obj in &sealed {
            obj.seal_template();
        }
        tracing::debug!(objects = sealed.len(), "gold realm sealed");
        gold
    }
}

/// Every object reachable from `roots`, each once
fn reachable(roots: &[ObjectRef]) -> Vec<ObjectRef> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    let mut queue: Vec<ObjectRef> = roots.to_vec();
    while let Some(obj) = queue.pop() {
        if !seen.insert(obj.id()) {
            continue;
        }
        queue.extend(obj.children());
        out.push(obj);
    }
    out
}

/// Clone a constructor/prototype pair out of gold and re-link it.
fn clone_pair(
    gold: &Intrinsic,
    object_prototype: &ObjectRef,
    function_prototype: &ObjectRef,
) -> Intrinsic {
    let prototype = gold.prototype.resin_copy();
    prototype.set_prototype_unchecked(Some(object_prototype.cheap_clone()));
    let constructor = gold.constructor.resin_copy();
    constructor.set_prototype_unchecked(Some(function_prototype.cheap_clone()));
    builtins::link(&constructor, &prototype);
    Intrinsic {
        constructor,
        prototype,
    }
}

fn clone_intrinsics(gold: &Intrinsics) -> Intrinsics {
    let object_prototype = gold.object_prototype.resin_copy();
    object_prototype.set_prototype_unchecked(None);
    let function_prototype = gold.function_prototype.resin_copy();
    function_prototype.set_prototype_unchecked(Some(object_prototype.cheap_clone()));

    let object_constructor = gold.object_constructor.resin_copy();
    object_constructor.set_prototype_unchecked(Some(function_prototype.cheap_clone()));
    builtins::link(&object_constructor, &object_prototype);

    let function_constructor = gold.function_constructor.resin_copy();
    function_constructor.set_prototype_unchecked(Some(function_prototype.cheap_clone()));
    builtins::link(&function_constructor, &function_prototype);

    let pair = |ctor: &ObjectRef, proto: &ObjectRef| {
        clone_pair(
            &Intrinsic {
                constructor: ctor.cheap_clone(),
                prototype: proto.cheap_clone(),
            },
            &object_prototype,
            &function_prototype,
        )
    };
    let array = pair(&gold.array_constructor, &gold.array_prototype);
    let string = pair(&gold.string_constructor, &gold.string_prototype);
    let boolean = pair(&gold.boolean_constructor, &gold.boolean_prototype);
    let number = pair(&gold.number_constructor, &gold.number_prototype);
    let date = pair(&gold.date_constructor, &gold.date_prototype);

    let math = gold.math.resin_copy();
    math.set_prototype_unchecked(Some(object_prototype.cheap_clone()));

    Intrinsics {
        object_prototype,
        object_constructor,
        function_constructor,
        function_prototype,
        array_prototype: array.prototype,
        array_constructor: array.constructor,
        string_prototype: string.prototype,
        string_constructor: string.constructor,
        boolean_prototype: boolean.prototype,
        boolean_constructor: boolean.constructor,
        number_prototype: number.prototype,
        number_constructor: number.constructor,
        date_prototype: date.prototype,
        date_constructor: date.constructor,
        math,
    }
}

/// Resolution state carried by a realm's global object.
///
/// A name missing from the global's own table resolves, in order, to a
/// built-in constructor, then through the host prototype (or
/// `Object.prototype` when there is none), then to a host property, and
/// last to a global function or constant (`parseInt`, `NaN`, ...).
#[derive(Clone)]
pub struct GlobalData {
    realm: Weak<RealmInner>,
    host_prototype: Option<ObjectRef>,
}

impl GlobalData {
    pub(crate) fn resolve(&self, key: &str) -> Result<Option<JsValue>, JsError> {
        let Some(inner) = self.realm.upgrade() else {
            return Ok(None);
        };
        if let Some(ctor) = inner.intrinsics.by_name(key) {
            return Ok(Some(JsValue::Object(ctor.cheap_clone())));
        }
        if key == "RegExp" {
            let regexp = inner.regexp();
            return Ok(Some(JsValue::Object(regexp.constructor.cheap_clone())));
        }
        let inherited = match &self.host_prototype {
            Some(proto) => proto.get_property(key)?,
            None => inner.intrinsics.object_prototype.get_property(key)?,
        };
        if inherited.is_some() {
            return Ok(inherited);
        }
        if let Some(value) = inner.host_properties.read().get(key) {
            return Ok(Some(value.clone()));
        }
        GOLD.globals.get_own_property(key)
    }

    /// True for the read-only global constants (`NaN`, `Infinity`, `undefined`)
    pub(crate) fn is_constant(&self, key: &str) -> bool {
        GOLD.globals
            .own_flags(key)
            .is_some_and(|flags| flags.is_read_only())
    }
}

pub struct RealmInner {
    id: u64,
    config: EngineConfig,
    global: ObjectRef,
    intrinsics: Intrinsics,
    regexp: OnceLock<RegExpIntrinsics>,
    host_properties: RwLock<IndexMap<JsString, JsValue>>,
    calendar: Mutex<Calendar>,
    time: Arc<dyn TimeProvider>,
    random: Mutex<Box<dyn RandomProvider>>,
}

impl RealmInner {
    fn regexp(&self) -> &RegExpIntrinsics {
        self.regexp.get_or_init(|| {
            tracing::debug!(realm = self.id, "initializing RegExp");
            let pair = clone_pair(
                &Intrinsic {
                    constructor: GOLD.regexp.constructor.cheap_clone(),
                    prototype: GOLD.regexp.prototype.cheap_clone(),
                },
                &self.intrinsics.object_prototype,
                &self.intrinsics.function_prototype,
            );
            RegExpIntrinsics {
                prototype: pair.prototype,
                constructor: pair.constructor,
            }
        })
    }
}

/// Shared handle to one realm
#[derive(Clone)]
pub struct Realm(Arc<RealmInner>);

thread_local! {
    static CURRENT: RefCell<Vec<Realm>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a realm bound as this thread's current realm until dropped.
///
/// Guards nest; dropping one restores the realm that was current before.
pub struct RealmGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for RealmGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Options for [`Realm::new`]
pub struct RealmOptions {
    pub config: EngineConfig,
    pub host_prototype: Option<ObjectRef>,
    pub time: Arc<dyn TimeProvider>,
    pub random: Box<dyn RandomProvider>,
}

impl Default for RealmOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            host_prototype: None,
            time: Arc::new(StdTimeProvider::new()),
            random: Box::new(StdRandomProvider::new()),
        }
    }
}

impl Realm {
    /// Clone a fresh realm from the gold master.
    pub fn new(options: RealmOptions) -> Realm {
        let id = NEXT_REALM_ID.fetch_add(1, Ordering::Relaxed);
        let intrinsics = clone_intrinsics(&GOLD.intrinsics);
        let RealmOptions {
            config,
            host_prototype,
            time,
            random,
        } = options;

        let inner = Arc::new_cyclic(|weak: &Weak<RealmInner>| {
            let proto = host_prototype
                .clone()
                .unwrap_or_else(|| intrinsics.object_prototype.cheap_clone());
            let global = ObjectRef::new(JsObject::with_kind(
                "Global",
                Some(proto),
                ObjectKind::Global(GlobalData {
                    realm: weak.clone(),
                    host_prototype,
                }),
            ));
            global.borrow_mut().set_snap(config.snap_globals);
            RealmInner {
                id,
                config,
                global,
                intrinsics,
                regexp: OnceLock::new(),
                host_properties: RwLock::new(IndexMap::new()),
                calendar: Mutex::new(Calendar::new()),
                time,
                random: Mutex::new(random),
            }
        });
        tracing::debug!(realm = id, "realm created");
        Realm(inner)
    }

    /// The realm bound to this thread, if any
    pub fn current() -> Option<Realm> {
        CURRENT.with(|stack| stack.borrow().last().cloned())
    }

    pub fn current_or_err() -> Result<Realm, JsError> {
        Realm::current().ok_or_else(|| JsError::internal_error("no realm is active on this thread"))
    }

    /// Bind this realm to the current thread.
    pub fn enter(&self) -> RealmGuard {
        call::configure_thread_pool(&self.0.config);
        CURRENT.with(|stack| stack.borrow_mut().push(self.clone()));
        RealmGuard {
            _not_send: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn ptr_eq(a: &Realm, b: &Realm) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn global(&self) -> &ObjectRef {
        &self.0.global
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.0.intrinsics
    }

    /// The RegExp constructor and prototype, cloned on first access
    pub fn regexp(&self) -> &RegExpIntrinsics {
        self.0.regexp()
    }

    pub fn regexp_initialized(&self) -> bool {
        self.0.regexp.get().is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.0.config
    }

    /// Bind a host-supplied global. Script assignments to the same name
    /// shadow it on the global object.
    pub fn define_host_property(&self, name: impl Into<JsString>, value: JsValue) {
        self.0.host_properties.write().insert(name.into(), value);
    }

    pub(crate) fn calendar(&self) -> &Mutex<Calendar> {
        &self.0.calendar
    }

    pub fn now_millis(&self) -> f64 {
        self.0.time.now_millis()
    }

    pub fn random(&self) -> f64 {
        self.0.random.lock().random()
    }

    pub fn create_object(&self) -> ObjectRef {
        self.create_object_with_proto(Some(self.0.intrinsics.object_prototype.cheap_clone()))
    }

    pub fn create_object_with_proto(&self, prototype: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::new(JsObject::new("Object", prototype))
    }

    pub fn create_array(&self, elements: Vec<JsValue>) -> ObjectRef {
        let array = ObjectRef::new(JsObject::with_kind(
            "Array",
            Some(self.0.intrinsics.array_prototype.cheap_clone()),
            ObjectKind::Array { length: 0 },
        ));
        for (i, value) in elements.into_iter().enumerate() {
            array.put(string_dict::index_name(i as u32), value, PropertyFlags::EMPTY);
        }
        array
    }

    pub fn create_date(&self, time: f64) -> ObjectRef {
        ObjectRef::new(JsObject::with_kind(
            "Date",
            Some(self.0.intrinsics.date_prototype.cheap_clone()),
            ObjectKind::Date(time),
        ))
    }

    pub fn create_closure(&self, closure: Closure) -> ObjectRef {
        ObjectRef::new(JsObject::with_kind(
            "Function",
            Some(self.0.intrinsics.function_prototype.cheap_clone()),
            ObjectKind::Function(Function::Closure(closure)),
        ))
    }

    /// The `arguments` object of a closure invocation
    pub fn create_arguments(&self, callee: &ObjectRef, args: &[JsValue]) -> ObjectRef {
        let arguments = ObjectRef::new(JsObject::with_kind(
            "Arguments",
            Some(self.0.intrinsics.object_prototype.cheap_clone()),
            ObjectKind::Arguments,
        ));
        arguments.put(
            string_dict::intern("callee"),
            JsValue::Object(callee.cheap_clone()),
            PropertyFlags::HIDDEN,
        );
        arguments.put(
            string_dict::intern("length"),
            JsValue::Number(args.len() as f64),
            PropertyFlags::HIDDEN,
        );
        for (i, value) in args.iter().enumerate() {
            arguments.put(string_dict::index_name(i as u32), value.clone(), PropertyFlags::EMPTY);
        }
        arguments
    }

    /// ToObject for primitives
    pub fn wrap_primitive(&self, value: &JsValue) -> Result<ObjectRef, JsError> {
        let intrinsics = &self.0.intrinsics;
        let (class, prototype, kind) = match value {
            JsValue::Object(obj) => return Ok(obj.cheap_clone()),
            JsValue::Undefined | JsValue::Null => {
                return Err(JsError::type_error(format!(
                    "{} has no properties",
                    value.describe()
                )));
            }
            JsValue::Boolean(b) => ("Boolean", &intrinsics.boolean_prototype, ObjectKind::Boolean(*b)),
            JsValue::Number(n) => ("Number", &intrinsics.number_prototype, ObjectKind::Number(*n)),
            JsValue::String(s) => (
                "String",
                &intrinsics.string_prototype,
                ObjectKind::String(s.cheap_clone()),
            ),
        };
        Ok(ObjectRef::new(JsObject::with_kind(
            class,
            Some(prototype.cheap_clone()),
            kind,
        )))
    }

    /// Run `f` with this realm current, in a pooled frame bound to it.
    pub fn with_call<R>(&self, f: impl FnOnce(&mut Call) -> Result<R, JsError>) -> Result<R, JsError> {
        let _guard = self.enter();
        call::with_frame(f)
    }

    /// Break the reference cycles reachable from this realm.
    ///
    /// Script objects point at each other and at the realm's prototypes
    /// through shared handles; clearing every reachable object lets them be
    /// freed once the last handle is gone. Gold objects are left alone.
    pub fn teardown(&self) {
        let mut roots: Vec<ObjectRef> = vec![self.0.global.cheap_clone()];
        roots.extend(self.0.intrinsics.roots().into_iter().cloned());
        roots.extend(
            self.0
                .host_properties
                .read()
                .values()
                .filter_map(JsValue::as_object)
                .cloned(),
        );
        if let Some(regexp) = self.0.regexp.get() {
            roots.push(regexp.prototype.cheap_clone());
            roots.push(regexp.constructor.cheap_clone());
        }
        let objects = reachable(&roots);
        tracing::debug!(realm = self.0.id, objects = objects.len(), "realm teardown");
        for obj in &objects {
            obj.clear_for_teardown();
        }
        self.0.host_properties.write().clear();
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm").field("id", &self.0.id).finish()
    }
}
