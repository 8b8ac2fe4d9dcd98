//! Realm cloning, isolation, global resolution and teardown

use super::{call_str, new_realm, num, run, s};
use escore::platform::FixedTimeProvider;
use escore::{CheapClone, EngineConfig, JsString, JsValue, Realm, RealmOptions};
use std::sync::Arc;

#[test]
fn test_prototype_patch_is_realm_local() {
    let a = new_realm();
    let b = new_realm();
    a.intrinsics()
        .array_prototype
        .set_property(JsString::from("foo"), num(1.0))
        .unwrap();

    let _guard = a.enter();
    assert_eq!(a.intrinsics().array_prototype.get("foo").unwrap(), num(1.0));
    drop(_guard);

    let _guard = b.enter();
    assert_eq!(b.intrinsics().array_prototype.get_property("foo").unwrap(), None);
    drop(_guard);

    let c = new_realm();
    let _guard = c.enter();
    assert_eq!(c.intrinsics().array_prototype.get_property("foo").unwrap(), None);
    drop(_guard);

    a.teardown();
    b.teardown();
    c.teardown();
}

#[test]
fn test_overwritten_builtin_does_not_leak() {
    let a = new_realm();
    a.with_call(|call| {
        let proto = JsValue::Object(call.realm()?.intrinsics().array_prototype.cheap_clone());
        proto.set_property(JsString::from("join"), num(0.0))?;
        assert_eq!(proto.get("join")?, num(0.0));
        Ok(())
    })
    .unwrap();
    a.teardown();

    let joined = run(|call| {
        let array = call.new_scope("Array", &[num(1.0), num(2.0)])?;
        Ok(call_str(call, &array, "join", &[s("-")]))
    });
    assert_eq!(joined, "1-2");
}

#[test]
fn test_global_resolves_builtins_and_functions() {
    run(|call| {
        let global = call.global_object()?;
        assert!(global.get("Object")?.is_callable());
        assert!(global.get("Math")?.is_object());
        assert!(global.get("parseInt")?.is_callable());
        assert!(global.get("NaN")?.to_number()?.is_nan());
        assert_eq!(global.get("Infinity")?, num(f64::INFINITY));
        assert_eq!(global.get_property("undefined")?, Some(JsValue::Undefined));
        assert_eq!(global.get_property("noSuchGlobal")?, None);
        Ok(())
    });
}

#[test]
fn test_global_lookup_snaps_hidden_copy() {
    run(|call| {
        let global = call.global_object()?;
        assert!(!global.has_own_property("parseInt")?);
        global.get("parseInt")?;
        assert!(global.has_own_property("parseInt")?);
        let flags = global.own_flags("parseInt").unwrap();
        assert!(!flags.is_enumerable());
        assert!(!global.enumerate().iter().any(|k| k.as_str() == "parseInt"));
        Ok(())
    });
}

#[test]
fn test_snap_can_be_disabled() {
    let config = EngineConfig::default().with_snap_globals(false);
    let realm = Realm::new(RealmOptions {
        config,
        ..RealmOptions::default()
    });
    realm
        .with_call(|call| {
            let global = call.global_object()?;
            assert!(global.get("parseInt")?.is_callable());
            assert!(!global.has_own_property("parseInt")?);
            Ok(())
        })
        .unwrap();
    realm.teardown();
}

#[test]
fn test_global_assignment_shadows_builtin() {
    let a = new_realm();
    let b = new_realm();
    a.with_call(|call| {
        call.set_scope_property(JsString::from("Array"), num(5.0))?;
        assert_eq!(call.get_scope_property("Array")?, num(5.0));
        Ok(())
    })
    .unwrap();
    b.with_call(|call| {
        assert!(call.get_scope_property("Array")?.is_callable());
        Ok(())
    })
    .unwrap();
    a.teardown();
    b.teardown();
}

#[test]
fn test_global_constants_are_read_only() {
    run(|call| {
        let global = call.global_object()?;
        global.set_property(JsString::from("NaN"), num(1.0))?;
        assert!(global.get("NaN")?.to_number()?.is_nan());
        global.set_property(JsString::from("undefined"), num(1.0))?;
        assert_eq!(global.get("undefined")?, JsValue::Undefined);
        Ok(())
    });
}

#[test]
fn test_host_properties_resolve_after_builtins() {
    let realm = new_realm();
    realm.define_host_property("answer", num(42.0));
    realm.define_host_property("Array", num(5.0));
    realm
        .with_call(|call| {
            assert_eq!(call.get_scope_property("answer")?, num(42.0));
            assert!(call.get_scope_property("Array")?.is_callable());

            call.set_scope_property(JsString::from("answer"), num(1.0))?;
            assert_eq!(call.get_scope_property("answer")?, num(1.0));
            Ok(())
        })
        .unwrap();
    realm.teardown();
}

#[test]
fn test_regexp_is_initialized_on_first_use() {
    let realm = new_realm();
    assert!(!realm.regexp_initialized());
    realm
        .with_call(|call| {
            call.new_scope("Array", &[])?;
            Ok(())
        })
        .unwrap();
    assert!(!realm.regexp_initialized());
    realm
        .with_call(|call| {
            assert!(call.get_scope_property("RegExp")?.is_callable());
            Ok(())
        })
        .unwrap();
    assert!(realm.regexp_initialized());
    realm.teardown();
}

#[test]
fn test_current_realm_binding() {
    let realm = new_realm();
    assert!(Realm::current().is_none());
    realm
        .with_call(|call| {
            let current = Realm::current_or_err()?;
            assert!(Realm::ptr_eq(&current, &realm));
            assert!(Realm::ptr_eq(call.realm()?, &realm));
            Ok(())
        })
        .unwrap();
    assert!(Realm::current().is_none());
    assert!(Realm::current_or_err().is_err());
    realm.teardown();
}

#[test]
fn test_teardown_releases_script_objects() {
    let realm = new_realm();
    let obj = realm
        .with_call(|call| {
            let obj = call.realm()?.create_object();
            obj.set_property(JsString::from("x"), num(1.0))?;
            call.global_object()?
                .set_property(JsString::from("kept"), JsValue::Object(obj.cheap_clone()))?;
            Ok(obj)
        })
        .unwrap();
    realm.teardown();

    assert_eq!(obj.get_own_property("x").unwrap(), None);
    assert!(obj.prototype().is_none());

    let joined = run(|call| {
        let array = call.new_scope("Array", &[num(1.0), num(2.0)])?;
        Ok(call_str(call, &array, "join", &[]))
    });
    assert_eq!(joined, "1,2");
}

#[test]
fn test_realm_ids_are_unique() {
    let a = new_realm();
    let b = new_realm();
    assert_ne!(a.id(), b.id());
    assert!(!Realm::ptr_eq(&a, &b));
}

#[test]
fn test_realms_on_separate_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let realm = new_realm();
                let text = realm
                    .with_call(|call| {
                        let array = call.new_scope("Array", &[num(i as f64), num(2.0)])?;
                        let array_proto = &call.realm()?.intrinsics().array_prototype;
                        array_proto.set_property(JsString::from("tag"), num(i as f64))?;
                        Ok(call_str(call, &array, "join", &[s("+")]))
                    })
                    .unwrap();
                let tag = {
                    let _guard = realm.enter();
                    realm.intrinsics().array_prototype.get("tag").unwrap()
                };
                realm.teardown();
                (text, tag)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let (text, tag) = handle.join().unwrap();
        assert_eq!(text, format!("{}+2", i));
        assert_eq!(tag, num(i as f64));
    }
}

#[test]
fn test_fixed_clock() {
    let realm = Realm::new(RealmOptions {
        time: Arc::new(FixedTimeProvider(86_400_000.0)),
        ..RealmOptions::default()
    });
    assert_eq!(realm.now_millis(), 86_400_000.0);
    let t = realm
        .with_call(|call| {
            let date = call.new_scope("Date", &[])?;
            call.call_method(&date, "getTime", &[])
        })
        .unwrap();
    assert_eq!(t, num(86_400_000.0));
    realm.teardown();
}
