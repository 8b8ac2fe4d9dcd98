//! Call frames, closures, scope resolution and the frame pool

use super::{define, function, num, run, s, try_run};
use escore::call::{self, FramePool, FrameShape};
use escore::{CheapClone, EngineConfig, JsError, JsString, JsValue, Realm, RealmOptions};

#[test]
fn test_closure_binds_parameters() {
    let sum = run(|call| {
        let add = define(call, "add", &["a", "b"], |call, _argc| {
            let a = call.get_scope_property("a")?;
            let b = call.get_scope_property("b")?;
            a.add(&b)
        });
        call.invoke(&add, JsValue::Undefined, &[num(2.0), num(3.0)])
    });
    assert_eq!(sum, num(5.0));
}

#[test]
fn test_missing_parameters_are_undefined() {
    let missing = run(|call| {
        let f = function(call, &["a", "b"], |call, _argc| call.get_scope_property("b"));
        call.invoke(&f, JsValue::Undefined, &[num(1.0)])
    });
    assert_eq!(missing, JsValue::Undefined);
}

#[test]
fn test_arguments_object() {
    run(|call| {
        let f = function(call, &["a"], |call, _argc| call.get_scope_property("arguments"));
        let arguments = call.invoke(&f, JsValue::Undefined, &[num(1.0), s("two"), num(3.0)])?;
        let obj = arguments.as_object().unwrap();
        assert_eq!(obj.class_name().as_str(), "Arguments");
        assert_eq!(obj.get("length")?, num(3.0));
        assert_eq!(obj.get("1")?, s("two"));
        assert_eq!(obj.get("callee")?, f);
        assert!(!obj.enumerate().iter().any(|k| k.as_str() == "callee"));
        Ok(())
    });
}

#[test]
fn test_closure_captures_enclosing_scope() {
    run(|call| {
        let make = function(call, &["x"], |call, _argc| {
            Ok(super::function(call, &[], |call, _argc| {
                call.get_scope_property("x")
            }))
        });
        let first = call.invoke(&make, JsValue::Undefined, &[num(1.0)])?;
        let second = call.invoke(&make, JsValue::Undefined, &[num(2.0)])?;
        assert_eq!(call.invoke(&first, JsValue::Undefined, &[])?, num(1.0));
        assert_eq!(call.invoke(&second, JsValue::Undefined, &[])?, num(2.0));
        Ok(())
    });
}

#[test]
fn test_scope_assignment() {
    run(|call| {
        let f = function(call, &["a"], |call, _argc| {
            call.set_scope_property(JsString::from("a"), num(10.0))?;
            call.set_scope_property(JsString::from("leaked"), num(20.0))?;
            call.get_scope_property("a")
        });
        assert_eq!(call.invoke(&f, JsValue::Undefined, &[num(1.0)])?, num(10.0));
        assert_eq!(call.get_scope_property("leaked")?, num(20.0));
        assert_eq!(call.get_scope_property("a").unwrap_err().to_value(), s("ReferenceError: undefined variable `a'"));
        Ok(())
    });
}

#[test]
fn test_declared_variables_resist_delete() {
    run(|call| {
        call.declare(JsString::from("v"), num(1.0))?;
        assert_eq!(call.get_scope_property("v")?, num(1.0));
        assert!(!call.delete_scope_property("v")?);

        call.set_scope_property(JsString::from("w"), num(2.0))?;
        assert!(call.delete_scope_property("w")?);
        assert!(!call.has_scope_property("w")?);
        Ok(())
    });
}

#[test]
fn test_type_of_unresolved_name() {
    run(|call| {
        assert_eq!(call.scope_type_of("nowhere")?, "undefined");
        assert_eq!(call.scope_type_of("parseInt")?, "function");
        assert_eq!(call.scope_type_of("Math")?, "object");
        Ok(())
    });
}

#[test]
fn test_this_binding() {
    run(|call| {
        let f = function(call, &[], |call, _argc| Ok(call.this_value()));
        let obj = JsValue::Object(call.realm()?.create_object());
        assert_eq!(call.invoke(&f, obj.clone(), &[])?, obj);

        obj.set_property(JsString::from("m"), f.clone())?;
        assert_eq!(call.call_method(&obj, "m", &[])?, obj);

        let global = JsValue::Object(call.global_object()?);
        call.global_object()?.set_property(JsString::from("g"), f.clone())?;
        assert_eq!(call.call_scope("g", &[])?, global);
        Ok(())
    });
}

#[test]
fn test_function_call_and_apply() {
    run(|call| {
        let f = function(call, &[], |call, argc| {
            let this = call.this_value();
            let total = (0..argc).try_fold(0.0, |acc, i| {
                Ok::<f64, JsError>(acc + call.arg(i as isize).to_number()?)
            })?;
            let out = call.realm()?.create_array(vec![this, num(total)]);
            Ok(JsValue::Object(out))
        });
        let obj = JsValue::Object(call.realm()?.create_object());
        let global = JsValue::Object(call.global_object()?);

        let result = call.call_method(&f, "call", &[obj.clone(), num(1.0), num(2.0)])?;
        assert_eq!(result.get("0")?, obj);
        assert_eq!(result.get("1")?, num(3.0));

        let args = JsValue::Object(call.realm()?.create_array(vec![num(4.0), num(5.0), num(6.0)]));
        let result = call.call_method(&f, "apply", &[JsValue::Null, args])?;
        assert_eq!(result.get("0")?, global);
        assert_eq!(result.get("1")?, num(15.0));

        let result = call.call_method(&f, "apply", &[obj.clone()])?;
        assert_eq!(result.get("1")?, num(0.0));

        let bad = call.call_method(&f, "apply", &[obj, num(1.0)]).unwrap_err();
        assert!(matches!(bad, JsError::TypeError { .. }));
        Ok(())
    });
}

#[test]
fn test_native_call_with_borrowed_receiver() {
    run(|call| {
        let realm = call.realm()?.clone();
        let like = JsValue::Object(realm.create_object());
        like.set_property(JsString::from("length"), num(2.0))?;
        like.set_property(JsString::from("0"), s("a"))?;
        like.set_property(JsString::from("1"), s("b"))?;
        let join = realm.intrinsics().array_prototype.get("join")?;
        let joined = call.call_method(&join, "call", &[like, s("/")])?;
        assert_eq!(joined, s("a/b"));
        Ok(())
    });
}

#[test]
fn test_constructing_a_closure() {
    run(|call| {
        let point = define(call, "Point", &["x"], |call, _argc| {
            let x = call.get_scope_property("x")?;
            call.this_value().set_property(JsString::from("x"), x)?;
            Ok(JsValue::Undefined)
        });
        let p = call.new_scope("Point", &[num(3.0)])?;
        assert_eq!(p.get("x")?, num(3.0));

        let proto = point.get("prototype")?;
        assert_eq!(p.as_object().unwrap().prototype().map(JsValue::Object), Some(proto.clone()));
        assert_eq!(proto.get("constructor")?, point);
        assert_eq!(point.get("prototype")?, proto);

        proto.set_property(JsString::from("kind"), s("point"))?;
        assert_eq!(p.get("kind")?, s("point"));
        Ok(())
    });
}

#[test]
fn test_constructor_returning_object_wins() {
    run(|call| {
        let make = function(call, &[], |call, _argc| {
            let obj = call.realm()?.create_object();
            obj.set_property(JsString::from("own"), JsValue::Boolean(true))?;
            Ok(JsValue::Object(obj))
        });
        let made = call.construct(&make, &[])?;
        assert_eq!(made.get("own")?, JsValue::Boolean(true));
        Ok(())
    });
}

#[test]
fn test_function_metadata() {
    run(|call| {
        let f = define(call, "pair", &["a", "b"], |_call, _argc| Ok(JsValue::Undefined));
        assert_eq!(f.get("length")?, num(2.0));
        let text = call.call_method(&f, "toString", &[])?;
        assert!(text.as_str().unwrap().starts_with("function pair(a, b)"));

        let parse_int = call.get_scope_property("parseInt")?;
        assert_eq!(parse_int.get("length")?, num(2.0));
        let text = call.call_method(&parse_int, "toString", &[])?;
        assert!(text.as_str().unwrap().contains("native code"));
        Ok(())
    });
}

#[test]
fn test_unknown_name_is_reference_error() {
    let err = try_run(|call| call.call_scope("missingFunction", &[])).unwrap_err();
    match err {
        JsError::ReferenceError { name, .. } => assert_eq!(name, "missingFunction"),
        other => panic!("expected ReferenceError, got {}", other),
    }
}

#[test]
fn test_calling_non_function_is_type_error() {
    let err = try_run(|call| call.invoke(&num(1.0), JsValue::Undefined, &[])).unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));

    let err = try_run(|call| {
        let obj = JsValue::Object(call.realm()?.create_object());
        call.call_method(&obj, "nothing", &[])
    })
    .unwrap_err();
    assert!(err.to_string().contains("nothing is not a function"));

    let err = try_run(|call| call.call_method(&JsValue::Null, "x", &[])).unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));
}

#[test]
fn test_function_constructor_needs_compiler() {
    let err = try_run(|call| call.new_scope("Function", &[s("return 1")])).unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));
    let err = try_run(|call| call.call_scope("eval", &[s("1")])).unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));
}

#[test]
fn test_recursion_limit() {
    let realm = Realm::new(RealmOptions {
        config: EngineConfig::default().with_max_call_depth(16),
        ..RealmOptions::default()
    });
    realm
        .with_call(|call| {
            define(call, "recurse", &[], |call, _argc| call.call_scope("recurse", &[]));
            let err = call.call_scope("recurse", &[]).unwrap_err();
            assert!(matches!(err, JsError::RangeError { .. }));
            assert!(err.to_string().contains("stack overflow"));
            assert_eq!(err.stack().len(), 16);
            assert_eq!(err.stack()[0].function_name.as_deref(), Some("recurse"));

            define(call, "shallow", &[], |_call, _argc| Ok(num(1.0)));
            assert_eq!(call.call_scope("shallow", &[])?, num(1.0));
            Ok(())
        })
        .unwrap();
    realm.teardown();
}

#[test]
fn test_thread_pool_reuses_frames() {
    let realm = Realm::new(RealmOptions::default());
    realm
        .with_call(|_outer| call::with_frame(|_inner| Ok(())))
        .unwrap();
    assert_eq!(call::pooled_frames(), 2);
    realm
        .with_call(|_a| call::with_frame(|_b| call::with_frame(|_c| Ok(()))))
        .unwrap();
    assert_eq!(call::pooled_frames(), 2);
    realm.teardown();
}

#[test]
fn test_acquired_frame_is_bound_to_realm() {
    let realm = Realm::new(RealmOptions::default());
    let frame = call::acquire_frame(Some(&realm));
    assert_eq!(frame.top(), 1);
    assert_eq!(frame.this_value(), JsValue::Object(realm.global().cheap_clone()));
    assert_eq!(frame.scope_length(), 1);
    call::release_frame(frame);
    realm.teardown();
}

#[test]
fn test_released_frames_are_blank() {
    let mut pool = FramePool::new(1, FrameShape::default());
    let mut first = pool.acquire();
    let second = pool.acquire();
    assert_eq!(pool.allocated(), 2);

    first.load_arguments(s("this"), &[num(1.0), num(2.0)]).unwrap();
    first.set_value(0, s("scratch")).unwrap();
    first.push_scope(s("scope")).unwrap();
    assert!(!first.is_blank());

    pool.release(first);
    pool.release(second);
    assert_eq!(pool.len(), 1);

    let reused = pool.acquire();
    assert!(reused.is_blank());
    assert_eq!(pool.allocated(), 2);
}

#[test]
fn test_pool_churn_keeps_frames_blank() {
    let mut pool = FramePool::new(8, FrameShape::default());
    let mut held = Vec::new();
    for i in 0..1000 {
        let mut frame = pool.acquire();
        assert!(frame.is_blank(), "frame {} came back dirty", i);
        frame.load_arguments(s("this"), &[num(i as f64)]).unwrap();
        frame.push_scope(s("scope")).unwrap();
        if i % 3 == 0 {
            held.push(frame);
        } else {
            pool.release(frame);
        }
    }
    for frame in held {
        pool.release(frame);
    }
    assert_eq!(pool.len(), 8);
    for _ in 0..8 {
        assert!(pool.acquire().is_blank());
    }
}

#[test]
fn test_stack_shape_limits_arguments() {
    let mut frame = escore::Call::new(FrameShape {
        stack: 4,
        scope: 2,
        values: 0,
    });
    assert!(frame.load_arguments(JsValue::Undefined, &vec![num(1.0); 3]).is_ok());
    let err = frame.load_arguments(JsValue::Undefined, &vec![num(1.0); 4]).unwrap_err();
    assert!(matches!(err, JsError::RangeError { .. }));
    assert!(frame.set_value(0, num(1.0)).is_err());
}

#[test]
fn test_argument_helpers() {
    run(|call| {
        let f = function(call, &[], |call, argc| {
            assert_eq!(argc, 2);
            assert_eq!(call.arg_number(0, argc)?, 7.5);
            assert_eq!(call.arg_int32(1, argc)?, -3);
            assert!(call.arg_number(2, argc)?.is_nan());
            assert_eq!(call.arg_int32(2, argc)?, 0);
            assert_eq!(call.arg_string(2, argc)?.as_str(), "undefined");
            assert_eq!(call.get_arg(5, argc), JsValue::Undefined);
            assert_eq!(call.args(argc), vec![num(7.5), s("-3.9")]);
            Ok(JsValue::Undefined)
        });
        call.invoke(&f, JsValue::Undefined, &[num(7.5), s("-3.9")])?;
        Ok(())
    });
}
