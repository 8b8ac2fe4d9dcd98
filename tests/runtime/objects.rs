//! Object model and Object.prototype tests

use super::{call_str, function, num, run, s};
use escore::{CheapClone, JsError, JsString, JsValue, PropertyFlags};

#[test]
fn test_set_get_delete() {
    run(|call| {
        let obj = call.realm()?.create_object();
        obj.set_property(JsString::from("x"), num(1.0))?;
        assert_eq!(obj.get("x")?, num(1.0));
        assert!(obj.has_own_property("x")?);
        assert!(obj.delete_property("x")?);
        assert_eq!(obj.get_property("x")?, None);
        assert!(obj.delete_property("never-there")?);
        Ok(())
    });
}

#[test]
fn test_undefined_is_distinct_from_missing() {
    run(|call| {
        let obj = call.realm()?.create_object();
        obj.set_property(JsString::from("u"), JsValue::Undefined)?;
        assert_eq!(obj.get_property("u")?, Some(JsValue::Undefined));
        assert_eq!(obj.get_property("v")?, None);
        Ok(())
    });
}

#[test]
fn test_assignment_shadows_prototype() {
    run(|call| {
        let realm = call.realm()?.clone();
        let parent = realm.create_object();
        parent.set_property(JsString::from("x"), num(1.0))?;
        let child = realm.create_object_with_proto(Some(parent.cheap_clone()));
        assert_eq!(child.get("x")?, num(1.0));
        assert!(!child.has_own_property("x")?);

        child.set_property(JsString::from("x"), num(2.0))?;
        assert_eq!(child.get("x")?, num(2.0));
        assert_eq!(parent.get("x")?, num(1.0));

        child.delete_property("x")?;
        assert_eq!(child.get("x")?, num(1.0));
        Ok(())
    });
}

#[test]
fn test_inherited_read_only_blocks_assignment() {
    run(|call| {
        let realm = call.realm()?.clone();
        let parent = realm.create_object();
        parent.put(JsString::from("k"), num(1.0), PropertyFlags::READ_ONLY);
        let child = realm.create_object_with_proto(Some(parent.cheap_clone()));
        child.set_property(JsString::from("k"), num(2.0))?;
        assert_eq!(child.get("k")?, num(1.0));
        assert!(!child.has_own_property("k")?);
        Ok(())
    });
}

#[test]
fn test_dont_delete_survives_delete() {
    run(|call| {
        let obj = call.realm()?.create_object();
        obj.put(JsString::from("p"), num(7.0), PropertyFlags::DONT_DELETE);
        assert!(!obj.delete_property("p")?);
        assert_eq!(obj.get("p")?, num(7.0));
        Ok(())
    });
}

#[test]
fn test_prototype_cycle_rejected() {
    run(|call| {
        let realm = call.realm()?.clone();
        let a = realm.create_object();
        let b = realm.create_object_with_proto(Some(a.cheap_clone()));
        let err = a.set_prototype(Some(b.cheap_clone())).unwrap_err();
        assert!(matches!(err, JsError::TypeError { .. }));
        let err = a.set_prototype(Some(a.cheap_clone())).unwrap_err();
        assert!(matches!(err, JsError::TypeError { .. }));
        Ok(())
    });
}

#[test]
fn test_object_to_string_reports_class() {
    run(|call| {
        let realm = call.realm()?.clone();
        let obj = JsValue::Object(realm.create_object());
        assert_eq!(call_str(call, &obj, "toString", &[]), "[object Object]");
        let date = JsValue::Object(realm.create_date(0.0));
        let to_string = realm.intrinsics().object_prototype.get("toString")?;
        let text = call.invoke(&to_string, date, &[])?;
        assert_eq!(text, s("[object Date]"));
        Ok(())
    });
}

#[test]
fn test_object_constructor_wraps_primitives() {
    run(|call| {
        let wrapped = call.new_scope("Object", &[s("ab")])?;
        let obj = wrapped.as_object().unwrap();
        assert_eq!(obj.class_name().as_str(), "String");
        assert_eq!(obj.get("length")?, num(2.0));

        let plain = call.call_scope("Object", &[JsValue::Null])?;
        assert_eq!(plain.as_object().unwrap().class_name().as_str(), "Object");
        Ok(())
    });
}

#[test]
fn test_has_own_and_enumerable() {
    run(|call| {
        let realm = call.realm()?.clone();
        let obj = JsValue::Object(realm.create_object());
        obj.set_property(JsString::from("a"), num(1.0))?;
        let own = call.call_method(&obj, "hasOwnProperty", &[s("a")])?;
        assert_eq!(own, JsValue::Boolean(true));
        let inherited = call.call_method(&obj, "hasOwnProperty", &[s("toString")])?;
        assert_eq!(inherited, JsValue::Boolean(false));

        let proto = JsValue::Object(realm.intrinsics().object_prototype.cheap_clone());
        let hidden = call.call_method(&proto, "propertyIsEnumerable", &[s("toString")])?;
        assert_eq!(hidden, JsValue::Boolean(false));
        let visible = call.call_method(&obj, "propertyIsEnumerable", &[s("a")])?;
        assert_eq!(visible, JsValue::Boolean(true));

        let is_proto = call.call_method(&proto, "isPrototypeOf", &[obj.clone()])?;
        assert_eq!(is_proto, JsValue::Boolean(true));
        Ok(())
    });
}

#[test]
fn test_enumerate_own_then_inherited() {
    run(|call| {
        let realm = call.realm()?.clone();
        let parent = realm.create_object();
        parent.set_property(JsString::from("p"), num(1.0))?;
        parent.set_property(JsString::from("shared"), num(1.0))?;
        let child = realm.create_object_with_proto(Some(parent.cheap_clone()));
        child.set_property(JsString::from("c"), num(2.0))?;
        child.set_property(JsString::from("shared"), num(2.0))?;
        child.put(JsString::from("h"), num(3.0), PropertyFlags::HIDDEN);

        let names: Vec<String> = child.enumerate().iter().map(|k| k.to_string()).collect();
        assert_eq!(names.len(), 3);
        let mut own = names[..2].to_vec();
        own.sort();
        assert_eq!(own, vec!["c", "shared"]);
        assert_eq!(names[2], "p");
        Ok(())
    });
}

#[test]
fn test_watch_filters_assignments() {
    run(|call| {
        let obj = JsValue::Object(call.realm()?.create_object());
        let handler = function(call, &["name", "old", "value"], |call, _argc| {
            assert_eq!(call.arg(0), JsValue::from("x"));
            Ok(JsValue::Number(call.arg(2).to_number()? * 2.0))
        });
        call.call_method(&obj, "watch", &[s("x"), handler])?;
        obj.set_property(JsString::from("x"), num(5.0))?;
        assert_eq!(obj.get("x")?, num(10.0));

        call.call_method(&obj, "unwatch", &[s("x")])?;
        obj.set_property(JsString::from("x"), num(3.0))?;
        assert_eq!(obj.get("x")?, num(3.0));
        Ok(())
    });
}

#[test]
fn test_watch_sees_old_value() {
    run(|call| {
        let obj = JsValue::Object(call.realm()?.create_object());
        obj.set_property(JsString::from("n"), num(1.0))?;
        let handler = function(call, &[], |call, _argc| {
            let old = call.arg(1).to_number()?;
            let new = call.arg(2).to_number()?;
            Ok(JsValue::Number(old + new))
        });
        call.call_method(&obj, "watch", &[s("n"), handler])?;
        obj.set_property(JsString::from("n"), num(4.0))?;
        assert_eq!(obj.get("n")?, num(5.0));
        Ok(())
    });
}

#[test]
fn test_primitive_method_lookup() {
    run(|call| {
        assert_eq!(call_str(call, &JsValue::Boolean(true), "toString", &[]), "true");
        assert_eq!(call_str(call, &num(255.0), "toString", &[num(16.0)]), "ff");
        assert_eq!(call_str(call, &s("abc"), "charAt", &[num(1.0)]), "b");
        Ok(())
    });
}
