//! Array constructor and Array.prototype

use super::{call_num, call_str, function, num, run, s, strings};
use escore::{Call, JsError, JsString, JsValue};

fn array(call: &mut Call, items: &[JsValue]) -> JsValue {
    call.new_scope("Array", items).unwrap()
}

/// Array literal; unlike `new Array(n)` a single number is an element.
fn numbers(call: &mut Call, items: &[f64]) -> JsValue {
    let items: Vec<JsValue> = items.iter().copied().map(num).collect();
    JsValue::Object(call.realm().unwrap().create_array(items))
}

#[test]
fn test_push_and_pop() {
    run(|call| {
        let a = numbers(call, &[1.0, 2.0]);
        assert_eq!(call_num(call, &a, "push", &[num(3.0), num(4.0)]), 4.0);
        assert_eq!(call.call_method(&a, "pop", &[])?, num(4.0));
        assert_eq!(a.get("length")?, num(3.0));
        assert_eq!(call_str(call, &a, "join", &[]), "1,2,3");

        let empty = array(call, &[]);
        assert_eq!(call.call_method(&empty, "pop", &[])?, JsValue::Undefined);
        assert_eq!(empty.get("length")?, num(0.0));
        Ok(())
    });
}

#[test]
fn test_shift_and_unshift() {
    run(|call| {
        let a = numbers(call, &[1.0, 2.0, 3.0]);
        assert_eq!(call.call_method(&a, "shift", &[])?, num(1.0));
        assert_eq!(call_str(call, &a, "join", &[]), "2,3");
        assert_eq!(call_num(call, &a, "unshift", &[num(0.0), num(1.0)]), 4.0);
        assert_eq!(strings(&a), vec!["0", "1", "2", "3"]);
        Ok(())
    });
}

#[test]
fn test_slice_with_relative_indices() {
    run(|call| {
        let a = numbers(call, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let middle = call.call_method(&a, "slice", &[num(1.0), num(-1.0)])?;
        assert_eq!(strings(&middle), vec!["2", "3", "4"]);
        let tail = call.call_method(&a, "slice", &[num(-2.0)])?;
        assert_eq!(strings(&tail), vec!["4", "5"]);
        let none = call.call_method(&a, "slice", &[num(3.0), num(1.0)])?;
        assert_eq!(none.get("length")?, num(0.0));
        assert_eq!(a.get("length")?, num(5.0));
        Ok(())
    });
}

#[test]
fn test_splice_replaces_range() {
    run(|call| {
        let a = numbers(call, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let removed = call.call_method(&a, "splice", &[num(1.0), num(2.0), s("a"), s("b"), s("c")])?;
        assert_eq!(strings(&removed), vec!["2", "3"]);
        assert_eq!(call_str(call, &a, "join", &[]), "1,a,b,c,4,5");

        let removed = call.call_method(&a, "splice", &[num(-1.0)])?;
        assert_eq!(strings(&removed), vec!["5"]);
        assert_eq!(a.get("length")?, num(5.0));

        let removed = call.call_method(&a, "splice", &[num(0.0), num(3.0)])?;
        assert_eq!(strings(&removed), vec!["1", "a", "b"]);
        assert_eq!(call_str(call, &a, "join", &[]), "c,4");

        let removed = call.call_method(&a, "splice", &[])?;
        assert_eq!(removed.get("length")?, num(0.0));
        assert_eq!(a.get("length")?, num(2.0));
        Ok(())
    });
}

#[test]
fn test_default_sort_is_string_order() {
    run(|call| {
        let a = numbers(call, &[10.0, 9.0, 1.0]);
        let sorted = call.call_method(&a, "sort", &[])?;
        assert_eq!(sorted, a);
        assert_eq!(call_str(call, &a, "join", &[]), "1,10,9");

        let b = numbers(call, &[5.0, 3.0, 4.0, 1.0, 2.0]);
        call.call_method(&b, "sort", &[])?;
        assert_eq!(call_str(call, &b, "join", &[]), "1,2,3,4,5");
        Ok(())
    });
}

#[test]
fn test_sort_with_comparator() {
    run(|call| {
        let ascending = function(call, &["a", "b"], |call, _argc| {
            let a = call.get_scope_property("a")?.to_number()?;
            let b = call.get_scope_property("b")?.to_number()?;
            Ok(num(a - b))
        });
        let descending = function(call, &["a", "b"], |call, _argc| {
            let a = call.get_scope_property("a")?.to_number()?;
            let b = call.get_scope_property("b")?.to_number()?;
            Ok(num(b - a))
        });

        let a = numbers(call, &[10.0, 9.0, 1.0]);
        call.call_method(&a, "sort", &[ascending])?;
        assert_eq!(call_str(call, &a, "join", &[]), "1,9,10");

        let b = numbers(call, &[3.0, 1.0, 2.0]);
        call.call_method(&b, "sort", &[descending])?;
        assert_eq!(call_str(call, &b, "join", &[]), "3,2,1");
        Ok(())
    });
}

#[test]
fn test_sort_keeps_order_for_equal_elements() {
    run(|call| {
        let same = function(call, &["a", "b"], |_call, _argc| Ok(num(0.0)));
        let a = numbers(call, &[3.0, 1.0, 2.0, 5.0, 4.0, 0.0, 9.0]);
        call.call_method(&a, "sort", &[same])?;
        assert_eq!(strings(&a), vec!["3", "1", "2", "5", "4", "0", "9"]);
        Ok(())
    });
}

#[test]
fn test_sort_puts_undefined_last() {
    run(|call| {
        let a = array(call, &[JsValue::Undefined, s("b"), s("a")]);
        call.call_method(&a, "sort", &[])?;
        assert_eq!(a.get("0")?, s("a"));
        assert_eq!(a.get("1")?, s("b"));
        assert!(!a.as_object().unwrap().has_own_property("2")?);
        assert_eq!(a.get("length")?, num(3.0));
        Ok(())
    });
}

#[test]
fn test_comparator_error_propagates() {
    run(|call| {
        let failing = function(call, &[], |_call, _argc| Err(JsError::type_error("no order")));
        let a = numbers(call, &[2.0, 1.0]);
        let err = call.call_method(&a, "sort", &[failing]).unwrap_err();
        assert!(err.to_string().starts_with("TypeError: no order"));
        Ok(())
    });
}

#[test]
fn test_join_and_to_string() {
    run(|call| {
        let a = array(call, &[JsValue::Null, JsValue::Undefined, num(1.0)]);
        assert_eq!(call_str(call, &a, "join", &[]), ",,1");
        assert_eq!(call_str(call, &a, "join", &[s(" - ")]), " -  - 1");
        assert_eq!(call_str(call, &a, "toString", &[]), ",,1");
        assert_eq!(a.to_js_string()?.as_str(), ",,1");
        Ok(())
    });
}

#[test]
fn test_join_breaks_cycles() {
    run(|call| {
        let a = numbers(call, &[1.0]);
        call.call_method(&a, "push", &[a.clone()])?;
        assert_eq!(call_str(call, &a, "join", &[]), "1,...");
        assert_eq!(call_str(call, &a, "join", &[]), "1,...");
        Ok(())
    });
}

#[test]
fn test_reverse_in_place() {
    run(|call| {
        let a = numbers(call, &[1.0, 2.0, 3.0, 4.0]);
        let reversed = call.call_method(&a, "reverse", &[])?;
        assert_eq!(reversed, a);
        assert_eq!(call_str(call, &a, "join", &[]), "4,3,2,1");
        Ok(())
    });
}

#[test]
fn test_length_truncates_and_extends() {
    run(|call| {
        let a = numbers(call, &[1.0, 2.0, 3.0]);
        a.set_property(JsString::from("length"), num(1.0))?;
        assert_eq!(call_str(call, &a, "join", &[]), "1");
        assert_eq!(a.get_property("1")?, None);

        a.set_property(JsString::from("5"), s("x"))?;
        assert_eq!(a.get("length")?, num(6.0));
        assert_eq!(call_str(call, &a, "join", &[]), "1,,,,,x");

        let obj = a.as_object().unwrap();
        assert!(!obj.enumerate().iter().any(|k| k.as_str() == "length"));
        assert!(!obj.delete_property("length")?);
        Ok(())
    });
}

#[test]
fn test_constructor_forms() {
    run(|call| {
        let sized = array(call, &[num(3.0)]);
        assert_eq!(sized.get("length")?, num(3.0));
        assert_eq!(call_str(call, &sized, "join", &[]), ",,");

        let single = array(call, &[s("3")]);
        assert_eq!(single.get("length")?, num(1.0));
        assert_eq!(single.get("0")?, s("3"));

        let called = call.call_scope("Array", &[num(1.0), num(2.0)])?;
        assert_eq!(strings(&called), vec!["1", "2"]);
        assert_eq!(called.as_object().unwrap().class_name().as_str(), "Array");
        Ok(())
    });
}

#[test]
fn test_concat_spreads_arrays() {
    run(|call| {
        let a = numbers(call, &[1.0]);
        let b = numbers(call, &[3.0, 4.0]);
        let joined = call.call_method(&a, "concat", &[num(2.0), b, JsValue::Null])?;
        assert_eq!(strings(&joined), vec!["1", "2", "3", "4"]);
        assert_eq!(a.get("length")?, num(1.0));
        Ok(())
    });
}

#[test]
fn test_methods_work_on_array_likes() {
    run(|call| {
        let like = JsValue::Object(call.realm()?.create_object());
        like.set_property(JsString::from("length"), num(0.0))?;
        let push = call.call_scope("Array", &[])?.get("push")?;
        call.call_method(&push, "call", &[like.clone(), s("a"), s("b")])?;
        assert_eq!(like.get("length")?, num(2.0));
        assert_eq!(like.get("1")?, s("b"));
        Ok(())
    });
}
