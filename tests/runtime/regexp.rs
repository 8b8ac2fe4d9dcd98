//! RegExp objects and the String methods that take patterns

use super::{call_num, call_str, function, num, run, s, strings};
use escore::{Call, JsError, JsString, JsValue};

fn regexp(call: &mut Call, source: &str, flags: &str) -> JsValue {
    call.new_scope("RegExp", &[s(source), s(flags)]).unwrap()
}

#[test]
fn test_exec_walks_global_matches() {
    run(|call| {
        let re = regexp(call, r"a(\d)", "g");
        let text = s("a1 a2");

        let first = call.call_method(&re, "exec", &[text.clone()])?;
        assert_eq!(strings(&first), vec!["a1", "1"]);
        assert_eq!(first.get("index")?, num(0.0));
        assert_eq!(first.get("input")?, text);
        assert_eq!(re.get("lastIndex")?, num(2.0));

        let second = call.call_method(&re, "exec", &[text.clone()])?;
        assert_eq!(strings(&second), vec!["a2", "2"]);
        assert_eq!(second.get("index")?, num(3.0));
        assert_eq!(re.get("lastIndex")?, num(5.0));

        assert_eq!(call.call_method(&re, "exec", &[text])?, JsValue::Null);
        assert_eq!(re.get("lastIndex")?, num(0.0));
        Ok(())
    });
}

#[test]
fn test_non_global_exec_ignores_last_index() {
    run(|call| {
        let re = regexp(call, "b", "");
        re.set_property(JsString::from("lastIndex"), num(2.0))?;
        let m = call.call_method(&re, "exec", &[s("abcb")])?;
        assert_eq!(m.get("index")?, num(1.0));
        Ok(())
    });
}

#[test]
fn test_flags_and_properties() {
    run(|call| {
        let re = regexp(call, "^ab", "i");
        assert_eq!(call.call_method(&re, "test", &[s("ABc")])?, JsValue::Boolean(true));
        assert_eq!(call.call_method(&re, "test", &[s("cab")])?, JsValue::Boolean(false));
        assert_eq!(re.get("source")?, s("^ab"));
        assert_eq!(re.get("ignoreCase")?, JsValue::Boolean(true));
        assert_eq!(re.get("global")?, JsValue::Boolean(false));
        assert_eq!(re.get("multiline")?, JsValue::Boolean(false));

        re.set_property(JsString::from("source"), s("changed"))?;
        assert_eq!(re.get("source")?, s("^ab"));
        let obj = re.as_object().unwrap();
        assert!(!obj.enumerate().iter().any(|k| k.as_str() == "lastIndex"));

        let multi = regexp(call, "^b", "m");
        assert_eq!(call.call_method(&multi, "test", &[s("a\nb")])?, JsValue::Boolean(true));
        Ok(())
    });
}

#[test]
fn test_to_string_and_identity() {
    run(|call| {
        let re = regexp(call, "a", "gi");
        assert_eq!(call_str(call, &re, "toString", &[]), "/a/gi");

        let same = call.call_scope("RegExp", &[re.clone()])?;
        assert_eq!(same, re);
        let copy = call.new_scope("RegExp", &[re.clone()])?;
        assert_ne!(copy, re);
        assert_eq!(call_str(call, &copy, "toString", &[]), "/a/gi");

        let err = call.new_scope("RegExp", &[re, s("m")]).unwrap_err();
        assert!(matches!(err, JsError::TypeError { .. }));
        Ok(())
    });
}

#[test]
fn test_compile_replaces_expression() {
    run(|call| {
        let re = regexp(call, "a", "");
        call.call_method(&re, "compile", &[s("b+"), s("g")])?;
        assert_eq!(re.get("source")?, s("b+"));
        assert_eq!(re.get("global")?, JsValue::Boolean(true));
        assert_eq!(call.call_method(&re, "test", &[s("abb")])?, JsValue::Boolean(true));
        assert_eq!(re.get("lastIndex")?, num(3.0));
        Ok(())
    });
}

#[test]
fn test_invalid_patterns_are_catchable() {
    run(|call| {
        for (source, flags) in [("(", ""), ("a", "gg"), ("a", "x")] {
            let err = call.new_scope("RegExp", &[s(source), s(flags)]).unwrap_err();
            assert!(err.is_catchable());
            let value = err.to_value();
            assert!(value.as_str().unwrap().starts_with("SyntaxError"), "{}", source);
        }
        Ok(())
    });
}

#[test]
fn test_bracket_inside_class_is_literal() {
    run(|call| {
        let re = regexp(call, "[[]", "");
        assert_eq!(call.call_method(&re, "test", &[s("a[b")])?, JsValue::Boolean(true));
        Ok(())
    });
}

#[test]
fn test_split_on_pattern() {
    run(|call| {
        let comma = regexp(call, r"\s*,\s*", "");
        let parts = call.call_method(&s("a , b,c"), "split", &[comma])?;
        assert_eq!(strings(&parts), vec!["a", "b", "c"]);

        let dash = regexp(call, "(-)", "");
        let parts = call.call_method(&s("a-b"), "split", &[dash])?;
        assert_eq!(strings(&parts), vec!["a", "-", "b"]);

        let x = regexp(call, "x", "i");
        let parts = call.call_method(&s("1X2x3"), "split", &[x, num(2.0)])?;
        assert_eq!(strings(&parts), vec!["1", "2"]);
        Ok(())
    });
}

#[test]
fn test_replace_with_pattern() {
    run(|call| {
        let names = regexp(call, r"(\w+)\s(\w+)", "");
        assert_eq!(
            call_str(call, &s("John Smith"), "replace", &[names, s("$2 $1")]),
            "Smith John"
        );

        let o = regexp(call, "o", "g");
        assert_eq!(call_str(call, &s("foo boo"), "replace", &[o.clone(), s("0")]), "f00 b00");
        assert_eq!(o.get("lastIndex")?, num(0.0));

        let first = regexp(call, "o", "");
        assert_eq!(call_str(call, &s("foo"), "replace", &[first, s("0")]), "f0o");
        Ok(())
    });
}

#[test]
fn test_replace_with_function() {
    run(|call| {
        let digits = regexp(call, r"(\d+)", "g");
        let double = function(call, &["m", "group", "offset"], |call, argc| {
            assert_eq!(argc, 4);
            let n = call.get_scope_property("group")?.to_number()?;
            Ok(num(n * 2.0))
        });
        assert_eq!(call_str(call, &s("a1b22"), "replace", &[digits, double]), "a2b44");

        let at = regexp(call, "b", "");
        let offset = function(call, &["m", "offset"], |call, _argc| call.get_scope_property("offset"));
        assert_eq!(call_str(call, &s("abc"), "replace", &[at, offset]), "a1c");
        Ok(())
    });
}

#[test]
fn test_match() {
    run(|call| {
        let digits = regexp(call, r"\d+", "g");
        let all = call.call_method(&s("a1b22c333"), "match", &[digits])?;
        assert_eq!(strings(&all), vec!["1", "22", "333"]);

        let once = call.call_method(&s("x12y"), "match", &[s(r"\d+")])?;
        assert_eq!(strings(&once), vec!["12"]);
        assert_eq!(once.get("index")?, num(1.0));

        let none = call.call_method(&s("abc"), "match", &[s(r"\d")])?;
        assert_eq!(none, JsValue::Null);
        Ok(())
    });
}

#[test]
fn test_search() {
    run(|call| {
        assert_eq!(call_num(call, &s("abc"), "search", &[s("c")]), 2.0);
        let z = regexp(call, "z", "");
        assert_eq!(call_num(call, &s("abc"), "search", &[z]), -1.0);
        let upper = regexp(call, "B", "i");
        assert_eq!(call_num(call, &s("😀b"), "search", &[upper]), 2.0);
        Ok(())
    });
}

#[test]
fn test_methods_reject_non_regexps() {
    run(|call| {
        let re = regexp(call, "a", "");
        let exec = re.get("exec")?;
        let plain = JsValue::Object(call.realm()?.create_object());
        let err = call.call_method(&exec, "call", &[plain, s("a")]).unwrap_err();
        assert!(matches!(err, JsError::TypeError { .. }));
        Ok(())
    });
}
