//! String constructor, String.prototype and primitive string properties

use super::{call_num, call_str, function, num, run, s, strings};
use escore::{JsError, JsValue};

#[test]
fn test_char_access() {
    run(|call| {
        let text = s("abc");
        assert_eq!(call_str(call, &text, "charAt", &[num(1.0)]), "b");
        assert_eq!(call_str(call, &text, "charAt", &[num(5.0)]), "");
        assert_eq!(call_num(call, &text, "charCodeAt", &[num(0.0)]), 97.0);
        assert!(call_num(call, &text, "charCodeAt", &[num(9.0)]).is_nan());
        assert_eq!(text.get("length")?, num(3.0));
        assert_eq!(text.get("2")?, s("c"));
        Ok(())
    });
}

#[test]
fn test_length_counts_utf16_units() {
    run(|call| {
        let emoji = s("😀");
        assert_eq!(emoji.get("length")?, num(2.0));
        assert_eq!(call_num(call, &emoji, "charCodeAt", &[num(0.0)]), 55357.0);
        assert_eq!(call_num(call, &emoji, "charCodeAt", &[num(1.0)]), 56832.0);

        let rebuilt = call.call_scope("String", &[])?;
        assert_eq!(rebuilt, s(""));
        let string = call.get_scope_property("String")?;
        let joined = call.call_method(&string, "fromCharCode", &[num(55357.0), num(56832.0)])?;
        assert_eq!(joined, emoji);
        Ok(())
    });
}

#[test]
fn test_index_of() {
    run(|call| {
        let text = s("abcabc");
        assert_eq!(call_num(call, &text, "indexOf", &[s("bc")]), 1.0);
        assert_eq!(call_num(call, &text, "indexOf", &[s("bc"), num(2.0)]), 4.0);
        assert_eq!(call_num(call, &text, "indexOf", &[s("x")]), -1.0);
        assert_eq!(call_num(call, &text, "lastIndexOf", &[s("abc")]), 3.0);
        assert_eq!(call_num(call, &text, "lastIndexOf", &[s("abc"), num(2.0)]), 0.0);
        assert_eq!(call_num(call, &text, "lastIndexOf", &[s("abc"), num(-1.0)]), -1.0);
        Ok(())
    });
}

#[test]
fn test_substrings() {
    run(|call| {
        let text = s("abcdef");
        assert_eq!(call_str(call, &text, "substring", &[num(4.0), num(1.0)]), "bcd");
        assert_eq!(call_str(call, &text, "substring", &[num(-2.0)]), "abcdef");
        assert_eq!(call_str(call, &text, "slice", &[num(-3.0)]), "def");
        assert_eq!(call_str(call, &text, "slice", &[num(1.0), num(-1.0)]), "bcde");
        assert_eq!(call_str(call, &text, "slice", &[num(4.0), num(2.0)]), "");
        assert_eq!(call_str(call, &text, "substr", &[num(-3.0), num(2.0)]), "de");
        assert_eq!(call_str(call, &text, "substr", &[num(2.0)]), "cdef");
        Ok(())
    });
}

#[test]
fn test_split_with_string_separator() {
    run(|call| {
        let text = s("a,b,,c");
        let parts = call.call_method(&text, "split", &[s(",")])?;
        assert_eq!(strings(&parts), vec!["a", "b", "", "c"]);

        let limited = call.call_method(&text, "split", &[s(","), num(2.0)])?;
        assert_eq!(strings(&limited), vec!["a", "b"]);

        let none = call.call_method(&text, "split", &[s(","), num(0.0)])?;
        assert_eq!(none.get("length")?, num(0.0));

        let whole = call.call_method(&text, "split", &[])?;
        assert_eq!(strings(&whole), vec!["a,b,,c"]);

        let units = call.call_method(&s("abc"), "split", &[s("")])?;
        assert_eq!(strings(&units), vec!["a", "b", "c"]);
        Ok(())
    });
}

#[test]
fn test_case_and_concat() {
    run(|call| {
        assert_eq!(call_str(call, &s("MiXed"), "toUpperCase", &[]), "MIXED");
        assert_eq!(call_str(call, &s("MiXed"), "toLowerCase", &[]), "mixed");
        assert_eq!(call_str(call, &s("x"), "concat", &[s("a"), num(1.0)]), "xa1");
        Ok(())
    });
}

#[test]
fn test_replace_with_string_pattern() {
    run(|call| {
        assert_eq!(call_str(call, &s("a-b-c"), "replace", &[s("-"), s("+")]), "a+b-c");
        assert_eq!(call_str(call, &s("abc"), "replace", &[s("b"), s("[$&]")]), "a[b]c");
        assert_eq!(call_str(call, &s("abc"), "replace", &[s("b"), s("$`$'")]), "aacc");
        assert_eq!(call_str(call, &s("abc"), "replace", &[s("x"), s("y")]), "abc");
        assert_eq!(call_str(call, &s("a.c"), "replace", &[s("."), s("$$")]), "a$c");

        let tag = function(call, &["m", "offset"], |call, _argc| {
            let m = call.get_scope_property("m")?;
            m.add(&call.get_scope_property("offset")?)
        });
        assert_eq!(call_str(call, &s("abc"), "replace", &[s("b"), tag]), "ab1c");
        Ok(())
    });
}

#[test]
fn test_contains_starts_and_ends() {
    run(|call| {
        let text = s("resin script");
        assert_eq!(call.call_method(&text, "contains", &[s("in s")])?, JsValue::Boolean(true));
        assert_eq!(call.call_method(&text, "startsWith", &[s("resin")])?, JsValue::Boolean(true));
        assert_eq!(call.call_method(&text, "endsWith", &[s("resin")])?, JsValue::Boolean(false));
        assert_eq!(call.call_method(&text, "contains", &[])?, JsValue::Boolean(false));
        Ok(())
    });
}

#[test]
fn test_get_bytes() {
    run(|call| {
        let utf8 = call.call_method(&s("é"), "getBytes", &[])?;
        assert_eq!(strings(&utf8), vec!["195", "169"]);

        let latin = call.call_method(&s("é€"), "getBytes", &[s("ISO-8859-1")])?;
        assert_eq!(strings(&latin), vec!["233", "63"]);

        let err = call.call_method(&s("a"), "getBytes", &[s("ebcdic")]).unwrap_err();
        assert!(matches!(err, JsError::RangeError { .. }));
        Ok(())
    });
}

#[test]
fn test_wrapper_objects() {
    run(|call| {
        let wrapper = call.new_scope("String", &[s("ab")])?;
        let obj = wrapper.as_object().unwrap();
        assert_eq!(obj.class_name().as_str(), "String");
        assert_eq!(wrapper.type_of(), "object");
        assert_eq!(wrapper.get("length")?, num(2.0));
        assert_eq!(wrapper.get("0")?, s("a"));
        assert!(!obj.delete_property("length")?);

        assert_eq!(call.call_method(&wrapper, "valueOf", &[])?, s("ab"));
        assert_eq!(call_str(call, &wrapper, "charAt", &[num(1.0)]), "b");
        assert!(wrapper.loose_equals(&s("ab"))?);

        let converted = call.call_scope("String", &[num(5.0)])?;
        assert_eq!(converted, s("5"));
        Ok(())
    });
}

#[test]
fn test_to_string_rejects_other_receivers() {
    run(|call| {
        let string = call.get_scope_property("String")?;
        let to_string = string.get("prototype")?.get("toString")?;
        let err = call.call_method(&to_string, "call", &[num(5.0)]).unwrap_err();
        assert!(matches!(err, JsError::TypeError { .. }));

        let index_of = string.get("prototype")?.get("indexOf")?;
        let found = call.call_method(&index_of, "call", &[num(12345.0), s("34")])?;
        assert_eq!(found, num(2.0));
        Ok(())
    });
}
