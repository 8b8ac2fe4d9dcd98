//! `String.printf` and the formatting engine behind it

use super::{num, run, s};
use escore::{sprintf, Call, JsValue};

fn printf(call: &mut Call, args: &[JsValue]) -> String {
    let string = call.get_scope_property("String").unwrap();
    let out = call.call_method(&string, "printf", args).unwrap();
    out.as_str().unwrap().to_string()
}

#[test]
fn test_printf_mixed_conversions() {
    run(|call| {
        let out = printf(call, &[s("%05.1f|%-4s|%x"), num(3.14159), s("ab"), num(255.0)]);
        assert_eq!(out, "003.1|ab  |ff");
        Ok(())
    });
}

#[test]
fn test_printf_converts_arguments() {
    run(|call| {
        assert_eq!(printf(call, &[s("%d"), s("42")]), "42");
        assert_eq!(printf(call, &[s("%s"), JsValue::Boolean(true)]), "true");
        assert_eq!(printf(call, &[s("%c"), num(65.0)]), "A");

        let items = call.new_scope("Array", &[num(1.0), num(2.0)])?;
        assert_eq!(printf(call, &[s("[%s]"), items]), "[1,2]");
        Ok(())
    });
}

#[test]
fn test_printf_without_arguments() {
    run(|call| {
        assert_eq!(printf(call, &[]), "");
        assert_eq!(printf(call, &[s("plain text")]), "plain text");
        assert_eq!(printf(call, &[s("%d|%s")]), "NaN|undefined");
        Ok(())
    });
}

#[test]
fn test_sprintf_directly() {
    let out = sprintf("%s has %d items", &[JsValue::from("cart"), JsValue::from(3)]).unwrap();
    assert_eq!(out, "cart has 3 items");
    assert_eq!(sprintf("%+.2e", &[JsValue::from(12345.678)]).unwrap(), "+1.23e+04");
    assert_eq!(sprintf("%5.1f", &[JsValue::from(9.95)]).unwrap(), " 10.0");
    assert_eq!(sprintf("%-6d|", &[JsValue::from(-12)]).unwrap(), "-12   |");
    assert_eq!(sprintf("%08.3f", &[JsValue::from(-3.5)]).unwrap(), "-003.500");
    assert_eq!(sprintf("%q", &[]).unwrap(), "%q");
    assert_eq!(sprintf("%.*f", &[JsValue::from(1), JsValue::from(2.25)]).unwrap(), "2.3");
}
