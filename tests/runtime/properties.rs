//! Property table behavior against a model, plus conversion laws

use std::collections::HashMap;

use escore::convert::{array_index, number_to_string, string_to_number};
use escore::property::{CopyState, SetOutcome};
use escore::{JsString, JsValue, PropertyFlags, PropertyTable};
use proptest::prelude::*;

use super::{new_realm, num, run};

const BUILTINS: &[&str] = &["Array", "Object", "String", "Math", "parseInt", "Date", "escape"];

#[derive(Debug, Clone)]
enum Op {
    Set(u8, i32),
    Constant(u8, i32),
    Delete(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..40, any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        1 => (0u8..40, any::<i32>()).prop_map(|(k, v)| Op::Constant(k, v)),
        2 => (0u8..40).prop_map(Op::Delete),
    ]
}

fn key(k: u8) -> JsString {
    JsString::from(format!("k{}", k).as_str())
}

/// Apply `op` to the table and to the model of (value, read_only) pairs.
fn apply(table: &mut PropertyTable, model: &mut HashMap<u8, (i32, bool)>, op: &Op) {
    match *op {
        Op::Set(k, v) => {
            let outcome = table.set(&key(k), num(v as f64));
            match model.get_mut(&k) {
                Some((_, true)) => assert_eq!(outcome, SetOutcome::ReadOnly),
                Some((value, false)) => {
                    assert_eq!(outcome, SetOutcome::Updated);
                    *value = v;
                }
                None => {
                    assert_eq!(outcome, SetOutcome::Inserted);
                    model.insert(k, (v, false));
                }
            }
        }
        Op::Constant(k, v) => {
            table.define(&key(k), num(v as f64), PropertyFlags::CONSTANT);
            model.insert(k, (v, true));
        }
        Op::Delete(k) => {
            let deleted = table.delete(&format!("k{}", k));
            match model.get(&k) {
                Some((_, true)) => assert!(!deleted),
                _ => {
                    assert!(deleted);
                    model.remove(&k);
                }
            }
        }
    }
}

fn assert_matches(table: &PropertyTable, model: &HashMap<u8, (i32, bool)>) {
    assert_eq!(table.len(), model.len());
    for k in 0u8..40 {
        let name = format!("k{}", k);
        match model.get(&k) {
            Some((v, read_only)) => {
                assert_eq!(table.get(&name), Some(&num(*v as f64)));
                let flags = table.flags(&name).expect("live property has flags");
                assert_eq!(flags.is_read_only(), *read_only);
            }
            None => assert!(table.get(&name).is_none(), "{} should be absent", name),
        }
    }
    let enumerable = table.enumerable_keys().len();
    let expected = model.values().filter(|(_, read_only)| !read_only).count();
    assert_eq!(enumerable, expected);
}

proptest! {
    #[test]
    fn table_behaves_like_a_map(ops in prop::collection::vec(op(), 0..200)) {
        let mut table = PropertyTable::new();
        let mut model = HashMap::new();
        for op in &ops {
            apply(&mut table, &mut model, op);
        }
        assert_matches(&table, &model);
        prop_assert!(table.fill() >= table.len());
        prop_assert!(table.capacity().is_power_of_two());
    }

    #[test]
    fn shared_tables_stay_isolated(
        setup in prop::collection::vec(op(), 0..60),
        left_ops in prop::collection::vec(op(), 0..60),
        right_ops in prop::collection::vec(op(), 0..60),
    ) {
        let mut template = PropertyTable::new();
        let mut base = HashMap::new();
        for op in &setup {
            apply(&mut template, &mut base, op);
        }
        template.set_clean();

        let mut left = template.share();
        let mut right = template.share();
        prop_assert!(left.shares_storage_with(&right));
        prop_assert_eq!(left.copy_state(), CopyState::CopyOnWrite);

        let mut left_model = base.clone();
        let mut right_model = base.clone();
        for op in &left_ops {
            apply(&mut left, &mut left_model, op);
        }
        for op in &right_ops {
            apply(&mut right, &mut right_model, op);
        }
        assert_matches(&template, &base);
        assert_matches(&left, &left_model);
        assert_matches(&right, &right_model);
    }

    #[test]
    fn integers_print_and_parse_back(n in -1_000_000_000i64..1_000_000_000) {
        let text = number_to_string(n as f64);
        prop_assert_eq!(&text, &n.to_string());
        prop_assert_eq!(string_to_number(&text), n as f64);
    }

    #[test]
    fn finite_numbers_round_trip(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
        let text = number_to_string(n);
        let back = string_to_number(&text);
        prop_assert!(back == n, "{} printed as {} parsed as {}", n, text, back);
    }

    #[test]
    fn canonical_indexes_only(i in 0u32..u32::MAX) {
        prop_assert_eq!(array_index(&i.to_string()), Some(i));
        let padded = format!("0{}", i);
        prop_assert_eq!(array_index(&padded), None);
    }

    #[test]
    fn array_length_follows_highest_index(indexes in prop::collection::vec(0u32..500, 1..20)) {
        run(|call| {
            let array = call.new_scope("Array", &[])?;
            for &i in &indexes {
                array.set_property(JsString::from(i.to_string().as_str()), JsValue::Boolean(true))?;
            }
            let highest = indexes.iter().copied().max().unwrap_or(0);
            assert_eq!(array.get("length")?, num(highest as f64 + 1.0));
            Ok(())
        });
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn realm_writes_never_leak(
        shadowed in prop::sample::subsequence(BUILTINS, 0..BUILTINS.len()),
        patched in "[a-z]{1,8}",
    ) {
        let dirty = new_realm();
        dirty
            .with_call(|call| {
                for name in &shadowed {
                    call.set_scope_property(JsString::from(*name), num(1.0))?;
                }
                let proto = call.get_scope_property("Array")?;
                let proto = if proto.is_callable() {
                    proto.get("prototype")?
                } else {
                    JsValue::Object(call.realm()?.intrinsics().array_prototype.clone())
                };
                proto.set_property(JsString::from(patched.as_str()), num(2.0))?;
                Ok(())
            })
            .unwrap();

        let clean = new_realm();
        clean
            .with_call(|call| {
                for name in BUILTINS {
                    assert!(call.get_scope_property(name)?.is_object(), "{} leaked", name);
                }
                let array = call.new_scope("Array", &[])?;
                assert_ne!(array.get(&patched)?, num(2.0));
                Ok(())
            })
            .unwrap();
        dirty.teardown();
        clean.teardown();
    }
}

#[test]
fn test_dirty_tables_copy_eagerly() {
    let mut table = PropertyTable::new();
    table.set(&key(1), num(1.0));
    let copy = table.share();
    assert!(!copy.shares_storage_with(&table));
    assert_eq!(copy.copy_state(), CopyState::Dirty);

    table.set_clean();
    let mut shared = table.share();
    assert!(shared.shares_storage_with(&table));
    shared.set(&key(2), num(2.0));
    assert!(!shared.shares_storage_with(&table));
    assert!(table.get("k2").is_none());
    assert_eq!(shared.copy_state(), CopyState::Dirty);
}

#[test]
fn test_tombstones_are_reused() {
    let mut table = PropertyTable::new();
    for round in 0..100 {
        table.set(&key(1), num(round as f64));
        assert!(table.delete("k1"));
    }
    assert!(table.is_empty());
    assert!(table.capacity() <= 32);
}
