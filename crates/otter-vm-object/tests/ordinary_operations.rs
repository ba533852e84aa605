//! Ordinary Object Integration Tests
//!
//! End-to-end checks of the ordinary internal methods through `ObjectRef`:
//! - Shape sharing and integrity transitions
//! - Set with receivers, accessors and strict mode
//! - Prototype mutation and cycle rejection
//! - Key enumeration order
//! - Dictionary-mode conversion

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use otter_vm_object::{
    ObjectModelConfig, ObjectRef, PropertyAttributes, PropertyDescriptor, PropertyKey, ShapeStore,
    Symbol, Value, VmError,
};

fn key(s: &str) -> PropertyKey {
    PropertyKey::string(s)
}

// ============================================================================
// Shapes
// ============================================================================

#[test]
fn test_same_insertion_sequence_shares_shape() {
    let store = ShapeStore::new();
    let a = ObjectRef::new_ordinary(&store, None);
    let b = ObjectRef::new_ordinary(&store, None);
    for obj in [&a, &b] {
        obj.put(&key("x"), Value::int32(1), true).unwrap();
        obj.put(&key("y"), Value::int32(2), true).unwrap();
    }
    assert!(Arc::ptr_eq(&a.shape().unwrap(), &b.shape().unwrap()));

    let c = ObjectRef::new_ordinary(&store, None);
    c.put(&key("y"), Value::int32(2), true).unwrap();
    c.put(&key("x"), Value::int32(1), true).unwrap();
    assert!(!Arc::ptr_eq(&a.shape().unwrap(), &c.shape().unwrap()));
}

#[test]
fn test_freeze_is_idempotent() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_ordinary(&store, None);
    obj.put(&key("a"), Value::int32(1), true).unwrap();
    obj.put(&key("b"), Value::int32(2), true).unwrap();

    obj.set_integrity_level(true, true).unwrap();
    let keys = obj.own_property_keys(true, true).unwrap();
    let before: Vec<_> = keys.iter().map(|k| obj.get_own_property(k).unwrap()).collect();
    let shape = obj.shape().unwrap();

    obj.set_integrity_level(true, true).unwrap();
    let after: Vec<_> = keys.iter().map(|k| obj.get_own_property(k).unwrap()).collect();
    assert_eq!(before, after);
    assert!(Arc::ptr_eq(&shape, &obj.shape().unwrap()));
    assert!(!obj.is_extensible().unwrap());
    assert!(obj.test_integrity_level(true).unwrap());
}

#[test]
fn test_frozen_object_rejects_writes() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_ordinary(&store, None);
    obj.put(&key("a"), Value::int32(1), true).unwrap();
    obj.set_integrity_level(true, true).unwrap();

    assert!(!obj.put(&key("a"), Value::int32(2), false).unwrap());
    assert!(matches!(
        obj.put(&key("a"), Value::int32(2), true),
        Err(VmError::TypeError(_))
    ));
    assert!(!obj.put(&key("new"), Value::int32(2), false).unwrap());
    assert_eq!(obj.get_value(&key("a")).unwrap(), Value::int32(1));
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_semantics() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_ordinary(&store, None);
    assert!(obj.delete(&key("absent"), false).unwrap());
    assert!(obj.delete(&key("absent"), true).unwrap());

    obj.define_property_or_throw(
        &key("fixed"),
        &PropertyDescriptor::data(Value::int32(1), PropertyAttributes::new(true, true, false)),
    )
    .unwrap();
    assert!(!obj.delete(&key("fixed"), false).unwrap());
    assert!(matches!(obj.delete(&key("fixed"), true), Err(VmError::TypeError(_))));
    assert!(obj.has_own_property(&key("fixed")).unwrap());
}

#[test]
fn test_delete_then_re_add_moves_key_last() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_ordinary(&store, None);
    for k in ["a", "b", "c"] {
        obj.put(&key(k), Value::Null, true).unwrap();
    }
    obj.delete(&key("a"), true).unwrap();
    obj.put(&key("a"), Value::Null, true).unwrap();
    assert_eq!(
        obj.own_property_keys(true, true).unwrap(),
        vec![key("b"), key("c"), key("a")]
    );
}

// ============================================================================
// Set with receiver
// ============================================================================

#[test]
fn test_receiver_set_never_touches_target() {
    let store = ShapeStore::new();
    let target = ObjectRef::new_ordinary(&store, None);
    target.put(&key("x"), Value::int32(1), true).unwrap();
    let target_shape = target.shape().unwrap();
    let receiver = ObjectRef::new_ordinary(&store, None);

    assert!(target
        .set(&key("x"), Value::int32(2), &Value::Object(receiver.clone()), true)
        .unwrap());
    assert!(target
        .set(&key("y"), Value::int32(3), &Value::Object(receiver.clone()), true)
        .unwrap());

    assert_eq!(target.get_value(&key("x")).unwrap(), Value::int32(1));
    assert!(!target.has_own_property(&key("y")).unwrap());
    assert!(Arc::ptr_eq(&target_shape, &target.shape().unwrap()));
    assert_eq!(receiver.get_value(&key("x")).unwrap(), Value::int32(2));
    assert_eq!(receiver.get_value(&key("y")).unwrap(), Value::int32(3));
}

#[test]
fn test_receiver_with_read_only_property() {
    let store = ShapeStore::new();
    let target = ObjectRef::new_ordinary(&store, None);
    let receiver = ObjectRef::new_ordinary(&store, None);
    receiver
        .define_property_or_throw(
            &key("x"),
            &PropertyDescriptor::data(Value::int32(0), PropertyAttributes::new(false, true, true)),
        )
        .unwrap();
    let this = Value::Object(receiver.clone());
    assert!(!target.set(&key("x"), Value::int32(1), &this, false).unwrap());
    assert!(target.set(&key("x"), Value::int32(1), &this, true).is_err());
    assert_eq!(receiver.get_value(&key("x")).unwrap(), Value::int32(0));
}

#[test]
fn test_inherited_setter_runs_on_receiver() {
    let store = ShapeStore::new();
    let proto = ObjectRef::new_ordinary(&store, None);
    let setter = ObjectRef::new_function(&store, None, "set", |this, args| {
        let obj = this
            .as_object()
            .ok_or_else(|| VmError::type_error("receiver is not an object"))?;
        let doubled = args.first().and_then(Value::as_number).unwrap_or(0.0) * 2.0;
        obj.define_property_or_throw(
            &PropertyKey::string("stored"),
            &PropertyDescriptor::data_default(Value::number(doubled)),
        )?;
        Ok(Value::Undefined)
    });
    proto
        .define_property_or_throw(
            &key("value"),
            &PropertyDescriptor::accessor(None, Some(setter), true, true),
        )
        .unwrap();
    let obj = ObjectRef::new_ordinary(&store, Some(proto.clone()));

    assert!(obj.put(&key("value"), Value::number(21.0), true).unwrap());
    assert_eq!(obj.get_value(&key("stored")).unwrap(), Value::number(42.0));
    assert!(!proto.has_own_property(&key("stored")).unwrap());
    assert!(!obj.has_own_property(&key("value")).unwrap());
}

// ============================================================================
// Re-entrancy
// ============================================================================

#[test]
fn test_getter_may_mutate_its_object() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_user_object(&store, None);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let getter = ObjectRef::new_function(&store, None, "get", move |this, _| {
        counter.set(counter.get() + 1);
        let obj = this
            .as_object()
            .ok_or_else(|| VmError::type_error("receiver is not an object"))?;
        obj.put(&PropertyKey::string("added"), Value::int32(counter.get()), true)?;
        obj.delete(&PropertyKey::string("doomed"), true)?;
        Ok(Value::string("computed"))
    });
    obj.put(&key("doomed"), Value::Null, true).unwrap();
    obj.define_property_or_throw(
        &key("lazy"),
        &PropertyDescriptor::accessor(Some(getter), None, true, true),
    )
    .unwrap();

    assert_eq!(obj.get_value(&key("lazy")).unwrap(), Value::string("computed"));
    assert_eq!(obj.get_value(&key("added")).unwrap(), Value::int32(1));
    assert!(!obj.has_own_property(&key("doomed")).unwrap());
    assert_eq!(obj.get_value(&key("lazy")).unwrap(), Value::string("computed"));
    assert_eq!(calls.get(), 2);
}

// ============================================================================
// Prototypes
// ============================================================================

#[test]
fn test_prototype_cycle_rejection() {
    let store = ShapeStore::new();
    let c = ObjectRef::new_ordinary(&store, None);
    let b = ObjectRef::new_ordinary(&store, Some(c.clone()));
    let a = ObjectRef::new_ordinary(&store, Some(b.clone()));

    assert!(!a.set_prototype_of(Some(a.clone())).unwrap());
    assert!(!c.set_prototype_of(Some(a.clone())).unwrap());
    assert_eq!(c.get_prototype_of().unwrap(), None);
    assert_eq!(a.get_prototype_of().unwrap(), Some(b.clone()));

    let d = ObjectRef::new_ordinary(&store, None);
    assert!(c.set_prototype_of(Some(d.clone())).unwrap());
    assert_eq!(c.get_prototype_of().unwrap(), Some(d));
}

#[test]
fn test_inherited_values_follow_prototype_changes() {
    let store = ShapeStore::new();
    let first = ObjectRef::new_ordinary(&store, None);
    first.put(&key("kind"), Value::string("first"), true).unwrap();
    let second = ObjectRef::new_ordinary(&store, None);
    second.put(&key("kind"), Value::string("second"), true).unwrap();

    let obj = ObjectRef::new_ordinary(&store, Some(first));
    assert_eq!(obj.get_value(&key("kind")).unwrap(), Value::string("first"));
    assert!(obj.set_prototype_of(Some(second)).unwrap());
    assert_eq!(obj.get_value(&key("kind")).unwrap(), Value::string("second"));
    assert!(obj.set_prototype_of(None).unwrap());
    assert!(!obj.has_property(&key("kind")).unwrap());
}

// ============================================================================
// Enumeration order
// ============================================================================

#[test]
fn test_integer_keys_enumerate_first() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_ordinary(&store, None);
    for k in ["b", "2", "a", "0"] {
        obj.put(&key(k), Value::Null, true).unwrap();
    }
    let keys: Vec<String> = obj
        .own_property_keys(true, true)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(keys, ["0", "2", "b", "a"]);
}

#[test]
fn test_largest_integer_key_is_a_string_property() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_ordinary(&store, None);
    obj.put(&PropertyKey::from(u32::MAX), Value::int32(1), true)
        .unwrap();
    obj.put(&key("1"), Value::int32(2), true).unwrap();
    obj.put(&key("a"), Value::int32(3), true).unwrap();

    assert_eq!(obj.get_value(&key("4294967295")).unwrap(), Value::int32(1));
    assert_eq!(
        obj.own_property_keys(true, false).unwrap(),
        vec![key("1"), key("4294967295"), key("a")]
    );
}

#[test]
fn test_order_without_fast_path() {
    let store = ShapeStore::with_config(ObjectModelConfig::default().with_fast_own_keys(false));
    let obj = ObjectRef::new_ordinary(&store, None);
    let sym = Symbol::new(Some("tag"));
    obj.put(&PropertyKey::symbol(sym.clone()), Value::Null, true).unwrap();
    for k in ["z", "10", "1"] {
        obj.put(&key(k), Value::Null, true).unwrap();
    }
    assert_eq!(
        obj.own_property_keys(true, true).unwrap(),
        vec![key("1"), key("10"), key("z"), PropertyKey::symbol(sym)]
    );
}

#[test]
fn test_dictionary_objects_keep_enumeration_order() {
    let store = ShapeStore::with_config(ObjectModelConfig::default().with_dictionary_threshold(2));
    let obj = ObjectRef::new_user_object(&store, None);
    for k in ["b", "a", "5", "c", "1"] {
        obj.put(&key(k), Value::Null, true).unwrap();
    }
    assert!(obj.is_dictionary_mode());
    let keys: Vec<String> = obj
        .own_property_keys(true, false)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(keys, ["1", "5", "b", "a", "c"]);
}

// ============================================================================
// Dictionary mode
// ============================================================================

#[test]
fn test_dictionary_threshold_stops_shape_creation() {
    let config = ObjectModelConfig::default().with_dictionary_threshold(3);
    let store = ShapeStore::with_config(config);
    let obj = ObjectRef::new_user_object(&store, None);
    let twin = ObjectRef::new_user_object(&store, None);

    for k in ["p0", "p1", "p2"] {
        obj.put(&key(k), Value::Null, true).unwrap();
        twin.put(&key(k), Value::Null, true).unwrap();
    }
    assert!(Arc::ptr_eq(&obj.shape().unwrap(), &twin.shape().unwrap()));
    let created = store.shapes_created();

    obj.put(&key("p3"), Value::Null, true).unwrap();
    assert!(obj.is_dictionary_mode());
    assert!(obj.shape().is_none());
    assert_eq!(store.shapes_created(), created);

    for i in 4..20 {
        obj.put(&key(&format!("p{i}")), Value::int32(i), true).unwrap();
    }
    obj.delete(&key("p1"), true).unwrap();
    assert_eq!(store.shapes_created(), created);
    assert_eq!(obj.get_value(&key("p19")).unwrap(), Value::int32(19));
    assert_eq!(obj.property_count(), 19);
}

#[test]
fn test_dictionary_objects_honor_integrity_levels() {
    let store = ShapeStore::with_config(ObjectModelConfig::default().with_dictionary_threshold(1));
    let obj = ObjectRef::new_user_object(&store, None);
    obj.put(&key("a"), Value::int32(1), true).unwrap();
    obj.put(&key("b"), Value::int32(2), true).unwrap();
    assert!(obj.is_dictionary_mode());

    obj.set_integrity_level(false, true).unwrap();
    assert!(obj.test_integrity_level(false).unwrap());
    assert!(!obj.test_integrity_level(true).unwrap());
    assert!(obj.put(&key("a"), Value::int32(3), true).unwrap());
    assert!(!obj.delete(&key("a"), false).unwrap());
    assert!(!obj.put(&key("c"), Value::Null, false).unwrap());
}

#[test]
fn test_engine_objects_never_switch() {
    let store = ShapeStore::with_config(ObjectModelConfig::default().with_dictionary_threshold(1));
    let obj = ObjectRef::new_ordinary(&store, None);
    for i in 0..8 {
        obj.put(&key(&format!("k{i}")), Value::Null, true).unwrap();
    }
    assert!(!obj.is_dictionary_mode());
}

// ============================================================================
// Descriptors
// ============================================================================

#[test]
fn test_define_get_own_round_trip() {
    let store = ShapeStore::new();
    let obj = ObjectRef::new_ordinary(&store, None);

    let data =
        PropertyDescriptor::data(Value::string("v"), PropertyAttributes::new(true, false, true));
    obj.define_property_or_throw(&key("data"), &data).unwrap();
    assert_eq!(obj.get_own_property(&key("data")).unwrap(), Some(data));

    let getter = ObjectRef::new_function(&store, None, "get", |_, _| Ok(Value::Null));
    let setter = ObjectRef::new_function(&store, None, "set", |_, _| Ok(Value::Undefined));
    let accessor = PropertyDescriptor::accessor(Some(getter), Some(setter), true, false);
    obj.define_property_or_throw(&key("acc"), &accessor).unwrap();
    assert_eq!(obj.get_own_property(&key("acc")).unwrap(), Some(accessor));
}

#[test]
fn test_config_from_json() {
    let config: ObjectModelConfig = serde_json::from_str(
        r#"{ "dictionary-transition-threshold": 3, "fast-own-keys": false }"#,
    )
    .unwrap();
    assert_eq!(config.dictionary_transition_threshold, 3);
    assert!(!config.fast_own_keys);
    assert!(config.dictionary_objects);

    let defaults: ObjectModelConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, ObjectModelConfig::default());
}
