//! Dictionary Mode Performance Benchmarks
//!
//! Compares property access performance between shape-based storage and dictionary mode.

use criterion::{Criterion, criterion_group, criterion_main};
use otter_vm_object::{ObjectModelConfig, ObjectRef, PropertyKey, ShapeStore, Value};
use std::hint::black_box;
use std::sync::Arc;

fn populate(obj: &ObjectRef, count: usize) {
    for i in 0..count {
        let key = PropertyKey::string(&format!("prop{}", i));
        let _ = obj.put(&key, Value::int32(i as i32), false);
    }
}

fn sum_props(obj: &ObjectRef, count: usize) -> f64 {
    let mut sum = 0.0;
    for i in 0..count {
        let key = PropertyKey::string(&format!("prop{}", i));
        if let Ok(v) = obj.get_value(&key) {
            sum += v.as_number().unwrap_or(0.0);
        }
    }
    sum
}

/// Benchmark: Shape-based storage property access (< 32 properties)
fn bench_shape_based_access(c: &mut Criterion) {
    let store = ShapeStore::new();

    c.bench_function("shape_based_set_20_props", |b| {
        b.iter(|| {
            let obj = ObjectRef::new_user_object(&store, None);
            populate(&obj, 20);
            black_box(obj)
        });
    });

    c.bench_function("shape_based_get_20_props", |b| {
        let obj = ObjectRef::new_user_object(&store, None);
        populate(&obj, 20);
        assert!(!obj.is_dictionary_mode());
        b.iter(|| black_box(sum_props(&obj, 20)));
    });
}

/// Benchmark: Dictionary mode property access (> 32 properties)
fn bench_dictionary_mode_access(c: &mut Criterion) {
    let store = ShapeStore::new();

    c.bench_function("dictionary_set_50_props", |b| {
        b.iter(|| {
            let obj = ObjectRef::new_user_object(&store, None);
            populate(&obj, 50);
            black_box(obj)
        });
    });

    c.bench_function("dictionary_get_50_props", |b| {
        let obj = ObjectRef::new_user_object(&store, None);
        populate(&obj, 50);
        assert!(obj.is_dictionary_mode(), "Object should be in dictionary mode");
        b.iter(|| black_box(sum_props(&obj, 50)));
    });
}

/// Benchmark: Same property count, shape vs dictionary
fn bench_compare_storage_modes(c: &mut Criterion) {
    let shaped: Arc<ShapeStore> =
        ShapeStore::with_config(ObjectModelConfig::default().with_dictionary_objects(false));
    let hashed: Arc<ShapeStore> =
        ShapeStore::with_config(ObjectModelConfig::default().with_dictionary_threshold(8));

    c.bench_function("compare_shape_25_get", |b| {
        let obj = ObjectRef::new_user_object(&shaped, None);
        populate(&obj, 25);
        b.iter(|| black_box(sum_props(&obj, 25)));
    });

    c.bench_function("compare_dictionary_25_get", |b| {
        let obj = ObjectRef::new_user_object(&hashed, None);
        populate(&obj, 25);
        assert!(obj.is_dictionary_mode());
        b.iter(|| black_box(sum_props(&obj, 25)));
    });

    c.bench_function("compare_shape_25_delete_readd", |b| {
        let obj = ObjectRef::new_user_object(&shaped, None);
        populate(&obj, 25);
        let key = PropertyKey::string("prop12");
        b.iter(|| {
            let _ = obj.delete(&key, false);
            let _ = obj.put(&key, Value::int32(12), false);
        });
    });

    c.bench_function("compare_dictionary_25_delete_readd", |b| {
        let obj = ObjectRef::new_user_object(&hashed, None);
        populate(&obj, 25);
        let key = PropertyKey::string("prop12");
        b.iter(|| {
            let _ = obj.delete(&key, false);
            let _ = obj.put(&key, Value::int32(12), false);
        });
    });
}

criterion_group!(
    benches,
    bench_shape_based_access,
    bench_dictionary_mode_access,
    bench_compare_storage_modes
);
criterion_main!(benches);
