use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use modelgraph::model::{AttributeType, Class, Model, Reference};
use modelgraph::Connector;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn people() -> Arc<Model> {
    let person = Class::builder("Person")
        .attribute("name", AttributeType::String)
        .attribute("age", AttributeType::Integer)
        .reference(Reference::new("knows", "Person").with_opposite("knows"))
        .build();
    let mut meta = Model::new("People");
    meta.add_class(person);
    Arc::new(meta)
}

/// A ring of `size` persons, each knowing the next
fn ring(meta: &Arc<Model>, size: usize) -> Model {
    let person = meta.find_class("Person").expect("Person class");
    let mut model = Model::with_meta("Ring", meta.clone());
    let elements: Vec<_> = (0..size)
        .map(|i| {
            let p = person.new_instance();
            p.set("name", format!("Person{}", i)).expect("name");
            p.set("age", (i % 100) as i64).expect("age");
            p
        })
        .collect();
    for (i, p) in elements.iter().enumerate() {
        let next = &elements[(i + 1) % size];
        p.add_reference("knows", next, None).expect("knows");
    }
    for p in elements {
        model.add_element(p);
    }
    model
}

/// Benchmark saving a fresh model into an empty store
fn bench_save(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let meta = people();
    let mut group = c.benchmark_group("save_model");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                rt.block_on(async {
                    let model = ring(&meta, size);
                    let connector = Connector::embedded();
                    connector.init_storage().await.expect("init");
                    connector.save_model(&model, false).await.expect("save")
                })
            });
        });
    }
    group.finish();
}

/// Benchmark loading a stored model back
fn bench_load(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let meta = people();
    let mut group = c.benchmark_group("load_model");

    for size in [100, 1000].iter() {
        let connector = Connector::embedded();
        rt.block_on(async {
            connector.init_storage().await.expect("init");
            connector.save_model(&ring(&meta, *size), false).await.expect("save");
        });

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| rt.block_on(connector.load_model(&meta)).expect("load"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_save, bench_load);
criterion_main!(benches);
