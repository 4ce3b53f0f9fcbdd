//! Benchmarks for the hot dispatch paths.
//!
//! - overload resolution: best fit against the `System.Math` overloads
//! - member lookup: cold and cached resolution on a handle
//! - invocation: argument conversion for growing host lists
//! - callbacks: a host callable invoked through a foreign delegate
//!
//! ```bash
//! cargo bench --bench dispatch_benchmarks -- overload
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dynbridge::prelude::*;
use dynbridge_dispatch::OverloadResolver;
use std::hint::black_box;
use std::sync::Arc;

fn math(bridge: &Bridge) -> HostValue {
    HostValue::Type(bridge.lookup_type("System.Math").unwrap())
}

fn overload_benchmarks(c: &mut Criterion) {
    let bridge = Bridge::in_memory();
    let math = math(&bridge);
    let HostValue::Overloads(max) = bridge.get_attr(&math, "Max").unwrap() else {
        panic!("Math.Max is overloaded");
    };

    let mut group = c.benchmark_group("overload");

    let ints = [HostValue::Int(3), HostValue::Int(9)];
    group.bench_function("find_best_match/ints", |b| {
        b.iter(|| {
            OverloadResolver::new(bridge.context(), &max)
                .find_best_match(black_box(&ints))
                .unwrap()
        })
    });

    let floats = [HostValue::Float(3.0), HostValue::Float(9.5)];
    group.bench_function("find_best_match/floats", |b| {
        b.iter(|| {
            OverloadResolver::new(bridge.context(), &max)
                .find_best_match(black_box(&floats))
                .unwrap()
        })
    });

    let witnesses = OverloadSelector::witnesses([well_known::DOUBLE, well_known::DOUBLE]);
    group.bench_function("choose/witnesses", |b| {
        b.iter(|| {
            OverloadResolver::new(bridge.context(), &max)
                .choose(black_box(&witnesses))
                .unwrap()
        })
    });

    group.bench_function("call/best_fit", |b| {
        b.iter(|| bridge.call_method(&math, "Max", black_box(&ints)).unwrap())
    });

    group.finish();
}

fn member_benchmarks(c: &mut Criterion) {
    let bridge = Bridge::in_memory();
    let math = math(&bridge);

    let mut group = c.benchmark_group("member");

    group.bench_function("get_attr/cached", |b| {
        b.iter(|| bridge.get_attr(&math, black_box("Abs")).unwrap())
    });

    group.bench_function("get_attr/cold", |b| {
        b.iter(|| {
            // A fresh type handle starts with an empty member cache.
            let math = HostValue::Type(bridge.lookup_type("System.Math").unwrap());
            bridge.get_attr(&math, black_box("Abs")).unwrap()
        })
    });

    group.bench_function("lookup_type", |b| {
        b.iter(|| bridge.lookup_type(black_box("System.Collections.Generic.List`1")).unwrap())
    });

    group.finish();
}

fn conversion_benchmarks(c: &mut Criterion) {
    let bridge = Bridge::in_memory();
    let open = bridge
        .lookup_type("System.Collections.Generic.List")
        .unwrap();
    let int32 = HostValue::Type(bridge.lookup_type("System.Int32").unwrap());
    let HostValue::Type(list_type) = bridge.specialize(&open, &int32).unwrap() else {
        panic!("List[int] is a type");
    };
    let list = bridge.construct(&list_type, &[]).unwrap();

    let mut group = c.benchmark_group("conversion");
    for len in [10usize, 100, 1000] {
        let items: Vec<HostValue> = (0..len as i128).map(HostValue::Int).collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("iterate", len), &items, |b, items| {
            let filled = bridge.construct(&list_type, &[]).unwrap();
            for item in items {
                bridge.call_method(&filled, "Add", std::slice::from_ref(item)).unwrap();
            }
            b.iter(|| bridge.iter(&filled).unwrap().count())
        });
    }
    group.throughput(Throughput::Elements(1));
    group.bench_function("add", |b| {
        b.iter(|| {
            bridge
                .call_method(&list, "Add", black_box(&[HostValue::Int(1)]))
                .unwrap()
        })
    });
    group.finish();
}

fn callback_benchmarks(c: &mut Criterion) {
    let runtime = Arc::new(MemoryRuntime::new());
    let bridge = Bridge::new(runtime.clone());
    let func = bridge.lookup_type("System.Func`2").unwrap();
    let int32 = HostValue::Type(bridge.lookup_type("System.Int32").unwrap());
    let HostValue::Type(unary) = bridge
        .specialize(&func, &HostValue::List(vec![int32.clone(), int32]))
        .unwrap()
    else {
        panic!("Func[int, int] is a type");
    };
    let increment = HostValue::Callable(HostCallable::with_arity("increment", 1, |args| {
        match args {
            [HostValue::Int(n)] => Ok(HostValue::Int(n + 1)),
            _ => Ok(HostValue::None),
        }
    }));

    let mut group = c.benchmark_group("callback");
    group.bench_function("wrap", |b| {
        b.iter(|| bridge.wrap_callback(black_box(&increment), &unary).unwrap())
    });

    let HostValue::Object(delegate) = bridge.wrap_callback(&increment, &unary).unwrap() else {
        panic!("delegates are foreign objects");
    };
    let args = [ForeignValue::Int32(1)];
    group.bench_function("invoke", |b| {
        b.iter(|| {
            runtime
                .invoke_delegate(delegate.value(), black_box(&args))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    overload_benchmarks,
    member_benchmarks,
    conversion_benchmarks,
    callback_benchmarks
);

criterion_main!(benches);
