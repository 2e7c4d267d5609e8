//! Benchmarks for learner dispatch.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use vw_bridge::{Learner, ReferenceEngine, repair};

const HEIGHT_DATA: &str = "|f height:0.23 weight:0.25 width:0.05";

fn bench_streaming_learn(c: &mut Criterion) {
    let mut learner = Learner::open(ReferenceEngine, "--quiet").unwrap();
    let sample = format!("0.5 {HEIGHT_DATA}");

    c.bench_function("learn_streaming", |bench| {
        bench.iter(|| black_box(learner.learn(black_box(&sample)).unwrap()))
    });
}

fn bench_predict(c: &mut Criterion) {
    let mut learner = Learner::open(ReferenceEngine, "--quiet").unwrap();
    for label in ["0.1", "0.9", "0.4"] {
        learner.learn(&format!("{label} {HEIGHT_DATA}")).unwrap();
    }

    c.bench_function("predict", |bench| {
        bench.iter(|| black_box(learner.predict(black_box(HEIGHT_DATA)).unwrap()))
    });
}

fn bench_open_close(c: &mut Criterion) {
    c.bench_function("open_close", |bench| {
        bench.iter(|| {
            let mut learner = Learner::open(ReferenceEngine, black_box("--quiet")).unwrap();
            learner.close();
        })
    });
}

fn bench_repair(c: &mut Criterion) {
    let args = "--quiet --loss_function logistic --link logistic -t -i /models/house.model";
    c.bench_function("strip_link_directive", |bench| {
        bench.iter(|| black_box(repair::strip_link_directive(black_box(args))))
    });
}

criterion_group!(
    benches,
    bench_streaming_learn,
    bench_predict,
    bench_open_close,
    bench_repair
);
criterion_main!(benches);
