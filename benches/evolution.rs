//! Performance benchmarks for evograph

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use evograph::architect::{self, LstmOptions, RandomOptions};
use evograph::methods::Mutation;
use evograph::Network;

use rand::seq::SliceRandom;

fn benchmark_activate(c: &mut Criterion) {
    let mut group = c.benchmark_group("activate");

    for hidden in [4, 16, 64].iter() {
        let mut net = architect::perceptron(&[8, *hidden, 4]).unwrap();
        let inputs = [0.5f64; 8];

        group.bench_with_input(BenchmarkId::new("perceptron", hidden), hidden, |b, _| {
            b.iter(|| net.activate(black_box(&inputs)).unwrap());
        });
    }

    let mut lstm = architect::lstm(&[8, 8, 4], &LstmOptions::default()).unwrap();
    let inputs = [0.5f64; 8];
    group.bench_function("lstm", |b| {
        b.iter(|| lstm.activate(black_box(&inputs)).unwrap());
    });

    group.finish();
}

fn benchmark_propagate(c: &mut Criterion) {
    let mut net = architect::perceptron(&[8, 16, 4]).unwrap();
    let inputs = [0.5f64; 8];
    let target = [0.5f64; 4];

    c.bench_function("propagate", |b| {
        b.iter(|| {
            net.activate(black_box(&inputs)).unwrap();
            net.propagate(0.1, 0.0, true, black_box(&target)).unwrap();
        });
    });
}

fn benchmark_mutation(c: &mut Criterion) {
    let catalog = Mutation::all();
    let mut rng = rand::thread_rng();

    c.bench_function("mutation", |b| {
        let mut net = architect::random(
            8,
            12,
            4,
            &RandomOptions {
                back_connections: 4,
                self_connections: 4,
                gates: 4,
                seed: Some(42),
                ..RandomOptions::default()
            },
        );
        b.iter(|| {
            let method = catalog.choose(&mut rng).unwrap();
            net.mutate(black_box(method));
        });
    });
}

fn benchmark_wire(c: &mut Criterion) {
    let mut net = architect::lstm(&[8, 8, 4], &LstmOptions::default()).unwrap();
    net.clear();
    let mut wire = net.to_wire();
    let inputs = [0.5f64; 8];

    c.bench_function("wire_activate", |b| {
        b.iter(|| wire.activate(black_box(&inputs)).unwrap());
    });

    c.bench_function("wire_serialize", |b| {
        b.iter(|| black_box(&net).to_wire());
    });
}

fn benchmark_crossover(c: &mut Criterion) {
    use evograph::methods::Crossover;

    let options = RandomOptions {
        seed: Some(7),
        ..RandomOptions::default()
    };
    let a = architect::random(8, 10, 4, &options);
    let b_net = architect::random(8, 6, 4, &options);

    c.bench_function("crossover_uniform", |b| {
        b.iter(|| Network::offspring(black_box(&a), black_box(&b_net), &Crossover::Uniform).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_activate,
    benchmark_propagate,
    benchmark_mutation,
    benchmark_wire,
    benchmark_crossover,
);

criterion_main!(benches);
