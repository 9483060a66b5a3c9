//! Benchmarks for simulating circuits through `act_on`.
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::f64::consts::PI;
use yao_sim::{Circuit, Gate, Operation, State, composite, control, measure, put, simulate};

/// H on every qubit.
fn h_all_circuit(n: usize) -> Circuit {
    let ops: Vec<Operation> = (0..n).map(|i| put(vec![i], Gate::H)).collect();
    Circuit::new(vec![2; n], ops).unwrap()
}

/// QFT with the final qubit reversal done by SWAPs.
fn qft_circuit(n: usize) -> Circuit {
    let mut ops = Vec::new();
    for i in 0..n {
        ops.push(put(vec![i], Gate::H));
        for j in 1..(n - i) {
            let theta = 2.0 * PI / (1 << (j + 1)) as f64;
            ops.push(control(vec![i + j], vec![i], Gate::Phase(theta)));
        }
    }
    for i in 0..(n / 2) {
        ops.push(put(vec![i, n - 1 - i], Gate::SWAP));
    }
    Circuit::new(vec![2; n], ops).unwrap()
}

/// GHZ preparation wrapped in nested composites, then a full readout.
fn nested_ghz_circuit(n: usize) -> Circuit {
    let mut body = vec![put(vec![0], Gate::H)];
    for i in 0..(n - 1) {
        let pair = vec![i, i + 1];
        body.push(composite(
            format!("link{i}"),
            pair,
            vec![control(vec![i], vec![i + 1], Gate::X)],
        ));
    }
    let all: Vec<usize> = (0..n).collect();
    let ops = vec![
        composite("ghz", all.clone(), body),
        measure("ghz", all),
    ];
    Circuit::new(vec![2; n], ops).unwrap()
}

fn bench_group(c: &mut Criterion, name: &str, sizes: &[usize], build: fn(usize) -> Circuit) {
    let mut group = c.benchmark_group(name);
    for &n_qubits in sizes {
        let circuit = build(n_qubits);
        let state = State::zero_state(&vec![2; n_qubits]);
        let mut rng = StdRng::seed_from_u64(0);

        group.bench_with_input(BenchmarkId::new("simulate", n_qubits), &n_qubits, |b, _| {
            b.iter(|| simulate(black_box(&circuit), black_box(&state), &mut rng))
        });
    }
    group.finish();
}

fn bench_h_all(c: &mut Criterion) {
    bench_group(c, "act_on_h_all", &[6, 8, 10, 12], h_all_circuit);
}

fn bench_qft(c: &mut Criterion) {
    bench_group(c, "act_on_qft", &[4, 6, 8, 10], qft_circuit);
}

fn bench_nested_composites(c: &mut Criterion) {
    bench_group(c, "act_on_nested_ghz", &[4, 6, 8, 10], nested_ghz_circuit);
}

criterion_group!(benches, bench_h_all, bench_qft, bench_nested_composites);
criterion_main!(benches);
