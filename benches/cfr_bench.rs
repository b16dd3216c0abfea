//! Benchmarks for the engine and the CFR+ solver.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_solver_3max::cfr::policy::PolicyTable;
use rust_solver_3max::cfr::{CfrPlusSolver, SolverConfig};
use rust_solver_3max::games::holdem::{
    AbstractionMode, HandState, InfosetEncoder, TableConfig, ThreeMaxGame,
};

fn random_hand_benchmark(c: &mut Criterion) {
    let table = TableConfig::default();
    let policy = PolicyTable::new();
    let mut rng = StdRng::seed_from_u64(42);

    c.bench_function("engine_random_hand", |b| {
        b.iter(|| {
            let mut state = HandState::new(table, &mut rng).unwrap();
            while !state.is_terminal() {
                let legal = state.legal_actions();
                let action = policy.act(0, legal, &mut rng).unwrap();
                state.apply_action(state.to_act, action).unwrap();
            }
            black_box(state.net_change)
        })
    });
}

fn infoset_key_benchmark(c: &mut Criterion) {
    let encoder = InfosetEncoder::new(AbstractionMode::Full);
    let mut rng = StdRng::seed_from_u64(7);
    let state = HandState::new(TableConfig::default(), &mut rng).unwrap();

    c.bench_function("infoset_key", |b| {
        b.iter(|| black_box(encoder.key(black_box(&state), state.to_act).unwrap()))
    });
}

fn iteration_benchmark(c: &mut Criterion) {
    let game = ThreeMaxGame::new(TableConfig::default(), AbstractionMode::Full);
    let config = SolverConfig::default().with_seed(42);
    let mut solver = CfrPlusSolver::new(game, config);

    c.bench_function("cfr_single_iteration", |b| {
        b.iter(|| {
            solver.run_iteration().unwrap();
            black_box(solver.iteration())
        })
    });
}

fn coarse_100_iterations_benchmark(c: &mut Criterion) {
    c.bench_function("cfr_coarse_100_iterations", |b| {
        b.iter(|| {
            let game = ThreeMaxGame::new(TableConfig::with_stacks(20.0), AbstractionMode::Coarse);
            let config = SolverConfig::default().with_seed(42);
            let mut solver = CfrPlusSolver::new(game, config);
            solver.train(black_box(100)).unwrap().info_sets
        })
    });
}

criterion_group!(
    benches,
    random_hand_benchmark,
    infoset_key_benchmark,
    iteration_benchmark,
    coarse_100_iterations_benchmark
);
criterion_main!(benches);
