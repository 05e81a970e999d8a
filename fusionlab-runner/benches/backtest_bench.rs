//! Criterion benchmarks for the bar loop.
//!
//! 1. Single backtest per strategy over growing series
//! 2. Parallel batch of independent symbols

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fusionlab_core::domain::MarketBar;
use fusionlab_runner::batch::{run_batch, BatchJob};
use fusionlab_runner::config::{BacktestConfig, StrategyConfig};
use fusionlab_runner::runner::run_backtest;
use fusionlab_runner::strategy::{SignalInputs, Strategy};

fn make_bars(n: usize) -> Vec<MarketBar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.07).sin() * 12.0 + i as f64 * 0.01;
            MarketBar::new(i as i64, close, close + 1.0, close - 1.0, close, 1_000_000.0)
        })
        .collect()
}

fn config_for(strategy: StrategyConfig) -> BacktestConfig {
    BacktestConfig {
        strategy,
        ..BacktestConfig::default()
    }
}

fn bench_single_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");
    group.sample_size(20);
    let configs = [
        config_for(StrategyConfig::BuyAndHold),
        BacktestConfig::default(),
    ];
    for n in [500usize, 2_000] {
        let bars = make_bars(n);
        for config in &configs {
            let strategy = Strategy::from_config(config, SignalInputs::default()).unwrap();
            group.bench_with_input(BenchmarkId::new(config.strategy.name(), n), &bars, |b, bars| {
                b.iter(|| run_backtest(black_box(bars), &strategy, config).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let config = BacktestConfig::default();
    let jobs: Vec<_> = (0..8)
        .map(|i| {
            let strategy = Strategy::from_config(&config, SignalInputs::default()).unwrap();
            BatchJob::new(format!("SYM{i}"), make_bars(1_000), strategy, &config)
        })
        .collect();

    let mut group = c.benchmark_group("batch");
    group.sample_size(10);
    group.bench_function("8x1000_ensemble", |b| b.iter(|| run_batch(black_box(&jobs), None)));
    group.finish();
}

criterion_group!(benches, bench_single_run, bench_batch);
criterion_main!(benches);
