//! Criterion benchmarks for FusionLab core hot paths.
//!
//! Benchmarks:
//! 1. Indicator computation (SMA, EMA, RSI, MACD, Bollinger)
//! 2. Technical provider prediction over a trailing window
//! 3. Ensemble fusion of three sources
//! 4. Simulator open/close round trips

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use fusionlab_core::domain::{Action, ExitReason, MarketBar, Signal, SourceId};
use fusionlab_core::ensemble::SignalEnsembler;
use fusionlab_core::indicators::{
    Bollinger, BollingerBand, Ema, Indicator, Macd, MacdLine, Rsi, Sma,
};
use fusionlab_core::providers::{SignalContext, SignalProvider, TechnicalProvider};
use fusionlab_core::risk::OrderIntent;
use fusionlab_core::simulation::{CostModel, PortfolioSimulator};
use rand::rngs::StdRng;
use rand::SeedableRng;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<MarketBar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            MarketBar::new(i as i64, close - 0.3, close + 1.5, close - 1.5, close, 1_000_000.0)
        })
        .collect()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(20)),
        Box::new(Ema::new(20)),
        Box::new(Rsi::new(14)),
        Box::new(Macd::new(12, 26, 9, MacdLine::Histogram)),
        Box::new(Bollinger::new(20, 2.0, BollingerBand::PercentB)),
    ];
    for n in [252, 2520] {
        let bars = make_bars(n);
        for ind in &indicators {
            group.bench_with_input(BenchmarkId::new(ind.name(), n), &bars, |b, bars| {
                b.iter(|| black_box(ind.compute(black_box(bars))))
            });
        }
    }
    group.finish();
}

// ── 2. Technical provider ────────────────────────────────────────────

fn bench_technical_provider(c: &mut Criterion) {
    let bars: Arc<[MarketBar]> = Arc::from(make_bars(1000));
    let provider = TechnicalProvider::default();
    let ctx = SignalContext::new(Arc::from("BENCH"), bars, 999);
    c.bench_function("technical_predict_window_200", |b| {
        b.iter(|| black_box(provider.predict(black_box(&ctx))))
    });
}

// ── 3. Ensemble ──────────────────────────────────────────────────────

fn bench_ensemble(c: &mut Criterion) {
    let ensembler = SignalEnsembler::default();
    let signals = [
        Signal::buy(SourceId::model(), 0.8),
        Signal::sell(SourceId::technical(), 0.3),
        Signal::new(SourceId::sentiment(), Action::Hold, 0.0),
    ];
    c.bench_function("ensemble_combine_3", |b| {
        b.iter(|| black_box(ensembler.combine(black_box(&signals))))
    });
}

// ── 4. Simulator ─────────────────────────────────────────────────────

fn bench_simulator(c: &mut Criterion) {
    let costs = CostModel {
        slippage_jitter: 0.5,
        ..CostModel::default()
    };
    let intent = OrderIntent {
        direction: Action::Buy,
        size_fraction: 0.95,
        stop_loss_price: 0.0,
        take_profit_price: f64::MAX,
    };
    let entry = MarketBar::from_close(0, 100.0);
    let exit = MarketBar::from_close(1, 101.0);
    c.bench_function("simulator_round_trip", |b| {
        let mut sim = PortfolioSimulator::new(100_000.0, costs.clone(), StdRng::seed_from_u64(1));
        b.iter(|| {
            black_box(sim.open(&intent, &entry, 0));
            black_box(sim.close(&exit, 1, ExitReason::Signal));
        })
    });
}

criterion_group!(
    benches,
    bench_indicators,
    bench_technical_provider,
    bench_ensemble,
    bench_simulator
);
criterion_main!(benches);
