//! Benchmarks for indicator implementations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trading_core::traits::{CandleIndicator, Indicator};
use trading_core::types::Candle;
use trading_indicators::{defined, Ema, IndicatorConfig, IndicatorPipeline, Sma, SuperTrend};

fn generate_candles(size: usize) -> Vec<Candle> {
    (0..size)
        .map(|i| {
            let c = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Candle::new(i as i64 * 60_000, c - 0.2, c + 0.8, c - 0.9, c, 1_000.0)
        })
        .collect()
}

fn benchmark_moving_averages(c: &mut Criterion) {
    let mut group = c.benchmark_group("moving_average");

    for size in [500, 5_000, 50_000].iter() {
        let closes = defined(&generate_candles(*size).iter().map(|c| c.close).collect::<Vec<_>>());

        group.bench_with_input(BenchmarkId::new("sma_20", size), &closes, |b, data| {
            let sma = Sma::new(20);
            b.iter(|| sma.calculate(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("ema_50", size), &closes, |b, data| {
            let ema = Ema::new(50);
            b.iter(|| ema.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_supertrend(c: &mut Criterion) {
    let mut group = c.benchmark_group("supertrend");

    for size in [500, 5_000, 50_000].iter() {
        let candles = generate_candles(*size);

        group.bench_with_input(BenchmarkId::new("10x3", size), &candles, |b, data| {
            let st = SuperTrend::new(10, 3.0);
            b.iter(|| st.calculate(black_box(data)))
        });
    }

    group.finish();
}

/// The per-tick cost of a full recompute over a default-sized window.
fn benchmark_pipeline(c: &mut Criterion) {
    let pipeline = IndicatorPipeline::new(&[
        IndicatorConfig::new("ma_high").with("period", 20),
        IndicatorConfig::new("ma_low").with("period", 20),
        IndicatorConfig::new("supertrend"),
        IndicatorConfig::new("ema").with("period", 50),
    ])
    .expect("valid pipeline");
    let window = generate_candles(500);

    c.bench_function("pipeline_window_500", |b| {
        b.iter(|| pipeline.process(black_box(&window)))
    });
}

criterion_group!(
    benches,
    benchmark_moving_averages,
    benchmark_supertrend,
    benchmark_pipeline
);
criterion_main!(benches);
