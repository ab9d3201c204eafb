//! Tick-loop throughput benchmark: a staffed six-stage line chewing through
//! a backlog of items.

use criterion::{criterion_group, criterion_main, Criterion};
use shopfloor_core::id::StageId;
use shopfloor_core::order::OrderLine;
use shopfloor_core::test_utils::*;

fn bench_advance(c: &mut Criterion) {
    c.bench_function("advance_six_stage_line", |b| {
        b.iter_with_setup(
            || {
                let mut engine = engine_with(6, 2);
                for stage in 0..6 {
                    for _ in 0..2 {
                        let _ = engine.hire(StageId(stage));
                    }
                }
                engine.accept_order(vec![OrderLine { product: widget(), quantity: 10 }]);
                engine
            },
            |mut engine| {
                for _ in 0..100 {
                    engine.advance(fixed(0.1));
                }
                engine
            },
        )
    });
}

criterion_group!(benches, bench_advance);
criterion_main!(benches);
