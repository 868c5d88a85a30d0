use std::hint::black_box;

use chrono::NaiveDate;
use common::Money;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    DEFAULT_COMMISSION_RATE_BPS, OrderStatus, calculate_commission, format_order_number,
};

fn bench_commission_split(c: &mut Criterion) {
    c.bench_function("domain/calculate_commission", |b| {
        b.iter(|| {
            calculate_commission(
                black_box(Money::from_cents(1_234_567)),
                DEFAULT_COMMISSION_RATE_BPS,
            )
        });
    });
}

fn bench_transition_validation(c: &mut Criterion) {
    c.bench_function("domain/validate_transition", |b| {
        b.iter(|| {
            for current in OrderStatus::all() {
                for next in OrderStatus::all() {
                    let _ = black_box(current.validate_transition(*next));
                }
            }
        });
    });
}

fn bench_order_number_format(c: &mut Criterion) {
    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

    c.bench_function("domain/format_order_number", |b| {
        b.iter(|| format_order_number(black_box(date), black_box(417)));
    });
}

criterion_group!(
    benches,
    bench_commission_split,
    bench_transition_validation,
    bench_order_number_format
);
criterion_main!(benches);
