use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use dulasim::prelude::*;

const WEEK: f64 = 7.0 * 24.0 * 60.0;

fn weekly_dosing(weeks: usize) -> TimecourseSim {
    let tc = Timecourse::new(0.0, WEEK, 200).change("SCDOSE_dul", Quantity::new(1.5, Unit::Mg));
    TimecourseSim::new(vec![tc; weeks])
}

fn bench_pk_single_dose(c: &mut Criterion) {
    let model = dulaglutide_pk().compile().unwrap();
    let sim = TimecourseSim::single(
        Timecourse::new(0.0, 18.0 * 24.0 * 60.0, 1000)
            .change("SCDOSE_dul", Quantity::new(1.5, Unit::Mg)),
    );
    let selections = vec!["[Cve_dul]".to_string(), "[Cve_dm]".to_string()];
    c.bench_function("pk_single_dose", |b| {
        b.iter(|| black_box(simulate(&model, &sim, &selections, false).unwrap()))
    });
}

fn bench_whole_body_weekly(c: &mut Criterion) {
    let model = dulaglutide_body().unwrap().compile().unwrap();
    let sim = weekly_dosing(26);
    let selections = vec![
        "[Cve_dul]".to_string(),
        "hba1c".to_string(),
        "BW_change".to_string(),
    ];
    c.bench_function("whole_body_26_weeks", |b| {
        b.iter(|| black_box(simulate(&model, &sim, &selections, false).unwrap()))
    });
}

fn bench_cached_resimulation(c: &mut Criterion) {
    let model = dulaglutide_body().unwrap().compile().unwrap();
    let sim = weekly_dosing(4);
    let selections = vec!["[Cve_dul]".to_string()];
    // warm the cache once, then measure lookups
    simulate(&model, &sim, &selections, true).unwrap();
    c.bench_function("cached_resimulation", |b| {
        b.iter(|| black_box(simulate(&model, &sim, &selections, true).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_pk_single_dose,
    bench_whole_body_weekly,
    bench_cached_resimulation
);
criterion_main!(benches);
