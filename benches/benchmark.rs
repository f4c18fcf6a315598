use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hybrid_temporal_reasoner::{Relation, RelationSet, Solver, TimeInterval};

#[inline]
fn with_intervals<F>(f: F)
where
    F: Fn(&TimeInterval, &TimeInterval),
{
    let intervals: Vec<TimeInterval> = (0..5u8)
        .flat_map(|start| {
            (start + 1..=5).map(move |end| {
                TimeInterval::with_bounds("interval", f64::from(start), f64::from(end))
            })
        })
        .collect();

    for s in &intervals {
        for t in &intervals {
            f(black_box(s), black_box(t));
        }
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Relation", |b| {
        b.iter(|| {
            with_intervals(|s, t| {
                let _ = black_box(Relation::try_from_intervals(s, t));
            });
        })
    });

    c.bench_function("RelationSet::compose", |b| {
        let full = RelationSet::FULL;
        b.iter(|| {
            black_box(black_box(full).compose(black_box(full)));
        })
    });

    c.bench_function("Solver::propagate", |b| {
        b.iter(|| {
            let mut solver = Solver::new();
            for i in 0..8 {
                solver
                    .add_interval(TimeInterval::new(format!("event_{i}")))
                    .unwrap();
            }
            for i in 0..7 {
                solver
                    .add_single_relation(
                        &format!("event_{i}"),
                        &format!("event_{}", i + 1),
                        Relation::Precedes { is_inverted: false },
                    )
                    .unwrap();
            }
            for i in 0..6 {
                solver
                    .add_constraint(
                        &format!("event_{i}"),
                        &format!("event_{}", i + 2),
                        RelationSet::FULL,
                    )
                    .unwrap();
            }
            black_box(solver.propagate())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
