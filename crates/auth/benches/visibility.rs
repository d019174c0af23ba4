use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use ledgerly_auth::{Capabilities, Capability, Feature, Role, can_show, visible_features};

/// Gated surfaces evaluate on every render, so a single decision should stay
/// in the nanosecond range.
fn bench_can_show(c: &mut Criterion) {
    let caps = Capabilities::default()
        .with(Capability::CreateInventory)
        .with(Capability::CreateProducts);

    let mut group = c.benchmark_group("can_show");
    for role in [Role::Admin, Role::Customer, Role::User] {
        group.bench_with_input(BenchmarkId::from_parameter(role), &role, |b, role| {
            b.iter(|| {
                for feature in Feature::ALL {
                    black_box(can_show(Some(*role), Some(black_box(&caps)), feature));
                }
            })
        });
    }
    group.finish();
}

fn bench_menu(c: &mut Criterion) {
    let caps = Capabilities::default().with(Capability::CreateUsers);
    c.bench_function("visible_features/customer", |b| {
        b.iter(|| visible_features(black_box(Some(Role::Customer)), black_box(Some(&caps))))
    });
}

criterion_group!(benches, bench_can_show, bench_menu);
criterion_main!(benches);
