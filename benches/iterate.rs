use std::hint::black_box;

use criterion::*;

use corral::EntityManager;

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}

const AGENTS: usize = 100_000;

fn build_world() -> EntityManager {
    let mut entities = EntityManager::new();
    for i in 0..AGENTS {
        entities.create_with((
            Position {
                x: i as f32,
                y: 0.0,
            },
            Velocity { dx: 1.0, dy: 0.5 },
        ));
    }
    entities
}

fn iterate_benchmark(c: &mut Criterion) {
    let _ = env_logger::try_init();

    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(AGENTS as u64));

    group.bench_function("integrate_100k", |b| {
        let mut entities = build_world();
        b.iter(|| {
            entities.for_each2::<Position, Velocity>(|position, velocity| {
                position.x += velocity.dx;
                position.y += velocity.dy;
            });
            black_box(&entities);
        });
    });

    group.bench_function("count_100k", |b| {
        let entities = build_world();
        b.iter(|| black_box(entities.with::<(Position, Velocity)>().count()));
    });

    group.bench_function("stream_handles_100k", |b| {
        let entities = build_world();
        b.iter(|| {
            let mut visited = 0usize;
            for entity in entities.with::<(Position,)>().entities() {
                black_box(entity);
                visited += 1;
            }
            black_box(visited);
        });
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
