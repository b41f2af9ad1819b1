//! Tick throughput with a crowded field.
//!
//! Fills a 32×32 field with dots that all request a random shift every
//! frame, so both resolution phases see plenty of contention.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use pixelgrid::game::{Shift, Move};
use pixelgrid::{Engine, EngineBuilder, EngineConfig, EntityDescriptor, EntityId, Game, GameResult, SpawnArgs};

const HEADINGS: [Shift; 8] = [
    Shift::LEFT,
    Shift::RIGHT,
    Shift::UP,
    Shift::DOWN,
    Shift::UP_LEFT,
    Shift::UP_RIGHT,
    Shift::DOWN_LEFT,
    Shift::DOWN_RIGHT,
];

struct Swarm;

impl Game for Swarm {
    fn on_iteration(&mut self, engine: &mut Engine) -> GameResult {
        let ids: Vec<EntityId> = engine.spawned_entities().collect();
        for id in ids {
            if let Some(shift) = engine.rng_mut().choose(&HEADINGS).copied() {
                engine.move_entity(id, Move::from(shift))?;
            }
        }
        Ok(())
    }
}

fn swarm(every: usize) -> Engine {
    let dot: &[&[u8]] = &[&[1]];
    let mut engine = EngineBuilder::new(EngineConfig { width: 32, height: 32, ..Default::default() })
        .register(EntityDescriptor::new("Dot").shape(dot))
        .build(Swarm)
        .expect("engine builds");

    for y in 0..32 {
        for x in 0..32 {
            if (x + y * 32) % every == 0 {
                engine
                    .spawn("Dot", (x as i32, y as i32), 0, SpawnArgs::new())
                    .expect("free cell");
            }
        }
    }
    engine
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for every in [8usize, 3, 2] {
        group.bench_with_input(BenchmarkId::new("density", every), &every, |b, every| {
            b.iter_batched_ref(
                || swarm(*every),
                |engine| {
                    for _ in 0..10 {
                        engine.tick().expect("tick");
                    }
                    black_box(engine.state_hash())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
