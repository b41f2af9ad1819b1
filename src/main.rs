//! Pixelgrid Runner
//!
//! Runs a bouncing-ball demo on the configured field until Ctrl-C.
//! The first argument, if given, is a JSON config file.

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pixelgrid::{
    game::Shift,
    render::NullSink,
    Collider, Engine, EngineBuilder, EngineConfig, EngineTask, EntityBehavior, EntityDescriptor,
    EntityId, ErrorReporter, FrameLoop, Game, GameResult, Move, Rgb, SpawnArgs, SpawnDirective,
    VERSION,
};

/// Ball that reflects off walls and other balls.
#[derive(Default)]
struct Ball {
    heading: Option<Shift>,
}

impl EntityBehavior for Ball {
    fn on_spawn(&mut self, engine: &mut Engine, id: EntityId, _args: &SpawnArgs) -> GameResult {
        self.heading = Some(Shift::DOWN_RIGHT);
        engine.move_entity(id, Shift::DOWN_RIGHT)?;
        Ok(())
    }

    fn on_collision(&mut self, _engine: &mut Engine, _id: EntityId, other: Collider, mv: Move) -> GameResult {
        let Some(shift) = mv.as_shift() else {
            return Ok(());
        };
        let bounce = match other {
            Collider::Wall(walls) => Shift::new(
                if walls.is_horizontal() { -1 } else { 1 },
                if walls.is_vertical() { -1 } else { 1 },
            ),
            Collider::Entity(_) => Shift::new(-1, -1),
        };
        self.heading = Some(shift * bounce);
        Ok(())
    }
}

/// Keeps every ball moving along its heading.
struct Bouncer;

impl Game for Bouncer {
    fn on_init(&mut self, engine: &mut Engine) -> GameResult {
        engine.spawn("Ball", (SpawnDirective::Center, SpawnDirective::Center), 0, SpawnArgs::new())?;
        engine.spawn("Ball", (1, 2), 0, SpawnArgs::new())?;
        Ok(())
    }

    fn on_iteration(&mut self, engine: &mut Engine) -> GameResult {
        if !engine.is_nth_iteration(4) {
            return Ok(());
        }
        let balls: Vec<EntityId> = engine.spawned_entities().collect();
        for id in balls {
            if let Some(heading) = engine.behavior::<Ball>(id).and_then(|ball| ball.heading) {
                engine.move_entity(id, heading)?;
            }
        }
        Ok(())
    }
}

fn build(config: &EngineConfig) -> anyhow::Result<Engine> {
    let dot: &[&[u8]] = &[&[1]];
    let engine = EngineBuilder::new(config.clone())
        .register(EntityDescriptor::new("Ball").shape(dot).color(Rgb::CYAN).behavior::<Ball>())
        .build(Bouncer)?;
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    info!("Pixelgrid v{}", VERSION);

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };
    info!(
        width = config.width,
        height = config.height,
        refresh_rate = config.refresh_rate,
        seed = config.rng_seed,
        "Configuration loaded"
    );

    let mut reporter = ErrorReporter::tracing(config.project_id.clone());
    let engine = match build(&config) {
        Ok(engine) => engine,
        Err(err) => {
            error!(error = %err, "Failed to build game, running idle engine");
            reporter.report(&*err);
            let mut engine = Engine::idle(config.clone(), Box::new(NullSink));
            engine.activate_error_indicator();
            engine
        }
    };

    let task = EngineTask::spawn(FrameLoop::new(engine, reporter));
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Shutdown signal received");

    let engine = task.stop_and_join().await?;
    info!(
        iterations = engine.iteration(),
        hash = %hex::encode(engine.state_hash()),
        "Final state"
    );
    Ok(())
}
