//! Pong
//!
//! Two paddles, one ball. The ball reflects off the side walls and the
//! paddles; leaving through the top or bottom respawns it in the middle.
//! This demo drives both paddles from a short input script and prints the
//! last frame.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pixelgrid::{
    game::{Shift, SHIFT_LEFT, SHIFT_RIGHT},
    render::FrameCapture,
    Button, ButtonState, Collider, Engine, EngineBuilder, EngineConfig, EngineTask,
    EntityBehavior, EntityDescriptor, EntityId, ErrorReporter, FrameLoop, Game, GameResult, Move,
    PixelOrder, Rgb, SpawnArgs, SpawnDirective,
};

const SIDE_SPEED: u32 = 2;
const BALL_SPEED: u64 = 10;

#[derive(Default)]
struct Paddle;

impl EntityBehavior for Paddle {}

#[derive(Default)]
struct Ball {
    shift: Option<Shift>,
    newborn: u64,
}

impl Ball {
    const START: [Shift; 4] = [Shift::UP_LEFT, Shift::UP_RIGHT, Shift::DOWN_LEFT, Shift::DOWN_RIGHT];

    fn bounce(&mut self, engine: &mut Engine, id: EntityId, reflect: Shift) -> GameResult {
        if let Some(shift) = self.shift.as_mut() {
            *shift *= reflect;
            engine.move_entity(id, *shift)?;
        }
        Ok(())
    }
}

impl EntityBehavior for Ball {
    fn on_spawn(&mut self, engine: &mut Engine, _id: EntityId, _args: &SpawnArgs) -> GameResult {
        self.shift = engine.rng_mut().choose(&Self::START).copied();
        self.newborn = 2 * engine.config().refresh_rate as u64;
        Ok(())
    }

    fn on_collision(&mut self, engine: &mut Engine, id: EntityId, other: Collider, _mv: Move) -> GameResult {
        match other {
            Collider::Wall(walls) if walls.is_vertical() => {
                engine.destroy_block(id, true);
                let ball = Pong::spawn_ball(engine)?;
                if let Some(game) = engine.game_mut::<Pong>() {
                    game.ball = Some(ball);
                }
                Ok(())
            }
            Collider::Wall(_) => self.bounce(engine, id, Shift::DOWN_LEFT),
            Collider::Entity(paddle) => {
                let x = engine.reference(id)?.x;
                let left = engine.reference(paddle)?.x;
                let right = left + engine.width(paddle)?;
                if x < left || x >= right {
                    self.bounce(engine, id, Shift::UP_LEFT)
                } else {
                    self.bounce(engine, id, Shift::UP_RIGHT)
                }
            }
        }
    }
}

#[derive(Default)]
struct Pong {
    ball: Option<EntityId>,
}

impl Pong {
    fn spawn_ball(engine: &mut Engine) -> anyhow::Result<EntityId> {
        let id = engine.spawn(
            "Ball",
            (SpawnDirective::Center, SpawnDirective::Center),
            0,
            SpawnArgs::new(),
        )?;
        Ok(id)
    }

    fn spawn_paddle(engine: &mut Engine, player: usize, y: SpawnDirective) -> GameResult {
        let paddle = engine.spawn("Paddle", (SpawnDirective::Center, y), 0, SpawnArgs::new())?;

        engine
            .controllers()
            .build(format!("Player {}", player + 1), &[Button::ArrowLeft, Button::ArrowRight])
            .on_press_every(Button::ArrowLeft, SIDE_SPEED, move |engine: &mut Engine, buttons: ButtonState| {
                if !buttons.is_pressed(Button::ArrowRight) {
                    engine.move_entity(paddle, SHIFT_LEFT)?;
                }
                Ok(())
            })
            .on_press_every(Button::ArrowRight, SIDE_SPEED, move |engine: &mut Engine, buttons: ButtonState| {
                if !buttons.is_pressed(Button::ArrowLeft) {
                    engine.move_entity(paddle, SHIFT_RIGHT)?;
                }
                Ok(())
            })
            .finish();
        Ok(())
    }
}

impl Game for Pong {
    fn on_init(&mut self, engine: &mut Engine) -> GameResult {
        self.ball = Some(Self::spawn_ball(engine)?);
        Self::spawn_paddle(engine, 0, SpawnDirective::Start)?;
        Self::spawn_paddle(engine, 1, SpawnDirective::End)?;
        Ok(())
    }

    fn on_iteration(&mut self, engine: &mut Engine) -> GameResult {
        let Some(ball) = self.ball else {
            return Ok(());
        };
        let Some(state) = engine.behavior_mut::<Ball>(ball) else {
            return Ok(());
        };
        if state.newborn > 0 {
            state.newborn -= 1;
            return Ok(());
        }
        let shift = state.shift;
        if let Some(shift) = shift {
            if engine.is_nth_iteration(BALL_SPEED) {
                engine.move_entity(ball, shift)?;
            }
        }
        Ok(())
    }
}

fn print_frame(frame: &[Rgb], width: usize) {
    for row in frame.chunks(width) {
        let line: String = row
            .iter()
            .map(|pixel| if *pixel == Rgb::OFF { '.' } else { '#' })
            .collect();
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let config = EngineConfig {
        pixel_order: PixelOrder::RowMajor,
        ..Default::default()
    };
    let width = config.width as usize;
    let capture = FrameCapture::new();

    let paddle: &[&[u8]] = &[&[1, 1, 1, 1, 1]];
    let ball: &[&[u8]] = &[&[1]];
    let mut engine = EngineBuilder::new(config.clone())
        .register(EntityDescriptor::new("Paddle").shape(paddle).color(Rgb::RED).behavior::<Paddle>())
        .register(EntityDescriptor::new("Ball").shape(ball).color(Rgb::BLUE).behavior::<Ball>())
        .sink(Box::new(capture.clone()))
        .build(Pong::default())?;

    let input = engine.input_handle();
    let players: Vec<_> = engine.controllers().ids().collect();
    let task = EngineTask::spawn(FrameLoop::new(engine, ErrorReporter::tracing(config.project_id)));

    for id in &players {
        input.connect(*id)?;
    }
    let script = [
        (Button::ArrowLeft.mask(), 400),
        (0, 200),
        (Button::ArrowRight.mask(), 600),
        (0, 800),
    ];
    for (bits, millis) in script {
        for id in &players {
            input.state(*id, bits)?;
        }
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
    for id in &players {
        input.disconnect(*id)?;
    }

    let engine = task.stop_and_join().await?;
    info!(iterations = engine.iteration(), hash = %hex::encode(engine.state_hash()), "Pong finished");
    print_frame(&capture.last_frame(), width);
    Ok(())
}
