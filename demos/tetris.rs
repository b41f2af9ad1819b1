//! Tetris
//!
//! Tetrominoes enter through the top wall at a random column and angle. A
//! landed piece clears the full rows under it and drops what was above. A
//! piece that lands while still partly hidden ends the round: the board is
//! wiped and play starts over.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pixelgrid::{
    game::{ROTATE_CCW, ROTATE_CW, SHIFT_DOWN, SHIFT_LEFT, SHIFT_RIGHT},
    AnglePolicy, Button, ButtonState, Collider, Engine, EngineBuilder, EngineConfig, EngineTask,
    EntityBehavior, EntityDescriptor, EntityId, ErrorReporter, FrameCapture, FrameLoop, Game,
    GameResult, Move, PixelOrder, Rgb, SpawnArgs, SpawnDirective, WallCorners,
};

const SIDE_SPEED: u32 = 4;
const DOWN_SPEED: u64 = 20;
const FAST_SPEED: u64 = DOWN_SPEED / 2;
const SLOW_SPEED: u64 = DOWN_SPEED * 2;

const TETROMINOES: [(&str, Rgb, &[&[u8]]); 7] = [
    ("T1", Rgb::CYAN, &[&[1, 1, 1, 1]]),
    ("T2", Rgb::BLUE, &[&[1, 0, 0], &[1, 1, 1]]),
    ("T3", Rgb::ORANGE, &[&[1, 1, 1], &[1, 0, 0]]),
    ("T4", Rgb::YELLOW, &[&[1, 1], &[1, 1]]),
    ("T5", Rgb::GREEN, &[&[0, 1, 1], &[1, 1, 0]]),
    ("T6", Rgb::PURPLE, &[&[0, 1, 0], &[1, 1, 1]]),
    ("T7", Rgb::RED, &[&[1, 1, 0], &[0, 1, 1]]),
];

#[derive(Default)]
struct Tetromino;

impl Tetromino {
    /// Clear the first run of full rows and drop everything above it.
    fn destroy_filled_rows(engine: &mut Engine) -> GameResult {
        let field = engine.field_size();
        let is_full = |engine: &Engine, y: i32| (0..field.width).all(|x| !engine.occupants((x, y)).is_empty());

        let mut above = BTreeSet::new();
        let mut hollow = 0;
        while hollow < field.height && !is_full(engine, hollow) {
            for x in 0..field.width {
                above.extend(engine.occupants((x, hollow)).iter().copied());
            }
            hollow += 1;
        }

        let mut filled = 0;
        while hollow + filled < field.height && is_full(engine, hollow + filled) {
            for x in 0..field.width {
                engine.destroy_cell((x, hollow + filled), true);
            }
            filled += 1;
        }
        if filled == 0 {
            return Ok(());
        }

        info!(rows = filled, "Rows cleared");
        let fall = vec![SHIFT_DOWN; filled as usize];
        engine.noclip(|engine, batch| {
            for id in above.iter().copied().filter(|id| engine.is_alive(*id)) {
                batch.relocate_where(id, &fall, move |cell| cell.y < hollow);
            }
            Ok(())
        })?;
        Ok(())
    }
}

impl EntityBehavior for Tetromino {
    fn on_collision(&mut self, engine: &mut Engine, id: EntityId, other: Collider, mv: Move) -> GameResult {
        let landed = match other {
            Collider::Entity(_) => true,
            Collider::Wall(walls) => walls.contains(WallCorners::BOTTOM),
        };
        if mv != SHIFT_DOWN || !landed {
            return Ok(());
        }

        if !engine.is_fully_visible(id)? {
            info!(iteration = engine.iteration(), "Game over");
            engine.destroy_block(id, true);
            let rest: Vec<EntityId> = engine.spawned_entities().filter(|other| *other != id).collect();
            for other in rest {
                engine.destroy_block(other, false);
            }
        } else {
            Self::destroy_filled_rows(engine)?;
        }
        Tetris::spawn_falling(engine)
    }
}

struct Tetris {
    falling: Option<EntityId>,
    speed: u64,
}

impl Default for Tetris {
    fn default() -> Self {
        Self { falling: None, speed: DOWN_SPEED }
    }
}

impl Tetris {
    fn spawn_random(engine: &mut Engine) -> anyhow::Result<EntityId> {
        let name = engine.rng_mut().choose(&TETROMINOES).map(|(name, _, _)| *name).unwrap_or("T1");
        let id = engine.spawn(
            name,
            (SpawnDirective::Random, SpawnDirective::Start),
            AnglePolicy::Random,
            SpawnArgs::new(),
        )?;
        Ok(id)
    }

    fn spawn_falling(engine: &mut Engine) -> GameResult {
        let id = Self::spawn_random(engine)?;
        if let Some(game) = engine.game_mut::<Tetris>() {
            game.falling = Some(id);
        }
        Ok(())
    }

    fn falling(engine: &Engine) -> Option<EntityId> {
        engine.game::<Tetris>().and_then(|game| game.falling).filter(|id| engine.is_alive(*id))
    }

    fn move_falling(engine: &mut Engine, mv: Move) -> GameResult {
        if let Some(id) = Self::falling(engine) {
            engine.move_entity(id, mv)?;
        }
        Ok(())
    }

    fn set_speed(engine: &mut Engine, speed: u64) {
        if let Some(game) = engine.game_mut::<Tetris>() {
            game.speed = speed;
        }
    }
}

impl Game for Tetris {
    fn on_init(&mut self, engine: &mut Engine) -> GameResult {
        self.falling = Some(Self::spawn_random(engine)?);

        let buttons = [Button::ArrowLeft, Button::ArrowRight, Button::ArrowUp, Button::ArrowDown, Button::A, Button::B];
        let restore = |engine: &mut Engine, buttons: ButtonState| -> GameResult {
            if !(buttons.is_pressed(Button::ArrowUp) || buttons.is_pressed(Button::ArrowDown)) {
                Tetris::set_speed(engine, DOWN_SPEED);
            }
            Ok(())
        };
        engine
            .controllers()
            .build("Play", &buttons)
            .on_press(Button::ArrowDown, |engine: &mut Engine, buttons: ButtonState| -> GameResult {
                if !buttons.is_pressed(Button::ArrowUp) {
                    Tetris::set_speed(engine, FAST_SPEED);
                }
                Ok(())
            })
            .on_press(Button::ArrowUp, |engine: &mut Engine, buttons: ButtonState| -> GameResult {
                if !buttons.is_pressed(Button::ArrowDown) {
                    Tetris::set_speed(engine, SLOW_SPEED);
                }
                Ok(())
            })
            .on_press_every(Button::ArrowLeft, SIDE_SPEED, |engine: &mut Engine, buttons: ButtonState| -> GameResult {
                if !buttons.is_pressed(Button::ArrowRight) {
                    Tetris::move_falling(engine, SHIFT_LEFT)?;
                }
                Ok(())
            })
            .on_press_every(Button::ArrowRight, SIDE_SPEED, |engine: &mut Engine, buttons: ButtonState| -> GameResult {
                if !buttons.is_pressed(Button::ArrowLeft) {
                    Tetris::move_falling(engine, SHIFT_RIGHT)?;
                }
                Ok(())
            })
            .on_press(Button::A, |engine: &mut Engine, _: ButtonState| Tetris::move_falling(engine, ROTATE_CCW))
            .on_press(Button::B, |engine: &mut Engine, _: ButtonState| Tetris::move_falling(engine, ROTATE_CW))
            .on_release(Button::ArrowUp, restore)
            .on_release(Button::ArrowDown, restore)
            .finish();
        Ok(())
    }

    fn on_iteration(&mut self, engine: &mut Engine) -> GameResult {
        if engine.is_nth_iteration(self.speed) {
            if let Some(id) = self.falling.filter(|id| engine.is_alive(*id)) {
                engine.move_entity(id, SHIFT_DOWN)?;
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
        width: 10,
        height: 16,
        pixel_order: PixelOrder::RowMajor,
        ..Default::default()
    };
    let width = config.width as usize;
    let capture = FrameCapture::new();

    let mut builder = EngineBuilder::new(config.clone()).sink(Box::new(capture.clone()));
    for (name, color, shape) in TETROMINOES {
        builder = builder.register(
            EntityDescriptor::new(name)
                .shape(shape)
                .color(color)
                .cross(WallCorners::TOP)
                .behavior::<Tetromino>(),
        );
    }
    let mut engine = builder.build(Tetris::default())?;

    let input = engine.input_handle();
    let play = engine.controllers().ids().next().context("no controller declared")?;
    let task = EngineTask::spawn(FrameLoop::new(engine, ErrorReporter::tracing(config.project_id)));

    input.connect(play)?;
    let script = [
        (Button::ArrowLeft.mask(), 300),
        (0, 500),
        (Button::B.mask(), 100),
        (Button::ArrowDown.mask(), 2000),
        (Button::ArrowRight.mask(), 250),
        (Button::ArrowDown.mask(), 3000),
        (0, 1000),
    ];
    for (bits, millis) in script {
        input.state(play, bits)?;
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
    input.disconnect(play)?;

    let engine = task.stop_and_join().await?;
    info!(iterations = engine.iteration(), hash = %hex::encode(engine.state_hash()), "Tetris finished");
    print_frame(&capture.last_frame(), width);
    Ok(())
}
