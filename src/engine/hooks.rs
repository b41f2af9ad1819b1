//! Game Hooks
//!
//! A game plugs into the engine through two traits: [`EntityBehavior`], one
//! instance per pooled entity, and [`Game`], one per engine. Hooks receive the
//! engine mutably; the engine takes the instance out of its slot for the
//! duration of the call.

use std::any::Any;

use crate::engine::engine::Engine;
use crate::game::entity::EntityId;
use crate::game::moves::Move;
use crate::game::resolver::Collider;
use crate::game::spawn::SpawnArgs;

/// Result of a game hook or input action.
pub type GameResult = anyhow::Result<()>;

/// Upcast to [`Any`] for typed access.
pub trait AsAny: Any {
    /// Borrow as `Any`.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-entity game logic.
///
/// Instances are pooled: a recycled entity keeps its behavior, so `on_spawn`
/// must reset whatever state the previous life left behind.
pub trait EntityBehavior: AsAny + Send {
    /// Entity placed on the grid.
    fn on_spawn(&mut self, _engine: &mut Engine, _id: EntityId, _args: &SpawnArgs) -> GameResult {
        Ok(())
    }

    /// A pending move was aborted because of `other`.
    fn on_collision(&mut self, _engine: &mut Engine, _id: EntityId, _other: Collider, _mv: Move) -> GameResult {
        Ok(())
    }

    /// Entity was moved by a bulk relocation.
    fn on_transposition(&mut self, _engine: &mut Engine, _id: EntityId) -> GameResult {
        Ok(())
    }
}

/// Game-wide logic.
pub trait Game: AsAny + Send {
    /// Called once when the engine is built.
    fn on_init(&mut self, _engine: &mut Engine) -> GameResult {
        Ok(())
    }

    /// Called every simulated tick, before movement resolution.
    fn on_iteration(&mut self, _engine: &mut Engine) -> GameResult {
        Ok(())
    }
}

/// Behavior that ignores every hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inert;

impl EntityBehavior for Inert {}

/// Game that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleGame;

impl Game for IdleGame {}

/// Factory producing a fresh behavior.
pub type BehaviorFactory = fn() -> Box<dyn EntityBehavior>;

/// Factory for a `Default` behavior type.
pub fn make_behavior<B: EntityBehavior + Default>() -> Box<dyn EntityBehavior> {
    Box::new(B::default())
}
