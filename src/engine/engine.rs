//! Engine Facade
//!
//! The engine owns the grid, the entity pool, the renderer and the game, and
//! advances all of them one tick at a time.
//!
//! ## Tick order
//!
//! 1. Send the previous frame to the pixel sink
//! 2. Advance animations (the rest is skipped while one runs, if configured)
//! 3. Draw the grid layer
//! 4. Flush staged entity additions and removals
//! 5. Drain controller events, run held periodic actions
//! 6. `Game::on_iteration`
//! 7. Resolve shifts and rotations, in a random order, dispatching collisions
//!
//! Hooks get `&mut Engine`. While a hook runs, its own behavior (or the game)
//! is taken out of the engine and put back afterwards.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::core::coord::{Coord, Orientation};
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::hooks::{BehaviorFactory, EntityBehavior, Game, GameResult, IdleGame};
use crate::game::entity::{Entity, EntityId, EntityType, EntityTypeId};
use crate::game::grid::Grid;
use crate::game::moves::{Move, MoveKind};
use crate::game::noclip::{self, NoclipBatch};
use crate::game::pool::EntityPool;
use crate::game::position::Position;
use crate::game::resolver::Resolver;
use crate::game::scratch::ScratchCache;
use crate::game::spawn::{AnglePolicy, FieldSize, SpawnArgs, SpawnPoint};
use crate::game::wall::WallCorners;
use crate::input::registry::{ControllerEvent, ControllerRegistry, InputError, InputHandle};
use crate::render::animation::Animator;
use crate::render::renderer::{LayerId, PixelSink, Renderer};

/// Pooled entity with a boxed behavior.
pub type EngineEntity = Entity<Box<dyn EntityBehavior>>;

/// The game engine.
pub struct Engine {
    config: EngineConfig,
    iteration: u64,
    rng: DeterministicRng,

    types: Vec<EntityType>,
    factories: Vec<BehaviorFactory>,
    names: BTreeMap<String, EntityTypeId>,

    grid: Grid,
    pool: EntityPool<Box<dyn EntityBehavior>>,
    scratch: ScratchCache<Position>,
    resolver: Resolver,

    renderer: Renderer,
    animator: Animator,

    controllers: ControllerRegistry<Engine>,
    input: InputHandle,
    events: mpsc::UnboundedReceiver<ControllerEvent>,

    game: Option<Box<dyn Game>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("iteration", &self.iteration)
            .field("types", &self.names.keys().collect::<Vec<_>>())
            .field("active", &self.pool.active_len())
            .field("controllers", &self.controllers.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Assemble an engine from finalized types. The game is not attached.
    pub(crate) fn assemble(
        config: EngineConfig,
        types: Vec<EntityType>,
        factories: Vec<BehaviorFactory>,
        sink: Box<dyn PixelSink>,
    ) -> Self {
        let width = config.width as i32;
        let height = config.height as i32;
        let margin = types.iter().map(|t| t.shape.max_dimension()).max().unwrap_or(0);
        let names = types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), EntityTypeId(i as u16)))
            .collect();
        let (input, events) = InputHandle::channel();

        Self {
            iteration: 0,
            rng: DeterministicRng::new(config.rng_seed),
            types,
            factories,
            names,
            grid: Grid::new(width, height, margin),
            pool: EntityPool::new(),
            scratch: ScratchCache::new(),
            resolver: Resolver::new(),
            renderer: Renderer::new(config.width as usize, config.height as usize, config.pixel_order, sink),
            animator: Animator::new(width, height, config.refresh_rate, config.blink_cycles),
            controllers: ControllerRegistry::new(),
            input,
            events,
            game: None,
            config,
        }
    }

    /// Engine with no entity types and an idle game.
    ///
    /// Used when the real game failed to build, usually together with
    /// [`Engine::activate_error_indicator`].
    pub fn idle(config: EngineConfig, sink: Box<dyn PixelSink>) -> Self {
        let mut engine = Self::assemble(config, Vec::new(), Vec::new(), sink);
        engine.game = Some(Box::new(IdleGame));
        engine
    }

    /// Attach the game and run its `on_init`.
    pub(crate) fn init(&mut self, game: Box<dyn Game>) -> Result<(), EngineError> {
        self.game = Some(game);
        self.with_game(|game, engine| game.on_init(engine))?;
        Ok(())
    }

    // =========================================================================
    // FRAME
    // =========================================================================

    /// Advance one tick.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        self.iteration += 1;
        self.renderer.render();

        let pause = self.config.pause_during_animations;
        if self.animator.advance(self.iteration, &mut self.renderer, pause) && pause {
            return Ok(());
        }

        self.draw_grid();
        self.pool.flush();

        #[cfg(feature = "debug-tracing")]
        trace!(iteration = self.iteration, grid = %self.grid_dump(), "Grid");

        self.process_input()?;
        self.with_game(|game, engine| game.on_iteration(engine))?;
        self.resolve_moves()
    }

    fn draw_grid(&mut self) {
        let pool = &self.pool;
        let types = &self.types;
        self.grid.draw(self.renderer.layer_mut(LayerId::Grid), |id| {
            let ty = pool.get(id)?.entity_type();
            types.get(ty.index()).map(|t| t.color)
        });
    }

    fn process_input(&mut self) -> GameResult {
        let mut registry = std::mem::take(&mut self.controllers);
        let mut result = Ok(());

        while let Ok(event) = self.events.try_recv() {
            match registry.handle(event, self) {
                Err(err) if err.downcast_ref::<InputError>().is_some() => {
                    warn!(error = %err, "Rejected controller event");
                }
                handled => {
                    if result.is_ok() {
                        result = handled;
                    }
                }
            }
        }

        let periodic = registry.run_periodic(self);
        if result.is_ok() {
            result = periodic;
        }

        // Controllers declared by actions during this step
        let declared = std::mem::replace(&mut self.controllers, registry);
        self.controllers.merge(declared);
        result
    }

    fn resolve_moves(&mut self) -> Result<(), EngineError> {
        let mut kinds = MoveKind::ALL;
        self.rng.shuffle(&mut kinds);

        for kind in kinds {
            let collisions = self.resolver.resolve(
                kind,
                &mut self.grid,
                &mut self.pool,
                &self.types,
                &mut self.scratch,
                &mut self.rng,
            );

            for (id, collision) in collisions {
                // Destroyed by an earlier callback
                if !self.pool.is_live(id) {
                    continue;
                }
                trace!(entity = %id, other = ?collision.other, mv = ?collision.mv, "Collision");
                self.with_behavior(id, |behavior, engine| {
                    behavior.on_collision(engine, id, collision.other, collision.mv)
                })?;
            }
        }
        Ok(())
    }

    fn with_game<F>(&mut self, f: F) -> GameResult
    where
        F: FnOnce(&mut dyn Game, &mut Engine) -> GameResult,
    {
        let Some(mut game) = self.game.take() else {
            return Ok(());
        };
        let result = f(game.as_mut(), self);
        if self.game.is_none() {
            self.game = Some(game);
        }
        result
    }

    fn with_behavior<F>(&mut self, id: EntityId, f: F) -> GameResult
    where
        F: FnOnce(&mut dyn EntityBehavior, &mut Engine) -> GameResult,
    {
        let Some(mut behavior) = self.pool.get_mut(id).and_then(|e| e.behavior.take()) else {
            return Ok(());
        };
        let result = f(behavior.as_mut(), self);
        if let Some(entity) = self.pool.get_mut(id) {
            if entity.behavior.is_none() {
                entity.behavior = Some(behavior);
            }
        }
        result
    }

    // =========================================================================
    // ENTITY OPERATIONS
    // =========================================================================

    /// Spawn an entity of the type registered as `name`.
    ///
    /// `at` is the field coordinate of the reference cell, per axis either a
    /// number or a [`SpawnDirective`](crate::game::spawn::SpawnDirective).
    pub fn spawn(
        &mut self,
        name: &str,
        at: impl Into<SpawnPoint>,
        angle: impl Into<AnglePolicy>,
        args: SpawnArgs,
    ) -> Result<EntityId, EngineError> {
        let ty = self.entity_type_id(name)?;
        self.spawn_type(ty, at, angle, args)
    }

    /// Spawn an entity by type id.
    pub fn spawn_type(
        &mut self,
        ty: EntityTypeId,
        at: impl Into<SpawnPoint>,
        angle: impl Into<AnglePolicy>,
        args: SpawnArgs,
    ) -> Result<EntityId, EngineError> {
        let entity_type = self
            .types
            .get(ty.index())
            .ok_or_else(|| EngineError::UnknownEntityType(ty.to_string()))?;

        let field = self.field_size();
        let orientation = angle.into().resolve(&mut self.rng);
        let point = at.into().resolve(orientation, &entity_type.shape, field, &mut self.rng);
        let reference = point + entity_type.bounds.origin();

        let mut bracket = self.scratch.bracket();
        let handle = bracket.acquire(&Position::default());
        bracket
            .get_mut(handle)
            .reset(reference, entity_type.shape.offsets(), orientation);

        let mut slots = Vec::with_capacity(entity_type.shape.offsets().len());
        let mut crossed = WallCorners::NONE;
        let mut occupants = BTreeSet::new();
        for cell in bracket.get(handle).cells() {
            match self.grid.classify(cell, &entity_type.bounds) {
                Ok(index) => {
                    occupants.extend(self.grid.slot_at(index).occupants().iter().copied());
                    slots.push(index);
                }
                Err(walls) => crossed |= walls,
            }
        }
        if !crossed.is_empty() {
            return Err(EngineError::OutOfBounds(crossed));
        }
        if !occupants.is_empty() {
            return Err(EngineError::SpawnConflict(occupants.into_iter().collect()));
        }

        let factory = self.factories[ty.index()];
        let id = self.pool.new_entity(ty, factory);
        if let Some(entity) = self.pool.get_mut(id) {
            entity.position.clone_from(bracket.get(handle));
        }
        drop(bracket);
        for index in slots {
            self.grid.add_at(index, id);
        }

        debug!(entity = %id, ty = %self.types[ty.index()].name, at = %point, "Spawned");

        self.with_behavior(id, |behavior, engine| behavior.on_spawn(engine, id, &args))?;
        Ok(id)
    }

    /// Request a move for the next resolution. A later request of the same
    /// kind replaces the earlier one.
    pub fn move_entity(&mut self, id: EntityId, mv: impl Into<Move>) -> Result<(), EngineError> {
        self.pool
            .live_mut(id)
            .ok_or(EngineError::MissingEntity(id))?
            .request(mv.into());
        Ok(())
    }

    /// Remove an entity from the grid and recycle it.
    ///
    /// Returns `false` if it was already destroyed.
    pub fn destroy_block(&mut self, id: EntityId, animate: bool) -> bool {
        let Some(entity) = self.pool.live(id) else {
            return false;
        };

        if animate {
            let grid = &self.grid;
            self.animator.blink_cells(
                entity
                    .position
                    .cells()
                    .filter(|cell| grid.is_visible(*cell))
                    .map(|cell| grid.to_field(cell)),
            );
        }
        self.grid.erase(id, &entity.position);
        debug!(entity = %id, "Destroyed");
        self.pool.delete(id)
    }

    /// Clear one field cell. Entities left without cells are destroyed.
    ///
    /// Returns how many entities lost a cell.
    pub fn destroy_cell(&mut self, at: impl Into<Coord>, animate: bool) -> usize {
        let field = at.into();
        let cell = self.grid.to_extended(field);
        let Some(index) = self.grid.index(cell) else {
            return 0;
        };

        let occupants = self.grid.take_occupants(index);
        if animate && !occupants.is_empty() && self.grid.is_visible(cell) {
            self.animator.blink_cells([field]);
        }

        let mut hit = 0;
        for id in occupants {
            let Some(entity) = self.pool.live_mut(id) else {
                continue;
            };
            entity.position.remove(cell);
            hit += 1;
            if !entity.position.has_cells() {
                debug!(entity = %id, "Destroyed by its last cell");
                self.pool.delete(id);
            }
        }
        hit
    }

    /// Relocate several entities at once, ignoring collisions between them.
    ///
    /// `build` registers participants. The batch is validated as a whole and
    /// either fully applied or not at all. Each participant then gets
    /// `on_transposition`.
    pub fn noclip<F>(&mut self, build: F) -> Result<(), EngineError>
    where
        F: FnOnce(&Engine, &mut NoclipBatch) -> Result<(), EngineError>,
    {
        let mut batch = NoclipBatch::new();
        build(self, &mut batch)?;
        if batch.is_empty() {
            return Ok(());
        }

        let moved = noclip::commit(batch, &mut self.grid, &mut self.pool, &self.types, &mut self.scratch)?;
        debug!(count = moved.len(), "Bulk relocation");

        for id in moved {
            if self.pool.is_live(id) {
                self.with_behavior(id, |behavior, engine| behavior.on_transposition(engine, id))?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    fn entity(&self, id: EntityId) -> Result<&EngineEntity, EngineError> {
        self.pool.live(id).ok_or(EngineError::MissingEntity(id))
    }

    /// Field coordinate of the reference cell.
    pub fn reference(&self, id: EntityId) -> Result<Coord, EngineError> {
        Ok(self.grid.to_field(self.entity(id)?.position.reference()))
    }

    /// Field coordinates of every remaining cell, in offset order.
    pub fn cells(&self, id: EntityId) -> Result<Vec<Coord>, EngineError> {
        let entity = self.entity(id)?;
        Ok(entity.position.cells().map(|c| self.grid.to_field(c)).collect())
    }

    /// Current orientation.
    pub fn orientation(&self, id: EntityId) -> Result<Orientation, EngineError> {
        Ok(self.entity(id)?.position.orientation())
    }

    /// Shape width of the entity's type.
    pub fn width(&self, id: EntityId) -> Result<i32, EngineError> {
        Ok(self.entity_type_of(id)?.shape.width())
    }

    /// Shape height of the entity's type.
    pub fn height(&self, id: EntityId) -> Result<i32, EngineError> {
        Ok(self.entity_type_of(id)?.shape.height())
    }

    /// True if every cell is inside the visible field.
    pub fn is_fully_visible(&self, id: EntityId) -> Result<bool, EngineError> {
        let entity = self.entity(id)?;
        Ok(entity.position.cells().all(|c| self.grid.is_visible(c)))
    }

    /// Type of a live entity.
    pub fn entity_type_of(&self, id: EntityId) -> Result<&EntityType, EngineError> {
        let ty = self.entity(id)?.entity_type();
        self.types
            .get(ty.index())
            .ok_or_else(|| EngineError::UnknownEntityType(ty.to_string()))
    }

    /// Type id registered under `name`.
    pub fn entity_type_id(&self, name: &str) -> Result<EntityTypeId, EngineError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownEntityType(name.to_string()))
    }

    /// Registered types, by id.
    pub fn entity_types(&self) -> &[EntityType] {
        &self.types
    }

    /// Active entities as of the last flush, in id order.
    pub fn spawned_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pool.active().filter(|id| self.pool.is_live(*id))
    }

    /// True if `id` exists and has not been destroyed.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.pool.is_live(id)
    }

    /// Occupants of a field cell, oldest first.
    pub fn occupants(&self, at: impl Into<Coord>) -> &[EntityId] {
        self.grid
            .slot(self.grid.to_extended(at.into()))
            .map(|slot| slot.occupants())
            .unwrap_or(&[])
    }

    /// Typed access to a live entity's behavior.
    ///
    /// Returns `None` while the entity's own hook is running.
    pub fn behavior<B: EntityBehavior>(&self, id: EntityId) -> Option<&B> {
        self.pool
            .live(id)?
            .behavior
            .as_deref()?
            .as_any()
            .downcast_ref::<B>()
    }

    /// Typed mutable access to a live entity's behavior.
    pub fn behavior_mut<B: EntityBehavior>(&mut self, id: EntityId) -> Option<&mut B> {
        self.pool
            .live_mut(id)?
            .behavior
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<B>()
    }

    /// Typed access to the game. `None` while a game hook is running.
    pub fn game<G: Game>(&self) -> Option<&G> {
        self.game.as_deref()?.as_any().downcast_ref::<G>()
    }

    /// Typed mutable access to the game.
    pub fn game_mut<G: Game>(&mut self) -> Option<&mut G> {
        self.game.as_deref_mut()?.as_any_mut().downcast_mut::<G>()
    }

    // =========================================================================
    // ENGINE STATE
    // =========================================================================

    /// Ticks so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// True on every `n`th tick.
    pub fn is_nth_iteration(&self, n: u64) -> bool {
        n != 0 && self.iteration % n == 0
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Field size.
    pub fn field_size(&self) -> FieldSize {
        FieldSize {
            width: self.grid.field_width(),
            height: self.grid.field_height(),
        }
    }

    /// Engine randomness, for games that want to stay deterministic.
    pub fn rng_mut(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    /// Sender for controller events.
    pub fn input_handle(&self) -> InputHandle {
        self.input.clone()
    }

    /// Controller registry.
    pub fn controllers(&mut self) -> &mut ControllerRegistry<Engine> {
        &mut self.controllers
    }

    /// Renderer.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Show the error indicator until the engine is dropped.
    pub fn activate_error_indicator(&mut self) {
        self.animator.activate_error();
    }

    /// True while any animation runs.
    pub fn is_animating(&self) -> bool {
        self.animator.is_active()
    }

    /// Text dump of the extended grid, labelled by type acronym.
    pub fn grid_dump(&self) -> String {
        self.grid.dump(|id| {
            self.pool
                .get(id)
                .and_then(|e| self.types.get(e.entity_type().index()))
                .map(|t| t.acronym.clone())
                .unwrap_or_else(|| id.to_string())
        })
    }

    /// Hash of the iteration counter, seed and every active placement.
    pub fn state_hash(&self) -> StateHash {
        compute_state_hash(self.iteration, self.config.rng_seed, |hasher| {
            hasher.update_u32(self.pool.active_len() as u32);
            for id in self.pool.active() {
                let Some(entity) = self.pool.get(id) else {
                    continue;
                };
                hasher.update_u32(id.0);
                hasher.update_u32(entity.entity_type().0 as u32);
                hasher.update_coord(entity.position.reference());
                hasher.update_orientation(entity.position.orientation());
                hasher.update_u32(entity.position.len() as u32);
                for offset in entity.position.offsets() {
                    hasher.update_coord(*offset);
                }
            }
        })
    }
}
