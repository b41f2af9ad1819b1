//! Engine Builder
//!
//! Entity types are registered explicitly, then finalized in two passes:
//! first every shape is processed (which fixes the grid margin, the largest
//! shape dimension of any type), then each type's wall thresholds are
//! computed against that margin.

use std::collections::BTreeSet;

use tracing::info;

use crate::engine::config::EngineConfig;
use crate::engine::engine::Engine;
use crate::engine::error::EngineError;
use crate::engine::hooks::{make_behavior, BehaviorFactory, EntityBehavior, Game, Inert};
use crate::game::entity::EntityType;
use crate::game::shape::{acronym, Shape};
use crate::game::wall::{WallBounds, WallCorners};
use crate::render::layer::Rgb;
use crate::render::renderer::{NullSink, PixelSink};

/// Description of one entity type.
#[derive(Clone)]
pub struct EntityDescriptor {
    name: String,
    shape: Vec<Vec<u8>>,
    color: Rgb,
    cross: WallCorners,
    factory: BehaviorFactory,
}

impl std::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("color", &self.color)
            .field("cross", &self.cross)
            .finish_non_exhaustive()
    }
}

impl EntityDescriptor {
    /// Descriptor with no shape, white colour, no crossable walls and an
    /// [`Inert`] behavior.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: Vec::new(),
            color: Rgb::WHITE,
            cross: WallCorners::NONE,
            factory: make_behavior::<Inert>,
        }
    }

    /// Shape bitmap, one row per slice; non-zero cells are active.
    pub fn shape<R: AsRef<[u8]>>(mut self, rows: &[R]) -> Self {
        self.shape = rows.iter().map(|row| row.as_ref().to_vec()).collect();
        self
    }

    /// Colour of every cell.
    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// Walls entities of this type may cross into the margin.
    pub fn cross(mut self, cross: WallCorners) -> Self {
        self.cross = cross;
        self
    }

    /// Behavior constructed for every pooled instance.
    pub fn behavior<B: EntityBehavior + Default>(mut self) -> Self {
        self.factory = make_behavior::<B>;
        self
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Collects descriptors and builds an [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    descriptors: Vec<EntityDescriptor>,
    sink: Box<dyn PixelSink>,
}

impl EngineBuilder {
    /// Start from a configuration. Frames go to a [`NullSink`] unless
    /// [`EngineBuilder::sink`] is set.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            descriptors: Vec::new(),
            sink: Box::new(NullSink),
        }
    }

    /// Register an entity type.
    pub fn register(mut self, descriptor: EntityDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Where composed frames go.
    pub fn sink(mut self, sink: Box<dyn PixelSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Finalize types, build the engine and run `game.on_init`.
    pub fn build<G: Game>(self, game: G) -> Result<Engine, EngineError> {
        self.config
            .validate()
            .map_err(|err| EngineError::Config(err.to_string()))?;
        if self.descriptors.is_empty() {
            return Err(EngineError::Config("no entity types registered".into()));
        }

        let width = self.config.width as usize;
        let height = self.config.height as usize;

        // Pass 1: shapes and names
        let mut names = BTreeSet::new();
        let mut shapes = Vec::with_capacity(self.descriptors.len());
        for descriptor in &self.descriptors {
            if !names.insert(descriptor.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate entity type name: {}",
                    descriptor.name
                )));
            }
            let shape = Shape::from_bitmap(&descriptor.shape, width, height).map_err(|err| match err {
                EngineError::Config(msg) => EngineError::Config(format!("entity type {}: {}", descriptor.name, msg)),
                other => other,
            })?;
            shapes.push(shape);
        }
        let margin = shapes.iter().map(Shape::max_dimension).max().unwrap_or(0);

        // Pass 2: thresholds against the global margin
        let mut types = Vec::with_capacity(shapes.len());
        let mut factories = Vec::with_capacity(shapes.len());
        for (descriptor, shape) in self.descriptors.into_iter().zip(shapes) {
            types.push(EntityType {
                acronym: acronym(&descriptor.name),
                bounds: WallBounds::new(width as i32, height as i32, margin, descriptor.cross),
                name: descriptor.name,
                color: descriptor.color,
                shape,
                cross: descriptor.cross,
            });
            factories.push(descriptor.factory);
        }

        info!(
            types = types.len(),
            width,
            height,
            margin,
            refresh_rate = self.config.refresh_rate,
            "Engine built"
        );

        let mut engine = Engine::assemble(self.config, types, factories, self.sink);
        engine.init(Box::new(game))?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::hooks::{GameResult, IdleGame};
    use crate::game::spawn::SpawnArgs;

    fn dot() -> EntityDescriptor {
        let bitmap: &[&[u8]] = &[&[1]];
        EntityDescriptor::new("Dot").shape(bitmap)
    }

    #[test]
    fn test_no_types_is_fatal() {
        let result = EngineBuilder::new(EngineConfig::default()).build(IdleGame);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_duplicate_names_are_fatal() {
        let result = EngineBuilder::new(EngineConfig::default())
            .register(dot())
            .register(dot())
            .build(IdleGame);
        assert!(matches!(result, Err(EngineError::Config(msg)) if msg.contains("Dot")));
    }

    #[test]
    fn test_empty_bitmaps_are_fatal() {
        let empty: &[&[u8]] = &[];
        let blank: &[&[u8]] = &[&[0, 0], &[0, 0]];
        for bitmap in [empty, blank] {
            let result = EngineBuilder::new(EngineConfig::default())
                .register(EntityDescriptor::new("Ghost").shape(bitmap))
                .build(IdleGame);
            assert!(matches!(result, Err(EngineError::Config(_))));
        }
    }

    #[test]
    fn test_margin_is_largest_dimension() {
        let tall: &[&[u8]] = &[&[1], &[1], &[1], &[1]];
        let engine = EngineBuilder::new(EngineConfig::default())
            .register(dot())
            .register(EntityDescriptor::new("Pole").shape(tall).cross(WallCorners::BOTTOM))
            .build(IdleGame)
            .unwrap();

        let types = engine.entity_types();
        assert_eq!(types[0].bounds, WallBounds { left: 4, top: 4, right: 20, bottom: 20 });
        assert_eq!(types[1].bounds, WallBounds { left: 4, top: 4, right: 20, bottom: 24 });
        assert_eq!(types[1].acronym, "P");
    }

    #[test]
    fn test_build_runs_on_init() {
        struct Setup;

        impl Game for Setup {
            fn on_init(&mut self, engine: &mut Engine) -> GameResult {
                engine.spawn("Dot", (3, 3), 0, SpawnArgs::new())?;
                Ok(())
            }
        }

        let engine = EngineBuilder::new(EngineConfig::default())
            .register(dot())
            .build(Setup)
            .unwrap();
        assert_eq!(engine.occupants((3, 3)).len(), 1);
        assert!(engine.game::<Setup>().is_some());
    }

    #[test]
    fn test_failing_on_init_fails_build() {
        struct Broken;

        impl Game for Broken {
            fn on_init(&mut self, _engine: &mut Engine) -> GameResult {
                anyhow::bail!("missing level data")
            }
        }

        let result = EngineBuilder::new(EngineConfig::default()).register(dot()).build(Broken);
        assert!(matches!(result, Err(EngineError::Hook(_))));
    }
}
