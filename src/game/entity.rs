//! Entities and Entity Types
//!
//! An entity type is the finalized form of a registered descriptor: its
//! shape, colour and per-type wall thresholds. An entity is one pooled
//! instance of a type with its position and pending moves.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::game::moves::{Move, MoveKind};
use crate::game::position::Position;
use crate::game::shape::Shape;
use crate::game::wall::{WallBounds, WallCorners};
use crate::render::layer::Rgb;

// =============================================================================
// IDS
// =============================================================================

/// Pool slot of an entity.
///
/// Ids are reused after a destroyed entity is recycled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Index into the pool.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registration index of an entity type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityTypeId(pub u16);

impl EntityTypeId {
    /// Index into the type table.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

// =============================================================================
// ENTITY TYPE
// =============================================================================

/// Finalized entity type.
#[derive(Clone, Debug)]
pub struct EntityType {
    /// Registered name
    pub name: String,
    /// Short tag for grid dumps
    pub acronym: String,
    /// Colour drawn for every cell
    pub color: Rgb,
    /// Normalized shape
    pub shape: Shape,
    /// Walls this type may cross into the margin
    pub cross: WallCorners,
    /// Thresholds in extended grid space
    pub bounds: WallBounds,
}

// =============================================================================
// ENTITY
// =============================================================================

/// One pooled entity.
///
/// `B` is the behavior payload; it lives in an `Option` so hooks can take it
/// out while they run.
#[derive(Debug)]
pub struct Entity<B> {
    id: EntityId,
    ty: EntityTypeId,
    /// Current placement in extended grid space
    pub position: Position,
    pending: [Option<Move>; 2],
    /// Behavior instance, constructed once per pool slot
    pub behavior: Option<B>,
}

impl<B> Entity<B> {
    /// Create an entity with an empty position.
    pub fn new(id: EntityId, ty: EntityTypeId, behavior: B) -> Self {
        Self {
            id,
            ty,
            position: Position::default(),
            pending: [None, None],
            behavior: Some(behavior),
        }
    }

    /// Pool id.
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Type id.
    #[inline]
    pub fn entity_type(&self) -> EntityTypeId {
        self.ty
    }

    /// Request a move. Overwrites any pending move of the same kind.
    #[inline]
    pub fn request(&mut self, mv: Move) {
        self.pending[mv.kind().index()] = Some(mv);
    }

    /// Pending move of `kind`.
    #[inline]
    pub fn pending(&self, kind: MoveKind) -> Option<Move> {
        self.pending[kind.index()]
    }

    /// Drop the pending move of `kind`.
    #[inline]
    pub fn abort(&mut self, kind: MoveKind) {
        self.pending[kind.index()] = None;
    }

    /// Drop every pending move.
    pub fn clear_pending(&mut self) {
        self.pending = [None, None];
    }
}
