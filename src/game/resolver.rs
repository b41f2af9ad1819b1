//! Movement Resolution
//!
//! Moves are resolved per kind in two phases.
//!
//! 1. **Intention**: every active entity with a pending move of the kind
//!    applies it to the grid, unless it would swap places with an entity
//!    moving the opposite way or leave its bounds. A swap only cancels the
//!    pending moves; a party that already moved this phase keeps its cell.
//! 2. **Resolution**: movers are checked in random order. A mover sharing a
//!    cell is reverted; any revert puts every provisionally accepted mover
//!    back in the queue, since the reverted one may now overlap them.
//!
//! Collisions found along the way are recorded per entity and handed back
//! to the caller for dispatch.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::core::rng::DeterministicRng;
use crate::game::entity::{EntityId, EntityType};
use crate::game::grid::Grid;
use crate::game::moves::{Move, MoveKind, Shift};
use crate::game::pool::EntityPool;
use crate::game::position::Position;
use crate::game::scratch::ScratchCache;
use crate::game::wall::WallCorners;

/// What an entity collided with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collider {
    /// Field walls
    Wall(WallCorners),
    /// Another entity
    Entity(EntityId),
}

impl Collider {
    /// The walls, if this was a wall collision.
    pub fn walls(&self) -> Option<WallCorners> {
        match self {
            Collider::Wall(walls) => Some(*walls),
            Collider::Entity(_) => None,
        }
    }

    /// The other entity, if this was an entity collision.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Collider::Entity(id) => Some(*id),
            Collider::Wall(_) => None,
        }
    }
}

/// One recorded collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collision {
    /// Other party
    pub other: Collider,
    /// Move that caused it
    pub mv: Move,
}

/// Collisions of one move kind, keyed by the entity that will be notified.
pub type CollisionRecord = BTreeMap<EntityId, Collision>;

/// Reusable two-phase resolver state.
#[derive(Debug, Default)]
pub struct Resolver {
    collisions: CollisionRecord,
    ids: Vec<EntityId>,
    moving: Vec<EntityId>,
    accepted: Vec<EntityId>,
}

impl Resolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run both phases for one kind and return the collisions found.
    pub fn resolve<B>(
        &mut self,
        kind: MoveKind,
        grid: &mut Grid,
        pool: &mut EntityPool<B>,
        types: &[EntityType],
        scratch: &mut ScratchCache<Position>,
        rng: &mut DeterministicRng,
    ) -> CollisionRecord {
        self.collisions.clear();
        self.run_intention(kind, grid, pool, types, scratch);
        self.run_resolution(kind, grid, pool, scratch, rng);
        std::mem::take(&mut self.collisions)
    }

    /// Phase 1: apply every pending move of `kind`.
    pub fn run_intention<B>(
        &mut self,
        kind: MoveKind,
        grid: &mut Grid,
        pool: &mut EntityPool<B>,
        types: &[EntityType],
        scratch: &mut ScratchCache<Position>,
    ) {
        self.ids.clear();
        self.ids.extend(pool.active());

        for i in 0..self.ids.len() {
            let id = self.ids[i];
            let Some(entity) = pool.get(id) else { continue };
            let Some(mv) = entity.pending(kind) else { continue };

            if let Move::Shift(shift) = mv {
                if let Some((other, other_mv)) = find_swap(id, shift, grid, pool) {
                    trace!(%id, %other, "swap aborted");
                    self.record(id, Collider::Entity(other), mv);
                    self.record(other, Collider::Entity(id), other_mv);
                    for party in [id, other] {
                        if let Some(entity) = pool.get_mut(party) {
                            entity.abort(kind);
                        }
                    }
                    continue;
                }
            }

            let Some(entity) = pool.get_mut(id) else { continue };
            let Some(ty) = types.get(entity.entity_type().index()) else { continue };
            if let Err(walls) = grid.apply_move(id, &mut entity.position, &ty.bounds, &mv, scratch) {
                trace!(%id, %walls, "move hit wall");
                entity.abort(kind);
                self.record(id, Collider::Wall(walls), mv);
            }
        }
    }

    /// Phase 2: revert movers that ended up sharing a cell.
    pub fn run_resolution<B>(
        &mut self,
        kind: MoveKind,
        grid: &mut Grid,
        pool: &mut EntityPool<B>,
        scratch: &mut ScratchCache<Position>,
        rng: &mut DeterministicRng,
    ) {
        self.moving.clear();
        self.moving.extend(
            pool.active()
                .filter(|id| pool.get(*id).is_some_and(|e| e.pending(kind).is_some())),
        );
        self.accepted.clear();
        rng.shuffle(&mut self.moving);

        while let Some(id) = self.moving.pop() {
            let Some(entity) = pool.get_mut(id) else { continue };

            let mut clash: Option<Option<EntityId>> = None;
            for cell in entity.position.cells() {
                let Some(slot) = grid.slot(cell) else { continue };
                if slot.len() > 1 {
                    let other = if slot.len() == 2 {
                        slot.occupants().iter().copied().find(|o| *o != id)
                    } else {
                        None
                    };
                    clash = Some(other);
                    break;
                }
            }

            let Some(other) = clash else {
                self.accepted.push(id);
                continue;
            };

            let Some(mv) = entity.pending(kind) else { continue };
            grid.revert_move(id, &mut entity.position, &mv, scratch);
            entity.abort(kind);
            self.moving.append(&mut self.accepted);
            trace!(%id, ?other, "move reverted");

            if let Some(other) = other {
                self.record(id, Collider::Entity(other), mv);
            }
        }

        for id in self.accepted.drain(..) {
            if let Some(entity) = pool.get_mut(id) {
                entity.abort(kind);
            }
        }
    }

    fn record(&mut self, id: EntityId, other: Collider, mv: Move) {
        self.collisions.insert(id, Collision { other, mv });
    }
}

/// Another entity standing where `id` wants to go and shifting the opposite
/// way.
fn find_swap<B>(
    id: EntityId,
    shift: Shift,
    grid: &Grid,
    pool: &EntityPool<B>,
) -> Option<(EntityId, Move)> {
    let entity = pool.get(id)?;
    for cell in entity.position.cells() {
        let Some(slot) = grid.slot(shift.simulate(cell)) else { continue };
        for other in slot.occupants() {
            if *other == id {
                continue;
            }
            let Some(other_mv) = pool.get(*other).and_then(|o| o.pending(MoveKind::Shift)) else {
                continue;
            };
            if other_mv.as_shift().is_some_and(|s| s.is_opposite(shift)) {
                return Some((*other, other_mv));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::{Coord, Orientation};
    use crate::game::entity::EntityTypeId;
    use crate::game::moves::{ROTATE_CCW, ROTATE_CW, SHIFT_DOWN, SHIFT_LEFT, SHIFT_RIGHT};
    use crate::game::shape::Shape;
    use crate::game::wall::WallBounds;
    use crate::render::layer::Rgb;

    const MARGIN: i32 = 3;

    struct World {
        grid: Grid,
        pool: EntityPool<()>,
        types: Vec<EntityType>,
        scratch: ScratchCache<Position>,
        rng: DeterministicRng,
        resolver: Resolver,
    }

    impl World {
        fn new() -> Self {
            let kind = |name: &str, bitmap: &[&[u8]]| EntityType {
                name: name.into(),
                acronym: name[..1].into(),
                color: Rgb::WHITE,
                shape: Shape::from_bitmap(bitmap, 16, 16).unwrap(),
                cross: WallCorners::NONE,
                bounds: WallBounds::new(16, 16, MARGIN, WallCorners::NONE),
            };
            Self {
                grid: Grid::new(16, 16, MARGIN),
                pool: EntityPool::new(),
                types: vec![kind("Dot", &[&[1]]), kind("Bar", &[&[1, 1, 1]])],
                scratch: ScratchCache::new(),
                rng: DeterministicRng::new(7),
                resolver: Resolver::new(),
            }
        }

        fn place(&mut self, ty: usize, x: i32, y: i32) -> EntityId {
            let id = self.pool.new_entity(EntityTypeId(ty as u16), || ());
            let at = self.grid.to_extended(Coord::new(x, y));
            let offsets = self.types[ty].shape.offsets().to_vec();
            let entity = self.pool.get_mut(id).unwrap();
            entity.position.reset(at, &offsets, Orientation::DEG_0);
            for cell in entity.position.cells() {
                let index = self.grid.index(cell).unwrap();
                self.grid.add_at(index, id);
            }
            self.pool.flush();
            id
        }

        fn dot(&mut self, x: i32, y: i32) -> EntityId {
            self.place(0, x, y)
        }

        fn bar(&mut self, x: i32, y: i32) -> EntityId {
            self.place(1, x, y)
        }

        fn request(&mut self, id: EntityId, mv: Move) {
            self.pool.get_mut(id).unwrap().request(mv);
        }

        fn resolve(&mut self, kind: MoveKind) -> CollisionRecord {
            self.resolver.resolve(kind, &mut self.grid, &mut self.pool, &self.types, &mut self.scratch, &mut self.rng)
        }

        fn at(&self, id: EntityId) -> Coord {
            self.grid.to_field(self.pool.get(id).unwrap().position.reference())
        }

        fn cells(&self, id: EntityId) -> Vec<Coord> {
            self.pool.get(id).unwrap().position.cells().map(|c| self.grid.to_field(c)).collect()
        }

        fn orientation(&self, id: EntityId) -> Orientation {
            self.pool.get(id).unwrap().position.orientation()
        }

        fn occupancy(&self, x: i32, y: i32) -> usize {
            self.grid.slot(self.grid.to_extended(Coord::new(x, y))).unwrap().len()
        }
    }

    #[test]
    fn test_free_move_succeeds() {
        let mut world = World::new();
        let a = world.dot(3, 3);
        world.request(a, SHIFT_DOWN);

        let collisions = world.resolve(MoveKind::Shift);

        assert!(collisions.is_empty());
        assert_eq!(world.at(a), Coord::new(3, 4));
        assert_eq!(world.pool.get(a).unwrap().pending(MoveKind::Shift), None);
    }

    #[test]
    fn test_wall_collision() {
        let mut world = World::new();
        let a = world.dot(0, 8);
        world.request(a, SHIFT_LEFT);

        let collisions = world.resolve(MoveKind::Shift);

        assert_eq!(collisions[&a], Collision { other: Collider::Wall(WallCorners::LEFT), mv: SHIFT_LEFT });
        assert_eq!(world.at(a), Coord::new(0, 8));
    }

    #[test]
    fn test_swap_is_aborted_both_ways() {
        let mut world = World::new();
        let a = world.dot(4, 2);
        let b = world.dot(5, 2);
        world.request(a, SHIFT_RIGHT);
        world.request(b, SHIFT_LEFT);

        let collisions = world.resolve(MoveKind::Shift);

        assert_eq!(collisions[&a].other, Collider::Entity(b));
        assert_eq!(collisions[&b].other, Collider::Entity(a));
        assert_eq!(collisions[&b].mv, SHIFT_LEFT);
        assert_eq!(world.at(a), Coord::new(4, 2));
        assert_eq!(world.at(b), Coord::new(5, 2));
    }

    #[test]
    fn test_moving_into_still_entity_reverts() {
        let mut world = World::new();
        let a = world.dot(4, 2);
        let b = world.dot(5, 2);
        world.request(a, SHIFT_RIGHT);

        let collisions = world.resolve(MoveKind::Shift);

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[&a].other, Collider::Entity(b));
        assert_eq!(world.at(a), Coord::new(4, 2));
        assert_eq!(world.grid.slot(world.grid.to_extended(Coord::new(5, 2))).unwrap().len(), 1);
    }

    #[test]
    fn test_head_on_across_a_gap_keeps_the_first_move() {
        let mut world = World::new();
        let a = world.dot(4, 7);
        let b = world.dot(6, 7);
        world.request(a, SHIFT_RIGHT);
        world.request(b, SHIFT_LEFT);

        let collisions = world.resolve(MoveKind::Shift);

        // `a` moved before `b` saw it heading back; only the pending moves drop
        assert_eq!(world.at(a), Coord::new(5, 7));
        assert_eq!(world.at(b), Coord::new(6, 7));
        assert_eq!(collisions.len(), 2);
        assert_eq!(collisions[&a], Collision { other: Collider::Entity(b), mv: SHIFT_RIGHT });
        assert_eq!(collisions[&b], Collision { other: Collider::Entity(a), mv: SHIFT_LEFT });
        assert_eq!(world.occupancy(4, 7), 0);
        assert_eq!(world.occupancy(5, 7), 1);
        assert_eq!(world.pool.get(a).unwrap().pending(MoveKind::Shift), None);
        assert_eq!(world.pool.get(b).unwrap().pending(MoveKind::Shift), None);
    }

    #[test]
    fn test_two_movers_into_one_cell() {
        let mut world = World::new();
        let a = world.dot(4, 2);
        let b = world.dot(5, 1);
        world.request(a, SHIFT_RIGHT);
        world.request(b, SHIFT_DOWN);

        let collisions = world.resolve(MoveKind::Shift);

        // Exactly one of them gets the cell
        assert_eq!(collisions.len(), 1);
        let moved = [world.at(a), world.at(b)];
        assert!(moved.contains(&Coord::new(5, 2)));
        assert_eq!(world.grid.slot(world.grid.to_extended(Coord::new(5, 2))).unwrap().len(), 1);
    }

    #[test]
    fn test_three_way_contention_records_nothing_for_the_first_revert() {
        let mut world = World::new();
        let still = world.dot(5, 5);
        let a = world.dot(4, 5);
        let b = world.dot(5, 4);
        world.request(a, SHIFT_RIGHT);
        world.request(b, SHIFT_DOWN);

        let collisions = world.resolve(MoveKind::Shift);

        assert_eq!(world.at(a), Coord::new(4, 5));
        assert_eq!(world.at(b), Coord::new(5, 4));
        assert_eq!(world.at(still), Coord::new(5, 5));
        // First revert saw three occupants, the second saw two
        assert_eq!(collisions.len(), 1);
        assert!(collisions.values().all(|c| c.other == Collider::Entity(still)));
    }

    #[test]
    fn test_rotation_into_wall_is_aborted() {
        let mut world = World::new();
        let bar = world.bar(5, 1);
        let before = world.cells(bar);
        world.request(bar, ROTATE_CCW);

        let collisions = world.resolve(MoveKind::Rotate);

        assert_eq!(collisions[&bar], Collision { other: Collider::Wall(WallCorners::TOP), mv: ROTATE_CCW });
        assert_eq!(world.orientation(bar), Orientation::DEG_0);
        assert_eq!(world.cells(bar), before);
        assert_eq!(world.pool.get(bar).unwrap().pending(MoveKind::Rotate), None);
    }

    #[test]
    fn test_rotation_into_occupied_cell_reverts() {
        let mut world = World::new();
        let bar = world.bar(5, 8);
        let dot = world.dot(5, 10);
        let before = world.cells(bar);
        world.request(bar, ROTATE_CW);

        let collisions = world.resolve(MoveKind::Rotate);

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[&bar], Collision { other: Collider::Entity(dot), mv: ROTATE_CW });
        assert_eq!(world.orientation(bar), Orientation::DEG_0);
        assert_eq!(world.cells(bar), before);
        assert_eq!(world.occupancy(5, 9), 0);
        assert_eq!(world.occupancy(5, 10), 1);
    }

    #[test]
    fn test_free_rotation_turns_about_the_reference() {
        let mut world = World::new();
        let bar = world.bar(5, 8);
        world.request(bar, ROTATE_CW);

        assert!(world.resolve(MoveKind::Rotate).is_empty());
        assert_eq!(world.orientation(bar), Orientation::DEG_90);
        assert_eq!(world.cells(bar), vec![Coord::new(5, 8), Coord::new(5, 9), Coord::new(5, 10)]);
        assert_eq!(world.occupancy(6, 8), 0);
    }

    #[test]
    fn test_each_kind_resolves_only_its_own_slot() {
        let mut world = World::new();
        let bar = world.bar(5, 8);
        world.request(bar, SHIFT_DOWN);
        world.request(bar, ROTATE_CW);

        assert!(world.resolve(MoveKind::Shift).is_empty());
        assert_eq!(world.at(bar), Coord::new(5, 9));
        assert_eq!(world.orientation(bar), Orientation::DEG_0);
        assert_eq!(world.pool.get(bar).unwrap().pending(MoveKind::Rotate), Some(ROTATE_CW));

        assert!(world.resolve(MoveKind::Rotate).is_empty());
        assert_eq!(world.cells(bar), vec![Coord::new(5, 9), Coord::new(5, 10), Coord::new(5, 11)]);
        assert_eq!(world.pool.get(bar).unwrap().pending(MoveKind::Rotate), None);
    }

    #[test]
    fn test_blocked_rotation_does_not_undo_an_earlier_shift() {
        let mut world = World::new();
        let bar = world.bar(5, 8);
        let dot = world.dot(5, 11);
        world.request(bar, SHIFT_DOWN);
        world.request(bar, ROTATE_CW);

        assert!(world.resolve(MoveKind::Shift).is_empty());
        let collisions = world.resolve(MoveKind::Rotate);

        assert_eq!(collisions[&bar].other, Collider::Entity(dot));
        assert_eq!(world.at(bar), Coord::new(5, 9));
        assert_eq!(world.orientation(bar), Orientation::DEG_0);
    }
}
