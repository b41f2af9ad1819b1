//! Bulk Relocation
//!
//! A noclip batch moves several entities at once, ignoring the collision
//! rules that apply between them. Targets are computed on scratch copies and
//! validated together; the grid only changes once every destination is known
//! to be free.
//!
//! A participant may keep some of its cells where they are. Such a cell
//! becomes an adjusted offset of the target position, so its absolute cell
//! does not move.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::coord::Coord;
use crate::engine::error::EngineError;
use crate::game::entity::{EntityId, EntityType};
use crate::game::grid::Grid;
use crate::game::moves::Move;
use crate::game::pool::EntityPool;
use crate::game::position::Position;
use crate::game::scratch::ScratchCache;

/// Decides, per source cell in field coordinates, whether the cell moves.
pub type CellFilter = Box<dyn Fn(Coord) -> bool>;

struct Relocation {
    id: EntityId,
    moves: Vec<Move>,
    filter: Option<CellFilter>,
}

/// Participants of one bulk relocation.
#[derive(Default)]
pub struct NoclipBatch {
    entries: Vec<Relocation>,
}

impl NoclipBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move every cell of `id` by `moves`.
    pub fn relocate(&mut self, id: EntityId, moves: &[Move]) {
        self.insert(Relocation { id, moves: moves.to_vec(), filter: None });
    }

    /// Move the cells of `id` for which `filter` holds; the others stay put.
    pub fn relocate_where<F>(&mut self, id: EntityId, moves: &[Move], filter: F)
    where
        F: Fn(Coord) -> bool + 'static,
    {
        self.insert(Relocation { id, moves: moves.to_vec(), filter: Some(Box::new(filter)) });
    }

    // A later registration of the same entity replaces the earlier one
    fn insert(&mut self, relocation: Relocation) {
        match self.entries.iter_mut().find(|e| e.id == relocation.id) {
            Some(existing) => *existing = relocation,
            None => self.entries.push(relocation),
        }
    }

    /// Registered participants, in registration order.
    pub fn participants(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nobody was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-participant commit plan.
struct Plan {
    sources: Vec<usize>,
    destinations: Vec<usize>,
    adjusted: Vec<(usize, Coord)>,
}

/// Validate and apply a batch.
///
/// On failure nothing changes. On success returns the participants in
/// registration order.
pub fn commit<B>(
    batch: NoclipBatch,
    grid: &mut Grid,
    pool: &mut EntityPool<B>,
    types: &[EntityType],
    scratch: &mut ScratchCache<Position>,
) -> Result<Vec<EntityId>, EngineError> {
    let participants: BTreeSet<EntityId> = batch.participants().collect();
    for id in &participants {
        if !pool.is_live(*id) {
            return Err(EngineError::MissingEntity(*id));
        }
    }

    let mut bracket = scratch.bracket();
    let mut claimed: BTreeMap<usize, EntityId> = BTreeMap::new();
    let mut plans = Vec::with_capacity(batch.entries.len());

    for entry in &batch.entries {
        let entity = pool.get(entry.id).ok_or(EngineError::MissingEntity(entry.id))?;
        let bounds = &types
            .get(entity.entity_type().index())
            .ok_or_else(|| EngineError::UnknownEntityType(entity.entity_type().to_string()))?
            .bounds;

        let target = bracket.acquire(&entity.position);
        for mv in &entry.moves {
            mv.apply(bracket.get_mut(target));
        }
        let target_pos = bracket.get(target);

        let mut plan = Plan { sources: Vec::new(), destinations: Vec::new(), adjusted: Vec::new() };

        for (i, (src, dest)) in entity.position.cells().zip(target_pos.cells()).enumerate() {
            let keep = entry
                .filter
                .as_ref()
                .is_some_and(|filter| !filter(grid.to_field(src)));

            if keep {
                let offset = target_pos.to_offset(src);
                if target_pos.offsets().contains(&offset)
                    || plan.adjusted.iter().any(|(_, adj)| *adj == offset)
                {
                    return Err(EngineError::TransposeConflict(entry.id));
                }
                plan.adjusted.push((i, offset));

                let index = grid.index(src).ok_or(EngineError::TransposeConflict(entry.id))?;
                if claimed.insert(index, entry.id).is_some() {
                    return Err(EngineError::TransposeConflict(entry.id));
                }
                continue;
            }

            let index = grid.classify(dest, bounds).map_err(EngineError::OutOfBounds)?;
            if claimed.insert(index, entry.id).is_some() {
                return Err(EngineError::TransposeConflict(entry.id));
            }
            if grid
                .slot_at(index)
                .occupants()
                .iter()
                .any(|occupant| !participants.contains(occupant))
            {
                return Err(EngineError::TransposeConflict(entry.id));
            }

            if let Some(source) = grid.index(src) {
                plan.sources.push(source);
            }
            plan.destinations.push(index);
        }

        plans.push((entry.id, target, plan));
    }

    // Validated: mutate
    for (id, _, plan) in &plans {
        for index in &plan.sources {
            grid.remove_at(*index, *id);
        }
    }
    for (id, target, plan) in &plans {
        for index in &plan.destinations {
            grid.add_at(*index, *id);
        }
        let target_pos = bracket.get_mut(*target);
        for (i, offset) in &plan.adjusted {
            target_pos.replace_offset(*i, *offset);
        }
        if let Some(entity) = pool.get_mut(*id) {
            entity.position.clone_from(bracket.get(*target));
        }
    }

    Ok(plans.into_iter().map(|(id, _, _)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Orientation;
    use crate::game::entity::EntityTypeId;
    use crate::game::moves::{SHIFT_DOWN, SHIFT_RIGHT};
    use crate::game::shape::Shape;
    use crate::game::wall::{WallBounds, WallCorners};
    use crate::render::layer::Rgb;

    struct World {
        grid: Grid,
        pool: EntityPool<()>,
        types: Vec<EntityType>,
        scratch: ScratchCache<Position>,
    }

    impl World {
        fn new() -> Self {
            let bitmap: &[&[u8]] = &[&[1, 1]];
            let shape = Shape::from_bitmap(bitmap, 8, 8).unwrap();
            let bar = EntityType {
                name: "Bar".into(),
                acronym: "B".into(),
                color: Rgb::WHITE,
                shape,
                cross: WallCorners::NONE,
                bounds: WallBounds::new(8, 8, 2, WallCorners::NONE),
            };
            Self {
                grid: Grid::new(8, 8, 2),
                pool: EntityPool::new(),
                types: vec![bar],
                scratch: ScratchCache::new(),
            }
        }

        fn place(&mut self, offsets: &[Coord], x: i32, y: i32) -> EntityId {
            let id = self.pool.new_entity(EntityTypeId(0), || ());
            let at = self.grid.to_extended(Coord::new(x, y));
            let position = Position::new(at, offsets, Orientation::DEG_0);
            for cell in position.cells() {
                let index = self.grid.index(cell).unwrap();
                self.grid.add_at(index, id);
            }
            self.pool.get_mut(id).unwrap().position = position;
            self.pool.flush();
            id
        }

        fn bar(&mut self, x: i32, y: i32) -> EntityId {
            self.place(&[Coord::new(0, 0), Coord::new(1, 0)], x, y)
        }

        fn commit(&mut self, batch: NoclipBatch) -> Result<Vec<EntityId>, EngineError> {
            commit(batch, &mut self.grid, &mut self.pool, &self.types, &mut self.scratch)
        }

        fn cells(&self, id: EntityId) -> Vec<Coord> {
            let pos = &self.pool.get(id).unwrap().position;
            pos.cells().map(|c| self.grid.to_field(c)).collect()
        }

        fn occupants(&self, x: i32, y: i32) -> Vec<EntityId> {
            self.grid.slot(self.grid.to_extended(Coord::new(x, y))).unwrap().occupants().to_vec()
        }
    }

    #[test]
    fn test_participants_may_move_into_each_other() {
        let mut world = World::new();
        let a = world.bar(0, 0);
        let b = world.bar(0, 1);

        let mut batch = NoclipBatch::new();
        batch.relocate(a, &[SHIFT_DOWN]);
        batch.relocate(b, &[SHIFT_DOWN]);
        assert_eq!(world.commit(batch).unwrap(), vec![a, b]);

        assert_eq!(world.cells(a), vec![Coord::new(0, 1), Coord::new(1, 1)]);
        assert_eq!(world.cells(b), vec![Coord::new(0, 2), Coord::new(1, 2)]);
        assert_eq!(world.occupants(0, 1), vec![a]);
        assert!(world.occupants(0, 0).is_empty());
    }

    #[test]
    fn test_non_participant_blocks_the_whole_batch() {
        let mut world = World::new();
        let a = world.bar(0, 0);
        let b = world.bar(4, 0);
        let wall = world.bar(4, 1);

        let mut batch = NoclipBatch::new();
        batch.relocate(a, &[SHIFT_DOWN]);
        batch.relocate(b, &[SHIFT_DOWN]);

        assert!(matches!(world.commit(batch), Err(EngineError::TransposeConflict(id)) if id == b));
        assert_eq!(world.cells(a), vec![Coord::new(0, 0), Coord::new(1, 0)]);
        assert_eq!(world.cells(b), vec![Coord::new(4, 0), Coord::new(5, 0)]);
        assert_eq!(world.occupants(4, 1), vec![wall]);
    }

    #[test]
    fn test_out_of_bounds_fails() {
        let mut world = World::new();
        let a = world.bar(6, 3);

        let mut batch = NoclipBatch::new();
        batch.relocate(a, &[SHIFT_RIGHT]);

        assert!(matches!(world.commit(batch), Err(EngineError::OutOfBounds(w)) if w == WallCorners::RIGHT));
        assert_eq!(world.cells(a), vec![Coord::new(6, 3), Coord::new(7, 3)]);
    }

    #[test]
    fn test_filtered_cells_stay_put() {
        let mut world = World::new();
        let column = world.place(&[Coord::new(0, 0), Coord::new(0, 1), Coord::new(0, 3)], 3, 2);

        // Rows above 4 fall one step onto the cell that stays
        let mut batch = NoclipBatch::new();
        batch.relocate_where(column, &[SHIFT_DOWN], |c| c.y < 4);
        world.commit(batch).unwrap();

        let mut cells = world.cells(column);
        cells.sort();
        assert_eq!(cells, vec![Coord::new(3, 3), Coord::new(3, 4), Coord::new(3, 5)]);
        assert_eq!(world.occupants(3, 3), vec![column]);
        assert_eq!(world.occupants(3, 5), vec![column]);
        assert!(world.occupants(3, 2).is_empty());
    }

    #[test]
    fn test_kept_cell_under_moved_cell_conflicts() {
        let mut world = World::new();
        let column = world.place(&[Coord::new(0, 0), Coord::new(0, 1)], 3, 2);

        let mut batch = NoclipBatch::new();
        batch.relocate_where(column, &[SHIFT_DOWN], |c| c.y < 3);

        assert!(matches!(world.commit(batch), Err(EngineError::TransposeConflict(_))));
        assert_eq!(world.cells(column), vec![Coord::new(3, 2), Coord::new(3, 3)]);
    }

    #[test]
    fn test_missing_participant() {
        let mut world = World::new();
        let a = world.bar(0, 0);
        world.pool.delete(a);

        let mut batch = NoclipBatch::new();
        batch.relocate(a, &[SHIFT_DOWN]);
        assert!(matches!(world.commit(batch), Err(EngineError::MissingEntity(_))));
    }
}
