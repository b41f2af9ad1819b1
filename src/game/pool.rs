//! Entity Pool
//!
//! Entities are constructed once per pool slot and recycled through per-type
//! free lists. Additions and removals are staged and applied together by
//! [`EntityPool::flush`] once per frame, so the active set is stable while a
//! frame is being resolved.

use std::collections::{BTreeMap, BTreeSet};

use crate::game::entity::{Entity, EntityId, EntityTypeId};

/// Pooled entity storage.
#[derive(Debug)]
pub struct EntityPool<B> {
    entities: Vec<Entity<B>>,
    free: BTreeMap<EntityTypeId, Vec<EntityId>>,
    active: BTreeSet<EntityId>,
    to_add: Vec<EntityId>,
    to_remove: BTreeSet<EntityId>,
    recycled: BTreeSet<EntityId>,
}

impl<B> Default for EntityPool<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> EntityPool<B> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            free: BTreeMap::new(),
            active: BTreeSet::new(),
            to_add: Vec::new(),
            to_remove: BTreeSet::new(),
            recycled: BTreeSet::new(),
        }
    }

    /// Take a recycled entity of `ty`, or construct one, and stage it for
    /// addition.
    ///
    /// `make` runs only when a fresh behavior is needed.
    pub fn new_entity<F>(&mut self, ty: EntityTypeId, make: F) -> EntityId
    where
        F: FnOnce() -> B,
    {
        let recycled = self.free.get_mut(&ty).and_then(Vec::pop);

        let id = match recycled {
            Some(id) => {
                self.recycled.remove(&id);
                self.to_remove.remove(&id);
                let entity = &mut self.entities[id.index()];
                entity.clear_pending();
                if entity.behavior.is_none() {
                    entity.behavior = Some(make());
                }
                id
            }
            None => {
                let id = EntityId(self.entities.len() as u32);
                self.entities.push(Entity::new(id, ty, make()));
                id
            }
        };

        self.to_add.push(id);
        id
    }

    /// Stage `id` for removal and recycle it.
    ///
    /// Returns `false` if it was already deleted (staged or recycled) or
    /// never existed.
    pub fn delete(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(id.index()) else {
            return false;
        };
        if !self.recycled.insert(id) {
            return false;
        }

        entity.clear_pending();
        self.to_remove.insert(id);
        self.to_add.retain(|added| *added != id);
        self.free.entry(entity.entity_type()).or_default().push(id);
        true
    }

    /// Apply staged removals, then staged additions.
    pub fn flush(&mut self) {
        for id in &self.to_remove {
            self.active.remove(id);
        }
        self.active.extend(self.to_add.drain(..));
        self.to_remove.clear();
    }

    /// Active entity ids in ascending order.
    pub fn active(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.active.iter().copied()
    }

    /// Number of active entities.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// True if `id` is in the active set.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.active.contains(&id)
    }

    /// True if `id` exists and has not been destroyed.
    pub fn is_live(&self, id: EntityId) -> bool {
        id.index() < self.entities.len() && !self.recycled.contains(&id)
    }

    /// Entity by id, live or recycled.
    pub fn get(&self, id: EntityId) -> Option<&Entity<B>> {
        self.entities.get(id.index())
    }

    /// Mutable entity by id, live or recycled.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<B>> {
        self.entities.get_mut(id.index())
    }

    /// Live entity by id.
    pub fn live(&self, id: EntityId) -> Option<&Entity<B>> {
        if self.is_live(id) { self.get(id) } else { None }
    }

    /// Mutable live entity by id.
    pub fn live_mut(&mut self, id: EntityId) -> Option<&mut Entity<B>> {
        if self.is_live(id) { self.get_mut(id) } else { None }
    }

    /// Instances ever constructed.
    pub fn constructed(&self) -> usize {
        self.entities.len()
    }

    /// Forget every active and staged entity. Storage is kept.
    pub fn clear(&mut self) {
        let live: Vec<EntityId> = self.active.iter().chain(self.to_add.iter()).copied().collect();
        for id in live {
            self.delete(id);
        }
        self.flush();
    }
}
