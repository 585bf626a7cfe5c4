//! Per-kind entity store with pooled, generation-checked slots.
//!
//! Entities live in a slot vector; ids map to slot indices. Removing an
//! entity bumps its slot's generation and returns the slot to a free list,
//! which is always drained before the vector grows. A [`Handle`] remembers
//! the generation it was issued for, so anything holding on to a handle
//! across ticks (deferred timers in particular) can tell whether the slot
//! has been recycled for a different logical entity since.

use crate::entity::{Entity, KindData};
use log::debug;
use shared::Transform;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created(Handle),
    Updated(Handle),
    /// The id is marked despawned and waiting for purge.
    Ignored,
}

#[derive(Debug)]
struct Slot<D: KindData> {
    generation: u32,
    entity: Option<Entity<D>>,
}

#[derive(Debug)]
pub struct EntityStore<D: KindData> {
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    ids: HashMap<u16, u32>,
}

impl<D: KindData> EntityStore<D> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Creates the entity on first sight of `id`, otherwise replaces its
    /// server transform and kind fields without moving it.
    pub fn upsert(&mut self, id: u16, transform: Transform, data: D) -> Upsert {
        if let Some(&index) = self.ids.get(&id) {
            let slot = &mut self.slots[index as usize];
            let generation = slot.generation;
            return match slot.entity.as_mut() {
                Some(entity) if entity.despawned => Upsert::Ignored,
                Some(entity) => {
                    entity.target = transform;
                    entity.data.refresh(data);
                    Upsert::Updated(Handle { index, generation })
                }
                None => Upsert::Ignored,
            };
        }

        let entity = Entity::new(id, transform, data);
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].entity = Some(entity);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entity: Some(entity),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.ids.insert(id, index);

        debug!("{:?} {} created in slot {}", D::KIND, id, index);
        Upsert::Created(Handle {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Flags `id` for removal at the next purge. Unknown ids are ignored.
    pub fn mark_despawned(&mut self, id: u16) -> bool {
        match self.get_mut(id) {
            Some(entity) => {
                entity.despawned = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u16) -> Option<&Entity<D>> {
        let index = *self.ids.get(&id)?;
        self.slots[index as usize].entity.as_ref()
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut Entity<D>> {
        let index = *self.ids.get(&id)?;
        self.slots[index as usize].entity.as_mut()
    }

    pub fn contains(&self, id: u16) -> bool {
        self.ids.contains_key(&id)
    }

    pub fn handle(&self, id: u16) -> Option<Handle> {
        let index = *self.ids.get(&id)?;
        Some(Handle {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Looks up the entity a handle was issued for, if its slot has not been
    /// recycled since.
    pub fn resolve(&self, handle: Handle) -> Option<&Entity<D>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entity.as_ref()
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut Entity<D>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entity.as_mut()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Entity<D>> {
        self.slots
            .iter()
            .filter_map(|slot| slot.entity.as_ref())
            .filter(|entity| entity.is_live())
    }

    pub fn iter_live_mut(&mut self) -> impl Iterator<Item = &mut Entity<D>> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.entity.as_mut())
            .filter(|entity| entity.is_live())
    }

    pub fn for_each_live<F: FnMut(&Entity<D>)>(&self, f: F) {
        self.iter_live().for_each(f);
    }

    pub fn for_each_live_mut<F: FnMut(&mut Entity<D>)>(&mut self, f: F) {
        self.iter_live_mut().for_each(f);
    }

    /// Removes every despawned entity, returning their slots to the pool.
    pub fn purge_despawned(&mut self) -> usize {
        let doomed: Vec<u16> = self
            .slots
            .iter()
            .filter_map(|slot| slot.entity.as_ref())
            .filter(|entity| entity.despawned)
            .map(|entity| entity.id)
            .collect();

        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    /// Drops every entity; all slots go back to the pool.
    pub fn clear(&mut self) {
        let ids: Vec<u16> = self.ids.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
    }

    fn remove(&mut self, id: u16) -> Option<Entity<D>> {
        let index = self.ids.remove(&id)?;
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        slot.entity.take()
    }

    /// Number of entities currently addressable, despawned ones included.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.iter_live().count()
    }

    /// Slots allocated so far, in use or pooled.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn pooled(&self) -> usize {
        self.free.len()
    }
}

impl<D: KindData> Default for EntityStore<D> {
    fn default() -> Self {
        Self::new()
    }
}
