//! Entity registry: stable server ids mapped to the visuals we own for them
//!
//! Each category lives in its own [`EntityStore`]. A store never holds two
//! live entries for one id, and every mutation either applies fully or
//! reports why it did nothing.

use crate::scene::Handle;
use shared::{EntityId, Facing};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Player,
    Collectible,
    Hazard,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Player => "player",
            Category::Collectible => "star",
            Category::Hazard => "bomb",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{category} {id} is already registered")]
    Duplicate { category: Category, id: EntityId },
    #[error("{category} {id} is not registered")]
    Missing { category: Category, id: EntityId },
}

pub trait Entity {
    const CATEGORY: Category;

    fn handle(&self) -> Handle;
    fn set_position(&mut self, x: f32, y: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub handle: Handle,
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collectible {
    pub handle: Handle,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hazard {
    pub handle: Handle,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
}

impl Entity for RemotePlayer {
    const CATEGORY: Category = Category::Player;

    fn handle(&self) -> Handle {
        self.handle
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }
}

impl Entity for Collectible {
    const CATEGORY: Category = Category::Collectible;

    fn handle(&self) -> Handle {
        self.handle
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }
}

impl Entity for Hazard {
    const CATEGORY: Category = Category::Hazard;

    fn handle(&self) -> Handle {
        self.handle
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }
}

#[derive(Debug, Clone)]
pub struct EntityStore<E> {
    entries: HashMap<EntityId, E>,
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut E> {
        self.entries.get_mut(id)
    }

    /// Registers `id`, calling `build` only when the id is not live yet so a
    /// duplicate never spawns an orphan visual.
    pub fn create_with<F>(&mut self, id: &str, build: F) -> Result<&E, RegistryError>
    where
        F: FnOnce() -> E,
    {
        use std::collections::hash_map::Entry;

        match self.entries.entry(id.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate {
                category: E::CATEGORY,
                id: id.to_string(),
            }),
            Entry::Vacant(vacant) => Ok(vacant.insert(build())),
        }
    }

    pub fn update_position(&mut self, id: &str, x: f32, y: f32) -> Result<Handle, RegistryError> {
        let entity = self.entries.get_mut(id).ok_or_else(|| RegistryError::Missing {
            category: E::CATEGORY,
            id: id.to_string(),
        })?;
        entity.set_position(x, y);
        Ok(entity.handle())
    }

    pub fn remove(&mut self, id: &str) -> Result<E, RegistryError> {
        self.entries.remove(id).ok_or_else(|| RegistryError::Missing {
            category: E::CATEGORY,
            id: id.to_string(),
        })
    }

    /// Removes every entry, returning them for visual teardown.
    pub fn drain(&mut self) -> Vec<(EntityId, E)> {
        self.entries.drain().collect()
    }

    pub fn find_by_handle(&self, handle: Handle) -> Option<&EntityId> {
        self.entries
            .iter()
            .find(|(_, entity)| entity.handle() == handle)
            .map(|(id, _)| id)
    }

    pub fn ids(&self) -> Vec<&EntityId> {
        let mut ids: Vec<&EntityId> = self.entries.keys().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// All entities the client currently renders on behalf of the server.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub players: EntityStore<RemotePlayer>,
    pub collectibles: EntityStore<Collectible>,
    pub hazards: EntityStore<Hazard>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn star(handle: u64) -> Collectible {
        Collectible {
            handle: Handle(handle),
            x: 0.0,
            y: 0.0,
        }
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let mut store = EntityStore::new();
        assert_ok!(store.create_with("s1", || star(1)));

        let mut built = false;
        let err = assert_err!(store.create_with("s1", || {
            built = true;
            star(2)
        }));
        assert!(!built);
        assert_eq!(
            err,
            RegistryError::Duplicate {
                category: Category::Collectible,
                id: "s1".to_string(),
            }
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().handle, Handle(1));
    }

    #[test]
    fn test_remove_missing_is_reported() {
        let mut store: EntityStore<Collectible> = EntityStore::new();
        assert_err!(store.remove("s1"));

        assert_ok!(store.create_with("s1", || star(1)));
        assert_ok!(store.remove("s1"));
        assert_err!(store.remove("s1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_position() {
        let mut store = EntityStore::new();
        assert_ok!(store.create_with("p2", || RemotePlayer {
            handle: Handle(4),
            x: 0.0,
            y: 0.0,
            facing: Facing::Turn,
        }));

        let handle = assert_ok!(store.update_position("p2", 10.0, 20.0));
        assert_eq!(handle, Handle(4));
        assert_eq!(store.get("p2").unwrap().x, 10.0);
        assert_err!(store.update_position("p3", 1.0, 1.0));
    }

    #[test]
    fn test_find_by_handle_and_drain() {
        let mut store = EntityStore::new();
        assert_ok!(store.create_with("s1", || star(1)));
        assert_ok!(store.create_with("s2", || star(2)));

        assert_eq!(store.find_by_handle(Handle(2)), Some(&"s2".to_string()));
        assert_eq!(store.find_by_handle(Handle(9)), None);
        assert_eq!(store.ids(), vec!["s1", "s2"]);

        let drained = store.drain();
        assert_eq!(drained.len(), 2);
        assert!(store.is_empty());
    }
}
