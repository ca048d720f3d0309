pub mod components;

use std::collections::{BTreeMap, HashMap};

use components::{Bounds, ElementKind, MountedIn, Placeholder, TokenElement};
use hecs::{Entity, World};
use tracing::{debug, trace};

/// A position resolved to a token element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub element: Entity,
    pub token: u32,
    /// Estimated char offset inside the token.
    pub offset: u32,
}

/// Backreference table from rendered element identity to token index.
///
/// Each mounted token (or placeholder) is an entity. Hosts that cannot read
/// attributes back from their view tree report element bounds instead and
/// resolve pointer positions through [`ElementTable::hit_test`].
pub struct ElementTable {
    world: World,
    units: BTreeMap<usize, Vec<Entity>>,
    /// Every mounted element of a token, oldest first. Overlapping units can
    /// mount the same token twice.
    by_token: HashMap<u32, Vec<Entity>>,
}

impl Default for ElementTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTable {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            units: BTreeMap::new(),
            by_token: HashMap::new(),
        }
    }

    /// Mounts the elements of `unit`, replacing whatever was mounted for it.
    pub fn mount_unit<I>(&mut self, unit: usize, elements: I) -> Vec<Entity>
    where
        I: IntoIterator<Item = ElementKind>,
    {
        self.unmount_unit(unit);

        let entities: Vec<Entity> = elements
            .into_iter()
            .map(|kind| match kind {
                ElementKind::Token { index, chars } => {
                    let entity = self.world.spawn((TokenElement { index, chars }, MountedIn { unit }));
                    self.by_token.entry(index).or_default().push(entity);
                    entity
                }
                ElementKind::Placeholder { index } => self.world.spawn((Placeholder { index }, MountedIn { unit })),
            })
            .collect();

        trace!(unit, elements = entities.len(), "mounted unit");
        self.units.insert(unit, entities.clone());
        entities
    }

    /// Returns the number of despawned elements.
    pub fn unmount_unit(&mut self, unit: usize) -> usize {
        let Some(entities) = self.units.remove(&unit) else {
            return 0;
        };
        for &entity in &entities {
            if let Ok(element) = self.world.get::<&TokenElement>(entity) {
                let index = element.index;
                drop(element);
                if let Some(mounted) = self.by_token.get_mut(&index) {
                    mounted.retain(|&e| e != entity);
                    if mounted.is_empty() {
                        self.by_token.remove(&index);
                    }
                }
            }
            let _ = self.world.despawn(entity);
        }
        entities.len()
    }

    /// Keeps exactly `visible` mounted. `elements_of` is only called for
    /// units that are not mounted yet.
    pub fn sync_units<F, I>(&mut self, visible: &[usize], mut elements_of: F)
    where
        F: FnMut(usize) -> I,
        I: IntoIterator<Item = ElementKind>,
    {
        let stale: Vec<usize> = self
            .units
            .keys()
            .copied()
            .filter(|unit| !visible.contains(unit))
            .collect();
        for unit in stale {
            self.unmount_unit(unit);
        }
        for &unit in visible {
            if !self.units.contains_key(&unit) {
                let elements = elements_of(unit);
                self.mount_unit(unit, elements);
            }
        }
    }

    /// Drops every element, e.g. when a new document is loaded.
    pub fn clear(&mut self) {
        debug!(elements = self.world.len(), "clearing element table");
        self.world.clear();
        self.units.clear();
        self.by_token.clear();
    }

    pub fn mounted_units(&self) -> Vec<usize> {
        self.units.keys().copied().collect()
    }

    pub fn element_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Token behind an element; `None` for placeholders and unknown elements.
    pub fn token_of(&self, element: Entity) -> Option<u32> {
        self.world.get::<&TokenElement>(element).ok().map(|t| t.index)
    }

    pub fn element_of(&self, token: u32) -> Option<Entity> {
        self.by_token.get(&token).and_then(|mounted| mounted.last()).copied()
    }

    /// Element identity as exchanged with hosts.
    pub fn element_id(element: Entity) -> u64 {
        element.to_bits().get()
    }

    pub fn element_from_id(id: u64) -> Option<Entity> {
        Entity::from_bits(id)
    }

    /// Records the layout box of a mounted token. Returns false when the
    /// token is not mounted.
    pub fn set_bounds(&mut self, token: u32, bounds: Bounds) -> bool {
        match self.element_of(token) {
            Some(entity) => self.world.insert_one(entity, bounds).is_ok(),
            None => false,
        }
    }

    pub fn hit_test(&self, x: f64, y: f64) -> Option<Hit> {
        for (entity, (element, bounds)) in self.world.query::<(&TokenElement, &Bounds)>().iter() {
            if bounds.contains(x, y) {
                let fraction = if bounds.width > 0.0 { (x - bounds.x) / bounds.width } else { 0.0 };
                let offset = ((fraction * element.chars as f64).floor() as u32).min(element.chars);
                return Some(Hit { element: entity, token: element.index, offset });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(range: std::ops::Range<u32>) -> Vec<ElementKind> {
        range.map(|index| ElementKind::Token { index, chars: 4 }).collect()
    }

    #[test]
    fn test_element_to_token_backreference() {
        let mut table = ElementTable::new();
        let entities = table.mount_unit(0, vec![
            ElementKind::Token { index: 0, chars: 3 },
            ElementKind::Placeholder { index: 1 },
        ]);

        assert_eq!(table.token_of(entities[0]), Some(0));
        assert_eq!(table.token_of(entities[1]), None);
        assert_eq!(table.element_of(0), Some(entities[0]));

        let id = ElementTable::element_id(entities[0]);
        assert_eq!(ElementTable::element_from_id(id), Some(entities[0]));
    }

    #[test]
    fn test_sync_mounts_and_unmounts() {
        let mut table = ElementTable::new();
        let mut calls = Vec::new();

        table.sync_units(&[0, 1], |unit| {
            calls.push(unit);
            tokens(unit as u32 * 2..unit as u32 * 2 + 2)
        });
        assert_eq!(table.mounted_units(), vec![0, 1]);
        assert_eq!(table.element_count(), 4);

        table.sync_units(&[1, 2], |unit| {
            calls.push(unit);
            tokens(unit as u32 * 2..unit as u32 * 2 + 2)
        });
        assert_eq!(calls, vec![0, 1, 2]);
        assert_eq!(table.mounted_units(), vec![1, 2]);
        assert_eq!(table.element_of(0), None);
        assert!(table.element_of(5).is_some());
    }

    #[test]
    fn test_overlapping_units_keep_surviving_element() {
        let mut table = ElementTable::new();
        let first = table.mount_unit(0, tokens(0..4));
        let second = table.mount_unit(1, tokens(2..6));
        assert_eq!(table.element_of(3), Some(second[1]));

        table.unmount_unit(1);
        assert_eq!(table.element_of(3), Some(first[3]));
        assert_eq!(table.element_of(5), None);
        assert!(table.set_bounds(2, Bounds { x: 0.0, y: 0.0, width: 10.0, height: 10.0 }));

        table.unmount_unit(0);
        assert_eq!(table.element_of(3), None);
    }

    #[test]
    fn test_hit_test_uses_reported_bounds() {
        let mut table = ElementTable::new();
        table.mount_unit(0, tokens(0..2));

        assert!(table.set_bounds(0, Bounds { x: 0.0, y: 0.0, width: 40.0, height: 20.0 }));
        assert!(table.set_bounds(1, Bounds { x: 50.0, y: 0.0, width: 40.0, height: 20.0 }));
        assert!(!table.set_bounds(9, Bounds { x: 0.0, y: 0.0, width: 1.0, height: 1.0 }));

        let hit = table.hit_test(75.0, 10.0).unwrap();
        assert_eq!((hit.token, hit.offset), (1, 2));
        assert!(table.hit_test(45.0, 10.0).is_none());
    }

    #[test]
    fn test_clear() {
        let mut table = ElementTable::new();
        table.mount_unit(3, tokens(0..5));
        table.clear();

        assert_eq!(table.element_count(), 0);
        assert!(table.mounted_units().is_empty());
        assert_eq!(table.unmount_unit(3), 0);
    }
}
