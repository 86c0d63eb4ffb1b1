//! The [`World`] is the authoritative entity registry. It owns the entity
//! allocator, one component column per kind, the world bounds and the tile
//! grid, and publishes `entityAdded` / `entityRemoved` on its bus.

use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::component::{AnyComponent, Component, ComponentKind, ComponentMask, ComponentStores};
use crate::components::Player;
use crate::entity::{EntityAllocator, EntityId};
use crate::events::{EntityChange, GameEvent};
use crate::terrain::TileMap;
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntityBundle
// ---------------------------------------------------------------------------

/// The full component set of an entity about to be added.
///
/// Usage:
/// ```ignore
/// let bundle = EntityBundle::new()
///     .with(Position::new(0.0, 0.0))
///     .with(Velocity::ZERO);
/// world.add_entity(bundle);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityBundle {
    components: Vec<AnyComponent>,
}

impl EntityBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component.
    ///
    /// # Panics
    ///
    /// Panics if the bundle already holds a component of the same kind.
    pub fn with(mut self, component: impl Into<AnyComponent>) -> Self {
        if let Err(err) = self.push(component.into()) {
            panic!("{err}");
        }
        self
    }

    /// Add a component, rejecting a second one of the same kind.
    pub fn push(&mut self, component: AnyComponent) -> Result<(), EcsError> {
        let kind = component.kind();
        if self.contains(kind) {
            return Err(EcsError::DuplicateComponent { kind });
        }
        self.components.push(component);
        Ok(())
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.components.iter().any(|c| c.kind() == kind)
    }

    pub fn mask(&self) -> ComponentMask {
        let kinds: Vec<ComponentKind> = self.components.iter().map(AnyComponent::kind).collect();
        ComponentMask::of(&kinds)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// Read-only view of one live entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'w> {
    id: EntityId,
    mask: ComponentMask,
    stores: &'w ComponentStores,
}

impl<'w> EntityRef<'w> {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kinds(&self) -> Vec<ComponentKind> {
        self.mask.kinds()
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        self.mask.contains(kind)
    }

    pub fn get<T: Component>(&self) -> Option<&'w T> {
        T::store(self.stores).get(self.id)
    }
}

impl std::fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id)
            .field("kinds", &self.mask.kinds())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Playable area in world units, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f64,
    pub height: f64,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 2048.0,
            height: 2048.0,
        }
    }
}

impl WorldBounds {
    /// Clamp a point into the bounds.
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// The top-level entity registry.
pub struct World {
    allocator: EntityAllocator,
    /// Component kinds held by each slot; indexed by entity index.
    masks: Vec<ComponentMask>,
    stores: ComponentStores,
    bounds: WorldBounds,
    tiles: TileMap,
    bus: EventBus,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entity_count())
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl World {
    /// Create an empty world publishing on `bus`.
    pub fn new(bus: EventBus) -> Self {
        Self {
            allocator: EntityAllocator::new(),
            masks: Vec::new(),
            stores: ComponentStores::default(),
            bounds: WorldBounds::default(),
            tiles: TileMap::default(),
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // -- lifecycle ----------------------------------------------------------

    /// Create an entity holding every component in `bundle` and emit
    /// `entityAdded`.
    pub fn add_entity(&mut self, bundle: EntityBundle) -> EntityId {
        let id = self.allocator.allocate();
        let idx = id.index() as usize;
        if idx >= self.masks.len() {
            self.masks.resize(idx + 1, ComponentMask::default());
        }
        let mask = bundle.mask();
        self.masks[idx] = mask;
        for component in bundle.components {
            self.stores.insert_any(id, component);
        }
        tracing::debug!(entity = %id, "entity added");
        self.bus.emit(GameEvent::EntityAdded(EntityChange {
            entity: id,
            kinds: mask.kinds(),
        }));
        id
    }

    /// Remove an entity and all its components, then emit `entityRemoved`.
    ///
    /// Returns `false` without emitting anything if `id` is not live.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if !self.allocator.deallocate(id) {
            return false;
        }
        let idx = id.index() as usize;
        let mask = std::mem::take(&mut self.masks[idx]);
        self.stores.clear(id, mask);
        tracing::debug!(entity = %id, "entity removed");
        self.bus.emit(GameEvent::EntityRemoved(EntityChange {
            entity: id,
            kinds: mask.kinds(),
        }));
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn get_entity(&self, id: EntityId) -> Option<EntityRef<'_>> {
        if !self.contains(id) {
            return None;
        }
        Some(EntityRef {
            id,
            mask: self.masks[id.index() as usize],
            stores: &self.stores,
        })
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Every live entity, in slot order.
    pub fn entities(&self) -> Vec<EntityId> {
        self.allocator.iter_alive().collect()
    }

    // -- queries ------------------------------------------------------------

    /// Live entities holding every kind in `kinds`, in slot order.
    ///
    /// An empty `kinds` matches every live entity.
    pub fn query(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        let wanted = ComponentMask::of(kinds);
        self.allocator
            .iter_alive()
            .filter(|id| self.masks[id.index() as usize].contains_all(wanted))
            .collect()
    }

    /// The first live entity carrying the [`Player`] marker.
    pub fn player(&self) -> Option<EntityId> {
        self.stores.player.iter().map(|(id, _)| id).next()
    }

    // -- component access ---------------------------------------------------

    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        T::store(&self.stores).get(id)
    }

    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        T::store_mut(&mut self.stores).get_mut(id)
    }

    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        self.contains(id) && self.masks[id.index() as usize].contains(T::KIND)
    }

    /// Attach or replace a component. Returns the replaced value.
    pub fn insert<T: Component>(&mut self, id: EntityId, value: T) -> Result<Option<T>, EcsError> {
        if !self.contains(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        self.masks[id.index() as usize].insert(T::KIND);
        Ok(T::store_mut(&mut self.stores).insert(id, value))
    }

    /// Detach a component. A miss is `None`, never an error.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        self.masks[id.index() as usize].remove(T::KIND);
        T::store_mut(&mut self.stores).remove(id)
    }

    /// All component columns, for passes that read several kinds at once.
    pub fn stores(&self) -> &ComponentStores {
        &self.stores
    }

    /// All component columns, mutably. Attaching or detaching components
    /// must go through [`World::insert`] / [`World::remove_component`] so the
    /// kind masks stay in sync; the columns themselves only allow in-place
    /// mutation from outside this crate.
    pub fn stores_mut(&mut self) -> &mut ComponentStores {
        &mut self.stores
    }

    // -- environment --------------------------------------------------------

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: WorldBounds) {
        self.bounds = bounds;
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn set_tiles(&mut self, tiles: TileMap) {
        self.tiles = tiles;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Health, Loot, Position, Velocity};
    use crate::events::Topic;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_world() -> (World, Rc<RefCell<Vec<GameEvent>>>) {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for topic in [Topic::EntityAdded, Topic::EntityRemoved] {
            let log = Rc::clone(&log);
            bus.on(topic, move |e| log.borrow_mut().push(e.clone()));
        }
        (World::new(bus), log)
    }

    // -- 1. lifecycle --------------------------------------------------------

    #[test]
    fn add_and_remove_emit_events() {
        let (mut world, log) = recording_world();
        let e = world.add_entity(
            EntityBundle::new()
                .with(Position::new(1.0, 2.0))
                .with(Velocity::ZERO),
        );
        assert!(world.remove_entity(e));
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[0],
            GameEvent::EntityAdded(EntityChange {
                entity: e,
                kinds: vec![ComponentKind::Position, ComponentKind::Velocity],
            })
        );
        assert_eq!(log[1].topic(), Topic::EntityRemoved);
    }

    #[test]
    fn removing_absent_entity_is_noop() {
        let (mut world, log) = recording_world();
        let e = world.add_entity(EntityBundle::new().with(Loot { xp: 1.0 }));
        assert!(world.remove_entity(e));
        assert!(!world.remove_entity(e));
        assert_eq!(log.borrow().len(), 2);
        assert!(world.get_entity(e).is_none());
        assert!(world.get::<Loot>(e).is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate")]
    fn bundle_rejects_duplicate_kind() {
        let _ = EntityBundle::new()
            .with(Position::new(0.0, 0.0))
            .with(Position::new(1.0, 1.0));
    }

    // -- 2. queries ----------------------------------------------------------

    #[test]
    fn query_is_a_conjunction() {
        let mut world = World::new(EventBus::new());
        let moving = world.add_entity(
            EntityBundle::new()
                .with(Position::new(0.0, 0.0))
                .with(Velocity::ZERO),
        );
        let still = world.add_entity(EntityBundle::new().with(Position::new(0.0, 0.0)));
        assert_eq!(
            world.query(&[ComponentKind::Position, ComponentKind::Velocity]),
            vec![moving]
        );
        assert_eq!(world.query(&[ComponentKind::Position]), vec![moving, still]);
        assert_eq!(world.query(&[]).len(), 2);
    }

    #[test]
    fn insert_and_remove_component_update_queries() {
        let mut world = World::new(EventBus::new());
        let e = world.add_entity(EntityBundle::new().with(Position::new(0.0, 0.0)));
        world.insert(e, Health::full(10.0)).unwrap();
        assert_eq!(world.query(&[ComponentKind::Health]), vec![e]);
        assert_eq!(world.remove_component::<Health>(e), Some(Health::full(10.0)));
        assert!(world.query(&[ComponentKind::Health]).is_empty());
        assert!(world.remove_component::<Health>(e).is_none());
    }

    #[test]
    fn stale_id_does_not_alias_recycled_slot() {
        let mut world = World::new(EventBus::new());
        let old = world.add_entity(EntityBundle::new().with(Loot { xp: 1.0 }));
        world.remove_entity(old);
        let new = world.add_entity(EntityBundle::new().with(Loot { xp: 2.0 }));
        assert_eq!(old.index(), new.index());
        assert!(world.get::<Loot>(old).is_none());
        assert!(matches!(
            world.insert(old, Loot { xp: 3.0 }),
            Err(EcsError::StaleEntity { .. })
        ));
        assert_eq!(world.get::<Loot>(new), Some(&Loot { xp: 2.0 }));
    }

    #[test]
    fn player_lookup_finds_marker() {
        let mut world = World::new(EventBus::new());
        assert!(world.player().is_none());
        world.add_entity(EntityBundle::new().with(Position::new(0.0, 0.0)));
        let p = world.add_entity(EntityBundle::new().with(Player));
        assert_eq!(world.player(), Some(p));
        let entity = world.get_entity(p).unwrap();
        assert!(entity.has(ComponentKind::Player));
        assert_eq!(entity.kinds(), vec![ComponentKind::Player]);
    }

    // -- 3. environment ------------------------------------------------------

    #[test]
    fn bounds_clamp_points() {
        let bounds = WorldBounds {
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(bounds.clamp(-5.0, 70.0), (0.0, 50.0));
        assert_eq!(bounds.center(), (50.0, 25.0));
    }
}
