//! Component kinds and per-kind storage.
//!
//! The set of component kinds is closed: every kind is a variant of
//! [`ComponentKind`], every value can be carried by the [`AnyComponent`]
//! tagged union, and every kind owns one [`ComponentStore`] column inside
//! [`ComponentStores`]. Typed access goes through the [`Component`] trait,
//! which maps a Rust type to its column without any runtime type lookup.

use serde::{Deserialize, Serialize};

use crate::components::{
    Ai, Attack, Collision, Damage, DespawnTimer, Effects, Enemy, EnemyProfile, EnemyRangedAttack,
    Experience, Health, Loot, Obstacle, PassiveBonuses, Player, Position, Projectile, SpawnPoint,
    Sprite, Velocity,
};
use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// ComponentStore
// ---------------------------------------------------------------------------

/// Dense column of one component kind, indexed by entity slot.
///
/// Each occupied slot remembers the full [`EntityId`] it belongs to, so a
/// lookup with a stale id (same slot, older generation) misses.
#[derive(Debug, Clone)]
pub struct ComponentStore<T> {
    slots: Vec<Option<(EntityId, T)>>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> ComponentStore<T> {
    /// Borrow the component owned by `id`.
    pub fn get(&self, id: EntityId) -> Option<&T> {
        match self.slots.get(id.index() as usize) {
            Some(Some((owner, value))) if *owner == id => Some(value),
            _ => None,
        }
    }

    /// Mutably borrow the component owned by `id`.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        match self.slots.get_mut(id.index() as usize) {
            Some(Some((owner, value))) if *owner == id => Some(value),
            _ => None,
        }
    }

    /// Iterate `(owner, component)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(id, value)| (*id, value)))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub(crate) fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        let idx = id.index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        match self.slots[idx].replace((id, value)) {
            Some((owner, old)) if owner == id => Some(old),
            _ => None,
        }
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        match slot {
            Some((owner, _)) if *owner == id => slot.take().map(|(_, value)| value),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentMask
// ---------------------------------------------------------------------------

/// Bit set of the component kinds an entity currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u32);

impl ComponentMask {
    /// Mask containing every kind in `kinds`.
    pub fn of(kinds: &[ComponentKind]) -> Self {
        Self(kinds.iter().fold(0, |bits, kind| bits | kind.bit()))
    }

    /// Whether `kind` is in the mask.
    pub fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Whether every kind of `other` is also in `self`.
    pub fn contains_all(self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    pub(crate) fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    /// Kinds in the mask, in declaration order.
    pub fn kinds(self) -> Vec<ComponentKind> {
        ComponentKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.contains(*kind))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// A Rust type that is one of the closed set of component kinds.
pub trait Component: Sized + 'static {
    /// The kind tag of this component type.
    const KIND: ComponentKind;

    /// The column holding this kind.
    fn store(stores: &ComponentStores) -> &ComponentStore<Self>;

    /// The column holding this kind, mutably.
    fn store_mut(stores: &mut ComponentStores) -> &mut ComponentStore<Self>;
}

// ---------------------------------------------------------------------------
// Kind table
// ---------------------------------------------------------------------------

macro_rules! component_kinds {
    ($( $ty:ident => $field:ident; )*) => {
        /// Discriminant of every component kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub enum ComponentKind {
            $( $ty, )*
        }

        impl ComponentKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [ComponentKind] = &[ $( ComponentKind::$ty, )* ];

            fn bit(self) -> u32 {
                1 << (self as u32)
            }

            /// Field name of the kind's column.
            pub fn name(self) -> &'static str {
                match self {
                    $( ComponentKind::$ty => stringify!($field), )*
                }
            }
        }

        /// A component value of any kind.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "value", rename_all = "camelCase")]
        pub enum AnyComponent {
            $( $ty($ty), )*
        }

        impl AnyComponent {
            /// The kind tag of the carried value.
            pub fn kind(&self) -> ComponentKind {
                match self {
                    $( AnyComponent::$ty(_) => ComponentKind::$ty, )*
                }
            }
        }

        /// One storage column per component kind.
        #[derive(Debug, Default)]
        pub struct ComponentStores {
            $( pub $field: ComponentStore<$ty>, )*
        }

        impl ComponentStores {
            pub(crate) fn insert_any(&mut self, id: EntityId, component: AnyComponent) {
                match component {
                    $( AnyComponent::$ty(value) => { self.$field.insert(id, value); } )*
                }
            }

            /// Drop every component `id` holds according to `mask`.
            pub(crate) fn clear(&mut self, id: EntityId, mask: ComponentMask) {
                $(
                    if mask.contains(ComponentKind::$ty) {
                        self.$field.remove(id);
                    }
                )*
            }
        }

        $(
            impl Component for $ty {
                const KIND: ComponentKind = ComponentKind::$ty;

                fn store(stores: &ComponentStores) -> &ComponentStore<Self> {
                    &stores.$field
                }

                fn store_mut(stores: &mut ComponentStores) -> &mut ComponentStore<Self> {
                    &mut stores.$field
                }
            }

            impl From<$ty> for AnyComponent {
                fn from(value: $ty) -> Self {
                    AnyComponent::$ty(value)
                }
            }
        )*
    };
}

component_kinds! {
    Position => position;
    Velocity => velocity;
    Health => health;
    Collision => collision;
    Attack => attack;
    Damage => damage;
    Ai => ai;
    Enemy => enemy;
    EnemyRangedAttack => ranged_attack;
    Experience => experience;
    Projectile => projectile;
    Effects => effects;
    Sprite => sprite;
    PassiveBonuses => passive_bonuses;
    SpawnPoint => spawn_point;
    Obstacle => obstacle;
    DespawnTimer => despawn_timer;
    EnemyProfile => enemy_profile;
    Player => player;
    Loot => loot;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_rejects_stale_ids() {
        let mut store = ComponentStore::default();
        let old = EntityId::new(3, 0);
        let new = EntityId::new(3, 1);
        store.insert(old, Position { x: 1.0, y: 2.0 });
        assert!(store.get(new).is_none());
        assert!(store.remove(new).is_none());
        assert_eq!(store.remove(old), Some(Position { x: 1.0, y: 2.0 }));
        assert!(store.is_empty());
    }

    #[test]
    fn insert_returns_previous_value_for_same_owner() {
        let mut store = ComponentStore::default();
        let id = EntityId::new(0, 0);
        assert!(store.insert(id, Velocity { dx: 1.0, dy: 0.0 }).is_none());
        let old = store.insert(id, Velocity { dx: 2.0, dy: 0.0 });
        assert_eq!(old, Some(Velocity { dx: 1.0, dy: 0.0 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn mask_tracks_kinds() {
        let mut mask = ComponentMask::default();
        mask.insert(ComponentKind::Position);
        mask.insert(ComponentKind::Health);
        assert!(mask.contains_all(ComponentMask::of(&[ComponentKind::Health])));
        assert!(!mask.contains(ComponentKind::Velocity));
        mask.remove(ComponentKind::Health);
        assert_eq!(mask.kinds(), vec![ComponentKind::Position]);
    }

    #[test]
    fn kind_table_fits_mask() {
        assert!(ComponentKind::ALL.len() <= 32);
        assert_eq!(ComponentKind::EnemyRangedAttack.name(), "ranged_attack");
        assert_eq!(
            serde_json::to_string(&ComponentKind::EnemyRangedAttack).unwrap(),
            "\"enemyRangedAttack\""
        );
    }

    #[test]
    fn any_component_reports_kind() {
        let any: AnyComponent = Loot { xp: 5.0 }.into();
        assert_eq!(any.kind(), ComponentKind::Loot);
    }
}
