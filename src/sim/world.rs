//! Entity store
//!
//! Entities are plain ids. Each component kind lives in its own dense column
//! indexed by entity, and every entity carries a presence mask so stages can
//! find the combinations they need without touching the columns.
//!
//! Ids start at 1, increase monotonically and are never reused within a
//! world. Iteration always follows creation order.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use super::components::{
    ActorPhysics, AudioCues, BodyChain, Footprint, RoomBounds, RunState, Transform,
};
use crate::error::SimError;

/// Opaque entity identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Entity(u32);

impl Entity {
    /// Raw id (1-based)
    pub fn id(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Set of component kinds, one bit per kind
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u8);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);
    pub const TRANSFORM: Self = Self(1 << 0);
    pub const BODY_CHAIN: Self = Self(1 << 1);
    pub const ACTOR_PHYSICS: Self = Self(1 << 2);
    pub const FOOTPRINT: Self = Self(1 << 3);
    pub const ROOM_BOUNDS: Self = Self(1 << 4);
    pub const RUN_STATE: Self = Self(1 << 5);
    pub const AUDIO_CUES: Self = Self(1 << 6);

    const NAMES: [(Self, &'static str); 7] = [
        (Self::TRANSFORM, "Transform"),
        (Self::BODY_CHAIN, "BodyChain"),
        (Self::ACTOR_PHYSICS, "ActorPhysics"),
        (Self::FOOTPRINT, "Footprint"),
        (Self::ROOM_BOUNDS, "RoomBounds"),
        (Self::RUN_STATE, "RunState"),
        (Self::AUDIO_CUES, "AudioCues"),
    ];

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// True if every kind in `other` is also in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", names.join(" + "))
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A kind of data that can be attached to an entity
///
/// Implemented for the component records of this crate only; each kind maps
/// to one column of the store.
pub trait Component: sealed::Sealed + Sized + 'static {
    const MASK: ComponentMask;
    const NAME: &'static str;

    #[doc(hidden)]
    fn column(columns: &Columns) -> &[Option<Self>];
    #[doc(hidden)]
    fn column_mut(columns: &mut Columns) -> &mut [Option<Self>];
}

macro_rules! component_columns {
    ($($field:ident: $ty:ident => $mask:ident),* $(,)?) => {
        /// Dense per-kind storage, one slot per entity index
        #[derive(Debug, Default, Clone)]
        pub struct Columns {
            $($field: Vec<Option<$ty>>,)*
        }

        impl Columns {
            fn push_empty(&mut self) {
                $(self.$field.push(None);)*
            }

            fn clear_row(&mut self, index: usize) {
                $(self.$field[index] = None;)*
            }
        }

        $(
            impl sealed::Sealed for $ty {}

            impl Component for $ty {
                const MASK: ComponentMask = ComponentMask::$mask;
                const NAME: &'static str = stringify!($ty);

                fn column(columns: &Columns) -> &[Option<Self>] {
                    &columns.$field
                }

                fn column_mut(columns: &mut Columns) -> &mut [Option<Self>] {
                    &mut columns.$field
                }
            }
        )*
    };
}

component_columns! {
    transforms: Transform => TRANSFORM,
    body_chains: BodyChain => BODY_CHAIN,
    actor_physics: ActorPhysics => ACTOR_PHYSICS,
    footprints: Footprint => FOOTPRINT,
    room_bounds: RoomBounds => ROOM_BOUNDS,
    run_states: RunState => RUN_STATE,
    audio_cues: AudioCues => AUDIO_CUES,
}

/// Owns every entity and component of a round
#[derive(Debug, Clone)]
pub struct World {
    /// Next id to hand out
    next_id: u32,
    /// Live entities in creation order
    alive: Vec<Entity>,
    /// Presence mask per entity index
    masks: Vec<ComponentMask>,
    columns: Columns,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            alive: Vec::new(),
            masks: Vec::new(),
            columns: Columns::default(),
        }
    }

    /// Allocate a new entity with no components
    pub fn create(&mut self) -> Entity {
        let entity = Entity(self.next_id);
        self.next_id += 1;
        self.alive.push(entity);
        self.masks.push(ComponentMask::EMPTY);
        self.columns.push_empty();
        entity
    }

    /// Remove an entity from the active set and drop its components
    ///
    /// Returns false if the entity was not alive.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(pos) = self.alive.iter().position(|&e| e == entity) else {
            return false;
        };
        self.alive.remove(pos);
        self.masks[entity.index()] = ComponentMask::EMPTY;
        self.columns.clear_row(entity.index());
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.binary_search(&entity).is_ok()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// Attach a component, replacing (and returning) any of the same kind
    pub fn attach<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<Option<T>, SimError> {
        if !self.is_alive(entity) {
            return Err(SimError::DeadEntity(entity));
        }
        let index = entity.index();
        self.masks[index] = self.masks[index] | T::MASK;
        Ok(T::column_mut(&mut self.columns)[index].replace(component))
    }

    /// Detach a component, returning it if it was present
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.is_alive(entity) {
            return None;
        }
        let index = entity.index();
        self.masks[index] = self.masks[index].without(T::MASK);
        T::column_mut(&mut self.columns)[index].take()
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.mask(entity).contains(T::MASK)
    }

    /// Presence mask of an entity (empty if not alive)
    pub fn mask(&self, entity: Entity) -> ComponentMask {
        if self.is_alive(entity) {
            self.masks[entity.index()]
        } else {
            ComponentMask::EMPTY
        }
    }

    /// Typed access; fails with `MissingComponent` if the kind is absent
    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T, SimError> {
        if !self.is_alive(entity) {
            return Err(SimError::DeadEntity(entity));
        }
        T::column(&self.columns)[entity.index()]
            .as_ref()
            .ok_or(SimError::MissingComponent {
                entity,
                component: T::NAME,
            })
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, SimError> {
        if !self.is_alive(entity) {
            return Err(SimError::DeadEntity(entity));
        }
        T::column_mut(&mut self.columns)[entity.index()]
            .as_mut()
            .ok_or(SimError::MissingComponent {
                entity,
                component: T::NAME,
            })
    }

    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.get(entity).ok()
    }

    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.get_mut(entity).ok()
    }

    /// Live entities in creation order
    pub fn all(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive.iter().copied()
    }

    /// Live entities holding every kind in `mask`, in creation order
    pub fn query(&self, mask: ComponentMask) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .copied()
            .filter(move |e| self.masks[e.index()].contains(mask))
    }

    /// First live entity holding every kind in `mask`
    pub fn first_with(&self, mask: ComponentMask) -> Option<Entity> {
        self.query(mask).next()
    }

    /// First live entity holding a `T`
    pub fn find<T: Component>(&self) -> Option<Entity> {
        self.first_with(T::MASK)
    }

    /// The first `T` in the world, failing with `Unattached` if none
    pub fn single<T: Component>(&self) -> Result<(Entity, &T), SimError> {
        let entity = self
            .find::<T>()
            .ok_or(SimError::Unattached { component: T::NAME })?;
        Ok((entity, self.get::<T>(entity)?))
    }
}
