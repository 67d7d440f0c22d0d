//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed movement quantum, one stage pass per tick
//! - Seeded RNG only
//! - Stable iteration order (by entity id)
//! - No rendering, audio or platform dependencies

pub mod components;
pub mod geometry;
pub mod movement;
pub mod notify;
pub mod physics;
pub mod pickup;
pub mod pipeline;
pub mod placement;
pub mod round;
pub mod tick;
pub mod world;

pub use components::{
    ActorPhysics, AudioCues, BodyChain, Direction, Footprint, GamePhase, RoomBounds, RunState,
    Segment, SoundCue, Transform, TurnBuffer, archetype,
};
pub use geometry::{Circle, EdgeHits, Rect, TileGrid, reflect};
pub use movement::{MovementStage, buffer_turn, step_chain};
pub use notify::{EventLog, NotificationStage, SimEvent, SimObserver};
pub use physics::{PhysicsStage, StepOutcome, integrate};
pub use pickup::{PickupStage, grow_chain};
pub use pipeline::{Pipeline, Stage, StageContext};
pub use placement::{PlacementStage, escape_position, random_velocity};
pub use round::{Round, RoundEntities, RoundSnapshot, gameplay_pipeline, spawn_round};
pub use tick::{FrameClock, InputSource, TickInput, sample_intent};
pub use world::{Component, ComponentMask, Entity, World};
