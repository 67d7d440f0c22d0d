//! Bat motion and wall bounces

use glam::Vec2;

use super::components::{ActorPhysics, AudioCues, Footprint, RoomBounds, Transform, archetype};
use super::geometry::{Rect, reflect};
use super::notify::SimEvent;
use super::pipeline::{Stage, StageContext};
use super::world::{ComponentMask, Entity, World};
use crate::error::SimError;

/// Result of one Euler step against the room
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Wall normals bounced off this step, vertical axis first
    pub bounces: [Option<Vec2>; 2],
}

impl StepOutcome {
    pub fn bounce_count(&self) -> usize {
        self.bounces.iter().flatten().count()
    }
}

/// Advance by velocity, then bounce off any wall the bounds crossed
///
/// Top/bottom is tested before left/right and both may fire. A bounce nudges
/// the position off the wall along its normal and reflects the velocity; the
/// bounds are measured once, before any nudge.
pub fn integrate(
    position: Vec2,
    velocity: Vec2,
    footprint: &Footprint,
    room: &Rect,
    nudge: f32,
) -> StepOutcome {
    let mut position = position + velocity;
    let mut velocity = velocity;
    let hits = room.escaped_edges(&footprint.bounds(position));

    let vertical = if hits.top {
        Some(Vec2::Y)
    } else if hits.bottom {
        Some(-Vec2::Y)
    } else {
        None
    };
    let horizontal = if hits.left {
        Some(Vec2::X)
    } else if hits.right {
        Some(-Vec2::X)
    } else {
        None
    };

    for normal in [vertical, horizontal].into_iter().flatten() {
        position += normal * nudge;
        velocity = reflect(velocity, normal);
    }

    StepOutcome {
        position,
        velocity,
        bounces: [vertical, horizontal],
    }
}

/// Moves every placed bat and reflects it off the room walls
pub struct PhysicsStage {
    nudge: f32,
}

impl PhysicsStage {
    pub fn new(nudge: f32) -> Self {
        Self { nudge }
    }
}

impl Stage for PhysicsStage {
    fn name(&self) -> &'static str {
        "physics"
    }

    fn requires(&self) -> &'static [ComponentMask] {
        &[archetype::BAT, archetype::ROOM]
    }

    fn run(&mut self, world: &mut World, ctx: &mut StageContext<'_>) -> Result<(), SimError> {
        let (_, room) = world.single::<RoomBounds>()?;
        let room = room.rect;
        let bounce_cue = world
            .single::<AudioCues>()
            .ok()
            .and_then(|(_, cues)| cues.bounce.clone());

        let bats: Vec<Entity> = world.query(archetype::BAT).collect();
        for bat in bats {
            let physics = *world.get::<ActorPhysics>(bat)?;
            if physics.needs_placement {
                continue;
            }
            let footprint = *world.get::<Footprint>(bat)?;
            let transform = world.get_mut::<Transform>(bat)?;

            let outcome = integrate(
                transform.position,
                physics.velocity,
                &footprint,
                &room,
                self.nudge,
            );
            transform.position = outcome.position;
            transform.facing = outcome.velocity.normalize_or_zero();
            world.get_mut::<ActorPhysics>(bat)?.velocity = outcome.velocity;

            for normal in outcome.bounces.iter().flatten() {
                log::debug!("Bat {bat} bounced off wall with normal {normal}");
                if let Some(cue) = &bounce_cue {
                    ctx.raise(SimEvent::Bounce(cue.clone()));
                }
            }
        }
        Ok(())
    }
}
