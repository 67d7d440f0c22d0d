//! Pickups and terminal checks
//!
//! Catching a bat relocates it away from the slime, gives it a fresh
//! heading, grows the slime by one segment and pays the reward. The two
//! ways to lose (leaving the room, biting the body) are checked every tick
//! whether or not anything was caught.

use glam::Vec2;

use super::components::{
    ActorPhysics, BodyChain, Footprint, GamePhase, RoomBounds, RunState, Segment, Transform,
    archetype,
};
use super::geometry::Rect;
use super::pipeline::{Stage, StageContext};
use super::placement::{actor_bounds, escape_position, head_bounds, random_velocity};
use super::world::{ComponentMask, Entity, World};
use crate::error::SimError;

/// Append one segment behind the tail, extending it along its own heading
///
/// The new segment ends where the old tail starts, so the chain stays
/// contiguous. Returns false for an empty chain.
pub fn grow_chain(chain: &mut BodyChain) -> bool {
    let Some(&tail) = chain.tail() else {
        return false;
    };
    let from = tail.from - tail.direction * chain.stride;
    chain.segments.push(Segment {
        from,
        to: tail.from,
        direction: (tail.from - from).normalize_or_zero(),
    });
    true
}

/// Slime vs bat, slime vs walls, slime vs itself
pub struct PickupStage {
    reward: u32,
}

impl PickupStage {
    pub fn new(reward: u32) -> Self {
        Self { reward }
    }

    /// Relocate and relaunch a caught bat
    fn release(
        world: &mut World,
        bat: Entity,
        slime_center: Vec2,
        room: &Rect,
        ctx: &mut StageContext<'_>,
    ) -> Result<(), SimError> {
        let radius = world.get::<Footprint>(bat)?.radius();
        let position = escape_position(room, slime_center, radius, ctx.rng);
        world.get_mut::<Transform>(bat)?.position = position;

        let physics = world.get_mut::<ActorPhysics>(bat)?;
        physics.velocity = random_velocity(ctx.rng, physics.speed);
        log::debug!("Bat {bat} relocated to {position}");
        Ok(())
    }
}

impl Stage for PickupStage {
    fn name(&self) -> &'static str {
        "pickup"
    }

    fn requires(&self) -> &'static [ComponentMask] {
        &[archetype::SLIME, archetype::BAT, archetype::ROOM, archetype::RUN]
    }

    fn run(&mut self, world: &mut World, ctx: &mut StageContext<'_>) -> Result<(), SimError> {
        let (_, room) = world.single::<RoomBounds>()?;
        let room = room.rect;
        let (run_entity, _) = world.single::<RunState>()?;

        let slimes: Vec<Entity> = world.query(archetype::SLIME).collect();
        let bats: Vec<Entity> = world.query(archetype::BAT).collect();
        let mut caught = 0u32;
        let mut lost = false;

        for slime in slimes {
            let head = head_bounds(world, slime)?;

            for &bat in &bats {
                if world.get::<ActorPhysics>(bat)?.needs_placement {
                    continue;
                }
                if !head.intersects(&actor_bounds(world, bat)?) {
                    continue;
                }
                Self::release(world, bat, head.center, &room, ctx)?;
                grow_chain(world.get_mut::<BodyChain>(slime)?);
                caught += 1;
            }

            if room.escaped_edges(&head).any() {
                log::debug!("Slime {slime} left the room at {}", head.center);
                lost = true;
            }

            let chain = world.get_mut::<BodyChain>(slime)?;
            if chain.body_collision_detected {
                chain.body_collision_detected = false;
                log::debug!("Slime {slime} bit itself");
                lost = true;
            }
        }

        let run = world.get_mut::<RunState>(run_entity)?;
        if caught > 0 {
            run.score = run.score.saturating_add(self.reward.saturating_mul(caught));
            log::debug!("Caught {caught} bat(s), score now {}", run.score);
        }
        if lost && run.phase != GamePhase::GameOver {
            run.phase = GamePhase::GameOver;
            log::info!("Game over with score {}", run.score);
        }
        Ok(())
    }
}
