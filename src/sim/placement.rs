//! Bat placement away from the slime
//!
//! One heuristic serves both the start of a round and every pickup: look at
//! where the slime sits relative to the room centre, take the dominant axis,
//! and drop the bat against the opposite wall on that axis. The other
//! coordinate is random.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::components::{ActorPhysics, BodyChain, Footprint, RoomBounds, Transform, archetype};
use super::geometry::{Circle, Rect};
use super::pipeline::{Stage, StageContext};
use super::world::{ComponentMask, Entity, World};
use crate::error::SimError;
use crate::unit_from_angle;

/// Uniform sample in [lo, hi), or the midpoint when the range is empty
fn sample_between(rng: &mut Pcg32, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        (lo + hi) * 0.5
    }
}

/// Top-left position for a bat of `bat_radius` that puts the room between it
/// and `slime_center`
///
/// Padding from the wall is twice the bat radius. Ties between the axes go
/// to the vertical one.
pub fn escape_position(room: &Rect, slime_center: Vec2, bat_radius: f32, rng: &mut Pcg32) -> Vec2 {
    let to_slime = slime_center - room.center();
    let padding = bat_radius * 2.0;

    if to_slime.x.abs() > to_slime.y.abs() {
        let x = if to_slime.x > 0.0 {
            room.left() + padding
        } else {
            room.right() - padding * 2.0
        };
        let y = sample_between(rng, room.top() + padding, room.bottom() - padding);
        Vec2::new(x, y)
    } else {
        let y = if to_slime.y > 0.0 {
            room.top() + padding
        } else {
            room.bottom() - padding * 2.0
        };
        let x = sample_between(rng, room.left() + padding, room.right() - padding);
        Vec2::new(x, y)
    }
}

/// Uniformly random heading at the given speed
pub fn random_velocity(rng: &mut Pcg32, speed: f32) -> Vec2 {
    let theta = rng.random_range(0.0..std::f32::consts::TAU);
    unit_from_angle(theta) * speed
}

/// Collision circle around the slime's interpolated head
pub fn head_bounds(world: &World, slime: Entity) -> Result<Circle, SimError> {
    let chain = world.get::<BodyChain>(slime)?;
    let footprint = world.get::<Footprint>(slime)?;
    let head = chain
        .head_position()
        .ok_or(SimError::EmptyBodyChain(slime))?;
    Ok(footprint.bounds(head))
}

/// Collision circle around a free-moving actor
pub fn actor_bounds(world: &World, actor: Entity) -> Result<Circle, SimError> {
    let transform = world.get::<Transform>(actor)?;
    let footprint = world.get::<Footprint>(actor)?;
    Ok(footprint.bounds(transform.position))
}

/// Gives each unplaced bat its start position, then stays idle
pub struct PlacementStage;

impl Stage for PlacementStage {
    fn name(&self) -> &'static str {
        "placement"
    }

    fn requires(&self) -> &'static [ComponentMask] {
        &[archetype::SLIME, archetype::BAT, archetype::ROOM]
    }

    fn run(&mut self, world: &mut World, ctx: &mut StageContext<'_>) -> Result<(), SimError> {
        let pending: Vec<Entity> = world
            .query(archetype::BAT)
            .filter(|&e| {
                world
                    .try_get::<ActorPhysics>(e)
                    .is_some_and(|p| p.needs_placement)
            })
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let Some(slime) = world.first_with(archetype::SLIME) else {
            return Ok(());
        };
        let slime_center = head_bounds(world, slime)?.center;
        let (_, room) = world.single::<RoomBounds>()?;
        let room = room.rect;

        for bat in pending {
            let radius = world.get::<Footprint>(bat)?.radius();
            let position = escape_position(&room, slime_center, radius, ctx.rng);
            world.get_mut::<Transform>(bat)?.position = position;
            world.get_mut::<ActorPhysics>(bat)?.needs_placement = false;
            log::debug!("Placed bat {bat} at {position}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tick::TickInput;
    use rand::SeedableRng;
    use std::time::Duration;

    const ROOM: Rect = Rect::new(64.0, 64.0, 1152.0, 640.0);

    #[test]
    fn test_slime_right_of_centre_sends_bat_left() {
        let mut rng = Pcg32::seed_from_u64(3);
        let slime = ROOM.center() + Vec2::new(400.0, 20.0);
        for _ in 0..100 {
            let pos = escape_position(&ROOM, slime, 16.0, &mut rng);
            assert_eq!(pos.x, ROOM.left() + 32.0);
            assert!(pos.y >= ROOM.top() + 32.0 && pos.y < ROOM.bottom() - 32.0);
        }
    }

    #[test]
    fn test_slime_left_of_centre_sends_bat_right() {
        let mut rng = Pcg32::seed_from_u64(3);
        let slime = ROOM.center() - Vec2::new(300.0, 0.0);
        let pos = escape_position(&ROOM, slime, 16.0, &mut rng);
        assert_eq!(pos.x, ROOM.right() - 64.0);
    }

    #[test]
    fn test_vertical_axis_and_ties() {
        let mut rng = Pcg32::seed_from_u64(3);
        let below = ROOM.center() + Vec2::new(10.0, 200.0);
        let pos = escape_position(&ROOM, below, 16.0, &mut rng);
        assert_eq!(pos.y, ROOM.top() + 32.0);
        assert!(pos.x >= ROOM.left() + 32.0 && pos.x < ROOM.right() - 32.0);

        // Exactly on the centre counts as vertical, bat goes to the bottom
        let pos = escape_position(&ROOM, ROOM.center(), 16.0, &mut rng);
        assert_eq!(pos.y, ROOM.bottom() - 64.0);
    }

    #[test]
    fn test_degenerate_room_uses_midpoint() {
        let mut rng = Pcg32::seed_from_u64(3);
        let tiny = Rect::new(0.0, 0.0, 40.0, 10.0);
        let pos = escape_position(&tiny, Vec2::new(40.0, 5.0), 16.0, &mut rng);
        assert_eq!(pos.y, 5.0);
    }

    #[test]
    fn test_random_velocity_has_requested_speed() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..50 {
            let v = random_velocity(&mut rng, 5.0);
            assert!((v.length() - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_same_seed_same_placement() {
        let mut a = Pcg32::seed_from_u64(99);
        let mut b = Pcg32::seed_from_u64(99);
        let slime = ROOM.center() + Vec2::new(0.0, -100.0);
        assert_eq!(
            escape_position(&ROOM, slime, 16.0, &mut a),
            escape_position(&ROOM, slime, 16.0, &mut b)
        );
    }

    fn placement_world() -> (World, Entity, Entity) {
        let mut world = World::new();
        let room = world.create();
        world.attach(room, RoomBounds { rect: ROOM }).unwrap();

        let slime = world.create();
        world.attach(slime, Transform::default()).unwrap();
        world
            .attach(slime, BodyChain::new(Vec2::new(1000.0, 384.0), 64.0, Vec2::X))
            .unwrap();
        world
            .attach(slime, Footprint::new(Vec2::splat(64.0), 0.5))
            .unwrap();

        let bat = world.create();
        world.attach(bat, Transform::default()).unwrap();
        world.attach(bat, ActorPhysics::unplaced(5.0)).unwrap();
        world.attach(bat, Footprint::new(Vec2::splat(64.0), 0.25)).unwrap();
        (world, slime, bat)
    }

    fn run(world: &mut World, rng: &mut Pcg32) {
        let input = TickInput::default();
        let mut outbox = Vec::new();
        let mut ctx = StageContext {
            dt: Duration::from_millis(16),
            input: &input,
            rng,
            outbox: &mut outbox,
        };
        PlacementStage.run(world, &mut ctx).unwrap();
    }

    #[test]
    fn test_stage_places_once() {
        let (mut world, _slime, bat) = placement_world();
        let mut rng = Pcg32::seed_from_u64(5);
        run(&mut world, &mut rng);

        let placed = world.get::<Transform>(bat).unwrap().position;
        assert!(!world.get::<ActorPhysics>(bat).unwrap().needs_placement);
        // Slime sits right of centre, so the bat lands on the left wall
        assert_eq!(placed.x, ROOM.left() + 32.0);

        world.get_mut::<Transform>(bat).unwrap().position = Vec2::new(500.0, 500.0);
        run(&mut world, &mut rng);
        assert_eq!(
            world.get::<Transform>(bat).unwrap().position,
            Vec2::new(500.0, 500.0)
        );
    }
}
