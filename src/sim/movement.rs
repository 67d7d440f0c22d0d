//! Slime movement: input buffering, fixed-quantum steps, self-collision
//!
//! Input is sampled every tick but the slime only moves when a full
//! movement quantum has been banked. Between steps `tick_progress` tells the
//! renderer how far along the current step each segment is.

use std::time::Duration;

use glam::Vec2;

use super::components::{BodyChain, Segment, Transform, archetype};
use super::pipeline::{Stage, StageContext};
use super::tick::sample_intent;
use super::world::{ComponentMask, World};
use crate::error::SimError;

/// Buffer a turn unless the buffer is full or it reverses the last accepted
/// direction. Returns whether the turn was queued.
pub fn buffer_turn(chain: &mut BodyChain, turn: Vec2) -> bool {
    if chain.pending_turns.is_full() {
        return false;
    }
    let Some(last) = chain.last_accepted_direction() else {
        return false;
    };
    if turn.dot(last) < 0.0 {
        log::trace!("Rejected reversal {turn} against {last}");
        return false;
    }
    chain.pending_turns.push_back(turn)
}

/// One discrete step of the whole chain
///
/// The head advances one stride in `next_direction` (taking a buffered turn
/// first if there is one) and every other segment takes the place its
/// predecessor held before the step. Returns true if the head landed on the
/// body, in which case `body_collision_detected` is also set; the step
/// itself is never undone.
pub fn step_chain(chain: &mut BodyChain) -> bool {
    if let Some(turn) = chain.pending_turns.pop_front() {
        chain.next_direction = turn;
    }

    let Some(&old_head) = chain.segments.first() else {
        return false;
    };
    let head = Segment {
        from: old_head.to,
        to: old_head.to + chain.next_direction * chain.stride,
        direction: chain.next_direction,
    };

    chain.segments.insert(0, head);
    chain.segments.pop();

    let bitten = chain.segments[1..].iter().any(|s| s.from == head.from);
    if bitten {
        chain.body_collision_detected = true;
    }
    bitten
}

/// Moves every slime on a fixed cadence
pub struct MovementStage {
    quantum: Duration,
}

impl MovementStage {
    /// Fails for a zero quantum, which would step forever
    pub fn new(quantum: Duration) -> Result<Self, SimError> {
        if quantum.is_zero() {
            return Err(SimError::Settings("movement quantum must be > 0".into()));
        }
        Ok(Self { quantum })
    }

    fn advance(&self, chain: &mut BodyChain, dt: Duration) {
        chain.tick_accumulator += dt;
        while chain.tick_accumulator >= self.quantum {
            chain.tick_accumulator -= self.quantum;
            if step_chain(chain) {
                log::debug!("Slime head landed on its body");
            }
        }
        chain.tick_progress =
            chain.tick_accumulator.as_secs_f32() / self.quantum.as_secs_f32();
    }
}

impl Stage for MovementStage {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn requires(&self) -> &'static [ComponentMask] {
        &[archetype::SLIME]
    }

    fn run(&mut self, world: &mut World, ctx: &mut StageContext<'_>) -> Result<(), SimError> {
        let intent = sample_intent(ctx.input);
        let slimes: Vec<_> = world
            .query(ComponentMask::TRANSFORM | ComponentMask::BODY_CHAIN)
            .collect();

        for entity in slimes {
            let chain = world.get_mut::<BodyChain>(entity)?;
            if chain.is_empty() {
                return Err(SimError::EmptyBodyChain(entity));
            }

            if let Some(direction) = intent {
                if buffer_turn(chain, direction.vector()) {
                    log::debug!("Buffered turn {direction:?}");
                }
            }

            self.advance(chain, ctx.dt);

            let (position, facing) = match chain.head() {
                Some(head) => (head.at(chain.tick_progress), head.direction),
                None => return Err(SimError::EmptyBodyChain(entity)),
            };
            let transform = world.get_mut::<Transform>(entity)?;
            transform.position = position;
            transform.facing = facing;
        }
        Ok(())
    }
}
