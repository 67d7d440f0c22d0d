//! Component records
//!
//! Plain data attached to entities. Rules that change these live in the
//! stages; the helpers here only read.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Circle, Rect};
use super::world::ComponentMask;
use crate::consts::TURN_BUFFER_CAPACITY;
use crate::lerp;

/// Component combinations the stages look for
pub mod archetype {
    use super::ComponentMask;

    /// The player-controlled slime
    pub const SLIME: ComponentMask = ComponentMask::TRANSFORM
        .union(ComponentMask::BODY_CHAIN)
        .union(ComponentMask::FOOTPRINT);
    /// The bouncing bat
    pub const BAT: ComponentMask = ComponentMask::TRANSFORM
        .union(ComponentMask::ACTOR_PHYSICS)
        .union(ComponentMask::FOOTPRINT);
    pub const ROOM: ComponentMask = ComponentMask::ROOM_BOUNDS;
    pub const RUN: ComponentMask = ComponentMask::RUN_STATE;
}

/// Cardinal input direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Sampling priority when several are held
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step in world space (y grows downward)
    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Up => -Vec2::Y,
            Direction::Down => Vec2::Y,
            Direction::Left => -Vec2::X,
            Direction::Right => Vec2::X,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// World-space location and last movement direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    pub facing: Vec2,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            facing: Vec2::ZERO,
        }
    }
}

/// One body unit of the slime, interpolating between two grid points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Vec2,
    pub to: Vec2,
    pub direction: Vec2,
}

impl Segment {
    /// Interpolated position for a tick progress in [0, 1]
    pub fn at(&self, progress: f32) -> Vec2 {
        lerp(self.from, self.to, progress)
    }
}

/// Pending turns, oldest first, never more than two
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnBuffer {
    slots: [Vec2; TURN_BUFFER_CAPACITY],
    len: usize,
}

impl TurnBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == TURN_BUFFER_CAPACITY
    }

    /// Most recently buffered turn
    pub fn back(&self) -> Option<Vec2> {
        self.len.checked_sub(1).map(|i| self.slots[i])
    }

    /// Returns false (and drops the turn) when full
    pub fn push_back(&mut self, turn: Vec2) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.len] = turn;
        self.len += 1;
        true
    }

    pub fn pop_front(&mut self) -> Option<Vec2> {
        if self.len == 0 {
            return None;
        }
        let front = self.slots[0];
        self.slots.copy_within(1.., 0);
        self.len -= 1;
        Some(front)
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.slots[..self.len].iter().copied()
    }
}

/// Slime body: segment chain, buffered input and step timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyChain {
    /// Head first; never empty during a round
    pub segments: Vec<Segment>,
    /// Grid step size (one tile)
    pub stride: f32,
    pub pending_turns: TurnBuffer,
    /// Direction the next step will take
    pub next_direction: Vec2,
    /// Time banked toward the next step
    pub tick_accumulator: Duration,
    /// Fraction of the current step elapsed, for interpolated drawing
    pub tick_progress: f32,
    /// Set when a step lands the head on the body; consumed by the pickup stage
    pub body_collision_detected: bool,
}

impl BodyChain {
    /// A one-segment slime whose head spans `origin` to one stride along `direction`
    pub fn new(origin: Vec2, stride: f32, direction: Vec2) -> Self {
        Self {
            segments: vec![Segment {
                from: origin,
                to: origin + direction * stride,
                direction,
            }],
            stride,
            pending_turns: TurnBuffer::default(),
            next_direction: direction,
            tick_accumulator: Duration::ZERO,
            tick_progress: 0.0,
            body_collision_detected: false,
        }
    }

    pub fn head(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn tail(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Interpolated head position
    pub fn head_position(&self) -> Option<Vec2> {
        self.head().map(|h| h.at(self.tick_progress))
    }

    /// The direction a new turn must not reverse: the newest buffered turn,
    /// or the head's heading when nothing is buffered
    pub fn last_accepted_direction(&self) -> Option<Vec2> {
        self.pending_turns
            .back()
            .or_else(|| self.head().map(|h| h.direction))
    }
}

/// Sprite footprint used to derive circular collision bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Sprite extent; bounds are centred on it
    pub size: Vec2,
    /// Radius as a fraction of the width
    pub radius_factor: f32,
}

impl Footprint {
    pub fn new(size: Vec2, radius_factor: f32) -> Self {
        Self {
            size,
            radius_factor,
        }
    }

    pub fn radius(&self) -> f32 {
        self.size.x * self.radius_factor
    }

    /// Collision circle for a sprite drawn with its top-left at `top_left`
    pub fn bounds(&self, top_left: Vec2) -> Circle {
        Circle::new(top_left + self.size * 0.5, self.radius())
    }
}

/// Bat motion state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorPhysics {
    /// World units per tick
    pub velocity: Vec2,
    /// Magnitude used when velocity is re-randomised
    pub speed: f32,
    /// Waiting for a start position away from the slime
    pub needs_placement: bool,
}

impl ActorPhysics {
    pub fn unplaced(speed: f32) -> Self {
        Self {
            velocity: Vec2::ZERO,
            speed,
            needs_placement: true,
        }
    }
}

/// Play-field interior, fixed for the round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomBounds {
    pub rect: Rect,
}

/// Coarse run state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    Playing,
    /// Frozen by the host
    Paused,
    /// Terminal until the round is reset
    GameOver,
}

/// Shared phase and score, one per round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub phase: GamePhase,
    pub score: u32,
}

/// Name of a sound the host knows how to play
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundCue(String);

impl SoundCue {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Sounds the stages may ask the host to play
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioCues {
    pub bounce: Option<SoundCue>,
    pub pickup: Option<SoundCue>,
}
