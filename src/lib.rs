//! Slime Sim - tick simulation core for a grid-based slime arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entity store, stage pipeline, rules)
//! - `settings`: Data-driven tuning loaded from JSON
//! - `error`: Error taxonomy shared by the store and the stages
//!
//! Rendering, audio playback, UI panels and content loading live outside
//! this crate; they observe the simulation through [`sim::SimEvent`]s.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::SimError;
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Time between discrete slime steps (milliseconds)
    pub const MOVEMENT_QUANTUM_MS: u64 = 200;
    /// Host frame step for the headless driver (60 Hz)
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Maximum frames the host will catch up in one update
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Tile grid defaults (16px tiles drawn at 4x scale)
    pub const GRID_COLUMNS: u32 = 20;
    pub const GRID_ROWS: u32 = 12;
    pub const TILE_SIZE: f32 = 64.0;

    /// Sprite footprints used for collision bounds
    pub const SLIME_SIZE: f32 = 64.0;
    pub const BAT_SIZE: f32 = 64.0;

    /// Slime collision radius as a fraction of its width
    pub const SLIME_RADIUS_FACTOR: f32 = 0.5;
    /// Bat collision radius as a fraction of its width
    pub const BAT_RADIUS_FACTOR: f32 = 0.25;

    /// Bat speed (world units per tick)
    pub const BAT_SPEED: f32 = 5.0;
    /// Push applied away from a wall on bounce (position only)
    pub const BOUNCE_NUDGE: f32 = 4.0;

    /// Score awarded per bat eaten
    pub const PICKUP_REWARD: u32 = 100;
    /// Maximum buffered turns
    pub const TURN_BUFFER_CAPACITY: usize = 2;
}

/// Linear interpolation between two points
#[inline]
pub fn lerp(from: Vec2, to: Vec2, t: f32) -> Vec2 {
    from + (to - from) * t
}

/// Unit vector for an angle in radians
#[inline]
pub fn unit_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        let a = Vec2::new(0.0, 10.0);
        let b = Vec2::new(16.0, 10.0);
        assert_eq!(lerp(a, b, 0.0), a);
        assert_eq!(lerp(a, b, 1.0), b);
        assert_eq!(lerp(a, b, 0.5), Vec2::new(8.0, 10.0));
    }

    #[test]
    fn test_unit_from_angle() {
        let v = unit_from_angle(std::f32::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
        assert!((unit_from_angle(1.234).length() - 1.0).abs() < 1e-6);
    }
}
