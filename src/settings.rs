//! Simulation settings
//!
//! Loaded from a JSON file next to the host; every field has a default so a
//! partial file only overrides what it names.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;
use crate::sim::{SoundCue, TileGrid};

/// Tuning and room layout for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Timing ===
    /// Milliseconds between slime steps
    pub movement_quantum_ms: u64,

    // === Room ===
    /// Tile grid columns (including the wall ring)
    pub columns: u32,
    /// Tile grid rows (including the wall ring)
    pub rows: u32,
    /// Tile edge length in world units; also the slime stride
    pub tile_size: f32,

    // === Actors ===
    /// Slime sprite edge length
    pub slime_size: f32,
    /// Bat sprite edge length
    pub bat_size: f32,
    /// Bat speed (world units per tick)
    pub bat_speed: f32,
    /// Push away from a wall on bounce
    pub bounce_nudge: f32,

    // === Scoring ===
    /// Points per bat eaten
    pub pickup_reward: u32,

    // === Audio ===
    /// Cue raised when the bat bounces off a wall
    pub bounce_cue: Option<SoundCue>,
    /// Cue raised when the score changes
    pub pickup_cue: Option<SoundCue>,

    /// RNG seed for bat placement and velocity
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            movement_quantum_ms: MOVEMENT_QUANTUM_MS,

            columns: GRID_COLUMNS,
            rows: GRID_ROWS,
            tile_size: TILE_SIZE,

            slime_size: SLIME_SIZE,
            bat_size: BAT_SIZE,
            bat_speed: BAT_SPEED,
            bounce_nudge: BOUNCE_NUDGE,

            pickup_reward: PICKUP_REWARD,

            bounce_cue: Some(SoundCue::new("audio/bounce")),
            pickup_cue: Some(SoundCue::new("audio/collect")),

            seed: 0x5eed,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| SimError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&contents)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Using default settings ({}): {}",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, SimError> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::Settings(e.to_string()))
    }

    /// Reject layouts the simulation cannot run
    pub fn validate(&self) -> Result<(), SimError> {
        if self.movement_quantum_ms == 0 {
            return Err(SimError::Settings("movement_quantum_ms must be > 0".into()));
        }
        if self.columns < 3 || self.rows < 3 {
            return Err(SimError::Settings(
                "grid needs at least 3x3 tiles to have an interior".into(),
            ));
        }
        if self.tile_size <= 0.0 || self.slime_size <= 0.0 || self.bat_size <= 0.0 {
            return Err(SimError::Settings("sizes must be positive".into()));
        }
        Ok(())
    }

    /// Fixed duration of one slime step
    pub fn movement_quantum(&self) -> Duration {
        Duration::from_millis(self.movement_quantum_ms)
    }

    /// Tile grid the room is derived from
    pub fn grid(&self) -> TileGrid {
        TileGrid::new(self.columns, self.rows, self.tile_size)
    }
}
