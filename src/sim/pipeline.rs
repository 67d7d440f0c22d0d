//! Ordered stage pipeline
//!
//! Each stage scans the world for the component combinations it declares and
//! applies one rule. Stages run in registration order, once per tick, and
//! the first error stops the tick.

use std::time::Duration;

use rand_pcg::Pcg32;

use super::notify::SimEvent;
use super::tick::InputSource;
use super::world::{ComponentMask, World};
use crate::error::SimError;

/// Per-tick inputs and outputs shared by all stages
pub struct StageContext<'a> {
    /// Wall-clock time covered by this tick
    pub dt: Duration,
    pub input: &'a dyn InputSource,
    /// Round RNG (placement and velocity re-randomisation)
    pub rng: &'a mut Pcg32,
    /// Events raised this tick; delivered by the notification stage
    pub outbox: &'a mut Vec<SimEvent>,
}

impl StageContext<'_> {
    pub fn raise(&mut self, event: SimEvent) {
        self.outbox.push(event);
    }
}

/// One update rule
pub trait Stage {
    fn name(&self) -> &'static str;

    /// Combinations that must each be present on at least one entity
    fn requires(&self) -> &'static [ComponentMask];

    fn run(&mut self, world: &mut World, ctx: &mut StageContext<'_>) -> Result<(), SimError>;

    /// Forget per-round memory when the world is rebuilt
    fn reset(&mut self) {}

    /// Called once after a fatal error ended the round mid-tick
    fn abort(&mut self, _world: &World) {}
}

/// Stages in the order they execute
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; it runs after everything registered before it
    pub fn register(&mut self, stage: impl Stage + 'static) -> &mut Self {
        log::debug!("Registered stage {}", stage.name());
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Check every declared requirement against the world
    pub fn validate(&self, world: &World) -> Result<(), SimError> {
        for stage in &self.stages {
            for &mask in stage.requires() {
                if world.first_with(mask).is_none() {
                    return Err(SimError::UnmetRequirement {
                        stage: stage.name(),
                        mask,
                    });
                }
            }
        }
        Ok(())
    }

    /// Run every stage once, in order
    pub fn run(&mut self, world: &mut World, ctx: &mut StageContext<'_>) -> Result<(), SimError> {
        for stage in &mut self.stages {
            stage.run(world, ctx).inspect_err(|e| {
                log::error!("Stage {} failed: {}", stage.name(), e);
            })?;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Let every stage react to a round that was ended by an error
    pub fn abort(&mut self, world: &World) {
        for stage in &mut self.stages {
            stage.abort(world);
        }
    }
}
