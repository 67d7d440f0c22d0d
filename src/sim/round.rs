//! Round ownership: spawning, reset, pause and the per-tick entry point
//!
//! A [`Round`] owns the world, the stage pipeline, the RNG and the event
//! outbox. Hosts build one from [`Settings`], pass their observers in, and
//! call [`Round::tick`] once per frame.

use std::time::Duration;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::components::{
    ActorPhysics, AudioCues, BodyChain, Footprint, GamePhase, RoomBounds, RunState, Transform,
};
use super::geometry::Rect;
use super::movement::MovementStage;
use super::notify::{NotificationStage, SimEvent, SimObserver};
use super::physics::PhysicsStage;
use super::pickup::PickupStage;
use super::pipeline::{Pipeline, StageContext};
use super::placement::{PlacementStage, random_velocity};
use super::tick::InputSource;
use super::world::{Entity, World};
use crate::consts::{BAT_RADIUS_FACTOR, SLIME_RADIUS_FACTOR};
use crate::error::SimError;
use crate::settings::Settings;

/// Ids of everything a round spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntities {
    pub room: Entity,
    pub run: Entity,
    pub audio: Entity,
    pub slime: Entity,
    pub bat: Entity,
}

/// Populate an empty world with the starting round
///
/// The slime starts in the centre cell heading right with a single
/// segment. The bat gets a random heading but waits for the placement
/// stage before it moves.
pub fn spawn_round(
    world: &mut World,
    settings: &Settings,
    rng: &mut Pcg32,
) -> Result<RoundEntities, SimError> {
    let grid = settings.grid();

    let room = world.create();
    world.attach(
        room,
        RoomBounds {
            rect: grid.interior(),
        },
    )?;

    let run = world.create();
    world.attach(run, RunState::default())?;

    let audio = world.create();
    world.attach(
        audio,
        AudioCues {
            bounce: settings.bounce_cue.clone(),
            pickup: settings.pickup_cue.clone(),
        },
    )?;

    let origin = grid.center_cell();
    let slime = world.create();
    world.attach(
        slime,
        Transform {
            position: origin,
            facing: Vec2::X,
        },
    )?;
    world.attach(slime, BodyChain::new(origin, settings.tile_size, Vec2::X))?;
    world.attach(
        slime,
        Footprint::new(Vec2::splat(settings.slime_size), SLIME_RADIUS_FACTOR),
    )?;

    let bat = world.create();
    let mut physics = ActorPhysics::unplaced(settings.bat_speed);
    physics.velocity = random_velocity(rng, settings.bat_speed);
    world.attach(bat, Transform::default())?;
    world.attach(bat, physics)?;
    world.attach(
        bat,
        Footprint::new(Vec2::splat(settings.bat_size), BAT_RADIUS_FACTOR),
    )?;

    Ok(RoundEntities {
        room,
        run,
        audio,
        slime,
        bat,
    })
}

/// The gameplay stages in execution order
pub fn gameplay_pipeline(
    settings: &Settings,
    observers: Vec<Box<dyn SimObserver>>,
) -> Result<Pipeline, SimError> {
    let mut pipeline = Pipeline::new();
    pipeline
        .register(MovementStage::new(settings.movement_quantum())?)
        .register(PlacementStage)
        .register(PhysicsStage::new(settings.bounce_nudge))
        .register(PickupStage::new(settings.pickup_reward))
        .register(NotificationStage::new(observers));
    Ok(pipeline)
}

/// Serializable view of a round for debugging and replay checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub seed: u64,
    pub ticks: u64,
    pub phase: GamePhase,
    pub score: u32,
    pub room: Rect,
    pub slime: BodyChain,
    pub bat: Transform,
    pub bat_physics: ActorPhysics,
}

/// One playable round and everything it needs to advance
pub struct Round {
    settings: Settings,
    world: World,
    pipeline: Pipeline,
    entities: RoundEntities,
    rng: Pcg32,
    outbox: Vec<SimEvent>,
    ticks: u64,
}

impl Round {
    /// Build a round and spawn its entities
    pub fn new(settings: Settings, observers: Vec<Box<dyn SimObserver>>) -> Result<Self, SimError> {
        settings.validate()?;
        let mut rng = Pcg32::seed_from_u64(settings.seed);
        let mut world = World::new();
        let entities = spawn_round(&mut world, &settings, &mut rng)?;
        let pipeline = gameplay_pipeline(&settings, observers)?;
        pipeline.validate(&world)?;
        log::info!(
            "Round ready: {} stages, seed {:#x}",
            pipeline.len(),
            settings.seed
        );

        Ok(Self {
            settings,
            world,
            pipeline,
            entities,
            rng,
            outbox: Vec::new(),
            ticks: 0,
        })
    }

    /// Tear everything down and start over with score 0
    ///
    /// The RNG keeps its stream, so consecutive rounds differ.
    pub fn reset(&mut self) -> Result<(), SimError> {
        let mut world = World::new();
        let entities = spawn_round(&mut world, &self.settings, &mut self.rng)?;
        self.pipeline.validate(&world)?;
        self.pipeline.reset();
        self.world = world;
        self.entities = entities;
        self.outbox.clear();
        self.ticks = 0;
        log::info!("Round reset");
        Ok(())
    }

    /// Advance one tick
    ///
    /// A pause press toggles `Playing` and `Paused`; pausing consumes the
    /// tick, resuming does not. Nothing runs while paused or after game
    /// over. A fatal stage error ends the round, reaches observers as
    /// `GameOver` and is returned.
    pub fn tick(&mut self, input: &dyn InputSource, dt: Duration) -> Result<(), SimError> {
        let mut phase = self.run_state()?.phase;
        if input.pause_pressed() {
            match phase {
                GamePhase::Playing => {
                    self.set_phase(GamePhase::Paused)?;
                    log::info!("Paused");
                    return Ok(());
                }
                GamePhase::Paused => {
                    self.set_phase(GamePhase::Playing)?;
                    phase = GamePhase::Playing;
                    log::info!("Resumed");
                }
                GamePhase::GameOver => {}
            }
        }

        if phase != GamePhase::Playing {
            return Ok(());
        }

        self.ticks += 1;
        let mut ctx = StageContext {
            dt,
            input,
            rng: &mut self.rng,
            outbox: &mut self.outbox,
        };
        if let Err(err) = self.pipeline.run(&mut self.world, &mut ctx) {
            self.outbox.clear();
            if err.is_fatal() {
                log::error!("Aborting round after tick {}: {err}", self.ticks);
                if self.set_phase(GamePhase::GameOver).is_ok() {
                    self.pipeline.abort(&self.world);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Host-driven pause; has no effect once the round is over
    pub fn set_paused(&mut self, paused: bool) -> Result<(), SimError> {
        match (self.run_state()?.phase, paused) {
            (GamePhase::Playing, true) => self.set_phase(GamePhase::Paused),
            (GamePhase::Paused, false) => self.set_phase(GamePhase::Playing),
            _ => Ok(()),
        }
    }

    fn set_phase(&mut self, phase: GamePhase) -> Result<(), SimError> {
        self.world.get_mut::<RunState>(self.entities.run)?.phase = phase;
        Ok(())
    }

    pub fn run_state(&self) -> Result<RunState, SimError> {
        self.world.get::<RunState>(self.entities.run).copied()
    }

    /// Current phase; a round without its run state counts as over
    pub fn phase(&self) -> GamePhase {
        self.run_state()
            .inspect_err(|err| log::error!("No phase to report: {err}"))
            .map_or(GamePhase::GameOver, |run| run.phase)
    }

    pub fn score(&self) -> u32 {
        self.run_state()
            .inspect_err(|err| log::error!("No score to report: {err}"))
            .map_or(0, |run| run.score)
    }

    pub fn is_over(&self) -> bool {
        self.phase() == GamePhase::GameOver
    }

    /// Ticks simulated since the last reset (paused ticks excluded)
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn entities(&self) -> RoundEntities {
        self.entities
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    /// Interpolated head position for rendering
    pub fn head_position(&self) -> Option<Vec2> {
        self.world
            .try_get::<BodyChain>(self.entities.slime)
            .and_then(BodyChain::head_position)
    }

    pub fn slime_len(&self) -> usize {
        self.world
            .try_get::<BodyChain>(self.entities.slime)
            .map_or(0, BodyChain::len)
    }

    pub fn bat_position(&self) -> Option<Vec2> {
        self.world
            .try_get::<Transform>(self.entities.bat)
            .map(|t| t.position)
    }

    pub fn room(&self) -> Option<Rect> {
        self.world
            .try_get::<RoomBounds>(self.entities.room)
            .map(|r| r.rect)
    }

    pub fn snapshot(&self) -> Result<RoundSnapshot, SimError> {
        let run = self.world.get::<RunState>(self.entities.run)?;
        Ok(RoundSnapshot {
            seed: self.settings.seed,
            ticks: self.ticks,
            phase: run.phase,
            score: run.score,
            room: self.world.get::<RoomBounds>(self.entities.room)?.rect,
            slime: self.world.get::<BodyChain>(self.entities.slime)?.clone(),
            bat: *self.world.get::<Transform>(self.entities.bat)?,
            bat_physics: *self.world.get::<ActorPhysics>(self.entities.bat)?,
        })
    }
}
