//! Simulation events and the stage that delivers them
//!
//! Stages never call into audio or UI code. They raise [`SimEvent`]s into
//! the tick outbox, and [`NotificationStage`], registered last, hands them
//! to whatever observers the host passed in when the round was built. Score
//! and game-over notifications are derived here by watching [`RunState`].

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::components::{AudioCues, GamePhase, RunState, SoundCue, archetype};
use super::pipeline::{Stage, StageContext};
use super::world::{ComponentMask, World};
use crate::error::SimError;

/// Something the presentation layer may want to react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A bat hit a wall
    Bounce(SoundCue),
    /// The score went up
    Pickup(SoundCue),
    ScoreChanged(u32),
    /// Fired once per transition into `GameOver`
    GameOver,
}

/// Receiver for simulation events
pub trait SimObserver {
    fn notify(&mut self, event: &SimEvent);
}

impl<F: FnMut(&SimEvent)> SimObserver for F {
    fn notify(&mut self, event: &SimEvent) {
        self(event)
    }
}

/// Shared recorder; clone it before handing it to a round to read it back
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<SimEvent>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<SimEvent> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl SimObserver for EventLog {
    fn notify(&mut self, event: &SimEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

/// Turns run-state changes into events and delivers the tick's outbox
pub struct NotificationStage {
    observers: Vec<Box<dyn SimObserver>>,
    last_score: u32,
    last_phase: GamePhase,
}

impl Default for NotificationStage {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl NotificationStage {
    pub fn new(observers: Vec<Box<dyn SimObserver>>) -> Self {
        Self {
            observers,
            last_score: 0,
            last_phase: GamePhase::Playing,
        }
    }

    pub fn with_observer(mut self, observer: impl SimObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Queue `GameOver` if the phase just flipped into it
    fn track_phase(&mut self, phase: GamePhase, events: &mut Vec<SimEvent>) {
        if phase == GamePhase::GameOver && self.last_phase != GamePhase::GameOver {
            events.push(SimEvent::GameOver);
        }
        self.last_phase = phase;
    }

    fn dispatch(&mut self, events: &[SimEvent]) {
        for event in events {
            for observer in &mut self.observers {
                observer.notify(event);
            }
        }
    }
}

impl Stage for NotificationStage {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn requires(&self) -> &'static [ComponentMask] {
        &[archetype::RUN]
    }

    fn run(&mut self, world: &mut World, ctx: &mut StageContext<'_>) -> Result<(), SimError> {
        let mut events: Vec<SimEvent> = ctx.outbox.drain(..).collect();
        let (_, run) = world.single::<RunState>()?;
        let run = *run;

        if run.score != self.last_score {
            self.last_score = run.score;
            events.push(SimEvent::ScoreChanged(run.score));
            let pickup_cue = world
                .single::<AudioCues>()
                .ok()
                .and_then(|(_, cues)| cues.pickup.clone());
            if let Some(cue) = pickup_cue {
                events.push(SimEvent::Pickup(cue));
            }
        }

        self.track_phase(run.phase, &mut events);
        self.dispatch(&events);
        Ok(())
    }

    fn reset(&mut self) {
        self.last_score = 0;
        self.last_phase = GamePhase::Playing;
    }

    /// The tick's outbox is lost, but the game-over edge still reaches observers
    fn abort(&mut self, world: &World) {
        let phase = match world.single::<RunState>() {
            Ok((_, run)) => run.phase,
            Err(err) => {
                log::error!("Cannot report aborted round: {err}");
                return;
            }
        };
        let mut events = Vec::new();
        self.track_phase(phase, &mut events);
        self.dispatch(&events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Entity;
    use crate::sim::tick::TickInput;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::time::Duration;

    fn world_with_cues(pickup: Option<&str>) -> (World, Entity) {
        let mut world = World::new();
        let run = world.create();
        world.attach(run, RunState::default()).unwrap();
        let audio = world.create();
        world
            .attach(
                audio,
                AudioCues {
                    bounce: None,
                    pickup: pickup.map(SoundCue::new),
                },
            )
            .unwrap();
        (world, run)
    }

    fn tick(stage: &mut NotificationStage, world: &mut World, raised: Vec<SimEvent>) {
        let input = TickInput::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut outbox = raised;
        let mut ctx = StageContext {
            dt: Duration::from_millis(16),
            input: &input,
            rng: &mut rng,
            outbox: &mut outbox,
        };
        stage.run(world, &mut ctx).unwrap();
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_outbox_is_forwarded_in_order() {
        let log = EventLog::new();
        let mut stage = NotificationStage::default().with_observer(log.clone());
        let (mut world, _) = world_with_cues(None);
        let bounce = SimEvent::Bounce(SoundCue::new("bounce"));
        tick(&mut stage, &mut world, vec![bounce.clone(), bounce.clone()]);
        assert_eq!(log.take(), vec![bounce.clone(), bounce]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_score_change_emits_value_and_cue() {
        let log = EventLog::new();
        let mut stage = NotificationStage::default().with_observer(log.clone());
        let (mut world, run) = world_with_cues(Some("collect"));

        tick(&mut stage, &mut world, Vec::new());
        assert!(log.is_empty());

        world.get_mut::<RunState>(run).unwrap().score = 100;
        tick(&mut stage, &mut world, Vec::new());
        assert_eq!(
            log.take(),
            vec![
                SimEvent::ScoreChanged(100),
                SimEvent::Pickup(SoundCue::new("collect"))
            ]
        );

        tick(&mut stage, &mut world, Vec::new());
        assert!(log.is_empty());
    }

    #[test]
    fn test_missing_pickup_cue_skips_sound() {
        let log = EventLog::new();
        let mut stage = NotificationStage::default().with_observer(log.clone());
        let (mut world, run) = world_with_cues(None);
        world.get_mut::<RunState>(run).unwrap().score = 100;
        tick(&mut stage, &mut world, Vec::new());
        assert_eq!(log.take(), vec![SimEvent::ScoreChanged(100)]);
    }

    #[test]
    fn test_game_over_fires_on_the_edge_only() {
        let log = EventLog::new();
        let mut stage = NotificationStage::default().with_observer(log.clone());
        let (mut world, run) = world_with_cues(None);
        world.get_mut::<RunState>(run).unwrap().phase = GamePhase::GameOver;

        tick(&mut stage, &mut world, Vec::new());
        tick(&mut stage, &mut world, Vec::new());
        assert_eq!(log.take(), vec![SimEvent::GameOver]);

        stage.reset();
        tick(&mut stage, &mut world, Vec::new());
        assert_eq!(log.take(), vec![SimEvent::GameOver]);
    }

    #[test]
    fn test_abort_reports_game_over_once() {
        let log = EventLog::new();
        let mut stage = NotificationStage::default().with_observer(log.clone());
        let (mut world, run) = world_with_cues(None);

        // Still playing: nothing to say
        stage.abort(&world);
        assert!(log.is_empty());

        world.get_mut::<RunState>(run).unwrap().phase = GamePhase::GameOver;
        stage.abort(&world);
        stage.abort(&world);
        tick(&mut stage, &mut world, Vec::new());
        assert_eq!(log.take(), vec![SimEvent::GameOver]);
    }

    #[test]
    fn test_closure_observers_receive_events() {
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        let mut stage = NotificationStage::default()
            .with_observer(move |_: &SimEvent| *counter.borrow_mut() += 1)
            .with_observer(EventLog::new());
        assert_eq!(stage.observer_count(), 2);
        let (mut world, _) = world_with_cues(None);
        tick(
            &mut stage,
            &mut world,
            vec![SimEvent::Bounce(SoundCue::new("b"))],
        );
        assert_eq!(*seen.borrow(), 1);
    }
}
