//! Full rounds driven through the public API

use std::time::Duration;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use slime_sim::Settings;
use slime_sim::sim::{
    ActorPhysics, BodyChain, Direction, EventLog, GamePhase, Round, RunState, SimEvent,
    SimObserver, SoundCue, StageContext, TickInput, Transform, World, gameplay_pipeline,
    spawn_round,
};

const FRAME: Duration = Duration::from_millis(16);

fn round_with_log(settings: Settings) -> (Round, EventLog) {
    let log = EventLog::new();
    let observers: Vec<Box<dyn SimObserver>> = vec![Box::new(log.clone())];
    let round = Round::new(settings, observers).expect("valid settings");
    (round, log)
}

fn game_overs(events: &[SimEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SimEvent::GameOver))
        .count()
}

/// A wandering but legal input script
fn scripted_input(tick: usize) -> TickInput {
    match tick % 48 {
        0 => TickInput::steer(Direction::Down),
        12 => TickInput::steer(Direction::Left),
        24 => TickInput::steer(Direction::Up),
        36 => TickInput::steer(Direction::Right),
        _ => TickInput::default(),
    }
}

#[test]
fn test_same_seed_same_round() {
    let (mut a, _) = round_with_log(Settings::default());
    let (mut b, _) = round_with_log(Settings::default());

    for i in 0..400 {
        let input = scripted_input(i);
        a.tick(&input, FRAME).unwrap();
        b.tick(&input, FRAME).unwrap();
        assert_eq!(a.snapshot().unwrap(), b.snapshot().unwrap(), "diverged at tick {i}");
    }
}

#[test]
fn test_different_seeds_diverge() {
    let (mut a, _) = round_with_log(Settings::default());
    let (mut b, _) = round_with_log(Settings {
        seed: 7,
        ..Default::default()
    });
    a.tick(&TickInput::default(), FRAME).unwrap();
    b.tick(&TickInput::default(), FRAME).unwrap();
    assert_ne!(
        a.snapshot().unwrap().bat_physics,
        b.snapshot().unwrap().bat_physics
    );
}

#[test]
fn test_running_into_the_wall_ends_the_round_once() {
    let (mut round, log) = round_with_log(Settings::default());

    // No input: the slime keeps heading right until it leaves the room
    for _ in 0..600 {
        round.tick(&TickInput::default(), FRAME).unwrap();
    }
    assert!(round.is_over());
    let frozen = round.snapshot().unwrap();

    for _ in 0..10 {
        round.tick(&TickInput::default(), FRAME).unwrap();
    }
    assert_eq!(round.snapshot().unwrap(), frozen);
    assert_eq!(game_overs(&log.take()), 1);
}

#[test]
fn test_length_never_shrinks() {
    let (mut round, _) = round_with_log(Settings::default());
    let mut len = round.slime_len();
    for i in 0..600 {
        round.tick(&scripted_input(i), FRAME).unwrap();
        assert!(round.slime_len() >= len);
        len = round.slime_len();
    }
}

#[test]
fn test_reset_restores_the_opening() {
    let (mut round, log) = round_with_log(Settings::default());
    for _ in 0..600 {
        round.tick(&TickInput::default(), FRAME).unwrap();
    }
    assert!(round.is_over());
    log.take();

    round.reset().unwrap();
    assert_eq!(round.phase(), GamePhase::Playing);
    assert_eq!(round.score(), 0);
    assert_eq!(round.slime_len(), 1);
    assert_eq!(round.ticks(), 0);
    assert_eq!(round.head_position(), Some(Vec2::new(640.0, 384.0)));
    let bat = round.entities().bat;
    assert!(round.world().get::<ActorPhysics>(bat).unwrap().needs_placement);
    assert!(log.is_empty());

    // A fresh round can end again, and says so again
    for _ in 0..600 {
        round.tick(&TickInput::default(), FRAME).unwrap();
    }
    assert!(round.is_over());
    assert_eq!(game_overs(&log.take()), 1);
}

#[test]
fn test_pause_press_after_game_over_is_ignored() {
    let (mut round, _) = round_with_log(Settings::default());
    for _ in 0..600 {
        round.tick(&TickInput::default(), FRAME).unwrap();
    }
    round.tick(&TickInput::pause(), FRAME).unwrap();
    assert_eq!(round.phase(), GamePhase::GameOver);
}

#[test]
fn test_smaller_room_from_settings_ends_sooner() {
    let settings = Settings::from_json(r#"{ "columns": 10, "rows": 8 }"#).unwrap();
    let (mut small, _) = round_with_log(settings);
    let (mut large, _) = round_with_log(Settings::default());

    let mut small_ticks = None;
    let mut large_ticks = None;
    for i in 1..=600u32 {
        small.tick(&TickInput::default(), FRAME).unwrap();
        large.tick(&TickInput::default(), FRAME).unwrap();
        if small.is_over() && small_ticks.is_none() {
            small_ticks = Some(i);
        }
        if large.is_over() && large_ticks.is_none() {
            large_ticks = Some(i);
        }
    }
    assert!(small_ticks.unwrap() < large_ticks.unwrap());
}

#[test]
fn test_pickup_through_the_pipeline() {
    let settings = Settings::default();
    let mut rng = Pcg32::seed_from_u64(settings.seed);
    let mut world = World::new();
    let ids = spawn_round(&mut world, &settings, &mut rng).unwrap();
    let log = EventLog::new();
    let mut pipeline = gameplay_pipeline(&settings, vec![Box::new(log.clone())]).unwrap();
    pipeline.validate(&world).unwrap();

    let mut outbox = Vec::new();
    let mut tick = |world: &mut World| {
        let input = TickInput::default();
        let mut ctx = StageContext {
            dt: FRAME,
            input: &input,
            rng: &mut rng,
            outbox: &mut outbox,
        };
        pipeline.run(world, &mut ctx).unwrap();
    };

    // First tick places the bat; then drop it onto the slime's head
    tick(&mut world);
    let head = world
        .get::<BodyChain>(ids.slime)
        .unwrap()
        .head_position()
        .unwrap();
    world.get_mut::<Transform>(ids.bat).unwrap().position = head;
    log.take();

    tick(&mut world);
    assert_eq!(world.get::<BodyChain>(ids.slime).unwrap().len(), 2);
    assert_eq!(world.get::<RunState>(ids.run).unwrap().score, 100);

    let events = log.take();
    assert!(events.contains(&SimEvent::ScoreChanged(100)));
    assert!(events.contains(&SimEvent::Pickup(SoundCue::new("audio/collect"))));

    // Slime is right of centre, so the bat went to the left wall
    let bat = world.get::<Transform>(ids.bat).unwrap().position;
    assert_eq!(bat.x, 64.0 + 32.0);
}
