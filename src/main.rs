//! Slime Sim headless entry point
//!
//! Loads settings, runs one round with a scripted autopilot at a fixed
//! frame rate and prints the final score. Useful for soak runs and for
//! checking that a seed replays the same way.

use std::time::Duration;

use glam::Vec2;

use slime_sim::consts::{FRAME_DT, SLIME_RADIUS_FACTOR};
use slime_sim::sim::{BodyChain, Direction, FrameClock, Round, SimEvent, SimObserver, TickInput};
use slime_sim::{Settings, SimError};

/// Default settings file, overridable by the first argument
const SETTINGS_PATH: &str = "slime-sim.json";
/// Give up after this much simulated time
const MAX_SECONDS: u32 = 180;

/// Chase the bat, never reverse, never steer into a wall
fn autopilot(round: &Round) -> TickInput {
    let settings = round.settings();
    let chain = round
        .world()
        .try_get::<BodyChain>(round.entities().slime);
    let (Some(chain), Some(bat), Some(room)) = (chain, round.bat_position(), round.room()) else {
        return TickInput::default();
    };
    let (Some(head), Some(heading)) = (chain.head(), chain.last_accepted_direction()) else {
        return TickInput::default();
    };

    let half = Vec2::splat(settings.slime_size * 0.5);
    let reach = settings.slime_size * SLIME_RADIUS_FACTOR;
    let safe = room.deflate(reach, reach);
    // Where the head will be once the current step lands
    let landing = head.to + half;
    let to_bat = bat - head.to;

    let mut options = Direction::PRIORITY;
    options.sort_by(|a, b| {
        b.vector()
            .dot(to_bat)
            .total_cmp(&a.vector().dot(to_bat))
    });

    let choice = options.into_iter().find(|dir| {
        let v = dir.vector();
        v.dot(heading) >= 0.0 && safe.contains(landing + v * chain.stride)
    });

    match choice {
        Some(dir) if dir.vector() != heading => TickInput::steer(dir),
        _ => TickInput::default(),
    }
}

fn run(settings: Settings) -> Result<u32, SimError> {
    let observer: Box<dyn SimObserver> = Box::new(|event: &SimEvent| match event {
        SimEvent::Bounce(cue) => log::debug!("play {}", cue.name()),
        SimEvent::Pickup(cue) => log::info!("play {}", cue.name()),
        SimEvent::ScoreChanged(score) => log::info!("Score: {score}"),
        SimEvent::GameOver => log::info!("Game over"),
    });
    let mut round = Round::new(settings, vec![observer])?;

    let step = Duration::from_secs_f32(FRAME_DT);
    let mut clock = FrameClock::new(step);
    let max_frames = MAX_SECONDS * (1.0 / FRAME_DT).round() as u32;

    for _ in 0..max_frames {
        for _ in 0..clock.advance(step) {
            let input = autopilot(&round);
            round.tick(&input, clock.step())?;
        }
        if round.is_over() {
            break;
        }
    }

    log::info!(
        "Finished after {} ticks, slime length {}",
        round.ticks(),
        round.slime_len()
    );
    Ok(round.score())
}

fn main() {
    env_logger::init();
    log::info!("Slime Sim (headless) starting...");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SETTINGS_PATH.to_string());
    let settings = Settings::load_or_default(&path);
    log::info!("Seed: {:#x}", settings.seed);

    match run(settings) {
        Ok(score) => println!("Final score: {score}"),
        Err(e) => {
            log::error!("Round aborted: {e}");
            std::process::exit(1);
        }
    }
}
