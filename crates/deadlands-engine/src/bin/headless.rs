//! Runs the simulation without a display and prints a JSON summary.
//!
//! ```text
//! deadlands-headless [--config PATH] [--frames N] [--seed N] [--fps N] [--autopilot]
//! ```
//!
//! Time advances by a fixed `1 / fps` per frame through a manual clock, so a
//! run is reproducible for a given config and seed. `--autopilot` holds a
//! movement key and the fire key; otherwise nothing is pressed and the player
//! relies on auto-fire.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deadlands_engine::prelude::*;

struct Args {
    config: Option<String>,
    frames: u64,
    seed: Option<u64>,
    fps: f64,
    autopilot: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        frames: 3_600,
        seed: None,
        fps: 60.0,
        autopilot: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().with_context(|| format!("{flag} needs a value"));
        match flag.as_str() {
            "--config" => args.config = Some(value()?),
            "--frames" => args.frames = value()?.parse().context("--frames")?,
            "--seed" => args.seed = Some(value()?.parse().context("--seed")?),
            "--fps" => args.fps = value()?.parse().context("--fps")?,
            "--autopilot" => args.autopilot = true,
            other => bail!("unknown argument {other:?}"),
        }
    }
    if !(args.fps > 0.0 && args.fps.is_finite()) {
        bail!("--fps must be positive, got {}", args.fps);
    }
    Ok(args)
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    frames: u64,
    simulated_seconds: f64,
    entities: usize,
    enemies_killed: u64,
    bosses_spawned: u64,
    level: u32,
    player_hp: f64,
    player_killed: bool,
    bonuses_applied: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_path(path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let clock = ManualClock::new();
    let keys = ScriptedInput::new();
    if args.autopilot {
        keys.press(Key::D);
        keys.press(Key::Fire);
    }
    let mut engine = Engine::new(
        config,
        Box::new(clock.clone()),
        Box::new(keys),
        Box::new(NullTarget::new(1280.0, 720.0)),
    )?;
    engine.install_default_systems(Box::new(StaticImageLoader::default()));

    let summary = Rc::new(RefCell::new(Summary::default()));
    let tally = Rc::clone(&summary);
    let bus = engine.bus().clone();
    for topic in [
        Topic::EnemyKilled,
        Topic::BossSpawned,
        Topic::PlayerLevelUp,
        Topic::PlayerKilled,
        Topic::PassiveBonusApplied,
        Topic::LevelUpRewardsAvailable,
    ] {
        let tally = Rc::clone(&tally);
        let selector = bus.clone();
        bus.on(topic, move |event| {
            let mut s = tally.borrow_mut();
            match event {
                GameEvent::EnemyKilled(_) => s.enemies_killed += 1,
                GameEvent::BossSpawned(_) => s.bosses_spawned += 1,
                GameEvent::PlayerLevelUp(up) => s.level = up.level,
                GameEvent::PlayerKilled(_) => s.player_killed = true,
                GameEvent::PassiveBonusApplied(_) => s.bonuses_applied += 1,
                // Take the first bonus still on offer.
                GameEvent::LevelUpRewardsAvailable(rewards) => {
                    if let Some(choice) = rewards.choices.iter().find(|c| c.available) {
                        selector.emit(GameEvent::PassiveBonusSelected(PassiveBonusSelected {
                            entity: Some(rewards.entity),
                            bonus: Some(choice.bonus),
                        }));
                    }
                }
                _ => {}
            }
        });
    }

    engine.start();
    let step = 1.0 / args.fps;
    info!(frames = args.frames, step, "running headless");
    for _ in 0..args.frames {
        clock.advance(step);
        if !engine.run_frame() || engine.is_hard_paused() {
            break;
        }
    }

    let mut summary = summary.take();
    summary.frames = engine.frame_count();
    summary.simulated_seconds = engine.frame_count() as f64 * step;
    summary.entities = engine.world().entity_count();
    if let Some(player) = engine.world().player() {
        summary.player_hp = engine.world().get::<Health>(player).map_or(0.0, |h| h.hp);
        summary.level = engine
            .world()
            .get::<Experience>(player)
            .map_or(summary.level, |xp| xp.level);
    }
    engine.shutdown();

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
