//! Engine lifecycle tests: start / stop / pause / hard pause, frame
//! scheduling, and event-driven work while paused.
//!
//! Time comes from a [`ManualClock`] so every `dt` is known exactly.

use std::cell::RefCell;
use std::rc::Rc;

use deadlands_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Records the dt of every update it receives.
struct DtProbe(Rc<RefCell<Vec<f64>>>);

impl System for DtProbe {
    fn name(&self) -> &'static str {
        "dt_probe"
    }

    fn update(&mut self, _world: &mut World, dt: f64) {
        self.0.borrow_mut().push(dt);
    }
}

fn bare_engine(clock: &ManualClock) -> (Engine, Rc<RefCell<Vec<f64>>>) {
    let mut engine = Engine::new(
        EngineConfig::default(),
        Box::new(clock.clone()),
        Box::new(NoInput),
        Box::new(NullTarget::new(800.0, 600.0)),
    )
    .unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    engine.add_system(Box::new(DtProbe(Rc::clone(&log))));
    (engine, log)
}

fn full_engine(clock: &ManualClock, target: RecordingTarget) -> Engine {
    let mut engine = Engine::new(
        EngineConfig::default(),
        Box::new(clock.clone()),
        Box::new(NoInput),
        Box::new(target),
    )
    .unwrap();
    engine.install_default_systems(Box::new(StaticImageLoader::default()));
    engine
}

fn step(engine: &mut Engine, clock: &ManualClock, dt: f64) -> bool {
    clock.advance(dt);
    engine.run_frame()
}

// ---------------------------------------------------------------------------
// 1. Scheduling
// ---------------------------------------------------------------------------

#[test]
fn stop_cancels_pending_frame() {
    let clock = ManualClock::new();
    let (mut engine, log) = bare_engine(&clock);
    assert!(!engine.has_pending_frame());

    engine.start();
    assert!(engine.has_pending_frame());
    assert!(step(&mut engine, &clock, 0.016));
    assert!(engine.has_pending_frame());

    engine.stop();
    assert!(!engine.has_pending_frame());
    assert!(!step(&mut engine, &clock, 0.016));
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn start_resets_the_clock() {
    let clock = ManualClock::new();
    let (mut engine, log) = bare_engine(&clock);
    clock.advance(30.0);
    engine.start();
    step(&mut engine, &clock, 0.02);
    assert!((log.borrow()[0] - 0.02).abs() < 1e-9);
}

#[test]
fn systems_run_in_registration_order() {
    let clock = ManualClock::new();
    let engine = full_engine(&clock, RecordingTarget::new(800.0, 600.0));
    assert_eq!(
        engine.system_names(),
        vec![
            "map_generation",
            "sprite_loader",
            "player_control",
            "spawn",
            "ai",
            "enemy_ranged_attack",
            "effect",
            "movement",
            "projectile",
            "collision",
            "damage",
            "experience",
            "progression",
            "despawn",
            "animation",
            "camera",
        ]
    );
}

// ---------------------------------------------------------------------------
// 2. Pause
// ---------------------------------------------------------------------------

#[test]
fn paused_time_is_not_simulated() {
    let clock = ManualClock::new();
    let (mut engine, log) = bare_engine(&clock);
    engine.start();
    step(&mut engine, &clock, 0.016);

    engine.pause();
    for _ in 0..5 {
        assert!(step(&mut engine, &clock, 2.0));
    }
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(engine.last_diagnostics().dt, 0.0);

    engine.resume();
    step(&mut engine, &clock, 0.03);
    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert!((log[1] - 0.03).abs() < 1e-9);
}

#[test]
fn paused_frames_still_render() {
    let clock = ManualClock::new();
    let target = RecordingTarget::new(800.0, 600.0);
    let mut engine = full_engine(&clock, target.clone());
    engine.start();
    step(&mut engine, &clock, 0.016);
    engine.pause();
    step(&mut engine, &clock, 0.016);
    step(&mut engine, &clock, 0.016);
    assert_eq!(target.frame_count(), 3);
}

// ---------------------------------------------------------------------------
// 3. Hard pause
// ---------------------------------------------------------------------------

#[test]
fn player_killed_locks_the_engine() {
    let clock = ManualClock::new();
    let (mut engine, log) = bare_engine(&clock);
    engine.start();
    let player = engine.world().player().unwrap();

    engine.publish(GameEvent::PlayerKilled(PlayerKilled {
        entity: player,
        source_id: None,
    }));
    assert!(engine.is_hard_paused());
    assert_eq!(engine.state(), EngineState::HardPaused);
    assert!(engine.is_paused());

    engine.resume();
    engine.toggle_pause();
    assert_eq!(engine.state(), EngineState::HardPaused);
    step(&mut engine, &clock, 0.016);
    step(&mut engine, &clock, 0.016);
    assert!(log.borrow().is_empty());
    assert!(engine.has_pending_frame());

    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
    engine.start();
    assert!(!engine.is_hard_paused());
    assert_eq!(engine.state(), EngineState::Running);
    step(&mut engine, &clock, 0.016);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn lethal_melee_hard_pauses_and_restart_respawns() {
    let clock = ManualClock::new();
    let mut engine = full_engine(&clock, RecordingTarget::new(800.0, 600.0));
    engine.start();
    let player = engine.world().player().unwrap();
    let at = *engine.world().get::<Position>(player).unwrap();

    let walker = engine.config().settings.variant("walker").unwrap().clone();
    let world = engine.world_mut();
    world.get_mut::<Health>(player).unwrap().hp = 1.0;
    world.add_entity(deadlands_engine::factory::zombie(
        &walker,
        1,
        Position::new(at.x + 5.0, at.y),
    ));

    step(&mut engine, &clock, 0.016);
    assert!(engine.is_hard_paused());
    assert!(engine.world().contains(player));
    assert_eq!(engine.world().get::<Health>(player).unwrap().hp, 0.0);

    engine.stop();
    engine.start();
    let fresh = engine.world().player().unwrap();
    assert_ne!(fresh, player);
    assert!(!engine.world().contains(player));
    assert!(engine.world().get::<Health>(fresh).unwrap().hp > 0.0);
}

// ---------------------------------------------------------------------------
// 4. Events
// ---------------------------------------------------------------------------

#[test]
fn bonus_selection_lands_while_paused() {
    let clock = ManualClock::new();
    let mut engine = full_engine(&clock, RecordingTarget::new(800.0, 600.0));
    engine.start();
    let player = engine.world().player().unwrap();

    let catalogs = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&catalogs);
    engine.bus().on(Topic::LevelUpRewardsAvailable, move |event| {
        if let GameEvent::LevelUpRewardsAvailable(rewards) = event {
            seen.borrow_mut().push(rewards.pending);
        }
    });

    engine
        .publish_json("xpCollected", serde_json::json!({ "amount": 250 }))
        .unwrap();
    step(&mut engine, &clock, 0.016);
    assert_eq!(engine.world().get::<Experience>(player).unwrap().level, 3);
    assert_eq!(*catalogs.borrow(), vec![2]);

    engine.pause();
    let before = engine.world().get::<Attack>(player).unwrap().damage;
    engine
        .publish_json("passiveBonusSelected", serde_json::json!({ "bonus": "damage" }))
        .unwrap();
    let after = engine.world().get::<Attack>(player).unwrap().damage;
    assert_eq!(after, before + PassiveBonusKind::Damage.step());
    assert!(engine.is_paused());
}

#[test]
fn malformed_external_payloads_are_rejected() {
    let clock = ManualClock::new();
    let mut engine = full_engine(&clock, RecordingTarget::new(800.0, 600.0));
    assert!(matches!(
        engine.publish_json("noSuchTopic", serde_json::json!({})),
        Err(EventError::UnknownTopic { .. })
    ));
    assert!(matches!(
        engine.publish_json("xpCollected", serde_json::json!({ "amount": "lots" })),
        Err(EventError::MalformedPayload { .. })
    ));
}

#[test]
fn render_frames_follow_the_player() {
    let clock = ManualClock::new();
    let target = RecordingTarget::new(800.0, 600.0);
    let mut engine = full_engine(&clock, target.clone());
    engine.start();
    step(&mut engine, &clock, 0.016);

    let frame = target.last_frame().unwrap();
    assert!(frame.camera.initialized);
    assert!(!frame.tiles.is_empty());
    let player = engine.world().player().unwrap();
    assert!(frame.sprites.iter().any(|s| s.entity == player));
    assert!(frame
        .sprites
        .windows(2)
        .all(|pair| pair[0].z_index <= pair[1].z_index));
}
