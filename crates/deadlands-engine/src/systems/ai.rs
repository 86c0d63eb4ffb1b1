//! Enemy state machine.

use deadlands_ecs::component::ComponentKind;
use deadlands_ecs::components::{Ai, AiState, Attack, Enemy, Health, Position, Velocity};
use deadlands_ecs::world::World;

use super::{queue_damage, System};

/// Next state for an enemy at `distance` from its target.
///
/// `Dead` is terminal. Otherwise a non-positive `hp` kills, and the ranges
/// pick idle (`distance > aggro`), attack (`distance <= attack`) or chase.
/// An enemy at exactly its aggro range is still chasing.
pub fn next_state(current: AiState, hp: f64, distance: f64, enemy: &Enemy) -> AiState {
    if current == AiState::Dead || hp <= 0.0 {
        AiState::Dead
    } else if distance > enemy.aggro_range {
        AiState::Idle
    } else if distance <= enemy.attack_range {
        AiState::Attack
    } else {
        AiState::Chase
    }
}

/// Drives every enemy toward the player.
///
/// Chasing enemies get a velocity of `enemy.speed` toward the player; idle,
/// attacking and dead ones stand still. An attacking enemy with an
/// [`Attack`] hits the player each time its cooldown elapses. Nothing happens
/// while there is no player.
#[derive(Debug, Default)]
pub struct AiSystem;

impl AiSystem {
    pub const NAME: &'static str = "ai";

    pub fn new() -> Self {
        Self
    }
}

impl System for AiSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let Some(player) = world.player() else {
            return;
        };
        let Some(target) = world.get::<Position>(player).copied() else {
            return;
        };
        let player_alive = world.get::<Health>(player).map_or(false, |h| h.hp > 0.0);

        let enemies = world.query(&[
            ComponentKind::Ai,
            ComponentKind::Position,
            ComponentKind::Velocity,
            ComponentKind::Health,
            ComponentKind::Enemy,
        ]);

        for id in enemies {
            let stores = world.stores_mut();
            let (Some(ai), Some(pos), Some(health), Some(enemy)) = (
                stores.ai.get(id).copied(),
                stores.position.get(id).copied(),
                stores.health.get(id).copied(),
                stores.enemy.get(id),
            ) else {
                tracing::warn!(entity = %id, "enemy lost a component mid-pass");
                continue;
            };
            let state = next_state(ai.state, health.hp, pos.distance(&target), enemy);
            let velocity = match state {
                AiState::Chase => Velocity::toward(&pos, &target, enemy.speed),
                AiState::Idle | AiState::Attack | AiState::Dead => Velocity::ZERO,
            };

            if state != ai.state {
                tracing::debug!(entity = %id, from = ?ai.state, to = ?state, "ai transition");
            }
            if let Some(ai) = stores.ai.get_mut(id) {
                ai.state = state;
            }
            if let Some(v) = stores.velocity.get_mut(id) {
                *v = velocity;
            }

            if state != AiState::Attack || !player_alive {
                continue;
            }
            let Some(attack) = stores.attack.get_mut(id) else {
                continue;
            };
            attack.cooldown_timer -= dt;
            if attack.cooldown_timer > 0.0 {
                continue;
            }
            attack.cooldown_timer = attack.cooldown;
            let damage = attack.damage;
            queue_damage(world, player, damage, Some(id));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory;
    use crate::settings::Settings;
    use deadlands_ecs::bus::EventBus;
    use deadlands_ecs::components::{Damage, EnemyKind};
    use deadlands_ecs::entity::EntityId;

    fn enemy(aggro: f64, attack: f64) -> Enemy {
        Enemy {
            kind: EnemyKind::Zombie,
            xp_reward: 1.0,
            damage: 1.0,
            speed: 50.0,
            aggro_range: aggro,
            attack_range: attack,
            attack_cooldown: 1.0,
        }
    }

    #[test]
    fn range_boundaries() {
        let e = enemy(100.0, 20.0);
        assert_eq!(next_state(AiState::Idle, 10.0, 100.1, &e), AiState::Idle);
        assert_eq!(next_state(AiState::Chase, 10.0, 20.0, &e), AiState::Attack);
        assert_eq!(next_state(AiState::Attack, 10.0, 20.5, &e), AiState::Chase);
    }

    #[test]
    fn exactly_chase_range_keeps_chasing() {
        let e = enemy(100.0, 20.0);
        for from in [AiState::Idle, AiState::Chase, AiState::Attack] {
            assert_eq!(next_state(from, 10.0, 100.0, &e), AiState::Chase);
        }
        assert_eq!(next_state(AiState::Chase, 10.0, 100.0 + 1e-9, &e), AiState::Idle);
    }

    #[test]
    fn dead_is_terminal() {
        let e = enemy(100.0, 20.0);
        assert_eq!(next_state(AiState::Chase, 0.0, 50.0, &e), AiState::Dead);
        assert_eq!(next_state(AiState::Dead, 10.0, 50.0, &e), AiState::Dead);
    }

    fn setup(enemy_at: Position) -> (World, EntityId, EntityId) {
        let settings = Settings::default();
        let mut world = World::new(EventBus::new());
        let player = world.add_entity(factory::player(&settings.player, Position::new(0.0, 0.0)));
        let zombie = world.add_entity(factory::zombie(
            settings.variant("walker").unwrap(),
            1,
            enemy_at,
        ));
        (world, player, zombie)
    }

    #[test]
    fn chasing_enemy_moves_toward_player() {
        let (mut world, _, zombie) = setup(Position::new(200.0, 0.0));
        AiSystem::new().update(&mut world, 0.016);
        assert_eq!(world.get::<Ai>(zombie).unwrap().state, AiState::Chase);
        let v = world.get::<Velocity>(zombie).unwrap();
        assert!(v.dx < 0.0);
        assert_eq!(v.dy, 0.0);
    }

    #[test]
    fn attacking_enemy_hits_on_cooldown() {
        let (mut world, player, zombie) = setup(Position::new(5.0, 0.0));
        let mut system = AiSystem::new();
        system.update(&mut world, 0.016);
        assert_eq!(world.get::<Ai>(zombie).unwrap().state, AiState::Attack);
        assert_eq!(world.get::<Velocity>(zombie), Some(&Velocity::ZERO));
        let hit = *world.get::<Damage>(player).unwrap();
        assert_eq!(hit.source_id, Some(zombie));

        // Cooldown is running; no second hit yet.
        system.update(&mut world, 0.016);
        assert_eq!(world.get::<Damage>(player).unwrap().amount, hit.amount);
    }

    #[test]
    fn no_player_is_a_noop() {
        let settings = Settings::default();
        let mut world = World::new(EventBus::new());
        let zombie = world.add_entity(factory::zombie(
            settings.variant("walker").unwrap(),
            1,
            Position::new(0.0, 0.0),
        ));
        AiSystem::new().update(&mut world, 0.016);
        assert_eq!(world.get::<Ai>(zombie).unwrap().state, AiState::Idle);
    }

    #[test]
    fn dead_enemy_stands_still() {
        let (mut world, _, zombie) = setup(Position::new(200.0, 0.0));
        world.get_mut::<Health>(zombie).unwrap().hp = 0.0;
        world.get_mut::<Velocity>(zombie).unwrap().dx = 30.0;
        AiSystem::new().update(&mut world, 0.016);
        assert_eq!(world.get::<Ai>(zombie).unwrap().state, AiState::Dead);
        assert_eq!(world.get::<Velocity>(zombie), Some(&Velocity::ZERO));
    }
}
