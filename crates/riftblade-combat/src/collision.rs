//! Per-tick hit resolution between actors.

use riftblade_common::{EntityId, Vec2};
use tracing::{debug, info};

use crate::actor::{Brain, Combatant, EnemyActor, PlayerActor};
use crate::buff::BuffStat;
use crate::context::CombatContext;
use crate::events::CombatEvent;
use crate::hitbox::{HitEffect, HitResult};
use crate::progress::ProgressTracker;
use crate::skill_system::HitSource;

/// Counters for one resolve pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolveStats {
    /// Hits that landed
    pub hits: u32,
    /// Damage applied
    pub damage: f32,
    /// Enemies defeated this pass
    pub enemies_defeated: u32,
}

/// Applies hits from player hitboxes to enemies and from enemy hitboxes to
/// the player.
///
/// Basic attacks deal their fixed damage; skills and projectiles are scaled
/// by the attacker's damage buff. Incoming damage is divided by the
/// target's defense buff. Invincible targets take nothing.
#[derive(Debug, Clone, Default)]
pub struct CombatCollisionResolver {
    total: ResolveStats,
}

impl CombatCollisionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals across every pass.
    #[must_use]
    pub fn totals(&self) -> ResolveStats {
        self.total
    }

    /// Runs one pass.
    pub fn resolve(
        &mut self,
        player: &mut PlayerActor,
        enemies: &mut [EnemyActor],
        progress: &mut ProgressTracker,
        ctx: &mut CombatContext<'_>,
    ) -> ResolveStats {
        let mut stats = ResolveStats::default();

        if player.combatant.is_alive() {
            let multiplier = player.combatant.buffs.multiplier(BuffStat::Damage);
            for enemy in enemies.iter_mut() {
                if !enemy.combatant.is_alive() {
                    continue;
                }
                let Some(bounds) = ctx.physics.bounds(enemy.id()) else {
                    continue;
                };
                let hits = player
                    .skills
                    .executor_mut()
                    .check_hits(enemy.id(), bounds, ctx);
                for (source, hit) in hits {
                    let applied =
                        apply_hit(player.id(), &mut enemy.combatant, &hit, scale(source, multiplier), ctx);
                    if applied > 0.0 {
                        stats.hits += 1;
                        stats.damage += applied;
                        progress.record_damage_dealt(applied);
                    }
                    if !enemy.combatant.is_alive() {
                        if defeat_enemy(enemy, progress, ctx) {
                            stats.enemies_defeated += 1;
                        }
                        if !enemy.combatant.is_alive() {
                            break;
                        }
                    }
                }
            }
        }

        for enemy in enemies.iter_mut() {
            if !enemy.combatant.is_alive() || !player.combatant.is_alive() {
                continue;
            }
            let Some(bounds) = ctx.physics.bounds(player.id()) else {
                break;
            };
            let multiplier = enemy.combatant.buffs.multiplier(BuffStat::Damage);
            let hits = enemy
                .skills
                .executor_mut()
                .check_hits(player.id(), bounds, ctx);
            for (source, hit) in hits {
                let applied =
                    apply_hit(enemy.id(), &mut player.combatant, &hit, scale(source, multiplier), ctx);
                if applied > 0.0 {
                    stats.hits += 1;
                    stats.damage += applied;
                    progress.record_damage_taken(applied);
                }
                if !player.combatant.is_alive() {
                    defeat_player(player, progress, ctx);
                    break;
                }
            }
        }

        self.total.hits += stats.hits;
        self.total.damage += stats.damage;
        self.total.enemies_defeated += stats.enemies_defeated;
        stats
    }
}

fn scale(source: HitSource, multiplier: f32) -> f32 {
    match source {
        HitSource::Basic => 1.0,
        HitSource::Skill(_) | HitSource::Projectile => multiplier,
    }
}

/// Applies one hit. Returns the damage actually taken.
fn apply_hit(
    attacker: EntityId,
    target: &mut Combatant,
    hit: &HitResult,
    multiplier: f32,
    ctx: &mut CombatContext<'_>,
) -> f32 {
    if !target.is_alive() || target.invincible {
        return 0.0;
    }
    let defense = target.buffs.multiplier(BuffStat::Defense).max(f32::EPSILON);
    let applied = target.vitals.take_damage(hit.damage * multiplier / defense);

    if hit.knockback != Vec2::ZERO {
        ctx.physics.set_velocity(target.id, hit.knockback);
    }
    let now = ctx.now_ms();
    for effect in &hit.effects {
        match *effect {
            HitEffect::Stun { duration_ms } => target.stun(now, duration_ms),
            HitEffect::Slow {
                multiplier,
                duration_ms,
            } => {
                target.buffs.apply(
                    target.id,
                    BuffStat::MoveSpeed,
                    multiplier,
                    duration_ms,
                    ctx.scheduler,
                );
            }
        }
    }

    debug!(%attacker, target = %target.id, damage = applied, "hit");
    ctx.events.publish(CombatEvent::Hit {
        attacker,
        target: target.id,
        damage: applied,
        knockback: hit.knockback,
        effects: hit.effects.clone(),
    });
    applied
}

/// Handles an enemy whose health reached zero. Bosses with phases left
/// come back instead. Returns `true` if the enemy is now defeated.
fn defeat_enemy(
    enemy: &mut EnemyActor,
    progress: &mut ProgressTracker,
    ctx: &mut CombatContext<'_>,
) -> bool {
    if let Brain::Boss(boss) = &mut enemy.brain {
        if boss.on_phase_change(&mut enemy.combatant, ctx) {
            return false;
        }
    }
    enemy.skills.interrupt(&mut enemy.combatant, ctx);
    enemy.combatant.state.kill(ctx);
    ctx.physics.set_velocity_x(enemy.id(), 0.0);
    if enemy.claim_reward() {
        let exp_reward = enemy.exp_reward();
        progress.record_kill(&enemy.combatant.def_id, exp_reward);
        info!(enemy = %enemy.id(), exp_reward, "enemy defeated");
        ctx.events.publish(CombatEvent::EnemyDefeated {
            enemy: enemy.id(),
            exp_reward,
        });
    }
    true
}

fn defeat_player(player: &mut PlayerActor, progress: &mut ProgressTracker, ctx: &mut CombatContext<'_>) {
    player.skills.interrupt(&mut player.combatant, ctx);
    player.combatant.state.kill(ctx);
    ctx.physics.set_velocity_x(player.id(), 0.0);
    progress.record_player_defeat();
    info!(player = %player.id(), "player defeated");
    ctx.events.publish(CombatEvent::PlayerDefeated {
        player: player.id(),
    });
}
