//! AI-driven skill system.
//!
//! Same mechanics as the player's [`SkillSystem`](crate::skill_system::SkillSystem),
//! but skills are picked by [`EnemySkillSystem::select_skill`] instead of key
//! bindings, and channels are held for a fixed time instead of a held key.

use riftblade_common::EntityId;
use tracing::debug;

use crate::actor::Combatant;
use crate::content::{ActorDef, CombatTuning};
use crate::context::CombatContext;
use crate::skill::{Skill, SkillError, SkillKind, SkillSlot, SkillStatus};
use crate::skill_system::SkillExecutor;

/// Channel hold time when a channeling skill has no `duration_ms`.
pub const DEFAULT_AI_CHANNEL_MS: f32 = 1500.0;

/// Skill system driven by the enemy brain.
#[derive(Debug, Clone)]
pub struct EnemySkillSystem {
    executor: SkillExecutor,
}

impl EnemySkillSystem {
    /// Builds the enemy's skills from its definition.
    #[must_use]
    pub fn new(owner: EntityId, def: &ActorDef, tuning: &CombatTuning) -> Self {
        Self {
            executor: SkillExecutor::new(owner, def, tuning),
        }
    }

    /// The executor.
    #[must_use]
    pub fn executor(&self) -> &SkillExecutor {
        &self.executor
    }

    /// Mutable executor (timer and animation routing).
    pub fn executor_mut(&mut self) -> &mut SkillExecutor {
        &mut self.executor
    }

    /// Whether a skill is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.executor.is_busy()
    }

    /// Picks the best usable skill for a target `distance` away.
    ///
    /// Candidates are off cooldown, affordable, allowed in the current ground
    /// state, within their `ai.range`, and (movement skills) no closer than
    /// their `ai.min_distance`. Highest `ai.priority` wins; ties go to the
    /// earlier slot.
    ///
    /// An unaffordable top pick falls through to the next candidate.
    #[must_use]
    pub fn select_skill(&self, distance: f32, mana: f32, grounded: bool) -> Option<SkillSlot> {
        let mut candidates: Vec<&Skill> = self
            .executor
            .skills()
            .iter()
            .filter(|skill| skill.can_use(mana, grounded))
            .filter(|skill| grounded || skill.def().air_eligible)
            .filter(|skill| in_range(skill, distance))
            .collect();
        // Stable sort keeps slot order among equal priorities.
        candidates.sort_by_key(|skill| std::cmp::Reverse(skill.def().ai.priority));
        candidates.first().map(|skill| skill.slot())
    }

    /// Uses the best skill for `distance`, if any.
    pub fn try_use_best(
        &mut self,
        distance: f32,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) -> Option<SkillSlot> {
        if self.is_busy() || actor.state.is_locked() {
            return None;
        }
        let grounded = ctx.grounded(actor.id);
        let slot = self.select_skill(distance, actor.vitals.mana, grounded)?;
        match self.executor.use_slot(slot, actor, ctx) {
            Ok(()) => Some(slot),
            Err(err) => {
                debug!(actor = %actor.id, ?slot, %err, "ai skill rejected");
                None
            }
        }
    }

    /// Uses a skill by name.
    pub fn use_skill(
        &mut self,
        name: &str,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) -> Result<(), SkillError> {
        self.executor.use_skill(name, actor, ctx)
    }

    /// Swings the basic attack.
    pub fn basic_attack(&mut self, actor: &mut Combatant, ctx: &mut CombatContext<'_>) -> bool {
        self.executor.basic_attack(actor, ctx)
    }

    /// Per-tick update. A running channel is held until its duration elapses.
    pub fn update(&mut self, delta_ms: f32, actor: &mut Combatant, ctx: &mut CombatContext<'_>) {
        let held = self.channel_held(ctx.now_ms());
        self.executor.update(delta_ms, held, actor, ctx);
    }

    fn channel_held(&self, now_ms: f64) -> bool {
        let Some(session) = self.executor.channel().session() else {
            return false;
        };
        let hold_ms = self
            .executor
            .skills()
            .get(session.skill)
            .and_then(|skill| skill.def().duration_ms)
            .unwrap_or(DEFAULT_AI_CHANNEL_MS);
        now_ms - session.started_ms < f64::from(hold_ms)
    }

    /// UI view of one skill.
    #[must_use]
    pub fn get_skill(&self, name: &str) -> Option<SkillStatus> {
        self.executor.get_skill(name)
    }

    /// UI view of every skill.
    #[must_use]
    pub fn all_skills(&self) -> Vec<SkillStatus> {
        self.executor.all_skills()
    }

    /// Cuts the active skill short.
    pub fn interrupt(&mut self, actor: &mut Combatant, ctx: &mut CombatContext<'_>) -> bool {
        self.executor.interrupt(actor, ctx)
    }

    /// Tears everything down.
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        self.executor.destroy(ctx);
    }
}

fn in_range(skill: &Skill, distance: f32) -> bool {
    let ai = skill.def().ai;
    if ai.range.is_some_and(|range| distance > range) {
        return false;
    }
    match skill.def().kind {
        SkillKind::Movement { .. } => ai.min_distance.map_or(true, |min| distance >= min),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use riftblade_common::Vec2;

    use super::*;
    use crate::content::{ActorRole, BasicAttackDef};
    use crate::hitbox::{HitboxConfig, HitboxShape};
    use crate::skill::{AiHints, SkillDef};

    fn melee(name: &str, range: f32, priority: i32) -> SkillDef {
        let hitbox = HitboxConfig::new(HitboxShape::new(40.0, 30.0), 10.0);
        SkillDef::new(
            name,
            SkillKind::Melee {
                hitbox,
                hitbox_delay_ms: 0.0,
            },
            1000.0,
        )
        .with_ai(AiHints {
            range: Some(range),
            priority,
            min_distance: None,
        })
    }

    fn dash(min_distance: f32, priority: i32) -> SkillDef {
        SkillDef::new(
            "dash",
            SkillKind::Movement {
                velocity: Vec2::new(600.0, 0.0),
                invincible: false,
                hitbox: None,
            },
            2000.0,
        )
        .with_duration(200.0)
        .with_ai(AiHints {
            range: Some(400.0),
            priority,
            min_distance: Some(min_distance),
        })
    }

    fn def(skills: Vec<SkillDef>) -> ActorDef {
        let mut def = ActorDef::new(
            "brute",
            ActorRole::Enemy,
            100.0,
            BasicAttackDef::new(5.0, 800.0, HitboxShape::new(30.0, 30.0)),
        );
        def.skills = skills;
        def
    }

    fn system(skills: Vec<SkillDef>) -> EnemySkillSystem {
        EnemySkillSystem::new(EntityId::new(), &def(skills), &CombatTuning::default())
    }

    #[test]
    fn test_highest_priority_in_range_wins() {
        let sys = system(vec![melee("jab", 60.0, 1), melee("slam", 80.0, 5)]);
        assert_eq!(sys.select_skill(50.0, 0.0, true), Some(SkillSlot::from_index(1)));
        // Only "jab" is out of range here; "slam" still reaches.
        assert_eq!(sys.select_skill(70.0, 0.0, true), Some(SkillSlot::from_index(1)));
        assert_eq!(sys.select_skill(90.0, 0.0, true), None);
    }

    #[test]
    fn test_equal_priority_keeps_slot_order() {
        let sys = system(vec![melee("a", 100.0, 2), melee("b", 100.0, 2)]);
        assert_eq!(sys.select_skill(10.0, 0.0, true), Some(SkillSlot::from_index(0)));
    }

    #[test]
    fn test_movement_respects_min_distance() {
        let sys = system(vec![dash(150.0, 9), melee("jab", 60.0, 1)]);
        assert_eq!(sys.select_skill(50.0, 0.0, true), Some(SkillSlot::from_index(1)));
        assert_eq!(sys.select_skill(200.0, 0.0, true), Some(SkillSlot::from_index(0)));
    }

    #[test]
    fn test_grounded_only_skill_skipped_in_air() {
        let sys = system(vec![melee("jab", 60.0, 1).grounded_only()]);
        assert_eq!(sys.select_skill(10.0, 0.0, false), None);
    }

    #[test]
    fn test_unaffordable_pick_falls_through() {
        let sys = system(vec![
            melee("jab", 60.0, 1),
            melee("slam", 60.0, 5).with_mana_cost(30.0),
        ]);
        assert_eq!(sys.select_skill(10.0, 20.0, true), Some(SkillSlot::from_index(0)));
        assert_eq!(sys.select_skill(10.0, 30.0, true), Some(SkillSlot::from_index(1)));
    }
}
