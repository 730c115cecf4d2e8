//! Per-actor skill orchestration.
//!
//! [`SkillExecutor`] couples the skills of one actor to its state machine,
//! hitboxes, channel and projectiles. [`SkillSystem`] wraps it for the player
//! (key bindings, held channel key); the AI variant lives in
//! `enemy_skill_system`.
//!
//! A used skill completes on exactly one of:
//! - the animation it started completing or being stopped (matched on key
//!   *and* playback, so a stale signal from an earlier use is ignored)
//! - its fixed `duration_ms` elapsing, when it has no animation
//! - a fallback timer, when neither of the above can happen
//! - the channel ending
//! - an explicit interrupt
//!
//! Completion is idempotent; the cooldown starts on the first one.

use std::collections::BTreeMap;

use riftblade_common::{EntityId, Facing, Rect, Vec2};
use tracing::{debug, warn};

use crate::actor::Combatant;
use crate::channeling::ChannelingManager;
use crate::content::{ActorDef, BasicAttackDef, CombatTuning};
use crate::context::CombatContext;
use crate::events::{ChannelStopReason, CombatEvent};
use crate::hitbox::{HitResult, Hitbox, HitboxConfig, HitboxSlot};
use crate::input::{CombatInput, CombatKey};
use crate::projectile::Projectile;
use crate::renderer::{AnimationSignal, EffectKind, PlaybackId, VisualEffect};
use crate::scheduler::{CombatTimer, TimerHandle, TimerKind};
use crate::skill::{Skill, SkillDef, SkillError, SkillKind, SkillSet, SkillSlot, SkillStatus};
use crate::state_machine::{ActorState, AnimationRequest};

/// Runtime basic attack.
#[derive(Debug, Clone)]
pub struct BasicAttack {
    def: BasicAttackDef,
    hitbox: Hitbox,
    cooldown_remaining_ms: f32,
    activation: u64,
}

impl BasicAttack {
    fn new(owner: EntityId, def: BasicAttackDef) -> Self {
        let hitbox = Hitbox::new(owner, HitboxSlot::Basic, def.hitbox_config());
        Self {
            def,
            hitbox,
            cooldown_remaining_ms: 0.0,
            activation: 0,
        }
    }

    /// Remaining cooldown.
    #[must_use]
    pub fn cooldown_remaining_ms(&self) -> f32 {
        self.cooldown_remaining_ms
    }

    /// The attack's hitbox.
    #[must_use]
    pub fn hitbox(&self) -> &Hitbox {
        &self.hitbox
    }

    /// Fixed damage per hit.
    #[must_use]
    pub fn damage(&self) -> f32 {
        self.def.damage
    }
}

/// Where a hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitSource {
    /// Basic attack (fixed damage)
    Basic,
    /// A skill's hitbox
    Skill(SkillSlot),
    /// A projectile
    Projectile,
}

#[derive(Debug, Clone)]
struct ActiveSkill {
    slot: SkillSlot,
    activation: u64,
    animation: Option<(String, PlaybackId)>,
    restore: Option<String>,
    timers: Vec<TimerHandle>,
}

/// Skill mechanics shared by player and AI.
#[derive(Debug, Clone)]
pub struct SkillExecutor {
    owner: EntityId,
    skills: SkillSet,
    hitboxes: BTreeMap<SkillSlot, Hitbox>,
    basic: BasicAttack,
    channel: ChannelingManager,
    projectiles: Vec<Projectile>,
    active: Option<ActiveSkill>,
}

impl SkillExecutor {
    /// Builds skills and hitboxes from the actor's definition.
    #[must_use]
    pub fn new(owner: EntityId, def: &ActorDef, tuning: &CombatTuning) -> Self {
        let skills = SkillSet::from_defs(&def.skills);
        let hitboxes = skills
            .iter()
            .filter_map(|skill| {
                skill.def().kind.hitbox().map(|config| {
                    let hitbox = Hitbox::new(owner, HitboxSlot::Skill(skill.slot()), config.clone())
                        .with_grace(tuning.sequence_grace_ms);
                    (skill.slot(), hitbox)
                })
            })
            .collect();
        Self {
            owner,
            skills,
            hitboxes,
            basic: BasicAttack::new(owner, def.basic_attack.clone()),
            channel: ChannelingManager::new(owner),
            projectiles: Vec::new(),
            active: None,
        }
    }

    /// Owning actor.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// The skills.
    #[must_use]
    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    /// The basic attack.
    #[must_use]
    pub fn basic(&self) -> &BasicAttack {
        &self.basic
    }

    /// The channel manager.
    #[must_use]
    pub fn channel(&self) -> &ChannelingManager {
        &self.channel
    }

    /// Hitbox of a skill.
    #[must_use]
    pub fn hitbox(&self, slot: SkillSlot) -> Option<&Hitbox> {
        self.hitboxes.get(&slot)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// The skill currently in use.
    #[must_use]
    pub fn active_skill(&self) -> Option<&Skill> {
        self.active.as_ref().and_then(|a| self.skills.get(a.slot))
    }

    /// Whether a skill is in use.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// UI view of one skill.
    #[must_use]
    pub fn get_skill(&self, name: &str) -> Option<SkillStatus> {
        self.skills.by_name(name).map(Skill::status)
    }

    /// UI view of every skill, in slot order.
    #[must_use]
    pub fn all_skills(&self) -> Vec<SkillStatus> {
        self.skills.iter().map(Skill::status).collect()
    }

    /// Uses a skill by name.
    ///
    /// Unknown names log a warning. Every rejection leaves the actor
    /// untouched.
    pub fn use_skill(
        &mut self,
        name: &str,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) -> Result<(), SkillError> {
        let Some(slot) = self.skills.slot_of(name) else {
            warn!(actor = %self.owner, skill = name, "unknown skill");
            return Err(SkillError::UnknownSkill(name.to_string()));
        };
        self.use_slot(slot, actor, ctx)
    }

    /// Uses the skill in `slot`.
    pub fn use_slot(
        &mut self,
        slot: SkillSlot,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) -> Result<(), SkillError> {
        if !actor.is_alive() {
            return Err(SkillError::Defeated);
        }
        let Some(skill) = self.skills.get(slot) else {
            return Err(SkillError::UnknownSkill(format!("#{}", slot.index())));
        };
        let def = skill.def().clone();
        let grounded = ctx.grounded(self.owner);

        if !grounded && !def.air_eligible {
            return Err(SkillError::NotAirEligible);
        }
        if let Some(locked) = actor.state.lock().locked_state() {
            return Err(SkillError::StateLocked(locked));
        }
        if self.active.is_some() {
            return Err(SkillError::AlreadyActive);
        }

        let restore = actor.state.animation().current_key().map(str::to_owned);
        let now = ctx.now_ms();
        let activation = match self.skills.get_mut(slot) {
            Some(skill) => skill.activate(&mut actor.vitals.mana, grounded, now)?,
            None => return Err(SkillError::UnknownSkill(def.name)),
        };

        if !def.kind.is_movement() {
            ctx.physics.set_velocity_x(self.owner, 0.0);
        }

        let played = if def.kind.is_movement() {
            def.animation
                .as_deref()
                .and_then(|key| actor.state.animation_mut().play(key, def.frame_rate, ctx.renderer))
        } else {
            let request = def.animation.as_deref().map(|key| AnimationRequest {
                key,
                frame_rate: def.frame_rate,
            });
            let transition = actor.state.enter(def.state, request, ctx);
            if transition.is_none() {
                warn!(actor = %self.owner, skill = %def.name, state = ?def.state, "skill state transition rejected");
            }
            if let Some(duration) = def.duration_ms {
                actor.state.override_lock_duration(duration, ctx);
            }
            transition.and_then(|t| t.animation)
        };

        let channeling = matches!(def.kind, SkillKind::Channeling { .. });
        let hook = played
            .filter(|p| p.duration_ms.is_some() && !channeling)
            .map(|p| (p.key, p.playback));

        self.active = Some(ActiveSkill {
            slot,
            activation,
            animation: hook,
            restore,
            timers: Vec::new(),
        });

        let duration_driven = self.skills.get(slot).is_some_and(Skill::is_duration_driven);
        let needs_fallback = self
            .active
            .as_ref()
            .is_some_and(|a| a.animation.is_none())
            && !duration_driven
            && !channeling;
        if needs_fallback {
            let delay = def
                .duration_ms
                .or_else(|| actor.state.max_lock_ms(def.state))
                .unwrap_or(0.0);
            self.schedule_for_active(
                delay,
                TimerKind::SkillFallbackComplete {
                    skill: slot,
                    activation,
                },
                ctx,
            );
        }

        self.dispatch(&def, slot, activation, actor, ctx);

        debug!(actor = %self.owner, skill = %def.name, kind = def.kind.name(), "skill used");
        ctx.events.publish(CombatEvent::SkillUsed {
            actor: self.owner,
            skill: def.name,
        });
        Ok(())
    }

    fn dispatch(
        &mut self,
        def: &SkillDef,
        slot: SkillSlot,
        activation: u64,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) {
        match &def.kind {
            SkillKind::Melee {
                hitbox_delay_ms, ..
            }
            | SkillKind::Instant {
                hitbox: Some(_),
                hitbox_delay_ms,
            } => {
                self.schedule_for_active(
                    *hitbox_delay_ms,
                    TimerKind::HitboxActivate {
                        slot: HitboxSlot::Skill(slot),
                        activation,
                    },
                    ctx,
                );
            }
            SkillKind::Instant { hitbox: None, .. } => {}
            SkillKind::Projectile {
                launch_delay_ms, ..
            } => {
                self.schedule_for_active(
                    *launch_delay_ms,
                    TimerKind::ProjectileLaunch {
                        skill: slot,
                        activation,
                    },
                    ctx,
                );
            }
            SkillKind::Movement {
                velocity,
                invincible,
                ..
            } => {
                let facing = ctx.physics.facing(self.owner);
                ctx.physics
                    .set_velocity(self.owner, Vec2::new(velocity.x * facing.sign(), velocity.y));
                actor.invincible = *invincible;
                if let Some(hitbox) = self.hitboxes.get_mut(&slot) {
                    hitbox.activate(ctx);
                }
                self.schedule_for_active(
                    def.duration_ms.unwrap_or(0.0),
                    TimerKind::MovementEnd {
                        skill: slot,
                        activation,
                    },
                    ctx,
                );
            }
            SkillKind::Channeling { .. } => {
                self.channel.start(slot, ctx.now_ms());
                if let Some(hitbox) = self.hitboxes.get_mut(&slot) {
                    hitbox.activate(ctx);
                }
            }
            SkillKind::Aoe { hitbox, warning_ms } => match warning_ms {
                Some(warning) if *warning > 0.0 => {
                    let area = self.placed_area(hitbox, ctx);
                    ctx.renderer.spawn_effect(VisualEffect {
                        owner: self.owner,
                        kind: EffectKind::AoeWarning,
                        area,
                        duration_ms: *warning,
                    });
                    self.schedule_for_active(
                        *warning,
                        TimerKind::AoeDetonate {
                            skill: slot,
                            activation,
                        },
                        ctx,
                    );
                }
                _ => self.detonate(slot, ctx),
            },
            SkillKind::Buff {
                stat,
                multiplier,
                duration_ms,
            } => {
                actor
                    .buffs
                    .apply(self.owner, *stat, *multiplier, *duration_ms, ctx.scheduler);
            }
        }
    }

    /// Swings the basic attack: `Attack` on the ground, `AirAttack` in the air.
    ///
    /// Returns `false` while cooling down, busy, locked or dead.
    pub fn basic_attack(&mut self, actor: &mut Combatant, ctx: &mut CombatContext<'_>) -> bool {
        if !actor.is_alive()
            || self.basic.cooldown_remaining_ms > 0.0
            || self.active.is_some()
            || actor.state.is_locked()
        {
            return false;
        }
        let grounded = ctx.grounded(self.owner);
        let state = if grounded {
            ActorState::Attack
        } else {
            ActorState::AirAttack
        };
        if actor.state.enter(state, None, ctx).is_none() {
            return false;
        }
        if grounded {
            ctx.physics.set_velocity_x(self.owner, 0.0);
        }
        self.basic.cooldown_remaining_ms = self.basic.def.cooldown_ms;
        self.basic.activation += 1;
        ctx.scheduler.schedule_once(
            self.basic.def.hitbox_delay_ms,
            CombatTimer::new(
                self.owner,
                TimerKind::HitboxActivate {
                    slot: HitboxSlot::Basic,
                    activation: self.basic.activation,
                },
            ),
        );
        true
    }

    /// Handles a fired timer addressed to this actor.
    ///
    /// Returns `false` for timers that belong to the state machine.
    pub fn on_timer(
        &mut self,
        kind: TimerKind,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) -> bool {
        match kind {
            TimerKind::StateLockTimeout { .. } => return false,
            TimerKind::HitboxActivate {
                slot: HitboxSlot::Basic,
                activation,
            } => {
                if activation == self.basic.activation && actor.is_alive() {
                    self.basic.hitbox.activate(ctx);
                }
            }
            TimerKind::HitboxActivate {
                slot: HitboxSlot::Skill(skill),
                activation,
            } => {
                if self.is_current(skill, activation) {
                    if let Some(hitbox) = self.hitboxes.get_mut(&skill) {
                        hitbox.activate(ctx);
                    }
                }
            }
            TimerKind::HitboxDeactivate { slot, cycle } => {
                if let Some(hitbox) = self.hitbox_mut(slot) {
                    hitbox.on_deactivate_timer(cycle, ctx);
                }
            }
            TimerKind::SequenceStepSpawn { slot, cycle, step } => {
                if let Some(hitbox) = self.hitbox_mut(slot) {
                    hitbox.spawn_step(cycle, step, ctx);
                }
            }
            TimerKind::SequenceStepExpire { slot, cycle, step } => {
                if let Some(hitbox) = self.hitbox_mut(slot) {
                    hitbox.expire_step(cycle, step, ctx);
                }
            }
            TimerKind::SkillFallbackComplete { skill, activation } => {
                if self.is_active_use(skill, activation) {
                    debug!(actor = %self.owner, ?skill, "skill completed by fallback timer");
                    self.finish(actor, ctx);
                }
            }
            TimerKind::MovementEnd { skill, activation } => {
                if self.is_current(skill, activation) {
                    ctx.physics.set_velocity_x(self.owner, 0.0);
                    actor.invincible = false;
                    if self.is_active_use(skill, activation)
                        && self.active.as_ref().is_some_and(|a| a.animation.is_none())
                    {
                        self.finish(actor, ctx);
                    }
                }
            }
            TimerKind::AoeDetonate { skill, activation } => {
                if self.is_current(skill, activation) {
                    self.detonate(skill, ctx);
                }
            }
            TimerKind::ProjectileLaunch { skill, activation } => {
                if self.is_current(skill, activation) {
                    self.launch(skill, ctx);
                }
            }
            TimerKind::BuffExpire { buff } => {
                actor.buffs.expire(buff);
            }
        }
        true
    }

    /// Completes the active skill if `signal` belongs to the animation it
    /// started. Complete and stop both count.
    pub fn on_animation_signal(
        &mut self,
        signal: &AnimationSignal,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) -> bool {
        if signal.actor != self.owner {
            return false;
        }
        let matches = self
            .active
            .as_ref()
            .and_then(|a| a.animation.as_ref())
            .is_some_and(|(key, playback)| *key == signal.key && *playback == signal.playback);
        if matches {
            self.finish(actor, ctx);
        }
        matches
    }

    /// Per-tick update: cooldowns, duration completion, mana regen, channel
    /// drain, hitbox motion and projectiles.
    pub fn update(
        &mut self,
        delta_ms: f32,
        channel_held: bool,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) {
        let mut completed = None;
        for skill in self.skills.iter_mut() {
            let before = skill.cooldown_remaining_ms();
            if skill.update(delta_ms) {
                completed = Some(skill.slot());
                ctx.events.publish(CombatEvent::SkillCompleted {
                    actor: self.owner,
                    skill: skill.name().to_string(),
                });
            }
            let after = skill.cooldown_remaining_ms();
            if (after - before).abs() > f32::EPSILON {
                ctx.events.publish(CombatEvent::SkillCooldownUpdated {
                    actor: self.owner,
                    skill: skill.name().to_string(),
                    remaining_ms: after,
                });
            }
        }
        if let Some(slot) = completed {
            if self.active.as_ref().is_some_and(|a| a.slot == slot) {
                self.finish(actor, ctx);
            }
        }

        self.basic.cooldown_remaining_ms = (self.basic.cooldown_remaining_ms - delta_ms).max(0.0);
        actor.vitals.regen(delta_ms);

        self.update_channel(channel_held, actor, ctx);

        self.basic.hitbox.update(delta_ms, ctx);
        for hitbox in self.hitboxes.values_mut() {
            hitbox.update(delta_ms, ctx);
        }
        for projectile in &mut self.projectiles {
            projectile.update(delta_ms, ctx);
        }
        self.projectiles.retain(Projectile::is_alive);
    }

    fn update_channel(
        &mut self,
        held: bool,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) {
        let Some(session) = self.channel.session().copied() else {
            return;
        };
        let config = match self.skills.get(session.skill).map(|s| &s.def().kind) {
            Some(SkillKind::Channeling { channel, .. }) => *channel,
            _ => {
                self.channel.stop();
                return;
            }
        };

        // A channel may outlive its state lock; only release or mana ends it.
        let locked = actor.state.is_locked();
        let update = self
            .channel
            .update(held, &mut actor.vitals.mana, &config, locked, ctx);
        if update.ticks > 0 {
            if let Some(hitbox) = self.hitboxes.get_mut(&session.skill) {
                hitbox.activate(ctx);
            }
        }
        if let Some(reason) = update.stopped {
            self.end_channel(session.skill, reason, actor, ctx);
        }
    }

    fn end_channel(
        &mut self,
        slot: SkillSlot,
        reason: ChannelStopReason,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) {
        self.channel.stop();
        if let Some(skill) = self.skills.get(slot) {
            debug!(actor = %self.owner, skill = skill.name(), ?reason, "channel stopped");
            ctx.events.publish(CombatEvent::ChannelStopped {
                actor: self.owner,
                skill: skill.name().to_string(),
                reason,
            });
        }
        if let Some(hitbox) = self.hitboxes.get_mut(&slot) {
            hitbox.deactivate(ctx);
        }
        self.finish(actor, ctx);
        actor.state.force_unlock(ctx);
    }

    /// Cuts the active skill short. Its full cooldown starts now.
    pub fn interrupt(&mut self, actor: &mut Combatant, ctx: &mut CombatContext<'_>) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        for handle in active.timers.drain(..) {
            ctx.scheduler.cancel(handle);
        }
        let slot = active.slot;
        if let Some(session) = self.channel.session().copied() {
            self.end_channel(session.skill, ChannelStopReason::Interrupted, actor, ctx);
            return true;
        }
        if let Some(hitbox) = self.hitboxes.get_mut(&slot) {
            hitbox.deactivate(ctx);
        }
        self.finish(actor, ctx);
        actor.state.force_unlock(ctx);
        true
    }

    /// Tears down hitboxes, projectiles and the channel. Pending timers are
    /// cancelled by the owner's [`Combatant::destroy`].
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        self.channel.stop();
        self.active = None;
        self.basic.hitbox.destroy(ctx);
        for hitbox in self.hitboxes.values_mut() {
            hitbox.destroy(ctx);
        }
        for projectile in &mut self.projectiles {
            projectile.destroy(ctx);
        }
        self.projectiles.clear();
    }

    /// Tests every live hitbox and projectile against `target`.
    pub fn check_hits(
        &mut self,
        target: EntityId,
        bounds: Rect,
        ctx: &mut CombatContext<'_>,
    ) -> Vec<(HitSource, HitResult)> {
        let mut hits = Vec::new();
        if let Some(hit) = self.basic.hitbox.check_hit(target, bounds) {
            hits.push((HitSource::Basic, hit));
        }
        for (slot, hitbox) in &mut self.hitboxes {
            if let Some(hit) = hitbox.check_hit(target, bounds) {
                hits.push((HitSource::Skill(*slot), hit));
            }
        }
        for projectile in &mut self.projectiles {
            if let Some(hit) = projectile.check_hit(target, bounds, ctx) {
                hits.push((HitSource::Projectile, hit));
            }
        }
        self.projectiles.retain(Projectile::is_alive);
        hits
    }

    fn finish(&mut self, actor: &mut Combatant, ctx: &mut CombatContext<'_>) {
        let Some(active) = self.active.take() else {
            return;
        };
        let Some(skill) = self.skills.get_mut(active.slot) else {
            return;
        };
        if skill.complete() {
            ctx.events.publish(CombatEvent::SkillCompleted {
                actor: self.owner,
                skill: skill.name().to_string(),
            });
            ctx.events.publish(CombatEvent::SkillCooldownUpdated {
                actor: self.owner,
                skill: skill.name().to_string(),
                remaining_ms: skill.cooldown_remaining_ms(),
            });
        }
        if skill.def().kind.is_movement() {
            actor.invincible = false;
            if let Some(key) = active.restore.as_deref() {
                if !actor.state.is_locked() {
                    actor.state.animation_mut().play(key, None, ctx.renderer);
                }
            }
        }
    }

    fn schedule_for_active(&mut self, delay_ms: f32, kind: TimerKind, ctx: &mut CombatContext<'_>) {
        let handle = ctx
            .scheduler
            .schedule_once(delay_ms, CombatTimer::new(self.owner, kind));
        if let Some(active) = self.active.as_mut() {
            active.timers.push(handle);
        }
    }

    fn is_current(&self, slot: SkillSlot, activation: u64) -> bool {
        self.skills
            .get(slot)
            .is_some_and(|s| s.activation() == activation)
    }

    fn is_active_use(&self, slot: SkillSlot, activation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.slot == slot && a.activation == activation)
    }

    fn hitbox_mut(&mut self, slot: HitboxSlot) -> Option<&mut Hitbox> {
        match slot {
            HitboxSlot::Basic => Some(&mut self.basic.hitbox),
            HitboxSlot::Skill(skill) => self.hitboxes.get_mut(&skill),
        }
    }

    fn placed_area(&self, config: &HitboxConfig, ctx: &CombatContext<'_>) -> Rect {
        let anchor = ctx.physics.position(self.owner).unwrap_or(Vec2::ZERO);
        let facing = ctx.physics.facing(self.owner);
        area_of(config, anchor, facing)
    }

    fn detonate(&mut self, slot: SkillSlot, ctx: &mut CombatContext<'_>) {
        let owner = self.owner;
        let Some(hitbox) = self.hitboxes.get_mut(&slot) else {
            return;
        };
        hitbox.activate(ctx);
        let area = match hitbox.rects().into_iter().reduce(union) {
            Some(area) => area,
            None => {
                let anchor = ctx.physics.position(owner).unwrap_or(Vec2::ZERO);
                area_of(hitbox.config(), anchor, ctx.physics.facing(owner))
            }
        };
        ctx.renderer.spawn_effect(VisualEffect {
            owner,
            kind: EffectKind::AoeExplosion,
            area,
            duration_ms: hitbox.config().duration_ms,
        });
    }

    fn launch(&mut self, slot: SkillSlot, ctx: &mut CombatContext<'_>) {
        let config = match self.skills.get(slot).map(|s| &s.def().kind) {
            Some(SkillKind::Projectile { projectile, .. }) => projectile.clone(),
            _ => return,
        };
        self.projectiles
            .push(Projectile::launch(self.owner, config, ctx));
    }
}

fn union(a: Rect, b: Rect) -> Rect {
    Rect::new(
        a.min_x.min(b.min_x),
        a.min_y.min(b.min_y),
        a.max_x.max(b.max_x),
        a.max_y.max(b.max_y),
    )
}

fn area_of(config: &HitboxConfig, anchor: Vec2, facing: Facing) -> Rect {
    let shapes = config
        .shapes
        .iter()
        .copied()
        .chain(config.sequence.iter().map(|s| s.shape));
    shapes
        .map(|shape| shape.place(anchor, facing))
        .reduce(union)
        .unwrap_or_else(|| Rect::from_center(anchor, 0.0, 0.0))
}

/// Player skill system: key bindings on top of the executor.
#[derive(Debug, Clone)]
pub struct SkillSystem {
    executor: SkillExecutor,
    bindings: BTreeMap<CombatKey, String>,
}

impl SkillSystem {
    /// Builds the player's skills from its definition.
    #[must_use]
    pub fn new(owner: EntityId, def: &ActorDef, tuning: &CombatTuning) -> Self {
        Self {
            executor: SkillExecutor::new(owner, def, tuning),
            bindings: def.bindings.clone(),
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

    /// Skill bound to `key`.
    #[must_use]
    pub fn binding(&self, key: CombatKey) -> Option<&str> {
        self.bindings.get(&key).map(String::as_str)
    }

    /// Uses a skill by name.
    pub fn use_skill(
        &mut self,
        name: &str,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) -> Result<(), SkillError> {
        let result = self.executor.use_skill(name, actor, ctx);
        if let Err(err) = &result {
            debug!(actor = %actor.id, skill = name, %err, "skill rejected");
        }
        result
    }

    /// Swings the basic attack.
    pub fn basic_attack(&mut self, actor: &mut Combatant, ctx: &mut CombatContext<'_>) -> bool {
        self.executor.basic_attack(actor, ctx)
    }

    /// Turns this frame's key presses into attacks and skill uses.
    pub fn handle_input(
        &mut self,
        input: &CombatInput,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) {
        if input.just_pressed(CombatKey::Attack) {
            self.basic_attack(actor, ctx);
        }
        for key in CombatKey::SKILL_KEYS {
            if !input.just_pressed(key) {
                continue;
            }
            if let Some(name) = self.bindings.get(&key).cloned() {
                // Rejections are logged by use_skill; input is fire-and-forget.
                let _ = self.use_skill(&name, actor, ctx);
            }
        }
    }

    /// Whether the key bound to the running channel is held.
    #[must_use]
    pub fn channel_held(&self, input: &CombatInput) -> bool {
        let Some(session) = self.executor.channel().session() else {
            return false;
        };
        let Some(name) = self.executor.skills().get(session.skill).map(Skill::name) else {
            return false;
        };
        self.bindings
            .iter()
            .any(|(key, bound)| bound == name && input.is_held(*key))
    }

    /// Per-tick update.
    pub fn update(
        &mut self,
        delta_ms: f32,
        input: &CombatInput,
        actor: &mut Combatant,
        ctx: &mut CombatContext<'_>,
    ) {
        let held = self.channel_held(input);
        self.executor.update(delta_ms, held, actor, ctx);
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
