//! Timed collision volumes.
//!
//! A [`Hitbox`] is created once per attack or skill and reused for every
//! activation. Each activation opens a new *cycle*: the hit set is cleared,
//! shapes are spawned relative to the owner, and a deactivation timer is
//! scheduled. Timers from an older cycle are ignored.
//!
//! Sequence hitboxes spawn ephemeral shapes per step. All steps share the
//! aggregate's hit set, so a single-target hitbox lands at most one hit per
//! cycle no matter how many steps overlap the target.

use ahash::AHashSet;
use riftblade_common::{EntityId, Facing, Rect, Vec2};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::CombatContext;
use crate::renderer::ShapeHandle;
use crate::scheduler::{CombatTimer, TimerHandle, TimerKind};
use crate::skill::SkillSlot;

/// Which hitbox of an actor a timer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitboxSlot {
    /// The basic attack hitbox
    Basic,
    /// A skill's hitbox
    Skill(SkillSlot),
}

/// Whether a hitbox may hit more than one target per activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// At most one hit per activation
    Single,
    /// Every overlapping target, once each
    #[default]
    Multi,
}

/// Extra effects carried by a hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HitEffect {
    /// Target cannot act for a while
    Stun {
        /// Stun length
        duration_ms: f32,
    },
    /// Target moves slower for a while
    Slow {
        /// Movement speed multiplier
        multiplier: f32,
        /// Slow length
        duration_ms: f32,
    },
}

/// One rectangle of a hitbox, relative to the owner's center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitboxShape {
    /// Full width
    pub width: f32,
    /// Full height
    pub height: f32,
    /// Horizontal offset in front of the owner (mirrored by facing)
    #[serde(default)]
    pub offset_x: f32,
    /// Vertical offset
    #[serde(default)]
    pub offset_y: f32,
}

impl HitboxShape {
    /// Creates a shape centered on the owner.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Sets the offset.
    #[must_use]
    pub const fn with_offset(mut self, offset_x: f32, offset_y: f32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    /// Places the shape for an owner at `anchor` facing `facing`.
    #[must_use]
    pub fn place(&self, anchor: Vec2, facing: Facing) -> Rect {
        Rect::from_offset(
            anchor,
            self.offset_x,
            self.offset_y,
            self.width,
            self.height,
            facing,
        )
    }
}

/// One step of a sequence hitbox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    /// Delay from activation until the step's shape spawns
    #[serde(default)]
    pub delay_ms: f32,
    /// How long the step's shape lives
    pub duration_ms: f32,
    /// Shape geometry
    pub shape: HitboxShape,
    /// Velocity in pixels per second (x mirrored by facing); static steps
    /// follow the owner instead
    #[serde(default)]
    pub velocity: Option<Vec2>,
}

fn default_hitbox_duration() -> f32 {
    200.0
}

/// Hitbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitboxConfig {
    /// Shapes for a single activation
    #[serde(default)]
    pub shapes: Vec<HitboxShape>,
    /// Damage per hit
    pub damage: f32,
    /// Knockback velocity (x mirrored by facing)
    #[serde(default)]
    pub knockback: Vec2,
    /// Effects carried by each hit
    #[serde(default)]
    pub effects: Vec<HitEffect>,
    /// Single or multi target
    #[serde(default)]
    pub target_type: TargetType,
    /// Active window of a single activation
    #[serde(default = "default_hitbox_duration")]
    pub duration_ms: f32,
    /// Sequence steps; when present, activation runs the sequence
    #[serde(default)]
    pub sequence: Vec<SequenceStep>,
}

impl HitboxConfig {
    /// Creates a single-shape hitbox config.
    #[must_use]
    pub fn new(shape: HitboxShape, damage: f32) -> Self {
        Self {
            shapes: vec![shape],
            damage,
            knockback: Vec2::ZERO,
            effects: Vec::new(),
            target_type: TargetType::default(),
            duration_ms: default_hitbox_duration(),
            sequence: Vec::new(),
        }
    }

    /// Sets the target type.
    #[must_use]
    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Sets the knockback.
    #[must_use]
    pub fn with_knockback(mut self, knockback: Vec2) -> Self {
        self.knockback = knockback;
        self
    }

    /// Sets the active window.
    #[must_use]
    pub fn with_duration(mut self, duration_ms: f32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Replaces the shapes with a sequence.
    #[must_use]
    pub fn with_sequence(mut self, steps: Vec<SequenceStep>) -> Self {
        self.sequence = steps;
        self
    }

    /// Adds an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: HitEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether activation runs the sequence.
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        !self.sequence.is_empty()
    }

    /// Total sequence length without grace.
    #[must_use]
    pub fn sequence_length_ms(&self) -> f32 {
        self.sequence
            .iter()
            .map(|s| s.delay_ms + s.duration_ms)
            .fold(0.0, f32::max)
    }
}

/// A successful hit.
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    /// Damage before buffs
    pub damage: f32,
    /// Knockback, already mirrored by the owner's facing
    pub knockback: Vec2,
    /// Effects to apply
    pub effects: Vec<HitEffect>,
    /// Target type of the hitbox
    pub target_type: TargetType,
}

#[derive(Debug, Clone)]
struct LiveShape {
    shape: HitboxShape,
    rect: Rect,
    velocity: Option<Vec2>,
    handle: ShapeHandle,
    step: Option<usize>,
}

/// A hitbox aggregate owned by one actor.
#[derive(Debug, Clone)]
pub struct Hitbox {
    owner: EntityId,
    slot: HitboxSlot,
    config: HitboxConfig,
    active: bool,
    cycle: u64,
    facing: Facing,
    hit_targets: AHashSet<EntityId>,
    live: Vec<LiveShape>,
    timers: Vec<TimerHandle>,
    grace_ms: f32,
}

impl Hitbox {
    /// Default grace after the last sequence step before auto-deactivation.
    pub const DEFAULT_GRACE_MS: f32 = 100.0;

    /// Creates an inactive hitbox.
    #[must_use]
    pub fn new(owner: EntityId, slot: HitboxSlot, config: HitboxConfig) -> Self {
        Self {
            owner,
            slot,
            config,
            active: false,
            cycle: 0,
            facing: Facing::Right,
            hit_targets: AHashSet::new(),
            live: Vec::new(),
            timers: Vec::new(),
            grace_ms: Self::DEFAULT_GRACE_MS,
        }
    }

    /// Sets the sequence grace.
    #[must_use]
    pub fn with_grace(mut self, grace_ms: f32) -> Self {
        self.grace_ms = grace_ms.max(0.0);
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &HitboxConfig {
        &self.config
    }

    /// Whether the hitbox is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current activation cycle.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Targets hit during the current cycle.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hit_targets.len()
    }

    /// Current world rectangles of live shapes.
    #[must_use]
    pub fn rects(&self) -> Vec<Rect> {
        self.live.iter().map(|s| s.rect).collect()
    }

    /// Starts a new activation cycle. Runs the sequence when one is configured.
    pub fn activate(&mut self, ctx: &mut CombatContext<'_>) -> u64 {
        if self.config.is_sequence() {
            return self.activate_sequence(ctx);
        }
        self.begin_cycle(ctx);

        let anchor = ctx.physics.position(self.owner).unwrap_or(Vec2::ZERO);
        for shape in self.config.shapes.clone() {
            self.spawn_shape(shape, anchor, None, None, ctx);
        }
        self.schedule(
            self.config.duration_ms,
            TimerKind::HitboxDeactivate {
                slot: self.slot,
                cycle: self.cycle,
            },
            ctx,
        );
        self.cycle
    }

    /// Starts a sequence cycle: one spawn timer per step plus an aggregate
    /// deactivation after the longest step and the grace.
    pub fn activate_sequence(&mut self, ctx: &mut CombatContext<'_>) -> u64 {
        self.begin_cycle(ctx);
        let cycle = self.cycle;
        for (step, step_def) in self.config.sequence.clone().iter().enumerate() {
            self.schedule(
                step_def.delay_ms,
                TimerKind::SequenceStepSpawn {
                    slot: self.slot,
                    cycle,
                    step,
                },
                ctx,
            );
        }
        self.schedule(
            self.config.sequence_length_ms() + self.grace_ms,
            TimerKind::HitboxDeactivate {
                slot: self.slot,
                cycle,
            },
            ctx,
        );
        cycle
    }

    /// Spawns the shape of a sequence step. Ignored for stale cycles.
    pub fn spawn_step(&mut self, cycle: u64, step: usize, ctx: &mut CombatContext<'_>) {
        if !self.active || cycle != self.cycle {
            return;
        }
        let Some(step_def) = self.config.sequence.get(step).copied() else {
            return;
        };
        let anchor = ctx.physics.position(self.owner).unwrap_or(Vec2::ZERO);
        let velocity = step_def
            .velocity
            .map(|v| Vec2::new(v.x * self.facing.sign(), v.y));
        self.spawn_shape(step_def.shape, anchor, velocity, Some(step), ctx);
        self.schedule(
            step_def.duration_ms,
            TimerKind::SequenceStepExpire {
                slot: self.slot,
                cycle,
                step,
            },
            ctx,
        );
    }

    /// Destroys the shape of an elapsed sequence step. Ignored for stale cycles.
    pub fn expire_step(&mut self, cycle: u64, step: usize, ctx: &mut CombatContext<'_>) {
        if cycle != self.cycle {
            return;
        }
        self.live.retain(|live| {
            if live.step == Some(step) {
                ctx.renderer.destroy_shape(live.handle);
                false
            } else {
                true
            }
        });
    }

    /// Handles a fired deactivation timer.
    pub fn on_deactivate_timer(&mut self, cycle: u64, ctx: &mut CombatContext<'_>) {
        if cycle == self.cycle {
            self.deactivate(ctx);
        }
    }

    /// Ends the cycle: destroys shapes, clears the hit set, cancels timers.
    pub fn deactivate(&mut self, ctx: &mut CombatContext<'_>) {
        if self.active {
            trace!(owner = %self.owner, slot = ?self.slot, cycle = self.cycle, hits = self.hit_targets.len(), "hitbox deactivated");
        }
        self.active = false;
        self.hit_targets.clear();
        for live in self.live.drain(..) {
            ctx.renderer.destroy_shape(live.handle);
        }
        for handle in self.timers.drain(..) {
            ctx.scheduler.cancel(handle);
        }
    }

    /// Tests `target` against the live shapes.
    ///
    /// Returns `None` when inactive, when the single-target cap is reached,
    /// when `target` was already hit this cycle, or when nothing overlaps.
    pub fn check_hit(&mut self, target: EntityId, bounds: Rect) -> Option<HitResult> {
        if !self.active || target == self.owner || self.hit_targets.contains(&target) {
            return None;
        }
        if self.config.target_type == TargetType::Single && !self.hit_targets.is_empty() {
            return None;
        }
        if !self.live.iter().any(|live| live.rect.overlaps(&bounds)) {
            return None;
        }
        self.hit_targets.insert(target);
        Some(HitResult {
            damage: self.config.damage,
            knockback: Vec2::new(
                self.config.knockback.x * self.facing.sign(),
                self.config.knockback.y,
            ),
            effects: self.config.effects.clone(),
            target_type: self.config.target_type,
        })
    }

    /// Moves live shapes: static shapes follow the owner, moving shapes
    /// integrate their velocity.
    pub fn update(&mut self, delta_ms: f32, ctx: &mut CombatContext<'_>) {
        if !self.active || self.live.is_empty() {
            return;
        }
        let anchor = ctx.physics.position(self.owner);
        let dt = delta_ms / 1000.0;
        for live in &mut self.live {
            let rect = match (live.velocity, anchor) {
                (Some(velocity), _) => live.rect.translated(velocity * dt),
                (None, Some(anchor)) => live.shape.place(anchor, self.facing),
                (None, None) => continue,
            };
            live.rect = rect;
            ctx.renderer.move_shape(live.handle, rect);
        }
    }

    /// Deactivates; used when the owner is destroyed.
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        self.deactivate(ctx);
    }

    fn begin_cycle(&mut self, ctx: &mut CombatContext<'_>) {
        self.deactivate(ctx);
        self.cycle += 1;
        self.active = true;
        self.facing = ctx.physics.facing(self.owner);
        trace!(owner = %self.owner, slot = ?self.slot, cycle = self.cycle, "hitbox activated");
    }

    fn spawn_shape(
        &mut self,
        shape: HitboxShape,
        anchor: Vec2,
        velocity: Option<Vec2>,
        step: Option<usize>,
        ctx: &mut CombatContext<'_>,
    ) {
        let rect = shape.place(anchor, self.facing);
        let handle = ctx.renderer.spawn_shape(self.owner, rect);
        self.live.push(LiveShape {
            shape,
            rect,
            velocity,
            handle,
            step,
        });
    }

    fn schedule(&mut self, delay_ms: f32, kind: TimerKind, ctx: &mut CombatContext<'_>) {
        let handle = ctx
            .scheduler
            .schedule_once(delay_ms, CombatTimer::new(self.owner, kind));
        self.timers.push(handle);
    }
}
