//! Renderer contract consumed by the combat core.
//!
//! The combat core never touches sprites or scene objects directly. It asks a
//! [`Renderer`] to play animations, draw debug shapes for live hitboxes and
//! show telegraph effects. Animation completion comes back as
//! [`AnimationSignal`]s that the runtime routes to the owning actor.
//!
//! [`RecordingRenderer`] is an in-memory implementation used by tests and by
//! the headless engine.

use ahash::AHashMap;
use riftblade_common::{EntityId, Rect};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifies one call to [`Renderer::play_animation`].
///
/// Completion listeners match on the playback as well as the key, so a
/// signal from an earlier playback of the same key is never mistaken for the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaybackId(u64);

impl PlaybackId {
    /// Creates a playback id from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to a collision/debug shape owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeHandle(u64);

impl ShapeHandle {
    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Registered animation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Fully namespaced animation key
    pub key: String,
    /// Number of frames
    pub frame_count: u32,
    /// Default playback rate in frames per second
    pub frame_rate: f32,
    /// Whether the animation loops (looping clips never complete)
    #[serde(default)]
    pub repeat: bool,
}

impl AnimationClip {
    /// Creates a non-looping clip.
    #[must_use]
    pub fn new(key: impl Into<String>, frame_count: u32, frame_rate: f32) -> Self {
        Self {
            key: key.into(),
            frame_count,
            frame_rate,
            repeat: false,
        }
    }

    /// Marks the clip as looping.
    #[must_use]
    pub fn looping(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Natural duration in milliseconds at the given (or default) frame rate.
    ///
    /// Returns `None` for looping clips and for degenerate frame rates.
    #[must_use]
    pub fn natural_duration_ms(&self, frame_rate: Option<f32>) -> Option<f32> {
        if self.repeat {
            return None;
        }
        let rate = frame_rate.unwrap_or(self.frame_rate);
        if rate <= 0.0 || self.frame_count == 0 {
            return None;
        }
        Some(self.frame_count as f32 / rate * 1000.0)
    }
}

/// Kind of animation lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationSignalKind {
    /// The animation played through to its last frame.
    Complete,
    /// The animation was stopped or replaced before finishing.
    Stop,
}

/// Animation lifecycle signal emitted by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationSignal {
    /// Actor whose sprite emitted the signal
    pub actor: EntityId,
    /// Animation key
    pub key: String,
    /// Playback the signal belongs to
    pub playback: PlaybackId,
    /// Complete or stop
    pub kind: AnimationSignalKind,
}

/// Telegraph and impact visuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Ground warning before an area attack lands
    AoeWarning,
    /// Area attack detonation
    AoeExplosion,
}

/// A visual effect request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualEffect {
    /// Actor that caused the effect
    pub owner: EntityId,
    /// Effect kind
    pub kind: EffectKind,
    /// Area covered
    pub area: Rect,
    /// How long the effect stays visible
    pub duration_ms: f32,
}

/// Rendering collaborator.
pub trait Renderer {
    /// Looks up a registered animation.
    fn animation_clip(&self, key: &str) -> Option<AnimationClip>;

    /// Plays `key` on `actor`'s sprite. Returns `None` if the key is not registered.
    fn play_animation(
        &mut self,
        actor: EntityId,
        key: &str,
        frame_rate: Option<f32>,
    ) -> Option<PlaybackId>;

    /// Stops whatever `actor` is playing.
    fn stop_animation(&mut self, actor: EntityId);

    /// Spawns a collision/debug shape.
    fn spawn_shape(&mut self, owner: EntityId, rect: Rect) -> ShapeHandle;

    /// Moves an existing shape.
    fn move_shape(&mut self, handle: ShapeHandle, rect: Rect);

    /// Destroys a shape. Unknown handles are ignored.
    fn destroy_shape(&mut self, handle: ShapeHandle);

    /// Shows a visual effect.
    fn spawn_effect(&mut self, effect: VisualEffect);
}

#[derive(Debug, Clone)]
struct Playing {
    key: String,
    playback: PlaybackId,
    remaining_ms: Option<f32>,
}

/// In-memory renderer that plays clips on a virtual clock.
///
/// Non-looping playbacks emit [`AnimationSignalKind::Complete`] from
/// [`RecordingRenderer::advance`] once their natural duration elapses;
/// replacing or stopping a playback emits [`AnimationSignalKind::Stop`].
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    clips: AHashMap<String, AnimationClip>,
    playing: AHashMap<EntityId, Playing>,
    signals: Vec<AnimationSignal>,
    shapes: AHashMap<ShapeHandle, (EntityId, Rect)>,
    effects: Vec<VisualEffect>,
    history: Vec<(EntityId, String)>,
    next_playback: u64,
    next_shape: u64,
    suppress_completion: bool,
}

impl RecordingRenderer {
    /// Creates an empty renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an animation clip.
    pub fn register_clip(&mut self, clip: AnimationClip) {
        self.clips.insert(clip.key.clone(), clip);
    }

    /// Registers several clips.
    pub fn register_clips(&mut self, clips: impl IntoIterator<Item = AnimationClip>) {
        for clip in clips {
            self.register_clip(clip);
        }
    }

    /// When set, playbacks never emit `Complete` (simulates a broken asset).
    pub fn set_suppress_completion(&mut self, suppress: bool) {
        self.suppress_completion = suppress;
    }

    /// Advances all playbacks and returns the signals produced since the last call.
    pub fn advance(&mut self, delta_ms: f32) -> Vec<AnimationSignal> {
        let mut finished = Vec::new();
        for (actor, playing) in &mut self.playing {
            if let Some(remaining) = playing.remaining_ms.as_mut() {
                *remaining -= delta_ms;
                if *remaining <= 0.0 && !self.suppress_completion {
                    finished.push(*actor);
                }
            }
        }
        finished.sort();
        for actor in finished {
            if let Some(playing) = self.playing.remove(&actor) {
                self.signals.push(AnimationSignal {
                    actor,
                    key: playing.key,
                    playback: playing.playback,
                    kind: AnimationSignalKind::Complete,
                });
            }
        }
        std::mem::take(&mut self.signals)
    }

    /// Key currently playing on `actor`.
    #[must_use]
    pub fn current_key(&self, actor: EntityId) -> Option<&str> {
        self.playing.get(&actor).map(|p| p.key.as_str())
    }

    /// Every (actor, key) passed to `play_animation`, in order.
    #[must_use]
    pub fn history(&self) -> &[(EntityId, String)] {
        &self.history
    }

    /// Number of live shapes.
    #[must_use]
    pub fn live_shapes(&self) -> usize {
        self.shapes.len()
    }

    /// Live shapes owned by `owner`.
    #[must_use]
    pub fn shapes_of(&self, owner: EntityId) -> Vec<Rect> {
        self.shapes
            .values()
            .filter(|(o, _)| *o == owner)
            .map(|(_, r)| *r)
            .collect()
    }

    /// Effects spawned so far.
    #[must_use]
    pub fn effects(&self) -> &[VisualEffect] {
        &self.effects
    }
}

impl Renderer for RecordingRenderer {
    fn animation_clip(&self, key: &str) -> Option<AnimationClip> {
        self.clips.get(key).cloned()
    }

    fn play_animation(
        &mut self,
        actor: EntityId,
        key: &str,
        frame_rate: Option<f32>,
    ) -> Option<PlaybackId> {
        let clip = self.clips.get(key)?;
        let remaining_ms = clip.natural_duration_ms(frame_rate);

        self.next_playback += 1;
        let playback = PlaybackId(self.next_playback);

        if let Some(previous) = self.playing.insert(
            actor,
            Playing {
                key: key.to_string(),
                playback,
                remaining_ms,
            },
        ) {
            self.signals.push(AnimationSignal {
                actor,
                key: previous.key,
                playback: previous.playback,
                kind: AnimationSignalKind::Stop,
            });
        }

        self.history.push((actor, key.to_string()));
        debug!(%actor, key, ?remaining_ms, "animation playing");
        Some(playback)
    }

    fn stop_animation(&mut self, actor: EntityId) {
        if let Some(previous) = self.playing.remove(&actor) {
            self.signals.push(AnimationSignal {
                actor,
                key: previous.key,
                playback: previous.playback,
                kind: AnimationSignalKind::Stop,
            });
        }
    }

    fn spawn_shape(&mut self, owner: EntityId, rect: Rect) -> ShapeHandle {
        self.next_shape += 1;
        let handle = ShapeHandle(self.next_shape);
        self.shapes.insert(handle, (owner, rect));
        handle
    }

    fn move_shape(&mut self, handle: ShapeHandle, rect: Rect) {
        if let Some(entry) = self.shapes.get_mut(&handle) {
            entry.1 = rect;
        }
    }

    fn destroy_shape(&mut self, handle: ShapeHandle) {
        self.shapes.remove(&handle);
    }

    fn spawn_effect(&mut self, effect: VisualEffect) {
        self.effects.push(effect);
    }
}
