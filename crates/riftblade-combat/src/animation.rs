//! Animation key resolution and playback.
//!
//! Actors share one renderer, so every actor class registers its clips under
//! a namespace (`knight_attack`, `golem_attack`). The controller resolves a
//! bare key against the actor's namespace first and falls back to the raw key.

use riftblade_common::EntityId;
use tracing::warn;

use crate::renderer::{PlaybackId, Renderer};

/// Result of a successful `play`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedAnimation {
    /// Resolved (namespaced) key
    pub key: String,
    /// Playback id assigned by the renderer
    pub playback: PlaybackId,
    /// Natural duration; `None` for looping clips
    pub duration_ms: Option<f32>,
}

/// Resolves and plays animation keys for one actor.
#[derive(Debug, Clone)]
pub struct AnimationController {
    owner: EntityId,
    namespace: Option<String>,
    current: Option<PlayedAnimation>,
}

impl AnimationController {
    /// Creates a controller for `owner`.
    #[must_use]
    pub fn new(owner: EntityId, namespace: Option<String>) -> Self {
        Self {
            owner,
            namespace,
            current: None,
        }
    }

    /// The actor's animation namespace.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `key` with the actor namespace applied.
    #[must_use]
    pub fn namespaced(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) if !key.starts_with(&format!("{ns}_")) => format!("{ns}_{key}"),
            _ => key.to_string(),
        }
    }

    /// `key` with the actor namespace stripped.
    #[must_use]
    pub fn base_key<'k>(&self, key: &'k str) -> &'k str {
        self.namespace
            .as_deref()
            .and_then(|ns| key.strip_prefix(ns))
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(key)
    }

    /// Finds the registered key for `key`: namespaced first, then raw.
    #[must_use]
    pub fn resolve(&self, key: &str, renderer: &dyn Renderer) -> Option<String> {
        let namespaced = self.namespaced(key);
        if renderer.animation_clip(&namespaced).is_some() {
            return Some(namespaced);
        }
        renderer
            .animation_clip(key)
            .is_some()
            .then(|| key.to_string())
    }

    /// Plays `key` and computes its natural duration.
    ///
    /// Unregistered keys log a warning and return `None`; the previous
    /// playback stays recorded as current.
    pub fn play(
        &mut self,
        key: &str,
        frame_rate: Option<f32>,
        renderer: &mut dyn Renderer,
    ) -> Option<PlayedAnimation> {
        let Some(resolved) = self.resolve(key, renderer) else {
            warn!(owner = %self.owner, key, "animation not registered");
            return None;
        };
        let duration_ms = renderer
            .animation_clip(&resolved)
            .and_then(|clip| clip.natural_duration_ms(frame_rate));
        let playback = renderer.play_animation(self.owner, &resolved, frame_rate)?;

        let played = PlayedAnimation {
            key: resolved,
            playback,
            duration_ms,
        };
        self.current = Some(played.clone());
        Some(played)
    }

    /// Last animation successfully played.
    #[must_use]
    pub fn current(&self) -> Option<&PlayedAnimation> {
        self.current.as_ref()
    }

    /// Key of the last animation successfully played.
    #[must_use]
    pub fn current_key(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{AnimationClip, RecordingRenderer};

    fn renderer() -> RecordingRenderer {
        let mut r = RecordingRenderer::new();
        r.register_clip(AnimationClip::new("knight_attack", 6, 12.0));
        r.register_clip(AnimationClip::new("idle", 4, 8.0).looping());
        r
    }

    #[test]
    fn test_namespacing() {
        let c = AnimationController::new(EntityId::new(), Some("knight".into()));
        assert_eq!(c.namespaced("attack"), "knight_attack");
        assert_eq!(c.namespaced("knight_attack"), "knight_attack");
        assert_eq!(c.base_key("knight_attack"), "attack");
        assert_eq!(c.base_key("idle"), "idle");
        assert_eq!(c.base_key("knightly"), "knightly");
    }

    #[test]
    fn test_resolve_prefers_namespace_then_raw() {
        let r = renderer();
        let c = AnimationController::new(EntityId::new(), Some("knight".into()));
        assert_eq!(c.resolve("attack", &r).as_deref(), Some("knight_attack"));
        assert_eq!(c.resolve("idle", &r).as_deref(), Some("idle"));
        assert_eq!(c.resolve("jump", &r), None);
    }

    #[test]
    fn test_play_reports_duration() {
        let mut r = renderer();
        let mut c = AnimationController::new(EntityId::new(), Some("knight".into()));

        let played = c.play("attack", None, &mut r).expect("registered");
        assert_eq!(played.duration_ms, Some(500.0));
        assert_eq!(c.current_key(), Some("knight_attack"));

        let looping = c.play("idle", None, &mut r).expect("registered");
        assert_eq!(looping.duration_ms, None);
    }

    #[test]
    fn test_missing_key_keeps_current() {
        let mut r = renderer();
        let mut c = AnimationController::new(EntityId::new(), Some("knight".into()));
        c.play("attack", None, &mut r);
        assert!(c.play("cartwheel", None, &mut r).is_none());
        assert_eq!(c.current_key(), Some("knight_attack"));
    }
}
