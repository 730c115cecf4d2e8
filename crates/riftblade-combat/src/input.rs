//! Raw combat input: pressed / held / released signals per logical key.
//!
//! Device mapping lives outside the combat core. The frame loop feeds the
//! logical key states here and the player systems read them.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Logical combat keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatKey {
    /// Move left
    Left,
    /// Move right
    Right,
    /// Run modifier
    Run,
    /// Jump
    Jump,
    /// Basic attack
    Attack,
    /// Skill slot Q
    Q,
    /// Skill slot W
    W,
    /// Skill slot E
    E,
    /// Skill slot R
    R,
    /// Skill slot S
    S,
}

impl CombatKey {
    /// Keys that trigger skills through bindings.
    pub const SKILL_KEYS: [Self; 5] = [Self::Q, Self::W, Self::E, Self::R, Self::S];
}

/// State of a button (pressed, just pressed, released).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    /// Whether the button is currently held down
    pub pressed: bool,
    /// Whether the button was just pressed this frame
    pub just_pressed: bool,
    /// Whether the button was just released this frame
    pub just_released: bool,
}

impl ButtonState {
    /// Update the button state based on whether it's currently pressed.
    pub fn update(&mut self, is_pressed: bool) {
        self.just_pressed = is_pressed && !self.pressed;
        self.just_released = !is_pressed && self.pressed;
        self.pressed = is_pressed;
    }

    /// Clear the frame-specific state (just_pressed, just_released).
    pub fn clear_frame(&mut self) {
        self.just_pressed = false;
        self.just_released = false;
    }
}

/// Per-frame key states for one player.
#[derive(Debug, Clone, Default)]
pub struct CombatInput {
    keys: AHashMap<CombatKey, ButtonState>,
}

impl CombatInput {
    /// Creates an input with nothing held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether `key` is down this frame.
    pub fn set(&mut self, key: CombatKey, is_pressed: bool) {
        self.keys.entry(key).or_default().update(is_pressed);
    }

    /// Presses `key`.
    pub fn press(&mut self, key: CombatKey) {
        self.set(key, true);
    }

    /// Releases `key`.
    pub fn release(&mut self, key: CombatKey) {
        self.set(key, false);
    }

    /// Clears frame-specific state. Call at the end of each frame.
    pub fn end_frame(&mut self) {
        for state in self.keys.values_mut() {
            state.clear_frame();
        }
    }

    /// Whether `key` is held.
    #[must_use]
    pub fn is_held(&self, key: CombatKey) -> bool {
        self.keys.get(&key).is_some_and(|s| s.pressed)
    }

    /// Whether `key` went down this frame.
    #[must_use]
    pub fn just_pressed(&self, key: CombatKey) -> bool {
        self.keys.get(&key).is_some_and(|s| s.just_pressed)
    }

    /// Whether `key` went up this frame.
    #[must_use]
    pub fn just_released(&self, key: CombatKey) -> bool {
        self.keys.get(&key).is_some_and(|s| s.just_released)
    }

    /// Horizontal axis in -1..=1.
    #[must_use]
    pub fn move_axis(&self) -> f32 {
        let mut axis = 0.0;
        if self.is_held(CombatKey::Left) {
            axis -= 1.0;
        }
        if self.is_held(CombatKey::Right) {
            axis += 1.0;
        }
        axis
    }
}
