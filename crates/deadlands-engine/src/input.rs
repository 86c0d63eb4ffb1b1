//! Keyboard input boundary.
//!
//! The host supplies an [`InputProvider`]; the engine samples it once per
//! frame into an [`InputState`] shared with the systems that read keys.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    W,
    A,
    S,
    D,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Fire,
    Pause,
}

impl Key {
    pub const ALL: [Key; 10] = [
        Key::W,
        Key::A,
        Key::S,
        Key::D,
        Key::ArrowUp,
        Key::ArrowDown,
        Key::ArrowLeft,
        Key::ArrowRight,
        Key::Fire,
        Key::Pause,
    ];
}

/// Source of key state, owned by the host.
pub trait InputProvider {
    fn is_pressed(&self, key: Key) -> bool;
}

/// Provider with nothing ever pressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputProvider for NoInput {
    fn is_pressed(&self, _key: Key) -> bool {
        false
    }
}

/// Provider driven by code. Clones share one key set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pressed: Rc<RefCell<HashSet<Key>>>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: Key) {
        self.pressed.borrow_mut().insert(key);
    }

    pub fn release(&self, key: Key) {
        self.pressed.borrow_mut().remove(&key);
    }

    pub fn release_all(&self) {
        self.pressed.borrow_mut().clear();
    }
}

impl InputProvider for ScriptedInput {
    fn is_pressed(&self, key: Key) -> bool {
        self.pressed.borrow().contains(&key)
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    current: HashSet<Key>,
    previous: HashSet<Key>,
}

/// Per-frame key snapshot. Clones share one snapshot.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    inner: Rc<RefCell<Snapshot>>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with the provider's current state.
    pub fn sample(&self, provider: &dyn InputProvider) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let current: HashSet<Key> = Key::ALL
            .iter()
            .copied()
            .filter(|k| provider.is_pressed(*k))
            .collect();
        inner.previous = std::mem::replace(&mut inner.current, current);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.inner.borrow().current.contains(&key)
    }

    /// Pressed this frame but not the one before.
    pub fn just_pressed(&self, key: Key) -> bool {
        let inner = self.inner.borrow();
        inner.current.contains(&key) && !inner.previous.contains(&key)
    }

    /// Movement direction from WASD and arrows, normalized. `(0, 0)` when
    /// idle or when opposite keys cancel.
    pub fn movement(&self) -> (f64, f64) {
        let axis = |neg: [Key; 2], pos: [Key; 2]| -> f64 {
            let held = |keys: [Key; 2]| keys.iter().any(|k| self.is_pressed(*k));
            f64::from(u8::from(held(pos))) - f64::from(u8::from(held(neg)))
        };
        let x = axis([Key::A, Key::ArrowLeft], [Key::D, Key::ArrowRight]);
        let y = axis([Key::W, Key::ArrowUp], [Key::S, Key::ArrowDown]);
        let len = x.hypot(y);
        if len == 0.0 {
            (0.0, 0.0)
        } else {
            (x / len, y / len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_movement_is_normalized() {
        let provider = ScriptedInput::new();
        provider.press(Key::W);
        provider.press(Key::ArrowRight);
        let state = InputState::new();
        state.sample(&provider);
        let (x, y) = state.movement();
        assert!((x.hypot(y) - 1.0).abs() < 1e-12);
        assert!(x > 0.0 && y < 0.0);
    }

    #[test]
    fn opposite_keys_cancel() {
        let provider = ScriptedInput::new();
        provider.press(Key::A);
        provider.press(Key::D);
        let state = InputState::new();
        state.sample(&provider);
        assert_eq!(state.movement(), (0.0, 0.0));
    }

    #[test]
    fn just_pressed_is_an_edge() {
        let provider = ScriptedInput::new();
        let state = InputState::new();
        provider.press(Key::Pause);
        state.sample(&provider);
        assert!(state.just_pressed(Key::Pause));
        state.sample(&provider);
        assert!(state.is_pressed(Key::Pause));
        assert!(!state.just_pressed(Key::Pause));
    }
}
