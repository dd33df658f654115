use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Keys the stage reacts to. Backends map their own key codes onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    I,
    K,
    U,
    O,
    J,
    L,
    LShift,
    RShift,
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    F,
    G,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Unbuffered snapshot of what is held down right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    keys: BTreeSet<Key>,
    buttons: BTreeSet<MouseButton>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: Key, down: bool) {
        if down {
            self.keys.insert(key);
        } else {
            self.keys.remove(&key);
        }
    }

    pub fn set_button(&mut self, button: MouseButton, down: bool) {
        if down {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn shift(&self) -> bool {
        self.is_key_down(Key::LShift) || self.is_key_down(Key::RShift)
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }

    /// Snapshot with exactly the given keys and buttons held.
    pub fn holding(keys: &[Key], buttons: &[MouseButton]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            buttons: buttons.iter().copied().collect(),
        }
    }
}
