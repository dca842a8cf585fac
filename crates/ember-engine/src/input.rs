//! Platform input, folded into per-frame state.
//!
//! The windowing layer turns OS messages into [`InputEvent`]s; the frame loop
//! applies them to an [`InputState`] that systems read through the
//! [`FrameContext`](crate::frame::FrameContext).

use std::collections::HashSet;

/// Keys the engine distinguishes. Anything else arrives as [`Key::Other`]
/// carrying the platform's virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    Space,
    Escape,
    Other(u32),
}

/// An event produced by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(Key),
    KeyReleased(Key),
    /// The client area changed size, in pixels.
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// Held keys and window state as of the current frame.
#[derive(Debug, Clone)]
pub struct InputState {
    held: HashSet<Key>,
    window_size: (u32, u32),
    /// Latest resize seen this frame.
    resized: Option<(u32, u32)>,
    close_requested: bool,
}

impl InputState {
    /// Start with nothing held and the given window size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            held: HashSet::new(),
            window_size: (width, height),
            resized: None,
            close_requested: false,
        }
    }

    /// Forget per-frame notifications. Held keys carry over.
    pub fn begin_frame(&mut self) {
        self.resized = None;
    }

    /// Fold one event into the state.
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyPressed(key) => {
                self.held.insert(key);
            }
            InputEvent::KeyReleased(key) => {
                self.held.remove(&key);
            }
            InputEvent::Resized { width, height } => {
                self.window_size = (width, height);
                self.resized = Some((width, height));
            }
            InputEvent::CloseRequested => self.close_requested = true,
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    /// The size from the most recent resize this frame, if any.
    pub fn resized(&self) -> Option<(u32, u32)> {
        self.resized
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Unit-length movement direction from WASD / arrow keys.
    ///
    /// `+x` is right and `+z` is forward; opposing keys cancel. Returns zero
    /// when nothing (or only opposing keys) is held.
    pub fn movement_axis(&self) -> [f32; 3] {
        let axis = |pos: [Key; 2], neg: [Key; 2]| -> f32 {
            let held = |keys: [Key; 2]| keys.iter().any(|k| self.held.contains(k));
            f32::from(u8::from(held(pos))) - f32::from(u8::from(held(neg)))
        };
        let x = axis([Key::D, Key::Right], [Key::A, Key::Left]);
        let z = axis([Key::W, Key::Up], [Key::S, Key::Down]);
        let len = (x * x + z * z).sqrt();
        if len == 0.0 {
            [0.0; 3]
        } else {
            [x / len, 0.0, z / len]
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}
