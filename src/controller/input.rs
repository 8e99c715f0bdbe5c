/// Platform-agnostic input handling
use std::collections::HashSet;

/// Platform-independent input events
#[derive(Debug, Clone)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),

    /// Raw mouse movement; only accumulated while pointer capture is active.
    MouseMove { dx: f32, dy: f32 },

    FocusLost,
    VisibilityChanged { visible: bool },
    PointerLockChanged { locked: bool },
}

/// Shared input state: event callbacks write, the frame loop reads.
/// Key names are stored lowercased, so `W` and `w` act alike.
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    pub look_delta: (f32, f32),
    pub pointer_locked: bool,
    pub point_light_on: bool,
    pub mipmap_on: bool,
}

fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

impl InputState {
    pub fn new() -> Self {
        Self {
            pressed_keys: HashSet::new(),
            look_delta: (0.0, 0.0),
            pointer_locked: false,
            point_light_on: false,
            mipmap_on: false,
        }
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                let _ = self.pressed_keys.insert(normalize_key(key));
            }
            InputEvent::KeyUp(key) => {
                let _ = self.pressed_keys.remove(&normalize_key(key));
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta.0 += dx;
                    self.look_delta.1 += dy;
                }
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => {
                // a key released while we are hidden would otherwise stick
                self.clear_keys();
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
                if !locked {
                    self.look_delta = (0.0, 0.0);
                }
            }
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(&normalize_key(key))
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    /// Take the accumulated mouse delta, resetting it to zero.
    pub fn consume_look(&mut self) -> (f32, f32) {
        let result = self.look_delta;
        self.look_delta = (0.0, 0.0);
        result
    }

    pub fn toggle_point_light(&mut self) {
        self.point_light_on = !self.point_light_on;
    }

    pub fn toggle_mipmap(&mut self) {
        self.mipmap_on = !self.mipmap_on;
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Key mapping configuration
#[derive(Clone)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub rotate_up: String,
    pub rotate_down: String,
    pub rotate_left: String,
    pub rotate_right: String,
    pub toggle_light: String,
    pub toggle_mipmap: String,
    pub escape: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            rotate_up: "i".to_string(),
            rotate_down: "k".to_string(),
            rotate_left: "j".to_string(),
            rotate_right: "l".to_string(),
            toggle_light: "f".to_string(),
            toggle_mipmap: "m".to_string(),
            escape: "escape".to_string(),
        }
    }
}

/// One frame's worth of control input, snapshotted from [`InputState`].
/// The camera controller consumes this instead of raw events or key sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub rotate_up: bool,
    pub rotate_down: bool,
    pub rotate_left: bool,
    pub rotate_right: bool,
    /// Mouse delta accumulated since the last frame (already consumed from
    /// the shared state; zero unless pointer capture was active).
    pub look: (f32, f32),
}

/// High-level input processor
#[derive(Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    /// Snapshot the held keys and drain the mouse delta for this frame.
    pub fn frame_input(&self, state: &mut InputState) -> FrameInput {
        FrameInput {
            forward: state.is_key_pressed(&self.bindings.forward),
            backward: state.is_key_pressed(&self.bindings.backward),
            left: state.is_key_pressed(&self.bindings.left),
            right: state.is_key_pressed(&self.bindings.right),
            rotate_up: state.is_key_pressed(&self.bindings.rotate_up),
            rotate_down: state.is_key_pressed(&self.bindings.rotate_down),
            rotate_left: state.is_key_pressed(&self.bindings.rotate_left),
            rotate_right: state.is_key_pressed(&self.bindings.rotate_right),
            look: state.consume_look(),
        }
    }

    pub fn wants_to_toggle_light(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.bindings.toggle_light)
    }

    pub fn wants_to_toggle_mipmap(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.bindings.toggle_mipmap)
    }

    pub fn is_escape(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.bindings.escape)
    }

    pub fn is_bound(&self, key: &str) -> bool {
        let b = &self.bindings;
        [
            &b.forward,
            &b.backward,
            &b.left,
            &b.right,
            &b.rotate_up,
            &b.rotate_down,
            &b.rotate_left,
            &b.rotate_right,
            &b.toggle_light,
            &b.toggle_mipmap,
        ]
        .iter()
        .any(|bound| key.eq_ignore_ascii_case(bound))
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }

    pub fn mouse_move_to_input(dx: f32, dy: f32) -> InputEvent {
        InputEvent::MouseMove { dx, dy }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use winit::keyboard::KeyCode;

    /// The winit key codes the viewer cares about, as browser-style names.
    pub fn key_name(code: KeyCode) -> Option<&'static str> {
        match code {
            KeyCode::KeyW => Some("w"),
            KeyCode::KeyA => Some("a"),
            KeyCode::KeyS => Some("s"),
            KeyCode::KeyD => Some("d"),
            KeyCode::KeyI => Some("i"),
            KeyCode::KeyJ => Some("j"),
            KeyCode::KeyK => Some("k"),
            KeyCode::KeyL => Some("l"),
            KeyCode::KeyF => Some("f"),
            KeyCode::KeyM => Some("m"),
            KeyCode::Escape => Some("escape"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let mut state = InputState::new();
        state.process_event(&InputEvent::KeyDown("W".to_string()));
        assert!(state.is_key_pressed("w"));
        assert!(state.is_key_pressed("W"));
        state.process_event(&InputEvent::KeyUp("w".to_string()));
        assert!(!state.is_key_pressed("W"));
    }

    #[test]
    fn mouse_deltas_accumulate_only_under_pointer_lock() {
        let mut state = InputState::new();
        state.process_event(&InputEvent::MouseMove { dx: 5.0, dy: -2.0 });
        assert_eq!(state.look_delta, (0.0, 0.0));

        state.process_event(&InputEvent::PointerLockChanged { locked: true });
        state.process_event(&InputEvent::MouseMove { dx: 5.0, dy: -2.0 });
        state.process_event(&InputEvent::MouseMove { dx: 1.0, dy: 1.0 });
        assert_eq!(state.look_delta, (6.0, -1.0));
    }

    #[test]
    fn consume_look_is_edge_triggered() {
        let mut state = InputState::new();
        state.pointer_locked = true;
        state.process_event(&InputEvent::MouseMove { dx: 3.0, dy: 4.0 });
        assert_eq!(state.consume_look(), (3.0, 4.0));
        assert_eq!(state.consume_look(), (0.0, 0.0));
    }

    #[test]
    fn losing_focus_clears_held_keys() {
        let mut state = InputState::new();
        state.process_event(&InputEvent::KeyDown("w".to_string()));
        state.process_event(&InputEvent::KeyDown("d".to_string()));
        state.process_event(&InputEvent::FocusLost);
        assert!(state.pressed_keys.is_empty());
    }

    #[test]
    fn unlocking_the_pointer_drops_pending_deltas() {
        let mut state = InputState::new();
        state.pointer_locked = true;
        state.process_event(&InputEvent::MouseMove { dx: 9.0, dy: 9.0 });
        state.process_event(&InputEvent::PointerLockChanged { locked: false });
        assert_eq!(state.consume_look(), (0.0, 0.0));
    }

    #[test]
    fn frame_input_snapshots_bindings_and_drains_look() {
        let mut state = InputState::new();
        let processor = InputProcessor::default();
        state.process_event(&InputEvent::KeyDown("W".to_string()));
        state.process_event(&InputEvent::KeyDown("l".to_string()));
        state.pointer_locked = true;
        state.process_event(&InputEvent::MouseMove { dx: 2.0, dy: 0.5 });

        let frame = processor.frame_input(&mut state);
        assert!(frame.forward);
        assert!(frame.rotate_right);
        assert!(!frame.backward);
        assert_eq!(frame.look, (2.0, 0.5));
        assert_eq!(state.look_delta, (0.0, 0.0));
    }

    #[test]
    fn toggles_latch() {
        let mut state = InputState::new();
        state.toggle_point_light();
        state.toggle_mipmap();
        assert!(state.point_light_on);
        assert!(state.mipmap_on);
        state.toggle_point_light();
        assert!(!state.point_light_on);
    }

    #[test]
    fn processor_recognizes_toggle_keys() {
        let processor = InputProcessor::default();
        assert!(processor.wants_to_toggle_light("F"));
        assert!(processor.wants_to_toggle_mipmap("m"));
        assert!(!processor.wants_to_toggle_light("g"));
        assert!(processor.is_bound("W"));
        assert!(!processor.is_bound("q"));
    }
}
