//! Input state tracking
//!
//! Raw keyboard state is folded into logical actions once per tick. Edge
//! detection lives on each `InputState` instance, so independent
//! controllers never share "was this held last tick" state.

use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Logical actions the character controller understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
    Jump,
    ToggleNoclip,
    Ascend,
    Descend,
}

impl Action {
    /// Number of distinct actions
    pub const COUNT: usize = 8;

    /// All actions in index order
    pub const ALL: [Action; Action::COUNT] = [
        Action::MoveForward,
        Action::MoveBack,
        Action::MoveLeft,
        Action::MoveRight,
        Action::Jump,
        Action::ToggleNoclip,
        Action::Ascend,
        Action::Descend,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Maps physical keys to logical actions. One key may drive several actions
/// (space is both jump and noclip ascend).
#[derive(Clone, Debug)]
pub struct KeyBindings {
    bindings: Vec<(KeyCode, Action)>,
}

impl KeyBindings {
    /// Create an empty binding table
    pub fn empty() -> Self {
        Self { bindings: Vec::new() }
    }

    /// Bind a key to an action
    pub fn bind(&mut self, key: KeyCode, action: Action) {
        if !self.bindings.contains(&(key, action)) {
            self.bindings.push((key, action));
        }
    }

    /// Actions driven by `key`
    pub fn actions_for(&self, key: KeyCode) -> impl Iterator<Item = Action> + '_ {
        self.bindings
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, a)| *a)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut b = Self::empty();
        b.bind(KeyCode::KeyW, Action::MoveForward);
        b.bind(KeyCode::KeyS, Action::MoveBack);
        b.bind(KeyCode::KeyA, Action::MoveLeft);
        b.bind(KeyCode::KeyD, Action::MoveRight);
        b.bind(KeyCode::Space, Action::Jump);
        b.bind(KeyCode::Space, Action::Ascend);
        b.bind(KeyCode::ShiftLeft, Action::Descend);
        b.bind(KeyCode::KeyN, Action::ToggleNoclip);
        b
    }
}

/// Tracks logical action state across ticks
#[derive(Clone, Debug)]
pub struct InputState {
    /// Actions held this tick
    pressed: [bool; Action::COUNT],
    /// Actions held at the end of the previous tick
    previous: [bool; Action::COUNT],
    /// Look delta accumulated since the last tick
    look_delta: (f32, f32),
    bindings: KeyBindings,
}

impl InputState {
    /// Create new input state with the default key bindings
    pub fn new() -> Self {
        Self::with_bindings(KeyBindings::default())
    }

    /// Create new input state with custom key bindings
    pub fn with_bindings(bindings: KeyBindings) -> Self {
        Self {
            pressed: [false; Action::COUNT],
            previous: [false; Action::COUNT],
            look_delta: (0.0, 0.0),
            bindings,
        }
    }

    /// Process a window event
    pub fn process_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput {
            event: KeyEvent {
                physical_key: PhysicalKey::Code(key_code),
                state,
                ..
            },
            ..
        } = event
        {
            self.process_key(*key_code, *state);
        }
    }

    /// Apply a raw key transition through the bindings
    pub fn process_key(&mut self, key: KeyCode, state: ElementState) {
        let down = state == ElementState::Pressed;
        let actions: Vec<Action> = self.bindings.actions_for(key).collect();
        for action in actions {
            self.pressed[action.index()] = down;
        }
    }

    /// Process device event for raw mouse motion
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        self.look_delta.0 += delta.0 as f32;
        self.look_delta.1 += delta.1 as f32;
    }

    /// Directly set an action (scripted input, tests)
    pub fn set_pressed(&mut self, action: Action, pressed: bool) {
        self.pressed[action.index()] = pressed;
    }

    /// Check if action is currently held
    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed[action.index()]
    }

    /// Check if action went down this tick
    pub fn is_just_pressed(&self, action: Action) -> bool {
        self.pressed[action.index()] && !self.previous[action.index()]
    }

    /// Check if action went up this tick
    pub fn is_just_released(&self, action: Action) -> bool {
        !self.pressed[action.index()] && self.previous[action.index()]
    }

    /// Look delta accumulated since the last tick
    pub fn look_delta(&self) -> (f32, f32) {
        self.look_delta
    }

    /// Call at end of tick to roll edge state and reset the look delta
    pub fn end_tick(&mut self) {
        self.previous = self.pressed;
        self.look_delta = (0.0, 0.0);
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_detection() {
        let mut input = InputState::new();
        assert!(!input.is_pressed(Action::Jump));

        input.process_key(KeyCode::Space, ElementState::Pressed);
        assert!(input.is_pressed(Action::Jump));
        assert!(input.is_just_pressed(Action::Jump));

        input.end_tick();

        // Still held, no longer an edge
        assert!(input.is_pressed(Action::Jump));
        assert!(!input.is_just_pressed(Action::Jump));

        input.process_key(KeyCode::Space, ElementState::Released);
        assert!(input.is_just_released(Action::Jump));
    }

    #[test]
    fn test_shared_key_drives_both_actions() {
        let mut input = InputState::new();
        input.process_key(KeyCode::Space, ElementState::Pressed);
        assert!(input.is_pressed(Action::Jump));
        assert!(input.is_pressed(Action::Ascend));
        assert!(!input.is_pressed(Action::Descend));
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let mut a = InputState::new();
        let b = InputState::new();
        a.set_pressed(Action::ToggleNoclip, true);
        assert!(a.is_just_pressed(Action::ToggleNoclip));
        assert!(!b.is_pressed(Action::ToggleNoclip));
    }

    #[test]
    fn test_look_delta_resets() {
        let mut input = InputState::new();
        input.process_mouse_motion((3.0, -2.0));
        input.process_mouse_motion((1.0, 1.0));
        assert_eq!(input.look_delta(), (4.0, -1.0));

        input.end_tick();
        assert_eq!(input.look_delta(), (0.0, 0.0));
    }

    #[test]
    fn test_unbound_key_ignored() {
        let mut input = InputState::with_bindings(KeyBindings::empty());
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        assert!(Action::ALL.iter().all(|a| !input.is_pressed(*a)));
    }
}
