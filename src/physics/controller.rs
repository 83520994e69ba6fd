//! First-person character controller colliding against an SDF
//!
//! All collision comes from point samples of the field and its numerical
//! gradient: a ground probe below the eye, a head probe above it, a body
//! probe at the eye, then eye clearance and an unstuck escape after the
//! position is committed.

use glam::Vec3;

use super::params::ControllerParams;
use crate::core::input::{Action, InputState};
use crate::voxel::sampler::{surface_normal, FieldSampler, ScalarField};
use crate::voxel::store::ChunkStore;

/// Observer spawn point
pub const DEFAULT_SPAWN: Vec3 = Vec3::new(0.0, 20.0, 10.0);

/// Initial yaw, facing -Z
const DEFAULT_YAW_DEGREES: f32 = -90.0;

/// Pitch limit in degrees
const PITCH_LIMIT_DEGREES: f32 = 89.0;

/// Horizontal speeds below this count as stopped
const STOP_SPEED: f32 = 0.001;

/// Slope modulation only applies above this horizontal speed
const MIN_SLOPE_SPEED: f32 = 0.1;

/// Alignment with the uphill direction needed before the penalty applies
const UPHILL_ALIGNMENT: f32 = 0.1;

/// Movement mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveMode {
    /// Full physics
    Walking,
    /// Free flight, no collision
    Noclip,
}

/// Observer state, mutated once per tick
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterState {
    /// Eye position (body center)
    pub position: Vec3,
    pub velocity: Vec3,
    /// Radians
    pub yaw: f32,
    /// Radians
    pub pitch: f32,
    pub grounded: bool,
    /// Outward normal of the last probed ground
    pub ground_normal: Vec3,
    pub jumps_remaining: u32,
    pub mode: MoveMode,
}

impl CharacterState {
    pub fn new(position: Vec3, max_jumps: u32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            yaw: DEFAULT_YAW_DEGREES.to_radians(),
            pitch: 0.0,
            grounded: false,
            ground_normal: Vec3::Y,
            jumps_remaining: max_jumps,
            mode: MoveMode::Walking,
        }
    }

    /// View direction
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        )
        .normalize()
    }

    /// View right vector (always horizontal)
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// View up vector
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    /// Angle between the ground normal and world up, in degrees
    pub fn slope_angle(&self) -> f32 {
        slope_degrees(self.ground_normal)
    }

    pub fn is_noclip(&self) -> bool {
        self.mode == MoveMode::Noclip
    }

    /// Horizontal speed
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }
}

fn slope_degrees(normal: Vec3) -> f32 {
    normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Moves a [`CharacterState`] through the field, one fixed tick at a time
pub struct CharacterController {
    state: CharacterState,
    params: ControllerParams,
}

impl CharacterController {
    pub fn new(spawn: Vec3, params: ControllerParams) -> Self {
        Self {
            state: CharacterState::new(spawn, params.max_jumps),
            params,
        }
    }

    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CharacterState {
        &mut self.state
    }

    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    /// Apply a look delta in input units
    pub fn look(&mut self, dx: f32, dy: f32) {
        let sensitivity = self.params.mouse_sensitivity;
        let limit = PITCH_LIMIT_DEGREES.to_radians();
        self.state.yaw += dx * sensitivity;
        self.state.pitch = (self.state.pitch - dy * sensitivity).clamp(-limit, limit);
    }

    /// Switch between walking and noclip
    pub fn toggle_noclip(&mut self) {
        self.state.mode = match self.state.mode {
            MoveMode::Walking => MoveMode::Noclip,
            MoveMode::Noclip => MoveMode::Walking,
        };
        log::info!("Noclip {}", if self.state.is_noclip() { "enabled" } else { "disabled" });
    }

    /// Spend one jump. No-op in noclip or with no jumps left.
    pub fn jump(&mut self) -> bool {
        let s = &mut self.state;
        if s.is_noclip() || s.jumps_remaining == 0 {
            return false;
        }
        s.velocity.y = self.params.jump_speed;
        s.jumps_remaining -= 1;
        s.grounded = false;
        true
    }

    /// Advance one tick against the chunks in `store`
    pub fn tick(&mut self, input: &InputState, store: &ChunkStore, dt: f32) {
        self.step(input, &FieldSampler::new(store), dt);
    }

    /// Advance one tick against an arbitrary field
    pub fn step<F: ScalarField + ?Sized>(&mut self, input: &InputState, field: &F, dt: f32) {
        if input.is_just_pressed(Action::ToggleNoclip) {
            self.toggle_noclip();
        }
        let (dx, dy) = input.look_delta();
        if dx != 0.0 || dy != 0.0 {
            self.look(dx, dy);
        }

        if self.state.is_noclip() {
            self.fly(input, dt);
        } else {
            // Movement sees the grounded flag from the last tick, before a
            // jump clears it
            self.apply_horizontal_input(input, dt);
            if input.is_just_pressed(Action::Jump) {
                self.jump();
            }
            self.apply_gravity(dt);
            self.resolve(field, dt);
        }

        debug_assert!(self.state.jumps_remaining <= self.params.max_jumps);
        log::trace!(
            "tick: pos={:?} vel={:?} grounded={} jumps={}",
            self.state.position,
            self.state.velocity,
            self.state.grounded,
            self.state.jumps_remaining
        );
    }

    fn fly(&mut self, input: &InputState, dt: f32) {
        let s = &mut self.state;
        let mut dir = Vec3::ZERO;
        if input.is_pressed(Action::MoveForward) {
            dir += s.forward();
        }
        if input.is_pressed(Action::MoveBack) {
            dir -= s.forward();
        }
        if input.is_pressed(Action::MoveRight) {
            dir += s.right();
        }
        if input.is_pressed(Action::MoveLeft) {
            dir -= s.right();
        }
        if input.is_pressed(Action::Ascend) {
            dir += Vec3::Y;
        }
        if input.is_pressed(Action::Descend) {
            dir -= Vec3::Y;
        }
        s.position += dir * self.params.move_speed * dt;
        s.grounded = false;
    }

    fn apply_gravity(&mut self, dt: f32) {
        let v = &mut self.state.velocity;
        v.y = (v.y + self.params.gravity * dt).max(-self.params.max_fall_speed);
    }

    /// Desired horizontal direction from movement keys, unit length or zero
    fn wish_direction(&self, input: &InputState) -> Vec3 {
        let forward = self.state.forward();
        let forward = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        let right = self.state.right();
        let mut dir = Vec3::ZERO;
        if input.is_pressed(Action::MoveForward) {
            dir += forward;
        }
        if input.is_pressed(Action::MoveBack) {
            dir -= forward;
        }
        if input.is_pressed(Action::MoveRight) {
            dir += right;
        }
        if input.is_pressed(Action::MoveLeft) {
            dir -= right;
        }
        if dir.length() > STOP_SPEED { dir.normalize() } else { Vec3::ZERO }
    }

    fn apply_horizontal_input(&mut self, input: &InputState, dt: f32) {
        let wish = self.wish_direction(input);
        let p = &self.params;
        let s = &mut self.state;

        if wish != Vec3::ZERO {
            if s.grounded {
                s.velocity.x = wish.x * p.move_speed;
                s.velocity.z = wish.z * p.move_speed;
            } else {
                let accel = wish * p.move_speed * p.air_control * dt;
                s.velocity.x += accel.x;
                s.velocity.z += accel.z;
                let cap = p.move_speed * p.air_speed_cap;
                let speed = s.horizontal_speed();
                if speed > cap {
                    let scale = cap / speed;
                    s.velocity.x *= scale;
                    s.velocity.z *= scale;
                }
            }
        } else if s.grounded {
            let speed = s.horizontal_speed();
            if speed > STOP_SPEED {
                let new_speed = (speed - speed * p.friction * dt).max(0.0);
                let scale = new_speed / speed;
                s.velocity.x *= scale;
                s.velocity.z *= scale;
            } else {
                s.velocity.x = 0.0;
                s.velocity.z = 0.0;
            }
        }
    }

    /// Integrate and resolve collisions against the field
    fn resolve<F: ScalarField + ?Sized>(&mut self, field: &F, dt: f32) {
        let p = &self.params;
        let s = &mut self.state;
        let half_height = p.player_height * 0.5;
        let mut next = s.position + s.velocity * dt;

        // Ground probe
        s.grounded = false;
        let feet = next - Vec3::Y * half_height;
        let feet_sdf = field.sample(feet);
        if feet_sdf > p.ground_probe_threshold && s.velocity.y <= p.max_grounding_up_velocity {
            let normal = surface_normal(field, feet, p.gradient_step);
            s.ground_normal = normal;
            if slope_degrees(normal) <= p.max_walkable_slope {
                s.grounded = true;
                s.jumps_remaining = p.max_jumps;
                s.velocity.y = 0.0;
                if feet_sdf > p.embed_threshold {
                    next.y += feet_sdf * p.embed_correction;
                } else if feet_sdf < 0.0 && feet_sdf > -p.snap_band {
                    next.y += feet_sdf * p.snap_correction;
                }
            } else {
                // Too steep to stand on: slide down the horizontal projection
                let downhill = Vec3::new(normal.x, 0.0, normal.z);
                if downhill.length() > STOP_SPEED {
                    s.velocity += downhill.normalize() * p.gravity.abs() * dt * p.slope_slide_factor;
                }
            }
        }

        // Uphill penalty
        let horizontal = Vec3::new(s.velocity.x, 0.0, s.velocity.z);
        if s.grounded && horizontal.length() > MIN_SLOPE_SPEED {
            let n = s.ground_normal;
            let right = n.cross(Vec3::Y);
            let right = if right.length() < STOP_SPEED { Vec3::X } else { right.normalize() };
            let slope_forward = right.cross(n).normalize_or_zero();
            let slope = slope_degrees(n);
            if slope > 0.0 && horizontal.normalize().dot(slope_forward) > UPHILL_ALIGNMENT {
                let factor = 1.0 - (slope / p.max_walkable_slope) * p.uphill_penalty;
                s.velocity.x *= factor;
                s.velocity.z *= factor;
            }
        }

        // Head probe
        if field.sample(next + Vec3::Y * half_height) > 0.0 {
            next.y = s.position.y;
            s.velocity.y = s.velocity.y.min(0.0);
        }

        // Body probe and wall slide
        let body_sdf = field.sample(next);
        if body_sdf > p.wall_threshold {
            let wall = surface_normal(field, next, p.gradient_step);
            next += wall * body_sdf * p.wall_push;
            s.velocity -= wall * s.velocity.dot(wall);
        }

        s.position = next;

        // Eye clearance
        let eye_sdf = field.sample(s.position);
        if eye_sdf > -p.eye_clearance && eye_sdf < p.eye_clearance * 0.5 {
            let away = surface_normal(field, s.position, p.gradient_step);
            s.position += away * (p.eye_clearance - eye_sdf) * p.eye_push;
        }

        // Unstuck escape
        if body_sdf > p.unstuck_threshold {
            let away = surface_normal(field, s.position, p.gradient_step);
            s.position += away * (body_sdf - p.unstuck_threshold) * p.unstuck_push;
            s.velocity *= 0.5;
            log::debug!("Unstuck push at {:?} (penetration {:.2})", s.position, body_sdf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::sampler::AIR_SENTINEL;

    const DT: f32 = 1.0 / 60.0;

    fn flat_ground(p: Vec3) -> f32 {
        -p.y
    }

    fn controller_at(pos: Vec3) -> CharacterController {
        CharacterController::new(pos, ControllerParams::default())
    }

    #[test]
    fn test_initial_orientation() {
        let c = controller_at(DEFAULT_SPAWN);
        let s = c.state();
        assert_eq!(s.position, Vec3::new(0.0, 20.0, 10.0));
        assert!((s.forward() - Vec3::NEG_Z).length() < 1e-5);
        assert!((s.right() - Vec3::X).length() < 1e-5);
        assert!((s.up() - Vec3::Y).length() < 1e-5);
        assert_eq!(s.jumps_remaining, 2);
    }

    #[test]
    fn test_look_clamps_pitch() {
        let mut c = controller_at(Vec3::ZERO);
        let yaw = c.state().yaw;
        c.look(100.0, 0.0);
        assert!((c.state().yaw - (yaw + 0.2)).abs() < 1e-5);

        c.look(0.0, -1.0e6);
        assert!((c.state().pitch - 89f32.to_radians()).abs() < 1e-5);
        c.look(0.0, 1.0e6);
        assert!((c.state().pitch + 89f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn test_jump_budget() {
        let mut c = controller_at(Vec3::ZERO);
        c.state_mut().grounded = true;

        assert!(c.jump());
        assert_eq!(c.state().jumps_remaining, 1);
        assert_eq!(c.state().velocity.y, 8.0);

        assert!(c.jump());
        assert_eq!(c.state().jumps_remaining, 0);

        c.state_mut().velocity.y = -3.0;
        assert!(!c.jump());
        assert_eq!(c.state().velocity.y, -3.0);
        assert_eq!(c.state().jumps_remaining, 0);
    }

    #[test]
    fn test_jump_is_edge_triggered() {
        let mut c = controller_at(Vec3::new(0.0, 50.0, 0.0));
        let mut input = InputState::new();
        let air = |_: Vec3| AIR_SENTINEL;

        input.set_pressed(Action::Jump, true);
        for _ in 0..5 {
            c.step(&input, &air, DT);
            input.end_tick();
        }
        assert_eq!(c.state().jumps_remaining, 1);
    }

    #[test]
    fn test_landing_restores_jumps() {
        let mut c = controller_at(Vec3::new(0.0, 0.9, 0.0));
        c.state_mut().jumps_remaining = 0;
        c.step(&InputState::new(), &flat_ground, DT);
        assert!(c.state().grounded);
        assert_eq!(c.state().jumps_remaining, 2);
    }

    #[test]
    fn test_jump_keeps_ground_speed_on_takeoff() {
        let mut c = controller_at(Vec3::new(0.0, 0.9, 0.0));
        let mut input = InputState::new();
        c.step(&input, &flat_ground, DT);
        assert!(c.state().grounded);
        input.end_tick();

        input.set_pressed(Action::MoveForward, true);
        input.set_pressed(Action::Jump, true);
        c.step(&input, &flat_ground, DT);

        let s = c.state();
        assert!(!s.grounded);
        assert_eq!(s.jumps_remaining, 1);
        assert!((s.horizontal_speed() - 8.0).abs() < 1e-4, "takeoff speed {}", s.horizontal_speed());
        assert!((s.velocity.y - (8.0 - 20.0 * DT)).abs() < 1e-4);
    }

    #[test]
    fn test_embedded_feet_pushed_out() {
        let mut c = controller_at(Vec3::new(0.0, 0.7, 0.0));
        c.step(&InputState::new(), &flat_ground, DT);

        // Tentative y drops by one tick of gravity, then half the
        // penetration at the feet is pushed back out
        let tentative = 0.7 - 20.0 * DT * DT;
        let penetration = 0.9 - tentative;
        let expected = tentative + penetration * 0.5;
        let s = c.state();
        assert!(s.grounded);
        assert_eq!(s.velocity.y, 0.0);
        assert!((s.position.y - expected).abs() < 1e-4, "y {} vs {}", s.position.y, expected);
        assert!((s.position.y - 0.7972).abs() < 1e-3);
    }

    #[test]
    fn test_hovering_feet_snap_down() {
        let start = 0.96;
        let mut c = controller_at(Vec3::new(0.0, start, 0.0));
        c.step(&InputState::new(), &flat_ground, DT);

        let tentative = start - 20.0 * DT * DT;
        let gap = tentative - 0.9;
        assert!(gap > 0.0 && gap < 0.1);
        let expected = tentative - gap * 0.3;
        let s = c.state();
        assert!(s.grounded);
        assert!((s.position.y - expected).abs() < 1e-4, "y {} vs {}", s.position.y, expected);
    }

    #[test]
    fn test_eye_clearance_nudges_away_from_wall() {
        let wall = |p: Vec3| p.x - 5.0;
        let mut c = controller_at(Vec3::new(4.9, 10.0, 0.0));
        c.step(&InputState::new(), &wall, DT);

        // Eye sdf -0.1 is inside the band: push (0.2 + 0.1) * 0.3 along -x
        assert!((c.state().position.x - 4.81).abs() < 1e-4, "x {}", c.state().position.x);
    }

    #[test]
    fn test_flat_ground_with_zero_walkable_slope_stays_finite() {
        let params = ControllerParams { max_walkable_slope: 0.0, ..Default::default() };
        let mut c = CharacterController::new(Vec3::new(0.0, 0.9, 0.0), params);
        let mut input = InputState::new();
        c.step(&input, &flat_ground, DT);

        input.set_pressed(Action::MoveBack, true);
        for _ in 0..3 {
            c.step(&input, &flat_ground, DT);
        }
        let s = c.state();
        assert!(s.velocity.is_finite(), "velocity {:?}", s.velocity);
        assert!(s.position.is_finite(), "position {:?}", s.position);
    }

    #[test]
    fn test_free_fall_clamped() {
        let mut c = controller_at(Vec3::new(0.0, 500.0, 0.0));
        let input = InputState::new();
        let air = |_: Vec3| AIR_SENTINEL;
        for _ in 0..600 {
            c.step(&input, &air, DT);
        }
        assert_eq!(c.state().velocity.y, -50.0);
        assert!(!c.state().grounded);
    }

    #[test]
    fn test_friction_converges_to_zero() {
        let mut c = controller_at(Vec3::new(0.0, 0.9, 0.0));
        let input = InputState::new();
        c.step(&input, &flat_ground, DT);
        assert!(c.state().grounded);

        c.state_mut().velocity.x = 6.0;
        c.state_mut().velocity.z = -2.0;
        let mut prev = c.state().horizontal_speed();
        let mut ticks = 0;
        while prev > 0.0 {
            c.step(&input, &flat_ground, DT);
            let speed = c.state().horizontal_speed();
            assert!(speed < prev, "speed went from {} to {}", prev, speed);
            prev = speed;
            ticks += 1;
            assert!(ticks < 100, "friction did not converge");
        }
        assert_eq!(c.state().horizontal_speed(), 0.0);
        assert!(c.state().grounded);
    }

    #[test]
    fn test_ground_normal_on_stored_plane() {
        let mut store = ChunkStore::new();
        for chunk in store.update(Vec3::ZERO, 1, 2) {
            assert!(chunk.run_generation(&flat_ground));
        }

        let mut c = controller_at(Vec3::new(1.3, 0.9, 2.7));
        c.tick(&InputState::new(), &store, DT);

        let s = c.state();
        assert!(s.grounded);
        assert!((s.ground_normal - Vec3::Y).length() < 1e-4, "normal {:?}", s.ground_normal);
        assert!(s.slope_angle() < 0.01);
    }

    #[test]
    fn test_no_ground_in_unloaded_world() {
        let store = ChunkStore::new();
        let mut c = controller_at(Vec3::new(0.0, 0.9, 0.0));
        c.tick(&InputState::new(), &store, DT);
        assert!(!c.state().grounded);
        assert!(c.state().position.y < 0.9);
    }

    #[test]
    fn test_uphill_penalty() {
        // Surface rises along +x at about 26.6 degrees
        let ramp = |p: Vec3| 0.5 * p.x - p.y;
        let mut input = InputState::new();

        let mut up = controller_at(Vec3::new(0.0, 0.9, 0.0));
        up.step(&input, &ramp, DT);
        assert!(up.state().grounded);
        input.set_pressed(Action::MoveRight, true);
        up.step(&input, &ramp, DT);
        let speed = up.state().horizontal_speed();
        let expected = 8.0 * (1.0 - (26.565 / 50.0) * 0.5);
        assert!((speed - expected).abs() < 0.05, "uphill speed {}", speed);

        let mut input = InputState::new();
        let mut down = controller_at(Vec3::new(0.0, 0.9, 0.0));
        down.step(&input, &ramp, DT);
        input.set_pressed(Action::MoveLeft, true);
        down.step(&input, &ramp, DT);
        assert!((down.state().horizontal_speed() - 8.0).abs() < 1e-3);
    }

    #[test]
    fn test_steep_slope_slides_downhill() {
        // About 71.6 degrees, rising along +x
        let cliff = |p: Vec3| 3.0 * p.x - p.y;
        let mut c = controller_at(Vec3::new(0.0, 0.9, 0.0));
        c.step(&InputState::new(), &cliff, DT);
        assert!(!c.state().grounded);
        assert!(c.state().slope_angle() > 50.0);
        assert!(c.state().velocity.x < 0.0);
    }

    #[test]
    fn test_wall_slide_keeps_tangent_velocity() {
        let wall = |p: Vec3| p.x - 5.0;
        let mut c = controller_at(Vec3::new(5.2, 10.0, 0.0));
        c.state_mut().velocity = Vec3::new(3.0, 0.0, 2.0);
        c.step(&InputState::new(), &wall, DT);

        let s = c.state();
        assert!(s.position.x < 5.2);
        assert!(s.velocity.x.abs() < 1e-5);
        assert!((s.velocity.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_unstuck_escape_halves_velocity() {
        let mut c = controller_at(Vec3::new(0.0, -3.0, 0.0));
        c.state_mut().velocity = Vec3::new(4.0, 0.0, 0.0);
        c.step(&InputState::new(), &flat_ground, DT);

        let s = c.state();
        assert!(s.position.y > -3.0);
        assert!((s.velocity.x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_head_probe_blocks_rise() {
        // Ceiling at y = 2, open floor far below
        let ceiling = |p: Vec3| p.y - 2.0;
        let mut c = controller_at(Vec3::new(0.0, 1.0, 0.0));
        c.state_mut().velocity.y = 8.0;
        c.step(&InputState::new(), &ceiling, DT);
        assert!(c.state().velocity.y <= 0.0);
        assert!(c.state().position.y <= 1.0);
    }

    #[test]
    fn test_noclip_toggle_and_flight() {
        let mut c = controller_at(Vec3::new(0.0, 5.0, 0.0));
        let mut input = InputState::new();
        let air = |_: Vec3| AIR_SENTINEL;

        input.set_pressed(Action::ToggleNoclip, true);
        for _ in 0..3 {
            c.step(&input, &air, DT);
            input.end_tick();
        }
        assert!(c.state().is_noclip());
        input.set_pressed(Action::ToggleNoclip, false);

        // No gravity in noclip
        assert_eq!(c.state().position, Vec3::new(0.0, 5.0, 0.0));

        input.set_pressed(Action::MoveForward, true);
        input.set_pressed(Action::Ascend, true);
        c.step(&input, &air, DT);
        let s = c.state();
        assert!((s.position.z - (-8.0 * DT)).abs() < 1e-5);
        assert!((s.position.y - (5.0 + 8.0 * DT)).abs() < 1e-5);
        assert!(!s.grounded);

        // Jump does nothing while flying
        assert!(!c.jump());
    }

    #[test]
    fn test_air_control_capped() {
        let mut c = controller_at(Vec3::new(0.0, 100.0, 0.0));
        c.state_mut().velocity = Vec3::new(0.0, 0.0, -9.5);
        let mut input = InputState::new();
        input.set_pressed(Action::MoveForward, true);
        let air = |_: Vec3| AIR_SENTINEL;
        for _ in 0..30 {
            c.step(&input, &air, DT);
        }
        assert!(c.state().horizontal_speed() <= 8.0 * 1.2 + 1e-4);
    }
}
