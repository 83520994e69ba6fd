//! Character controller tuning

use serde::{Deserialize, Serialize};

/// Tunables for [`super::CharacterController`]. Distances in meters, angles
/// in degrees, SDF thresholds in field units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerParams {
    /// Horizontal speed on the ground and in noclip
    pub move_speed: f32,
    /// Radians per unit of look delta
    pub mouse_sensitivity: f32,
    /// Vertical acceleration (negative is down)
    pub gravity: f32,
    pub jump_speed: f32,
    pub max_jumps: u32,
    /// Eye sits at the center, probes at +/- half height
    pub player_height: f32,
    pub max_walkable_slope: f32,
    pub max_fall_speed: f32,
    /// Fraction of ground acceleration available in the air
    pub air_control: f32,
    /// Air speed cap as a multiple of `move_speed`
    pub air_speed_cap: f32,
    /// Friction decay rate per second
    pub friction: f32,

    // Ground probe
    pub ground_probe_threshold: f32,
    pub max_grounding_up_velocity: f32,
    pub embed_threshold: f32,
    pub embed_correction: f32,
    pub snap_band: f32,
    pub snap_correction: f32,
    pub slope_slide_factor: f32,
    pub uphill_penalty: f32,

    // Body, eye and unstuck probes
    pub wall_threshold: f32,
    pub wall_push: f32,
    pub eye_clearance: f32,
    pub eye_push: f32,
    pub unstuck_threshold: f32,
    pub unstuck_push: f32,

    /// Central-difference step for probe gradients
    pub gradient_step: f32,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            move_speed: 8.0,
            mouse_sensitivity: 0.002,
            gravity: -20.0,
            jump_speed: 8.0,
            max_jumps: 2,
            player_height: 1.8,
            max_walkable_slope: 50.0,
            max_fall_speed: 50.0,
            air_control: 0.3,
            air_speed_cap: 1.2,
            friction: 15.0,
            ground_probe_threshold: -0.5,
            max_grounding_up_velocity: 0.5,
            embed_threshold: 0.05,
            embed_correction: 0.5,
            snap_band: 0.1,
            snap_correction: 0.3,
            slope_slide_factor: 0.3,
            uphill_penalty: 0.5,
            wall_threshold: 0.05,
            wall_push: 0.7,
            eye_clearance: 0.2,
            eye_push: 0.3,
            unstuck_threshold: 0.8,
            unstuck_push: 2.0,
            gradient_step: 0.1,
        }
    }
}

impl ControllerParams {
    /// Basic sanity checks, returns a description of the first problem
    pub fn check(&self) -> Option<String> {
        if self.max_jumps == 0 {
            return Some("max_jumps must be at least 1".into());
        }
        if self.player_height <= 0.0 || self.gradient_step <= 0.0 {
            return Some("player_height and gradient_step must be positive".into());
        }
        if self.unstuck_threshold <= self.wall_threshold {
            return Some("unstuck_threshold must exceed wall_threshold".into());
        }
        if !(self.max_walkable_slope > 0.0 && self.max_walkable_slope <= 90.0) {
            return Some("max_walkable_slope must be within (0, 90] degrees".into());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_check() {
        assert_eq!(ControllerParams::default().check(), None);
    }

    #[test]
    fn test_check_rejects_zero_jumps() {
        let params = ControllerParams { max_jumps: 0, ..Default::default() };
        assert!(params.check().is_some());
    }

    #[test]
    fn test_check_walkable_slope_range() {
        for slope in [0.0, -5.0, 91.0, f32::NAN] {
            let params = ControllerParams { max_walkable_slope: slope, ..Default::default() };
            assert!(params.check().is_some(), "slope {} accepted", slope);
        }
        let vertical = ControllerParams { max_walkable_slope: 90.0, ..Default::default() };
        assert_eq!(vertical.check(), None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params: ControllerParams = serde_json::from_str(r#"{ "move_speed": 12.0 }"#).unwrap();
        assert_eq!(params.move_speed, 12.0);
        assert_eq!(params.gravity, -20.0);
        assert_eq!(params.max_jumps, 2);
    }
}
