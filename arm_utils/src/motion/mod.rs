//! Pose-to-pose motion planning:
//! - shoulder delta from the change in elbow bearing, wrapped to (-180, 180]
//! - elbow delta measured about the new elbow, with a guard that never
//!   sweeps the lower arm across the upper arm
//! - angle deltas quantized to stepper pulses
//!
//! `plan_motion` is the single entry point: it gates the target, solves the
//! elbow, derives both joint commands and returns the successor state. The
//! caller owns the state and commits it (or not) together with emission.

use crate::ik::{self, ArmGeom, IkError, Vec2};

mod controller;

pub use controller::{CycleError, MotionController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointId {
    Shoulder,
    Elbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Cw,
    Ccw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointCommand {
    pub joint: JointId,
    pub direction: StepDirection,
    pub steps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionPlan {
    pub shoulder: JointCommand,
    pub elbow: JointCommand,
}

impl MotionPlan {
    /// True when the plan moves neither joint.
    pub fn is_noop(&self) -> bool {
        self.shoulder.steps == 0 && self.elbow.steps == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// Target rejected by the workspace box before solving.
    OutOfRange,
    /// Target passed the box but the solver found no elbow for it.
    Ik(IkError),
}

/// Arm pose threaded through consecutive planning calls. `hand`/`elbow`
/// stay consistent with the link lengths; the `*_prev` fields hold the
/// pose before the last accepted cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmState {
    pub hand_prev: Vec2,
    pub hand: Vec2,
    pub elbow_prev: Vec2,
    pub elbow: Vec2,
    pub target: Vec2,
}

impl ArmState {
    /// Startup pose: arm straight up, fully extended.
    pub fn calibrated(geom: &ArmGeom) -> Self {
        let hand = Vec2::new(0.0, geom.upper + geom.lower);
        let elbow = Vec2::new(0.0, geom.upper);
        Self {
            hand_prev: hand,
            hand,
            elbow_prev: elbow,
            elbow,
            target: hand,
        }
    }
}

/// Wrap an angle difference into (-180, 180]. Inputs come from subtracting
/// two atan2 results, so a single 360 adjustment is enough.
fn wrap_degrees(deg: f64) -> f64 {
    if deg > 180.0 {
        deg - 360.0
    } else if deg <= -180.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Wrap into [0, 360).
fn wrap_turn_pos(deg: f64) -> f64 {
    deg.rem_euclid(360.0)
}

/// Wrap into (-360, 0].
fn wrap_turn_neg(deg: f64) -> f64 {
    let m = deg.rem_euclid(360.0);
    if m == 0.0 { 0.0 } else { m - 360.0 }
}

fn steps_for(degrees_abs: f64, geom: &ArmGeom) -> u32 {
    (degrees_abs / geom.degrees_per_step).round() as u32
}

/// Shoulder rotation that carries the elbow from its previous bearing to
/// the new one, taking the short way around.
fn shoulder_command(prev_elbow: Vec2, new_elbow: Vec2, geom: &ArmGeom) -> JointCommand {
    let delta = wrap_degrees(new_elbow.bearing_deg() - prev_elbow.bearing_deg());
    let direction = if delta >= 0.0 {
        StepDirection::Ccw
    } else {
        StepDirection::Cw
    };
    JointCommand {
        joint: JointId::Shoulder,
        direction,
        steps: steps_for(delta.abs(), geom),
    }
}

/// Elbow rotation that swings the hand onto the target, detouring the long
/// way around whenever the direct sweep would cross the upper arm.
///
/// Both the hand and the target are re-expressed relative to the new
/// elbow. `bend` is the hand's bearing measured from the reversed upper
/// arm (elbow back toward shoulder): the sweep may not pass through that
/// bearing, because the lower arm would cut through the upper arm there.
fn elbow_command(carried_hand: Vec2, target: Vec2, new_elbow: Vec2, geom: &ArmGeom) -> JointCommand {
    let hand_local = carried_hand - new_elbow;
    let target_local = target - new_elbow;
    let shoulder_local = Vec2::new(-new_elbow.x, -new_elbow.y);

    let delta = hand_local.bearing_deg() - target_local.bearing_deg();
    let bend = hand_local.bearing_deg() - shoulder_local.bearing_deg();

    let command = |direction: StepDirection, degrees_abs: f64| JointCommand {
        joint: JointId::Elbow,
        direction,
        steps: steps_for(degrees_abs, geom),
    };

    if delta == 0.0 {
        // Already on target; keeps a folded arm (bend == 0) from taking a
        // full spurious turn below.
        return command(StepDirection::Cw, 0.0);
    }

    if delta >= 0.0 {
        let bend = wrap_turn_pos(bend);
        if delta < bend {
            command(StepDirection::Cw, delta)
        } else {
            command(StepDirection::Ccw, 360.0 - delta)
        }
    } else {
        let bend = wrap_turn_neg(bend);
        if delta > bend {
            command(StepDirection::Ccw, -delta)
        } else {
            command(StepDirection::Cw, 360.0 + delta)
        }
    }
}

/// One planning cycle: workspace gate, elbow solve, joint deltas. Returns
/// the successor state together with the two joint commands; on any error
/// the caller's state is untouched and the cycle is simply skipped.
pub fn plan_motion(
    state: &ArmState,
    target: Vec2,
    geom: &ArmGeom,
) -> Result<(ArmState, MotionPlan), PlanError> {
    if !ik::target_in_workspace(target, geom) {
        return Err(PlanError::OutOfRange);
    }

    let new_elbow = ik::solve_elbow(target, geom, state.elbow).map_err(PlanError::Ik)?;

    let shoulder = shoulder_command(state.elbow, new_elbow, geom);
    // The shoulder rotation carries the hand along with the elbow; the
    // elbow step is then planned from that carried position.
    let carried_hand = state.hand + (new_elbow - state.elbow);
    let elbow = elbow_command(carried_hand, target, new_elbow, geom);

    let next = ArmState {
        hand_prev: state.hand,
        hand: target, // open loop: the move is assumed to land exactly
        elbow_prev: state.elbow,
        elbow: new_elbow,
        target,
    };

    Ok((next, MotionPlan { shoulder, elbow }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DPS: f64 = 0.1125;

    fn geom() -> ArmGeom {
        ArmGeom::new(125.0, 125.0, DPS)
    }

    #[test]
    fn wrap_degrees_takes_short_way() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
        assert_eq!(wrap_degrees(359.0), -1.0);
    }

    #[test]
    fn settled_target_plans_no_steps() {
        let geom = geom();
        let state = ArmState::calibrated(&geom);

        let (next, plan) = plan_motion(&state, Vec2::new(0.0, 250.0), &geom).unwrap();
        assert!(plan.is_noop());
        assert_eq!(next.hand, Vec2::new(0.0, 250.0));
        assert_eq!(next.elbow, state.elbow);
    }

    #[test]
    fn replanning_same_target_is_idempotent() {
        let geom = geom();
        let state = ArmState::calibrated(&geom);
        let target = Vec2::new(100.0, 120.0);

        let (settled, first) = plan_motion(&state, target, &geom).unwrap();
        assert!(!first.is_noop());

        let (again, second) = plan_motion(&settled, target, &geom).unwrap();
        assert!(second.is_noop(), "second plan should be a no-op: {:?}", second);
        assert_eq!(again.hand, settled.hand);
        assert_eq!(again.elbow, settled.elbow);
    }

    #[test]
    fn folded_arm_replan_is_idempotent() {
        // Fully folded pose puts the hand bearing exactly on the reversed
        // upper arm (bend == 0); replanning must still be a no-op.
        let geom = ArmGeom::new(150.0, 100.0, DPS);
        let state = ArmState::calibrated(&geom);
        let target = Vec2::new(0.0, 50.0);

        let (folded, _) = plan_motion(&state, target, &geom).unwrap();
        let (_, plan) = plan_motion(&folded, target, &geom).unwrap();
        assert!(plan.is_noop(), "folded replan should be a no-op: {:?}", plan);
    }

    #[test]
    fn shoulder_swings_clockwise_toward_positive_x() {
        let geom = geom();
        let state = ArmState::calibrated(&geom);

        // From straight up to the 45 degree ray: elbow bearing drops from
        // 90 to 45 degrees, a clockwise move of 45 degrees.
        let target = Vec2::new(176.7766, 176.7766);
        let (_, plan) = plan_motion(&state, target, &geom).unwrap();

        assert_eq!(plan.shoulder.direction, StepDirection::Cw);
        let expected = (45.0f64 / DPS).round() as u32;
        assert!(
            plan.shoulder.steps.abs_diff(expected) <= 2,
            "shoulder steps {} not near {}",
            plan.shoulder.steps,
            expected
        );
        // The shoulder swing only translates the hand; the elbow joint
        // re-aims the lower arm through the same 45 degrees.
        assert_eq!(plan.elbow.direction, StepDirection::Cw);
        assert!(
            plan.elbow.steps.abs_diff(expected) <= 2,
            "elbow steps {} not near {}",
            plan.elbow.steps,
            expected
        );
    }

    #[test]
    fn direct_elbow_sweep_is_taken_when_clear() {
        let geom = geom();
        // Elbow straight up; hand straight up from it; upper arm reversed
        // points down (bend 180). Target 45 degrees clockwise from the
        // hand: the sweep stays clear of the upper arm.
        let new_elbow = Vec2::new(0.0, 125.0);
        let hand = Vec2::new(0.0, 250.0);
        let target = new_elbow + Vec2::new(125.0 / 2f64.sqrt(), 125.0 / 2f64.sqrt());

        let cmd = elbow_command(hand, target, new_elbow, &geom);
        assert_eq!(cmd.direction, StepDirection::Cw);
        assert_eq!(cmd.steps, (45.0f64 / DPS).round() as u32);
    }

    #[test]
    fn blocked_elbow_sweep_detours_long_way() {
        let geom = geom();
        // Same pose, but the target is 135 degrees clockwise past the
        // upper arm: the direct clockwise sweep (225 degrees) would cross
        // the reversed upper arm at 180, so the planner goes counter-
        // clockwise 135 degrees instead.
        let new_elbow = Vec2::new(0.0, 125.0);
        let hand = Vec2::new(0.0, 250.0);
        let target = new_elbow + Vec2::new(-125.0 / 2f64.sqrt(), -125.0 / 2f64.sqrt());

        let cmd = elbow_command(hand, target, new_elbow, &geom);
        assert_eq!(cmd.direction, StepDirection::Ccw);
        assert_eq!(cmd.steps, (135.0f64 / DPS).round() as u32);
    }

    #[test]
    fn blocked_counterclockwise_sweep_detours_clockwise() {
        let geom = geom();
        // Mirror case: elbow on the -45 degree ray, so the reversed upper
        // arm sits at 135. Hand at 90 from the elbow, target at 170: the
        // direct counterclockwise sweep of 80 degrees would cross the
        // upper arm at 135, so the planner goes 280 clockwise instead.
        let deg = |d: f64| {
            let r = d.to_radians();
            Vec2::new(125.0 * r.cos(), 125.0 * r.sin())
        };
        let new_elbow = deg(-45.0);
        let hand = new_elbow + deg(90.0);
        let target = new_elbow + deg(170.0);

        let cmd = elbow_command(hand, target, new_elbow, &geom);
        assert_eq!(cmd.direction, StepDirection::Cw);
        assert_eq!(cmd.steps, (280.0f64 / DPS).round() as u32);
    }

    #[test]
    fn clear_counterclockwise_sweep_is_direct() {
        let geom = geom();
        let deg = |d: f64| {
            let r = d.to_radians();
            Vec2::new(125.0 * r.cos(), 125.0 * r.sin())
        };
        // Same pose, target short of the upper arm: direct 30 degree
        // counterclockwise sweep.
        let new_elbow = deg(-45.0);
        let hand = new_elbow + deg(90.0);
        let target = new_elbow + deg(120.0);

        let cmd = elbow_command(hand, target, new_elbow, &geom);
        assert_eq!(cmd.direction, StepDirection::Ccw);
        assert_eq!(cmd.steps, (30.0f64 / DPS).round() as u32);
    }

    #[test]
    fn out_of_range_target_leaves_state_alone() {
        let geom = geom();
        let state = ArmState::calibrated(&geom);

        let err = plan_motion(&state, Vec2::new(-250.0, -10.0), &geom).unwrap_err();
        assert_eq!(err, PlanError::OutOfRange);
    }

    #[test]
    fn infeasible_target_reports_ik_error() {
        let geom = geom();
        let state = ArmState::calibrated(&geom);

        // Inside the workspace box but beyond full reach.
        let err = plan_motion(&state, Vec2::new(250.0, 250.0), &geom).unwrap_err();
        assert_eq!(err, PlanError::Ik(IkError::Unreachable));

        let err = plan_motion(&state, Vec2::new(0.0, 0.0), &geom).unwrap_err();
        assert_eq!(err, PlanError::Ik(IkError::Degenerate));
    }

    #[test]
    fn planned_pose_respects_link_lengths() {
        let geom = geom();
        let mut state = ArmState::calibrated(&geom);

        for &target in &[
            Vec2::new(100.0, 120.0),
            Vec2::new(-80.0, 150.0),
            Vec2::new(200.0, 30.0),
            Vec2::new(0.0, 250.0),
        ] {
            let (next, _) = plan_motion(&state, target, &geom).unwrap();
            assert!((next.elbow.norm() - geom.upper).abs() < 1e-6);
            assert!((next.hand.dist(next.elbow) - geom.lower).abs() < 1e-6);
            assert_eq!(next.hand, target);
            assert_eq!(next.elbow_prev, state.elbow);
            state = next;
        }
    }
}
