//! Planar geometric IK for a two-link SCARA arm:
//! - Shoulder joint fixed at the origin, upper arm of length `upper`
//! - Elbow joint between the links, lower arm of length `lower`
//! - Hand (end effector) at the tip of the lower arm
//!
//! Input: desired hand point (x, y) in the base frame, y up.
//! Output: the elbow position, picked from the two circle-intersection
//! branches as the one closest to the previous pose.

use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dist(self, other: Self) -> f64 {
        (self - other).norm()
    }

    pub fn scaled(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k)
    }

    /// Clockwise perpendicular: (x, y) -> (y, -x).
    pub fn perp(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Bearing from the +x axis in degrees, in (-180, 180].
    pub fn bearing_deg(self) -> f64 {
        self.y.atan2(self.x).to_degrees()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArmGeom {
    /// Shoulder -> elbow length (same units as x, y)
    pub upper: f64,
    /// Elbow -> hand length (same units as x, y)
    pub lower: f64,
    /// Joint rotation per stepper pulse, in degrees
    pub degrees_per_step: f64,
    /// Box the elbow must stay inside; keeps the arm in its physical
    /// half-plane when both intersection branches exist.
    pub elbow_x_min: f64,
    pub elbow_x_max: f64,
    pub elbow_y_min: f64,
    pub elbow_y_max: f64,
}

impl ArmGeom {
    /// Geometry with the default elbow box: full reach in x, upper
    /// half-plane in y.
    pub fn new(upper: f64, lower: f64, degrees_per_step: f64) -> Self {
        let reach = upper + lower;
        Self {
            upper,
            lower,
            degrees_per_step,
            elbow_x_min: -reach,
            elbow_x_max: reach,
            elbow_y_min: 0.0,
            elbow_y_max: reach,
        }
    }

    pub fn reach(&self) -> f64 {
        self.upper + self.lower
    }

    fn elbow_in_bounds(&self, p: Vec2) -> bool {
        p.x >= self.elbow_x_min
            && p.x <= self.elbow_x_max
            && p.y >= self.elbow_y_min
            && p.y <= self.elbow_y_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkError {
    /// Target is outside the annulus the two links can reach.
    Unreachable,
    /// Target at the shoulder origin, or unusable geometry (NaNs,
    /// non-positive link lengths).
    Degenerate,
    /// Both intersection branches fall outside the elbow box.
    NoValidBranch,
}

/// Workspace gate applied before solving: the hand must stay inside the
/// quadrant box `x in [-reach, reach]`, `y in [0, reach]`. Rejected
/// targets plan no motion; the caller keeps its pose and reports.
pub fn target_in_workspace(target: Vec2, geom: &ArmGeom) -> bool {
    let reach = geom.reach();
    target.y >= 0.0 && target.y <= reach && target.x >= -reach && target.x <= reach
}

/// Two-circle intersection about the origin: the elbow lies on both the
/// circle of radius `upper` around the shoulder and the circle of radius
/// `lower` around the target.
///
/// Of the two intersection points, returns the one closer to
/// `previous_elbow` (minimum joint travel), falling back to the other if
/// the near one leaves the elbow box. Reach bounds are inclusive: a fully
/// extended or fully folded arm still solves.
pub fn solve_elbow(target: Vec2, geom: &ArmGeom, previous_elbow: Vec2) -> Result<Vec2, IkError> {
    if !(geom.upper > 0.0) || !(geom.lower > 0.0) {
        return Err(IkError::Degenerate);
    }

    let d = target.norm();
    if !d.is_finite() || d == 0.0 {
        return Err(IkError::Degenerate);
    }
    if d > geom.reach() || d < (geom.upper - geom.lower).abs() {
        return Err(IkError::Unreachable);
    }

    // Signed distance from the origin to the chord of intersection,
    // measured along the origin->target axis. The range check above keeps
    // the radicand non-negative up to rounding.
    let a = (geom.upper * geom.upper - geom.lower * geom.lower + d * d) / (2.0 * d);
    let h = (geom.upper * geom.upper - a * a).max(0.0).sqrt();

    let foot = target.scaled(a / d);
    let offset = target.perp().scaled(h / d);
    let plus = foot + offset;
    let minus = foot - offset;

    // Nearest branch wins; ties go to the +perp candidate so identical
    // inputs always give the identical elbow.
    let (near, far) = if plus.dist(previous_elbow) <= minus.dist(previous_elbow) {
        (plus, minus)
    } else {
        (minus, plus)
    };

    if geom.elbow_in_bounds(near) {
        Ok(near)
    } else if geom.elbow_in_bounds(far) {
        Ok(far)
    } else {
        Err(IkError::NoValidBranch)
    }
}
