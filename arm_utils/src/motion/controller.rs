//! One-thread cycle driver: validate -> solve -> plan -> emit, shoulder
//! fully before elbow. Owns the arm state and only commits it after both
//! joints finished emitting, so a failed cycle leaves the pose untouched.

use crate::ik::{ArmGeom, Vec2};
use crate::motion::{plan_motion, ArmState, MotionPlan, PlanError};
use crate::stepper::{DriverError, PulsePort, StepDriver, StepEmitter, StepTiming};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    Plan(PlanError),
    Driver(DriverError),
}

pub struct MotionController {
    geom: ArmGeom,
    emitter: StepEmitter,
    state: ArmState,
}

impl MotionController {
    /// Controller at the calibrated startup pose (arm straight up).
    pub fn new(geom: ArmGeom, timing: StepTiming) -> Self {
        Self {
            geom,
            emitter: StepEmitter::new(timing),
            state: ArmState::calibrated(&geom),
        }
    }

    pub fn state(&self) -> &ArmState {
        &self.state
    }

    pub fn geom(&self) -> &ArmGeom {
        &self.geom
    }

    /// Run one full motion cycle toward `target`. Every failure is local:
    /// the cycle is skipped, the pose stays where it was, and the
    /// controller is ready for the next target.
    pub fn goto<P: PulsePort>(
        &mut self,
        driver: &mut StepDriver<P>,
        target: Vec2,
    ) -> Result<MotionPlan, CycleError> {
        let (next, plan) = match plan_motion(&self.state, target, &self.geom) {
            Ok(planned) => planned,
            Err(err) => {
                match err {
                    PlanError::OutOfRange => {
                        log::warn!("target ({:.2}, {:.2}) out of range", target.x, target.y);
                    }
                    PlanError::Ik(ik) => {
                        log::warn!(
                            "position ({:.2}, {:.2}) impossible: {:?}",
                            target.x,
                            target.y,
                            ik
                        );
                    }
                }
                return Err(CycleError::Plan(err));
            }
        };

        for command in [&plan.shoulder, &plan.elbow] {
            if let Err(err) = self.emitter.emit(driver, command) {
                log::error!("step emission failed on {:?}: {:?}", command.joint, err);
                return Err(CycleError::Driver(err));
            }
        }

        self.state = next;
        log::debug!(
            "pose: hand ({:.2}, {:.2}) elbow ({:.2}, {:.2})",
            self.state.hand.x,
            self.state.hand.y,
            self.state.elbow.x,
            self.state.elbow.y
        );
        Ok(plan)
    }
}
