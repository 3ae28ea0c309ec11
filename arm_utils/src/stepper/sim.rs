//! Virtual stepper rig: decodes command frames, tracks per-joint direction
//! and accumulated pulses, and answers acks. Stands in for the driver
//! board in tests and behind the pty rig host.

use std::collections::BTreeMap;

use crate::motion::StepDirection;
use crate::stepper::wire::{
    self, AckFrame, WireError, DIR_CCW, OP_PULSE, OP_SET_DIR, STATUS_BAD_OPCODE, STATUS_OK,
    STATUS_UNKNOWN_JOINT,
};

pub const RIG_SHOULDER_ID: u8 = 1;
pub const RIG_ELBOW_ID: u8 = 2;

#[derive(Debug, Clone, Copy)]
struct RigJoint {
    direction: StepDirection,
    pulses: u64,
    net_steps: i64,
}

impl RigJoint {
    fn new() -> Self {
        Self {
            direction: StepDirection::Cw,
            pulses: 0,
            net_steps: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RigJointSnapshot {
    pub id: u8,
    pub direction: StepDirection,
    /// Total pulses seen, regardless of direction.
    pub pulses: u64,
    /// Signed accumulated steps, counterclockwise positive.
    pub net_steps: i64,
}

#[derive(Debug, Clone, Default)]
pub struct RigSim {
    joints: BTreeMap<u8, RigJoint>,
}

impl RigSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rig with the standard shoulder/elbow joint ids.
    pub fn two_joint() -> Self {
        let mut sim = Self::new();
        sim.add_joint(RIG_SHOULDER_ID);
        sim.add_joint(RIG_ELBOW_ID);
        sim
    }

    pub fn add_joint(&mut self, id: u8) {
        self.joints.insert(id, RigJoint::new());
    }

    /// Handle one raw command frame, producing the ack to send back.
    /// Undecodable bytes give `Err` and no ack (the host's reply timeout
    /// covers that case).
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, WireError> {
        let command = wire::decode_command(frame)?;

        let ack = |status: u8| {
            Ok(Some(
                wire::encode_ack(AckFrame {
                    joint_id: command.joint_id,
                    status,
                })
                .to_vec(),
            ))
        };

        let Some(joint) = self.joints.get_mut(&command.joint_id) else {
            return ack(STATUS_UNKNOWN_JOINT);
        };

        match command.opcode {
            OP_SET_DIR => {
                joint.direction = if command.arg == DIR_CCW {
                    StepDirection::Ccw
                } else {
                    StepDirection::Cw
                };
                ack(STATUS_OK)
            }
            OP_PULSE => {
                let count = command.arg as i64;
                joint.pulses += command.arg as u64;
                joint.net_steps += match joint.direction {
                    StepDirection::Ccw => count,
                    StepDirection::Cw => -count,
                };
                ack(STATUS_OK)
            }
            _ => ack(STATUS_BAD_OPCODE),
        }
    }

    pub fn snapshots(&self) -> Vec<RigJointSnapshot> {
        self.joints
            .iter()
            .map(|(id, joint)| RigJointSnapshot {
                id: *id,
                direction: joint.direction,
                pulses: joint.pulses,
                net_steps: joint.net_steps,
            })
            .collect()
    }

    /// Signed net rotation of one joint, counterclockwise positive.
    pub fn net_degrees(&self, id: u8, degrees_per_step: f64) -> Option<f64> {
        self.joints
            .get(&id)
            .map(|joint| joint.net_steps as f64 * degrees_per_step)
    }
}
