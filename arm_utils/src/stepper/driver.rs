//! Open-loop step driver and emitter.
//!
//! The driver turns `set_direction`/`pulse` calls into wire frames and
//! waits for the ack on each one. The emitter sequences a whole
//! `JointCommand`: direction once, then the pulse train paced on
//! monotonic deadlines. There is no position feedback anywhere on this
//! path; lost steps are invisible to the host.

use std::thread;
use std::time::{Duration, Instant};

use crate::motion::{JointCommand, JointId, StepDirection};
use crate::stepper::port::PulsePort;
use crate::stepper::wire::{
    self, CommandFrame, ACK_LEN, DIR_CCW, DIR_CW, OP_PULSE, OP_SET_DIR, STATUS_BAD_OPCODE,
    STATUS_OK, STATUS_UNKNOWN_JOINT,
};

const ACK_TIMEOUT: Duration = Duration::from_millis(50);
const ACK_POLL: Duration = Duration::from_micros(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The transport did not accept the whole frame.
    WriteFailed,
    /// No ack arrived within the reply timeout.
    Timeout,
    /// An ack arrived but did not decode.
    BadAck,
    /// The board does not know the addressed joint id.
    UnknownJoint,
    /// The board rejected the opcode.
    BadOpcode,
}

/// Joint ids as the driver board knows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointIds {
    pub shoulder: u8,
    pub elbow: u8,
}

impl Default for JointIds {
    fn default() -> Self {
        Self {
            shoulder: crate::stepper::sim::RIG_SHOULDER_ID,
            elbow: crate::stepper::sim::RIG_ELBOW_ID,
        }
    }
}

#[derive(Debug)]
pub struct StepDriver<P: PulsePort> {
    port: P,
    ids: JointIds,
}

impl<P: PulsePort> StepDriver<P> {
    pub fn new(port: P) -> Self {
        Self::with_ids(port, JointIds::default())
    }

    pub fn with_ids(port: P, ids: JointIds) -> Self {
        Self { port, ids }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn joint_id(&self, joint: JointId) -> u8 {
        match joint {
            JointId::Shoulder => self.ids.shoulder,
            JointId::Elbow => self.ids.elbow,
        }
    }

    pub fn set_direction(
        &mut self,
        joint: JointId,
        direction: StepDirection,
    ) -> Result<(), DriverError> {
        let arg = match direction {
            StepDirection::Cw => DIR_CW,
            StepDirection::Ccw => DIR_CCW,
        };
        self.transact(CommandFrame {
            joint_id: self.joint_id(joint),
            opcode: OP_SET_DIR,
            arg,
        })
    }

    pub fn pulse(&mut self, joint: JointId) -> Result<(), DriverError> {
        self.transact(CommandFrame {
            joint_id: self.joint_id(joint),
            opcode: OP_PULSE,
            arg: 1,
        })
    }

    fn transact(&mut self, frame: CommandFrame) -> Result<(), DriverError> {
        let packet = wire::encode_command(frame);
        self.port.clear();
        if self.port.write(&packet) != packet.len() {
            return Err(DriverError::WriteFailed);
        }

        self.port.set_reply_timeout(ACK_TIMEOUT);
        let mut buffer = Vec::with_capacity(ACK_LEN);
        loop {
            let chunk = self.port.read(ACK_LEN - buffer.len());
            buffer.extend_from_slice(&chunk);
            if buffer.len() >= ACK_LEN {
                break;
            }
            if self.port.reply_timed_out() {
                return Err(DriverError::Timeout);
            }
            if chunk.is_empty() {
                thread::sleep(ACK_POLL);
            }
        }

        let ack = wire::decode_ack(&buffer).map_err(|_| DriverError::BadAck)?;
        match ack.status {
            STATUS_OK => Ok(()),
            STATUS_UNKNOWN_JOINT => Err(DriverError::UnknownJoint),
            STATUS_BAD_OPCODE => Err(DriverError::BadOpcode),
            _ => Err(DriverError::BadAck),
        }
    }
}

/// Inter-pulse delay per joint. Equal for both joints unless configured
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    pub shoulder_interval: Duration,
    pub elbow_interval: Duration,
}

impl StepTiming {
    pub fn uniform(interval: Duration) -> Self {
        Self {
            shoulder_interval: interval,
            elbow_interval: interval,
        }
    }

    fn interval_for(&self, joint: JointId) -> Duration {
        match joint {
            JointId::Shoulder => self.shoulder_interval,
            JointId::Elbow => self.elbow_interval,
        }
    }
}

impl Default for StepTiming {
    fn default() -> Self {
        Self::uniform(Duration::from_millis(5))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StepEmitter {
    timing: StepTiming,
}

impl StepEmitter {
    pub fn new(timing: StepTiming) -> Self {
        Self { timing }
    }

    /// Execute one joint command: direction once, then the pulse train.
    /// Pulses are paced against deadlines off a single start instant, so
    /// ack latency does not accumulate into drift. Blocks for roughly
    /// `steps * interval`.
    pub fn emit<P: PulsePort>(
        &self,
        driver: &mut StepDriver<P>,
        command: &JointCommand,
    ) -> Result<(), DriverError> {
        driver.set_direction(command.joint, command.direction)?;

        let interval = self.timing.interval_for(command.joint);
        let started = Instant::now();
        for pulse in 1..=command.steps {
            driver.pulse(command.joint)?;
            let deadline = started + interval * pulse;
            if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
                thread::sleep(remaining);
            }
        }
        Ok(())
    }
}
