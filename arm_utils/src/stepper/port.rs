use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::stepper::sim::RigSim;

/// Byte transport to the stepper driver board. Implementations: a real
/// serial port, the pty master behind the virtual rig, and an in-process
/// sim for tests.
pub trait PulsePort {
    /// Throw away anything buffered on the receive side.
    fn clear(&mut self);
    /// Read up to `length` bytes; returns whatever is available now.
    fn read(&mut self, length: usize) -> Vec<u8>;
    /// Write the full packet; returns the number of bytes accepted.
    fn write(&mut self, packet: &[u8]) -> usize;
    /// Arm the reply deadline used while waiting for an ack.
    fn set_reply_timeout(&mut self, timeout: Duration);
    /// True once the armed deadline has passed; disarms it.
    fn reply_timed_out(&mut self) -> bool;
    fn bytes_available(&self) -> usize;
}

/// In-process port wired straight into a `RigSim`: every written command
/// frame is handled immediately and its ack lands in the read buffer.
#[derive(Debug)]
pub struct SimPort {
    sim: RigSim,
    rx: VecDeque<u8>,
    reply_deadline: Option<Instant>,
}

impl SimPort {
    pub fn new(sim: RigSim) -> Self {
        Self {
            sim,
            rx: VecDeque::new(),
            reply_deadline: None,
        }
    }

    pub fn sim(&self) -> &RigSim {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut RigSim {
        &mut self.sim
    }
}

impl PulsePort for SimPort {
    fn clear(&mut self) {
        self.rx.clear();
    }

    fn read(&mut self, length: usize) -> Vec<u8> {
        let take = length.min(self.rx.len());
        self.rx.drain(..take).collect()
    }

    fn write(&mut self, packet: &[u8]) -> usize {
        if let Ok(Some(ack)) = self.sim.handle_frame(packet) {
            self.rx.extend(ack);
        }
        packet.len()
    }

    fn set_reply_timeout(&mut self, timeout: Duration) {
        self.reply_deadline = Some(Instant::now() + timeout);
    }

    fn reply_timed_out(&mut self) -> bool {
        match self.reply_deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.reply_deadline = None;
                true
            }
            _ => false,
        }
    }

    fn bytes_available(&self) -> usize {
        self.rx.len()
    }
}

impl Default for SimPort {
    fn default() -> Self {
        Self::new(RigSim::two_joint())
    }
}
