//! Background host for the virtual rig: owns the pty master, feeds frames
//! into a shared `RigSim`, and writes acks back. Clients open the slave
//! path exactly like a real driver board.

#[cfg(unix)]
use std::io;
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(unix)]
use std::sync::{Arc, Mutex};
#[cfg(unix)]
use std::thread;
#[cfg(unix)]
use std::time::Duration;

#[cfg(unix)]
use crate::stepper::port::PulsePort;
#[cfg(unix)]
use crate::stepper::sim::{RigJointSnapshot, RigSim};
#[cfg(unix)]
use crate::stepper::virtual_uart::VirtualUartPort;
#[cfg(unix)]
use crate::stepper::wire;

#[cfg(unix)]
pub struct RigHost {
    stop: Arc<AtomicBool>,
    sim: Arc<Mutex<RigSim>>,
    slave_path: String,
    join: Option<thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl RigHost {
    /// Start a rig with the standard shoulder/elbow joints.
    pub fn start() -> io::Result<Self> {
        Self::start_with(RigSim::two_joint())
    }

    pub fn start_with(sim: RigSim) -> io::Result<Self> {
        let port = VirtualUartPort::new()?;
        let slave_path = port.slave_path().to_string();

        let stop = Arc::new(AtomicBool::new(false));
        let sim = Arc::new(Mutex::new(sim));

        let stop_in_thread = Arc::clone(&stop);
        let sim_in_thread = Arc::clone(&sim);
        let join = thread::spawn(move || {
            run_rig_loop(port, sim_in_thread, stop_in_thread);
        });

        log::info!("virtual rig listening on {}", slave_path);
        Ok(Self {
            stop,
            sim,
            slave_path,
            join: Some(join),
        })
    }

    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }

    /// Current per-joint counters, for reports and assertions.
    pub fn snapshots(&self) -> Vec<RigJointSnapshot> {
        self.sim
            .lock()
            .map(|sim| sim.snapshots())
            .unwrap_or_default()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(unix)]
impl Drop for RigHost {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn run_rig_loop(mut port: VirtualUartPort, sim: Arc<Mutex<RigSim>>, stop: Arc<AtomicBool>) {
    let mut buffer: Vec<u8> = Vec::new();

    while !stop.load(Ordering::Relaxed) {
        let available = port.bytes_available();
        if available > 0 {
            let mut incoming = port.read(available);
            buffer.append(&mut incoming);

            let frames = wire::extract_command_frames(&mut buffer);
            if !frames.is_empty() {
                let Ok(mut sim) = sim.lock() else { return };
                for frame in frames {
                    match sim.handle_frame(&frame) {
                        Ok(Some(ack)) => {
                            let _ = port.write(&ack);
                        }
                        Ok(None) => {}
                        Err(err) => log::debug!("dropping corrupt rig frame: {:?}", err),
                    }
                }
            }
        } else {
            thread::sleep(Duration::from_millis(2));
        }
    }
}
