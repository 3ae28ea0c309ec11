pub mod driver;
pub mod port;
pub mod rig;
pub mod serial;
pub mod sim;
pub mod virtual_uart;
pub mod wire;

pub use driver::{DriverError, JointIds, StepDriver, StepEmitter, StepTiming};
pub use port::{PulsePort, SimPort};
#[cfg(unix)]
pub use rig::RigHost;
pub use serial::SerialPulsePort;
pub use sim::{RigJointSnapshot, RigSim, RIG_ELBOW_ID, RIG_SHOULDER_ID};
#[cfg(unix)]
pub use virtual_uart::VirtualUartPort;
