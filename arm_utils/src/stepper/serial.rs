use std::io::{Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::stepper::port::PulsePort;

/// `PulsePort` over a real serial device (or the slave side of the
/// virtual rig's pty).
pub struct SerialPulsePort {
    port: Box<dyn SerialPort>,
    reply_deadline: Option<Instant>,
}

impl SerialPulsePort {
    pub fn open(port_name: &str, baudrate: u32) -> std::io::Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(2))
            .open()?;
        Ok(Self {
            port,
            reply_deadline: None,
        })
    }

    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            reply_deadline: None,
        }
    }
}

impl PulsePort for SerialPulsePort {
    fn clear(&mut self) {
        let available = self.bytes_available();
        if available > 0 {
            let _ = self.read(available);
        }
    }

    fn read(&mut self, length: usize) -> Vec<u8> {
        if length == 0 {
            return Vec::new();
        }

        let mut out = vec![0u8; length];
        match self.port.read(&mut out) {
            Ok(read_len) => {
                out.truncate(read_len);
                out
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::TimedOut
                    || err.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Vec::new()
            }
            Err(_) => Vec::new(),
        }
    }

    fn write(&mut self, packet: &[u8]) -> usize {
        if packet.is_empty() {
            return 0;
        }
        if self.port.write_all(packet).is_err() {
            return 0;
        }
        let _ = self.port.flush();
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
        self.port.bytes_to_read().unwrap_or(0) as usize
    }
}
