//! Pty master used by the virtual rig host. The rig reads command frames
//! from the master side; clients open the slave path like any serial
//! device.

#[cfg(unix)]
use std::ffi::CStr;
#[cfg(unix)]
use std::io;
#[cfg(unix)]
use std::os::unix::io::RawFd;
#[cfg(unix)]
use std::time::{Duration, Instant};

#[cfg(unix)]
use crate::stepper::port::PulsePort;

#[cfg(unix)]
#[derive(Debug)]
pub struct VirtualUartPort {
    master_fd: RawFd,
    slave_path: String,
    reply_deadline: Option<Instant>,
}

#[cfg(unix)]
fn close_on_error(fd: RawFd, err: io::Error) -> io::Result<(RawFd, String)> {
    unsafe {
        libc::close(fd);
    }
    Err(err)
}

#[cfg(unix)]
fn open_pty_master() -> io::Result<(RawFd, String)> {
    unsafe {
        let fd = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        if libc::grantpt(fd) != 0 {
            return close_on_error(fd, io::Error::last_os_error());
        }
        if libc::unlockpt(fd) != 0 {
            return close_on_error(fd, io::Error::last_os_error());
        }

        let name_ptr = libc::ptsname(fd);
        if name_ptr.is_null() {
            return close_on_error(fd, io::Error::last_os_error());
        }
        let slave_path = CStr::from_ptr(name_ptr).to_string_lossy().into_owned();

        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }

        Ok((fd, slave_path))
    }
}

#[cfg(unix)]
impl VirtualUartPort {
    pub fn new() -> io::Result<Self> {
        let (master_fd, slave_path) = open_pty_master()?;
        Ok(Self {
            master_fd,
            slave_path,
            reply_deadline: None,
        })
    }

    /// Device path a client should open as its serial port.
    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }
}

#[cfg(unix)]
impl Drop for VirtualUartPort {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.master_fd);
        }
    }
}

#[cfg(unix)]
impl PulsePort for VirtualUartPort {
    fn clear(&mut self) {
        let _ = self.read(self.bytes_available());
    }

    fn read(&mut self, length: usize) -> Vec<u8> {
        if length == 0 {
            return Vec::new();
        }
        let mut out = vec![0u8; length];
        let read_len = unsafe {
            libc::read(
                self.master_fd,
                out.as_mut_ptr() as *mut libc::c_void,
                length,
            )
        };
        if read_len <= 0 {
            out.clear();
        } else {
            out.truncate(read_len as usize);
        }
        out
    }

    fn write(&mut self, packet: &[u8]) -> usize {
        if packet.is_empty() {
            return 0;
        }
        let written = unsafe {
            libc::write(
                self.master_fd,
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
            )
        };
        if written < 0 { 0 } else { written as usize }
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
        unsafe {
            let mut bytes: libc::c_int = 0;
            if libc::ioctl(self.master_fd, libc::FIONREAD, &mut bytes) == 0 {
                bytes as usize
            } else {
                0
            }
        }
    }
}
