//! Frame codec for the stepper driver link.
//!
//! Host -> driver command, 6 bytes:
//! `A5 5A <joint_id> <opcode> <arg> <checksum>`
//! Driver -> host ack, 5 bytes:
//! `A5 5A <joint_id> <status> <checksum>`
//! Checksum is the complemented byte sum of everything after the header.
//! The link is open loop: acks carry a status byte, never a position.

pub const HEADER0: u8 = 0xA5;
pub const HEADER1: u8 = 0x5A;

pub const OP_SET_DIR: u8 = 0x01;
pub const OP_PULSE: u8 = 0x02;

/// SET_DIR argument values.
pub const DIR_CW: u8 = 0x00;
pub const DIR_CCW: u8 = 0x01;

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_UNKNOWN_JOINT: u8 = 0x01;
pub const STATUS_BAD_OPCODE: u8 = 0x02;

pub const COMMAND_LEN: usize = 6;
pub const ACK_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub joint_id: u8,
    pub opcode: u8,
    pub arg: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub joint_id: u8,
    pub status: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    BadHeader,
    TooShort,
    ChecksumMismatch,
}

fn checksum(payload: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    for byte in payload {
        sum = sum.wrapping_add(*byte);
    }
    !sum
}

pub fn encode_command(frame: CommandFrame) -> [u8; COMMAND_LEN] {
    let mut out = [
        HEADER0,
        HEADER1,
        frame.joint_id,
        frame.opcode,
        frame.arg,
        0,
    ];
    out[COMMAND_LEN - 1] = checksum(&out[2..COMMAND_LEN - 1]);
    out
}

pub fn decode_command(bytes: &[u8]) -> Result<CommandFrame, WireError> {
    if bytes.len() < COMMAND_LEN {
        return Err(WireError::TooShort);
    }
    if bytes[0] != HEADER0 || bytes[1] != HEADER1 {
        return Err(WireError::BadHeader);
    }
    if checksum(&bytes[2..COMMAND_LEN - 1]) != bytes[COMMAND_LEN - 1] {
        return Err(WireError::ChecksumMismatch);
    }
    Ok(CommandFrame {
        joint_id: bytes[2],
        opcode: bytes[3],
        arg: bytes[4],
    })
}

pub fn encode_ack(frame: AckFrame) -> [u8; ACK_LEN] {
    let mut out = [HEADER0, HEADER1, frame.joint_id, frame.status, 0];
    out[ACK_LEN - 1] = checksum(&out[2..ACK_LEN - 1]);
    out
}

pub fn decode_ack(bytes: &[u8]) -> Result<AckFrame, WireError> {
    if bytes.len() < ACK_LEN {
        return Err(WireError::TooShort);
    }
    if bytes[0] != HEADER0 || bytes[1] != HEADER1 {
        return Err(WireError::BadHeader);
    }
    if checksum(&bytes[2..ACK_LEN - 1]) != bytes[ACK_LEN - 1] {
        return Err(WireError::ChecksumMismatch);
    }
    Ok(AckFrame {
        joint_id: bytes[2],
        status: bytes[3],
    })
}

/// Drain complete command frames out of a receive buffer, discarding any
/// garbage before the next header. Partial frames stay buffered for the
/// next read.
pub fn extract_command_frames(buffer: &mut Vec<u8>) -> Vec<[u8; COMMAND_LEN]> {
    let mut frames = Vec::new();

    loop {
        if buffer.len() < 2 {
            break;
        }

        let mut start = None;
        for idx in 0..(buffer.len() - 1) {
            if buffer[idx] == HEADER0 && buffer[idx + 1] == HEADER1 {
                start = Some(idx);
                break;
            }
        }

        let Some(start) = start else {
            // No header anywhere; keep the last byte in case it begins one.
            let tail = *buffer.last().unwrap_or(&0);
            buffer.clear();
            if tail == HEADER0 {
                buffer.push(tail);
            }
            break;
        };

        if start > 0 {
            buffer.drain(0..start);
        }

        if buffer.len() < COMMAND_LEN {
            break;
        }

        let mut frame = [0u8; COMMAND_LEN];
        frame.copy_from_slice(&buffer[..COMMAND_LEN]);
        buffer.drain(0..COMMAND_LEN);
        frames.push(frame);
    }

    frames
}
