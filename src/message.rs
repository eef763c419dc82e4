use std::fmt;
use std::ops::Deref;

use crate::errors::InvalidData;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// A single MIDI message as it travels over a port.
///
/// Construction through [`MidiMessage::new`] guarantees that a non-empty
/// message is a well-formed byte sequence: a status byte followed by the
/// number of data bytes that status requires, or a SysEx frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MidiMessage {
    bytes: Vec<u8>,
}

impl MidiMessage {
    pub fn new(bytes: Vec<u8>) -> Result<Self, InvalidData> {
        validate(&bytes)?;
        Ok(MidiMessage { bytes })
    }

    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        MidiMessage {
            bytes: vec![NOTE_ON | (channel & 0x0F), key & 0x7F, velocity & 0x7F],
        }
    }

    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        MidiMessage {
            bytes: vec![NOTE_OFF | (channel & 0x0F), key & 0x7F, velocity & 0x7F],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn status(&self) -> Option<u8> {
        self.bytes.first().copied()
    }
}

impl Deref for MidiMessage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Bytes(&self.bytes))
    }
}

/// Displays raw bytes as space separated decimals, e.g. `144 100 90`.
#[derive(Debug, Clone, Copy)]
pub struct Bytes<'a>(pub &'a [u8]);

impl fmt::Display for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

/// Number of bytes (status included) a message with this status byte has,
/// or `None` for SysEx, whose length is delimited by 0xF7.
pub fn expected_len(status: u8) -> Option<usize> {
    match status {
        0x80..=0xBF | 0xE0..=0xEF => Some(3),
        0xC0..=0xDF => Some(2),
        SYSEX_START => None,
        0xF1 | 0xF3 => Some(2),
        0xF2 => Some(3),
        _ => Some(1),
    }
}

fn validate(bytes: &[u8]) -> Result<(), InvalidData> {
    let status = match bytes.first() {
        None => return Ok(()),
        Some(&b) if b < 0x80 => return Err(InvalidData::MissingStatus(b)),
        Some(&b) => b,
    };

    if status == SYSEX_START {
        // only the final byte may be a status byte, and it must close the frame
        let last = bytes.len() - 1;
        if last == 0 || bytes[last] != SYSEX_END {
            return Err(InvalidData::UnterminatedSysex);
        }
        return check_data_bytes(&bytes[..last]);
    }

    check_data_bytes(bytes)?;
    let expected = expected_len(status).unwrap_or(1);
    if bytes.len() != expected {
        return Err(InvalidData::WrongLength {
            status,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Everything after the leading status byte must be below 0x80.
fn check_data_bytes(bytes: &[u8]) -> Result<(), InvalidData> {
    match bytes.iter().skip(1).position(|&b| b >= 0x80) {
        Some(pos) => Err(InvalidData::UnexpectedStatus {
            position: pos + 1,
            byte: bytes[pos + 1],
        }),
        None => Ok(()),
    }
}
