use std::error::Error as StdError;
use std::fmt;
use std::io;

use midir::{ConnectErrorKind, InitError, PortInfoError, SendError};

const INIT_MSG: &str = "MIDI support could not be initialized";
const NO_INPUT_PORTS_MSG: &str = "no input ports available";
const NO_OUTPUT_PORTS_MSG: &str = "no output ports available";
const VIRTUAL_UNSUPPORTED_MSG: &str =
    "virtual ports are not supported on this platform, use --input-port and --output-port";
const UNTERMINATED_SYSEX_MSG: &str = "SysEx message is not terminated by 0xF7";

/// Anything that can go wrong while opening the loopback ports.
#[derive(Debug)]
pub enum SetupError {
    Init(InitError),
    NoInputPorts,
    NoOutputPorts,
    PortNotFound(String),
    PortInfo(PortInfoError),
    Connect(ConnectErrorKind),
    VirtualUnsupported,
    Io(io::Error),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SetupError::Init(ref err) => write!(f, "{}: {}", INIT_MSG, err),
            SetupError::NoInputPorts => f.write_str(NO_INPUT_PORTS_MSG),
            SetupError::NoOutputPorts => f.write_str(NO_OUTPUT_PORTS_MSG),
            SetupError::PortNotFound(ref name) => write!(f, "no port matching '{}'", name),
            SetupError::PortInfo(ref err) => write!(f, "could not query port: {}", err),
            SetupError::Connect(ref kind) => write!(f, "could not connect port: {}", kind),
            SetupError::VirtualUnsupported => f.write_str(VIRTUAL_UNSUPPORTED_MSG),
            SetupError::Io(ref err) => write!(f, "console I/O failed: {}", err),
        }
    }
}

impl StdError for SetupError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            SetupError::Init(ref err) => Some(err),
            SetupError::PortInfo(ref err) => Some(err),
            SetupError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<InitError> for SetupError {
    fn from(err: InitError) -> Self {
        SetupError::Init(err)
    }
}

impl From<PortInfoError> for SetupError {
    fn from(err: PortInfoError) -> Self {
        SetupError::PortInfo(err)
    }
}

impl From<io::Error> for SetupError {
    fn from(err: io::Error) -> Self {
        SetupError::Io(err)
    }
}

/// Failure while the send/receive loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunError {
    Send { index: usize, kind: SendError },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RunError::Send { index, ref kind } => {
                write!(f, "sending message #{} failed: {}", index, kind)
            }
        }
    }
}

impl StdError for RunError {}

/// A test verdict that did not pass.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyError {
    TimerDrift {
        expected_ms: f64,
        measured_ms: f64,
        tolerance: f64,
    },
    ContentMismatch {
        index: usize,
        expected: Vec<u8>,
        received: Vec<u8>,
    },
    MissingMessages { expected: usize, received: usize },
    UnexpectedMessages { expected: usize, received: usize },
    TimingDrift { rms_ms: f64, threshold_ms: f64 },
    Interrupted { received: usize, expected: usize },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            VerifyError::TimerDrift {
                expected_ms,
                measured_ms,
                tolerance,
            } => write!(
                f,
                "timer measured {:.3} ms for a {:.3} ms sleep (more than {:.1}% off)",
                measured_ms,
                expected_ms,
                tolerance * 100.0
            ),
            VerifyError::ContentMismatch {
                index,
                ref expected,
                ref received,
            } => write!(
                f,
                "message #{} differs: expected {:?}, received {:?}",
                index, expected, received
            ),
            VerifyError::MissingMessages { expected, received } => {
                write!(f, "only {} of {} messages came back", received, expected)
            }
            VerifyError::UnexpectedMessages { expected, received } => {
                write!(f, "{} messages came back for {} sent", received, expected)
            }
            VerifyError::TimingDrift {
                rms_ms,
                threshold_ms,
            } => write!(
                f,
                "inter-message delay RMS error {:.3} ms exceeds {:.3} ms",
                rms_ms, threshold_ms
            ),
            VerifyError::Interrupted { received, expected } => {
                write!(f, "interrupted at {} of {} messages", received, expected)
            }
        }
    }
}

impl StdError for VerifyError {}

/// Rejected byte sequence or schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidData {
    MissingStatus(u8),
    UnexpectedStatus { position: usize, byte: u8 },
    WrongLength {
        status: u8,
        expected: usize,
        actual: usize,
    },
    UnterminatedSysex,
    OffsetOutOfOrder { index: usize },
}

impl fmt::Display for InvalidData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InvalidData::MissingStatus(byte) => {
                write!(f, "expected a status byte first, found {:#04x}", byte)
            }
            InvalidData::UnexpectedStatus { position, byte } => {
                write!(f, "status byte {:#04x} at position {}", byte, position)
            }
            InvalidData::WrongLength {
                status,
                expected,
                actual,
            } => write!(
                f,
                "status {:#04x} needs {} bytes, got {}",
                status, expected, actual
            ),
            InvalidData::UnterminatedSysex => f.write_str(UNTERMINATED_SYSEX_MSG),
            InvalidData::OffsetOutOfOrder { index } => {
                write!(f, "offset of message #{} goes backwards", index)
            }
        }
    }
}

impl StdError for InvalidData {}

/// Umbrella error returned by a whole harness run.
#[derive(Debug)]
pub enum Error {
    Setup(SetupError),
    Run(RunError),
    Verify(VerifyError),
    InvalidData(InvalidData),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Setup(ref err) => write!(f, "{}", err),
            Error::Run(ref err) => write!(f, "{}", err),
            Error::Verify(ref err) => write!(f, "{}", err),
            Error::InvalidData(ref err) => write!(f, "{}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Setup(ref err) => Some(err),
            Error::Run(ref err) => Some(err),
            Error::Verify(ref err) => Some(err),
            Error::InvalidData(ref err) => Some(err),
        }
    }
}

impl From<SetupError> for Error {
    fn from(err: SetupError) -> Self {
        Error::Setup(err)
    }
}

impl From<RunError> for Error {
    fn from(err: RunError) -> Self {
        Error::Run(err)
    }
}

impl From<VerifyError> for Error {
    fn from(err: VerifyError) -> Self {
        Error::Verify(err)
    }
}

impl From<InvalidData> for Error {
    fn from(err: InvalidData) -> Self {
        Error::InvalidData(err)
    }
}
