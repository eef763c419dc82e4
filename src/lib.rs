//! A loopback test harness for realtime MIDI I/O.
//!
//! The harness opens a virtual input port, connects an output port to it,
//! sends a [`Schedule`] of note messages and records what comes back on a
//! local monotonic [`Timer`]. The run passes when every message returns
//! unchanged and in order, and the root-mean-square error of the
//! inter-message delays stays under a threshold.
//!
//! The polling loop only talks to the ports through [`MessageSink`] and
//! [`MessageSource`], so it can be driven by any pair of endpoints, not
//! just a [`Loopback`] made of real MIDI ports.

mod errors;
pub use errors::*;

pub mod config;
pub mod interrupt;
pub mod message;
pub mod ports;
pub mod queue;
pub mod report;
pub mod schedule;
pub mod session;
pub mod timer;
mod traits;

pub use config::HarnessConfig;
pub use interrupt::StopFlag;
pub use message::MidiMessage;
pub use ports::Loopback;
pub use queue::InputQueue;
pub use report::{verify, Report};
pub use schedule::{NotePattern, Schedule, ScheduledMessage};
pub use session::{run_session, Outcome, ReceivedMessage, Recording};
pub use timer::Timer;
pub use traits::{Incoming, MessageSink, MessageSource};

/// Runs the whole test against real ports: timer sanity check, port setup,
/// the send/receive session and verification.
pub fn run(config: &HarnessConfig, schedule: &Schedule, stop: &StopFlag) -> Result<Report, Error> {
    if let Some(sleep) = config.timer_check {
        let measured = timer::check_against_sleep(sleep, config.timer_tolerance)?;
        log::info!(
            "timer check passed: {:.3} ms for a {} ms sleep",
            measured,
            sleep.as_millis()
        );
    }

    let mut loopback = Loopback::open(config)?;
    log::info!(
        "looping \"{}\" -> \"{}\"",
        loopback.output_name(),
        loopback.input_name()
    );
    let (sink, source) = loopback.split();
    let recording = run_session(sink, source, schedule, config, stop);
    loopback.close();
    let recording = recording?;

    for message in &recording.received {
        println!("{}", message);
    }

    Ok(verify(schedule, &recording, config.max_rms_ms)?)
}
