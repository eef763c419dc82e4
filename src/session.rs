use std::fmt;
use std::thread::sleep;
use std::time::Duration;

use log::{debug, info};
use spin_sleep::SpinSleeper;

use crate::config::HarnessConfig;
use crate::errors::RunError;
use crate::interrupt::StopFlag;
use crate::message::Bytes;
use crate::schedule::Schedule;
use crate::timer::{duration_ms, Timer};
use crate::traits::{MessageSink, MessageSource};

/// A message as seen by the polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub bytes: Vec<u8>,
    /// Local receive time, measured from the start of the sequence.
    pub at: Duration,
    /// Backend timestamp in microseconds, if the backend provided one.
    pub stamp: Option<u64>,
}

/// Prints as `[time] bytes`, where the time is the backend timestamp in
/// microseconds when there is one, else the local receive time in ms.
impl fmt::Display for ReceivedMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.stamp {
            Some(stamp) => write!(f, "[{}] {}", stamp, Bytes(&self.bytes)),
            None => write!(f, "[{:.3}] {}", duration_ms(self.at), Bytes(&self.bytes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// As many messages came back as were scheduled.
    Complete,
    Interrupted,
    /// Messages were still missing when the receive timeout ran out.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub received: Vec<ReceivedMessage>,
    /// Local send time of every message that went out, in schedule order.
    pub sent_at: Vec<Duration>,
    pub dropped: usize,
    pub outcome: Outcome,
}

impl Recording {
    pub fn sent(&self) -> usize {
        self.sent_at.len()
    }
}

/// Sends `schedule` through `sink` while polling `source`, until everything
/// came back, the timeout ran out, or `stop` was raised.
pub fn run_session<S, R>(
    mut sink: S,
    mut source: R,
    schedule: &Schedule,
    config: &HarnessConfig,
    stop: &StopFlag,
) -> Result<Recording, RunError>
where
    S: MessageSink,
    R: MessageSource,
{
    let expected = schedule.len();
    let sleeper = SpinSleeper::default();
    let mut received = Vec::with_capacity(expected);
    let mut sent_at = Vec::with_capacity(expected);
    let mut next = 0;

    if !config.settle.is_zero() {
        sleep(config.settle);
    }
    info!(
        "sending {} messages over {:.1} ms",
        expected,
        duration_ms(schedule.duration())
    );

    let timer = Timer::start();
    let outcome = loop {
        if stop.is_requested() {
            break Outcome::Interrupted;
        }

        let now = timer.elapsed();
        while let Some(entry) = schedule.get(next) {
            if entry.offset > now {
                break;
            }
            sink.send(entry.message.as_bytes())
                .map_err(|kind| RunError::Send { index: next, kind })?;
            let at = timer.elapsed();
            debug!(
                "sent #{} at {:.3} ms: {:?}",
                next,
                duration_ms(at),
                entry.message.as_bytes()
            );
            sent_at.push(at);
            next += 1;
        }

        while let Some(incoming) = source.get_message() {
            let at = timer.elapsed();
            debug!(
                "received at {:.3} ms: {:?}",
                duration_ms(at),
                incoming.bytes
            );
            received.push(ReceivedMessage {
                bytes: incoming.bytes,
                at,
                stamp: incoming.stamp,
            });
        }

        if next == expected {
            if received.len() >= expected {
                break Outcome::Complete;
            }
            let last_send = sent_at.last().copied().unwrap_or_default();
            if timer.elapsed().saturating_sub(last_send) > config.receive_timeout {
                break Outcome::TimedOut;
            }
        }

        sleeper.sleep(config.poll_interval);
    };

    info!(
        "session ended ({:?}): sent {}, received {}",
        outcome,
        sent_at.len(),
        received.len()
    );
    Ok(Recording {
        received,
        sent_at,
        dropped: source.dropped(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MidiMessage;
    use crate::queue::InputQueue;
    use midir::SendError;

    struct Echo(InputQueue);

    impl MessageSink for Echo {
        fn send(&mut self, message: &[u8]) -> Result<(), SendError> {
            self.0.push(None, message);
            Ok(())
        }
    }

    struct Void;

    impl MessageSink for Void {
        fn send(&mut self, _: &[u8]) -> Result<(), SendError> {
            Ok(())
        }
    }

    struct Broken;

    impl MessageSink for Broken {
        fn send(&mut self, _: &[u8]) -> Result<(), SendError> {
            Err(SendError::Other("port closed"))
        }
    }

    fn quick_config() -> HarnessConfig {
        HarnessConfig {
            settle: Duration::ZERO,
            receive_timeout: Duration::from_millis(30),
            ..HarnessConfig::default()
        }
    }

    fn two_notes() -> Schedule {
        Schedule::from_deltas(vec![
            (Duration::ZERO, MidiMessage::note_on(0, 60, 100)),
            (Duration::from_millis(10), MidiMessage::note_off(0, 60, 0)),
        ])
    }

    fn run_with<S: MessageSink>(sink: S, stop: &StopFlag) -> Result<Recording, RunError> {
        let config = quick_config();
        run_session(sink, InputQueue::default(), &two_notes(), &config, stop)
    }

    #[test]
    fn completes_when_everything_returns() {
        let queue = InputQueue::default();
        let config = quick_config();
        let stop = StopFlag::new();
        let result = run_session(Echo(queue.clone()), queue, &two_notes(), &config, &stop);
        let rec = result.unwrap();
        assert_eq!(rec.outcome, Outcome::Complete);
        assert_eq!(rec.sent(), 2);
        assert_eq!(rec.received.len(), 2);
        assert_eq!(rec.received[1].bytes, vec![0x80, 60, 0]);
        assert!(rec.sent_at[1] >= Duration::from_millis(10));
    }

    #[test]
    fn times_out_when_nothing_returns() {
        let rec = run_with(Void, &StopFlag::new()).unwrap();
        assert_eq!(rec.outcome, Outcome::TimedOut);
        assert_eq!(rec.sent(), 2);
        assert!(rec.received.is_empty());
    }

    #[test]
    fn stops_on_request() {
        let stop = StopFlag::new();
        stop.request();
        let rec = run_with(Void, &stop).unwrap();
        assert_eq!(rec.outcome, Outcome::Interrupted);
        assert_eq!(rec.sent(), 0);
    }

    #[test]
    fn send_failure_aborts() {
        let err = run_with(Broken, &StopFlag::new()).unwrap_err();
        let expected = RunError::Send {
            index: 0,
            kind: SendError::Other("port closed"),
        };
        assert_eq!(err, expected);
    }

    #[test]
    fn empty_schedule_is_complete() {
        let schedule = Schedule::default();
        let config = quick_config();
        let stop = StopFlag::new();
        let result = run_session(Void, InputQueue::default(), &schedule, &config, &stop);
        assert_eq!(result.unwrap().outcome, Outcome::Complete);
    }

    #[test]
    fn received_message_prints_the_best_timestamp() {
        let mut message = ReceivedMessage {
            bytes: vec![144, 100, 90],
            at: Duration::from_micros(1500),
            stamp: Some(123456),
        };
        assert_eq!(message.to_string(), "[123456] 144 100 90");
        message.stamp = None;
        assert_eq!(message.to_string(), "[1.500] 144 100 90");
    }
}
