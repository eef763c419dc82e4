//! Comparing what was sent with what came back.
//!
//! Content is checked with a linear, in-order match of the two message
//! lists. Timing is judged by the root-mean-square difference between the
//! scheduled and the observed gaps between consecutive messages, so a
//! constant transport latency does not count against the run.

use std::fmt;
use std::time::Duration;

use crate::errors::VerifyError;
use crate::schedule::Schedule;
use crate::session::{Outcome, Recording};
use crate::timer::duration_ms;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub expected: usize,
    pub received: usize,
    pub dropped: usize,
    /// Scheduled gaps between consecutive messages, in ms.
    pub expected_delays_ms: Vec<f64>,
    /// Observed gaps between consecutive receive times, in ms.
    pub observed_delays_ms: Vec<f64>,
    pub rms_ms: f64,
    /// RMS error computed from backend timestamps, when every message had one.
    pub backend_rms_ms: Option<f64>,
    /// Mean delay between sending and receiving a message, in ms.
    pub mean_latency_ms: Option<f64>,
}

/// Root-mean-square of the element-wise differences; zero for empty input.
pub fn rms_error(expected: &[f64], observed: &[f64]) -> f64 {
    let n = expected.len().min(observed.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = expected
        .iter()
        .zip(observed)
        .map(|(e, o)| (o - e) * (o - e))
        .sum();
    (sum / n as f64).sqrt()
}

fn gaps_ms(times: &[Duration]) -> Vec<f64> {
    times
        .windows(2)
        .map(|w| duration_ms(w[1].saturating_sub(w[0])))
        .collect()
}

/// Matches message content first, then timing.
///
/// Content problems win over timing problems: a report is only produced
/// when every scheduled message came back unchanged and in order. An
/// interrupted run never passes, even if everything had already arrived.
pub fn verify(
    schedule: &Schedule,
    recording: &Recording,
    max_rms_ms: f64,
) -> Result<Report, VerifyError> {
    let expected = schedule.len();
    let received = recording.received.len();

    let pairs = schedule.entries().iter().zip(&recording.received);
    for (index, (entry, got)) in pairs.enumerate() {
        if entry.message.as_bytes() != got.bytes.as_slice() {
            return Err(VerifyError::ContentMismatch {
                index,
                expected: entry.message.as_bytes().to_vec(),
                received: got.bytes.clone(),
            });
        }
    }
    if recording.outcome == Outcome::Interrupted {
        return Err(VerifyError::Interrupted { received, expected });
    }
    if received < expected {
        return Err(VerifyError::MissingMessages { expected, received });
    }
    if received > expected {
        return Err(VerifyError::UnexpectedMessages { expected, received });
    }

    let expected_delays_ms: Vec<f64> = schedule.delays().into_iter().map(duration_ms).collect();
    let receive_times: Vec<Duration> = recording.received.iter().map(|m| m.at).collect();
    let observed_delays_ms = gaps_ms(&receive_times);
    let rms_ms = rms_error(&expected_delays_ms, &observed_delays_ms);

    let backend_rms_ms = recording
        .received
        .iter()
        .map(|m| m.stamp)
        .collect::<Option<Vec<u64>>>()
        .map(|stamps| {
            let gaps: Vec<f64> = stamps
                .windows(2)
                .map(|w| w[1].saturating_sub(w[0]) as f64 / 1000.0)
                .collect();
            rms_error(&expected_delays_ms, &gaps)
        });

    let mean_latency_ms = if recording.sent_at.is_empty() {
        None
    } else {
        let total: f64 = recording
            .sent_at
            .iter()
            .zip(&recording.received)
            .map(|(sent, got)| duration_ms(got.at.saturating_sub(*sent)))
            .sum();
        Some(total / recording.sent_at.len().min(received).max(1) as f64)
    };

    if rms_ms > max_rms_ms {
        return Err(VerifyError::TimingDrift {
            rms_ms,
            threshold_ms: max_rms_ms,
        });
    }

    Ok(Report {
        expected,
        received,
        dropped: recording.dropped,
        expected_delays_ms,
        observed_delays_ms,
        rms_ms,
        backend_rms_ms,
        mean_latency_ms,
    })
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "messages: {} sent, {} received, {} dropped",
            self.expected, self.received, self.dropped
        )?;
        writeln!(f, "delay RMS error (local timer): {:.3} ms", self.rms_ms)?;
        if let Some(rms) = self.backend_rms_ms {
            writeln!(f, "delay RMS error (backend stamps): {:.3} ms", rms)?;
        }
        if let Some(latency) = self.mean_latency_ms {
            writeln!(f, "mean latency: {:.3} ms", latency)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MidiMessage;
    use crate::session::ReceivedMessage;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn schedule() -> Schedule {
        Schedule::from_deltas(vec![
            (ms(0), MidiMessage::note_on(0, 60, 100)),
            (ms(50), MidiMessage::note_off(0, 60, 0)),
            (ms(50), MidiMessage::note_on(0, 64, 100)),
        ])
    }

    fn recording(times: &[u64], stamps: bool) -> Recording {
        let received = schedule()
            .entries()
            .iter()
            .zip(times)
            .map(|(e, &t)| ReceivedMessage {
                bytes: e.message.as_bytes().to_vec(),
                at: ms(t),
                stamp: if stamps { Some(t * 1000) } else { None },
            })
            .collect();
        Recording {
            received,
            sent_at: vec![ms(0), ms(50), ms(100)],
            dropped: 0,
            outcome: Outcome::Complete,
        }
    }

    #[test]
    fn rms_of_known_values() {
        assert_eq!(rms_error(&[], &[]), 0.0);
        assert_eq!(rms_error(&[10.0, 10.0], &[10.0, 10.0]), 0.0);
        let rms = rms_error(&[10.0, 10.0], &[13.0, 6.0]);
        assert!((rms - 12.5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn constant_latency_is_not_penalised() {
        let rec = recording(&[3, 53, 103], true);
        let report = verify(&schedule(), &rec, 1.0).unwrap();
        assert!(report.rms_ms < 1e-9);
        assert_eq!(report.backend_rms_ms, Some(0.0));
        assert!((report.mean_latency_ms.unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(report.expected_delays_ms, vec![50.0, 50.0]);
    }

    #[test]
    fn jitter_over_threshold_fails() {
        let rec = recording(&[0, 60, 100], false);
        match verify(&schedule(), &rec, 5.0) {
            Err(VerifyError::TimingDrift { rms_ms, .. }) => assert!((rms_ms - 10.0).abs() < 1e-9),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn backend_rms_needs_every_stamp() {
        let mut rec = recording(&[0, 50, 100], true);
        rec.received[1].stamp = None;
        assert_eq!(verify(&schedule(), &rec, 5.0).unwrap().backend_rms_ms, None);
    }

    #[test]
    fn content_mismatch_is_reported_first() {
        let mut rec = recording(&[0, 90, 100], false);
        rec.received[1].bytes = vec![0x80, 61, 0];
        let mismatch = VerifyError::ContentMismatch {
            index: 1,
            expected: vec![0x80, 60, 0],
            received: vec![0x80, 61, 0],
        };
        assert_eq!(verify(&schedule(), &rec, 5.0), Err(mismatch));
    }

    #[test]
    fn missing_and_extra_messages() {
        let mut rec = recording(&[0, 50, 100], false);
        rec.received.pop();
        rec.outcome = Outcome::TimedOut;
        let missing = VerifyError::MissingMessages {
            expected: 3,
            received: 2,
        };
        assert_eq!(verify(&schedule(), &rec, 5.0), Err(missing));

        let mut rec = recording(&[0, 50, 100], false);
        let extra = rec.received[0].clone();
        rec.received.push(extra);
        let unexpected = VerifyError::UnexpectedMessages {
            expected: 3,
            received: 4,
        };
        assert_eq!(verify(&schedule(), &rec, 5.0), Err(unexpected));
    }

    #[test]
    fn interrupted_run_never_passes() {
        let mut rec = recording(&[0, 50], false);
        rec.outcome = Outcome::Interrupted;
        let partial = VerifyError::Interrupted {
            received: 2,
            expected: 3,
        };
        assert_eq!(verify(&schedule(), &rec, 5.0), Err(partial));

        // everything came back before the stop request
        let mut rec = recording(&[0, 50, 100], false);
        rec.outcome = Outcome::Interrupted;
        let complete = VerifyError::Interrupted {
            received: 3,
            expected: 3,
        };
        assert_eq!(verify(&schedule(), &rec, 5.0), Err(complete));
    }
}
