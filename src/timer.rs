use std::thread::sleep;
use std::time::{Duration, Instant};

use log::debug;

use crate::errors::VerifyError;

/// Monotonic stopwatch all receive times are measured with.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    origin: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Timer {
            origin: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        duration_ms(self.elapsed())
    }
}

pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Sleeps through the OS for `duration` and checks that the timer saw the
/// same amount of time pass, within the relative `tolerance`.
///
/// Returns the measured time in milliseconds.
pub fn check_against_sleep(duration: Duration, tolerance: f64) -> Result<f64, VerifyError> {
    let timer = Timer::start();
    sleep(duration);
    let measured_ms = timer.elapsed_ms();
    let expected_ms = duration_ms(duration);
    debug!(
        "timer check: slept {:.3} ms, measured {:.3} ms",
        expected_ms, measured_ms
    );
    verify_drift(expected_ms, measured_ms, tolerance)?;
    Ok(measured_ms)
}

pub(crate) fn verify_drift(
    expected_ms: f64,
    measured_ms: f64,
    tolerance: f64,
) -> Result<(), VerifyError> {
    if expected_ms <= 0.0 {
        return Ok(());
    }
    if (measured_ms / expected_ms - 1.0).abs() > tolerance {
        return Err(VerifyError::TimerDrift {
            expected_ms,
            measured_ms,
            tolerance,
        });
    }
    Ok(())
}
