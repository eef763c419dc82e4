use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

/// Cooperative stop request shared between the Ctrl-C handler and the loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        StopFlag::default()
    }

    /// Creates a flag that is raised when the process receives Ctrl-C.
    ///
    /// Only one handler may be installed per process.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let flag = StopFlag::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            info!("interrupt received, stopping");
            handler_flag.request();
        })?;
        Ok(flag)
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_requests() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.is_requested());
        flag.request();
        assert!(other.is_requested());
    }
}
