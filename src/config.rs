use std::time::Duration;

use crate::queue::DEFAULT_QUEUE_SIZE_LIMIT;

/// Everything a harness run needs besides the message schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Client name registered with the MIDI system for both directions.
    pub client_name: String,
    /// Name of the virtual input port; also what the output port search looks for.
    pub port_name: String,
    /// Connect to an existing input port (name substring) instead of creating a virtual one.
    pub input_port: Option<String>,
    /// Output port name substring; defaults to `port_name`.
    pub output_port: Option<String>,
    pub wait_connect: bool,
    pub poll_interval: Duration,
    /// Pause between opening the ports and sending the first message.
    pub settle: Duration,
    /// How long to keep listening after the last message was sent.
    pub receive_timeout: Duration,
    pub max_rms_ms: f64,
    pub timer_check: Option<Duration>,
    pub timer_tolerance: f64,
    pub queue_size_limit: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            client_name: "midir-loopback".to_string(),
            port_name: "midir-loopback input".to_string(),
            input_port: None,
            output_port: None,
            wait_connect: false,
            poll_interval: Duration::from_millis(1),
            settle: Duration::from_millis(100),
            receive_timeout: Duration::from_millis(1000),
            max_rms_ms: 5.0,
            timer_check: Some(Duration::from_millis(100)),
            timer_tolerance: 0.05,
            queue_size_limit: DEFAULT_QUEUE_SIZE_LIMIT,
        }
    }
}

impl HarnessConfig {
    /// The name the output port search matches against.
    pub fn output_port_query(&self) -> &str {
        match self.output_port {
            Some(ref name) => name,
            None => &self.port_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_query_falls_back_to_virtual_port() {
        let mut config = HarnessConfig::default();
        assert_eq!(config.output_port_query(), "midir-loopback input");
        config.output_port = Some("Loop Be".to_string());
        assert_eq!(config.output_port_query(), "Loop Be");
    }
}
