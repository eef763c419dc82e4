//! Opening the two ends of the loopback through `midir`.

use std::io::{stdin, stdout, Write};

use log::{info, warn};
use midir::{
    Ignore, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort, SendError,
};

use crate::config::HarnessConfig;
use crate::errors::SetupError;
use crate::queue::InputQueue;
use crate::traits::MessageSink;

/// An open input connection feeding a queue, plus the output connection
/// that is expected to end up on that input.
pub struct Loopback {
    input_name: String,
    output_name: String,
    queue: InputQueue,
    conn_in: MidiInputConnection<InputQueue>,
    conn_out: MidiOutputConnection,
}

impl Loopback {
    /// Opens the input side (virtual unless `config.input_port` is set) and
    /// then the output port that matches it.
    pub fn open(config: &HarnessConfig) -> Result<Loopback, SetupError> {
        let queue = InputQueue::new(config.queue_size_limit);

        let mut midi_in = MidiInput::new(&format!("{} input", config.client_name))?;
        // sysex, timing and active sensing all have to come through
        midi_in.ignore(Ignore::None);

        let (input_name, conn_in) = match config.input_port {
            Some(ref query) => connect_input(midi_in, query, &config.client_name, queue.clone())?,
            None => create_virtual_input(midi_in, &config.port_name, queue.clone())?,
        };

        let midi_out = MidiOutput::new(&format!("{} output", config.client_name))?;
        let out_port = select_output_port(&midi_out, config.output_port_query())?;
        let output_name = midi_out.port_name(&out_port)?;
        info!("opening output port \"{}\"", output_name);
        let conn_out = midi_out
            .connect(&out_port, &config.client_name)
            .map_err(|e| SetupError::Connect(e.kind()))?;

        let loopback = Loopback {
            input_name,
            output_name,
            queue,
            conn_in,
            conn_out,
        };
        if config.wait_connect {
            loopback.wait_for_connection()?;
        }
        Ok(loopback)
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// The sending and receiving ends, borrowed for one session.
    pub fn split(&mut self) -> (&mut MidiOutputConnection, &mut InputQueue) {
        (&mut self.conn_out, &mut self.queue)
    }

    /// Lets the user patch the ports together by hand before anything is sent.
    fn wait_for_connection(&self) -> Result<(), SetupError> {
        println!(
            "Hit enter when you have connected MIDI ports \"{}\" and \"{}\".",
            self.input_name, self.output_name
        );
        stdout().flush()?;
        let mut line = String::new();
        stdin().read_line(&mut line)?;
        Ok(())
    }

    pub fn close(self) {
        info!("closing output \"{}\"", self.output_name);
        self.conn_out.close();
        info!("closing input \"{}\"", self.input_name);
        let _ = self.conn_in.close();
    }
}

impl MessageSink for MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> Result<(), SendError> {
        MidiOutputConnection::send(self, message)
    }
}

fn stamp_of(stamp: u64) -> Option<u64> {
    if cfg!(feature = "avoid_timestamping") {
        None
    } else {
        Some(stamp)
    }
}

#[cfg(unix)]
fn create_virtual_input(
    midi_in: MidiInput,
    port_name: &str,
    queue: InputQueue,
) -> Result<(String, MidiInputConnection<InputQueue>), SetupError> {
    use midir::os::unix::VirtualInput;

    info!("creating virtual input port \"{}\"", port_name);
    let conn = midi_in
        .create_virtual(
            port_name,
            |stamp, message, queue: &mut InputQueue| {
                queue.push(stamp_of(stamp), message);
            },
            queue,
        )
        .map_err(|e| SetupError::Connect(e.kind()))?;
    Ok((port_name.to_string(), conn))
}

#[cfg(not(unix))]
fn create_virtual_input(
    _midi_in: MidiInput,
    _port_name: &str,
    _queue: InputQueue,
) -> Result<(String, MidiInputConnection<InputQueue>), SetupError> {
    Err(SetupError::VirtualUnsupported)
}

fn connect_input(
    midi_in: MidiInput,
    query: &str,
    client_name: &str,
    queue: InputQueue,
) -> Result<(String, MidiInputConnection<InputQueue>), SetupError> {
    let ports = midi_in.ports();
    if ports.is_empty() {
        return Err(SetupError::NoInputPorts);
    }
    let names = ports
        .iter()
        .map(|p| midi_in.port_name(p))
        .collect::<Result<Vec<String>, _>>()?;
    let index = find_port(&names, query)
        .ok_or_else(|| SetupError::PortNotFound(query.to_string()))?;
    let port: &MidiInputPort = &ports[index];

    info!("opening input port \"{}\"", names[index]);
    let conn = midi_in
        .connect(
            port,
            client_name,
            |stamp, message, queue: &mut InputQueue| {
                queue.push(stamp_of(stamp), message);
            },
            queue,
        )
        .map_err(|e| SetupError::Connect(e.kind()))?;
    Ok((names[index].clone(), conn))
}

fn select_output_port(midi_out: &MidiOutput, query: &str) -> Result<MidiOutputPort, SetupError> {
    let ports = midi_out.ports();
    let names = ports
        .iter()
        .map(|p| midi_out.port_name(p))
        .collect::<Result<Vec<String>, _>>()?;
    let index = choose_output(&names, query)?;
    Ok(ports[index].clone())
}

/// Index of the first port whose name contains `query`.
pub fn find_port(names: &[String], query: &str) -> Option<usize> {
    names.iter().position(|name| name.contains(query))
}

/// Picks the output port to open: the only one there is, the one matching
/// `query`, or else the most recently added one.
///
/// The fallback is the last port rather than the first: backends append
/// newly created ports, so a virtual input opened a moment ago is at the
/// end of the list, while the first entry is usually a system port such as
/// "Midi Through".
pub fn choose_output(names: &[String], query: &str) -> Result<usize, SetupError> {
    match names.len() {
        0 => Err(SetupError::NoOutputPorts),
        1 => Ok(0),
        n => {
            info!("{} output ports found", n);
            Ok(find_port(names, query).unwrap_or_else(|| {
                warn!(
                    "no output port matches \"{}\", using \"{}\"",
                    query,
                    names[n - 1]
                );
                n - 1
            }))
        }
    }
}

/// Prints every input and output port the system currently offers.
pub fn list_ports(client_name: &str) -> Result<(), SetupError> {
    let midi_in = MidiInput::new(client_name)?;
    let midi_out = MidiOutput::new(client_name)?;

    println!("Available input ports:");
    for (i, p) in midi_in.ports().iter().enumerate() {
        println!("{}: {}", i, midi_in.port_name(p)?);
    }
    println!("\nAvailable output ports:");
    for (i, p) in midi_out.ports().iter().enumerate() {
        println!("{}: {}", i, midi_out.port_name(p)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_outputs_is_an_error() {
        let err = choose_output(&[], "x").unwrap_err();
        assert!(matches!(err, SetupError::NoOutputPorts));
    }

    #[test]
    fn single_output_is_taken_as_is() {
        let list = names(&["Midi Through:0"]);
        assert_eq!(choose_output(&list, "loopback").unwrap(), 0);
    }

    #[test]
    fn matching_output_wins() {
        let list = names(&[
            "Midi Through:Midi Through Port-0 14:0",
            "midir-loopback input:midir-loopback input 128:0",
            "USB Keyboard 20:0",
        ]);
        assert_eq!(choose_output(&list, "midir-loopback input").unwrap(), 1);
    }

    #[test]
    fn falls_back_to_newest_output() {
        let list = names(&["Midi Through", "USB Keyboard"]);
        assert_eq!(choose_output(&list, "nothing like it").unwrap(), 1);
    }

    #[test]
    fn find_port_by_substring() {
        let list = names(&["IAC Bus 1", "IAC Bus 2"]);
        assert_eq!(find_port(&list, "Bus 2"), Some(1));
        assert_eq!(find_port(&list, "Bus 3"), None);
    }
}
