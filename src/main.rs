use std::process::exit;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::info;

use midir_loopback::ports::list_ports;
use midir_loopback::{run, HarnessConfig, NotePattern, Schedule, StopFlag};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(
        short,
        long,
        help = "Pause until the MIDI ports have been connected by hand"
    )]
    wait_connect: bool,

    #[arg(short, long, help = "List available MIDI ports and exit")]
    list: bool,

    #[arg(
        short,
        long,
        default_value_t = 8,
        help = "Number of notes to send; 0 sends a single note-on"
    )]
    notes: usize,

    #[arg(long, help = "Seed for the random note pattern")]
    seed: Option<u64>,

    #[arg(
        long,
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..16)
    )]
    channel: u8,

    #[arg(long, help = "Use this existing input port instead of a virtual one")]
    input_port: Option<String>,

    #[arg(long, help = "Output port to open (name substring)")]
    output_port: Option<String>,

    #[arg(
        long,
        default_value_t = 5.0,
        help = "Largest acceptable RMS error of inter-message delays"
    )]
    max_rms_ms: f64,

    #[arg(
        long,
        default_value_t = 1000,
        help = "How long to wait for messages after the last send"
    )]
    timeout_ms: u64,

    #[arg(long, help = "Do not check the timer against a wall-clock sleep first")]
    skip_timer_check: bool,
}

impl Args {
    fn config(&self) -> HarnessConfig {
        let defaults = HarnessConfig::default();
        HarnessConfig {
            input_port: self.input_port.clone(),
            output_port: self.output_port.clone(),
            wait_connect: self.wait_connect,
            receive_timeout: Duration::from_millis(self.timeout_ms),
            max_rms_ms: self.max_rms_ms,
            timer_check: if self.skip_timer_check { None } else { defaults.timer_check },
            ..defaults
        }
    }

    fn schedule(&self) -> Schedule {
        if self.notes == 0 {
            return Schedule::single_note();
        }
        let seed = self.seed.unwrap_or_else(rand::random);
        println!("Pattern seed: {}", seed);
        NotePattern {
            notes: self.notes,
            channel: self.channel,
            seed,
            ..NotePattern::default()
        }
        .generate()
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list {
        if let Err(err) = list_ports(&HarnessConfig::default().client_name) {
            println!("Error: {}", err);
            exit(1);
        }
        return;
    }

    let stop = match StopFlag::install() {
        Ok(stop) => stop,
        Err(err) => {
            println!("Error: could not install interrupt handler: {}", err);
            exit(1);
        }
    };

    let config = args.config();
    let schedule = args.schedule();
    info!("{} messages scheduled", schedule.len());

    match run(&config, &schedule, &stop) {
        Ok(report) => {
            print!("{}", report);
            println!("PASS");
        }
        Err(err) => {
            println!("Error: {}", err);
            println!("FAIL");
            exit(1);
        }
    }
}
