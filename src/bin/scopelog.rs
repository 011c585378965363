#![deny(clippy::unwrap_used)]

use chrono::Local;
use clap::{arg, command, value_parser};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use scopectrl::idle::IdleTimer;
use scopectrl::proto::command::ChannelSelection;
use scopectrl::proto::{self, Result};
use scopectrl::{Device, DEFAULT_BAUDRATE, DEFAULT_TTY};

/// A cycle that passes without any reply from the device ends the run.
const POLL_IDLE: Duration = Duration::from_secs(5);

const DEFAULT_SETTLE_US: u64 = 300_000;

#[tokio::main]
async fn main() -> tokio_serial::Result<()> {
    let matches = command!() // requires `cargo` feature
        .about("Fluke ScopeMeter data logger")
        .arg(
            arg!(
                -p --device <PORT> "Serial port the ScopeMeter is connected to"
            )
            .default_value(DEFAULT_TTY)
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(
                -c --channels <SELECTOR> "1 = A main, 2 = A main+sub, 3 = A+B main, 4 = A+B main+sub"
            )
            .default_value("1")
            .required(false)
            .value_parser(value_parser!(u8).range(1..=4)),
        )
        .arg(
            arg!(
                -s --settle <MICROSECONDS> "Delay after sending a command, both tx & rx"
            )
            .default_value(DEFAULT_SETTLE_US.to_string())
            .required(false)
            .value_parser(value_parser!(u64)),
        )
        .get_matches();

    match run(&matches).await {
        Ok(()) => {}
        Err(e) => {
            match e {
                proto::ProtoError::Serial(err) => {
                    let port = matches
                        .get_one::<PathBuf>("device")
                        .expect("Requires device parameter")
                        .display();

                    if err.kind() == tokio_serial::ErrorKind::NoDevice
                        || matches!(err.kind(), tokio_serial::ErrorKind::Io(ErrorKind::NotFound))
                    {
                        eprintln!("{}: File not found", port);
                    } else {
                        eprintln!("I/O Error: {} [device: {}]", err, port,);
                    }
                    exit(-1);
                }
                proto::ProtoError::Io(err) => {
                    let port = matches
                        .get_one::<PathBuf>("device")
                        .expect("Requires device parameter")
                        .display();

                    if err.kind() == ErrorKind::NotFound {
                        eprintln!("{}: File not found", port);
                    } else {
                        eprintln!("I/O Error: {} [device: {}]", err, port,);
                    }
                    exit(-1);
                }
                proto::ProtoError::SyntaxError
                | proto::ProtoError::ExecutionError
                | proto::ProtoError::SynchronizationError
                | proto::ProtoError::CommunicationsError
                | proto::ProtoError::UnknownAcknowledge(_) => {
                    eprintln!("{}", e);
                    eprintln!("Program aborted");
                    exit(-1);
                }
                proto::ProtoError::NoReply | proto::ProtoError::Abort => {
                    eprintln!("Failed to communicate with device, aborting!");
                    exit(-1);
                }
                proto::ProtoError::DumpOverflow(_) | proto::ProtoError::Unexpected(_) => {
                    eprintln!("{}", e);
                    exit(-1);
                }
            }
        }
    }

    Ok(())
}

async fn run(matches: &clap::ArgMatches) -> Result<()> {
    let port = matches
        .get_one::<PathBuf>("device")
        .expect("Requires device parameter");
    let selector = matches
        .get_one::<u8>("channels")
        .expect("channels has a default");
    let channels =
        ChannelSelection::from_selector(*selector).expect("Selector range is checked by clap");
    let settle = matches
        .get_one::<u64>("settle")
        .expect("settle has a default");

    let mut device = Device::new(
        port.to_string_lossy(),
        DEFAULT_BAUDRATE,
        Duration::from_micros(*settle),
    )?;
    let mut stdout = std::io::stdout();

    // The timer is rearmed once per full cycle. A device that stays
    // silent stretches the cycle past the idle period and ends the run;
    // that is the intended way to stop the logger, not an error.
    let idle = IdleTimer::new(POLL_IDLE);
    loop {
        if idle.expired() {
            break;
        }

        print!("{}   ", Local::now().format("%H:%M:%S"));
        for (i, source) in channels.sources().iter().enumerate() {
            if i > 0 {
                print!("   ");
            }
            print!("{}: ", source.label());
            stdout.flush()?;
            if let Some(reading) = device.measurement(*source).await? {
                print!("{}", reading);
                stdout.flush()?;
            }
        }
        println!();

        idle.rearm();
    }

    Ok(())
}
