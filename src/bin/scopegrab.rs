#![deny(clippy::unwrap_used)]

use clap::{arg, command, value_parser};
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use scopectrl::proto::{self, Result};
use scopectrl::screendump::{self, DumpError};
use scopectrl::{Device, DEFAULT_BAUDRATE, DEFAULT_TTY, DUMP_BAUDRATE};

/// The meter needs a few seconds to execute `PC` and `QP`.
const EXEC_SETTLE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> tokio_serial::Result<()> {
    let matches = command!() // requires `cargo` feature
        .about("Capture a screendump from a Fluke ScopeMeter")
        .arg(
            arg!(
                -p --device <PORT> "Serial port the ScopeMeter is connected to"
            )
            .default_value(DEFAULT_TTY)
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(<format> "p = save as Postscript, b = save as X11 bitmap").value_parser(["p", "b"]))
        .arg(arg!(<output> "Name of file to save as").value_parser(value_parser!(PathBuf)))
        .get_matches();

    let output = matches
        .get_one::<PathBuf>("output")
        .expect("output is required");

    // Create the output file before talking to the device, so a bad
    // filename fails before the baudrate dance starts.
    let mut outfile = match File::create(output) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("{}: {}", output.display(), err);
            exit(-1);
        }
    };

    let raw = match grab(&matches).await {
        Ok(raw) => raw,
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
    };

    println!("Processing data...");

    let image = match transcode(&matches, &raw) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("{}", err);
            exit(-1);
        }
    };

    if let Err(err) = outfile.write_all(&image) {
        eprintln!("{}: {}", output.display(), err);
        exit(-1);
    }

    Ok(())
}

/// Run the baudrate renegotiation handshake around the bulk transfer and
/// return the raw dump. The ScopeMeter powers up at 1200 baud, so comms
/// start there, switch both ends to 19200 for the transfer, and revert
/// afterwards so the meter stays usable without cycling the power.
async fn grab(matches: &clap::ArgMatches) -> Result<Vec<u8>> {
    let port = matches
        .get_one::<PathBuf>("device")
        .expect("Requires device parameter");
    let path = port.to_string_lossy();

    println!("Setting PC baudrate to {}...", DEFAULT_BAUDRATE);
    let mut device = Device::new(&path, DEFAULT_BAUDRATE, EXEC_SETTLE)?;

    println!("Setting ScopeMeter baudrate to {}...", DUMP_BAUDRATE);
    device.set_baud_rate(DUMP_BAUDRATE).await?;

    // Reopen instead of reconfiguring in place, so nothing buffered at
    // the old rate survives.
    drop(device);
    println!("Setting PC baudrate to {}...", DUMP_BAUDRATE);
    let mut device = Device::new(&path, DUMP_BAUDRATE, EXEC_SETTLE)?;

    println!("Sending command to get screendump...");
    device.request_screendump().await?;

    println!("Reading data...");
    let raw = device
        .read_screendump(|_| {
            print!("*");
            std::io::stdout().flush().expect("Unable to flush stdout");
        })
        .await?;
    println!();

    println!("Setting ScopeMeter baudrate to {}...", DEFAULT_BAUDRATE);
    device.set_baud_rate(DEFAULT_BAUDRATE).await?;

    Ok(raw)
}

fn transcode(matches: &clap::ArgMatches, raw: &[u8]) -> std::result::Result<Vec<u8>, DumpError> {
    let format = matches
        .get_one::<String>("format")
        .expect("format is required");
    let output = matches
        .get_one::<PathBuf>("output")
        .expect("output is required");

    if format == "p" {
        println!("Writing Postscript file...");
        screendump::to_postscript(raw)
    } else {
        println!("Writing X11 bitmap file...");
        screendump::to_xbm(raw, &screendump::symbol_name(output))
    }
}
