//!
//! This library provides communication with a Fluke ScopeMeter over its
//! serial (RS-232) interface.
//!
//! <br>
//!
//! # Details
//!
//! - You need the Fluke optically isolated serial cable attached to your
//!   ScopeMeter. The instrument powers up at 1200 baud.
//!
//! - Basic setup and connection
//!
//!   ```no_run
//!   use std::time::Duration;
//!   use scopectrl::proto::command::Source;
//!   use scopectrl::{Device, DEFAULT_BAUDRATE};
//!   #[tokio::main]
//!   async fn main() -> scopectrl::Result<()> {
//!       let path = "/dev/ttyUSB0".to_string();
//!       let mut device = Device::new(&path, DEFAULT_BAUDRATE, Duration::from_micros(300_000))?;
//!       if let Some(reading) = device.measurement(Source::AMain).await? {
//!           println!("A: {}", reading);
//!       }
//!       Ok(())
//!   }
//!   ```
//!
//! # Supported devices
//!
//!  * Fluke ScopeMeter 90 series (tested with a 97)
//!

pub mod device;
pub mod idle;
pub mod proto;
pub mod screendump;

pub use device::Device;
pub use proto::Result;

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Power-up baudrate of the ScopeMeter.
pub const DEFAULT_BAUDRATE: u32 = 1200;

/// Baudrate negotiated for the bulk screendump transfer.
pub const DUMP_BAUDRATE: u32 = 19200;
