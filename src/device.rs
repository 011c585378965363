use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tokio_util::codec::{Decoder, Framed};

use crate::idle::IdleTimer;
use crate::proto::{
    codec::ProtocolCodec,
    command::{Command, Source},
    response::{Response, ResponsePayload},
    ProtoError, Result,
};

/// Per-read timeout. The ScopeMeter link is half duplex, so a read that
/// stays silent for this long carried no reply.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound for a raw screendump transfer.
pub const DUMP_CAPACITY: usize = 65535;

/// Inactivity window that ends the bulk screendump transfer.
const DUMP_IDLE: Duration = Duration::from_secs(2);

const SCRATCH_LEN: usize = 16384;

pub struct Device<T = SerialStream> {
    stream: Framed<T, ProtocolCodec>,
    settle: Duration,
}

impl Device {
    /// Open `path` at the given baudrate: 8 data bits, no parity, XON/XOFF
    /// flow control. `settle` is the pause between sending a command and
    /// reading its reply, giving the half-duplex link time to turn around.
    pub fn new(path: impl AsRef<str>, baudrate: u32, settle: Duration) -> Result<Self> {
        let mut port = tokio_serial::new(path.as_ref(), baudrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::Software)
            .timeout(READ_TIMEOUT)
            .open_native_async()?;

        #[cfg(unix)]
        port.set_exclusive(false)
            .expect("Unable to set serial port exclusive to false");

        let stream = ProtocolCodec::default().framed(port);

        Ok(Self { stream, settle })
    }
}

#[cfg(test)]
impl Device<crate::proto::fake::FakeBuffer> {
    pub(crate) fn new_faked(response_buf: Vec<u8>) -> Self {
        let stream = ProtocolCodec::default().framed(crate::proto::fake::FakeBuffer::new(
            response_buf,
        ));

        Self {
            stream,
            settle: Duration::ZERO,
        }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Device<T> {
    /// Send one command, settle, read at most one reply. `Ok(None)` means
    /// the device stayed silent for the whole read window.
    async fn request(&mut self, command: Command) -> Result<Option<Response>> {
        self.stream.send(command).await?;
        tokio::time::sleep(self.settle).await;
        match tokio::time::timeout(READ_TIMEOUT, self.stream.next()).await {
            Ok(Some(Ok(response))) => Ok(Some(response)),
            Ok(Some(Err(err))) => Err(err),
            Ok(None) => Err(ProtoError::Abort),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Query one reading (`QM`). Returns `Ok(None)` when the device had no
    /// reply ready; deciding whether that ends the run is left to the
    /// caller's inactivity timer.
    pub async fn measurement(&mut self, source: Source) -> Result<Option<String>> {
        match self.request(Command::QueryMeasurement(source)).await? {
            Some(Response::Success(Some(ResponsePayload::Measurement(line)))) => Ok(Some(line)),
            Some(response) => Err(response.into()),
            None => Ok(None),
        }
    }

    /// Switch the device to another baudrate (`PC`). The local port keeps
    /// its rate; reopen the device to follow.
    pub async fn set_baud_rate(&mut self, baudrate: u32) -> Result<()> {
        match self.request(Command::SetBaudRate(baudrate)).await? {
            Some(Response::Success(None)) => Ok(()),
            Some(response) => Err(response.into()),
            None => Err(ProtoError::NoReply),
        }
    }

    /// Ask the device to stream a screendump (`QP 0,3`). The image bytes
    /// follow the acknowledge; collect them with
    /// [`read_screendump`](Self::read_screendump).
    pub async fn request_screendump(&mut self) -> Result<()> {
        match self.request(Command::RequestScreendump).await? {
            Some(Response::Success(None)) => Ok(()),
            Some(response) => Err(response.into()),
            None => Err(ProtoError::NoReply),
        }
    }

    /// Collect raw screendump bytes until the line stays idle. `progress`
    /// is invoked once per 1024 bytes accumulated with the running total.
    pub async fn read_screendump(&mut self, mut progress: impl FnMut(usize)) -> Result<Vec<u8>> {
        let mut image = Vec::with_capacity(DUMP_CAPACITY);
        let mut reported = 0;

        // Bytes the codec buffered past the acknowledge are image data.
        let leftover = self.stream.read_buffer_mut().split();
        push_chunk(&mut image, &leftover, &mut reported, &mut progress)?;

        let idle = IdleTimer::new(DUMP_IDLE);
        let mut scratch = [0u8; SCRATCH_LEN];
        while !idle.expired() {
            match tokio::time::timeout(READ_TIMEOUT, self.stream.get_mut().read(&mut scratch))
                .await
            {
                Ok(Ok(0)) => {
                    // Stream is dry; wait out the read window before
                    // probing again so the idle timer can run down.
                    tokio::time::sleep(READ_TIMEOUT).await;
                }
                Ok(Ok(n)) => {
                    push_chunk(&mut image, &scratch[..n], &mut reported, &mut progress)?;
                    idle.rearm();
                }
                Ok(Err(err)) => return Err(err.into()),
                Err(_elapsed) => {}
            }
        }
        Ok(image)
    }
}

fn push_chunk(
    image: &mut Vec<u8>,
    chunk: &[u8],
    reported: &mut usize,
    progress: &mut impl FnMut(usize),
) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }
    if image.len() + chunk.len() > DUMP_CAPACITY {
        return Err(ProtoError::DumpOverflow(DUMP_CAPACITY));
    }
    image.extend_from_slice(chunk);
    while image.len() - *reported >= 1024 {
        *reported += 1024;
        progress(*reported);
    }
    Ok(())
}
