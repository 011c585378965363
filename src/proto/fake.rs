use std::pin::Pin;

/// Serial port stand-in for protocol tests. Hands out the canned response
/// bytes, records everything written to it, and pends once drained so the
/// read-timeout paths behave like a silent device.
pub(crate) struct FakeBuffer {
    response_buf: Vec<u8>,
    written: Vec<u8>,
}

impl FakeBuffer {
    pub(crate) fn new(response_buf: Vec<u8>) -> Self {
        Self {
            response_buf,
            written: Vec::new(),
        }
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.written
    }
}

impl tokio::io::AsyncRead for FakeBuffer {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if self.response_buf.is_empty() {
            return std::task::Poll::Pending;
        }
        let c = if buf.remaining() < self.response_buf.len() {
            buf.remaining()
        } else {
            self.response_buf.len()
        };
        buf.put_slice(&self.response_buf[0..c]);
        self.response_buf.drain(0..c);
        std::task::Poll::Ready(Ok(()))
    }
}

impl tokio::io::AsyncWrite for FakeBuffer {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
        self.written.extend_from_slice(buf);
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}
