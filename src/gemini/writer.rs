use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

use crate::gemini::response::Response;

/// Body bytes written per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Send-buffer level that pauses writing.
pub const DEFAULT_HIGH_WATER: usize = 64 * 1024;

/// Send-buffer level that resumes writing.
pub const DEFAULT_LOW_WATER: usize = 16 * 1024;

/// Write-permission flag shared between a transport and its writer.
///
/// The transport clears it with [`pause`](WriteGate::pause) when its send
/// buffer is saturated and sets it again with [`resume`](WriteGate::resume).
/// Writers call [`writable`](WriteGate::writable) before every chunk.
#[derive(Debug, Clone)]
pub struct WriteGate {
    tx: Arc<watch::Sender<bool>>,
}

impl WriteGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn pause(&self) {
        self.tx.send_if_modified(|open| std::mem::replace(open, false));
    }

    pub fn resume(&self) {
        self.tx.send_if_modified(|open| !std::mem::replace(open, true));
    }

    pub fn is_writable(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the gate is open.
    pub async fn writable(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for WriteGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes handed to the transport but not yet accepted by the stream.
///
/// Crossing the high watermark pauses the gate; draining back to the low
/// watermark resumes it. A pause that came from elsewhere is left alone.
#[derive(Debug)]
struct SendBuffer {
    gate: WriteGate,
    queued: AtomicUsize,
    peak: AtomicUsize,
    throttled: AtomicBool,
    high_water: usize,
    low_water: usize,
}

impl SendBuffer {
    fn queue(&self, len: usize) {
        let queued = self.queued.fetch_add(len, Ordering::AcqRel) + len;
        self.peak.fetch_max(queued, Ordering::AcqRel);

        if queued >= self.high_water && !self.throttled.swap(true, Ordering::AcqRel) {
            self.gate.pause();
        }
    }

    fn drained(&self, len: usize) {
        let queued = self.queued.fetch_sub(len, Ordering::AcqRel) - len;

        if queued <= self.low_water && self.throttled.swap(false, Ordering::AcqRel) {
            self.gate.resume();
        }
    }
}

/// Writes one response: the status line, then the body in bounded chunks.
///
/// Chunks go through a send buffer that a drain loop empties into the
/// stream. A chunk is only handed over while the gate is open.
pub struct ResponseWriter<W> {
    stream: W,
    gate: WriteGate,
    chunk_size: usize,
    high_water: usize,
    low_water: usize,
    written: u64,
    peak_buffered: usize,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(stream: W, gate: WriteGate, chunk_size: usize) -> Self {
        Self {
            stream,
            gate,
            chunk_size: chunk_size.max(1),
            high_water: DEFAULT_HIGH_WATER,
            low_water: DEFAULT_LOW_WATER,
            written: 0,
            peak_buffered: 0,
        }
    }

    /// Overrides the send-buffer watermarks. `low` is clamped to `high`.
    pub fn with_watermarks(mut self, high: usize, low: usize) -> Self {
        self.high_water = high.max(1);
        self.low_water = low.min(self.high_water);
        self
    }

    /// Largest send-buffer level seen while writing.
    pub fn peak_buffered(&self) -> usize {
        self.peak_buffered
    }

    /// Writes the status line and, on success, the whole body.
    ///
    /// Returns the number of body bytes sent.
    pub async fn send(&mut self, response: Response) -> io::Result<u64> {
        let buffer = SendBuffer {
            gate: self.gate.clone(),
            queued: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            throttled: AtomicBool::new(false),
            high_water: self.high_water,
            low_water: self.low_water,
        };
        let (tx, rx) = mpsc::unbounded_channel();

        let produce = produce(response, tx, &buffer, self.chunk_size);
        let drain = drain(&mut self.stream, rx, &buffer);
        let (body_bytes, written) = tokio::try_join!(produce, drain)?;

        self.written += written;
        self.peak_buffered = self.peak_buffered.max(buffer.peak.load(Ordering::Acquire));
        self.stream.flush().await?;
        Ok(body_bytes)
    }

    /// Flushes and half-closes the write side.
    pub async fn finish(mut self) -> io::Result<u64> {
        self.stream.shutdown().await?;
        Ok(self.written)
    }
}

/// Feeds the status line and body chunks to the send buffer, waiting for
/// write permission before each one.
async fn produce(
    response: Response,
    tx: mpsc::UnboundedSender<Bytes>,
    buffer: &SendBuffer,
    chunk_size: usize,
) -> io::Result<u64> {
    let hand_over = |chunk: Bytes| {
        buffer.queue(chunk.len());
        tx.send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"))
    };

    buffer.gate.writable().await;
    hand_over(Bytes::from(response.status_line()))?;

    if !response.status.is_success() {
        return Ok(0);
    }
    let Some(mut body) = response.body else {
        return Ok(0);
    };

    let mut buf = BytesMut::with_capacity(chunk_size);
    let mut total = 0u64;

    loop {
        buf.reserve(chunk_size);
        let n = (&mut body)
            .take(chunk_size as u64)
            .read_buf(&mut buf)
            .await?;

        if n == 0 {
            break;
        }

        buffer.gate.writable().await;
        hand_over(buf.split().freeze())?;
        total += n as u64;
    }

    Ok(total)
}

/// Empties the send buffer into the stream in order.
async fn drain<W>(
    stream: &mut W,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    buffer: &SendBuffer,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;

    while let Some(chunk) = rx.recv().await {
        stream.write_all(&chunk).await?;
        written += chunk.len() as u64;
        buffer.drained(chunk.len());
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_buffer(gate: &WriteGate) -> SendBuffer {
        SendBuffer {
            gate: gate.clone(),
            queued: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            throttled: AtomicBool::new(false),
            high_water: 100,
            low_water: 20,
        }
    }

    #[tokio::test]
    async fn gate_starts_open() {
        let gate = WriteGate::new();
        assert!(gate.is_writable());
        gate.writable().await;
    }

    #[tokio::test]
    async fn paused_gate_blocks_until_resume() {
        let gate = WriteGate::new();
        gate.pause();
        assert!(!gate.is_writable());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.writable().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        gate.resume();
        waiter.await.unwrap();
    }

    #[test]
    fn watermarks_toggle_gate() {
        let gate = WriteGate::new();
        let buffer = send_buffer(&gate);

        buffer.queue(60);
        assert!(gate.is_writable());
        buffer.queue(60);
        assert!(!gate.is_writable());

        buffer.drained(60);
        assert!(!gate.is_writable());
        buffer.drained(50);
        assert!(gate.is_writable());
        assert_eq!(buffer.peak.load(Ordering::Acquire), 120);
    }

    #[test]
    fn drain_leaves_external_pause_alone() {
        let gate = WriteGate::new();
        let buffer = send_buffer(&gate);

        gate.pause();
        buffer.queue(10);
        buffer.drained(10);
        assert!(!gate.is_writable());
    }
}
