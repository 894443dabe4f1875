use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::codec::{self, DELIMITER};
use crate::config::{MAX_FRAME_LEN, WRITE_TIMEOUT};
use crate::protocol::Envelope;
use crate::transport::{FrameSink, FrameSource};

const READ_CHUNK: usize = 4096;

fn read_error(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        ErrorKind::UnexpectedEof => anyhow::anyhow!("Connection closed by peer"),
        ErrorKind::ConnectionReset => anyhow::anyhow!("Connection reset by peer"),
        _ => anyhow::anyhow!("Read error: {}", e),
    }
}

fn write_error(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
            anyhow::anyhow!("Connection closed by peer")
        }
        _ => anyhow::anyhow!("Write error: {}", e),
    }
}

/// Reassembles newline-terminated frames from a byte stream.
///
/// Bytes are buffered across reads until a delimiter arrives, so a line split
/// over several TCP segments is only ever returned whole. `next_frame` is
/// cancel-safe: dropping it mid-read loses no buffered bytes.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    idle_timeout: Option<Duration>,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            idle_timeout: None,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Fail a read that sees no bytes for `idle_timeout`.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Pops the first complete line out of the buffer, skipping blank lines.
    /// A line longer than `max_frame_len` is an error even when terminated.
    fn take_line(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        while let Some(pos) = self.buf.iter().position(|&b| b == DELIMITER) {
            if pos > self.max_frame_len {
                return Err(anyhow::anyhow!(
                    "Frame too large: {} bytes (max: {})",
                    pos,
                    self.max_frame_len
                ));
            }
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> FrameSource for FrameReader<R> {
    async fn next_frame(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        loop {
            if let Some(line) = self.take_line()? {
                return Ok(Some(line));
            }
            if self.buf.len() > self.max_frame_len {
                return Err(anyhow::anyhow!(
                    "Frame too large: {} bytes without a delimiter (max: {})",
                    self.buf.len(),
                    self.max_frame_len
                ));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let read = self.inner.read(&mut chunk);
            let n = match self.idle_timeout {
                Some(limit) => timeout(limit, read)
                    .await
                    .map_err(|_| anyhow::anyhow!("Connection idle timeout exceeded ({:?})", limit))?,
                None => read.await,
            }
            .map_err(read_error)?;

            if n == 0 {
                if !self.buf.is_empty() {
                    log::debug!("discarding {} bytes of unterminated frame at EOF", self.buf.len());
                }
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Encodes envelopes onto a byte stream, one line each.
pub struct FrameWriter<W> {
    inner: W,
    timeout_duration: Duration,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            timeout_duration: WRITE_TIMEOUT,
        }
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for FrameWriter<W> {
    async fn send(&mut self, envelope: &Envelope) -> anyhow::Result<()> {
        let data = codec::encode(envelope)
            .map_err(|e| anyhow::anyhow!("Serialization error: {}", e))?;
        let limit = self.timeout_duration;
        let inner = &mut self.inner;
        let send_op = async move {
            inner.write_all(&data).await.map_err(write_error)?;
            inner.flush().await.map_err(write_error)
        };
        timeout(limit, send_op)
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", limit))?
    }

    async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.inner.shutdown().await.map_err(write_error)
    }
}

/// Split any duplex byte stream into a frame reader and writer.
pub fn split<S>(stream: S) -> (FrameReader<ReadHalf<S>>, FrameWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (read, write) = tokio::io::split(stream);
    (FrameReader::new(read), FrameWriter::new(write))
}

/// Connect to a server and split the connection.
pub async fn connect<A: ToSocketAddrs>(
    addr: A,
) -> anyhow::Result<(FrameReader<ReadHalf<TcpStream>>, FrameWriter<WriteHalf<TcpStream>>)> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(split(stream))
}
