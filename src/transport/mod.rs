//! Byte-stream transport for newline-framed envelopes.

use crate::protocol::Envelope;

pub mod tcp;

pub use tcp::{connect, split, FrameReader, FrameWriter};

/// Source of complete frames (one line each, delimiter stripped).
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Next complete line, or `Ok(None)` once the peer has closed.
    async fn next_frame(&mut self) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Sink that encodes and transmits envelopes.
#[async_trait::async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, envelope: &Envelope) -> anyhow::Result<()>;

    /// Flush and close the write side.
    async fn shutdown(&mut self) -> anyhow::Result<()>;
}
