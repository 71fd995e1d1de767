//! Hand-off queue between the network task and the consumer.
//!
//! Single producer (the supervisor's poll loop), single consumer (the
//! driver). Decouples I/O timing from packet consumption: the network
//! loop never blocks on the queue, and the consumer treats an empty
//! queue as a normal idle condition, not an error.

use crate::codec::RawFrame;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Outcome of one consumer wait on the readout queue
#[derive(Debug)]
pub enum Readout {
    /// A raw frame, in FIFO order
    Frame(RawFrame),
    /// The wait timed out with nothing queued. Normal while the
    /// station is being rediscovered; keep waiting.
    Empty,
    /// The producer is gone. Only external shutdown causes this.
    Closed,
}

/// Producer half, owned by the network task
#[derive(Debug, Clone)]
pub struct ReadoutSender {
    tx: mpsc::UnboundedSender<RawFrame>,
}

impl ReadoutSender {
    /// Enqueue one frame. Never blocks; production is naturally
    /// rate-limited by the poll interval, so the queue stays small.
    pub fn push(&self, frame: RawFrame) {
        if self.tx.send(frame).is_err() {
            debug!("consumer gone, dropping frame");
        }
    }
}

/// Consumer half, owned by the driver
#[derive(Debug)]
pub struct ReadoutReceiver {
    rx: mpsc::UnboundedReceiver<RawFrame>,
}

impl ReadoutReceiver {
    /// Wait up to `timeout` for the next frame
    pub async fn pop(&mut self, timeout: Duration) -> Readout {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(frame)) => Readout::Frame(frame),
            Ok(None) => Readout::Closed,
            Err(_) => Readout::Empty,
        }
    }
}

/// Create a connected sender/receiver pair
pub fn readout_channel() -> (ReadoutSender, ReadoutReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReadoutSender { tx }, ReadoutReceiver { rx })
}
