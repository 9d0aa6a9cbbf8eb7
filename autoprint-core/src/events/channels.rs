//! Event channel factories and handles.

use super::types::{DispatchRequest, PipelineNotice};
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for DispatchRequest events.
pub type DispatchRequestSender = mpsc::Sender<DispatchRequest>;
/// Receiver handle for DispatchRequest events.
pub type DispatchRequestReceiver = mpsc::Receiver<DispatchRequest>;

/// Create a new DispatchRequest channel.
///
/// Returns a (sender, receiver) pair. The admission controller holds the
/// sender; the dispatcher drains the receiver.
pub fn dispatch_request_channel() -> (DispatchRequestSender, DispatchRequestReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Fan-out handle for [`PipelineNotice`]s.
///
/// Publishing never blocks and never fails: with no subscribers the notice
/// is simply dropped, and slow subscribers observe a lag instead of
/// back-pressuring the pipeline.
#[derive(Clone)]
pub struct NoticeSender {
    tx: broadcast::Sender<PipelineNotice>,
}

impl NoticeSender {
    pub fn publish(&self, notice: PipelineNotice) {
        if self.tx.send(notice).is_err() {
            trace!("No notice subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineNotice> {
        self.tx.subscribe()
    }
}

/// Create the notice broadcast channel.
pub fn notice_channel() -> NoticeSender {
    let (tx, _) = broadcast::channel(DEFAULT_CHANNEL_BUFFER);
    NoticeSender { tx }
}
