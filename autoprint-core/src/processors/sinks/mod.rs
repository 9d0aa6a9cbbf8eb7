//! Downstream actions a dispatched win fans out to.
//!
//! Every sink turns one call into a [`SinkOutcome`]; no sink returns an
//! error to the dispatcher. Collaborator calls are bounded by a per-sink
//! timeout and never retried.

pub mod chat;
pub mod printer;
pub mod wheel;

pub use chat::{ChatAnnouncer, ChatSink, HttpChatAnnouncer};
pub use printer::{CommandPrinter, CooldownGate, LabelJob, LabelPrinter, PrinterSink};
pub use wheel::{HttpWheelForwarder, WheelForwarder, WheelSink};

use std::future::Future;
use std::time::Duration;

use autoprint_sdk::objects::SinkOutcome;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("printer exited with {code:?}: {stderr}")]
    PrinterExit { code: Option<i32>, stderr: String },
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("collaborator declined the request")]
    Declined,
}

/// Run a collaborator call under `limit` and map the result to an outcome.
pub(crate) async fn bounded<F>(limit: Duration, call: F) -> SinkOutcome
where
    F: Future<Output = Result<(), SinkError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(())) => SinkOutcome::Delivered,
        Ok(Err(e)) => SinkOutcome::failed(e),
        Err(_) => SinkOutcome::TimedOut,
    }
}
