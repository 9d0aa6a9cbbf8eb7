//! Event system of the win pipeline.
//!
//! # Event Flow
//!
//! 1. `AdmissionController` stores a win and emits `DispatchRequest` -> `Dispatcher`
//! 2. `Dispatcher` fans the request out to the printer, chat and wheel sinks
//! 3. Both publish `PipelineNotice`s for operators
//!
//! Dispatch requests carry the full win so the dispatcher never reads the
//! ledger; a show may end while its wins are still being printed.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, DispatchRequestReceiver, DispatchRequestSender, NoticeSender,
    dispatch_request_channel, notice_channel,
};

pub use types::{DispatchOrigin, DispatchRequest, PipelineNotice};
