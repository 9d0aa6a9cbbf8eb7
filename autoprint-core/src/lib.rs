//! AutoPrint core: the win pipeline.
//!
//! Detected wins are admitted against the active show's ledger, classified,
//! and dispatched to the printer, chat and wheel sinks. The HTTP surface
//! lives in the server crate.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod entities;
pub mod events;
pub mod payment;
pub mod pipeline;
pub mod processors;
pub mod session;

pub use pipeline::{Pipeline, PipelineBuilder};
