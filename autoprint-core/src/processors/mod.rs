//! Processors of the win pipeline:
//!
//! - `AdmissionController`: classifies and stores wins, emits `DispatchRequest`
//! - `Dispatcher`: receives `DispatchRequest`, fans out to the sinks
//! - `sinks`: printer, chat and wheel

pub mod admission;
pub mod dispatcher;
pub mod sinks;

pub use admission::{AdmissionController, AdmissionDecision, AdmissionError};
pub use dispatcher::Dispatcher;
