//! Detector-side helpers.
//!
//! The page heuristics that turn DOM text into [`WinEventPayload`]s are not
//! part of this crate. What is here sits between those heuristics and the
//! transport: repeat suppression and scan scheduling.
//!
//! [`WinEventPayload`]: crate::objects::WinEventPayload

pub mod scheduler;
pub mod throttle;

pub use scheduler::{ChangeNotifier, ScanScheduler, ScanSchedulerConfig, ScanTrigger};
pub use throttle::{DetectorThrottle, ThrottleConfig, ThrottleMode};
