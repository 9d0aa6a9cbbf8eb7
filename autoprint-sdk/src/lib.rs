//! AutoPrint SDK
//!
//! Wire types shared between the detector, the operator tooling and the
//! AutoPrint server, plus the detector-side throttle and scan scheduler.
//! The HTTP clients live behind the `client` cargo feature.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod detector;
pub mod objects;
