#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # SSI Core
//!
//! Timer-driven reader for absolute encoders speaking SSI (synchronous serial
//! interface). The clock line is generated and the data line sampled entirely
//! from a periodic timer interrupt; the foreground only arms acquisitions and
//! drains finished samples.

pub mod types;
pub mod handoff;
pub mod fsm;
pub mod controller;
pub mod report;
pub mod hal;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use handoff::*;
pub use fsm::*;
pub use controller::*;
pub use report::*;
pub use hal::{*, Instant, Duration};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reference configuration: poll-count spacing, leading bit dropped, 5 µm per count
pub fn default_config() -> SsiConfig {
    SsiConfig::default()
}
