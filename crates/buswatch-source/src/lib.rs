//! Byte source and clock abstractions.
//!
//! The sniffer core never owns a device or a clock. It is handed:
//! - a [`ByteSource`] that can be polled without blocking
//! - a [`Clock`] returning wrapping 32-bit microsecond timestamps
//!
//! This is the lowest layer of buswatch. [`ReadSource`] adapts serial ports,
//! files and pipes; [`SliceSource`] and [`ManualClock`] drive replays and
//! tests.

pub mod clock;
pub mod error;
pub mod reader;
pub mod traits;

pub use clock::{ManualClock, MonotonicClock};
pub use error::{Result, SourceError};
pub use reader::{ReadSource, SliceSource};
pub use traits::{elapsed, ByteSource, Clock, Micros};
