//! Command line adapter for the Linptech BLE decoder.
//!
//! The runner stands in for a host application: it decodes service data given
//! on the command line, replays captured advertisements against a devices file,
//! and encodes test frames. All frame handling is delegated to
//! [`mibeacon_packet`]; this crate only routes, reports and records metrics.

mod capture;
mod encode;
mod error;
mod logging;
mod replay;

pub use capture::*;
pub use encode::*;
pub use error::*;
pub use logging::*;
pub use replay::*;
