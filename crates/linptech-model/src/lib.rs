//! Configuration model for Linptech BLE sensors.
//!
//! This crate loads the devices file that maps sensor addresses to bindkeys
//! and display names, and holds the registry of supported products.
//!
//! ```rust
//! use linptech_model::load_devices_from_str;
//!
//! let set = load_devices_from_str(r#"
//! devices:
//!   - address: "A4:C1:38:5A:0B:1C"
//!     bindkey: "b853075158487ca39a5b5ea9b0a2f4cd"
//! "#).unwrap();
//! assert_eq!(set.len(), 1);
//! ```

mod config;
mod error;
mod products;

pub use config::*;
pub use error::*;
pub use products::*;
