//! ubxbase — RTK base station configurator for u-blox GNSS receivers
//!
//! This crate configures a generation 9+ u-blox RTK receiver (e.g. ZED-F9P)
//! to operate in base station mode over a local serial port, and verifies
//! that the configuration took effect by watching the receiver's own output
//! stream. RTCM 1006 (Antenna Reference Data) is only emitted while the base
//! station is active, so receipt of that message type is used as the success
//! criterion.
//!
//! The library is split into the protocol codec (`protocol`), the base
//! station core (`base`) and small shared helpers (`utils`, `cli`). The
//! `ubxbase` and `ubxsetrate` binaries are thin shells over these modules.

pub mod base;
pub mod cli;
pub mod protocol;
pub mod utils;
