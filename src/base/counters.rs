//! Shared progress counters.
//!
//! The monitor thread is the sole writer; the controller only takes read
//! snapshots. Fields are evaluated independently while the monitor runs,
//! and the final success check happens after the monitor has joined, so no
//! cross-field consistency is required of in-flight reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

#[derive(Debug, Default, Clone)]
pub struct ProgressCounters {
    /// Transactions written to the device.
    pub sent: u32,
    /// CFG-VALSET acknowledgements received.
    pub acked: u32,
    /// CFG-VALSET rejections received.
    pub naked: u32,
    /// RTCM 1006 (active base) frames observed.
    pub rtcm_1006: u32,
    /// Survey-in elapsed seconds as last reported by NAV-SVIN.
    pub svin_elapsed_s: u32,
    /// Timestamp of the most recent acknowledgement or rejection.
    pub last_ack_at: Option<DateTime<Utc>>,
}

pub type SharedCounters = Arc<RwLock<ProgressCounters>>;

pub fn shared() -> SharedCounters {
    Arc::new(RwLock::new(ProgressCounters::default()))
}
