use std::time::Duration;

use anyhow::{Context, Result};
use serialport::{DataBits, Parity, SerialPort, StopBits};

/// Open a serial port with the standard 8N1 framing used by u-blox
/// receivers. The timeout bounds every read, which is what keeps the
/// monitor loop responsive to its stop flag.
pub fn open_serial(port: &str, baud: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    serialport::new(port, baud)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .timeout(timeout)
        .open()
        .with_context(|| format!("failed to open serial port {port} @ {baud} baud"))
}
