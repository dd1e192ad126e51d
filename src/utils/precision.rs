//! Standard / high-precision coordinate splitting.
//!
//! The CFG-TMODE keys store each fixed coordinate as an integer standard
//! part plus a signed high-precision residual in 0.01 units of the standard
//! resolution, so `standard + residual / 100` recovers the input to the
//! resolution of the residual.

use anyhow::{bail, Result};

/// Split a centimetre value into whole centimetres and a residual in
/// tenths of a millimetre.
pub fn split_cm(value: f64) -> Result<(i32, i8)> {
    split(value)
}

/// Split a value in degrees into 1e-7 degree units and a residual in
/// 1e-9 degree units.
pub fn split_deg(value: f64) -> Result<(i32, i8)> {
    split(value * 1e7)
}

fn split(scaled: f64) -> Result<(i32, i8)> {
    if !scaled.is_finite() {
        bail!("coordinate value is not a finite number");
    }
    let standard = scaled.trunc();
    if standard < i32::MIN as f64 || standard > i32::MAX as f64 {
        bail!("coordinate value {scaled} out of range");
    }
    let residual = ((scaled - standard) * 100.0).round();
    Ok((standard as i32, residual as i8))
}
