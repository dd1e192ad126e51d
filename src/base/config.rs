//! Typed, validated run configuration.
//!
//! All parameter checking happens here, before any device I/O: a value that
//! gets past `BaseConfig::validate` is legal for the whole run.

use std::time::Duration;

use anyhow::{bail, Result};
use num_enum::TryFromPrimitive;
use strum::EnumString;

use crate::protocol::ubx::valset::PortId;

/// Baud rates accepted by the CLI.
pub const BAUD_RATES: [u32; 8] = [4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800];

pub const DEFAULT_ACC_LIMIT_CM: f64 = 100.0;
pub const DEFAULT_DURATION_S: u32 = 60;
pub const DEFAULT_WAIT_TIME_S: f64 = 5.0;

/// Receiver timing mode (CFG-TMODE-MODE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum TimeMode {
    Disabled = 0,
    SurveyIn = 1,
    Fixed = 2,
}

impl std::fmt::Display for TimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeMode::Disabled => write!(f, "disabled"),
            TimeMode::SurveyIn => write!(f, "survey-in"),
            TimeMode::Fixed => write!(f, "fixed"),
        }
    }
}

impl TimeMode {
    /// True for the modes in which the receiver actively broadcasts
    /// corrections once configured.
    pub fn is_active_base(self) -> bool {
        matches!(self, TimeMode::SurveyIn | TimeMode::Fixed)
    }
}

/// Fixed position reference frame (CFG-TMODE-POS_TYPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum PosType {
    Ecef = 0,
    Llh = 1,
}

impl std::fmt::Display for PosType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PosType::Ecef => write!(f, "ECEF"),
            PosType::Llh => write!(f, "LLH"),
        }
    }
}

/// Physical port on which output messages are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum PortType {
    #[strum(serialize = "USB")]
    Usb,
    #[strum(serialize = "UART1")]
    Uart1,
    #[strum(serialize = "UART2")]
    Uart2,
    #[strum(serialize = "I2C")]
    I2c,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortType::Usb => write!(f, "USB"),
            PortType::Uart1 => write!(f, "UART1"),
            PortType::Uart2 => write!(f, "UART2"),
            PortType::I2c => write!(f, "I2C"),
        }
    }
}

impl From<PortType> for PortId {
    fn from(value: PortType) -> Self {
        match value {
            PortType::Usb => PortId::Usb,
            PortType::Uart1 => PortId::Uart1,
            PortType::Uart2 => PortId::Uart2,
            PortType::I2c => PortId::I2c,
        }
    }
}

/// Immutable input for one configuration run. Built once from CLI/config
/// input, then only read.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    pub port: String,
    pub baud: u32,
    pub timeout: Duration,
    pub port_type: PortType,
    pub mode: TimeMode,
    /// Accuracy limit in centimetres.
    pub acc_limit_cm: f64,
    /// Minimum survey-in duration in seconds (survey-in mode only).
    pub svin_duration_s: u32,
    pub pos_type: PosType,
    /// Fixed position: ECEF X/Y/Z in cm, or lat/lon in degrees and height
    /// in cm for LLH.
    pub fixed_pos: (f64, f64, f64),
    /// How long to wait for acknowledgements and confirmation frames.
    pub wait_time: Duration,
}

impl BaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            bail!("no serial port specified");
        }
        if !BAUD_RATES.contains(&self.baud) {
            bail!("unsupported baud rate {}, choose one of {BAUD_RATES:?}", self.baud);
        }
        if !(1..=3600).contains(&self.svin_duration_s) {
            bail!(
                "survey duration {} must be between 1 and 3600 seconds",
                self.svin_duration_s
            );
        }
        if !self.acc_limit_cm.is_finite() || self.acc_limit_cm <= 0.0 {
            bail!("accuracy limit {}cm must be a positive number", self.acc_limit_cm);
        }
        if self.mode == TimeMode::Fixed && self.pos_type == PosType::Llh {
            let (lat, lon, _) = self.fixed_pos;
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                bail!("fixed position ({lat}, {lon}) out of range for LLH");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BaseConfig {
        BaseConfig {
            port: "/dev/ttyACM0".into(),
            baud: 38400,
            timeout: Duration::from_secs(3),
            port_type: PortType::Usb,
            mode: TimeMode::SurveyIn,
            acc_limit_cm: 100.0,
            svin_duration_s: 60,
            pos_type: PosType::Llh,
            fixed_pos: (0.0, 0.0, 0.0),
            wait_time: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_baud_and_duration() {
        let mut cfg = valid_config();
        cfg.baud = 12345;
        assert!(cfg.validate().is_err());

        let mut cfg = valid_config();
        cfg.svin_duration_s = 0;
        assert!(cfg.validate().is_err());
        cfg.svin_duration_s = 3601;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_llh_out_of_range() {
        let mut cfg = valid_config();
        cfg.mode = TimeMode::Fixed;
        cfg.fixed_pos = (91.0, 0.0, 0.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_mode_discriminants_match_cli_values() {
        assert_eq!(TimeMode::try_from(0u8).unwrap(), TimeMode::Disabled);
        assert_eq!(TimeMode::try_from(1u8).unwrap(), TimeMode::SurveyIn);
        assert_eq!(TimeMode::try_from(2u8).unwrap(), TimeMode::Fixed);
        assert!(TimeMode::try_from(3u8).is_err());
        assert_eq!(PosType::try_from(0u8).unwrap(), PosType::Ecef);
        assert_eq!(PosType::try_from(1u8).unwrap(), PosType::Llh);
    }

    #[test]
    fn test_port_type_parse() {
        use std::str::FromStr;
        assert_eq!(PortType::from_str("USB").unwrap(), PortType::Usb);
        assert_eq!(PortType::from_str("uart1").unwrap(), PortType::Uart1);
        assert!(PortType::from_str("SPI").is_err());
    }
}
