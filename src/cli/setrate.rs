//! `ubxsetrate` — set the output rate of one message type (or a predefined
//! group) via the legacy CFG-MSG command. One-shot: build, write, done; no
//! response monitoring.

use std::io::Write;

use anyhow::{anyhow, bail, Result};
use bytes::Bytes;

use crate::protocol::ubx::{encode_frame, CFG_MSG, CLS_CFG};

/// Standard NMEA sentence ids (class 0xF0): GGA, GLL, GSA, GSV, RMC, VTG,
/// GRS, GST, ZDA, GBS, DTM.
const NMEA_STD_IDS: [u8; 11] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A,
];
/// Proprietary PUBX sentence ids (class 0xF1): POSITION, SVSTATUS, TIME.
const PUBX_IDS: [u8; 3] = [0x00, 0x03, 0x04];
/// Minimum NMEA set: GGA, GSA, GSV, RMC, VTG.
const NMEA_MIN_IDS: [u8; 5] = [0x00, 0x02, 0x03, 0x04, 0x05];
/// Common UBX NAV ids: POSECEF, POSLLH, STATUS, DOP, PVT, VELECEF, VELNED,
/// TIMEUTC, SVIN, SAT.
const UBX_NAV_IDS: [u8; 10] = [
    0x01, 0x02, 0x03, 0x04, 0x07, 0x11, 0x12, 0x21, 0x3B, 0x35,
];
/// Minimum UBX set: NAV-DOP, NAV-PVT, NAV-SAT.
const UBX_NAV_MIN_IDS: [u8; 3] = [0x04, 0x07, 0x35];

const CLS_NMEA_STD: u8 = 0xF0;
const CLS_NMEA_PUBX: u8 = 0xF1;
const CLS_UBX_NAV: u8 = 0x01;

/// Which message(s) to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgSelector {
    Single { class: u8, id: u8 },
    AllNmea,
    MinNmea,
    AllUbx,
    MinUbx,
}

impl MsgSelector {
    /// Parse the `--msgClass` / `--msgID` pair. Class accepts the special
    /// group names or a decimal/hex number.
    pub fn parse(msg_class: &str, msg_id: Option<&String>) -> Result<Self> {
        match msg_class.to_ascii_lowercase().as_str() {
            "allnmea" => Ok(MsgSelector::AllNmea),
            "minnmea" => Ok(MsgSelector::MinNmea),
            "allubx" => Ok(MsgSelector::AllUbx),
            "minubx" => Ok(MsgSelector::MinUbx),
            _ => {
                let class = parse_byte(msg_class)?;
                let id = parse_byte(
                    msg_id.ok_or_else(|| anyhow!("--msgID is required with a numeric class"))?,
                )?;
                Ok(MsgSelector::Single { class, id })
            }
        }
    }

    /// Expand into concrete (class, id) pairs.
    pub fn targets(self) -> Vec<(u8, u8)> {
        match self {
            MsgSelector::Single { class, id } => vec![(class, id)],
            MsgSelector::AllNmea => NMEA_STD_IDS
                .iter()
                .map(|id| (CLS_NMEA_STD, *id))
                .chain(PUBX_IDS.iter().map(|id| (CLS_NMEA_PUBX, *id)))
                .collect(),
            MsgSelector::MinNmea => NMEA_MIN_IDS.iter().map(|id| (CLS_NMEA_STD, *id)).collect(),
            MsgSelector::AllUbx => UBX_NAV_IDS.iter().map(|id| (CLS_UBX_NAV, *id)).collect(),
            MsgSelector::MinUbx => UBX_NAV_MIN_IDS
                .iter()
                .map(|id| (CLS_UBX_NAV, *id))
                .collect(),
        }
    }
}

/// Decimal or `0x`-prefixed hex byte.
fn parse_byte(raw: &str) -> Result<u8> {
    let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        raw.parse()
    };
    parsed.map_err(|_| anyhow!("invalid message class/id {raw:?}"))
}

/// CFG-MSG set frame: target class/id followed by the rate on all six I/O
/// targets (DDC, UART1, UART2, USB, SPI, reserved).
pub fn cfg_msg_frame(class: u8, id: u8, rate: u8) -> Bytes {
    encode_frame(
        CLS_CFG,
        CFG_MSG,
        &[class, id, rate, rate, rate, rate, rate, 0],
    )
}

/// Write one CFG-MSG per target. Returns the number of messages written.
pub fn apply<W: Write>(selector: MsgSelector, rate: u16, writer: &mut W) -> Result<u32> {
    if rate > 255 {
        bail!("rate {rate} must be between 0 and 255");
    }
    let mut written = 0;
    for (class, id) in selector.targets() {
        log::info!("Sending CFG-MSG for {class:#04x}:{id:#04x} rate {rate}");
        writer.write_all(&cfg_msg_frame(class, id, rate as u8))?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}
