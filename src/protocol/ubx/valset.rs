//! CFG-VALSET configuration key/value language (generation 9+ interface).
//!
//! Key ids come from the u-blox F9 configuration database. Bits 28..30 of a
//! key id carry the storage size of its value; the subset used here is one
//! byte (0x20......) or four bytes (0x40......).

use bytes::{BufMut, Bytes, BytesMut};

use super::{encode_frame, CFG_VALSET, CLS_CFG};

/// Configuration storage layers (bitmask, can be OR'd).
pub const LAYER_RAM: u8 = 0x01;
pub const LAYER_BBR: u8 = 0x02;
pub const LAYER_FLASH: u8 = 0x04;

// CFG-TMODE-* — time mode (base station) configuration
pub const CFG_TMODE_MODE: u32 = 0x2003_0001;
pub const CFG_TMODE_POS_TYPE: u32 = 0x2003_0002;
pub const CFG_TMODE_ECEF_X: u32 = 0x4003_0003;
pub const CFG_TMODE_ECEF_Y: u32 = 0x4003_0004;
pub const CFG_TMODE_ECEF_Z: u32 = 0x4003_0005;
pub const CFG_TMODE_ECEF_X_HP: u32 = 0x2003_0006;
pub const CFG_TMODE_ECEF_Y_HP: u32 = 0x2003_0007;
pub const CFG_TMODE_ECEF_Z_HP: u32 = 0x2003_0008;
pub const CFG_TMODE_LAT: u32 = 0x4003_0009;
pub const CFG_TMODE_LON: u32 = 0x4003_000A;
pub const CFG_TMODE_HEIGHT: u32 = 0x4003_000B;
pub const CFG_TMODE_LAT_HP: u32 = 0x2003_000C;
pub const CFG_TMODE_LON_HP: u32 = 0x2003_000D;
pub const CFG_TMODE_HEIGHT_HP: u32 = 0x2003_000E;
pub const CFG_TMODE_FIXED_POS_ACC: u32 = 0x4003_000F;
pub const CFG_TMODE_SVIN_MIN_DUR: u32 = 0x4003_0010;
pub const CFG_TMODE_SVIN_ACC_LIMIT: u32 = 0x4003_0011;

// CFG-MSGOUT-* base key ids (I2C variant; UART1/UART2/USB/SPI follow at
// consecutive ids, see `PortId::key_offset`)
pub const CFG_MSGOUT_UBX_NAV_SVIN_I2C: u32 = 0x2091_0088;
const MSGOUT_RTCM_BASE: [(u16, u32); 6] = [
    (1006, 0x2091_02C6),
    (1077, 0x2091_02CC),
    (1087, 0x2091_02D1),
    (1097, 0x2091_0318),
    (1127, 0x2091_02D6),
    (1230, 0x2091_0303),
];

/// Output port selector inside a CFG-MSGOUT key group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortId {
    I2c,
    Uart1,
    Uart2,
    Usb,
    Spi,
}

impl PortId {
    const fn key_offset(self) -> u32 {
        match self {
            PortId::I2c => 0,
            PortId::Uart1 => 1,
            PortId::Uart2 => 2,
            PortId::Usb => 3,
            PortId::Spi => 4,
        }
    }
}

/// Key id for the output rate of one RTCM3 message type on one port, or
/// `None` for a type outside the supported set.
pub fn msgout_rtcm_key(msg_type: u16, port: PortId) -> Option<u32> {
    MSGOUT_RTCM_BASE
        .iter()
        .find(|(t, _)| *t == msg_type)
        .map(|(_, base)| base + port.key_offset())
}

/// Key id for the UBX NAV-SVIN output rate on one port.
pub fn msgout_nav_svin_key(port: PortId) -> u32 {
    CFG_MSGOUT_UBX_NAV_SVIN_I2C + port.key_offset()
}

/// A configuration value, sized to its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgVal {
    U1(u8),
    I1(i8),
    L(bool),
    U2(u16),
    I2(i16),
    U4(u32),
    I4(i32),
    U8(u64),
    I8(i64),
}

impl CfgVal {
    fn put(self, buf: &mut BytesMut) {
        match self {
            CfgVal::U1(v) => buf.put_u8(v),
            CfgVal::I1(v) => buf.put_i8(v),
            CfgVal::L(v) => buf.put_u8(v as u8),
            CfgVal::U2(v) => buf.put_u16_le(v),
            CfgVal::I2(v) => buf.put_i16_le(v),
            CfgVal::U4(v) => buf.put_u32_le(v),
            CfgVal::I4(v) => buf.put_i32_le(v),
            CfgVal::U8(v) => buf.put_u64_le(v),
            CfgVal::I8(v) => buf.put_i64_le(v),
        }
    }

    /// Width in bytes on the wire.
    pub fn wire_size(self) -> usize {
        match self {
            CfgVal::U1(_) | CfgVal::I1(_) | CfgVal::L(_) => 1,
            CfgVal::U2(_) | CfgVal::I2(_) => 2,
            CfgVal::U4(_) | CfgVal::I4(_) => 4,
            CfgVal::U8(_) | CfgVal::I8(_) => 8,
        }
    }
}

/// Declared value size of a key id (bits 28..30), in bytes.
pub fn key_size(key: u32) -> usize {
    match (key >> 28) & 0x07 {
        0x01 | 0x02 => 1,
        0x03 => 2,
        0x04 => 4,
        0x05 => 8,
        _ => 0,
    }
}

/// Serialize a complete CFG-VALSET frame. Version 0 is used for plain sets,
/// version 1 when the items belong to a transaction group.
pub fn encode_valset(layers: u8, transaction: u8, items: &[(u32, CfgVal)]) -> Bytes {
    let mut payload = BytesMut::with_capacity(4 + items.len() * 12);
    if transaction == 0 {
        payload.put_u8(0x00); // version
        payload.put_u8(layers);
        payload.put_u16_le(0); // reserved
    } else {
        payload.put_u8(0x01);
        payload.put_u8(layers);
        payload.put_u8(transaction);
        payload.put_u8(0); // reserved
    }
    for (key, val) in items {
        debug_assert_eq!(key_size(*key), val.wire_size(), "key {key:#010x}");
        payload.put_u32_le(*key);
        val.put(&mut payload);
    }
    encode_frame(CLS_CFG, CFG_VALSET, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valset_header_and_item_layout() {
        let frame = encode_valset(
            LAYER_RAM,
            0,
            &[(CFG_TMODE_MODE, CfgVal::U1(1)), (CFG_TMODE_SVIN_MIN_DUR, CfgVal::U4(300))],
        );
        // sync(2) class/id(2) len(2) then payload
        let payload = &frame[6..frame.len() - 2];
        assert_eq!(payload[0], 0x00);
        assert_eq!(payload[1], LAYER_RAM);
        assert_eq!(&payload[2..4], &[0, 0]);
        assert_eq!(
            u32::from_le_bytes(payload[4..8].try_into().unwrap()),
            CFG_TMODE_MODE
        );
        assert_eq!(payload[8], 1);
        assert_eq!(
            u32::from_le_bytes(payload[9..13].try_into().unwrap()),
            CFG_TMODE_SVIN_MIN_DUR
        );
        assert_eq!(
            u32::from_le_bytes(payload[13..17].try_into().unwrap()),
            300
        );
        assert_eq!(payload.len(), 17);
    }

    #[test]
    fn test_key_sizes_match_values() {
        assert_eq!(key_size(CFG_TMODE_MODE), 1);
        assert_eq!(key_size(CFG_TMODE_ECEF_X), 4);
        assert_eq!(key_size(CFG_TMODE_LAT_HP), 1);
        assert_eq!(key_size(msgout_nav_svin_key(PortId::Usb)), 1);
    }

    #[test]
    fn test_msgout_key_lookup() {
        assert_eq!(msgout_rtcm_key(1006, PortId::I2c), Some(0x2091_02C6));
        assert_eq!(msgout_rtcm_key(1230, PortId::Usb), Some(0x2091_0306));
        assert_eq!(msgout_rtcm_key(1230, PortId::Spi), Some(0x2091_0307));
        assert_eq!(msgout_rtcm_key(1005, PortId::Usb), None);
    }
}
