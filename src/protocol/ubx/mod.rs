//! Minimal UBX / RTCM3 wire codec.
//!
//! Only the frame types the base station configurator cares about are
//! decoded in full: CFG acknowledgements, NAV-SVIN survey progress and the
//! RTCM3 message type field. Everything else on the line (NMEA sentences,
//! unrelated UBX classes, noise between frames) is skipped or reported as
//! [`Frame::Other`].

pub mod valset;

use std::io::{ErrorKind, Read};

use bytes::{BufMut, Bytes, BytesMut};

pub const UBX_SYNC1: u8 = 0xB5;
pub const UBX_SYNC2: u8 = 0x62;
pub const RTCM3_PREAMBLE: u8 = 0xD3;

pub const CLS_NAV: u8 = 0x01;
pub const CLS_ACK: u8 = 0x05;
pub const CLS_CFG: u8 = 0x06;

pub const ACK_NAK: u8 = 0x00;
pub const ACK_ACK: u8 = 0x01;
pub const CFG_MSG: u8 = 0x01;
pub const CFG_VALSET: u8 = 0x8A;
pub const NAV_SVIN: u8 = 0x3B;

/// Longest payload we are prepared to buffer. Anything larger is treated as
/// a framing error and the stream is resynchronized.
const MAX_PAYLOAD: usize = 2048;

/// One decoded frame from the receiver, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UBX ACK-ACK; `class`/`id` identify the acknowledged message.
    AckAck { class: u8, id: u8 },
    /// UBX ACK-NAK; `class`/`id` identify the rejected message.
    AckNak { class: u8, id: u8 },
    /// UBX NAV-SVIN survey-in status.
    NavSvin { dur: u32, valid: bool, active: bool },
    /// Any RTCM3 frame, identified by its 12-bit message type.
    Rtcm { msg_type: u16 },
    /// Any other UBX frame.
    Other { class: u8, id: u8 },
}

/// Codec errors. `Parse` is recoverable by contract: the reader has already
/// skipped past the offending bytes and the next call starts at a fresh
/// sync scan.
#[derive(Debug)]
pub enum FrameError {
    Parse(String),
    Io(std::io::Error),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Parse(msg) => write!(f, "malformed frame: {msg}"),
            FrameError::Io(err) => write!(f, "transport read failed: {err}"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Fletcher-8 checksum over class, id, length and payload.
fn checksum(data: &[u8]) -> (u8, u8) {
    let mut ck_a = 0u8;
    let mut ck_b = 0u8;
    for byte in data {
        ck_a = ck_a.wrapping_add(*byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    (ck_a, ck_b)
}

/// Serialize a UBX frame (sync, header, payload, checksum).
pub fn encode_frame(class: u8, id: u8, payload: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(payload.len() + 8);
    body.put_u8(class);
    body.put_u8(id);
    body.put_u16_le(payload.len() as u16);
    body.put_slice(payload);
    let (ck_a, ck_b) = checksum(&body);

    let mut frame = BytesMut::with_capacity(body.len() + 4);
    frame.put_u8(UBX_SYNC1);
    frame.put_u8(UBX_SYNC2);
    frame.put_slice(&body);
    frame.put_u8(ck_a);
    frame.put_u8(ck_b);
    frame.freeze()
}

/// Streaming frame reader over any blocking byte source.
///
/// The underlying reader is expected to enforce its own timeout (the serial
/// port is opened with one); a timed-out read surfaces as `Ok(None)` so the
/// caller can check its stop flag between frames.
pub struct FrameReader<R: Read> {
    inner: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read and classify the next frame. Returns `Ok(None)` when no data
    /// arrived before the transport timeout.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        loop {
            let byte = match self.read_byte() {
                Ok(Some(b)) => b,
                Ok(None) => return Ok(None),
                Err(err) => return Err(err),
            };
            match byte {
                UBX_SYNC1 => return self.read_ubx().map(Some),
                RTCM3_PREAMBLE => return self.read_rtcm().map(Some),
                b'$' => {
                    // NMEA sentence, skip to end of line
                    if self.skip_nmea()?.is_none() {
                        return Ok(None);
                    }
                }
                _ => {} // noise between frames, keep scanning
            }
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, FrameError> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Fill `buf` completely or fail; a timeout mid-frame is a parse error,
    /// not a clean no-data condition.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), FrameError> {
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::UnexpectedEof
                ) =>
            {
                Err(FrameError::Parse("truncated frame".into()))
            }
            Err(err) => Err(FrameError::Io(err)),
        }
    }

    fn read_ubx(&mut self) -> Result<Frame, FrameError> {
        match self.read_byte()? {
            Some(UBX_SYNC2) => {}
            Some(other) => {
                return Err(FrameError::Parse(format!(
                    "expected UBX sync 0x62, got 0x{other:02x}"
                )))
            }
            None => return Err(FrameError::Parse("truncated frame".into())),
        }

        let mut header = [0u8; 4];
        self.read_exact(&mut header)?;
        let class = header[0];
        let id = header[1];
        let len = u16::from_le_bytes([header[2], header[3]]) as usize;
        if len > MAX_PAYLOAD {
            return Err(FrameError::Parse(format!(
                "implausible UBX payload length {len}"
            )));
        }

        let mut payload = vec![0u8; len];
        self.read_exact(&mut payload)?;
        let mut ck = [0u8; 2];
        self.read_exact(&mut ck)?;

        let mut body = Vec::with_capacity(len + 4);
        body.extend_from_slice(&header);
        body.extend_from_slice(&payload);
        let (ck_a, ck_b) = checksum(&body);
        if [ck_a, ck_b] != ck {
            return Err(FrameError::Parse(format!(
                "UBX checksum mismatch on {class:#04x}:{id:#04x}"
            )));
        }

        Ok(classify_ubx(class, id, &payload))
    }

    fn read_rtcm(&mut self) -> Result<Frame, FrameError> {
        let mut header = [0u8; 2];
        self.read_exact(&mut header)?;
        let len = (((header[0] & 0x03) as usize) << 8) | header[1] as usize;
        if len < 2 {
            return Err(FrameError::Parse(format!(
                "RTCM3 payload too short ({len} bytes)"
            )));
        }

        // payload plus 3-byte CRC24Q (carried but not validated)
        let mut body = vec![0u8; len + 3];
        self.read_exact(&mut body)?;
        let msg_type = ((body[0] as u16) << 4) | ((body[1] as u16) >> 4);
        Ok(Frame::Rtcm { msg_type })
    }

    /// Consume an NMEA sentence up to its terminating newline. Returns
    /// `Ok(None)` when the line times out before the terminator.
    fn skip_nmea(&mut self) -> Result<Option<()>, FrameError> {
        for _ in 0..128 {
            match self.read_byte()? {
                Some(b'\n') => return Ok(Some(())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        Err(FrameError::Parse("unterminated NMEA sentence".into()))
    }
}

fn classify_ubx(class: u8, id: u8, payload: &[u8]) -> Frame {
    match (class, id) {
        (CLS_ACK, ACK_ACK) if payload.len() >= 2 => Frame::AckAck {
            class: payload[0],
            id: payload[1],
        },
        (CLS_ACK, ACK_NAK) if payload.len() >= 2 => Frame::AckNak {
            class: payload[0],
            id: payload[1],
        },
        (CLS_NAV, NAV_SVIN) if payload.len() >= 40 => Frame::NavSvin {
            dur: u32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]),
            valid: payload[36] != 0,
            active: payload[37] != 0,
        },
        _ => Frame::Other { class, id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn nav_svin_payload(dur: u32, valid: bool, active: bool) -> Vec<u8> {
        let mut payload = vec![0u8; 40];
        payload[8..12].copy_from_slice(&dur.to_le_bytes());
        payload[36] = valid as u8;
        payload[37] = active as u8;
        payload
    }

    fn rtcm_frame(msg_type: u16) -> Vec<u8> {
        let payload = [(msg_type >> 4) as u8, ((msg_type & 0x0F) as u8) << 4];
        let mut frame = vec![RTCM3_PREAMBLE, 0x00, payload.len() as u8];
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&[0, 0, 0]); // CRC24Q, not validated
        frame
    }

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_frame(CLS_CFG, CFG_VALSET, &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&frame[..2], &[UBX_SYNC1, UBX_SYNC2]);
        assert_eq!(frame[2], CLS_CFG);
        assert_eq!(frame[3], CFG_VALSET);
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), 4);
        assert_eq!(frame.len(), 4 + 4 + 4);
    }

    #[test]
    fn test_encode_then_decode_ack() {
        let frame = encode_frame(CLS_ACK, ACK_ACK, &[CLS_CFG, CFG_VALSET]);
        let mut reader = FrameReader::new(Cursor::new(frame.to_vec()));
        assert_eq!(
            reader.read_frame().unwrap(),
            Some(Frame::AckAck {
                class: CLS_CFG,
                id: CFG_VALSET
            })
        );
        assert_eq!(reader.read_frame().unwrap(), None);
    }

    #[test]
    fn test_decode_nav_svin() {
        let frame = encode_frame(CLS_NAV, NAV_SVIN, &nav_svin_payload(113, false, true));
        let mut reader = FrameReader::new(Cursor::new(frame.to_vec()));
        assert_eq!(
            reader.read_frame().unwrap(),
            Some(Frame::NavSvin {
                dur: 113,
                valid: false,
                active: true
            })
        );
    }

    #[test]
    fn test_decode_rtcm_type() {
        let mut reader = FrameReader::new(Cursor::new(rtcm_frame(1006)));
        assert_eq!(
            reader.read_frame().unwrap(),
            Some(Frame::Rtcm { msg_type: 1006 })
        );
    }

    #[test]
    fn test_bad_checksum_is_recoverable() {
        let mut bytes = encode_frame(CLS_ACK, ACK_ACK, &[CLS_CFG, CFG_VALSET]).to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        bytes.extend_from_slice(&rtcm_frame(1230));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(reader.read_frame(), Err(FrameError::Parse(_))));
        // stream resynchronizes on the following frame
        assert_eq!(
            reader.read_frame().unwrap(),
            Some(Frame::Rtcm { msg_type: 1230 })
        );
    }

    #[test]
    fn test_skips_nmea_and_noise() {
        let mut bytes = b"$GNGGA,123519,4807.038,N*47\r\n\x00\x7f".to_vec();
        bytes.extend_from_slice(&encode_frame(CLS_NAV, 0x07, &[0u8; 4]));
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(
            reader.read_frame().unwrap(),
            Some(Frame::Other {
                class: CLS_NAV,
                id: 0x07
            })
        );
    }
}
