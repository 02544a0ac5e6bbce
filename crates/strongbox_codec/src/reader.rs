//! Canonical CBOR reader.
//!
//! The reader is strict: it rejects non-shortest integer encodings,
//! indefinite-length items and floats, and bounds every claimed length
//! before allocating, so it can be pointed at untrusted input.

use crate::error::{CodecError, CodecResult};

/// Maximum claimed length of a single byte or text string.
///
/// Record payloads are capped well below this at the store boundary;
/// the reader limit only has to stop allocation bombs.
const MAX_ITEM_BYTES: u64 = 64 * 1024 * 1024;

/// Maximum claimed element count for arrays and maps.
const MAX_CONTAINER_ELEMENTS: u64 = 1024 * 1024;

/// A cursor over canonical CBOR bytes.
pub struct CborReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CborReader<'a> {
    /// Creates a reader over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads a map header and returns the entry count.
    pub fn map_header(&mut self) -> CodecResult<usize> {
        let len = self.header(5)?;
        if len > MAX_CONTAINER_ELEMENTS {
            return Err(CodecError::LengthLimit {
                claimed: len,
                max: MAX_CONTAINER_ELEMENTS,
            });
        }
        Ok(len as usize)
    }

    /// Reads an array header and returns the element count.
    pub fn array_header(&mut self) -> CodecResult<usize> {
        let len = self.header(4)?;
        if len > MAX_CONTAINER_ELEMENTS {
            return Err(CodecError::LengthLimit {
                claimed: len,
                max: MAX_CONTAINER_ELEMENTS,
            });
        }
        Ok(len as usize)
    }

    /// Reads a UTF-8 text string.
    pub fn text(&mut self) -> CodecResult<String> {
        let len = self.header(3)?;
        if len > MAX_ITEM_BYTES {
            return Err(CodecError::LengthLimit {
                claimed: len,
                max: MAX_ITEM_BYTES,
            });
        }
        let raw = self.take(len as usize)?;
        let s = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(s.to_string())
    }

    /// Reads a byte string.
    pub fn bytes(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.header(2)?;
        if len > MAX_ITEM_BYTES {
            return Err(CodecError::LengthLimit {
                claimed: len,
                max: MAX_ITEM_BYTES,
            });
        }
        Ok(self.take(len as usize)?.to_vec())
    }

    /// Reads a signed integer (major type 0 or 1).
    #[allow(clippy::cast_possible_wrap)]
    pub fn int(&mut self) -> CodecResult<i64> {
        let initial = self.peek()?;
        match initial >> 5 {
            0 => {
                let n = self.header(0)?;
                i64::try_from(n)
                    .map_err(|_| CodecError::invalid_payload("integer out of i64 range"))
            }
            1 => {
                let n = self.header(1)?;
                if n > i64::MAX as u64 {
                    return Err(CodecError::invalid_payload("integer out of i64 range"));
                }
                Ok(-(n as i64) - 1)
            }
            other => Err(CodecError::invalid_payload(format!(
                "expected integer, found major type {other}"
            ))),
        }
    }

    /// Reads an unsigned integer (major type 0).
    pub fn uint(&mut self) -> CodecResult<u64> {
        self.header(0)
    }

    /// Reads a boolean simple value.
    pub fn bool(&mut self) -> CodecResult<bool> {
        match self.take_byte()? {
            0xf4 => Ok(false),
            0xf5 => Ok(true),
            other => Err(CodecError::invalid_payload(format!(
                "expected boolean, found byte {other:#04x}"
            ))),
        }
    }

    /// Reads a text item and checks it against an expected map key.
    pub fn key(&mut self, expected: &str) -> CodecResult<()> {
        let found = self.text()?;
        if found != expected {
            return Err(CodecError::invalid_payload(format!(
                "expected field {expected:?}, found {found:?}"
            )));
        }
        Ok(())
    }

    /// Fails unless every input byte has been consumed.
    pub fn finish(&self) -> CodecResult<()> {
        if self.pos < self.data.len() {
            return Err(CodecError::invalid_payload(format!(
                "{} trailing bytes after payload",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }

    fn peek(&self) -> CodecResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEof)
    }

    fn take_byte(&mut self) -> CodecResult<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a header of the expected major type, validating shortest
    /// encoding of the argument.
    fn header(&mut self, expected_major: u8) -> CodecResult<u64> {
        let initial = self.take_byte()?;
        let major = initial >> 5;
        if major != expected_major {
            return Err(CodecError::invalid_payload(format!(
                "expected major type {expected_major}, found {major}"
            )));
        }

        let info = initial & 0x1f;
        match info {
            0..=23 => Ok(u64::from(info)),
            24 => {
                let v = self.take_byte()?;
                if v < 24 {
                    return Err(CodecError::non_canonical("argument fits in initial byte"));
                }
                Ok(u64::from(v))
            }
            25 => {
                let raw = self.take(2)?;
                let v = u16::from_be_bytes([raw[0], raw[1]]);
                if u8::try_from(v).is_ok() {
                    return Err(CodecError::non_canonical("argument fits in one byte"));
                }
                Ok(u64::from(v))
            }
            26 => {
                let raw = self.take(4)?;
                let v = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
                if u16::try_from(v).is_ok() {
                    return Err(CodecError::non_canonical("argument fits in two bytes"));
                }
                Ok(u64::from(v))
            }
            27 => {
                let raw = self.take(8)?;
                let v = u64::from_be_bytes([
                    raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
                ]);
                if u32::try_from(v).is_ok() {
                    return Err(CodecError::non_canonical("argument fits in four bytes"));
                }
                Ok(v)
            }
            28..=30 => Err(CodecError::non_canonical("reserved additional info")),
            31 => Err(CodecError::non_canonical("indefinite-length item")),
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::CborWriter;

    #[test]
    fn roundtrip_primitives() {
        let mut w = CborWriter::new();
        w.map_header(2);
        w.text("n");
        w.int(-42);
        w.text("ok");
        w.bool(true);
        let bytes = w.into_bytes();

        let mut r = CborReader::new(&bytes);
        assert_eq!(r.map_header().unwrap(), 2);
        r.key("n").unwrap();
        assert_eq!(r.int().unwrap(), -42);
        r.key("ok").unwrap();
        assert!(r.bool().unwrap());
        r.finish().unwrap();
    }

    #[test]
    fn rejects_non_shortest_encoding() {
        // 23 encoded with an argument byte; canonical form is 0x17.
        let mut r = CborReader::new(&[0x18, 23]);
        assert!(matches!(r.uint(), Err(CodecError::NonCanonical { .. })));

        // 255 encoded in two bytes; canonical form is 0x18 0xff.
        let mut r = CborReader::new(&[0x19, 0x00, 0xff]);
        assert!(matches!(r.uint(), Err(CodecError::NonCanonical { .. })));
    }

    #[test]
    fn rejects_indefinite_length() {
        let mut r = CborReader::new(&[0x5f, 0x41, b'a', 0xff]);
        assert!(matches!(r.bytes(), Err(CodecError::NonCanonical { .. })));
    }

    #[test]
    fn rejects_wrong_major_type() {
        let mut w = CborWriter::new();
        w.text("hello");
        let bytes = w.into_bytes();

        let mut r = CborReader::new(&bytes);
        assert!(matches!(r.bytes(), Err(CodecError::InvalidPayload { .. })));
    }

    #[test]
    fn rejects_wrong_key() {
        let mut w = CborWriter::new();
        w.text("login");
        let bytes = w.into_bytes();

        let mut r = CborReader::new(&bytes);
        assert!(matches!(r.key("password"), Err(CodecError::InvalidPayload { .. })));
    }

    #[test]
    fn rejects_truncated_input() {
        let mut r = CborReader::new(&[0x19, 0x01]);
        assert!(matches!(r.uint(), Err(CodecError::UnexpectedEof)));

        let mut r = CborReader::new(&[0x63, b'a']);
        assert!(matches!(r.text(), Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut w = CborWriter::new();
        w.bool(false);
        let mut bytes = w.into_bytes();
        bytes.push(0x00);

        let mut r = CborReader::new(&bytes);
        r.bool().unwrap();
        assert!(matches!(r.finish(), Err(CodecError::InvalidPayload { .. })));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut r = CborReader::new(&[0x62, 0xff, 0xfe]);
        assert!(matches!(r.text(), Err(CodecError::InvalidUtf8)));
    }

    #[test]
    fn rejects_oversized_claim() {
        // Byte string claiming 2^40 bytes.
        let mut r = CborReader::new(&[0x5b, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(r.bytes(), Err(CodecError::LengthLimit { .. })));
    }
}
