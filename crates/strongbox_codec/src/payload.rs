//! Record payload variants and their canonical encoding.

use crate::error::{CodecError, CodecResult};
use crate::reader::CborReader;
use crate::writer::CborWriter;

/// The closed set of record payload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A login/password credential pair.
    Auth,
    /// Free-form text.
    Text,
    /// An opaque file body with its name and extension.
    Binary,
    /// Bank-card details. Verification codes are never stored.
    Card,
}

impl RecordKind {
    /// All four kinds, in tag order.
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Auth,
        RecordKind::Text,
        RecordKind::Binary,
        RecordKind::Card,
    ];

    /// The envelope tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Auth => "AUTH",
            RecordKind::Text => "TEXT",
            RecordKind::Binary => "BINARY",
            RecordKind::Card => "CARD",
        }
    }

    /// Resolves an envelope tag.
    pub fn from_tag(tag: &str) -> CodecResult<Self> {
        match tag {
            "AUTH" => Ok(RecordKind::Auth),
            "TEXT" => Ok(RecordKind::Text),
            "BINARY" => Ok(RecordKind::Binary),
            "CARD" => Ok(RecordKind::Card),
            other => Err(CodecError::unknown_kind(other)),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card expiry with month/year precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardExpiry {
    year: i32,
    month: u8,
}

impl CardExpiry {
    /// Creates an expiry, validating the month.
    pub fn new(year: i32, month: u8) -> CodecResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CodecError::invalid_payload(format!(
                "card expiry month {month} is out of range"
            )));
        }
        Ok(Self { year, month })
    }

    /// The expiry year.
    pub fn year(self) -> i32 {
        self.year
    }

    /// The expiry month (1-12).
    pub fn month(self) -> u8 {
        self.month
    }
}

impl std::fmt::Display for CardExpiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// A typed record payload.
///
/// The variant is identified by the envelope tag, not by the encoded
/// bytes; see [`Payload::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A credential pair.
    Auth {
        /// Account login.
        login: String,
        /// Account password.
        password: String,
    },
    /// Free-form text.
    Text {
        /// The text itself.
        data: String,
    },
    /// An opaque file body.
    Binary {
        /// File name without extension.
        name: String,
        /// File extension without the leading dot.
        extension: String,
        /// The file body.
        bytes: Vec<u8>,
    },
    /// Bank-card details.
    Card {
        /// Card number.
        number: String,
        /// Expiry, month/year precision.
        expiry: CardExpiry,
        /// Name of the card owner.
        owner: String,
    },
}

impl Payload {
    /// The kind tag of this payload.
    pub fn kind(&self) -> RecordKind {
        match self {
            Payload::Auth { .. } => RecordKind::Auth,
            Payload::Text { .. } => RecordKind::Text,
            Payload::Binary { .. } => RecordKind::Binary,
            Payload::Card { .. } => RecordKind::Card,
        }
    }

    /// Encodes this payload to canonical bytes.
    ///
    /// Field keys are emitted in canonical CBOR order (length-first,
    /// then bytewise), so equal payloads always encode identically.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut w = match self {
            Payload::Binary { bytes, .. } => CborWriter::with_capacity(bytes.len() + 64),
            _ => CborWriter::new(),
        };
        self.encode_into(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Writes this payload into an existing writer as one CBOR item.
    ///
    /// This is what lets wire messages embed the payload in variant
    /// form while sharing the exact canonical layout with the stored
    /// bytes.
    pub fn encode_into(&self, w: &mut CborWriter) -> CodecResult<()> {
        match self {
            Payload::Auth { login, password } => {
                w.map_header(2);
                w.text("login");
                w.text(login);
                w.text("password");
                w.text(password);
            }
            Payload::Text { data } => {
                w.map_header(1);
                w.text("data");
                w.text(data);
            }
            Payload::Binary {
                name,
                extension,
                bytes,
            } => {
                w.map_header(3);
                w.text("name");
                w.text(name);
                w.text("bytes");
                w.bytes(bytes);
                w.text("extension");
                w.text(extension);
            }
            Payload::Card {
                number,
                expiry,
                owner,
            } => {
                w.map_header(3);
                w.text("owner");
                w.text(owner);
                w.text("expiry");
                w.map_header(2);
                w.text("year");
                w.int(i64::from(expiry.year));
                w.text("month");
                w.uint(u64::from(expiry.month));
                w.text("number");
                w.text(number);
            }
        }

        Ok(())
    }

    /// Decodes payload bytes as the given kind.
    ///
    /// The whole input must be consumed; trailing bytes are an error.
    pub fn decode(kind: RecordKind, bytes: &[u8]) -> CodecResult<Self> {
        let mut r = CborReader::new(bytes);
        let payload = Self::decode_from(kind, &mut r)?;
        r.finish()?;
        Ok(payload)
    }

    /// Reads one payload item of the given kind from a reader.
    pub fn decode_from(kind: RecordKind, r: &mut CborReader<'_>) -> CodecResult<Self> {
        match kind {
            RecordKind::Auth => {
                Self::expect_entries(r, 2)?;
                r.key("login")?;
                let login = r.text()?;
                r.key("password")?;
                let password = r.text()?;
                Ok(Payload::Auth { login, password })
            }
            RecordKind::Text => {
                Self::expect_entries(r, 1)?;
                r.key("data")?;
                let data = r.text()?;
                Ok(Payload::Text { data })
            }
            RecordKind::Binary => {
                Self::expect_entries(r, 3)?;
                r.key("name")?;
                let name = r.text()?;
                r.key("bytes")?;
                let bytes = r.bytes()?;
                r.key("extension")?;
                let extension = r.text()?;
                Ok(Payload::Binary {
                    name,
                    extension,
                    bytes,
                })
            }
            RecordKind::Card => {
                Self::expect_entries(r, 3)?;
                r.key("owner")?;
                let owner = r.text()?;
                r.key("expiry")?;
                Self::expect_entries(r, 2)?;
                r.key("year")?;
                let year = r.int()?;
                r.key("month")?;
                let month = r.uint()?;
                r.key("number")?;
                let number = r.text()?;

                let year = i32::try_from(year)
                    .map_err(|_| CodecError::invalid_payload("card expiry year out of range"))?;
                let month = u8::try_from(month)
                    .map_err(|_| CodecError::invalid_payload("card expiry month out of range"))?;
                Ok(Payload::Card {
                    number,
                    expiry: CardExpiry::new(year, month)?,
                    owner,
                })
            }
        }
    }

    fn expect_entries(r: &mut CborReader<'_>, expected: usize) -> CodecResult<()> {
        let found = r.map_header()?;
        if found != expected {
            return Err(CodecError::invalid_payload(format!(
                "expected {expected} fields, found {found}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_card() -> Payload {
        Payload::Card {
            number: "4276 0000 1111 2222".into(),
            expiry: CardExpiry::new(2027, 11).unwrap(),
            owner: "ALICE LIDDELL".into(),
        }
    }

    #[test]
    fn kind_tags_roundtrip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_tag(kind.as_str()).unwrap(), kind);
        }
        assert!(matches!(
            RecordKind::from_tag("NOTE"),
            Err(CodecError::UnknownKind { .. })
        ));
    }

    #[test]
    fn auth_roundtrip() {
        let payload = Payload::Auth {
            login: "alice".into(),
            password: "s3cret".into(),
        };
        let bytes = payload.encode().unwrap();
        assert_eq!(Payload::decode(RecordKind::Auth, &bytes).unwrap(), payload);
    }

    #[test]
    fn binary_roundtrip() {
        let payload = Payload::Binary {
            name: "passport-scan".into(),
            extension: "pdf".into(),
            bytes: vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff],
        };
        let bytes = payload.encode().unwrap();
        assert_eq!(Payload::decode(RecordKind::Binary, &bytes).unwrap(), payload);
    }

    #[test]
    fn card_roundtrip() {
        let payload = sample_card();
        let bytes = payload.encode().unwrap();
        assert_eq!(Payload::decode(RecordKind::Card, &bytes).unwrap(), payload);
    }

    #[test]
    fn encoding_is_deterministic() {
        let payload = sample_card();
        assert_eq!(payload.encode().unwrap(), payload.encode().unwrap());

        let rebuilt = Payload::Card {
            number: "4276 0000 1111 2222".into(),
            expiry: CardExpiry::new(2027, 11).unwrap(),
            owner: "ALICE LIDDELL".into(),
        };
        assert_eq!(payload.encode().unwrap(), rebuilt.encode().unwrap());
    }

    #[test]
    fn decoding_under_wrong_kind_fails() {
        let bytes = Payload::Text {
            data: "hello".into(),
        }
        .encode()
        .unwrap();
        assert!(Payload::decode(RecordKind::Auth, &bytes).is_err());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = Payload::Text {
            data: "hello".into(),
        }
        .encode()
        .unwrap();
        bytes.push(0x00);
        assert!(matches!(
            Payload::decode(RecordKind::Text, &bytes),
            Err(CodecError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn expiry_month_validated() {
        assert!(CardExpiry::new(2027, 0).is_err());
        assert!(CardExpiry::new(2027, 13).is_err());
        assert_eq!(CardExpiry::new(2027, 12).unwrap().to_string(), "12/2027");
    }

    proptest! {
        #[test]
        fn auth_roundtrip_holds_for_any_strings(login in ".{0,64}", password in ".{0,64}") {
            let payload = Payload::Auth { login, password };
            let bytes = payload.encode().unwrap();
            prop_assert_eq!(Payload::decode(RecordKind::Auth, &bytes).unwrap(), payload);
        }

        #[test]
        fn binary_roundtrip_holds_for_any_bytes(body in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let payload = Payload::Binary {
                name: "blob".into(),
                extension: "bin".into(),
                bytes: body,
            };
            let encoded = payload.encode().unwrap();
            prop_assert_eq!(Payload::decode(RecordKind::Binary, &encoded).unwrap(), payload);
        }
    }
}
