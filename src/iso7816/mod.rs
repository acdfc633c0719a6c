//! ISO/IEC 7816-4 command/response APDU codec.

mod status_word;

pub use self::status_word::StatusWord;
use crate::{ensure_err, Error};

/// A command APDU under construction.
///
/// Encodes to short form for Lc ≤ 255 and Le ≤ 256, extended form otherwise.
/// See ISO 7816-4 section 5.2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Apdu {
    pub cla:  u8,
    pub ins:  u8,
    pub p1:   u8,
    pub p2:   u8,
    pub data: Vec<u8>,
    pub le:   Option<usize>,
}

impl Apdu {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    #[must_use]
    pub const fn with_le(mut self, le: usize) -> Self {
        self.le = Some(le);
        self
    }

    pub const fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    fn is_extended(&self) -> bool {
        self.data.len() > 255 || self.le.is_some_and(|le| le > 256)
    }

    /// Serialize to wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + self.data.len());
        out.extend_from_slice(&self.header());
        let extended = self.is_extended();
        if !self.data.is_empty() {
            if extended {
                out.push(0x00);
                out.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
            } else {
                out.push(self.data.len() as u8);
            }
            out.extend_from_slice(&self.data);
        }
        if let Some(le) = self.le {
            if extended {
                // Le = 0x0000 encodes 65536. With no data field the extended
                // marker byte has not been written yet.
                if self.data.is_empty() {
                    out.push(0x00);
                }
                out.extend_from_slice(&((le % 0x1_0000) as u16).to_be_bytes());
            } else {
                // Le = 0x00 encodes 256.
                out.push((le % 0x100) as u8);
            }
        }
        out
    }
}

/// A response APDU split into body and status word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub data:   Vec<u8>,
    pub status: StatusWord,
}

impl Response {
    /// Split raw transceive output into body and trailer.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        ensure_err!(
            raw.len() >= 2,
            Error::Parse("response shorter than a status word".into())
        );
        let (data, trailer) = raw.split_at(raw.len() - 2);
        Ok(Self {
            data:   data.to_vec(),
            status: u16::from_be_bytes([trailer[0], trailer[1]]).into(),
        })
    }

    /// Body on success, classified error otherwise. `0x61xx` and `0x6282`
    /// count as success with (possibly partial) data.
    pub fn into_checked(self) -> Result<Vec<u8>, Error> {
        if self.status.is_success() || self.status.is_end_of_file() {
            Ok(self.data)
        } else {
            Err(Error::Response(self.status))
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_encode_case_1() {
        let apdu = Apdu::new(0x00, 0xA4, 0x00, 0x0C);
        assert_eq!(apdu.encode(), hex!("00A4000C"));
    }

    #[test]
    fn test_encode_case_2() {
        let apdu = Apdu::new(0x00, 0x84, 0x00, 0x00).with_le(8);
        assert_eq!(apdu.encode(), hex!("0084000008"));
    }

    #[test]
    fn test_encode_case_3() {
        let apdu = Apdu::new(0x00, 0xA4, 0x02, 0x0C).with_data(hex!("011E"));
        assert_eq!(apdu.encode(), hex!("00A4020C02011E"));
    }

    #[test]
    fn test_encode_case_4_le_256() {
        let apdu = Apdu::new(0x00, 0xB0, 0x00, 0x00).with_le(256);
        assert_eq!(apdu.encode(), hex!("00B0000000"));
    }

    #[test]
    fn test_encode_extended_le() {
        let apdu = Apdu::new(0x00, 0xB0, 0x00, 0x00).with_le(0x1234);
        assert_eq!(apdu.encode(), hex!("00B00000001234"));
    }

    #[test]
    fn test_encode_extended_data() {
        let apdu = Apdu::new(0x00, 0x2A, 0x00, 0x00).with_data(vec![0xAB; 300]);
        let wire = apdu.encode();
        assert_eq!(&wire[..7], hex!("002A000000012C"));
        assert_eq!(wire.len(), 7 + 300);
    }

    #[test]
    fn test_response_split() {
        let resp = Response::from_bytes(&hex!("01029000")).unwrap();
        assert_eq!(resp.data, hex!("0102"));
        assert_eq!(resp.status, StatusWord::SUCCESS);

        let resp = Response::from_bytes(&hex!("6A82")).unwrap();
        assert!(resp.data.is_empty());
        assert_eq!(resp.status, StatusWord::FILE_NOT_FOUND);
        assert!(resp.into_checked().is_err());
    }
}
