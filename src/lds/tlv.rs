//! Minimal BER-TLV codec for the LDS templates.
//!
//! The LDS uses one- and two-byte tags and definite lengths (long form up to
//! four length octets). Indefinite lengths do not occur on conforming chips
//! and are rejected.

use {
    crate::{ensure_err, Error, Result},
    bytes::Buf,
};

/// A decoded TLV data object. Constructed values keep their children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    pub tag:   u16,
    pub value: TlvValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TlvValue {
    Primitive(Vec<u8>),
    Constructed(Vec<Tlv>),
}

impl Tlv {
    pub fn primitive(tag: u16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: TlvValue::Primitive(value.into()),
        }
    }

    pub fn constructed(tag: u16, children: Vec<Tlv>) -> Self {
        Self {
            tag,
            value: TlvValue::Constructed(children),
        }
    }

    pub fn as_primitive(&self) -> Result<&[u8]> {
        match &self.value {
            TlvValue::Primitive(bytes) => Ok(bytes),
            TlvValue::Constructed(_) => {
                Err(Error::Parse(format!("tag {:#06X} is constructed", self.tag)))
            }
        }
    }

    pub fn children(&self) -> Result<&[Tlv]> {
        match &self.value {
            TlvValue::Constructed(children) => Ok(children),
            TlvValue::Primitive(_) => {
                Err(Error::Parse(format!("tag {:#06X} is primitive", self.tag)))
            }
        }
    }

    /// First child with the given tag, searching one level deep.
    pub fn find(&self, tag: u16) -> Option<&Tlv> {
        self.children().ok()?.iter().find(|child| child.tag == tag)
    }

    /// First matching data object anywhere in the tree.
    pub fn find_deep(&self, tag: u16) -> Option<&Tlv> {
        if self.tag == tag {
            return Some(self);
        }
        match &self.value {
            TlvValue::Primitive(_) => None,
            TlvValue::Constructed(children) => {
                children.iter().find_map(|child| child.find_deep(tag))
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let tlv = Self::read(&mut buf)?;
        ensure_err!(
            buf.is_empty(),
            Error::Parse("trailing bytes after TLV".into())
        );
        Ok(tlv)
    }

    fn read(buf: &mut &[u8]) -> Result<Self> {
        let (tag, constructed) = read_tag(buf)?;
        let len = read_length(buf)?;
        ensure_err!(
            buf.remaining() >= len,
            Error::Parse("TLV length exceeds data".into())
        );
        let mut value = &buf[..len];
        buf.advance(len);
        Ok(if constructed {
            let mut children = Vec::new();
            while !value.is_empty() {
                children.push(Self::read(&mut value)?);
            }
            Self {
                tag,
                value: TlvValue::Constructed(children),
            }
        } else {
            Self {
                tag,
                value: TlvValue::Primitive(value.to_vec()),
            }
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let payload = match &self.value {
            TlvValue::Primitive(bytes) => bytes.clone(),
            TlvValue::Constructed(children) => {
                children.iter().flat_map(Tlv::encode).collect()
            }
        };
        let mut out = Vec::with_capacity(payload.len() + 6);
        write_tag(&mut out, self.tag);
        write_length(&mut out, payload.len());
        out.extend_from_slice(&payload);
        out
    }
}

fn read_tag(buf: &mut &[u8]) -> Result<(u16, bool)> {
    ensure_err!(buf.has_remaining(), Error::Parse("EOF reading tag".into()));
    let first = buf.get_u8();
    let constructed = first & 0x20 != 0;
    if first & 0x1F != 0x1F {
        return Ok((first.into(), constructed));
    }
    ensure_err!(buf.has_remaining(), Error::Parse("EOF in two-byte tag".into()));
    let second = buf.get_u8();
    ensure_err!(
        second & 0x80 == 0,
        Error::Parse("tags longer than two bytes unsupported".into())
    );
    Ok((u16::from_be_bytes([first, second]), constructed))
}

fn read_length(buf: &mut &[u8]) -> Result<usize> {
    ensure_err!(buf.has_remaining(), Error::Parse("EOF reading length".into()));
    let first = buf.get_u8();
    if first < 0x80 {
        return Ok(first.into());
    }
    let count = (first & 0x7F) as usize;
    ensure_err!(count != 0, Error::Parse("indefinite length unsupported".into()));
    ensure_err!(count <= 4, Error::Parse("length field too long".into()));
    ensure_err!(
        buf.remaining() >= count,
        Error::Parse("EOF in long length".into())
    );
    let mut len = 0usize;
    for _ in 0..count {
        len = (len << 8) | buf.get_u8() as usize;
    }
    Ok(len)
}

fn write_tag(out: &mut Vec<u8>, tag: u16) {
    if tag > 0xFF {
        out.extend_from_slice(&tag.to_be_bytes());
    } else {
        out.push(tag as u8);
    }
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    match len {
        0..=0x7F => out.push(len as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, len as u8]),
        0x100..=0xFFFF => {
            out.push(0x82);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            out.push(0x83);
            out.push((len >> 16) as u8);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
    }
}

/// Parse the outer tag and length of a file to learn its full size before it
/// has been read completely. Returns (header length, value length).
pub fn peek_length(data: &[u8]) -> Result<(usize, usize)> {
    let mut buf = data;
    let _ = read_tag(&mut buf)?;
    let len = read_length(&mut buf)?;
    let header = data.len() - buf.remaining();
    Ok((header, len))
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_roundtrip() {
        let tlv = Tlv::constructed(0x61, vec![
            Tlv::primitive(0x5F1F, vec![0x41; 90]),
            Tlv::primitive(0x53, vec![]),
        ]);
        let encoded = tlv.encode();
        assert_eq!(Tlv::decode(&encoded).unwrap(), tlv);
    }

    #[test]
    fn test_long_form_lengths() {
        for len in [0x7F, 0x80, 0xFF, 0x100, 0xFFFF, 0x10000] {
            let tlv = Tlv::primitive(0x5F2E, vec![0xEE; len]);
            let encoded = tlv.encode();
            let back = Tlv::decode(&encoded).unwrap();
            assert_eq!(back.as_primitive().unwrap().len(), len);
        }
    }

    #[test]
    fn test_peek_length() {
        let (header, len) = peek_length(&hex!("60145F01")).unwrap();
        assert_eq!((header, len), (2, 0x14));

        // Long form: the first chunk of a large EF.SOD.
        let (header, len) = peek_length(&hex!("778204D23082")).unwrap();
        assert_eq!((header, len), (4, 0x04D2));
    }

    #[test]
    fn test_find_deep() {
        let tlv = Tlv::constructed(0x75, vec![Tlv::constructed(0x7F61, vec![
            Tlv::primitive(0x02, vec![1]),
            Tlv::constructed(0x7F60, vec![Tlv::primitive(0x5F2E, vec![0xFF, 0xD8])]),
        ])]);
        assert_eq!(
            tlv.find_deep(0x5F2E).unwrap().as_primitive().unwrap(),
            &[0xFF, 0xD8]
        );
        assert!(tlv.find_deep(0x5F2F).is_none());
    }

    #[test]
    fn test_reject_indefinite() {
        assert!(Tlv::decode(&hex!("6080 00 00")).is_err());
    }
}
