//! DG7: displayed signature or usual mark.
//! See ICAO 9303-10 4.7.7.

use {
    super::tlv::Tlv,
    crate::{Error, Result},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dg7 {
    /// One or more displayed-signature images, typically JPEG.
    pub images: Vec<Vec<u8>>,
}

impl Dg7 {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let tlv = Tlv::decode(raw)?;
        let images: Vec<Vec<u8>> = tlv
            .children()?
            .iter()
            .filter(|child| child.tag == 0x5F43)
            .map(|child| child.as_primitive().map(<[u8]>::to_vec))
            .collect::<Result<_>>()?;
        if images.is_empty() {
            return Err(Error::Parse("DG7 contains no displayed image".into()));
        }
        Ok(Self { images })
    }
}
