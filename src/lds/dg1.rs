//! DG1: the Machine Readable Zone as printed.
//! See ICAO 9303-10 4.7.1. Splitting the MRZ into fields is the host's job;
//! the data group surfaces the zone verbatim.

use {
    super::tlv::Tlv,
    crate::{Error, Result},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dg1 {
    pub mrz: String,
}

impl Dg1 {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let tlv = Tlv::decode(raw)?;
        let mrz = tlv
            .find(0x5F1F)
            .ok_or(Error::Parse("DG1 missing MRZ data object".into()))?
            .as_primitive()?;
        Ok(Self {
            mrz: String::from_utf8_lossy(mrz).into_owned(),
        })
    }

    /// TD1 documents use three lines of 30, TD3 two lines of 44.
    pub fn lines(&self) -> Vec<&str> {
        match self.mrz.len() {
            90 => vec![&self.mrz[..30], &self.mrz[30..60], &self.mrz[60..]],
            72 => vec![&self.mrz[..36], &self.mrz[36..]],
            88 => vec![&self.mrz[..44], &self.mrz[44..]],
            _ => vec![&self.mrz],
        }
    }
}
