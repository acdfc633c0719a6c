//! DG12: additional document details.
//! See ICAO 9303-10 4.7.12. All fields are optional.

use {
    super::tlv::Tlv,
    crate::Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dg12 {
    pub issuing_authority:       Option<String>,
    pub date_of_issue:           Option<String>,
    pub other_persons:           Option<String>,
    pub endorsements:            Option<String>,
    pub tax_or_exit_requirements: Option<String>,
    pub personalization_time:    Option<String>,
    pub personalization_number:  Option<String>,
}

fn text(tlv: &Tlv, tag: u16) -> Option<String> {
    tlv.find(tag)
        .and_then(|field| field.as_primitive().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

impl Dg12 {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let tlv = Tlv::decode(raw)?;
        Ok(Self {
            issuing_authority:       text(&tlv, 0x5F19),
            date_of_issue:           text(&tlv, 0x5F26),
            other_persons:           text(&tlv, 0x5F1A),
            endorsements:            text(&tlv, 0x5F1B),
            tax_or_exit_requirements: text(&tlv, 0x5F1C),
            personalization_time:    text(&tlv, 0x5F55),
            personalization_number:  text(&tlv, 0x5F56),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let raw = Tlv::constructed(0x6C, vec![
            Tlv::primitive(0x5C, vec![0x5F, 0x19, 0x5F, 0x26]),
            Tlv::primitive(0x5F19, b"UTOPIA PASSPORT OFFICE".to_vec()),
            Tlv::primitive(0x5F26, b"20150101".to_vec()),
        ])
        .encode();
        let dg12 = Dg12::parse(&raw).unwrap();
        assert_eq!(dg12.issuing_authority.as_deref(), Some("UTOPIA PASSPORT OFFICE"));
        assert_eq!(dg12.date_of_issue.as_deref(), Some("20150101"));
        assert_eq!(dg12.endorsements, None);
    }
}
