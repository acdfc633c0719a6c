//! DG11: additional personal details.
//! See ICAO 9303-10 4.7.11. All fields are optional.

use {
    super::tlv::Tlv,
    crate::Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dg11 {
    pub full_name:            Option<String>,
    pub other_names:          Option<String>,
    pub personal_number:      Option<String>,
    pub full_date_of_birth:   Option<String>,
    pub place_of_birth:       Option<String>,
    pub permanent_address:    Option<String>,
    pub telephone:            Option<String>,
    pub profession:           Option<String>,
    pub title:                Option<String>,
    pub personal_summary:     Option<String>,
    pub other_travel_doc_numbers: Option<String>,
    pub custody_information:  Option<String>,
}

fn text(tlv: &Tlv, tag: u16) -> Option<String> {
    tlv.find(tag)
        .and_then(|field| field.as_primitive().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

impl Dg11 {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let tlv = Tlv::decode(raw)?;
        Ok(Self {
            full_name:            text(&tlv, 0x5F0E),
            other_names:          text(&tlv, 0x5F0F),
            personal_number:      text(&tlv, 0x5F10),
            full_date_of_birth:   text(&tlv, 0x5F2B),
            place_of_birth:       text(&tlv, 0x5F11),
            permanent_address:    text(&tlv, 0x5F42),
            telephone:            text(&tlv, 0x5F12),
            profession:           text(&tlv, 0x5F13),
            title:                text(&tlv, 0x5F14),
            personal_summary:     text(&tlv, 0x5F15),
            other_travel_doc_numbers: text(&tlv, 0x5F17),
            custody_information:  text(&tlv, 0x5F18),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let raw = Tlv::constructed(0x6B, vec![
            Tlv::primitive(0x5C, vec![0x5F, 0x0E, 0x5F, 0x2B]),
            Tlv::primitive(0x5F0E, b"ERIKSSON<<ANNA<MARIA".to_vec()),
            Tlv::primitive(0x5F2B, b"19740812".to_vec()),
        ])
        .encode();
        let dg11 = Dg11::parse(&raw).unwrap();
        assert_eq!(dg11.full_name.as_deref(), Some("ERIKSSON<<ANNA<MARIA"));
        assert_eq!(dg11.full_date_of_birth.as_deref(), Some("19740812"));
        assert_eq!(dg11.place_of_birth, None);
    }
}
