//! End-to-end orchestrator scenarios against the software chip.

mod common;

use {
    anyhow::Result,
    common::{MockChip, SharedChip, DOC_MRZ_KEY},
    cms::{
        content_info::CmsVersion,
        signed_data::{EncapsulatedContentInfo, SignedData, SignerInfos},
    },
    der::{
        asn1::{BitString, ObjectIdentifier as Oid, OctetString, SetOfVec, Uint},
        Any, Encode,
    },
    emrtd_reader::{
        asn1::{
            digest_algorithm_identifier::Parameters,
            public_key_info::{
                Curve, ECAlgoParameters, EcParameters, FieldId, PubkeyAlgorithmIdentifier,
                SubjectPublicKeyInfo, ID_PRIME_FIELD,
            },
            security_info::AnySecurityInfo,
            sod::{DataGroupHash, LdsSecurityObject},
            ApplicationTagged, ContentInfo, DigestAlgorithmIdentifier,
        },
        crypto::{named, HashAlgo},
        lds::{tlv::Tlv, DataGroupContent, DataGroupId},
        session::{AuthStatus, ReadOptions, Session},
        Error,
    },
    std::collections::BTreeSet,
};

fn build_com(tags: &[DataGroupId]) -> Vec<u8> {
    Tlv::constructed(0x60, vec![
        Tlv::primitive(0x5F01, b"0107".to_vec()),
        Tlv::primitive(0x5F36, b"040000".to_vec()),
        Tlv::primitive(0x5C, tags.iter().map(|id| id.tag()).collect::<Vec<_>>()),
    ])
    .encode()
}

fn build_dg1() -> Vec<u8> {
    let mrz = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<\
               L898902C36UTO7408122F1204159ZE184226B<<<<<10";
    Tlv::constructed(0x61, vec![Tlv::primitive(0x5F1F, mrz.as_bytes().to_vec())]).encode()
}

fn build_dg11() -> Vec<u8> {
    Tlv::constructed(0x6B, vec![
        Tlv::primitive(0x5C, vec![0x5F, 0x0E]),
        Tlv::primitive(0x5F0E, b"ERIKSSON<<ANNA<MARIA".to_vec()),
    ])
    .encode()
}

/// An EF.SOD that parses as CMS but carries no signer; hash comparisons run,
/// signature verification reports an error.
fn build_sod(hashes: &[(u64, Vec<u8>)]) -> Vec<u8> {
    let lso = LdsSecurityObject {
        version:                0,
        hash_algorithm:         DigestAlgorithmIdentifier::Sha256(Parameters::Null),
        data_group_hash_values: hashes
            .iter()
            .map(|(number, hash)| DataGroupHash {
                data_group_number: *number,
                hash_value:        OctetString::new(hash.clone()).unwrap(),
            })
            .collect(),
        lds_version_info:       None,
    };
    let econtent = Any::encode_from(&OctetString::new(lso.to_der().unwrap()).unwrap()).unwrap();
    let signed_data = SignedData {
        version:            CmsVersion::V3,
        digest_algorithms:  SetOfVec::default(),
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: Oid::new_unwrap("2.23.136.1.1.1"),
            econtent:      Some(econtent),
        },
        certificates:       None,
        crls:               None,
        signer_infos:       SignerInfos(SetOfVec::default()),
    };
    ApplicationTagged::<23, _>(ContentInfo(signed_data))
        .to_der()
        .unwrap()
}

fn sha256(data: &[u8]) -> Vec<u8> {
    HashAlgo::Sha256.digest(data)
}

/// DG14 advertising Chip Authentication with an EC key the mock chip will
/// never actually honour; exercises the CA failure path.
fn build_dg14() -> Vec<u8> {
    let curve = named::brainpool_p256r1();
    let fe = |v| OctetString::new(curve.element_bytes(v)).unwrap();
    let uint = |v: &[u8]| Uint::new(v).unwrap();
    let params = EcParameters {
        version:  1,
        field_id: FieldId {
            field_type: ID_PRIME_FIELD,
            parameters: Any::encode_from(&uint(&curve.element_bytes(curve.modulus()))).unwrap(),
        },
        curve:    Curve {
            a:    fe(curve.a()),
            b:    fe(curve.b()),
            seed: None,
        },
        base:     OctetString::new(curve.point_to_bytes(curve.generator()).unwrap()).unwrap(),
        order:    uint(&curve.element_bytes(curve.order())),
        cofactor: Some(uint(&[1])),
    };
    let spki = SubjectPublicKeyInfo {
        algorithm:          PubkeyAlgorithmIdentifier::Ec(ECAlgoParameters::EcParameters(params)),
        subject_public_key: BitString::from_bytes(
            &curve.point_to_bytes(curve.generator()).unwrap(),
        )
        .unwrap(),
    };

    let ca_info = AnySecurityInfo {
        protocol:      Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2.1"),
        required_data: Any::encode_from(&1u64).unwrap(),
        optional_data: None,
    };
    let pk_info = AnySecurityInfo {
        protocol:      Oid::new_unwrap("0.4.0.127.0.7.2.2.1.2"),
        required_data: Any::encode_from(&spki).unwrap(),
        optional_data: None,
    };
    // DER set-of order: the id-PK arc sorts before the id-CA arc.
    let set = SetOfVec::try_from(vec![pk_info, ca_info]).unwrap();
    let mut out = Vec::new();
    // [APPLICATION 14] wrapper around the SET OF SecurityInfo.
    let inner = set.to_der().unwrap();
    out.push(0x6E);
    if inner.len() > 0x7F {
        if inner.len() > 0xFF {
            out.push(0x82);
            out.extend_from_slice(&(inner.len() as u16).to_be_bytes());
        } else {
            out.extend_from_slice(&[0x81, inner.len() as u8]);
        }
    } else {
        out.push(inner.len() as u8);
    }
    out.extend_from_slice(&inner);
    out
}

fn session(chip: SharedChip, options: ReadOptions) -> Session<SharedChip> {
    Session::new(chip, options, Box::new(|_| None))
}

#[test]
fn test_bac_full_read() -> Result<()> {
    let com = build_com(&[DataGroupId::Dg1, DataGroupId::Dg11]);
    let dg1 = build_dg1();
    let dg11 = build_dg11();
    let sod = build_sod(&[(1, sha256(&dg1)), (11, sha256(&dg11))]);

    let chip = SharedChip::new(
        MockChip::new()
            .with_file(DataGroupId::Com, com)
            .with_file(DataGroupId::Dg1, dg1.clone())
            .with_file(DataGroupId::Dg11, dg11)
            .with_file(DataGroupId::Sod, sod),
    );
    let mut session = session(chip.clone(), ReadOptions::default());
    let result = session.read_document(DOC_MRZ_KEY)?;

    assert_eq!(result.bac_status, AuthStatus::Success);
    assert_eq!(result.pace_status, AuthStatus::NotDone);
    assert_eq!(result.data_groups.len(), 4);
    assert!(result.data_groups.contains_key(&DataGroupId::Com));
    assert!(result.data_groups.contains_key(&DataGroupId::Sod));

    let dg1_read = result.data_group(DataGroupId::Dg1).unwrap();
    assert_eq!(dg1_read.raw, dg1);
    match &dg1_read.content {
        DataGroupContent::Mrz(parsed) => assert!(parsed.mrz.starts_with("P<UTO")),
        other => panic!("unexpected DG1 content: {other:?}"),
    }

    // Hashes match; the only passive failure is the absent signer.
    assert_eq!(result.passive_authentication_status, AuthStatus::Failed);
    assert!(result
        .verification_errors
        .iter()
        .all(|err| !err.contains("hash mismatch")));

    let chip = chip.0.borrow();
    assert_eq!(chip.bac_runs, 1);
    assert_eq!(chip.last_message.as_deref(), Some("NFC read successfully"));
    Ok(())
}

#[test]
fn test_explicit_list_overrides_com() -> Result<()> {
    let com = build_com(&[DataGroupId::Dg1, DataGroupId::Dg11]);
    let dg1 = build_dg1();
    let sod = build_sod(&[(1, sha256(&dg1))]);

    let chip = SharedChip::new(
        MockChip::new()
            .with_file(DataGroupId::Com, com)
            .with_file(DataGroupId::Dg1, dg1)
            .with_file(DataGroupId::Dg11, build_dg11())
            .with_file(DataGroupId::Sod, sod),
    );
    let options = ReadOptions {
        data_groups: BTreeSet::from([DataGroupId::Dg1]),
        ..ReadOptions::default()
    };
    let result = session(chip, options).read_document(DOC_MRZ_KEY)?;

    // COM and SOD always included; DG11 skipped despite EF.COM listing it.
    assert!(result.data_groups.contains_key(&DataGroupId::Dg1));
    assert!(!result.data_groups.contains_key(&DataGroupId::Dg11));
    assert_eq!(result.data_groups.len(), 3);
    Ok(())
}

#[test]
fn test_access_denied_drops_data_group() -> Result<()> {
    let com = build_com(&[DataGroupId::Dg1, DataGroupId::Dg3]);
    let dg1 = build_dg1();
    let sod = build_sod(&[(1, sha256(&dg1))]);

    let chip = SharedChip::new(
        MockChip::new()
            .with_file(DataGroupId::Com, com)
            .with_file(DataGroupId::Dg1, dg1)
            .with_file(DataGroupId::Dg3, vec![0x63, 0x01, 0x00])
            .with_file(DataGroupId::Sod, sod)
            .deny(DataGroupId::Dg3),
    );
    let options = ReadOptions {
        data_groups: BTreeSet::from([DataGroupId::Dg1, DataGroupId::Dg3]),
        skip_secure_elements: Some(false),
        ..ReadOptions::default()
    };
    let result = session(chip.clone(), options)
        .read_document(DOC_MRZ_KEY)?;

    // DG3 dropped without aborting; access control re-established once.
    assert!(!result.data_groups.contains_key(&DataGroupId::Dg3));
    assert!(result.data_groups.contains_key(&DataGroupId::Dg1));
    assert_eq!(chip.0.borrow().bac_runs, 2);
    Ok(())
}

#[test]
fn test_hash_mismatch_surfaces_but_returns() -> Result<()> {
    let com = build_com(&[DataGroupId::Dg1]);
    let dg1 = build_dg1();
    let sod = build_sod(&[(1, vec![0xDE; 32])]);

    let chip = SharedChip::new(
        MockChip::new()
            .with_file(DataGroupId::Com, com)
            .with_file(DataGroupId::Dg1, dg1)
            .with_file(DataGroupId::Sod, sod),
    );
    let result = session(chip, ReadOptions::default())
        .read_document(DOC_MRZ_KEY)?;

    assert_eq!(result.passive_authentication_status, AuthStatus::Failed);
    assert!(result.data_groups.contains_key(&DataGroupId::Dg1));
    assert!(result
        .verification_errors
        .iter()
        .any(|err| err.contains("hash mismatch")));
    Ok(())
}

#[test]
fn test_chip_authentication_failure_rebacs_and_continues() -> Result<()> {
    let com = build_com(&[DataGroupId::Dg1, DataGroupId::Dg14]);
    let dg1 = build_dg1();
    let dg14 = build_dg14();
    let sod = build_sod(&[(1, sha256(&dg1)), (14, sha256(&dg14))]);

    let chip = SharedChip::new(
        MockChip::new()
            .with_file(DataGroupId::Com, com)
            .with_file(DataGroupId::Dg1, dg1)
            .with_file(DataGroupId::Dg14, dg14)
            .with_file(DataGroupId::Sod, sod),
    );
    let result = session(chip.clone(), ReadOptions::default())
        .read_document(DOC_MRZ_KEY)?;

    // The mock chip rejects MSE:SET AT, so CA fails, BAC is re-run, and the
    // remaining data groups still arrive.
    assert_eq!(result.chip_authentication_status, AuthStatus::Failed);
    assert!(result.data_groups.contains_key(&DataGroupId::Dg1));
    assert!(result.data_groups.contains_key(&DataGroupId::Dg14));

    let chip = chip.0.borrow();
    assert_eq!(chip.bac_runs, 2);

    // Read order: COM, SOD, then DG14 ahead of the bulk reads.
    let expected = [
        DataGroupId::Com.short_ef(),
        DataGroupId::Sod.short_ef(),
        DataGroupId::Dg14.short_ef(),
        DataGroupId::Dg1.short_ef(),
    ];
    assert_eq!(&chip.read_log[..4], &expected);
    Ok(())
}

#[test]
fn test_wrong_le_shrinks_and_succeeds() -> Result<()> {
    let com = build_com(&[DataGroupId::Dg1]);
    let dg1 = build_dg1();
    let sod = build_sod(&[(1, sha256(&dg1))]);

    let mut mock = MockChip::new()
        .with_file(DataGroupId::Com, com)
        .with_file(DataGroupId::Dg1, dg1.clone())
        .with_file(DataGroupId::Sod, sod);
    mock.max_le = 0x50;
    let chip = SharedChip::new(mock);

    let result = session(chip, ReadOptions::default())
        .read_document(DOC_MRZ_KEY)?;
    assert_eq!(result.data_group(DataGroupId::Dg1).unwrap().raw, dg1);
    Ok(())
}

#[test]
fn test_tag_lost_mid_read() {
    let com = build_com(&[DataGroupId::Dg1]);
    let dg1 = build_dg1();
    let sod = build_sod(&[(1, sha256(&dg1))]);

    let mut mock = MockChip::new()
        .with_file(DataGroupId::Com, com)
        .with_file(DataGroupId::Dg1, dg1)
        .with_file(DataGroupId::Sod, sod);
    // Enough exchanges for BAC, then drop the field during EF.COM.
    mock.fail_after = Some(5);
    let chip = SharedChip::new(mock);

    let err = session(chip.clone(), ReadOptions::default())
        .read_document(DOC_MRZ_KEY)
        .unwrap_err();
    assert!(matches!(err, Error::Connection));

    let chip = chip.0.borrow();
    assert_eq!(chip.invalidations, 1);
    assert_eq!(
        chip.last_message.as_deref(),
        Some("Connection error. Please try again.")
    );
}

#[test]
fn test_cancellation_before_read() {
    let chip = SharedChip::new(MockChip::new());
    let mut session = session(chip.clone(), ReadOptions::default());
    session.cancel_flag().cancel();

    let err = session.read_document(DOC_MRZ_KEY).unwrap_err();
    assert!(matches!(err, Error::UserCanceled));
    assert_eq!(chip.0.borrow().invalidations, 1);
}
