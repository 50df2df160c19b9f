//! Profile save/parse round trips and tag store behavior

use std::sync::{Arc, Mutex};

use iccflow_core::{
    Context, ErrorKind, InfoKind, Matrix3x3, MatrixStage, NamedColorList, Pipeline, Profile,
    ProfileVersion, Stage, TagSignature, ToneCurve, TypeSignature, Xyz,
};
use iccflow_tests::fixtures;

#[test]
fn test_srgb_survives_save_and_parse() {
    let srgb = fixtures::srgb().unwrap();
    let bytes = srgb.save();
    let parsed = Profile::parse(&bytes, None).unwrap();

    assert_eq!(parsed, srgb);
    assert_eq!(parsed.save(), bytes);
    assert_eq!(parsed.tag_count(), srgb.tag_count());
    assert_eq!(parsed.linked_to(TagSignature::GREEN_TRC), Some(TagSignature::RED_TRC));
    assert_eq!(parsed.linked_to(TagSignature::BLUE_TRC), Some(TagSignature::RED_TRC));
}

#[test]
fn test_saved_header_is_consistent() {
    let bytes = fixtures::display_p3().unwrap().save();
    let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    assert_eq!(size, bytes.len());
    assert_eq!(&bytes[36..40], b"acsp");
    // Profile ID is not computed
    assert!(bytes[84..100].iter().all(|&b| b == 0));
}

#[test]
fn test_directory_keeps_insertion_order() {
    let srgb = fixtures::srgb().unwrap();
    let parsed = Profile::parse(&srgb.save(), None).unwrap();
    let before: Vec<_> = srgb.signatures().collect();
    let after: Vec<_> = parsed.signatures().collect();
    assert_eq!(before, after);
    assert_eq!(parsed.tag_at(0), before.first().copied());
}

#[test]
fn test_removing_a_link_target_hands_over_the_payload() {
    let mut srgb = Profile::parse(&fixtures::srgb().unwrap().save(), None).unwrap();
    let red: ToneCurve = srgb.read_tag(TagSignature::RED_TRC).unwrap().unwrap();

    assert!(srgb.remove_tag(TagSignature::RED_TRC));
    assert!(!srgb.contains(TagSignature::RED_TRC));
    assert_eq!(srgb.linked_to(TagSignature::GREEN_TRC), None);
    assert_eq!(srgb.linked_to(TagSignature::BLUE_TRC), Some(TagSignature::GREEN_TRC));

    let green: ToneCurve = srgb.read_tag(TagSignature::GREEN_TRC).unwrap().unwrap();
    for x in [0.0, 0.02, 0.5, 1.0] {
        assert!((green.evaluate(x) - red.evaluate(x)).abs() < 1e-9);
    }

    let reparsed = Profile::parse(&srgb.save(), None).unwrap();
    assert_eq!(reparsed, srgb);
}

#[test]
fn test_link_to_absent_tag_fails() {
    let mut srgb = fixtures::srgb().unwrap();
    let err = srgb.link(TagSignature::GRAY_TRC, TagSignature::A2B0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownTag);
}

#[test]
fn test_raw_tags_are_preserved_byte_for_byte() {
    let mut gray = fixtures::gray(2.2).unwrap();
    let vendor = TagSignature::from_bytes(*b"vndr");
    let body = [1u8, 2, 3, 4, 5, 6, 7];
    gray.write_raw_tag(vendor, TypeSignature::from_bytes(*b"blob"), &body)
        .unwrap();

    let parsed = Profile::parse(&gray.save(), None).unwrap();
    let raw = parsed.tag(vendor).unwrap();
    assert_eq!(&raw[..4], b"blob");
    assert_eq!(&raw[8..15], &body);
    assert_eq!(parsed.tag_type(vendor), Some(TypeSignature::from_bytes(*b"blob")));
    // Unknown types read as "no value" for every target type
    assert!(parsed.read_tag::<Xyz>(vendor).unwrap().is_none());
    assert!(parsed.read_tag::<String>(vendor).unwrap().is_none());
}

#[test]
fn test_corrupt_payload_is_reported_through_the_context() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ctx = Context::builder()
        .with_error_log(move |_, kind| sink.lock().unwrap().push(kind))
        .build();

    let mut gray = fixtures::gray(1.8).unwrap();
    // An XYZ tag two bytes too short to hold one value
    gray.write_raw_tag(TagSignature::MEDIA_BLACK, TypeSignature::XYZ, &[0; 10])
        .unwrap();
    let parsed = Profile::parse(&gray.save(), Some(&ctx)).unwrap();

    let err = parsed.read_tag::<Xyz>(TagSignature::MEDIA_BLACK).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptData);
    // The cached failure is replayed
    assert_eq!(
        parsed.read_tag::<Xyz>(TagSignature::MEDIA_BLACK).unwrap_err().kind(),
        ErrorKind::CorruptData
    );
    assert!(seen.lock().unwrap().contains(&ErrorKind::CorruptData));
}

#[test]
fn test_truncated_profile_is_rejected() {
    let bytes = fixtures::srgb().unwrap().save();
    for len in [0, 64, 127, 131, bytes.len() - 1] {
        let err = Profile::parse(&bytes[..len], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData, "length {}", len);
    }
}

#[test]
fn test_text_encoding_follows_the_profile_version() {
    for (version, expected) in [(ProfileVersion::V2_1, b"desc"), (ProfileVersion::V4_3, b"mluc")] {
        let mut gray = fixtures::gray(2.2).unwrap();
        gray.set_version(version);
        gray.write_tag(TagSignature::PROFILE_DESC, "Gray 2.2").unwrap();
        let parsed = Profile::parse(&gray.save(), None).unwrap();
        assert_eq!(parsed.tag_type(TagSignature::PROFILE_DESC).map(|t| t.to_bytes()), Some(*expected));
        assert_eq!(parsed.info(InfoKind::Description).as_deref(), Some("Gray 2.2"));
    }
}

#[test]
fn test_curves_encode_by_version() {
    let mut gray = fixtures::gray(2.2).unwrap();
    gray.set_version(ProfileVersion::V2_1);
    gray.write_tag(TagSignature::GRAY_TRC, ToneCurve::gamma(2.2, None).unwrap()).unwrap();
    assert_eq!(gray.tag_type(TagSignature::GRAY_TRC), Some(TypeSignature::CURVE));

    gray.set_version(ProfileVersion::V4_3);
    let srgb_curve = fixtures::srgb()
        .unwrap()
        .read_tag::<ToneCurve>(TagSignature::RED_TRC)
        .unwrap()
        .unwrap();
    gray.write_tag(TagSignature::GRAY_TRC, srgb_curve).unwrap();
    assert_eq!(gray.tag_type(TagSignature::GRAY_TRC), Some(TypeSignature::PARA));
}

#[test]
fn test_pipelines_are_stored_as_multi_process_elements() {
    let cmyk = fixtures::cmyk_lut(&[iccflow_core::RenderingIntent::Perceptual]).unwrap();
    assert_eq!(cmyk.tag_type(TagSignature::A2B0), Some(TypeSignature::MPET));

    let parsed = Profile::parse(&cmyk.save(), None).unwrap();
    let original: Pipeline = cmyk.read_tag(TagSignature::A2B0).unwrap().unwrap();
    let decoded: Pipeline = parsed.read_tag(TagSignature::A2B0).unwrap().unwrap();
    assert_eq!(decoded.input_channels(), 4);
    assert_eq!(decoded.output_channels(), 3);
    for v in iccflow_tests::patterns::unit_vectors(3, 50, 4) {
        let a = original.evaluate(&v).unwrap();
        let b = decoded.evaluate(&v).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4, "{:?}: {:?} vs {:?}", v, a, b);
        }
    }
}

#[test]
fn test_malformed_matrix_element_reads_as_corrupt() {
    let mut profile = Profile::xyz(None).unwrap();
    let m = MatrixStage::from_matrix3(&Matrix3x3::diagonal(2.0, 1.0, 0.5), None);
    let pipeline = Pipeline::from_stages(vec![Stage::Matrix(m)], None).unwrap();
    profile.write_tag(TagSignature::A2B1, pipeline).unwrap();

    let mut raw = profile.tag(TagSignature::A2B1).unwrap().to_vec();
    let at = raw.windows(4).position(|w| w == b"matf").unwrap() + 12;
    raw[at..at + 4].copy_from_slice(&f32::NAN.to_be_bytes());
    profile
        .write_raw_tag(TagSignature::A2B1, TypeSignature::MPET, &raw[8..])
        .unwrap();

    let err = profile.read_tag::<Pipeline>(TagSignature::A2B1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptData);
}

#[test]
fn test_named_colors_round_trip() {
    let spots = fixtures::spot_colors().unwrap();
    let parsed = Profile::parse(&spots.save(), None).unwrap();
    let list: NamedColorList = parsed.read_tag(TagSignature::NAMED_COLOR).unwrap().unwrap();

    assert_eq!(list.len(), 3);
    assert_eq!(list.colorant_count(), 4);
    assert_eq!(list.prefix(), "Spot ");
    assert_eq!(list.find("green"), Some(1));
    let red = list.get(0).unwrap();
    assert_eq!(red.pcs, [0x8000, 0xD000, 0xB000]);
    assert_eq!(red.colorants, vec![0, 65535, 65535, 0]);
}

#[test]
fn test_clone_edits_do_not_leak() {
    let srgb = fixtures::srgb().unwrap();
    let mut copy = srgb.clone();
    copy.write_tag(TagSignature::MEDIA_WHITE, Xyz::new(0.9, 1.0, 0.7)).unwrap();
    assert_eq!(srgb.media_white_point(), iccflow_core::D50.xyz);
    assert_ne!(copy, srgb);
}
