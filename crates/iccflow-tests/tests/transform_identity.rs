//! A profile linked to itself reproduces its input

use iccflow_core::{
    ColorTransform, PixelFormat, Profile, RenderingIntent, SampleType, TransformFlags,
};
use iccflow_tests::patterns::{TestPattern, generate_pattern, generate_pattern_16, sizes};
use iccflow_tests::{fixtures, max_channel_diff};

const PATTERNS: [TestPattern; 6] = [
    TestPattern::Ramp,
    TestPattern::ColorCube,
    TestPattern::HueRamp,
    TestPattern::Random(0x1cc),
    TestPattern::GamutBoundary,
    TestPattern::White,
];

fn identity(profile: &Profile, fmt: PixelFormat, flags: TransformFlags) -> ColorTransform {
    ColorTransform::compile(
        profile,
        fmt,
        profile,
        fmt,
        RenderingIntent::Perceptual,
        flags,
        None,
    )
    .unwrap()
}

fn read_u16(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|b| u16::from_ne_bytes([b[0], b[1]]))
        .collect()
}

#[test]
fn test_srgb_rgb8_identity() {
    let srgb = fixtures::srgb().unwrap();
    for flags in [TransformFlags::new(), TransformFlags::new().with_no_optimize()] {
        let t = identity(&srgb, PixelFormat::RGB_8, flags);
        for pattern in PATTERNS {
            let src = generate_pattern(pattern, sizes::SMALL, 3);
            let dst = t.transform(&src).unwrap();
            let diff = max_channel_diff(&src, &dst).unwrap();
            assert!(diff <= 1, "{:?} with {:?}: max diff {}", pattern, flags, diff);
        }
    }
}

#[test]
fn test_srgb_rgb16_identity() {
    let srgb = fixtures::srgb().unwrap();
    let t = identity(&srgb, PixelFormat::RGB_16, TransformFlags::new());
    for pattern in PATTERNS {
        let src = generate_pattern_16(pattern, sizes::TINY, 3);
        let dst = t.transform(&src).unwrap();
        for (a, b) in read_u16(&src).iter().zip(read_u16(&dst)) {
            assert!(a.abs_diff(b) <= 64, "{:?}: {} vs {}", pattern, a, b);
        }
    }
}

#[test]
fn test_gray_identity() {
    for gamma in [1.0, 1.8, 2.2] {
        let gray = fixtures::gray(gamma).unwrap();
        let t = identity(&gray, PixelFormat::GRAY_8, TransformFlags::new());
        let src = generate_pattern(TestPattern::Ramp, 256, 1);
        let dst = t.transform(&src).unwrap();
        assert!(max_channel_diff(&src, &dst).unwrap() <= 1, "gamma {}", gamma);
    }
}

#[test]
fn test_float_identity_is_tight() {
    let p3 = fixtures::display_p3().unwrap();
    let t = identity(&p3, PixelFormat::RGB_DBL, TransformFlags::new());
    let values: Vec<f64> = iccflow_tests::patterns::unit_vectors(11, 200, 3)
        .into_iter()
        .flatten()
        .collect();
    let src: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let dst = t.transform(&src).unwrap();
    for (i, px) in dst.chunks_exact(8).enumerate() {
        let mut b = [0u8; 8];
        b.copy_from_slice(px);
        let v = f64::from_ne_bytes(b);
        assert!((v - values[i]).abs() < 1e-6, "sample {}: {} vs {}", i, v, values[i]);
    }
}

#[test]
fn test_alpha_passes_through() {
    let p3 = fixtures::display_p3().unwrap();
    let t = identity(&p3, PixelFormat::RGBA_8, TransformFlags::new());
    let src = generate_pattern(TestPattern::Random(5), sizes::TINY, 4);
    let dst = t.transform(&src).unwrap();
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact(4)) {
        assert_eq!(s[3], d[3]);
    }
    assert!(max_channel_diff(&src, &dst).unwrap() <= 1);
}

#[test]
fn test_swapped_output_reverses_channels() {
    let srgb = fixtures::srgb().unwrap();
    let t = ColorTransform::compile(
        &srgb,
        PixelFormat::RGB_8,
        &srgb,
        PixelFormat::BGR_8,
        RenderingIntent::Perceptual,
        TransformFlags::new(),
        None,
    )
    .unwrap();
    let src = generate_pattern(TestPattern::GamutBoundary, 8, 3);
    let dst = t.transform(&src).unwrap();
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact(3)) {
        for c in 0..3 {
            assert!(s[c].abs_diff(d[2 - c]) <= 1, "{:?} vs {:?}", s, d);
        }
    }
}

#[test]
fn test_planar_output_matches_interleaved() {
    let srgb = fixtures::srgb().unwrap();
    let planar_fmt = PixelFormat {
        planar: true,
        ..PixelFormat::RGB_8
    };
    let interleaved = identity(&srgb, PixelFormat::RGB_8, TransformFlags::new());
    let planar = ColorTransform::compile(
        &srgb,
        PixelFormat::RGB_8,
        &srgb,
        planar_fmt,
        RenderingIntent::Perceptual,
        TransformFlags::new(),
        None,
    )
    .unwrap();

    let pixels = 100;
    let src = generate_pattern(TestPattern::HueRamp, pixels, 3);
    let a = interleaved.transform(&src).unwrap();
    let b = planar.transform(&src).unwrap();
    for p in 0..pixels {
        for c in 0..3 {
            assert_eq!(a[p * 3 + c], b[c * pixels + p]);
        }
    }
}

#[test]
fn test_lab_identity_profile_keeps_values() {
    let lab = Profile::lab_v4(iccflow_core::D50.xyy(), None).unwrap();
    let t = ColorTransform::compile_device_link(
        &lab,
        PixelFormat::LAB_DBL,
        PixelFormat::LAB_DBL,
        RenderingIntent::Perceptual,
        TransformFlags::new(),
        None,
    )
    .unwrap();
    let values = [[0.0, 0.0, 0.0], [50.0, 20.0, -30.0], [100.0, -128.0, 127.0]];
    let src: Vec<u8> = values.iter().flatten().flat_map(|v: &f64| v.to_ne_bytes()).collect();
    let out = iccflow_tests::accuracy::lab_from_bytes(&t.transform(&src).unwrap());
    for (v, lab) in values.iter().zip(&out) {
        assert!((lab.l - v[0]).abs() < 1e-6, "{:?} vs {:?}", v, lab);
        assert!((lab.a - v[1]).abs() < 1e-6, "{:?} vs {:?}", v, lab);
        assert!((lab.b - v[2]).abs() < 1e-6, "{:?} vs {:?}", v, lab);
    }
}

#[test]
fn test_formats_report_their_layout() {
    let srgb = fixtures::srgb().unwrap();
    let t = identity(&srgb, PixelFormat::RGB_16, TransformFlags::new().with_high_resolution());
    assert_eq!(t.input_format().sample, SampleType::U16);
    assert_eq!(t.output_format(), PixelFormat::RGB_16);
    assert_eq!(t.intent(), RenderingIntent::Perceptual);
    assert!(t.flags().high_resolution);
    assert!(t.named_color_list().is_none());
}
