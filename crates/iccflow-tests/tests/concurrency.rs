//! Sharing transforms and profiles across threads

use std::thread;

use iccflow_core::{
    ColorTransform, PixelFormat, Pipeline, Profile, RenderingIntent, TagSignature, ToneCurve,
    TransformFlags, Xyz,
};
use iccflow_tests::fixtures;
use iccflow_tests::patterns::{TestPattern, generate_pattern, sizes};
use rayon::prelude::*;

#[test]
fn test_parallel_chunks_match_a_sequential_run() {
    let srgb = fixtures::srgb().unwrap();
    let p3 = fixtures::display_p3().unwrap();
    let t = ColorTransform::compile(
        &srgb,
        PixelFormat::RGBA_8,
        &p3,
        PixelFormat::RGBA_8,
        RenderingIntent::Perceptual,
        TransformFlags::new(),
        None,
    )
    .unwrap();

    let src = generate_pattern(TestPattern::Random(31), sizes::MEDIUM, 4);
    let sequential = t.transform(&src).unwrap();

    let mut parallel = vec![0u8; src.len()];
    let rows = 256 * 4;
    src.par_chunks(rows)
        .zip(parallel.par_chunks_mut(rows))
        .try_for_each(|(s, d)| t.transform_into(s, d))
        .unwrap();

    assert_eq!(sequential, parallel);
}

#[test]
fn test_one_profile_is_read_from_many_threads() {
    let srgb = Profile::parse(&fixtures::srgb().unwrap().save(), None).unwrap();
    let expected: ToneCurve = srgb.read_tag(TagSignature::RED_TRC).unwrap().unwrap();

    thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let srgb = &srgb;
                s.spawn(move || {
                    let sig = [TagSignature::RED_TRC, TagSignature::GREEN_TRC, TagSignature::BLUE_TRC][i % 3];
                    let curve: ToneCurve = srgb.read_tag(sig).unwrap().unwrap();
                    let white: Xyz = srgb.read_tag(TagSignature::MEDIA_WHITE).unwrap().unwrap();
                    (curve, white)
                })
            })
            .collect();
        for h in handles {
            let (curve, white) = h.join().unwrap();
            assert_eq!(white, srgb.media_white_point());
            for x in [0.0, 0.01, 0.5, 1.0] {
                assert!((curve.evaluate(x) - expected.evaluate(x)).abs() < 1e-12);
            }
        }
    });
}

#[test]
fn test_clones_are_edited_independently() {
    let cmyk = fixtures::cmyk_lut(&[RenderingIntent::Perceptual]).unwrap();
    let original: Pipeline = cmyk.read_tag(TagSignature::A2B0).unwrap().unwrap();

    let edited = thread::scope(|s| {
        s.spawn(|| {
            let mut copy = cmyk.clone();
            copy.remove_tag(TagSignature::A2B0);
            copy.write_tag(TagSignature::PROFILE_DESC, "edited").unwrap();
            copy
        })
        .join()
        .unwrap()
    });

    assert!(!edited.contains(TagSignature::A2B0));
    assert!(cmyk.contains(TagSignature::A2B0));
    let still: Pipeline = cmyk.read_tag(TagSignature::A2B0).unwrap().unwrap();
    assert_eq!(still.stage_count(), original.stage_count());
    assert_eq!(cmyk.read_tag::<String>(TagSignature::PROFILE_DESC).unwrap().as_deref(), Some("synthetic CMYK"));
}

#[test]
fn test_transforms_move_between_threads() {
    let gray = fixtures::gray(2.2).unwrap();
    let t = ColorTransform::compile(
        &gray,
        PixelFormat::GRAY_8,
        &gray,
        PixelFormat::GRAY_8,
        RenderingIntent::Perceptual,
        TransformFlags::new(),
        None,
    )
    .unwrap();
    let src = generate_pattern(TestPattern::Ramp, 256, 1);
    let out = thread::spawn(move || t.transform(&src).map(|dst| (src, dst)))
        .join()
        .unwrap()
        .unwrap();
    assert!(iccflow_tests::max_channel_diff(&out.0, &out.1).unwrap() <= 1);
}
