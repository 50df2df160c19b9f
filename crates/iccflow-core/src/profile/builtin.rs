//! Synthesized profiles
//!
//! Each constructor is a pure function of its arguments and writes the
//! minimal tag set a CMM needs to use the profile.

use super::Profile;
use crate::color::{D50, D65, XyY, Xyz};
use crate::context::{Context, report};
use crate::curve::ToneCurve;
use crate::error::{Error, Result};
use crate::icc::{ColorSpace, ProfileClass, ProfileVersion, TagSignature};
use crate::math::matrix::{columns, rgb_to_xyz_matrix};
use crate::math::{ParametricCurve, bradford_matrix};
use crate::pipeline::{ClutStage, Pipeline, Stage};

/// Grid points per axis of the ink-limiting CLUT
pub const INK_LIMIT_GRID: usize = 17;

fn white_xyz(white: XyY, ctx: Option<&Context>) -> Result<Xyz> {
    if !(white.x.is_finite() && white.y.is_finite() && white.y > 0.0) {
        return Err(report(
            ctx,
            Error::invalid(format!(
                "white point chromaticity ({}, {}) is not usable",
                white.x, white.y
            )),
        ));
    }
    Ok(XyY::new(white.x, white.y, 1.0).to_xyz())
}

fn identity_lut(channels: usize, ctx: Option<&Context>) -> Result<Pipeline> {
    Pipeline::from_stages(vec![Stage::Identity(channels)], ctx)
}

impl Profile {
    /// Gray display profile from a white point and a transfer curve
    ///
    /// Tags: desc, wtpt, kTRC.
    pub fn gray(white: XyY, curve: &ToneCurve, ctx: Option<&Context>) -> Result<Self> {
        let white = white_xyz(white, ctx)?;
        let mut profile = Self::new(ProfileClass::Display, ColorSpace::Gray, ColorSpace::Xyz, ctx);
        profile.write_tag(TagSignature::PROFILE_DESC, "gray built-in")?;
        profile.write_tag(TagSignature::MEDIA_WHITE, white)?;
        profile.write_tag(TagSignature::GRAY_TRC, curve.clone())?;
        Ok(profile)
    }

    /// RGB display profile from a white point, primaries and one curve per
    /// channel
    ///
    /// The colorants are adapted to D50 with Bradford and the adaptation is
    /// stored in 'chad'. Curves that encode identically share one payload.
    pub fn rgb(
        white: XyY,
        primaries: [XyY; 3],
        curves: &[ToneCurve; 3],
        ctx: Option<&Context>,
    ) -> Result<Self> {
        let white_xyz = white_xyz(white, ctx)?;
        let to_xyz = rgb_to_xyz_matrix(white, primaries).ok_or_else(|| {
            report(ctx, Error::invalid("primaries do not span a color space"))
        })?;
        let chad = bradford_matrix(white_xyz, D50.xyz);
        let [red, green, blue] = columns(&chad.multiply(&to_xyz));

        let mut profile = Self::new(ProfileClass::Display, ColorSpace::Rgb, ColorSpace::Xyz, ctx);
        profile.write_tag(TagSignature::PROFILE_DESC, "RGB built-in")?;
        profile.write_tag(TagSignature::MEDIA_WHITE, D50.xyz)?;
        profile.write_tag(TagSignature::CHAD, chad)?;
        profile.write_tag(TagSignature::RED_COLORANT, red)?;
        profile.write_tag(TagSignature::GREEN_COLORANT, green)?;
        profile.write_tag(TagSignature::BLUE_COLORANT, blue)?;

        let trcs = [TagSignature::RED_TRC, TagSignature::GREEN_TRC, TagSignature::BLUE_TRC];
        for (i, (sig, curve)) in trcs.iter().zip(curves).enumerate() {
            profile.write_tag(*sig, curve.clone())?;
            let shared = trcs[..i]
                .iter()
                .find(|prev| profile.tag(**prev) == profile.tag(*sig))
                .copied();
            if let Some(prev) = shared {
                profile.link(*sig, prev)?;
            }
        }
        Ok(profile)
    }

    /// IEC 61966-2-1 sRGB
    pub fn srgb(ctx: Option<&Context>) -> Result<Self> {
        let curve = ToneCurve::from_parametric(ParametricCurve::srgb(), ctx);
        let mut profile = Self::rgb(
            D65.xyy(),
            [
                XyY::new(0.64, 0.33, 1.0),
                XyY::new(0.30, 0.60, 1.0),
                XyY::new(0.15, 0.06, 1.0),
            ],
            &[curve.clone(), curve.clone(), curve],
            ctx,
        )?;
        profile.write_tag(TagSignature::PROFILE_DESC, "sRGB built-in")?;
        Ok(profile)
    }

    /// Lab identity abstract profile marked as ICC v2
    pub fn lab_v2(white: XyY, ctx: Option<&Context>) -> Result<Self> {
        Self::lab_identity(white, ProfileVersion::V2_1, ctx)
    }

    /// Lab identity abstract profile marked as ICC v4
    pub fn lab_v4(white: XyY, ctx: Option<&Context>) -> Result<Self> {
        Self::lab_identity(white, ProfileVersion::V4_3, ctx)
    }

    fn lab_identity(white: XyY, version: ProfileVersion, ctx: Option<&Context>) -> Result<Self> {
        let white = white_xyz(white, ctx)?;
        let mut profile = Self::new(ProfileClass::Abstract, ColorSpace::Lab, ColorSpace::Lab, ctx);
        profile.set_version(version);
        profile.write_tag(TagSignature::PROFILE_DESC, "Lab identity built-in")?;
        profile.write_tag(TagSignature::MEDIA_WHITE, white)?;
        profile.write_tag(TagSignature::A2B0, identity_lut(3, ctx)?)?;
        profile.write_tag(TagSignature::B2A0, identity_lut(3, ctx)?)?;
        Ok(profile)
    }

    /// XYZ identity abstract profile
    pub fn xyz(ctx: Option<&Context>) -> Result<Self> {
        let mut profile = Self::new(ProfileClass::Abstract, ColorSpace::Xyz, ColorSpace::Xyz, ctx);
        profile.write_tag(TagSignature::PROFILE_DESC, "XYZ identity built-in")?;
        profile.write_tag(TagSignature::MEDIA_WHITE, D50.xyz)?;
        profile.write_tag(TagSignature::A2B0, identity_lut(3, ctx)?)?;
        profile.write_tag(TagSignature::B2A0, identity_lut(3, ctx)?)?;
        Ok(profile)
    }

    /// CMYK device link that caps total ink coverage at `limit` percent
    ///
    /// Coverage above the limit is removed from C, M and Y in proportion;
    /// K passes through unchanged.
    pub fn ink_limiting_device_link(
        color_space: ColorSpace,
        limit: f64,
        ctx: Option<&Context>,
    ) -> Result<Self> {
        if color_space != ColorSpace::Cmyk {
            return Err(report(
                ctx,
                Error::invalid(format!("ink limiting needs CMYK, got {:?}", color_space)),
            ));
        }
        if !(0.0..=400.0).contains(&limit) {
            return Err(report(
                ctx,
                Error::invalid(format!("ink limit must be within 0..=400, got {}", limit)),
            ));
        }

        let max_ink = limit / 100.0;
        let clut = ClutStage::from_fn(&[INK_LIMIT_GRID; 4], 4, |input, out| {
            let cmy = input[0] + input[1] + input[2];
            let total = cmy + input[3];
            let ratio = if total > max_ink && cmy > 0.0 {
                (1.0 - (total - max_ink) / cmy).max(0.0)
            } else {
                1.0
            };
            for c in 0..3 {
                out[c] = input[c] * ratio;
            }
            out[3] = input[3];
        })?;
        let lut = Pipeline::from_stages(
            vec![
                Stage::identity_curves(4)?,
                Stage::Clut(clut),
                Stage::identity_curves(4)?,
            ],
            ctx,
        )?;

        let mut profile = Self::new(ProfileClass::DeviceLink, color_space, color_space, ctx);
        profile.write_tag(TagSignature::PROFILE_DESC, "ink-limiting built-in")?;
        profile.write_tag(TagSignature::MEDIA_WHITE, D50.xyz)?;
        profile.write_tag(TagSignature::A2B0, lut)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::profile::InfoKind;

    #[test]
    fn test_srgb_tags() {
        let profile = Profile::srgb(None).unwrap();
        assert!(profile.is_matrix_shaper());
        assert_eq!(profile.version(), ProfileVersion::V4_3);
        assert_eq!(profile.linked_to(TagSignature::GREEN_TRC), Some(TagSignature::RED_TRC));
        assert_eq!(profile.linked_to(TagSignature::BLUE_TRC), Some(TagSignature::RED_TRC));
        assert_eq!(profile.info(InfoKind::Description).as_deref(), Some("sRGB built-in"));

        // Colorants sum to the D50 white
        let sum = [
            TagSignature::RED_COLORANT,
            TagSignature::GREEN_COLORANT,
            TagSignature::BLUE_COLORANT,
        ]
        .iter()
        .map(|&sig| profile.read_tag::<Xyz>(sig).unwrap().unwrap())
        .fold(Xyz::default(), |acc, c| acc + c);
        assert!(sum.approx_eq(&D50.xyz, 1e-3));
    }

    #[test]
    fn test_srgb_save_parse_is_identical() {
        let profile = Profile::srgb(None).unwrap();
        let bytes = profile.save();
        let back = Profile::parse(&bytes, None).unwrap();
        assert_eq!(back, profile);
        assert_eq!(back.save(), bytes);
    }

    #[test]
    fn test_rgb_distinct_curves_are_not_linked() {
        let curves = [
            ToneCurve::gamma(1.8, None).unwrap(),
            ToneCurve::gamma(2.2, None).unwrap(),
            ToneCurve::gamma(1.8, None).unwrap(),
        ];
        let profile = Profile::rgb(D65.xyy(), [
            XyY::new(0.64, 0.33, 1.0),
            XyY::new(0.21, 0.71, 1.0),
            XyY::new(0.15, 0.06, 1.0),
        ], &curves, None)
        .unwrap();
        assert_eq!(profile.linked_to(TagSignature::GREEN_TRC), None);
        assert_eq!(profile.linked_to(TagSignature::BLUE_TRC), Some(TagSignature::RED_TRC));
        assert!(profile.chromatic_adaptation().is_some());
    }

    #[test]
    fn test_degenerate_primaries() {
        let p = XyY::new(0.3, 0.3, 1.0);
        let curve = ToneCurve::identity();
        let err = Profile::rgb(D65.xyy(), [p, p, p], &[curve.clone(), curve.clone(), curve], None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_lab_profiles() {
        let v2 = Profile::lab_v2(D50.xyy(), None).unwrap();
        let v4 = Profile::lab_v4(D50.xyy(), None).unwrap();
        assert!(v2.version().is_v2());
        assert!(v4.version().is_v4());
        for profile in [v2, v4] {
            assert_eq!(profile.device_class(), ProfileClass::Abstract);
            let lut: Pipeline = profile.read_tag(TagSignature::A2B0).unwrap().unwrap();
            let out = lut.evaluate(&[0.5, 0.25, 0.75]).unwrap();
            assert!((out[0] - 0.5).abs() < 1e-6);
            assert!((out[1] - 0.25).abs() < 1e-6);
            assert!((out[2] - 0.75).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ink_limit() {
        let link = Profile::ink_limiting_device_link(ColorSpace::Cmyk, 250.0, None).unwrap();
        let lut: Pipeline = link.read_tag(TagSignature::A2B0).unwrap().unwrap();

        // Full coverage of every ink is cut to 250%
        let out = lut.evaluate(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        let total: f64 = out.iter().sum();
        assert!((total - 2.5).abs() < 1e-3, "total {}", total);
        assert!((out[3] - 1.0).abs() < 1e-6);

        // Below the limit nothing changes
        let out = lut.evaluate(&[0.5, 0.5, 0.0, 0.5]).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-3 && (out[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_ink_limit_arguments() {
        let err = Profile::ink_limiting_device_link(ColorSpace::Rgb, 200.0, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(Profile::ink_limiting_device_link(ColorSpace::Cmyk, 401.0, None).is_err());
    }

    #[test]
    fn test_gray_rejects_bad_white() {
        let curve = ToneCurve::identity();
        assert!(Profile::gray(XyY::new(0.3, 0.0, 1.0), &curve, None).is_err());
    }
}
