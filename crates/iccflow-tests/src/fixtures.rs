//! Synthesized profiles
//!
//! Each builder covers one profile model the linker handles differently:
//! matrix-shaper RGB and gray, LUT-based CMYK with a chosen set of intent
//! tables, and a named color palette.

use anyhow::{Context as _, Result};
use iccflow_core::math::ParametricCurve;
use iccflow_core::{
    ClutStage, ColorSpace, D50, D65, NamedColorList, Pipeline, Profile, ProfileClass,
    ProfileVersion, RenderingIntent, Stage, TableDirection, TagSignature, ToneCurve, XyY,
};

/// Grid points per axis of the CMYK fixture tables
pub const CMYK_GRID: usize = 9;

pub fn srgb() -> Result<Profile> {
    Profile::srgb(None).context("building sRGB")
}

/// Gray display profile with a pure gamma curve and a D50 white
pub fn gray(gamma: f64) -> Result<Profile> {
    let curve = ToneCurve::gamma(gamma, None)?;
    Profile::gray(D50.xyy(), &curve, None).context("building gray profile")
}

/// Display P3: sRGB transfer curve over P3 primaries
pub fn display_p3() -> Result<Profile> {
    let curve = ToneCurve::from_parametric(ParametricCurve::srgb(), None);
    let mut profile = Profile::rgb(
        D65.xyy(),
        [
            XyY::new(0.680, 0.320, 1.0),
            XyY::new(0.265, 0.690, 1.0),
            XyY::new(0.150, 0.060, 1.0),
        ],
        &[curve.clone(), curve.clone(), curve],
        None,
    )?;
    profile.write_tag(TagSignature::PROFILE_DESC, "Display P3")?;
    Ok(profile)
}

/// CMYK to encoded Lab by a simple subtractive model
fn cmyk_to_lab(cmyk: &[f64], out: &mut [f64]) {
    let [c, m, y, k] = [cmyk[0], cmyk[1], cmyk[2], cmyk[3]];
    out[0] = (1.0 - k) * (1.0 - 0.8 * (c + m + y) / 3.0);
    out[1] = 0.5 + 0.2 * (m - c);
    out[2] = 0.5 + 0.2 * (y - m);
}

/// Encoded Lab to CMYK; lightness only, no black generation
fn lab_to_cmyk(lab: &[f64], out: &mut [f64]) {
    let ink = ((1.0 - lab[0]) / 0.8).clamp(0.0, 1.0);
    out[..3].fill(ink);
    out[3] = 0.0;
}

/// Output-class CMYK profile with a Lab PCS
///
/// One AToB/BToA pair is written for every intent in `intents`.
pub fn cmyk_lut(intents: &[RenderingIntent]) -> Result<Profile> {
    let mut profile = Profile::new(ProfileClass::Output, ColorSpace::Cmyk, ColorSpace::Lab, None);
    profile.set_version(ProfileVersion::V4_3);
    profile.write_tag(TagSignature::PROFILE_DESC, "synthetic CMYK")?;
    profile.write_tag(TagSignature::MEDIA_WHITE, D50.xyz)?;

    let a2b = Pipeline::from_stages(
        vec![
            Stage::identity_curves(4)?,
            Stage::Clut(ClutStage::from_fn(&[CMYK_GRID; 4], 3, cmyk_to_lab)?),
        ],
        None,
    )?;
    let b2a = Pipeline::from_stages(
        vec![
            Stage::Clut(ClutStage::from_fn(&[CMYK_GRID; 3], 4, lab_to_cmyk)?),
            Stage::identity_curves(4)?,
        ],
        None,
    )?;
    for &intent in intents {
        profile.write_tag(TableDirection::Input.tag(intent), a2b.clone())?;
        profile.write_tag(TableDirection::Output.tag(intent), b2a.clone())?;
    }
    Ok(profile)
}

/// Named color profile with three CMYK spot colors
pub fn spot_colors() -> Result<Profile> {
    let mut list = NamedColorList::new(4, "Spot ", " C", None)?;
    list.append("Red", [0x8000, 0xD000, 0xB000], &[0, 65535, 65535, 0])?;
    list.append("Green", [0x9000, 0x2000, 0xB000], &[65535, 0, 65535, 0])?;
    list.append("White", [0xFF00, 0x8000, 0x8000], &[0, 0, 0, 0])?;

    let mut profile = Profile::new(ProfileClass::NamedColor, ColorSpace::Cmyk, ColorSpace::Lab, None);
    profile.set_version(ProfileVersion::V2_1);
    profile.write_tag(TagSignature::PROFILE_DESC, "spot colors")?;
    profile.write_tag(TagSignature::NAMED_COLOR, list)?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmyk_fixture_tables() {
        let p = cmyk_lut(&[RenderingIntent::Perceptual, RenderingIntent::Saturation]).unwrap();
        assert!(p.contains(TagSignature::A2B0));
        assert!(p.contains(TagSignature::B2A2));
        assert!(!p.contains(TagSignature::A2B1));
        assert!(!p.is_matrix_shaper());
    }

    #[test]
    fn test_model_maps_paper_to_white() {
        let mut out = [0.0; 3];
        cmyk_to_lab(&[0.0; 4], &mut out);
        assert_eq!(out, [1.0, 0.5, 0.5]);
        let mut ink = [1.0; 4];
        lab_to_cmyk(&out, &mut ink);
        assert_eq!(ink, [0.0; 4]);
    }
}
