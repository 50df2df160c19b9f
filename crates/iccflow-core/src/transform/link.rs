//! Profile chain linking
//!
//! Turns an ordered list of profiles into one pipeline. Each profile is
//! used in the device-to-PCS direction when the chain currently carries
//! device values and PCS-to-device otherwise. Device links and abstract
//! profiles are applied as they are. Between two profiles the chain is
//! brought into the next profile's PCS, with the rendering-intent
//! adjustments applied in XYZ.

use crate::color::{D50, Xyz};
use crate::context::{Context, report};
use crate::curve::ToneCurve;
use crate::error::{Error, Result};
use crate::icc::{ColorSpace, ProfileClass, RenderingIntent, TagSignature, TypeSignature};
use crate::math::Matrix3x3;
use crate::named_color::NamedColorList;
use crate::pipeline::{
    BpcParams, ClutStage, MAX_ENCODEABLE_XYZ, MatrixStage, Pipeline, Stage, decode_lab,
    decode_xyz,
};
use crate::profile::{Profile, TableDirection};

use super::TransformFlags;

/// Legacy 16-bit Lab encodes L = 100 at 0xFF00
const LAB_V2_TO_V4: f64 = 65535.0 / 65280.0;

/// Inversion resolution for shaper curves
const INVERSE_CURVE_POINTS: usize = 4096;

/// Result of linking a profile chain
#[derive(Debug)]
pub(crate) struct LinkedChain {
    pub pipeline: Pipeline,
    /// Color space of the chain input; `None` for a named color index
    pub entry: Option<ColorSpace>,
    pub exit: ColorSpace,
}

/// Link `profiles` in order
pub(crate) fn link_profiles(
    profiles: &[&Profile],
    intent: RenderingIntent,
    flags: &TransformFlags,
    ctx: Option<&Context>,
) -> Result<LinkedChain> {
    let Some(first) = profiles.first() else {
        return Err(report(ctx, Error::invalid("a transform needs at least one profile")));
    };

    let named_source = first.device_class() == ProfileClass::NamedColor;
    let (mut current, mut chain) = if named_source {
        (first.connection_space(), named_color_input(first, ctx)?)
    } else {
        let space = first.color_space();
        (space, Pipeline::allocate(space.channels(), space.channels(), ctx)?)
    };

    for (i, profile) in profiles.iter().enumerate() {
        let class = profile.device_class();
        if class == ProfileClass::NamedColor {
            if i == 0 {
                continue;
            }
            return Err(report(
                ctx,
                Error::IncompatibleColorSpace(
                    "a named color profile can only start a chain".to_string(),
                ),
            ));
        }

        let is_link = matches!(class, ProfileClass::DeviceLink | ProfileClass::Abstract);
        let is_input = if i == 0 && !is_link {
            true
        } else {
            !current.is_pcs()
        };
        let (space_in, space_out) = if is_input || is_link {
            (profile.color_space(), profile.connection_space())
        } else {
            (profile.connection_space(), profile.color_space())
        };

        if !spaces_compatible(space_in, current) {
            return Err(report(
                ctx,
                Error::IncompatibleColorSpace(format!(
                    "profile {} expects {:?} but the chain carries {:?}",
                    i, space_in, current
                )),
            ));
        }

        if is_link {
            let adjust = if class == ProfileClass::Abstract && i > 0 {
                pcs_adjustment(profiles[i - 1], profile, intent, flags)?
            } else {
                None
            };
            connect_pcs(&mut chain, current, space_in, adjust, ctx)?;
            chain.concat(&device_link_lut(profile, intent, flags.strict_intent)?)?;
        } else if is_input {
            chain.concat(&input_lut(profile, intent, flags.strict_intent)?)?;
        } else {
            let adjust = pcs_adjustment(profiles[i - 1], profile, intent, flags)?;
            connect_pcs(&mut chain, current, space_in, adjust, ctx)?;
            chain.concat(&output_lut(profile, intent, flags.strict_intent)?)?;
        }
        current = space_out;
    }

    if chain.output_channels() != current.channels() {
        return Err(report(
            ctx,
            Error::ChannelMismatch {
                expected: current.channels(),
                actual: chain.output_channels(),
            },
        ));
    }

    Ok(LinkedChain {
        pipeline: chain,
        entry: (!named_source).then(|| first.color_space()),
        exit: current,
    })
}

fn is_generic(space: ColorSpace) -> bool {
    use ColorSpace::*;
    matches!(
        space,
        Color2 | Color3 | Color4 | Color5 | Color6 | Color7 | Color8 | Color9 | Color10 | Color11
            | Color12 | Color13 | Color14 | Color15
    )
}

/// Equal spaces, XYZ against Lab, or an N-color space against any space
/// with N channels
pub(crate) fn spaces_compatible(a: ColorSpace, b: ColorSpace) -> bool {
    a == b
        || (a.is_pcs() && b.is_pcs())
        || ((is_generic(a) || is_generic(b)) && a.channels() == b.channels())
}

/// Bring the chain from PCS `from` into PCS `to`, applying `adjust` in XYZ
fn connect_pcs(
    chain: &mut Pipeline,
    from: ColorSpace,
    to: ColorSpace,
    adjust: Option<Stage>,
    ctx: Option<&Context>,
) -> Result<()> {
    match (from, to) {
        (ColorSpace::Xyz, ColorSpace::Xyz) => {
            if let Some(stage) = adjust {
                chain.append_stage(stage)?;
            }
        }
        (ColorSpace::Xyz, ColorSpace::Lab) => {
            if let Some(stage) = adjust {
                chain.append_stage(stage)?;
            }
            chain.append_stage(Stage::XyzToLab)?;
        }
        (ColorSpace::Lab, ColorSpace::Xyz) => {
            chain.append_stage(Stage::LabToXyz)?;
            if let Some(stage) = adjust {
                chain.append_stage(stage)?;
            }
        }
        (ColorSpace::Lab, ColorSpace::Lab) => {
            if let Some(stage) = adjust {
                chain.append_stage(Stage::LabToXyz)?;
                chain.append_stage(stage)?;
                chain.append_stage(Stage::XyzToLab)?;
            }
        }
        (a, b) if spaces_compatible(a, b) => {}
        (a, b) => {
            return Err(report(
                ctx,
                Error::IncompatibleColorSpace(format!("cannot connect {:?} to {:?}", a, b)),
            ));
        }
    }
    Ok(())
}

/// The XYZ stage placed between `prev` and `next` for `intent`
fn pcs_adjustment(
    prev: &Profile,
    next: &Profile,
    intent: RenderingIntent,
    flags: &TransformFlags,
) -> Result<Option<Stage>> {
    match intent {
        RenderingIntent::AbsoluteColorimetric => {
            let w_in = prev.media_white_point();
            let w_out = next.media_white_point();
            if w_out.x <= 0.0 || w_out.y <= 0.0 || w_out.z <= 0.0 {
                return Err(next.invalid("media white point has a non-positive component"));
            }
            let m = Matrix3x3::diagonal(w_in.x / w_out.x, w_in.y / w_out.y, w_in.z / w_out.z);
            Ok((!m.is_identity(1e-9)).then(|| Stage::Matrix(MatrixStage::from_matrix3(&m, None))))
        }
        RenderingIntent::Perceptual | RenderingIntent::RelativeColorimetric
            if flags.black_point_compensation =>
        {
            let src = black_point(prev, intent);
            let dst = black_point(next, intent);
            Ok(BpcParams::calculate(src, dst).map(|bpc| bpc.to_stage()))
        }
        _ => Ok(None),
    }
}

/// Black point of a profile in XYZ
///
/// The 'bkpt' tag wins. Otherwise the device-to-PCS table is evaluated at
/// device black. Profiles with neither give zero.
pub(crate) fn black_point(profile: &Profile, intent: RenderingIntent) -> Xyz {
    if let Some(bp) = profile.media_black_point() {
        return bp;
    }
    if !matches!(
        profile.device_class(),
        ProfileClass::Input | ProfileClass::Display | ProfileClass::Output | ProfileClass::ColorSpace
    ) {
        return Xyz::default();
    }
    let Ok(lut) = input_lut(profile, intent, false) else {
        return Xyz::default();
    };

    let ink = matches!(profile.color_space(), ColorSpace::Cmyk | ColorSpace::Cmy);
    let device_black = vec![if ink { 1.0 } else { 0.0 }; lut.input_channels()];
    match lut.evaluate(&device_black) {
        Ok(pcs) if pcs.len() == 3 => match profile.connection_space() {
            ColorSpace::Lab => decode_lab(&pcs).to_xyz(),
            _ => decode_xyz(&pcs),
        },
        _ => Xyz::default(),
    }
}

/// Tag to read for `intent`, or `None` to use the matrix-shaper model
fn select_table(
    profile: &Profile,
    direction: TableDirection,
    intent: RenderingIntent,
    strict: bool,
) -> Result<Option<TagSignature>> {
    let wanted = direction.tag(intent);
    if profile.contains(wanted) {
        return Ok(Some(wanted));
    }
    let fallback = direction.tag(RenderingIntent::Perceptual);
    if !strict && profile.contains(fallback) {
        return Ok(Some(fallback));
    }
    if profile.is_matrix_shaper() {
        return Ok(None);
    }
    Err(report(profile.ctx(), Error::UnsupportedIntent(intent)))
}

fn read_lut(profile: &Profile, sig: TagSignature) -> Result<Pipeline> {
    profile.read_tag::<Pipeline>(sig)?.ok_or_else(|| {
        report(
            profile.ctx(),
            Error::corrupt(format!("tag '{}' does not hold a lookup table", sig)),
        )
    })
}

fn is_lut16(profile: &Profile, sig: TagSignature) -> bool {
    profile.tag_type(sig) == Some(TypeSignature::LUT16)
}

fn lab_rescale(k: f64) -> Stage {
    Stage::Matrix(MatrixStage::from_matrix3(&Matrix3x3::diagonal(k, k, k), None))
}

fn read_curve(profile: &Profile, sig: TagSignature) -> Result<ToneCurve> {
    profile
        .read_tag::<ToneCurve>(sig)?
        .ok_or_else(|| report(profile.ctx(), Error::UnknownTag(sig)))
}

fn read_colorant(profile: &Profile, sig: TagSignature) -> Result<Xyz> {
    profile
        .read_tag::<Xyz>(sig)?
        .ok_or_else(|| report(profile.ctx(), Error::UnknownTag(sig)))
}

fn rgb_trcs(profile: &Profile) -> Result<Vec<ToneCurve>> {
    [TagSignature::RED_TRC, TagSignature::GREEN_TRC, TagSignature::BLUE_TRC]
        .into_iter()
        .map(|sig| read_curve(profile, sig))
        .collect()
}

fn colorant_matrix(profile: &Profile) -> Result<Matrix3x3> {
    let r = read_colorant(profile, TagSignature::RED_COLORANT)?;
    let g = read_colorant(profile, TagSignature::GREEN_COLORANT)?;
    let b = read_colorant(profile, TagSignature::BLUE_COLORANT)?;
    Ok(Matrix3x3::from_columns(r.to_array(), g.to_array(), b.to_array()))
}

/// Device to PCS
pub(crate) fn input_lut(profile: &Profile, intent: RenderingIntent, strict: bool) -> Result<Pipeline> {
    let ctx = profile.ctx();
    if let Some(sig) = select_table(profile, TableDirection::Input, intent, strict)? {
        let mut lut = read_lut(profile, sig)?;
        if profile.connection_space() == ColorSpace::Lab && is_lut16(profile, sig) {
            lut.append_stage(lab_rescale(LAB_V2_TO_V4))?;
        }
        return Ok(lut);
    }

    let lab = profile.connection_space() == ColorSpace::Lab;
    let stages = match profile.color_space() {
        ColorSpace::Gray => {
            let trc = read_curve(profile, TagSignature::GRAY_TRC)?;
            let to_pcs = if lab {
                MatrixStage::new(3, 1, &[1.0, 0.0, 0.0], Some(&[0.0, 128.0 / 255.0, 128.0 / 255.0][..]))?
            } else {
                let d50 = D50.xyz;
                MatrixStage::new(
                    3,
                    1,
                    &[
                        d50.x / MAX_ENCODEABLE_XYZ,
                        d50.y / MAX_ENCODEABLE_XYZ,
                        d50.z / MAX_ENCODEABLE_XYZ,
                    ],
                    None,
                )?
            };
            vec![Stage::curves(vec![trc])?, Stage::Matrix(to_pcs)]
        }
        _ => {
            let m = colorant_matrix(profile)?.scale(1.0 / MAX_ENCODEABLE_XYZ);
            let mut stages = vec![
                Stage::curves(rgb_trcs(profile)?)?,
                Stage::Matrix(MatrixStage::from_matrix3(&m, None)),
            ];
            if lab {
                stages.push(Stage::XyzToLab);
            }
            stages
        }
    };
    Pipeline::from_stages(stages, ctx)
}

/// PCS to device
pub(crate) fn output_lut(profile: &Profile, intent: RenderingIntent, strict: bool) -> Result<Pipeline> {
    let ctx = profile.ctx();
    if let Some(sig) = select_table(profile, TableDirection::Output, intent, strict)? {
        let mut lut = read_lut(profile, sig)?;
        if profile.connection_space() == ColorSpace::Lab && is_lut16(profile, sig) {
            lut.insert_stage(0, lab_rescale(1.0 / LAB_V2_TO_V4))?;
        }
        return Ok(lut);
    }

    let lab = profile.connection_space() == ColorSpace::Lab;
    let stages = match profile.color_space() {
        ColorSpace::Gray => {
            let trc = read_curve(profile, TagSignature::GRAY_TRC)?;
            let pick = if lab {
                [1.0, 0.0, 0.0]
            } else {
                [0.0, MAX_ENCODEABLE_XYZ / D50.xyz.y, 0.0]
            };
            vec![
                Stage::Matrix(MatrixStage::new(1, 3, &pick, None)?),
                Stage::curves(vec![trc.invert(INVERSE_CURVE_POINTS)?])?,
            ]
        }
        _ => {
            let m = colorant_matrix(profile)?;
            let inv = m.inverse().ok_or_else(|| {
                report(
                    ctx,
                    Error::NotInvertible("colorant matrix is singular".to_string()),
                )
            })?;
            let inverse_trcs = rgb_trcs(profile)?
                .iter()
                .map(|c| c.invert(INVERSE_CURVE_POINTS))
                .collect::<Result<Vec<_>>>()?;
            let mut stages = Vec::with_capacity(3);
            if lab {
                stages.push(Stage::LabToXyz);
            }
            stages.push(Stage::Matrix(MatrixStage::from_matrix3(
                &inv.scale(MAX_ENCODEABLE_XYZ),
                None,
            )));
            stages.push(Stage::curves(inverse_trcs)?);
            stages
        }
    };
    Pipeline::from_stages(stages, ctx)
}

/// AToB table of a device link or abstract profile
pub(crate) fn device_link_lut(
    profile: &Profile,
    intent: RenderingIntent,
    strict: bool,
) -> Result<Pipeline> {
    let Some(sig) = select_table(profile, TableDirection::Input, intent, strict)? else {
        return Err(report(profile.ctx(), Error::UnsupportedIntent(intent)));
    };
    let mut lut = read_lut(profile, sig)?;
    if is_lut16(profile, sig) {
        if profile.color_space() == ColorSpace::Lab {
            lut.insert_stage(0, lab_rescale(1.0 / LAB_V2_TO_V4))?;
        }
        if profile.connection_space() == ColorSpace::Lab {
            lut.append_stage(lab_rescale(LAB_V2_TO_V4))?;
        }
    }
    Ok(lut)
}

/// Named color index to PCS
///
/// The single input channel carries the color index as a 16-bit sample:
/// index `i` is the encoded value `i / 65535`.
fn named_color_input(profile: &Profile, ctx: Option<&Context>) -> Result<Pipeline> {
    let list = profile
        .read_tag::<NamedColorList>(TagSignature::NAMED_COLOR)?
        .ok_or_else(|| report(ctx, Error::UnknownTag(TagSignature::NAMED_COLOR)))?;
    if list.is_empty() {
        return Err(report(ctx, Error::invalid("named color list is empty")));
    }

    let scale = match profile.connection_space() {
        ColorSpace::Lab => 1.0 / 65280.0,
        _ => 1.0 / 65535.0,
    };
    let points = list.len().max(2);
    let mut table = Vec::with_capacity(points * 3);
    for i in 0..points {
        let Some(color) = list.get(i.min(list.len() - 1)) else {
            return Err(report(ctx, Error::invalid("named color index out of range")));
        };
        table.extend(color.pcs.iter().map(|&v| (v as f64 * scale).min(1.0)));
    }

    let spread = MatrixStage::new(1, 1, &[65535.0 / (points - 1) as f64], None)?;
    let clut = ClutStage::new(&[points], 3, table)?;
    Pipeline::from_stages(vec![Stage::Matrix(spread), Stage::Clut(clut)], ctx)
}
