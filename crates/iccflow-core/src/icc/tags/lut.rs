//! LUT Tag Types
//!
//! LUT (Look-Up Table) tags define complex color transformations.
//! Each one decodes straight into a [`Pipeline`].
//!
//! Types:
//! - mft1 (Lut8Type): 8-bit precision LUT
//! - mft2 (Lut16Type): 16-bit precision LUT
//! - mAB (lutAToBType): v4 A-to-B transform
//! - mBA (lutBToAType): v4 B-to-A transform
//!
//! Element offsets in mAB/mBA are relative to the start of the tag.
//!
//! See ICC.1:2022 Sections 10.10-10.13

use crate::context::Context;
use crate::curve::ToneCurve;
use crate::error::{Error, Result};
use crate::icc::types::Reader;
use crate::math::Matrix3x3;
use crate::pipeline::{ClutStage, MAX_CHANNELS, MatrixStage, Pipeline, Stage};

use super::curves::parse_curve_at;
use super::malformed;

/// Channel counts shared by every lut type
fn channels(r: &mut Reader<'_>) -> Result<(usize, usize)> {
    let input = r.u8()? as usize;
    let output = r.u8()? as usize;
    for n in [input, output] {
        if n == 0 || n > MAX_CHANNELS {
            return Err(Error::corrupt(format!("lut channel count {} out of range", n)));
        }
    }
    Ok((input, output))
}

fn grid_points(n: usize) -> Result<usize> {
    if n < 2 {
        return Err(Error::corrupt(format!("lut grid of {} points", n)));
    }
    Ok(n)
}

/// The e00..e22 matrix of mft1/mft2, if it is not the identity
fn lut_matrix(r: &mut Reader<'_>, inputs: usize) -> Result<Option<Stage>> {
    let values = (0..9).map(|_| r.s15f16()).collect::<std::result::Result<Vec<_>, _>>()?;
    let m = Matrix3x3::from_row_major(&values)
        .ok_or_else(|| Error::corrupt("lut matrix needs 9 values"))?;
    if inputs != 3 || m.is_identity(1e-6) {
        return Ok(None);
    }
    Ok(Some(Stage::Matrix(MatrixStage::from_matrix3(&m, None))))
}

fn table_curves<F>(
    r: &mut Reader<'_>,
    count: usize,
    entries: usize,
    mut read: F,
    ctx: Option<&Context>,
) -> Result<Stage>
where
    F: FnMut(&mut Reader<'_>) -> Result<f64>,
{
    let mut curves = Vec::with_capacity(count);
    for _ in 0..count {
        let table = (0..entries).map(|_| read(r)).collect::<Result<Vec<_>>>()?;
        curves.push(ToneCurve::from_table(&table, ctx).map_err(malformed("lut curve"))?);
    }
    Stage::curves(curves).map_err(malformed("lut curves"))
}

fn clut_node_count(grid: &[usize], outputs: usize) -> Result<usize> {
    grid.iter()
        .try_fold(outputs, |acc, &p| acc.checked_mul(p))
        .ok_or_else(|| Error::corrupt("lut grid too large"))
}

/// Parse 'mft1'
pub fn parse_lut8(data: &[u8], ctx: Option<&Context>) -> Result<Pipeline> {
    let mut r = Reader::at(data, 8, "mft1")?;
    let (inputs, outputs) = channels(&mut r)?;
    let grid = vec![grid_points(r.u8()? as usize)?; inputs];
    r.skip(1)?;

    let mut pipeline = Pipeline::allocate(inputs, outputs, ctx).map_err(malformed("lut"))?;
    if let Some(m) = lut_matrix(&mut r, inputs)? {
        pipeline.append_stage(m)?;
    }

    let u8_value = |r: &mut Reader<'_>| -> Result<f64> { Ok(r.u8()? as f64 / 255.0) };
    pipeline.append_stage(table_curves(&mut r, inputs, 256, u8_value, ctx)?)?;

    let nodes = clut_node_count(&grid, outputs)?;
    let table = r.bytes(nodes)?.iter().map(|&v| v as f64 / 255.0).collect();
    pipeline.append_stage(Stage::Clut(ClutStage::new(&grid, outputs, table).map_err(malformed("lut clut"))?))?;

    pipeline.append_stage(table_curves(&mut r, outputs, 256, u8_value, ctx)?)?;
    Ok(pipeline)
}

/// Parse 'mft2'
///
/// Lab data keeps the legacy 16-bit encoding; callers that know the
/// table's PCS side add the v2 to v4 correction.
pub fn parse_lut16(data: &[u8], ctx: Option<&Context>) -> Result<Pipeline> {
    let mut r = Reader::at(data, 8, "mft2")?;
    let (inputs, outputs) = channels(&mut r)?;
    let grid = vec![grid_points(r.u8()? as usize)?; inputs];
    r.skip(1)?;

    let mut pipeline = Pipeline::allocate(inputs, outputs, ctx).map_err(malformed("lut"))?;
    if let Some(m) = lut_matrix(&mut r, inputs)? {
        pipeline.append_stage(m)?;
    }

    let input_entries = r.u16()? as usize;
    let output_entries = r.u16()? as usize;
    for n in [input_entries, output_entries] {
        if !(2..=4096).contains(&n) {
            return Err(Error::corrupt(format!("mft2 curve of {} entries", n)));
        }
    }

    let u16_value = |r: &mut Reader<'_>| -> Result<f64> { Ok(r.u16()? as f64 / 65535.0) };
    pipeline.append_stage(table_curves(&mut r, inputs, input_entries, u16_value, ctx)?)?;

    let nodes = clut_node_count(&grid, outputs)?;
    let raw = r.bytes(nodes.checked_mul(2).ok_or_else(|| Error::corrupt("mft2 clut too large"))?)?;
    let table = raw
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]) as f64 / 65535.0)
        .collect();
    pipeline.append_stage(Stage::Clut(ClutStage::new(&grid, outputs, table).map_err(malformed("lut clut"))?))?;

    pipeline.append_stage(table_curves(&mut r, outputs, output_entries, u16_value, ctx)?)?;
    Ok(pipeline)
}

/// Which lutAToB/lutBToA layout is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutDirection {
    /// mAB: A curves, CLUT, M curves, matrix, B curves
    AToB,
    /// mBA: B curves, matrix, M curves, CLUT, A curves
    BToA,
}

/// Parse 'mAB ' or 'mBA '
pub fn parse_lut_ab(data: &[u8], direction: LutDirection, ctx: Option<&Context>) -> Result<Pipeline> {
    let mut r = Reader::at(data, 8, "lutAB")?;
    let (inputs, outputs) = channels(&mut r)?;
    r.skip(2)?;
    let off_b = r.u32()? as usize;
    let off_matrix = r.u32()? as usize;
    let off_m = r.u32()? as usize;
    let off_clut = r.u32()? as usize;
    let off_a = r.u32()? as usize;

    let curves_at = |offset: usize, count: usize| -> Result<Option<Stage>> {
        if offset == 0 {
            return Ok(None);
        }
        parse_curve_list(data, offset, count, ctx).map(Some)
    };
    let matrix_at = |offset: usize| -> Result<Option<Stage>> {
        if offset == 0 {
            return Ok(None);
        }
        parse_ab_matrix(data, offset).map(Some)
    };
    let clut_at = |offset: usize| -> Result<Option<Stage>> {
        if offset == 0 {
            return Ok(None);
        }
        parse_ab_clut(data, offset, inputs, outputs).map(Some)
    };

    // The matrix and M curves sit on the 3-channel PCS side
    let pcs_side = match direction {
        LutDirection::AToB => outputs,
        LutDirection::BToA => inputs,
    };
    if (off_matrix != 0 || off_m != 0) && pcs_side != 3 {
        return Err(Error::corrupt(format!(
            "lut matrix on a {}-channel side",
            pcs_side
        )));
    }

    let order = match direction {
        LutDirection::AToB => [
            curves_at(off_a, inputs)?,
            clut_at(off_clut)?,
            curves_at(off_m, outputs)?,
            matrix_at(off_matrix)?,
            curves_at(off_b, outputs)?,
        ],
        LutDirection::BToA => [
            curves_at(off_b, inputs)?,
            matrix_at(off_matrix)?,
            curves_at(off_m, inputs)?,
            clut_at(off_clut)?,
            curves_at(off_a, outputs)?,
        ],
    };

    let mut pipeline = Pipeline::allocate(inputs, outputs, ctx).map_err(malformed("lut"))?;
    for stage in order.into_iter().flatten() {
        pipeline
            .append_stage(stage)
            .map_err(|e| Error::corrupt(format!("lut elements do not chain: {}", e)))?;
    }
    if pipeline.output_channels() != outputs {
        return Err(Error::corrupt(format!(
            "lut elements produce {} channels, header says {}",
            pipeline.output_channels(),
            outputs
        )));
    }
    Ok(pipeline)
}

/// Consecutive curv/para curves, each padded to 4 bytes
fn parse_curve_list(
    data: &[u8],
    offset: usize,
    count: usize,
    ctx: Option<&Context>,
) -> Result<Stage> {
    let mut curves = Vec::with_capacity(count);
    let mut pos = offset;
    for _ in 0..count {
        let (curve, len) = parse_curve_at(data, pos, ctx)?;
        curves.push(curve);
        pos += (len + 3) & !3;
    }
    Stage::curves(curves).map_err(malformed("lutAB curves"))
}

/// 3×3 matrix followed by a 3-element offset
fn parse_ab_matrix(data: &[u8], offset: usize) -> Result<Stage> {
    let mut r = Reader::at(data, offset, "lutAB matrix")?;
    let values = (0..12).map(|_| r.s15f16()).collect::<std::result::Result<Vec<_>, _>>()?;
    MatrixStage::new(3, 3, &values[..9], Some(&values[9..]))
        .map(Stage::Matrix)
        .map_err(malformed("lutAB matrix"))
}

fn parse_ab_clut(data: &[u8], offset: usize, inputs: usize, outputs: usize) -> Result<Stage> {
    let mut r = Reader::at(data, offset, "lutAB clut")?;
    let dims = r.bytes(16)?;
    let grid = dims[..inputs]
        .iter()
        .map(|&p| grid_points(p as usize))
        .collect::<Result<Vec<_>>>()?;
    let precision = r.u8()?;
    r.skip(3)?;

    let nodes = clut_node_count(&grid, outputs)?;
    let table: Vec<f64> = match precision {
        1 => r.bytes(nodes)?.iter().map(|&v| v as f64 / 255.0).collect(),
        2 => r
            .bytes(nodes.checked_mul(2).ok_or_else(|| Error::corrupt("lutAB clut too large"))?)?
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]) as f64 / 65535.0)
            .collect(),
        other => {
            return Err(Error::corrupt(format!("lutAB clut precision {}", other)));
        }
    };
    Ok(Stage::Clut(ClutStage::new(&grid, outputs, table).map_err(malformed("lut clut"))?))
}
