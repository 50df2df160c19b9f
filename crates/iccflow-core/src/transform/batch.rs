//! Per-pixel transform loops
//!
//! Both loops are compiled for several target feature sets and the best
//! one is picked at run time. Callers validate buffer lengths first.

use multiversion::multiversion;

use super::format::{PixelFormat, SampleType};
use crate::pipeline::{MAX_CHANNELS, Pipeline};

/// Transform `pixels` pixels between any two layouts
#[multiversion(targets("x86_64+avx2", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn transform_pixels(
    pipeline: &Pipeline,
    input: &PixelFormat,
    output: &PixelFormat,
    src: &[u8],
    dst: &mut [u8],
    pixels: usize,
) {
    let float_in = input.sample.is_float();
    let float_out = output.sample.is_float();
    let mut vin = [0.0f64; MAX_CHANNELS];
    let mut vout = [0.0f64; MAX_CHANNELS];
    let n_in = input.channels;
    let n_out = output.channels;

    for p in 0..pixels {
        for (c, v) in vin[..n_in].iter_mut().enumerate() {
            let raw = input.read_raw(src, input.offset(p, input.slot(c), pixels));
            *v = if float_in { input.float_to_encoded(c, raw) } else { raw };
        }

        pipeline.eval_unchecked(&vin[..n_in], &mut vout[..n_out]);

        for (c, &v) in vout[..n_out].iter().enumerate() {
            let v = if float_out { output.encoded_to_float(c, v) } else { v };
            output.write_raw(dst, output.offset(p, output.slot(c), pixels), v);
        }

        // Extras keep their position after the color channels
        for e in 0..output.extra_channels {
            let v = if e < input.extra_channels {
                input.read_raw(src, input.offset(p, n_in + e, pixels))
            } else {
                1.0
            };
            output.write_raw(dst, output.offset(p, n_out + e, pixels), v);
        }
    }
}

/// True when both layouts are plain interleaved 8-bit RGB
pub(crate) fn is_rgb8_pair(input: &PixelFormat, output: &PixelFormat) -> bool {
    [input, output].iter().all(|f| {
        f.sample == SampleType::U8
            && f.channels == 3
            && f.extra_channels == 0
            && !f.planar
            && !f.swap
    })
}

/// Interleaved RGB8 to RGB8
#[multiversion(targets("x86_64+avx2", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn transform_rgb8(pipeline: &Pipeline, src: &[u8], dst: &mut [u8]) {
    let mut out = [0.0f64; 3];
    for (src_chunk, dst_chunk) in src.chunks_exact(3).zip(dst.chunks_exact_mut(3)) {
        let rgb = [
            src_chunk[0] as f64 / 255.0,
            src_chunk[1] as f64 / 255.0,
            src_chunk[2] as f64 / 255.0,
        ];

        pipeline.eval_unchecked(&rgb, &mut out);

        dst_chunk[0] = (out[0].clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        dst_chunk[1] = (out[1].clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        dst_chunk[2] = (out[2].clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    }
}
