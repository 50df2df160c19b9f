//! Pixel buffer layouts
//!
//! A [`PixelFormat`] says how the color channels of one pixel sit in a
//! byte buffer and how each sample maps onto the pipeline's [0, 1]
//! encoding. Samples are stored in native byte order.

use crate::icc::ColorSpace;
use crate::pipeline::{MAX_CHANNELS, MAX_ENCODEABLE_XYZ};

/// Storage type of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    U16,
    F32,
    F64,
}

impl SampleType {
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Layout of a pixel buffer
///
/// Integer samples span their full range. Float samples hold device
/// values in [0, 1], Lab as L in [0, 100] and a/b in [-128, 127], and XYZ
/// with Y = 1 for the white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub color_space: ColorSpace,
    /// Color channels fed to the pipeline
    pub channels: usize,
    /// Trailing channels such as alpha, carried through untouched
    pub extra_channels: usize,
    pub sample: SampleType,
    /// One plane per channel instead of interleaved pixels
    pub planar: bool,
    /// Color channels stored in reverse order (BGR)
    pub swap: bool,
}

impl PixelFormat {
    pub const RGB_8: Self = Self::new(ColorSpace::Rgb, SampleType::U8);
    pub const RGBA_8: Self = Self::RGB_8.with_extra_channels(1);
    pub const BGR_8: Self = Self::RGB_8.with_swap();
    pub const BGRA_8: Self = Self::RGBA_8.with_swap();
    pub const RGB_16: Self = Self::new(ColorSpace::Rgb, SampleType::U16);
    pub const RGBA_16: Self = Self::RGB_16.with_extra_channels(1);
    pub const RGB_FLT: Self = Self::new(ColorSpace::Rgb, SampleType::F32);
    pub const RGB_DBL: Self = Self::new(ColorSpace::Rgb, SampleType::F64);
    pub const GRAY_8: Self = Self::new(ColorSpace::Gray, SampleType::U8);
    pub const GRAY_16: Self = Self::new(ColorSpace::Gray, SampleType::U16);
    pub const CMYK_8: Self = Self::new(ColorSpace::Cmyk, SampleType::U8);
    pub const CMYK_16: Self = Self::new(ColorSpace::Cmyk, SampleType::U16);
    pub const LAB_16: Self = Self::new(ColorSpace::Lab, SampleType::U16);
    pub const LAB_DBL: Self = Self::new(ColorSpace::Lab, SampleType::F64);
    pub const XYZ_DBL: Self = Self::new(ColorSpace::Xyz, SampleType::F64);

    /// Interleaved format with the color space's natural channel count
    pub const fn new(color_space: ColorSpace, sample: SampleType) -> Self {
        Self {
            color_space,
            channels: color_space_channels(color_space),
            extra_channels: 0,
            sample,
            planar: false,
            swap: false,
        }
    }

    pub const fn with_extra_channels(mut self, extra: usize) -> Self {
        self.extra_channels = extra;
        self
    }

    pub const fn with_swap(mut self) -> Self {
        self.swap = true;
        self
    }

    pub const fn with_planar(mut self) -> Self {
        self.planar = true;
        self
    }

    /// Channels stored per pixel, extras included
    pub const fn total_channels(&self) -> usize {
        self.channels + self.extra_channels
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        self.total_channels() * self.sample.bytes()
    }

    /// Byte offset of channel `c` of pixel `p` in a buffer of `pixels`
    #[inline]
    pub(crate) fn offset(&self, pixel: usize, channel: usize, pixels: usize) -> usize {
        let bps = self.sample.bytes();
        if self.planar {
            (channel * pixels + pixel) * bps
        } else {
            (pixel * self.total_channels() + channel) * bps
        }
    }

    /// Storage slot of logical color channel `c`
    #[inline]
    pub(crate) fn slot(&self, c: usize) -> usize {
        if self.swap { self.channels - 1 - c } else { c }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(format!(
                "format has {} color channels, expected 1..={}",
                self.channels, MAX_CHANNELS
            ));
        }
        if self.total_channels() > MAX_CHANNELS {
            return Err(format!(
                "format has {} channels in total, at most {} are supported",
                self.total_channels(),
                MAX_CHANNELS
            ));
        }
        Ok(())
    }

    /// Read one raw sample
    #[inline]
    pub(crate) fn read_raw(&self, buf: &[u8], offset: usize) -> f64 {
        match self.sample {
            SampleType::U8 => buf[offset] as f64 / 255.0,
            SampleType::U16 => {
                bytemuck::pod_read_unaligned::<u16>(&buf[offset..offset + 2]) as f64 / 65535.0
            }
            SampleType::F32 => bytemuck::pod_read_unaligned::<f32>(&buf[offset..offset + 4]) as f64,
            SampleType::F64 => bytemuck::pod_read_unaligned::<f64>(&buf[offset..offset + 8]),
        }
    }

    /// Write one raw sample; integers are clamped and rounded
    #[inline]
    pub(crate) fn write_raw(&self, buf: &mut [u8], offset: usize, v: f64) {
        match self.sample {
            SampleType::U8 => buf[offset] = (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
            SampleType::U16 => {
                let q = (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
                buf[offset..offset + 2].copy_from_slice(bytemuck::bytes_of(&q));
            }
            SampleType::F32 => {
                let f = v as f32;
                buf[offset..offset + 4].copy_from_slice(bytemuck::bytes_of(&f));
            }
            SampleType::F64 => buf[offset..offset + 8].copy_from_slice(bytemuck::bytes_of(&v)),
        }
    }

    /// Float sample in user units to the pipeline encoding
    #[inline]
    pub(crate) fn float_to_encoded(&self, c: usize, v: f64) -> f64 {
        match self.color_space {
            ColorSpace::Lab if c == 0 => v / 100.0,
            ColorSpace::Lab => (v + 128.0) / 255.0,
            ColorSpace::Xyz => v / MAX_ENCODEABLE_XYZ,
            _ => v,
        }
    }

    #[inline]
    pub(crate) fn encoded_to_float(&self, c: usize, v: f64) -> f64 {
        match self.color_space {
            ColorSpace::Lab if c == 0 => v * 100.0,
            ColorSpace::Lab => v * 255.0 - 128.0,
            ColorSpace::Xyz => v * MAX_ENCODEABLE_XYZ,
            _ => v,
        }
    }
}

const fn color_space_channels(space: ColorSpace) -> usize {
    match space {
        ColorSpace::Gray => 1,
        ColorSpace::Color2 => 2,
        ColorSpace::Cmyk | ColorSpace::Color4 => 4,
        ColorSpace::Color5 => 5,
        ColorSpace::Color6 => 6,
        ColorSpace::Color7 => 7,
        ColorSpace::Color8 => 8,
        ColorSpace::Color9 => 9,
        ColorSpace::Color10 => 10,
        ColorSpace::Color11 => 11,
        ColorSpace::Color12 => 12,
        ColorSpace::Color13 => 13,
        ColorSpace::Color14 => 14,
        ColorSpace::Color15 => 15,
        _ => 3,
    }
}
