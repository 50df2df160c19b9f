//! Color Transforms
//!
//! A [`ColorTransform`] links a chain of profiles into one optimized
//! [`Pipeline`] at construction and then only evaluates it. It holds no
//! interior mutability, so one transform can serve any number of threads
//! as long as each call gets its own buffers.
//!
//! ```no_run
//! use iccflow_core::{ColorTransform, PixelFormat, Profile, RenderingIntent, TransformFlags};
//!
//! let srgb = Profile::srgb(None).unwrap();
//! let to_gray = Profile::gray(iccflow_core::D50.xyy(), &iccflow_core::ToneCurve::gamma(2.2, None).unwrap(), None).unwrap();
//! let t = ColorTransform::compile(
//!     &srgb,
//!     PixelFormat::RGB_8,
//!     &to_gray,
//!     PixelFormat::GRAY_8,
//!     RenderingIntent::Perceptual,
//!     TransformFlags::new(),
//!     None,
//! )
//! .unwrap();
//! let gray = t.transform(&[255, 128, 0]).unwrap();
//! ```

mod batch;
mod format;
mod link;

pub use format::{PixelFormat, SampleType};

use tracing::debug;

use crate::context::{Context, report};
use crate::error::{Error, Result};
use crate::handle::Contextual;
use crate::icc::{ColorSpace, RenderingIntent, TagSignature};
use crate::named_color::NamedColorList;
use crate::pipeline::{Pipeline, Precision, Stage};
use crate::profile::Profile;

/// Transform flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformFlags {
    /// Map the source black point onto the destination black point
    pub black_point_compensation: bool,
    /// Float matrix arithmetic even for integer pixel formats
    pub high_resolution: bool,
    /// Keep the linked pipeline exactly as built
    pub no_optimize: bool,
    /// Clamp output to the encodable range, also for float formats
    pub clamp_output: bool,
    /// Fail instead of falling back to the perceptual table
    pub strict_intent: bool,
}

impl TransformFlags {
    /// Create default flags (clamping enabled)
    pub fn new() -> Self {
        Self {
            clamp_output: true,
            ..Default::default()
        }
    }

    /// Enable black point compensation
    pub fn with_bpc(mut self) -> Self {
        self.black_point_compensation = true;
        self
    }

    pub fn with_high_resolution(mut self) -> Self {
        self.high_resolution = true;
        self
    }

    pub fn with_no_optimize(mut self) -> Self {
        self.no_optimize = true;
        self
    }

    pub fn with_strict_intent(mut self) -> Self {
        self.strict_intent = true;
        self
    }

    /// Let float outputs leave the [0, 1] range
    pub fn without_clamp(mut self) -> Self {
        self.clamp_output = false;
        self
    }
}

/// A compiled, immutable pixel transform
#[derive(Debug, Clone)]
pub struct ColorTransform {
    pipeline: Pipeline,
    input: PixelFormat,
    output: PixelFormat,
    intent: RenderingIntent,
    flags: TransformFlags,
    named_colors: Option<NamedColorList>,
    ctx: Option<Context>,
}

impl ColorTransform {
    /// Transform from `src` to `dst`
    pub fn compile(
        src: &Profile,
        src_fmt: PixelFormat,
        dst: &Profile,
        dst_fmt: PixelFormat,
        intent: RenderingIntent,
        flags: TransformFlags,
        ctx: Option<&Context>,
    ) -> Result<Self> {
        Self::compile_multiprofile(&[src, dst], src_fmt, dst_fmt, intent, flags, ctx)
    }

    /// Transform applying a single device link or abstract profile
    pub fn compile_device_link(
        link: &Profile,
        src_fmt: PixelFormat,
        dst_fmt: PixelFormat,
        intent: RenderingIntent,
        flags: TransformFlags,
        ctx: Option<&Context>,
    ) -> Result<Self> {
        Self::compile_multiprofile(&[link], src_fmt, dst_fmt, intent, flags, ctx)
    }

    /// Transform through every profile of `profiles` in order
    pub fn compile_multiprofile(
        profiles: &[&Profile],
        src_fmt: PixelFormat,
        dst_fmt: PixelFormat,
        intent: RenderingIntent,
        flags: TransformFlags,
        ctx: Option<&Context>,
    ) -> Result<Self> {
        for fmt in [&src_fmt, &dst_fmt] {
            fmt.validate()
                .map_err(|msg| report(ctx, Error::InvalidParameter(msg)))?;
        }

        let chain = link::link_profiles(profiles, intent, &flags, ctx)?;
        check_format("source", &src_fmt, chain.entry, chain.pipeline.input_channels(), ctx)?;
        check_format("destination", &dst_fmt, Some(chain.exit), chain.pipeline.output_channels(), ctx)?;

        let mut pipeline = chain.pipeline;
        let linked_stages = pipeline.stage_count();
        if !flags.no_optimize {
            pipeline.optimize();
        }
        if flags.clamp_output {
            pipeline.append_stage(Stage::Clamp(dst_fmt.channels))?;
        }
        let float_io = src_fmt.sample.is_float() || dst_fmt.sample.is_float();
        pipeline.set_precision(if flags.high_resolution || float_io {
            Precision::Float
        } else {
            Precision::Fixed16
        });

        let named_colors = match profiles.first() {
            Some(first) => first.read_tag::<NamedColorList>(TagSignature::NAMED_COLOR)?,
            None => None,
        };

        debug!(
            profiles = profiles.len(),
            linked = linked_stages,
            stages = pipeline.stage_count(),
            ?intent,
            ?flags,
            "compiled color transform"
        );

        Ok(Self {
            pipeline,
            input: src_fmt,
            output: dst_fmt,
            intent,
            flags,
            named_colors,
            ctx: ctx.cloned(),
        })
    }

    pub fn input_format(&self) -> PixelFormat {
        self.input
    }

    pub fn output_format(&self) -> PixelFormat {
        self.output
    }

    pub fn intent(&self) -> RenderingIntent {
        self.intent
    }

    pub fn flags(&self) -> TransformFlags {
        self.flags
    }

    /// The compiled pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The source profile's named color list, if it has one
    pub fn named_color_list(&self) -> Option<&NamedColorList> {
        self.named_colors.as_ref()
    }

    /// Number of whole pixels in `src`
    fn pixel_count(&self, src: &[u8]) -> Result<usize> {
        let bpp = self.input.bytes_per_pixel();
        if src.len() % bpp != 0 {
            return Err(report(
                self.ctx.as_ref(),
                Error::invalid(format!(
                    "input length {} is not a multiple of the {}-byte pixel size",
                    src.len(),
                    bpp
                )),
            ));
        }
        Ok(src.len() / bpp)
    }

    /// Transform a whole buffer into a new one
    pub fn transform(&self, src: &[u8]) -> Result<Vec<u8>> {
        let pixels = self.pixel_count(src)?;
        let mut dst = vec![0u8; pixels * self.output.bytes_per_pixel()];
        self.run(src, &mut dst, pixels);
        Ok(dst)
    }

    /// Transform into a caller-provided buffer
    ///
    /// `dst` must hold exactly as many pixels as `src`. Nothing is written
    /// when either length is wrong.
    pub fn transform_into(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        let pixels = self.pixel_count(src)?;
        let needed = pixels * self.output.bytes_per_pixel();
        if dst.len() != needed {
            return Err(report(
                self.ctx.as_ref(),
                Error::invalid(format!(
                    "output length {} does not match the {} bytes needed for {} pixels",
                    dst.len(),
                    needed,
                    pixels
                )),
            ));
        }
        self.run(src, dst, pixels);
        Ok(())
    }

    fn run(&self, src: &[u8], dst: &mut [u8], pixels: usize) {
        if batch::is_rgb8_pair(&self.input, &self.output) {
            batch::transform_rgb8(&self.pipeline, src, dst);
        } else {
            batch::transform_pixels(&self.pipeline, &self.input, &self.output, src, dst, pixels);
        }
    }
}

impl Contextual for ColorTransform {
    fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }
}

fn check_format(
    which: &str,
    fmt: &PixelFormat,
    space: Option<ColorSpace>,
    channels: usize,
    ctx: Option<&Context>,
) -> Result<()> {
    if fmt.channels != channels {
        return Err(report(
            ctx,
            Error::IncompatibleColorSpace(format!(
                "{} format has {} channels, the profiles need {}",
                which, fmt.channels, channels
            )),
        ));
    }
    if let Some(space) = space {
        if !link::spaces_compatible(fmt.color_space, space) {
            return Err(report(
                ctx,
                Error::IncompatibleColorSpace(format!(
                    "{} format is {:?}, the profiles need {:?}",
                    which, fmt.color_space, space
                )),
            ));
        }
    }
    Ok(())
}
