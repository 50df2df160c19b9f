//! Color Transform Pipeline
//!
//! A [`Pipeline`] is an ordered chain of [`Stage`]s with fixed input and
//! output channel counts. Profiles decode their lookup tables into
//! pipelines, and a compiled transform is one flat pipeline.
//!
//! # Pipeline Architecture
//!
//! Each stage reads the vector produced by the previous one:
//!
//! ```text
//! input ─► Curves ─► Matrix ─► ... ─► Clut ─► Curves ─► output
//! ```
//!
//! Stage storage is shared between clones and copied on the first
//! mutation, so handing a pipeline to several transforms is cheap.

mod bpc;
mod clut;
mod optimize;
mod stages;

pub use bpc::BpcParams;
pub use clut::{ClutStage, Interpolation, MAX_GRID_POINTS};
pub use stages::{
    MAX_CHANNELS, MAX_ENCODEABLE_XYZ, MatrixStage, Precision, Stage, decode_lab, decode_xyz,
    encode_lab, encode_xyz,
};

use std::sync::Arc;

use crate::context::{Context, report};
use crate::error::{Error, Result};
use crate::handle::{Contextual, Duplicable};

/// Ordered chain of stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    input_channels: usize,
    declared_output: usize,
    stages: Arc<Vec<Stage>>,
    precision: Precision,
    ctx: Option<Context>,
}

impl Pipeline {
    /// Empty pipeline with the given channel counts
    pub fn allocate(
        input_channels: usize,
        output_channels: usize,
        ctx: Option<&Context>,
    ) -> Result<Self> {
        for (what, n) in [("input", input_channels), ("output", output_channels)] {
            if n == 0 || n > MAX_CHANNELS {
                return Err(report(
                    ctx,
                    Error::invalid(format!(
                        "{} channel count must be in 1..={}, got {}",
                        what, MAX_CHANNELS, n
                    )),
                ));
            }
        }
        Ok(Self {
            input_channels,
            declared_output: output_channels,
            stages: Arc::new(Vec::new()),
            precision: Precision::Float,
            ctx: ctx.cloned(),
        })
    }

    /// Pipeline holding the given stages in order
    pub fn from_stages(stages: Vec<Stage>, ctx: Option<&Context>) -> Result<Self> {
        let Some(first) = stages.first() else {
            return Err(report(ctx, Error::invalid("pipeline needs at least one stage")));
        };
        let last = stages.last().map_or(first.output_channels(), Stage::output_channels);
        let mut pipeline = Self::allocate(first.input_channels(), last, ctx)?;
        for stage in stages {
            pipeline.append_stage(stage)?;
        }
        Ok(pipeline)
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Output count of the last stage, or the declared count when empty
    pub fn output_channels(&self) -> usize {
        self.stages
            .last()
            .map_or(self.declared_output, Stage::output_channels)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    fn trailing_channels(&self) -> usize {
        self.stages
            .last()
            .map_or(self.input_channels, Stage::output_channels)
    }

    /// Add a stage at the end
    pub fn append_stage(&mut self, stage: Stage) -> Result<()> {
        let expected = self.trailing_channels();
        if stage.input_channels() != expected {
            return Err(report(
                self.ctx.as_ref(),
                Error::ChannelMismatch {
                    expected,
                    actual: stage.input_channels(),
                },
            ));
        }
        Arc::make_mut(&mut self.stages).push(stage);
        Ok(())
    }

    /// Add a stage before position `index`
    pub fn insert_stage(&mut self, index: usize, stage: Stage) -> Result<()> {
        let ctx = self.ctx.as_ref();
        if index > self.stages.len() {
            return Err(report(
                ctx,
                Error::invalid(format!(
                    "stage index {} out of range for {} stages",
                    index,
                    self.stages.len()
                )),
            ));
        }
        let before = match index {
            0 => self.input_channels,
            i => self.stages[i - 1].output_channels(),
        };
        if stage.input_channels() != before {
            return Err(report(
                ctx,
                Error::ChannelMismatch {
                    expected: before,
                    actual: stage.input_channels(),
                },
            ));
        }
        if let Some(next) = self.stages.get(index) {
            if next.input_channels() != stage.output_channels() {
                return Err(report(
                    ctx,
                    Error::ChannelMismatch {
                        expected: next.input_channels(),
                        actual: stage.output_channels(),
                    },
                ));
            }
        }
        Arc::make_mut(&mut self.stages).insert(index, stage);
        Ok(())
    }

    /// Append every stage of `other`
    pub fn concat(&mut self, other: &Pipeline) -> Result<()> {
        if other.input_channels != self.trailing_channels() {
            return Err(report(
                self.ctx.as_ref(),
                Error::ChannelMismatch {
                    expected: self.trailing_channels(),
                    actual: other.input_channels,
                },
            ));
        }
        if other.is_empty() && other.declared_output != other.input_channels {
            return Err(report(
                self.ctx.as_ref(),
                Error::invalid("cannot append an empty pipeline that changes channel count"),
            ));
        }
        Arc::make_mut(&mut self.stages).extend(other.stages.iter().cloned());
        Ok(())
    }

    /// Run one vector through every stage
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut output = vec![0.0; self.output_channels()];
        self.evaluate_into(input, &mut output)?;
        Ok(output)
    }

    /// Run one vector through every stage without allocating
    pub fn evaluate_into(&self, input: &[f64], output: &mut [f64]) -> Result<()> {
        if input.len() != self.input_channels {
            return Err(report(
                self.ctx.as_ref(),
                Error::ChannelMismatch {
                    expected: self.input_channels,
                    actual: input.len(),
                },
            ));
        }
        if output.len() != self.output_channels() {
            return Err(report(
                self.ctx.as_ref(),
                Error::ChannelMismatch {
                    expected: self.output_channels(),
                    actual: output.len(),
                },
            ));
        }
        self.eval_unchecked(input, output);
        Ok(())
    }

    /// Evaluation with lengths already validated by the caller
    #[inline]
    pub(crate) fn eval_unchecked(&self, input: &[f64], output: &mut [f64]) {
        let mut front = [0.0; MAX_CHANNELS];
        let mut back = [0.0; MAX_CHANNELS];
        let (mut src, mut dst) = (&mut front, &mut back);

        let mut n = self.input_channels;
        src[..n].copy_from_slice(input);
        for stage in self.stages.iter() {
            let m = stage.output_channels();
            stage.eval(&src[..n], &mut dst[..m], self.precision);
            std::mem::swap(&mut src, &mut dst);
            n = m;
        }

        // An empty pipeline copies what it can and zero-fills the rest
        let copied = n.min(output.len());
        output[..copied].copy_from_slice(&src[..copied]);
        output[copied..].iter_mut().for_each(|o| *o = 0.0);
    }

    /// Simplify the stage list without changing its result
    ///
    /// Returns true if anything changed.
    pub fn optimize(&mut self) -> bool {
        let mut stages = (*self.stages).clone();
        let changed = optimize::optimize(&mut stages);
        if changed {
            self.stages = Arc::new(stages);
        }
        changed
    }
}

impl Duplicable for Pipeline {
    fn duplicate(&self) -> Self {
        Self {
            stages: Arc::new((*self.stages).clone()),
            ..self.clone()
        }
    }
}

impl Contextual for Pipeline {
    fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::ToneCurve;
    use crate::error::ErrorKind;

    fn identity_matrix() -> Stage {
        Stage::Matrix(
            MatrixStage::new(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0], None).unwrap(),
        )
    }

    #[test]
    fn test_allocate_limits() {
        assert!(Pipeline::allocate(0, 3, None).is_err());
        assert!(Pipeline::allocate(3, 17, None).is_err());
        assert!(Pipeline::allocate(16, 16, None).is_ok());
    }

    #[test]
    fn test_identity_matrix_pipeline() {
        let mut p = Pipeline::allocate(3, 3, None).unwrap();
        p.append_stage(identity_matrix()).unwrap();
        let out = p.evaluate(&[0.2, 0.4, 0.6]).unwrap();
        assert!((out[0] - 0.2).abs() < 1e-12);
        assert!((out[1] - 0.4).abs() < 1e-12);
        assert!((out[2] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_append_channel_mismatch() {
        let mut p = Pipeline::allocate(3, 3, None).unwrap();
        let err = p.append_stage(Stage::identity_curves(4).unwrap()).unwrap_err();
        assert_eq!(
            err,
            Error::ChannelMismatch {
                expected: 3,
                actual: 4
            }
        );
        assert_eq!(p.stage_count(), 0);
    }

    #[test]
    fn test_trailing_count_follows_stages() {
        let mut p = Pipeline::allocate(3, 3, None).unwrap();
        p.append_stage(Stage::Matrix(MatrixStage::new(1, 3, &[1.0; 3], None).unwrap()))
            .unwrap();
        assert_eq!(p.output_channels(), 1);
        assert!(p.append_stage(identity_matrix()).is_err());
        p.append_stage(Stage::identity_curves(1).unwrap()).unwrap();
    }

    #[test]
    fn test_insert_checks_neighbours() {
        let mut p = Pipeline::allocate(3, 3, None).unwrap();
        p.append_stage(identity_matrix()).unwrap();
        p.append_stage(Stage::Clamp(3)).unwrap();
        assert!(p.insert_stage(1, Stage::identity_curves(3).unwrap()).is_ok());
        assert!(p.insert_stage(1, Stage::Matrix(MatrixStage::new(1, 3, &[1.0; 3], None).unwrap())).is_err());
        assert!(p.insert_stage(9, Stage::Clamp(3)).is_err());
        assert_eq!(p.stage_count(), 3);
    }

    #[test]
    fn test_empty_pipeline_copies() {
        let p = Pipeline::allocate(3, 4, None).unwrap();
        assert_eq!(p.evaluate(&[0.1, 0.2, 0.3]).unwrap(), vec![0.1, 0.2, 0.3, 0.0]);
    }

    #[test]
    fn test_evaluate_checks_lengths() {
        let p = Pipeline::allocate(3, 3, None).unwrap();
        assert_eq!(
            p.evaluate(&[0.0; 2]).unwrap_err().kind(),
            ErrorKind::ChannelMismatch
        );
        let mut out = [0.0; 4];
        assert!(p.evaluate_into(&[0.0; 3], &mut out).is_err());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut original = Pipeline::allocate(3, 3, None).unwrap();
        original.append_stage(identity_matrix()).unwrap();
        let mut copy = original.duplicate();
        copy.append_stage(Stage::Clamp(3)).unwrap();
        assert_eq!(original.stage_count(), 1);
        assert_eq!(copy.stage_count(), 2);
    }

    #[test]
    fn test_clone_is_copy_on_write() {
        let mut a = Pipeline::allocate(1, 1, None).unwrap();
        a.append_stage(Stage::Curves(vec![ToneCurve::gamma(2.0, None).unwrap()]))
            .unwrap();
        let b = a.clone();
        a.append_stage(Stage::Clamp(1)).unwrap();
        assert_eq!(b.stage_count(), 1);
        assert!((b.evaluate(&[0.5]).unwrap()[0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_from_stages() {
        let p = Pipeline::from_stages(
            vec![
                Stage::identity_curves(3).unwrap(),
                Stage::Matrix(MatrixStage::new(1, 3, &[1.0 / 3.0; 3], None).unwrap()),
            ],
            None,
        )
        .unwrap();
        assert_eq!((p.input_channels(), p.output_channels()), (3, 1));
        assert!((p.evaluate(&[0.3, 0.6, 0.9]).unwrap()[0] - 0.6).abs() < 1e-12);
        assert!(Pipeline::from_stages(Vec::new(), None).is_err());
    }

    #[test]
    fn test_concat() {
        let mut a = Pipeline::from_stages(vec![identity_matrix()], None).unwrap();
        let b = Pipeline::from_stages(vec![Stage::Clamp(3)], None).unwrap();
        a.concat(&b).unwrap();
        assert_eq!(a.stage_count(), 2);
        assert_eq!(a.evaluate(&[1.5, 0.5, -1.0]).unwrap(), vec![1.0, 0.5, 0.0]);
    }
}
