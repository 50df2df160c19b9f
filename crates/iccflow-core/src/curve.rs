//! Tone curves
//!
//! A [`ToneCurve`] is a one-dimensional transfer function: either a
//! parametric family with closed-form evaluation or an ordered table of
//! `(input, output)` samples evaluated by linear interpolation.
//!
//! Parametric type ids follow the common CMS numbering: `1..=5` are the
//! ICC parametric function types 0 through 4, negative ids select the
//! inverse of the same family. Other ids are resolved through the
//! [`Context`] plugin chain.

use std::fmt;
use std::sync::Arc;

use crate::context::{Context, ParametricCurvePlugin, report};
use crate::error::{Error, Result};
use crate::handle::{Contextual, Duplicable};
use crate::math::{ParametricCurve, ParametricCurveType};

/// Maximum distance from the identity line for a curve to count as linear
pub const LINEAR_EPSILON: f64 = 15.0 / 65535.0;

/// Sampled curves this close to `y = x` are exact identities
const IDENTITY_EPSILON: f64 = 1e-12;

/// Sample count used when a curve has to be tabulated
pub const DEFAULT_TABLE_SIZE: usize = 4096;

/// The representation behind a [`ToneCurve`]
#[derive(Clone)]
pub enum CurveKind {
    /// Built-in ICC parametric family
    Parametric(ParametricCurve),
    /// Samples ordered by strictly increasing input
    Sampled(Vec<(f64, f64)>),
    /// Parametric family provided by a context plugin
    Plugin {
        type_id: i32,
        params: Vec<f64>,
        plugin: Arc<dyn ParametricCurvePlugin>,
    },
}

impl fmt::Debug for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parametric(p) => f.debug_tuple("Parametric").field(p).finish(),
            Self::Sampled(s) => f.debug_struct("Sampled").field("len", &s.len()).finish(),
            Self::Plugin {
                type_id, params, ..
            } => f
                .debug_struct("Plugin")
                .field("type_id", type_id)
                .field("params", params)
                .finish(),
        }
    }
}

/// One-dimensional transfer function
///
/// Immutable after construction. Clones own their sample storage.
#[derive(Clone, Debug)]
pub struct ToneCurve {
    kind: CurveKind,
    ctx: Option<Context>,
}

impl ToneCurve {
    /// Power-law curve `y = x^gamma`
    pub fn gamma(gamma: f64, ctx: Option<&Context>) -> Result<Self> {
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(report(
                ctx,
                Error::invalid(format!("gamma must be positive, got {}", gamma)),
            ));
        }
        Ok(Self::with_kind(
            CurveKind::Parametric(ParametricCurve::gamma(gamma)),
            ctx,
        ))
    }

    /// Parametric curve by type id
    ///
    /// Ids `±1..=±5` are built in; anything else is looked up in the
    /// context's plugins.
    pub fn parametric(type_id: i32, params: &[f64], ctx: Option<&Context>) -> Result<Self> {
        if params.iter().any(|p| !p.is_finite()) {
            return Err(report(
                ctx,
                Error::invalid("parametric curve parameters must be finite"),
            ));
        }

        let builtin = u16::try_from(type_id.unsigned_abs().wrapping_sub(1))
            .ok()
            .and_then(ParametricCurveType::from_icc);
        if let Some(family) = builtin {
            let Some(curve) = ParametricCurve::from_params(family, params) else {
                return Err(report(
                    ctx,
                    Error::invalid(format!(
                        "curve type {} takes {} parameters, got {}",
                        type_id,
                        family.param_count(),
                        params.len()
                    )),
                ));
            };
            let curve = if type_id < 0 { curve.inverse() } else { curve };
            return Ok(Self::with_kind(CurveKind::Parametric(curve), ctx));
        }

        let Some(plugin) = ctx.and_then(|c| c.curve_plugin(type_id)) else {
            return Err(report(
                ctx,
                Error::invalid(format!("unknown parametric curve type {}", type_id)),
            ));
        };
        let expected = plugin.param_count(type_id);
        if params.len() < expected {
            return Err(report(
                ctx,
                Error::invalid(format!(
                    "curve type {} takes {} parameters, got {}",
                    type_id,
                    expected,
                    params.len()
                )),
            ));
        }
        Ok(Self::with_kind(
            CurveKind::Plugin {
                type_id,
                params: params[..expected].to_vec(),
                plugin,
            },
            ctx,
        ))
    }

    /// Wrap an already-validated parametric curve
    pub fn from_parametric(curve: ParametricCurve, ctx: Option<&Context>) -> Self {
        Self::with_kind(CurveKind::Parametric(curve), ctx)
    }

    /// Curve through explicit `(input, output)` samples
    ///
    /// Inputs must be strictly increasing and outputs non-decreasing.
    pub fn from_samples(samples: &[(f64, f64)], ctx: Option<&Context>) -> Result<Self> {
        if samples.len() < 2 {
            return Err(report(
                ctx,
                Error::invalid(format!(
                    "a sampled curve needs at least 2 samples, got {}",
                    samples.len()
                )),
            ));
        }
        if samples.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(report(ctx, Error::invalid("curve samples must be finite")));
        }
        if let Some(i) = samples.windows(2).position(|w| w[1].0 <= w[0].0) {
            return Err(report(
                ctx,
                Error::invalid(format!("sample inputs not increasing at index {}", i + 1)),
            ));
        }
        if let Some(i) = samples.windows(2).position(|w| w[1].1 < w[0].1) {
            return Err(report(
                ctx,
                Error::invalid(format!("sample outputs decrease at index {}", i + 1)),
            ));
        }
        Ok(Self::with_kind(CurveKind::Sampled(samples.to_vec()), ctx))
    }

    /// Curve through 16-bit `(input, output)` samples
    pub fn from_samples_u16(samples: &[(u16, u16)], ctx: Option<&Context>) -> Result<Self> {
        let scaled: Vec<(f64, f64)> = samples
            .iter()
            .map(|&(x, y)| (x as f64 / 65535.0, y as f64 / 65535.0))
            .collect();
        Self::from_samples(&scaled, ctx)
    }

    /// Curve from a table uniformly spaced over [0, 1]
    ///
    /// Tables read from profiles may be non-monotonic, so only the length
    /// is checked.
    pub fn from_table(table: &[f64], ctx: Option<&Context>) -> Result<Self> {
        if table.len() < 2 {
            return Err(report(
                ctx,
                Error::invalid(format!(
                    "a curve table needs at least 2 entries, got {}",
                    table.len()
                )),
            ));
        }
        let step = (table.len() - 1) as f64;
        let samples = table
            .iter()
            .enumerate()
            .map(|(i, &y)| (i as f64 / step, y))
            .collect();
        Ok(Self::with_kind(CurveKind::Sampled(samples), ctx))
    }

    /// Curve from a 16-bit table uniformly spaced over [0, 1]
    pub fn from_table_u16(table: &[u16], ctx: Option<&Context>) -> Result<Self> {
        let scaled: Vec<f64> = table.iter().map(|&v| v as f64 / 65535.0).collect();
        Self::from_table(&scaled, ctx)
    }

    /// Curve through points with strictly increasing inputs and any outputs
    pub(crate) fn from_points(points: Vec<(f64, f64)>, ctx: Option<&Context>) -> Result<Self> {
        let valid = points.len() >= 2
            && points.iter().all(|(x, y)| x.is_finite() && y.is_finite())
            && points.windows(2).all(|w| w[1].0 > w[0].0);
        if !valid {
            return Err(Error::corrupt("curve points must be finite and increasing"));
        }
        Ok(Self::with_kind(CurveKind::Sampled(points), ctx))
    }

    /// The identity curve
    pub fn identity() -> Self {
        Self::with_kind(CurveKind::Parametric(ParametricCurve::gamma(1.0)), None)
    }

    fn with_kind(kind: CurveKind, ctx: Option<&Context>) -> Self {
        Self {
            kind,
            ctx: ctx.cloned(),
        }
    }

    pub fn kind(&self) -> &CurveKind {
        &self.kind
    }

    /// Parametric type id, if this curve is parametric
    pub fn type_id(&self) -> Option<i32> {
        match &self.kind {
            CurveKind::Parametric(p) => {
                let id = p.curve_type.to_icc() as i32 + 1;
                Some(if p.inverted { -id } else { id })
            }
            CurveKind::Plugin { type_id, .. } => Some(*type_id),
            CurveKind::Sampled(_) => None,
        }
    }

    /// Input range evaluated without clamping
    pub fn domain(&self) -> (f64, f64) {
        match &self.kind {
            CurveKind::Sampled(s) => (s[0].0, s[s.len() - 1].0),
            _ => (0.0, 1.0),
        }
    }

    /// Evaluate at `x`, clamping `x` to the domain
    pub fn evaluate(&self, x: f64) -> f64 {
        match &self.kind {
            CurveKind::Parametric(p) => p.eval(x),
            CurveKind::Plugin {
                type_id,
                params,
                plugin,
            } => plugin.evaluate(*type_id, params, x.clamp(0.0, 1.0)),
            CurveKind::Sampled(samples) => eval_sampled(samples, x),
        }
    }

    /// Tabulate over the domain at `points` uniformly spaced inputs
    pub fn to_table(&self, points: usize) -> Vec<f64> {
        let (lo, hi) = self.domain();
        let step = (points.max(2) - 1) as f64;
        (0..points.max(2))
            .map(|i| self.evaluate(lo + (hi - lo) * i as f64 / step))
            .collect()
    }

    /// Outputs of a sampled curve whose inputs are uniform over [0, 1]
    pub fn uniform_table(&self) -> Option<Vec<f64>> {
        let CurveKind::Sampled(samples) = &self.kind else {
            return None;
        };
        let step = (samples.len() - 1) as f64;
        let uniform = samples
            .iter()
            .enumerate()
            .all(|(i, (x, _))| (x - i as f64 / step).abs() < 1e-9);
        uniform.then(|| samples.iter().map(|(_, y)| *y).collect())
    }

    /// True if the curve never changes direction
    pub fn is_monotonic(&self) -> bool {
        let probe;
        let outputs: &[f64] = match &self.kind {
            CurveKind::Sampled(samples) => {
                probe = samples.iter().map(|(_, y)| *y).collect::<Vec<_>>();
                &probe
            }
            _ => {
                probe = self.to_table(DEFAULT_TABLE_SIZE);
                &probe
            }
        };
        let rising = outputs.windows(2).all(|w| w[1] >= w[0]);
        let falling = outputs.windows(2).all(|w| w[1] <= w[0]);
        rising || falling
    }

    /// True if every point lies within [`LINEAR_EPSILON`] of `y = x`
    pub fn is_linear(&self) -> bool {
        match &self.kind {
            CurveKind::Parametric(p) if p.curve_type == ParametricCurveType::Gamma => {
                (p.g - 1.0).abs() < 1e-6
            }
            CurveKind::Sampled(samples) => samples
                .iter()
                .all(|(x, y)| (x - y).abs() <= LINEAR_EPSILON),
            _ => (0..=255).all(|i| {
                let x = i as f64 / 255.0;
                (self.evaluate(x) - x).abs() <= LINEAR_EPSILON
            }),
        }
    }

    /// True only for an exact `y = x` curve
    ///
    /// Stricter than [`Self::is_linear`]; a curve that passes this can be
    /// replaced by the identity without changing any output.
    pub fn is_identity(&self) -> bool {
        match &self.kind {
            CurveKind::Parametric(p) => p.curve_type == ParametricCurveType::Gamma && p.g == 1.0,
            CurveKind::Sampled(samples) => samples
                .iter()
                .all(|(x, y)| (x - y).abs() <= IDENTITY_EPSILON),
            CurveKind::Plugin { .. } => false,
        }
    }

    /// Least-squares style estimate of the equivalent power-law exponent
    ///
    /// Returns None for curves that cannot be described by a gamma, such
    /// as flat or decreasing ones.
    pub fn estimate_gamma(&self, precision: f64) -> Option<f64> {
        let mut sum = 0.0;
        let mut sum2 = 0.0;
        let mut n = 0.0;
        for i in 1..255 {
            let x = i as f64 / 255.0;
            let y = self.evaluate(x);
            if y > 0.0 && y < 1.0 && x > 0.07 {
                let g = y.ln() / x.ln();
                sum += g;
                sum2 += g * g;
                n += 1.0;
            }
        }
        if n < 1.0 {
            return None;
        }
        let mean = sum / n;
        let std_dev = ((n * sum2 - sum * sum) / (n * (n - 1.0).max(1.0))).max(0.0).sqrt();
        (std_dev <= precision).then_some(mean)
    }

    /// Approximate inverse
    ///
    /// Built-in parametric curves invert in closed form. Every other curve
    /// is tabulated at `precision` points and its axes swapped.
    pub fn invert(&self, precision: usize) -> Result<Self> {
        let ctx = self.ctx.as_ref();
        if !self.is_monotonic() {
            return Err(report(
                ctx,
                Error::NotInvertible("curve is not monotonic".to_string()),
            ));
        }
        if let CurveKind::Parametric(p) = &self.kind {
            return Ok(Self::with_kind(CurveKind::Parametric(p.inverse()), ctx));
        }
        if precision < 2 {
            return Err(report(
                ctx,
                Error::invalid(format!("inversion needs at least 2 points, got {}", precision)),
            ));
        }

        let (lo, hi) = self.domain();
        let step = (precision - 1) as f64;
        let mut swapped: Vec<(f64, f64)> = (0..precision)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / step;
                (self.evaluate(x), x)
            })
            .collect();
        swapped.sort_by(|a, b| a.0.total_cmp(&b.0));
        // Flat stretches map back to their lowest input
        swapped.dedup_by(|later, earlier| later.0 <= earlier.0);

        if swapped.len() < 2 {
            return Err(report(
                ctx,
                Error::NotInvertible("curve is constant".to_string()),
            ));
        }
        Ok(Self::with_kind(CurveKind::Sampled(swapped), ctx))
    }

    /// `other ∘ self` tabulated at `points` inputs over this curve's domain
    pub fn join(&self, other: &ToneCurve, points: usize) -> Result<Self> {
        let ctx = self.ctx.as_ref();
        if points < 2 {
            return Err(report(
                ctx,
                Error::invalid(format!("join needs at least 2 points, got {}", points)),
            ));
        }
        let (lo, hi) = self.domain();
        let step = (points - 1) as f64;
        let samples = (0..points)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / step;
                (x, other.evaluate(self.evaluate(x)))
            })
            .collect();
        Ok(Self::with_kind(CurveKind::Sampled(samples), ctx))
    }
}

fn eval_sampled(samples: &[(f64, f64)], x: f64) -> f64 {
    let (lo, hi) = (samples[0].0, samples[samples.len() - 1].0);
    let x = if x.is_nan() { lo } else { x.clamp(lo, hi) };

    // First sample with input > x, so the segment is [i-1, i]
    let i = samples.partition_point(|(sx, _)| *sx <= x);
    if i == 0 {
        return samples[0].1;
    }
    if i >= samples.len() {
        return samples[samples.len() - 1].1;
    }
    let (x0, y0) = samples[i - 1];
    let (x1, y1) = samples[i];
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}

impl Duplicable for ToneCurve {
    fn duplicate(&self) -> Self {
        self.clone()
    }
}

impl Contextual for ToneCurve {
    fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }
}
