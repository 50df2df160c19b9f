//! Parametric transfer functions
//!
//! The five ICC parametric curve families (ICC.1:2022 Section 10.18) with
//! closed-form forward and inverse evaluation.

/// ICC Parametric Curve Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParametricCurveType {
    /// Type 0: Y = X^g
    Gamma,
    /// Type 1: Y = (aX + b)^g  if X >= -b/a, else 0
    CIE122,
    /// Type 2: Y = (aX + b)^g + c  if X >= -b/a, else c
    IEC61966_3,
    /// Type 3: Y = (aX + b)^g  if X >= d, else cX (sRGB-like)
    IEC61966_2_1,
    /// Type 4: Y = (aX + b)^g + e  if X >= d, else cX + f
    Full,
}

impl ParametricCurveType {
    /// Get the function type from its ICC value
    pub fn from_icc(function_type: u16) -> Option<Self> {
        match function_type {
            0 => Some(Self::Gamma),
            1 => Some(Self::CIE122),
            2 => Some(Self::IEC61966_3),
            3 => Some(Self::IEC61966_2_1),
            4 => Some(Self::Full),
            _ => None,
        }
    }

    pub fn to_icc(self) -> u16 {
        match self {
            Self::Gamma => 0,
            Self::CIE122 => 1,
            Self::IEC61966_3 => 2,
            Self::IEC61966_2_1 => 3,
            Self::Full => 4,
        }
    }

    /// Get the number of parameters required
    pub fn param_count(&self) -> usize {
        match self {
            Self::Gamma => 1,
            Self::CIE122 => 3,
            Self::IEC61966_3 => 4,
            Self::IEC61966_2_1 => 5,
            Self::Full => 7,
        }
    }
}

/// ICC Parametric Curve
///
/// `inverted` selects the closed-form inverse of the named family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParametricCurve {
    pub curve_type: ParametricCurveType,
    pub g: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub inverted: bool,
}

impl ParametricCurve {
    /// Create a simple gamma curve (type 0)
    pub fn gamma(g: f64) -> Self {
        Self {
            curve_type: ParametricCurveType::Gamma,
            g,
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
            inverted: false,
        }
    }

    /// The sRGB decoding function (type 3)
    pub fn srgb() -> Self {
        Self {
            curve_type: ParametricCurveType::IEC61966_2_1,
            g: 2.4,
            a: 1.0 / 1.055,
            b: 0.055 / 1.055,
            c: 1.0 / 12.92,
            d: 0.04045,
            e: 0.0,
            f: 0.0,
            inverted: false,
        }
    }

    /// Create from ICC parameters, in the order g, a, b, c, d, e, f
    pub fn from_params(curve_type: ParametricCurveType, params: &[f64]) -> Option<Self> {
        if params.len() < curve_type.param_count() {
            return None;
        }
        let p = |i: usize, default: f64| {
            if i < curve_type.param_count() {
                params[i]
            } else {
                default
            }
        };

        Some(Self {
            curve_type,
            g: p(0, 1.0),
            a: p(1, 1.0),
            b: p(2, 0.0),
            c: p(3, 0.0),
            d: p(4, 0.0),
            e: p(5, 0.0),
            f: p(6, 0.0),
            inverted: false,
        })
    }

    /// The ICC parameter list for this curve's family
    pub fn params(&self) -> Vec<f64> {
        let all = [self.g, self.a, self.b, self.c, self.d, self.e, self.f];
        all[..self.curve_type.param_count()].to_vec()
    }

    /// Same family, opposite direction
    pub fn inverse(&self) -> Self {
        Self {
            inverted: !self.inverted,
            ..*self
        }
    }

    /// Evaluate in the stored direction
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        if self.inverted {
            parametric_curve_eval_inverse(self, x)
        } else {
            parametric_curve_eval(self, x)
        }
    }
}

#[inline]
fn safe_pow(base: f64, exp: f64) -> f64 {
    if base <= 0.0 { 0.0 } else { base.powf(exp) }
}

/// Evaluate a parametric curve forward (encoded → linear)
#[inline]
pub fn parametric_curve_eval(curve: &ParametricCurve, x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);

    match curve.curve_type {
        ParametricCurveType::Gamma => safe_pow(x, curve.g),
        ParametricCurveType::CIE122 => {
            if curve.a.abs() > 1e-10 && x >= -curve.b / curve.a {
                safe_pow(curve.a * x + curve.b, curve.g)
            } else {
                0.0
            }
        }
        ParametricCurveType::IEC61966_3 => {
            if curve.a.abs() > 1e-10 && x >= -curve.b / curve.a {
                safe_pow(curve.a * x + curve.b, curve.g) + curve.c
            } else {
                curve.c
            }
        }
        ParametricCurveType::IEC61966_2_1 => {
            if x >= curve.d {
                safe_pow(curve.a * x + curve.b, curve.g)
            } else {
                curve.c * x
            }
        }
        ParametricCurveType::Full => {
            if x >= curve.d {
                safe_pow(curve.a * x + curve.b, curve.g) + curve.e
            } else {
                curve.c * x + curve.f
            }
        }
    }
}

/// Evaluate the closed-form inverse of a parametric curve (linear → encoded)
#[inline]
pub fn parametric_curve_eval_inverse(curve: &ParametricCurve, y: f64) -> f64 {
    let y = y.clamp(0.0, 1.0);
    let inv_g = if curve.g.abs() > 1e-10 { 1.0 / curve.g } else { 1.0 };
    let solve_power = |v: f64| {
        if curve.a.abs() > 1e-10 {
            (safe_pow(v, inv_g) - curve.b) / curve.a
        } else {
            0.0
        }
    };

    let x = match curve.curve_type {
        ParametricCurveType::Gamma => safe_pow(y, inv_g),
        ParametricCurveType::CIE122 => solve_power(y),
        ParametricCurveType::IEC61966_3 => {
            if y >= curve.c {
                solve_power(y - curve.c)
            } else {
                solve_power(0.0)
            }
        }
        ParametricCurveType::IEC61966_2_1 => {
            let knee = safe_pow(curve.a * curve.d + curve.b, curve.g);
            if y >= knee {
                solve_power(y)
            } else if curve.c.abs() > 1e-10 {
                y / curve.c
            } else {
                0.0
            }
        }
        ParametricCurveType::Full => {
            let knee = safe_pow(curve.a * curve.d + curve.b, curve.g) + curve.e;
            if y >= knee {
                solve_power(y - curve.e)
            } else if curve.c.abs() > 1e-10 {
                (y - curve.f) / curve.c
            } else {
                0.0
            }
        }
    };
    x.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn srgb_reference(encoded: f64) -> f64 {
        if encoded <= 0.04045 {
            encoded / 12.92
        } else {
            ((encoded + 0.055) / 1.055).powf(2.4)
        }
    }

    #[test]
    fn test_parametric_type0() {
        let curve = ParametricCurve::gamma(2.2);
        let y = parametric_curve_eval(&curve, 0.5);
        assert!((y - 0.5_f64.powf(2.2)).abs() < EPSILON);
    }

    #[test]
    fn test_parametric_srgb() {
        let curve = ParametricCurve::srgb();
        for i in 0..=255 {
            let x = i as f64 / 255.0;
            let parametric = parametric_curve_eval(&curve, x);
            assert!(
                (parametric - srgb_reference(x)).abs() < 1e-9,
                "sRGB parametric mismatch at {}",
                i
            );
        }
    }

    #[test]
    fn test_inverse_roundtrip_all_families() {
        let curves = [
            ParametricCurve::gamma(1.8),
            ParametricCurve::from_params(ParametricCurveType::CIE122, &[2.2, 1.1, -0.1]).unwrap(),
            ParametricCurve::from_params(ParametricCurveType::IEC61966_3, &[2.2, 1.0, 0.0, 0.01])
                .unwrap(),
            ParametricCurve::srgb(),
            ParametricCurve::from_params(
                ParametricCurveType::Full,
                &[2.4, 0.9, 0.1, 0.08, 0.05, 0.01, 0.002],
            )
            .unwrap(),
        ];

        for curve in curves {
            let inverse = curve.inverse();
            for i in 2..=98 {
                let x = i as f64 / 100.0;
                let y = curve.eval(x);
                let back = inverse.eval(y);
                // Flat segments are not recoverable
                if curve.eval(x - 1e-6) == y {
                    continue;
                }
                assert!(
                    (back - x).abs() < 1e-6,
                    "{:?}: {} -> {} -> {}",
                    curve.curve_type,
                    x,
                    y,
                    back
                );
            }
        }
    }

    #[test]
    fn test_params_order() {
        let curve = ParametricCurve::srgb();
        let params = curve.params();
        assert_eq!(params.len(), 5);
        assert_eq!(params[0], 2.4);
        let rebuilt = ParametricCurve::from_params(curve.curve_type, &params).unwrap();
        assert_eq!(rebuilt, curve);
        assert!(ParametricCurve::from_params(ParametricCurveType::Full, &params).is_none());
    }

    #[test]
    fn test_param_count() {
        assert_eq!(ParametricCurveType::Gamma.param_count(), 1);
        assert_eq!(ParametricCurveType::CIE122.param_count(), 3);
        assert_eq!(ParametricCurveType::IEC61966_3.param_count(), 4);
        assert_eq!(ParametricCurveType::IEC61966_2_1.param_count(), 5);
        assert_eq!(ParametricCurveType::Full.param_count(), 7);
    }
}
