//! Accuracy measurement
//!
//! Integer buffers are compared channel by channel. Lab results are
//! compared with CIEDE2000, which tracks perceived difference far better
//! than a per-channel error.

use anyhow::{Result, ensure};
use iccflow_core::Lab;

/// Statistics from a deltaE comparison
#[derive(Debug, Clone)]
pub struct DeltaEStats {
    pub mean: f64,
    pub max: f64,
    /// 95th percentile
    pub p95: f64,
    pub count: usize,
}

impl DeltaEStats {
    /// Every difference is below the visibility threshold (deltaE < 1.0)
    pub fn is_excellent(&self) -> bool {
        self.max < 1.0
    }

    /// Barely perceptible (deltaE < 2.0)
    pub fn is_good(&self) -> bool {
        self.max < 2.0
    }

    /// Summarize a list of differences
    pub fn from_samples(mut samples: Vec<f64>) -> Self {
        samples.sort_by(f64::total_cmp);
        let count = samples.len();
        let mean = if count == 0 {
            0.0
        } else {
            samples.iter().sum::<f64>() / count as f64
        };
        let p95 = samples
            .get((count as f64 * 0.95) as usize)
            .or(samples.last())
            .copied()
            .unwrap_or(0.0);
        Self {
            mean,
            max: samples.last().copied().unwrap_or(0.0),
            p95,
            count,
        }
    }
}

/// CIEDE2000 difference between two Lab colors
pub fn delta_e_2000(lab1: Lab, lab2: Lab) -> f64 {
    const POW25_7: f64 = 6_103_515_625.0;

    let c_avg = (lab1.a.hypot(lab1.b) + lab2.a.hypot(lab2.b)) / 2.0;
    let g = 0.5 * (1.0 - (c_avg.powi(7) / (c_avg.powi(7) + POW25_7)).sqrt());

    let prime = |lab: Lab| {
        let a = lab.a * (1.0 + g);
        let c = a.hypot(lab.b);
        let h = if a == 0.0 && lab.b == 0.0 {
            0.0
        } else {
            lab.b.atan2(a).to_degrees().rem_euclid(360.0)
        };
        (c, h)
    };
    let (c1, h1) = prime(lab1);
    let (c2, h2) = prime(lab2);

    let dl = lab2.l - lab1.l;
    let dc = c2 - c1;
    let dh = if c1 * c2 == 0.0 {
        0.0
    } else {
        let d = h2 - h1;
        if d > 180.0 {
            d - 360.0
        } else if d < -180.0 {
            d + 360.0
        } else {
            d
        }
    };
    let big_dh = 2.0 * (c1 * c2).sqrt() * (dh.to_radians() / 2.0).sin();

    let l_avg = (lab1.l + lab2.l) / 2.0;
    let c_avg_p = (c1 + c2) / 2.0;
    let h_avg = if c1 * c2 == 0.0 {
        h1 + h2
    } else if (h1 - h2).abs() <= 180.0 {
        (h1 + h2) / 2.0
    } else if h1 + h2 < 360.0 {
        (h1 + h2 + 360.0) / 2.0
    } else {
        (h1 + h2 - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_avg - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_avg).to_radians().cos()
        + 0.32 * (3.0 * h_avg + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_avg - 63.0).to_radians().cos();

    let l50 = (l_avg - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l50 / (20.0 + l50).sqrt();
    let s_c = 1.0 + 0.045 * c_avg_p;
    let s_h = 1.0 + 0.015 * c_avg_p * t;

    let theta = 30.0 * (-((h_avg - 275.0) / 25.0).powi(2)).exp();
    let r_c = 2.0 * (c_avg_p.powi(7) / (c_avg_p.powi(7) + POW25_7)).sqrt();
    let r_t = -r_c * (2.0 * theta).to_radians().sin();

    let (tl, tc, th) = (dl / s_l, dc / s_c, big_dh / s_h);
    (tl * tl + tc * tc + th * th + r_t * tc * th).sqrt()
}

/// Pairwise CIEDE2000 over two Lab lists
pub fn compare_lab(reference: &[Lab], result: &[Lab]) -> Result<DeltaEStats> {
    ensure!(
        reference.len() == result.len(),
        "lab lists differ in length: {} vs {}",
        reference.len(),
        result.len()
    );
    let samples = reference
        .iter()
        .zip(result)
        .map(|(a, b)| delta_e_2000(*a, *b))
        .collect();
    Ok(DeltaEStats::from_samples(samples))
}

/// Decode an interleaved buffer of f64 Lab triples
pub fn lab_from_bytes(bytes: &[u8]) -> Vec<Lab> {
    bytes
        .chunks_exact(24)
        .map(|px| {
            let v = |i: usize| {
                let mut b = [0u8; 8];
                b.copy_from_slice(&px[i * 8..i * 8 + 8]);
                f64::from_ne_bytes(b)
            };
            Lab::new(v(0), v(1), v(2))
        })
        .collect()
}

/// Largest absolute difference between two byte buffers
pub fn max_channel_diff(a: &[u8], b: &[u8]) -> Result<u8> {
    ensure!(a.len() == b.len(), "buffers differ in length: {} vs {}", a.len(), b.len());
    Ok(a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).max().unwrap_or(0))
}
