//! Test pattern generation
//!
//! Buffers are deterministic for a given pattern and size, so failures
//! reproduce exactly.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Test pattern types
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// Gray ramp from black to white
    Ramp,
    /// RGB color cube corners (8 colors)
    ColorCube,
    /// Hue ramp at full saturation
    HueRamp,
    /// Random pixels with seed
    Random(u64),
    /// Saturated colors near gamut boundary
    GamutBoundary,
    Black,
    White,
}

/// Interleaved 8-bit buffer of `pixels` pixels with `channels` samples
///
/// Patterns that are defined on RGB repeat their first channel for gray
/// and fill the fourth and later channels from the same sequence.
pub fn generate_pattern(pattern: TestPattern, pixels: usize, channels: usize) -> Vec<u8> {
    let mut data = vec![0u8; pixels * channels];
    if channels == 0 {
        return data;
    }

    match pattern {
        TestPattern::Ramp => {
            let span = pixels.saturating_sub(1).max(1) as f64;
            for (i, px) in data.chunks_exact_mut(channels).enumerate() {
                px.fill((i as f64 / span * 255.0).round() as u8);
            }
        }
        TestPattern::ColorCube => {
            for (i, px) in data.chunks_exact_mut(channels).enumerate() {
                let corner = i % (1 << channels.min(8));
                for (c, v) in px.iter_mut().enumerate() {
                    *v = if corner >> (c % 8) & 1 == 1 { 255 } else { 0 };
                }
            }
        }
        TestPattern::HueRamp => {
            for (i, px) in data.chunks_exact_mut(channels).enumerate() {
                let hue = i as f32 / pixels as f32 * 360.0;
                let rgb = hsl_to_rgb(hue, 1.0, 0.5);
                for (c, v) in px.iter_mut().enumerate() {
                    *v = rgb[c % 3];
                }
            }
        }
        TestPattern::Random(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.fill_bytes(&mut data);
        }
        TestPattern::GamutBoundary => {
            const COLORS: [[u8; 3]; 8] = [
                [255, 0, 0],
                [0, 255, 0],
                [0, 0, 255],
                [255, 255, 0],
                [255, 0, 255],
                [0, 255, 255],
                [255, 128, 0],
                [128, 0, 255],
            ];
            for (i, px) in data.chunks_exact_mut(channels).enumerate() {
                for (c, v) in px.iter_mut().enumerate() {
                    *v = COLORS[i % 8][c % 3];
                }
            }
        }
        TestPattern::Black => {}
        TestPattern::White => data.fill(255),
    }

    data
}

/// Native-endian 16-bit samples, spread over the full range
pub fn generate_pattern_16(pattern: TestPattern, pixels: usize, channels: usize) -> Vec<u8> {
    generate_pattern(pattern, pixels, channels)
        .into_iter()
        .flat_map(|v| (v as u16 * 257).to_ne_bytes())
        .collect()
}

/// Random vectors with components in [0, 1]
pub fn unit_vectors(seed: u64, count: usize, channels: usize) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..channels).map(|_| rng.gen_range(0.0..=1.0)).collect())
        .collect()
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [r, g, b].map(|v| ((v + m) * 255.0) as u8)
}

/// Standard test sizes in pixels
pub mod sizes {
    pub const TINY: usize = 64;
    pub const SMALL: usize = 4096;
    pub const MEDIUM: usize = 65536;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_black() {
        let data = generate_pattern(TestPattern::Black, 4, 3);
        assert!(data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_generate_white() {
        let data = generate_pattern(TestPattern::White, 4, 4);
        assert_eq!(data.len(), 16);
        assert!(data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_ramp_endpoints() {
        let data = generate_pattern(TestPattern::Ramp, 256, 1);
        assert_eq!(data[0], 0);
        assert_eq!(data[255], 255);
    }

    #[test]
    fn test_random_deterministic() {
        let a = generate_pattern(TestPattern::Random(42), 10, 3);
        let b = generate_pattern(TestPattern::Random(42), 10, 3);
        assert_eq!(a, b);
        assert_eq!(unit_vectors(7, 5, 4), unit_vectors(7, 5, 4));
    }

    #[test]
    fn test_16_bit_full_range() {
        let data = generate_pattern_16(TestPattern::White, 1, 3);
        assert_eq!(data.len(), 6);
        assert_eq!(u16::from_ne_bytes([data[0], data[1]]), 65535);
    }
}
