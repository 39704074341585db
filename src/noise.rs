//! Coherent Noise Sampling
//!
//! Wraps a seeded 3D OpenSimplex source and blends one or more octaves of it
//! at a surface normal. Used for terrain and cloud textures.

use ::noise::{NoiseFn, OpenSimplex};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math3d::Vec3;

/// How many noise octaves contribute to a sample, and how strongly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LodSpec", into = "LodSpec")]
pub enum LevelOfDetail {
    /// One noise call: `weight * noise(normal * frequency + shift)`
    Single { frequency: f64, weight: f64 },
    /// Weighted sum of several frequencies; weights always sum to 1
    Octaves {
        frequencies: Vec<f64>,
        weights: Vec<f64>,
    },
}

impl LevelOfDetail {
    /// Standard octave preset: frequencies 2, 4, 8, … and halving weights,
    /// with the last weight repeated so the total is exactly 1.
    pub fn octaves(count: u32) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::LevelOfDetail(
                "octave count must be at least 1".into(),
            ));
        }
        let count = count as i32;
        let frequencies = (1..=count).map(|i| 2f64.powi(i)).collect();
        let weights = (1..=count)
            .map(|i| 0.5f64.powi(if i == count { i - 1 } else { i }))
            .collect();
        Ok(Self::Octaves {
            frequencies,
            weights,
        })
    }

    /// Octave table with weights normalized to sum to 1
    pub fn new_octaves(frequencies: Vec<f64>, weights: Vec<f64>) -> Result<Self, ConfigError> {
        if frequencies.is_empty() {
            return Err(ConfigError::LevelOfDetail("no octaves given".into()));
        }
        if frequencies.len() != weights.len() {
            return Err(ConfigError::LevelOfDetail(format!(
                "{} frequencies but {} weights",
                frequencies.len(),
                weights.len()
            )));
        }
        if frequencies.iter().chain(&weights).any(|v| !v.is_finite()) {
            return Err(ConfigError::LevelOfDetail(
                "frequencies and weights must be finite".into(),
            ));
        }
        if weights.iter().any(|&w| w < 0.0) {
            return Err(ConfigError::LevelOfDetail(
                "weights must not be negative".into(),
            ));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(ConfigError::LevelOfDetail(
                "weights must have a positive sum".into(),
            ));
        }
        let weights = weights.into_iter().map(|w| w / total).collect();
        Ok(Self::Octaves {
            frequencies,
            weights,
        })
    }

    /// Number of noise calls per sample
    pub fn octave_count(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Octaves { frequencies, .. } => frequencies.len(),
        }
    }

    pub fn weight_sum(&self) -> f64 {
        match self {
            Self::Single { weight, .. } => *weight,
            Self::Octaves { weights, .. } => weights.iter().sum(),
        }
    }
}

impl Default for LevelOfDetail {
    fn default() -> Self {
        Self::Octaves {
            frequencies: vec![2.0, 4.0, 8.0, 16.0],
            weights: vec![0.5, 0.25, 0.125, 0.125],
        }
    }
}

/// Config-file forms of a level of detail: a bare octave count, a single
/// frequency/weight pair, or an explicit octave table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LodSpec {
    Count(u32),
    Single {
        frequency: f64,
        #[serde(default = "unit_weight")]
        weight: f64,
    },
    Table {
        frequencies: Vec<f64>,
        weights: Vec<f64>,
    },
}

fn unit_weight() -> f64 {
    1.0
}

impl TryFrom<LodSpec> for LevelOfDetail {
    type Error = ConfigError;

    fn try_from(spec: LodSpec) -> Result<Self, Self::Error> {
        match spec {
            LodSpec::Count(n) => Self::octaves(n),
            LodSpec::Single { frequency, weight } => {
                if !frequency.is_finite() || !weight.is_finite() {
                    return Err(ConfigError::LevelOfDetail(
                        "frequency and weight must be finite".into(),
                    ));
                }
                Ok(Self::Single { frequency, weight })
            },
            LodSpec::Table {
                frequencies,
                weights,
            } => Self::new_octaves(frequencies, weights),
        }
    }
}

impl From<LevelOfDetail> for LodSpec {
    fn from(lod: LevelOfDetail) -> Self {
        match lod {
            LevelOfDetail::Single { frequency, weight } => Self::Single { frequency, weight },
            LevelOfDetail::Octaves {
                frequencies,
                weights,
            } => Self::Table {
                frequencies,
                weights,
            },
        }
    }
}

// ============================================================================
// Sampler
// ============================================================================

/// Deterministic coherent noise over 3D space. Read-only once built, so a
/// single sampler is shared by every planet and every render chunk.
pub struct NoiseSampler {
    source: OpenSimplex,
    seed: u32,
}

impl NoiseSampler {
    pub fn new(seed: u32) -> Self {
        Self {
            source: OpenSimplex::new(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Raw noise in approximately [-1, 1]
    #[inline]
    pub fn noise3(&self, p: Vec3) -> f64 {
        self.source.get([p.x, p.y, p.z])
    }

    /// Blend the octaves of `lod` at `normal`, with `shift` added to every
    /// coordinate. Output stays in approximately [-1, 1].
    pub fn sample(&self, normal: Vec3, lod: &LevelOfDetail, shift: f64) -> f64 {
        let offset = Vec3::new(shift, shift, shift);
        match lod {
            LevelOfDetail::Single { frequency, weight } => {
                weight * self.noise3(normal * *frequency + offset)
            },
            LevelOfDetail::Octaves {
                frequencies,
                weights,
            } => frequencies
                .iter()
                .zip(weights)
                .map(|(&f, &w)| w * self.noise3(normal * f + offset))
                .sum(),
        }
    }

    /// `sample` remapped from [-1, 1] to [0, 1]
    #[inline]
    pub fn sample01(&self, normal: Vec3, lod: &LevelOfDetail, shift: f64) -> f64 {
        (self.sample(normal, lod, shift) + 1.0) / 2.0
    }
}

impl Default for NoiseSampler {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octave_weights_sum_to_one() {
        let lod =
            LevelOfDetail::new_octaves(vec![2.0, 4.0, 8.0, 16.0], vec![0.5, 0.25, 0.125, 0.125])
                .unwrap();
        assert!((lod.weight_sum() - 1.0).abs() < 1e-9);
        assert_eq!(lod, LevelOfDetail::default());
    }

    #[test]
    fn test_octaves_are_normalized() {
        let lod = LevelOfDetail::new_octaves(vec![1.0, 3.0, 9.0], vec![4.0, 2.0, 2.0]).unwrap();
        assert!((lod.weight_sum() - 1.0).abs() < 1e-9);
        match lod {
            LevelOfDetail::Octaves { weights, .. } => {
                assert_eq!(weights, vec![0.5, 0.25, 0.25]);
            },
            LevelOfDetail::Single { .. } => panic!("expected octave table"),
        }
    }

    #[test]
    fn test_octave_preset() {
        for n in 1..=8 {
            let lod = LevelOfDetail::octaves(n).unwrap();
            assert_eq!(lod.octave_count(), n as usize);
            assert!((lod.weight_sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(LevelOfDetail::octaves(4).unwrap(), LevelOfDetail::default());
        assert!(LevelOfDetail::octaves(0).is_err());
    }

    #[test]
    fn test_malformed_tables_rejected() {
        assert!(LevelOfDetail::new_octaves(vec![], vec![]).is_err());
        assert!(LevelOfDetail::new_octaves(vec![1.0, 2.0], vec![1.0]).is_err());
        assert!(LevelOfDetail::new_octaves(vec![1.0], vec![0.0]).is_err());
        assert!(LevelOfDetail::new_octaves(vec![1.0, 2.0], vec![1.0, -0.5]).is_err());
    }

    #[test]
    fn test_lod_config_forms() {
        let count: LevelOfDetail = serde_json::from_str("2").unwrap();
        assert_eq!(count.octave_count(), 2);

        let single: LevelOfDetail = serde_json::from_str(r#"{"frequency": 3.0}"#).unwrap();
        assert_eq!(
            single,
            LevelOfDetail::Single {
                frequency: 3.0,
                weight: 1.0
            }
        );

        let table: LevelOfDetail =
            serde_json::from_str(r#"{"frequencies": [2, 4], "weights": [3, 1]}"#).unwrap();
        assert!((table.weight_sum() - 1.0).abs() < 1e-9);

        assert!(serde_json::from_str::<LevelOfDetail>("0").is_err());
    }

    #[test]
    fn test_sample_deterministic() {
        let sampler = NoiseSampler::new(7);
        let other = NoiseSampler::new(7);
        let lod = LevelOfDetail::default();
        let n = Vec3::new(0.3, -0.4, 0.866);
        assert_eq!(sampler.sample(n, &lod, 0.25), sampler.sample(n, &lod, 0.25));
        assert_eq!(sampler.sample(n, &lod, 0.25), other.sample(n, &lod, 0.25));
    }

    #[test]
    fn test_sample_range() {
        let sampler = NoiseSampler::default();
        let lod = LevelOfDetail::default();
        for i in 0..200 {
            let t = i as f64 * 0.137;
            let n = Vec3::new(t.sin(), (t * 0.7).cos(), (t * 1.3).sin()).normalize();
            let v = sampler.sample01(n, &lod, t);
            assert!((-0.05..=1.05).contains(&v), "sample {} out of range", v);
        }
    }

    #[test]
    fn test_single_pass_matches_raw_noise() {
        let sampler = NoiseSampler::new(3);
        let lod = LevelOfDetail::Single {
            frequency: 2.0,
            weight: 0.5,
        };
        let n = Vec3::new(0.0, 0.6, 0.8);
        let expected = 0.5 * sampler.noise3(Vec3::new(1.0, 2.2, 2.6));
        assert!((sampler.sample(n, &lod, 1.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_shift_moves_texture() {
        let sampler = NoiseSampler::default();
        let lod = LevelOfDetail::default();
        let n = Vec3::new(0.1, 0.2, 0.97).normalize();
        let moved = (1..10).any(|k| {
            (sampler.sample(n, &lod, 0.0) - sampler.sample(n, &lod, k as f64 * 0.1)).abs() > 1e-6
        });
        assert!(moved);
    }
}
