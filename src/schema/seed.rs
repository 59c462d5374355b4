//! Seed types for initializing the cloud lattice.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compute::{Lattice, Vec3};

use super::ConfigError;

/// Complete seed specification for simulation initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Pattern to use for seeding.
    pub pattern: Pattern,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            pattern: Pattern::VaporSource { dose: 0.1 },
        }
    }
}

/// Predefined patterns for initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    /// All-zero lattice.
    Empty,
    /// Vapor added to the ground layer (`z = 0`).
    VaporSource { dose: f32 },
    /// Same contents in every cell.
    Uniform {
        vapor: f32,
        droplets: f32,
        #[serde(default)]
        velocity: (f32, f32, f32),
    },
    /// Gaussian blob of vapor.
    VaporBlob {
        /// Center position as fraction of lattice size (0.0-1.0).
        center: (f32, f32, f32),
        /// Radius as fraction of the smallest extent.
        radius: f32,
        /// Peak amplitude.
        amplitude: f32,
    },
    /// Uniform random vapor in `[0, amplitude)`.
    Noise {
        amplitude: f32,
        /// Random seed.
        seed: u64,
    },
    /// Explicit vapor values.
    Custom {
        /// List of (x, y, z, vapor) entries. Out-of-range entries are skipped.
        values: Vec<(usize, usize, usize, f32)>,
    },
}

impl Seed {
    /// Reject patterns that would write non-finite values into the lattice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |pattern, reason| Err(ConfigError::InvalidSeed { pattern, reason });
        match &self.pattern {
            Pattern::Empty => Ok(()),
            Pattern::VaporSource { dose } if !dose.is_finite() || *dose < 0.0 => {
                invalid("VaporSource", "dose must be non-negative and finite")
            }
            Pattern::VaporSource { .. } => Ok(()),
            Pattern::Uniform {
                vapor,
                droplets,
                velocity,
            } => {
                let values = [*vapor, *droplets, velocity.0, velocity.1, velocity.2];
                if values.iter().all(|v| v.is_finite()) {
                    Ok(())
                } else {
                    invalid("Uniform", "values must be finite")
                }
            }
            Pattern::VaporBlob {
                center,
                radius,
                amplitude,
            } => {
                if !radius.is_finite() || *radius <= 0.0 {
                    invalid("VaporBlob", "radius must be positive and finite")
                } else if !amplitude.is_finite() {
                    invalid("VaporBlob", "amplitude must be finite")
                } else if ![center.0, center.1, center.2].iter().all(|c| c.is_finite()) {
                    invalid("VaporBlob", "center must be finite")
                } else {
                    Ok(())
                }
            }
            Pattern::Noise { amplitude, .. } if !amplitude.is_finite() => {
                invalid("Noise", "amplitude must be finite")
            }
            Pattern::Noise { .. } => Ok(()),
            Pattern::Custom { values } => {
                if values.iter().all(|&(_, _, _, v)| v.is_finite()) {
                    Ok(())
                } else {
                    invalid("Custom", "values must be finite")
                }
            }
        }
    }

    /// Add the pattern's contents to `lattice`.
    pub fn apply(&self, lattice: &mut Lattice) {
        match &self.pattern {
            Pattern::Empty => {}
            Pattern::VaporSource { dose } => lattice.add_vapor_source(*dose),
            Pattern::Uniform {
                vapor,
                droplets,
                velocity,
            } => {
                let velocity = Vec3::new(velocity.0, velocity.1, velocity.2);
                for cell in lattice.cells_mut() {
                    cell.vapor += vapor;
                    cell.droplets += droplets;
                    cell.velocity += velocity;
                }
            }
            Pattern::VaporBlob {
                center,
                radius,
                amplitude,
            } => apply_gaussian(lattice, *center, *radius, *amplitude),
            Pattern::Noise { amplitude, seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for cell in lattice.cells_mut() {
                    cell.vapor += amplitude * rng.r#gen::<f32>();
                }
            }
            Pattern::Custom { values } => {
                for &(x, y, z, vapor) in values {
                    if lattice.contains(x, y, z) {
                        lattice.get_mut(x, y, z).vapor = vapor;
                    }
                }
            }
        }
    }
}

fn apply_gaussian(lattice: &mut Lattice, center: (f32, f32, f32), radius: f32, amplitude: f32) {
    let (width, height, depth) = lattice.dims();
    let cx = center.0 * width as f32;
    let cy = center.1 * height as f32;
    let cz = center.2 * depth as f32;
    let r = radius * width.min(height).min(depth) as f32;
    let sigma_sq = (r / 2.0).powi(2);
    if !(sigma_sq.is_finite() && sigma_sq > 0.0) {
        return;
    }

    for (i, cell) in lattice.cells_mut().iter_mut().enumerate() {
        let x = i % width;
        let y = (i / width) % height;
        let z = i / (width * height);
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let dz = z as f32 - cz;
        let dist_sq = dx * dx + dy * dy + dz * dz;
        cell.vapor += amplitude * (-dist_sq / (2.0 * sigma_sq)).exp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_seed_doses_ground_layer() {
        let mut lattice = Lattice::new(3, 3, 2);
        Seed::default().apply(&mut lattice);
        assert_eq!(lattice.get(2, 2, 0).vapor, 0.1);
        assert_eq!(lattice.get(2, 2, 1).vapor, 0.0);
    }

    #[test]
    fn test_noise_is_deterministic() {
        let seed = Seed {
            pattern: Pattern::Noise {
                amplitude: 2.0,
                seed: 42,
            },
        };
        let mut a = Lattice::new(4, 4, 4);
        let mut b = Lattice::new(4, 4, 4);
        seed.apply(&mut a);
        seed.apply(&mut b);
        assert_eq!(a.cells(), b.cells());
        assert!(a.cells().iter().all(|c| (0.0..2.0).contains(&c.vapor)));
        assert!(a.cells().iter().any(|c| c.vapor > 0.0));
    }

    #[test]
    fn test_blob_peaks_at_center() {
        let seed = Seed {
            pattern: Pattern::VaporBlob {
                center: (0.5, 0.5, 0.5),
                radius: 0.5,
                amplitude: 3.0,
            },
        };
        let mut lattice = Lattice::new(8, 8, 8);
        seed.apply(&mut lattice);
        assert!((lattice.get(4, 4, 4).vapor - 3.0).abs() < 1e-6);
        assert!(lattice.get(0, 0, 0).vapor < lattice.get(3, 3, 3).vapor);
    }

    #[test]
    fn test_zero_radius_blob_rejected() {
        let seed = Seed {
            pattern: Pattern::VaporBlob {
                center: (0.5, 0.5, 0.5),
                radius: 0.0,
                amplitude: 1.0,
            },
        };
        assert!(matches!(
            seed.validate(),
            Err(ConfigError::InvalidSeed {
                pattern: "VaporBlob",
                ..
            })
        ));

        let mut lattice = Lattice::new(4, 4, 4);
        seed.apply(&mut lattice);
        assert!(lattice.cells().iter().all(|c| c.vapor.is_finite()));
        assert_eq!(lattice.total_mass(), 0.0);
    }

    #[test]
    fn test_non_finite_patterns_rejected() {
        let bad = [
            Pattern::VaporSource { dose: f32::NAN },
            Pattern::VaporSource { dose: -1.0 },
            Pattern::Uniform {
                vapor: 1.0,
                droplets: f32::INFINITY,
                velocity: (0.0, 0.0, 0.0),
            },
            Pattern::VaporBlob {
                center: (0.5, 0.5, 0.5),
                radius: f32::NAN,
                amplitude: 1.0,
            },
            Pattern::Noise {
                amplitude: f32::NAN,
                seed: 1,
            },
            Pattern::Custom {
                values: vec![(0, 0, 0, f32::NAN)],
            },
        ];
        for pattern in bad {
            assert!(Seed { pattern }.validate().is_err());
        }
        assert!(Seed::default().validate().is_ok());
        assert!(Seed { pattern: Pattern::Empty }.validate().is_ok());
    }

    #[test]
    fn test_custom_skips_out_of_range() {
        let seed = Seed {
            pattern: Pattern::Custom {
                values: vec![(1, 0, 1, 5.0), (9, 9, 9, 1.0)],
            },
        };
        let mut lattice = Lattice::new(2, 2, 2);
        seed.apply(&mut lattice);
        assert_eq!(lattice.get(1, 0, 1).vapor, 5.0);
        assert_eq!(lattice.total_mass(), 5.0);
    }

    #[test]
    fn test_pattern_json_tag() {
        let json = r#"{"pattern": {"type": "Uniform", "vapor": 1.5, "droplets": 0.25}}"#;
        let seed: Seed = serde_json::from_str(json).unwrap();
        let mut lattice = Lattice::new(2, 1, 1);
        seed.apply(&mut lattice);
        assert_eq!(lattice.get(1, 0, 0).vapor, 1.5);
        assert_eq!(lattice.get(1, 0, 0).droplets, 0.25);
        assert_eq!(lattice.get(1, 0, 0).velocity, Vec3::ZERO);
    }
}
