//! Configuration types for cloud lattice simulation parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Lattice width in cells (X dimension).
    pub width: usize,
    /// Lattice height in cells (Y dimension).
    pub height: usize,
    /// Lattice depth in cells (Z dimension, vertical).
    pub depth: usize,
    /// Wall-clock seconds one full multi-stage cycle should take.
    pub run_period: f32,
    /// Mode the simulator starts in.
    #[serde(default)]
    pub mode: SimMode,
    /// Stencil coefficients.
    #[serde(default)]
    pub coefficients: Coefficients,
    /// Height-dependent temperature model.
    #[serde(default)]
    pub atmosphere: AtmosphereConfig,
    /// Vapor added to every bottom-layer cell on a switch into physics mode.
    #[serde(default = "default_vapor_dose")]
    pub vapor_source_dose: f32,
}

fn default_vapor_dose() -> f32 {
    0.1
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            depth: 16,
            run_period: 10.0,
            mode: SimMode::default(),
            coefficients: Coefficients::default(),
            atmosphere: AtmosphereConfig::default(),
            vapor_source_dose: default_vapor_dose(),
        }
    }
}

/// Top-level simulation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimMode {
    /// Full cloud physics pipeline (six lattice passes per cycle).
    #[default]
    Physics,
    /// Half-and-half texture check (two passes per cycle).
    Diagnostic,
}

impl SimMode {
    /// Number of lattice passes the scheduler budgets for in one cycle.
    #[inline]
    pub fn stage_multiplier(self) -> u32 {
        match self {
            SimMode::Physics => 6,
            SimMode::Diagnostic => 2,
        }
    }
}

/// Which neighbours feed the relaxation term of the velocity and diffusion stencils.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StencilShape {
    /// Only the cell below, `(z - 1)`.
    #[default]
    OneSided,
    /// All six axis-aligned neighbours.
    SixNeighbour,
}

/// Fixed stencil coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coefficients {
    /// Kv: viscosity ratio for the velocity stencil.
    pub viscosity: f32,
    /// Kp: pressure effect for the velocity stencil.
    pub pressure: f32,
    /// Kd: water vapor diffusion.
    pub diffusion: f32,
    /// a: phase transition rate between vapor and droplets.
    pub phase_transition_rate: f32,
    /// Neighbourhood used by the relaxation terms.
    #[serde(default)]
    pub stencil: StencilShape,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            viscosity: 2.4e-5,
            pressure: 0.1,
            diffusion: 0.5,
            phase_transition_rate: 100.0,
            stencil: StencilShape::default(),
        }
    }
}

/// How a layer index is turned into a height above the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightProfile {
    /// `z / depth` in integer arithmetic. Every layer below `depth` maps to the surface.
    #[default]
    Quantized,
    /// `z / depth` as a real fraction.
    Continuous,
}

/// Temperature model used by the phase transition stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmosphereConfig {
    /// Temperature at the bottom layer in Kelvin.
    pub surface_temperature: f32,
    /// Kelvin lost per 100 m of height.
    pub lapse_rate: f32,
    /// Physical height of the whole lattice in metres.
    pub z_world_size: f32,
    #[serde(default)]
    pub height_profile: HeightProfile,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            surface_temperature: 300.0,
            lapse_rate: 0.6,
            z_world_size: 1000.0,
            height_profile: HeightProfile::default(),
        }
    }
}

impl SimulationConfig {
    /// Get total lattice volume (width * height * depth).
    #[inline]
    pub fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !self.run_period.is_finite() || self.run_period <= 0.0 {
            return Err(ConfigError::InvalidRunPeriod(self.run_period));
        }
        let c = &self.coefficients;
        for (name, value) in [
            ("viscosity", c.viscosity),
            ("pressure", c.pressure),
            ("diffusion", c.diffusion),
            ("phase_transition_rate", c.phase_transition_rate),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteCoefficient { name, value });
            }
        }
        let a = &self.atmosphere;
        if !a.z_world_size.is_finite() || a.z_world_size <= 0.0 {
            return Err(ConfigError::InvalidWorldHeight(a.z_world_size));
        }
        if !a.surface_temperature.is_finite() || !a.lapse_rate.is_finite() {
            return Err(ConfigError::InvalidAtmosphere);
        }
        if !self.vapor_source_dose.is_finite() || self.vapor_source_dose < 0.0 {
            return Err(ConfigError::InvalidVaporDose(self.vapor_source_dose));
        }
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Lattice dimensions (width, height, depth) must be non-zero")]
    InvalidDimensions,
    #[error("Run period must be positive and finite, got {0}")]
    InvalidRunPeriod(f32),
    #[error("Coefficient {name} must be finite, got {value}")]
    NonFiniteCoefficient { name: &'static str, value: f32 },
    #[error("World height must be positive and finite, got {0}")]
    InvalidWorldHeight(f32),
    #[error("Surface temperature and lapse rate must be finite")]
    InvalidAtmosphere,
    #[error("Vapor source dose must be non-negative, got {0}")]
    InvalidVaporDose(f32),
    #[error("Invalid {pattern} seed: {reason}")]
    InvalidSeed {
        pattern: &'static str,
        reason: &'static str,
    },
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.volume(), 50 * 50 * 16);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = SimulationConfig {
            depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_run_period_rejected() {
        for run_period in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = SimulationConfig {
                run_period,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidRunPeriod(_))
            ));
        }
    }

    #[test]
    fn test_non_finite_coefficient_rejected() {
        let mut config = SimulationConfig::default();
        config.coefficients.diffusion = f32::NAN;
        match config.validate() {
            Err(ConfigError::NonFiniteCoefficient { name, .. }) => assert_eq!(name, "diffusion"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_stage_multiplier() {
        assert_eq!(SimMode::Physics.stage_multiplier(), 6);
        assert_eq!(SimMode::Diagnostic.stage_multiplier(), 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "width": 4, "height": 4, "depth": 2, "run_period": 1.5 }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mode, SimMode::Physics);
        assert_eq!(config.vapor_source_dose, 0.1);
        assert_eq!(config.atmosphere.height_profile, HeightProfile::Quantized);
        assert_eq!(config.coefficients.stencil, StencilShape::OneSided);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{ "width": 8, "height": 8, "depth": 4, "run_period": 2.0, "mode": "Diagnostic" }}"#
        )
        .unwrap();

        let config = SimulationConfig::from_json_file(&path).unwrap();
        assert_eq!(config.mode, SimMode::Diagnostic);
        assert_eq!(config.volume(), 256);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{ "width": 0, "height": 8, "depth": 4, "run_period": 2.0 }"#).unwrap();
        assert!(matches!(
            SimulationConfig::from_json_file(&bad),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_serialization() {
        let config = SimulationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.width, config.width);
        assert_eq!(parsed.coefficients.pressure, config.coefficients.pressure);
    }
}
