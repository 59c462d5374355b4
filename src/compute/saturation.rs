//! Height-dependent temperature and saturation capacity for the phase transition.

use crate::schema::{AtmosphereConfig, HeightProfile};

/// Temperature (K) at which the saturation curve's denominator vanishes.
pub const SATURATION_POLE: f32 = 29.5;

/// Temperature of layer `z` in a lattice `depth` layers tall.
///
/// `T = T0 - ((z / depth) * z_world_size / 100) * lapse_rate`. With
/// [`HeightProfile::Quantized`] the `z / depth` ratio is integer division, so every
/// layer evaluates to `T0`.
#[inline]
pub fn layer_temperature(z: usize, depth: usize, atmosphere: &AtmosphereConfig) -> f32 {
    let fraction = match atmosphere.height_profile {
        HeightProfile::Quantized => (z / depth) as f32,
        HeightProfile::Continuous => z as f32 / depth as f32,
    };
    let height_m = fraction * atmosphere.z_world_size;
    atmosphere.surface_temperature - (height_m / 100.0) * atmosphere.lapse_rate
}

/// Maximum vapor a cell can hold: `w_max = 217 * exp(19.482 - 4303.4 / (T - 29.5)) / T`.
///
/// Unbounded as `T` approaches [`SATURATION_POLE`].
#[inline]
pub fn saturation_capacity(temperature: f32) -> f32 {
    217.0 * (19.482 - 4303.4 / (temperature - SATURATION_POLE)).exp() / temperature
}

/// Layers whose temperature sits within `tolerance` K of the pole, or at or below 0 K.
pub fn degenerate_layers(depth: usize, atmosphere: &AtmosphereConfig, tolerance: f32) -> Vec<usize> {
    (0..depth)
        .filter(|&z| {
            let t = layer_temperature(z, depth, atmosphere);
            (t - SATURATION_POLE).abs() < tolerance || t <= 0.0
        })
        .collect()
}
