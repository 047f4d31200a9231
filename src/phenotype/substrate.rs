//! Substrate geometry and ES-HyperNEAT parameters.

use crate::network::ActivationFunction;
use serde::{Deserialize, Serialize};

/// A point on the substrate plane
pub type Coord = (f64, f64);

/// Fixed input and output node positions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    pub input_coordinates: Vec<Coord>,
    pub output_coordinates: Vec<Coord>,
}

impl Substrate {
    pub fn new(input_coordinates: Vec<Coord>, output_coordinates: Vec<Coord>) -> Self {
        Self {
            input_coordinates,
            output_coordinates,
        }
    }

    /// Ten inputs along y = -1 and ten outputs along y = 1, x from -1.0 in
    /// steps of 0.25
    pub fn mediator() -> Self {
        let xs: Vec<f64> = (0..10).map(|i| -1.0 + 0.25 * i as f64).collect();
        Self {
            input_coordinates: xs.iter().map(|&x| (x, -1.0)).collect(),
            output_coordinates: xs.iter().map(|&x| (x, 1.0)).collect(),
        }
    }

    /// Two inputs plus bias along the bottom edge, one output on top
    pub fn xor() -> Self {
        Self {
            input_coordinates: vec![(-1.0, -1.0), (0.0, -1.0), (1.0, -1.0)],
            output_coordinates: vec![(0.0, 1.0)],
        }
    }
}

/// Quadtree resolution preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubstrateVersion {
    #[serde(rename = "S")]
    Small,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Large,
}

/// ES-HyperNEAT search parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EsParams {
    pub initial_depth: u32,
    pub max_depth: u32,
    pub variance_threshold: f64,
    pub band_threshold: f64,
    pub iteration_level: u32,
    pub division_threshold: f64,
    pub max_weight: f64,
    pub activation: ActivationFunction,
}

impl EsParams {
    pub fn for_version(version: SubstrateVersion) -> Self {
        let (initial_depth, max_depth) = match version {
            SubstrateVersion::Small => (0, 1),
            SubstrateVersion::Medium => (1, 2),
            SubstrateVersion::Large => (2, 3),
        };
        Self {
            initial_depth,
            max_depth,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.initial_depth > self.max_depth {
            return Err("initial_depth cannot exceed max_depth".to_string());
        }
        if self.max_depth > 10 {
            return Err("max_depth above 10 makes the quadtree intractable".to_string());
        }
        if self.max_weight <= 0.0 {
            return Err("max_weight must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for EsParams {
    fn default() -> Self {
        Self {
            initial_depth: 1,
            max_depth: 2,
            variance_threshold: 0.03,
            band_threshold: 0.3,
            iteration_level: 1,
            division_threshold: 0.5,
            max_weight: 5.0,
            activation: ActivationFunction::Sigmoid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mediator_substrate_layout() {
        let substrate = Substrate::mediator();
        assert_eq!(substrate.input_coordinates.len(), 10);
        assert_eq!(substrate.input_coordinates[0], (-1.0, -1.0));
        assert_eq!(substrate.output_coordinates[9], (1.25, 1.0));
    }

    #[test]
    fn test_version_presets() {
        assert_eq!(EsParams::for_version(SubstrateVersion::Small).max_depth, 1);
        assert_eq!(EsParams::for_version(SubstrateVersion::Medium).initial_depth, 1);
        assert_eq!(EsParams::for_version(SubstrateVersion::Large).max_depth, 3);
        assert!(EsParams::default().validate().is_ok());
    }
}
