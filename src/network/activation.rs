//! Node activation and aggregation functions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Activation applied to `bias + response * aggregate`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationFunction {
    Sigmoid,
    Tanh,
    Sin,
    Gauss,
    Relu,
    Elu,
    Lelu,
    Selu,
    Softplus,
    Identity,
    Clamped,
    Inv,
    Log,
    Exp,
    Abs,
    Hat,
    Square,
    Cube,
}

impl ActivationFunction {
    pub const ALL: [ActivationFunction; 18] = [
        Self::Sigmoid,
        Self::Tanh,
        Self::Sin,
        Self::Gauss,
        Self::Relu,
        Self::Elu,
        Self::Lelu,
        Self::Selu,
        Self::Softplus,
        Self::Identity,
        Self::Clamped,
        Self::Inv,
        Self::Log,
        Self::Exp,
        Self::Abs,
        Self::Hat,
        Self::Square,
        Self::Cube,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Sin => "sin",
            Self::Gauss => "gauss",
            Self::Relu => "relu",
            Self::Elu => "elu",
            Self::Lelu => "lelu",
            Self::Selu => "selu",
            Self::Softplus => "softplus",
            Self::Identity => "identity",
            Self::Clamped => "clamped",
            Self::Inv => "inv",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Abs => "abs",
            Self::Hat => "hat",
            Self::Square => "square",
            Self::Cube => "cube",
        }
    }

    #[inline]
    pub fn apply(&self, z: f64) -> f64 {
        match self {
            Self::Sigmoid => {
                let z = (5.0 * z).clamp(-60.0, 60.0);
                1.0 / (1.0 + (-z).exp())
            }
            Self::Tanh => (2.5 * z).clamp(-60.0, 60.0).tanh(),
            Self::Sin => (5.0 * z).clamp(-60.0, 60.0).sin(),
            Self::Gauss => {
                let z = z.clamp(-3.4, 3.4);
                (-5.0 * z * z).exp()
            }
            Self::Relu => z.max(0.0),
            Self::Elu => {
                if z > 0.0 {
                    z
                } else {
                    z.exp() - 1.0
                }
            }
            Self::Lelu => {
                if z > 0.0 {
                    z
                } else {
                    0.005 * z
                }
            }
            Self::Selu => {
                let lambda = 1.050_700_987_355_480_5;
                let alpha = 1.673_263_242_354_377_3;
                if z > 0.0 {
                    lambda * z
                } else {
                    lambda * alpha * (z.exp() - 1.0)
                }
            }
            Self::Softplus => {
                let z = (5.0 * z).clamp(-60.0, 60.0);
                0.2 * (1.0 + z.exp()).ln()
            }
            Self::Identity => z,
            Self::Clamped => z.clamp(-1.0, 1.0),
            Self::Inv => {
                if z == 0.0 {
                    0.0
                } else {
                    1.0 / z
                }
            }
            Self::Log => z.max(1e-7).ln(),
            Self::Exp => z.clamp(-60.0, 60.0).exp(),
            Self::Abs => z.abs(),
            Self::Hat => (1.0 - z.abs()).max(0.0),
            Self::Square => z * z,
            Self::Cube => z * z * z,
        }
    }
}

impl FromStr for ActivationFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == lower)
            .ok_or_else(|| format!("unknown activation function '{}'", s))
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reduction of weighted inputs into one value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFunction {
    Sum,
    Product,
    Max,
    Min,
    Maxabs,
    Median,
    Mean,
}

impl AggregationFunction {
    pub const ALL: [AggregationFunction; 7] = [
        Self::Sum,
        Self::Product,
        Self::Max,
        Self::Min,
        Self::Maxabs,
        Self::Median,
        Self::Mean,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Max => "max",
            Self::Min => "min",
            Self::Maxabs => "maxabs",
            Self::Median => "median",
            Self::Mean => "mean",
        }
    }

    /// Aggregate; an empty input yields 0.0 for every function
    pub fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Self::Sum => values.iter().sum(),
            Self::Product => values.iter().product(),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Maxabs => values
                .iter()
                .copied()
                .fold(0.0, |acc: f64, v| if v.abs() > acc.abs() { v } else { acc }),
            Self::Median => crate::stats::median(values),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}

impl FromStr for AggregationFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == lower)
            .ok_or_else(|| format!("unknown aggregation function '{}'", s))
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
