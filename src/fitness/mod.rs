//! Fitness functions scoring a batch of evaluated genomes.

mod user;
mod xor;

pub use user::UserEvaluatedFitness;
pub use xor::XorFitness;

use crate::models::EvaluationData;
use serde::{Deserialize, Serialize};

/// Turns evaluation data into fitness values.
///
/// Called once per generation with every evaluation received since the last
/// advance, so functions may normalise across the batch.
pub trait FitnessFunction: Send + Sync {
    fn name(&self) -> &'static str;

    /// One fitness per entry of `batch`, in the same order
    fn evaluate(&self, batch: &[&EvaluationData]) -> Result<Vec<f64>, FitnessError>;
}

/// Selects a fitness function from configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessKind {
    UserEvaluated,
    Xor,
}

impl FitnessKind {
    pub fn build(&self) -> Box<dyn FitnessFunction> {
        match self {
            Self::UserEvaluated => Box::new(UserEvaluatedFitness),
            Self::Xor => Box::new(XorFitness),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitnessError {
    /// Data of the wrong kind was handed to a fitness function
    UnexpectedData { function: &'static str, found: &'static str },
    EmptyLog { function: &'static str },
}

impl std::fmt::Display for FitnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedData { function, found } => {
                write!(f, "{} fitness cannot score {} data", function, found)
            }
            Self::EmptyLog { function } => write!(f, "{} fitness received an empty log", function),
        }
    }
}

impl std::error::Error for FitnessError {}

pub(crate) fn data_kind(data: &EvaluationData) -> &'static str {
    match data {
        EvaluationData::User(_) => "user",
        EvaluationData::Xor(_) => "xor",
    }
}
