//! Offline evaluation environments.
//!
//! A gym plays the part of the evaluator: it drives a phenotype network and
//! returns the evaluation data a client would otherwise send to the server.

mod simulated_user;
mod xor;

pub use simulated_user::SimulatedUserGym;
pub use xor::XorGym;

use crate::models::{EvaluationData, ExperimentData};
use crate::network::RecurrentNetwork;
use crate::phenotype::PhenotypeConfig;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A phenotype network handed out for evaluation
#[derive(Clone, Debug)]
pub struct Individual {
    pub experiment_data: ExperimentData,
    pub network: RecurrentNetwork,
}

pub trait Gym: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether [`Gym::run`] produces data locally
    fn is_simulated(&self) -> bool {
        true
    }

    /// Evaluate one individual; `None` when evaluations arrive from outside
    fn run(&self, individual: &mut Individual, rng: &mut dyn RngCore) -> Option<EvaluationData>;
}

/// Placeholder for experiments evaluated by remote clients
#[derive(Clone, Copy, Debug, Default)]
pub struct OnlineGym;

impl Gym for OnlineGym {
    fn name(&self) -> &'static str {
        "online"
    }

    fn is_simulated(&self) -> bool {
        false
    }

    fn run(&self, _individual: &mut Individual, _rng: &mut dyn RngCore) -> Option<EvaluationData> {
        None
    }
}

/// Selects a gym from configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GymKind {
    #[default]
    Online,
    Xor,
    SimulatedUser,
}

impl GymKind {
    pub fn build(&self) -> Box<dyn Gym> {
        match self {
            Self::Online => Box::new(OnlineGym),
            Self::Xor => Box::new(XorGym),
            Self::SimulatedUser => Box::new(SimulatedUserGym::default()),
        }
    }

    /// Substrate used when an experiment does not configure one
    pub fn default_phenotype(&self) -> PhenotypeConfig {
        match self {
            Self::Xor => XorGym::phenotype_config(),
            Self::Online | Self::SimulatedUser => PhenotypeConfig::default(),
        }
    }
}
