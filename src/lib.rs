//! # Neuroevolution
//!
//! Mixed-generation NEAT evolving CPPNs that are expanded into recurrent
//! mediator networks with ES-HyperNEAT.
//!
//! ## Features
//!
//! - **Asynchronous**: genomes are evaluated one at a time, by people or gyms,
//!   and the population advances once enough of them have reported back
//! - **Mixed generations**: unevaluated genomes survive reproduction, so old
//!   and new individuals share one population
//! - **Configurable**: NEAT parameters in INI files, experiments and the
//!   server in YAML
//! - **Parallel**: offline labs run their experiments on all cores via Rayon
//! - **Reproducible**: seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neuroevolution::experiment::{Experiment, ExperimentConfig};
//!
//! let mut experiment = Experiment::new(0, ExperimentConfig::xor()).unwrap();
//! experiment.instantiate().unwrap();
//! experiment.start(Some(50)).unwrap();
//!
//! println!("{:?}", experiment.status());
//! ```
//!
//! ## Labs
//!
//! ```rust,no_run
//! use neuroevolution::experiment::ExperimentConfig;
//! use neuroevolution::lab::{Lab, ParameterGrid};
//!
//! let mut grid = ParameterGrid::new();
//! grid.insert(
//!     "async_eval.eval_threshold".to_string(),
//!     vec![serde_yaml::Value::from(0.4_f64), serde_yaml::Value::from(0.8_f64)],
//! );
//!
//! let mut lab = Lab::with_seed(7);
//! lab.add_parameterized_experiment(&ExperimentConfig::xor(), &grid).unwrap();
//! lab.instantiate_experiments().unwrap();
//! lab.run_scenarios();
//!
//! let statistics = lab.statistics();
//! println!("{} of {} solved", statistics.solved_experiments, statistics.total_experiments);
//! ```

pub mod checkpoint;
pub mod config;
pub mod evolution;
pub mod experiment;
pub mod fitness;
pub mod genome;
pub mod gym;
pub mod lab;
pub mod models;
pub mod neat_config;
pub mod network;
pub mod phenotype;
pub mod stats;
pub mod storage;

#[cfg(feature = "web")]
pub mod web;

// Re-export main types
pub use config::Config;
pub use evolution::{EvolutionError, Evolver};
pub use experiment::{Experiment, ExperimentConfig, ExperimentError};
pub use genome::{Genome, GenomeId};
pub use lab::Lab;
pub use neat_config::NeatConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
