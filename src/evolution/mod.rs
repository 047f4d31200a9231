//! Mixed-generation NEAT.
//!
//! Unlike generational NEAT, genomes are scored one at a time as
//! evaluations arrive. Once enough of the population has been evaluated the
//! evaluated genomes reproduce and (apart from elites) die, while the rest of
//! the population carries over untouched into the next generation.

mod distance_cache;
mod evaluation;
mod evolver;
mod fitness_manager;
mod genome_manager;
mod population;
mod reporting;
mod reproduction;
mod speciation;
mod species;
mod species_set;
mod stagnation;

pub use distance_cache::GenomeDistanceCache;
pub use evaluation::{evaluation_count, Evaluation, EvaluationOutcome};
pub use evolver::{Evolver, EvolverState};
pub use fitness_manager::FitnessManager;
pub use genome_manager::GenomeManager;
pub use population::PopulationManager;
pub use reporting::{LogReporter, Reporter, ReporterSet};
pub use reproduction::{Elites, OffspringGenerator, Reproduction, ReproductionOutcome, SpeciesReproduction};
pub use speciation::Speciation;
pub use species::{Species, SpeciesId};
pub use species_set::SpeciesSet;
pub use stagnation::Stagnation;

use crate::fitness::FitnessError;
use crate::genome::{Genome, GenomeId};
use std::collections::BTreeMap;

/// Live genomes by id
pub type Population = BTreeMap<GenomeId, Genome>;

/// Errors raised by the evolution engine
#[derive(Debug, Clone, PartialEq)]
pub enum EvolutionError {
    GenomeNotFound(GenomeId),
    SpeciesNotFound(SpeciesId),
    /// Every genome has been handed out and none returned yet
    NoGenomesAvailable,
    NothingEvaluated,
    InsufficientParents(SpeciesId),
    CompleteExtinction,
    Fitness(FitnessError),
}

impl std::fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenomeNotFound(id) => write!(f, "Genome ID {} not found in the population.", id),
            Self::SpeciesNotFound(id) => write!(f, "Species ID {} does not exist.", id),
            Self::NoGenomesAvailable => write!(f, "No more genomes to send."),
            Self::NothingEvaluated => write!(f, "No genomes have been evaluated yet."),
            Self::InsufficientParents(id) => {
                write!(f, "Species {} has no parents to generate offspring.", id)
            }
            Self::CompleteExtinction => write!(f, "All species have gone extinct."),
            Self::Fitness(e) => write!(f, "Fitness error: {}", e),
        }
    }
}

impl std::error::Error for EvolutionError {}

impl From<FitnessError> for EvolutionError {
    fn from(e: FitnessError) -> Self {
        Self::Fitness(e)
    }
}
