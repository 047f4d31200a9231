//! A single evolving population together with its phenotype pipeline.

mod config;

pub use config::{AsyncEvalConfig, ExperimentConfig};

use crate::evolution::{evaluation_count, EvolutionError, Evolver, EvolverState, Reporter};
use crate::genome::GenomeId;
use crate::gym::{Gym, Individual};
use crate::models::{EvaluationData, ExperimentData, PhenotypeData};
use crate::neat_config::{ConfigError, NeatConfig};
use crate::phenotype::{encode_network, PhenotypeCreator, PhenotypeError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub type ExperimentId = u32;

/// Point-in-time view of an experiment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentStatus {
    pub experiment_id: ExperimentId,
    pub name: String,
    pub generation: u32,
    pub population_size: usize,
    pub species_count: usize,
    pub evaluated_count: usize,
    pub evaluation_threshold: usize,
    pub best_fitness: Option<f64>,
    pub solved: bool,
    pub stopped: bool,
}

/// Evolves one population; evaluations come from a gym or from clients
pub struct Experiment {
    id: ExperimentId,
    config: ExperimentConfig,
    evolver: Evolver,
    phenotype_creator: PhenotypeCreator,
    gym: Box<dyn Gym>,
    evaluation_pool: Vec<Individual>,
    rng: ChaCha8Rng,
    stopped: bool,
}

impl Experiment {
    /// Load the parameter file named by `config` and build the experiment
    pub fn new(id: ExperimentId, config: ExperimentConfig) -> Result<Self, ExperimentError> {
        let neat = NeatConfig::from_file(&config.neat_config_path)?;
        Self::with_neat_config(id, config, neat)
    }

    pub fn with_neat_config(
        id: ExperimentId,
        config: ExperimentConfig,
        mut neat: NeatConfig,
    ) -> Result<Self, ExperimentError> {
        config.validate().map_err(ExperimentError::InvalidConfig)?;
        config.apply_overrides(&mut neat);
        neat.validate().map_err(ExperimentError::InvalidConfig)?;

        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let threshold = evaluation_count(config.async_eval.eval_threshold, neat.neat.pop_size);
        let evolver = Evolver::new(neat, config.fitness.build(), threshold, seed);
        let phenotype_creator = PhenotypeCreator::from_config(&config.phenotype_config());
        let gym = config.gym.build();

        log::info!(
            "Experiment {} '{}': {:?} fitness, {} gym, advancing every {} evaluations",
            id,
            config.name,
            config.fitness,
            gym.name(),
            threshold
        );

        Ok(Self {
            id,
            gym,
            evolver,
            phenotype_creator,
            evaluation_pool: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            stopped: false,
            config,
        })
    }

    pub fn id(&self) -> ExperimentId {
        self.id
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn evolver(&self) -> &Evolver {
        &self.evolver
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.evolver.add_reporter(reporter);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Create the initial population; offline gyms also fill the evaluation pool
    pub fn instantiate(&mut self) -> Result<(), ExperimentError> {
        self.evaluation_pool.clear();
        self.stopped = false;
        self.evolver.create_new_population()?;
        self.fill_evaluation_pool()
    }

    /// Offline gyms keep `eval_pool_size - 1` individuals handed out between evaluations
    fn fill_evaluation_pool(&mut self) -> Result<(), ExperimentError> {
        if self.gym.is_simulated() {
            while self.evaluation_pool.len() + 1 < self.config.async_eval.eval_pool_size {
                if !self.simulate_request()? {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Hand out a random genome as a substrate network
    pub fn create_individual(&mut self) -> Result<Individual, ExperimentError> {
        let genome = self.evolver.random_available_genome()?.clone();
        let network = self
            .phenotype_creator
            .create_network(&genome, &self.evolver.config().genome)?;
        Ok(Individual {
            experiment_data: ExperimentData {
                experiment_id: self.id,
                genome_id: genome.key,
            },
            network,
        })
    }

    /// Hand out a random genome encoded for transport
    pub fn get_random_individual(&mut self) -> Result<PhenotypeData, ExperimentError> {
        let individual = self.create_individual()?;
        let new_mediator = encode_network(&individual.network)?;
        log::debug!(
            "Experiment {} sent genome {}",
            self.id,
            individual.experiment_data.genome_id
        );
        Ok(PhenotypeData {
            experiment_data: individual.experiment_data,
            new_mediator,
        })
    }

    /// Record one evaluation; returns whether the population advanced
    pub fn receive_evaluation(&mut self, data: EvaluationData) -> Result<bool, ExperimentError> {
        match self.evolver.handle_receive_user_data(data) {
            Ok(advanced) => {
                if self.evolver.is_solved() {
                    self.stop();
                }
                Ok(advanced)
            }
            Err(EvolutionError::CompleteExtinction) => {
                self.stop();
                Err(EvolutionError::CompleteExtinction.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Force a generation advance with whatever has been evaluated
    pub fn advance(&mut self) -> Result<(), ExperimentError> {
        self.evolver.advance_population()?;
        Ok(())
    }

    /// Pool one more individual; `false` when every genome is already out
    fn simulate_request(&mut self) -> Result<bool, ExperimentError> {
        match self.create_individual() {
            Ok(individual) => {
                self.evaluation_pool.push(individual);
                Ok(true)
            }
            Err(ExperimentError::Evolution(EvolutionError::NoGenomesAvailable))
                if !self.evaluation_pool.is_empty() =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Hand out one more individual, then evaluate a random pooled one
    pub fn run_simulation(&mut self) -> Result<(), ExperimentError> {
        if self.stopped {
            return Ok(());
        }
        if !self.gym.is_simulated() {
            return Err(ExperimentError::NotSimulated(self.gym.name()));
        }
        self.simulate_request()?;
        let index = self.rng.gen_range(0..self.evaluation_pool.len());
        let mut individual = self.evaluation_pool.swap_remove(index);
        let Some(data) = self.gym.run(&mut individual, &mut self.rng) else {
            return Ok(());
        };

        match self.receive_evaluation(data) {
            // pooled genome whose species went stagnant
            Err(ExperimentError::Evolution(EvolutionError::GenomeNotFound(genome_id))) => {
                log::debug!("Experiment {} dropped evaluation of removed genome {}", self.id, genome_id);
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    /// Simulate until `num_generations` is reached or the run stops on a
    /// solution or extinction. An experiment without a population is
    /// instantiated first; a restored one continues where it left off.
    pub fn start(&mut self, num_generations: Option<u32>) -> Result<(), ExperimentError> {
        if !self.gym.is_simulated() {
            return Err(ExperimentError::NotSimulated(self.gym.name()));
        }
        if self.evolver.population_size() == 0 {
            self.instantiate()?;
        } else {
            self.fill_evaluation_pool()?;
        }
        while !self.stopped {
            if num_generations.is_some_and(|n| self.evolver.generation() >= n) {
                break;
            }
            self.run_simulation()?;
        }
        log::info!(
            "Experiment {} finished at generation {}",
            self.id,
            self.evolver.generation()
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.stopped {
            log::info!("Stopping experiment {}", self.id);
        }
        self.stopped = true;
    }

    /// Discard the population and start over from generation 0
    pub fn reset(&mut self) -> Result<(), ExperimentError> {
        self.stop();
        self.evaluation_pool.clear();
        self.evolver.reset()?;
        self.stopped = false;
        self.fill_evaluation_pool()
    }

    pub fn pooled_genomes(&self) -> Vec<GenomeId> {
        self.evaluation_pool
            .iter()
            .map(|i| i.experiment_data.genome_id)
            .collect()
    }

    pub fn status(&self) -> ExperimentStatus {
        ExperimentStatus {
            experiment_id: self.id,
            name: self.config.name.clone(),
            generation: self.evolver.generation(),
            population_size: self.evolver.population_size(),
            species_count: self.evolver.species().len(),
            evaluated_count: self.evolver.genomes().evaluated().len(),
            evaluation_threshold: self.evolver.evaluation_threshold(),
            best_fitness: self.evolver.best_genome().and_then(|g| g.fitness),
            solved: self.evolver.is_solved(),
            stopped: self.stopped,
        }
    }

    pub fn state(&self) -> EvolverState {
        self.evolver.state()
    }

    /// Resume from a checkpointed state; pooled individuals are discarded
    pub fn restore(&mut self, state: EvolverState) {
        self.evaluation_pool.clear();
        self.stopped = state.solved;
        self.evolver.restore(state);
    }
}

/// Errors raised by experiments and the lab
#[derive(Debug)]
pub enum ExperimentError {
    Config(ConfigError),
    InvalidConfig(String),
    Evolution(EvolutionError),
    Phenotype(PhenotypeError),
    UnknownExperiment(ExperimentId),
    NoExperiments,
    /// The gym cannot produce evaluations locally
    NotSimulated(&'static str),
}

impl std::fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::InvalidConfig(msg) => write!(f, "Invalid experiment config: {}", msg),
            Self::Evolution(e) => write!(f, "{}", e),
            Self::Phenotype(e) => write!(f, "Phenotype error: {}", e),
            Self::UnknownExperiment(id) => write!(f, "Unknown experiment {}", id),
            Self::NoExperiments => write!(f, "No experiments in the lab"),
            Self::NotSimulated(gym) => write!(f, "The {} gym does not run simulations", gym),
        }
    }
}

impl std::error::Error for ExperimentError {}

impl From<ConfigError> for ExperimentError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<EvolutionError> for ExperimentError {
    fn from(e: EvolutionError) -> Self {
        Self::Evolution(e)
    }
}

impl From<PhenotypeError> for ExperimentError {
    fn from(e: PhenotypeError) -> Self {
        Self::Phenotype(e)
    }
}
