use crate::fitness::FitnessKind;
use crate::gym::GymKind;
use crate::neat_config::NeatConfig;
use crate::phenotype::PhenotypeConfig;
use crate::stats::StatFunction;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How many individuals are out for evaluation and when to advance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncEvalConfig {
    /// Individuals simulated concurrently by an offline gym
    pub eval_pool_size: usize,
    /// Fraction of `pop_size` that must be evaluated before advancing
    pub eval_threshold: f64,
}

impl Default for AsyncEvalConfig {
    fn default() -> Self {
        Self {
            eval_pool_size: 10,
            eval_threshold: 0.4,
        }
    }
}

/// One experiment entry of the application config.
///
/// The `Option` fields override the matching `[NEAT]` values of the
/// parameter file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: String,
    pub neat_config_path: PathBuf,
    pub num_generations: u32,
    pub fitness: FitnessKind,
    pub gym: GymKind,
    pub pop_size: Option<usize>,
    pub fitness_criterion: Option<StatFunction>,
    pub fitness_threshold: Option<f64>,
    pub reset_on_extinction: Option<bool>,
    pub async_eval: AsyncEvalConfig,
    /// Substrate and quadtree parameters; the gym's default when absent
    pub phenotype: Option<PhenotypeConfig>,
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "social_brain".to_string(),
            neat_config_path: PathBuf::from("config/config_cppn_social_brain.ini"),
            num_generations: 5,
            fitness: FitnessKind::UserEvaluated,
            gym: GymKind::Online,
            pop_size: None,
            fitness_criterion: None,
            fitness_threshold: None,
            reset_on_extinction: None,
            async_eval: AsyncEvalConfig::default(),
            phenotype: None,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Offline XOR run matching `config/config_cppn_xor.ini`
    pub fn xor() -> Self {
        Self {
            name: "xor".to_string(),
            neat_config_path: PathBuf::from("config/config_cppn_xor.ini"),
            fitness: FitnessKind::Xor,
            gym: GymKind::Xor,
            ..Self::default()
        }
    }

    pub fn phenotype_config(&self) -> PhenotypeConfig {
        self.phenotype
            .clone()
            .unwrap_or_else(|| self.gym.default_phenotype())
    }

    /// Write the overrides into a loaded parameter file
    pub fn apply_overrides(&self, neat: &mut NeatConfig) {
        if let Some(pop_size) = self.pop_size {
            neat.neat.pop_size = pop_size;
        }
        if let Some(criterion) = self.fitness_criterion {
            neat.neat.fitness_criterion = criterion;
        }
        if let Some(threshold) = self.fitness_threshold {
            neat.neat.fitness_threshold = threshold;
        }
        if let Some(reset) = self.reset_on_extinction {
            neat.neat.reset_on_extinction = reset;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("experiment name cannot be empty".to_string());
        }
        if self.pop_size == Some(0) {
            return Err(format!("{}: pop_size must be > 0", self.name));
        }
        if self.async_eval.eval_pool_size == 0 {
            return Err(format!("{}: eval_pool_size must be > 0", self.name));
        }
        if self.async_eval.eval_threshold <= 0.0 || self.async_eval.eval_threshold > 1.0 {
            return Err(format!("{}: eval_threshold must be in (0, 1]", self.name));
        }
        if self.fitness_criterion == Some(StatFunction::Median) {
            return Err(format!("{}: fitness_criterion must be max, min or mean", self.name));
        }
        match (self.fitness, self.gym) {
            (FitnessKind::Xor, GymKind::Xor)
            | (FitnessKind::UserEvaluated, GymKind::SimulatedUser | GymKind::Online) => {}
            (fitness, gym) => {
                return Err(format!(
                    "{}: {:?} fitness cannot score data from the {:?} gym",
                    self.name, fitness, gym
                ))
            }
        }
        self.phenotype_config()
            .validate()
            .map_err(|e| format!("{}: {}", self.name, e))
    }
}
