//! Running many experiments side by side.
//!
//! The lab owns a set of experiments, routes individuals and evaluations
//! to them by experiment id and records what happens through a
//! [`NoteTaker`] per experiment.

mod analyst;
mod note_taker;

pub use analyst::{
    AggregatedStatistics, Analyst, FitnessStatsSummary, GenerationStats, QuartileStatistics,
    SummaryStatistics,
};
pub use note_taker::{EventKind, ExperimentEvent, ExperimentRecord, NoteTaker};

use crate::evolution::LogReporter;
use crate::experiment::{Experiment, ExperimentConfig, ExperimentError, ExperimentId, ExperimentStatus};
use crate::models::{EvaluationData, PhenotypeData};
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Parameter grid: dot path into an [`ExperimentConfig`] to candidate values
pub type ParameterGrid = BTreeMap<String, Vec<Value>>;

pub struct Lab {
    experiments: BTreeMap<ExperimentId, Experiment>,
    note_takers: BTreeMap<ExperimentId, NoteTaker>,
    next_experiment_id: ExperimentId,
    rng: ChaCha8Rng,
}

impl Default for Lab {
    fn default() -> Self {
        Self::new()
    }
}

impl Lab {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            experiments: BTreeMap::new(),
            note_takers: BTreeMap::new(),
            next_experiment_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    pub fn experiment_ids(&self) -> Vec<ExperimentId> {
        self.experiments.keys().copied().collect()
    }

    pub fn experiment(&self, id: ExperimentId) -> Result<&Experiment, ExperimentError> {
        self.experiments
            .get(&id)
            .ok_or(ExperimentError::UnknownExperiment(id))
    }

    pub fn experiment_mut(&mut self, id: ExperimentId) -> Result<&mut Experiment, ExperimentError> {
        self.experiments
            .get_mut(&id)
            .ok_or(ExperimentError::UnknownExperiment(id))
    }

    /// Register an experiment built elsewhere, assigning it the next id
    pub fn add_experiment(
        &mut self,
        build: impl FnOnce(ExperimentId) -> Result<Experiment, ExperimentError>,
    ) -> Result<ExperimentId, ExperimentError> {
        let id = self.next_experiment_id;
        let mut experiment = build(id)?;
        self.next_experiment_id += 1;

        let note_taker = NoteTaker::new(id);
        experiment.add_reporter(Box::new(note_taker.clone()));
        experiment.add_reporter(Box::new(LogReporter::new(format!(
            "{}#{}",
            experiment.config().name,
            id
        ))));
        self.note_takers.insert(id, note_taker);
        self.experiments.insert(id, experiment);
        Ok(id)
    }

    pub fn add_simple_experiment(&mut self, config: ExperimentConfig) -> Result<ExperimentId, ExperimentError> {
        self.add_experiment(|id| Experiment::new(id, config))
    }

    /// One experiment per point of the cartesian product of `parameters`
    pub fn add_parameterized_experiment(
        &mut self,
        base: &ExperimentConfig,
        parameters: &ParameterGrid,
    ) -> Result<Vec<ExperimentId>, ExperimentError> {
        let mut ids = Vec::new();
        for combination in parameter_combinations(parameters) {
            let config = merge_config(base, &combination)?;
            log::info!("Adding experiment {}", config.name);
            ids.push(self.add_simple_experiment(config)?);
        }
        Ok(ids)
    }

    pub fn add_comparison_experiment(
        &mut self,
        a: ExperimentConfig,
        b: ExperimentConfig,
    ) -> Result<(ExperimentId, ExperimentId), ExperimentError> {
        Ok((self.add_simple_experiment(a)?, self.add_simple_experiment(b)?))
    }

    pub fn instantiate_experiments(&mut self) -> Result<(), ExperimentError> {
        for experiment in self.experiments.values_mut() {
            experiment.instantiate()?;
            log::info!("Instantiated experiment {}", experiment.id());
        }
        Ok(())
    }

    /// Hand out an individual from a random experiment
    pub fn sample_random_experiment(&mut self) -> Result<PhenotypeData, ExperimentError> {
        let id = self
            .experiments
            .keys()
            .copied()
            .choose(&mut self.rng)
            .ok_or(ExperimentError::NoExperiments)?;
        self.sample_individual_from_experiment(id)
    }

    pub fn sample_individual_from_experiment(
        &mut self,
        id: ExperimentId,
    ) -> Result<PhenotypeData, ExperimentError> {
        self.experiment_mut(id)?.get_random_individual()
    }

    /// Route an evaluation to the experiment named in its experiment data
    pub fn return_individual_to_experiment(&mut self, data: EvaluationData) -> Result<bool, ExperimentError> {
        let id = data.experiment_data().experiment_id;
        self.experiment_mut(id)?.receive_evaluation(data)
    }

    /// Run every experiment for its configured generations, in parallel
    pub fn run_scenarios(&mut self) -> Vec<(ExperimentId, Result<(), ExperimentError>)> {
        let mut results: Vec<_> = self
            .experiments
            .par_iter_mut()
            .map(|(&id, experiment)| {
                let generations = experiment.config().num_generations;
                log::info!(
                    "Running experiment {} for {} generations with eval threshold {}",
                    id,
                    generations,
                    experiment.config().async_eval.eval_threshold
                );
                (id, experiment.start(Some(generations)))
            })
            .collect();
        results.sort_by_key(|(id, _)| *id);

        for (id, result) in &results {
            if let Err(e) = result {
                log::error!("Experiment {} failed: {}", id, e);
            }
        }
        results
    }

    pub fn statuses(&self) -> Vec<ExperimentStatus> {
        self.experiments.values().map(Experiment::status).collect()
    }

    pub fn records(&self) -> Vec<ExperimentRecord> {
        self.note_takers.values().map(NoteTaker::record).collect()
    }

    pub fn record(&self, id: ExperimentId) -> Result<ExperimentRecord, ExperimentError> {
        self.note_takers
            .get(&id)
            .map(NoteTaker::record)
            .ok_or(ExperimentError::UnknownExperiment(id))
    }

    pub fn statistics(&self) -> AggregatedStatistics {
        let records = self.records();
        Analyst::new(&records).compute_aggregated_statistics()
    }

    /// Restart every experiment and forget recorded history
    pub fn reset(&mut self) -> Result<(), ExperimentError> {
        for experiment in self.experiments.values_mut() {
            experiment.reset()?;
        }
        self.note_takers.values().for_each(NoteTaker::clear);
        Ok(())
    }
}

/// Cartesian product of the grid, in key order
pub fn parameter_combinations(parameters: &ParameterGrid) -> Vec<Vec<(String, Value)>> {
    let mut combinations: Vec<Vec<(String, Value)>> = vec![Vec::new()];
    for (key, values) in parameters {
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push((key.clone(), value.clone()));
                    next
                })
            })
            .collect();
    }
    combinations
}

/// Apply dot-path overrides to `base`; the name records the overrides
pub fn merge_config(
    base: &ExperimentConfig,
    overrides: &[(String, Value)],
) -> Result<ExperimentConfig, ExperimentError> {
    let invalid = |e: serde_yaml::Error| ExperimentError::InvalidConfig(e.to_string());
    let mut root = serde_yaml::to_value(base).map_err(invalid)?;
    for (path, value) in overrides {
        set_path(&mut root, path, value.clone())?;
    }
    let mut config: ExperimentConfig = serde_yaml::from_value(root).map_err(invalid)?;

    if !overrides.is_empty() {
        let labels: Vec<String> = overrides
            .iter()
            .map(|(path, value)| format!("{}={}", path, render(value)))
            .collect();
        config.name = format!("{}[{}]", base.name, labels.join(","));
    }
    Ok(config)
}

fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), ExperimentError> {
    let not_a_section = || ExperimentError::InvalidConfig(format!("'{}' does not name a config field", path));
    let (parents, last) = match path.rsplit_once('.') {
        Some((parents, last)) => (parents.split('.').collect::<Vec<_>>(), last),
        None => (Vec::new(), path),
    };

    let mut current = root;
    for key in parents {
        let mapping = match current {
            Value::Mapping(mapping) => mapping,
            _ => return Err(not_a_section()),
        };
        let key = Value::String(key.to_string());
        if !matches!(mapping.get(&key), Some(Value::Mapping(_))) {
            mapping.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        current = mapping.get_mut(&key).ok_or_else(not_a_section)?;
    }
    match current {
        Value::Mapping(mapping) => {
            mapping.insert(Value::String(last.to_string()), value);
            Ok(())
        }
        _ => Err(not_a_section()),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
