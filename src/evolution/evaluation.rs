use super::genome_manager::GenomeManager;
use super::EvolutionError;
use crate::fitness::FitnessFunction;
use crate::genome::GenomeId;
use crate::models::EvaluationData;
use crate::neat_config::NeatSection;
use crate::stats::{FitnessStats, StatFunction};

/// Number of evaluations that triggers a generation advance:
/// `ceil(fraction * pop_size)`, at least one.
pub fn evaluation_count(fraction: f64, pop_size: usize) -> usize {
    ((fraction * pop_size as f64).ceil() as usize).max(1)
}

/// Scores of one evaluated batch
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub stats: FitnessStats,
    pub best: GenomeId,
    /// `fitness_criterion` over the batch
    pub summary: f64,
}

/// Fitness scoring and the termination check
pub struct Evaluation {
    fitness_function: Box<dyn FitnessFunction>,
    fitness_criterion: StatFunction,
    fitness_threshold: f64,
    no_fitness_termination: bool,
    evaluation_threshold: usize,
}

impl Evaluation {
    pub fn new(
        config: &NeatSection,
        fitness_function: Box<dyn FitnessFunction>,
        evaluation_threshold: usize,
    ) -> Self {
        Self {
            fitness_function,
            fitness_criterion: config.fitness_criterion,
            fitness_threshold: config.fitness_threshold,
            no_fitness_termination: config.no_fitness_termination,
            evaluation_threshold: evaluation_threshold.max(1),
        }
    }

    pub fn evaluation_threshold(&self) -> usize {
        self.evaluation_threshold
    }

    pub fn fitness_function_name(&self) -> &'static str {
        self.fitness_function.name()
    }

    pub fn threshold_reached(&self, evaluated_count: usize) -> bool {
        evaluated_count >= self.evaluation_threshold
    }

    /// Score every evaluated genome and store the fitnesses
    pub fn evaluate(&self, genomes: &mut GenomeManager) -> Result<EvaluationOutcome, EvolutionError> {
        let ids: Vec<GenomeId> = genomes.evaluated().iter().copied().collect();
        let batch: Vec<(GenomeId, &EvaluationData)> = ids
            .iter()
            .filter_map(|id| {
                genomes
                    .get(*id)
                    .ok()
                    .and_then(|g| g.data.as_ref())
                    .map(|data| (*id, data))
            })
            .collect();
        if batch.is_empty() {
            return Err(EvolutionError::NothingEvaluated);
        }

        let data: Vec<&EvaluationData> = batch.iter().map(|(_, d)| *d).collect();
        let fitnesses = self.fitness_function.evaluate(&data)?;
        let scored: Vec<(GenomeId, f64)> = batch
            .iter()
            .map(|(id, _)| *id)
            .zip(fitnesses.iter().copied())
            .collect();

        let mut best = scored[0];
        for &(id, fitness) in &scored {
            genomes.set_fitness(id, fitness)?;
            if fitness > best.1 {
                best = (id, fitness);
            }
        }

        Ok(EvaluationOutcome {
            stats: FitnessStats::from_fitnesses(&fitnesses),
            best: best.0,
            summary: self.fitness_criterion.apply(&fitnesses).unwrap_or(best.1),
        })
    }

    /// Whether `summary` meets `fitness_threshold`
    pub fn fitness_goal_reached(&self, summary: f64) -> bool {
        !self.no_fitness_termination && summary >= self.fitness_threshold
    }
}

impl std::fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluation")
            .field("fitness_function", &self.fitness_function.name())
            .field("fitness_criterion", &self.fitness_criterion)
            .field("fitness_threshold", &self.fitness_threshold)
            .field("evaluation_threshold", &self.evaluation_threshold)
            .finish()
    }
}
