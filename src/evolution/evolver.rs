//! The mixed-generation evolution loop.

use super::evaluation::Evaluation;
use super::genome_manager::GenomeManager;
use super::population::PopulationManager;
use super::reporting::{Reporter, ReporterSet};
use super::reproduction::Reproduction;
use super::speciation::Speciation;
use super::species_set::SpeciesSet;
use super::stagnation::Stagnation;
use super::EvolutionError;
use crate::fitness::FitnessFunction;
use crate::genome::{Genome, GenomeId};
use crate::models::EvaluationData;
use crate::neat_config::NeatConfig;
use crate::stats::{FitnessStats, GenerationSummary};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Everything needed to resume an evolver
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvolverState {
    pub generation: u32,
    pub genomes: GenomeManager,
    pub species: SpeciesSet,
    pub reproduction: Reproduction,
    pub best_genome: Option<Genome>,
    pub solved: bool,
}

/// Evolves one population as evaluations trickle in.
///
/// Evaluations are recorded per genome; once `evaluation_threshold` genomes
/// have been evaluated the population advances one generation.
pub struct Evolver {
    config: NeatConfig,
    population: PopulationManager,
    speciation: Speciation,
    stagnation: Stagnation,
    reproduction: Reproduction,
    evaluation: Evaluation,
    reporters: ReporterSet,
    rng: ChaCha8Rng,
    seed: u64,
    best_genome: Option<Genome>,
    last_summary: Option<GenerationSummary>,
    solved: bool,
}

impl Evolver {
    /// Create an evolver without a population; see [`Evolver::create_new_population`]
    pub fn new(
        config: NeatConfig,
        fitness_function: Box<dyn FitnessFunction>,
        evaluation_threshold: usize,
        seed: u64,
    ) -> Self {
        Self {
            speciation: Speciation::new(&config.speciation),
            stagnation: Stagnation::new(&config.stagnation),
            reproduction: Reproduction::new(&config.reproduction),
            evaluation: Evaluation::new(&config.neat, fitness_function, evaluation_threshold),
            population: PopulationManager::new(),
            reporters: ReporterSet::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            best_genome: None,
            last_summary: None,
            solved: false,
            config,
        }
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.add(reporter);
    }

    /// Replace the population with `pop_size` fresh genomes and speciate them
    pub fn create_new_population(&mut self) -> Result<(), EvolutionError> {
        let genomes =
            self.reproduction
                .create_new_genomes(self.config.neat.pop_size, &self.config.genome, &mut self.rng);
        self.population.set_new_population(genomes);
        self.population.species.reset();
        self.speciation.speciate(
            &mut self.population.species,
            self.population.genomes.genomes(),
            &self.config.genome,
            self.population.generation,
        )?;
        log::info!(
            "Created population of {} genomes in {} species",
            self.population.genomes.len(),
            self.population.species.len()
        );
        Ok(())
    }

    /// Start over from generation 0
    pub fn reset(&mut self) -> Result<(), EvolutionError> {
        self.population.reset();
        self.best_genome = None;
        self.last_summary = None;
        self.solved = false;
        self.create_new_population()
    }

    /// Hand out a random genome nobody is evaluating
    pub fn random_available_genome(&mut self) -> Result<&Genome, EvolutionError> {
        self.population.random_available_genome(&mut self.rng)
    }

    /// Record an evaluation, advancing the population once enough have arrived.
    ///
    /// Genome id 0 marks a client that has not been given a genome yet and is
    /// ignored. Returns whether a generation advance ran.
    pub fn handle_receive_user_data(&mut self, data: EvaluationData) -> Result<bool, EvolutionError> {
        let genome_id = data.experiment_data().genome_id;
        if genome_id == 0 {
            return Ok(false);
        }
        self.population.genomes.update_genome_data(genome_id, data)?;

        if self.solved {
            log::debug!("Evaluation of genome {} received after a solution was found", genome_id);
            return Ok(false);
        }
        if self.evaluation.threshold_reached(self.population.genomes.evaluated().len()) {
            self.advance_population()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Score the evaluated genomes, then reproduce them unless the fitness goal is met
    pub fn advance_population(&mut self) -> Result<(), EvolutionError> {
        let generation = self.population.generation;
        self.reporters.start_generation(generation);
        let start_size = self.population.genomes.len();

        let outcome = self.evaluation.evaluate(&mut self.population.genomes)?;
        let best = self.population.genomes.get(outcome.best)?.clone();
        self.reporters.post_evaluate(generation, &outcome.stats, &best);
        self.track_best_genome(&best);

        if self.evaluation.fitness_goal_reached(outcome.summary) {
            self.solved = true;
            self.reporters.found_solution(generation, &best);
            return Ok(());
        }
        self.reproduce_and_update_generation(outcome.stats, start_size)
    }

    fn reproduce_and_update_generation(
        &mut self,
        stats: FitnessStats,
        start_size: usize,
    ) -> Result<(), EvolutionError> {
        let generation = self.population.generation;

        let evaluated = self.population.genomes.evaluated().clone();
        let stagnant = self.stagnation.update(
            &mut self.population.species,
            self.population.genomes.genomes(),
            &evaluated,
            generation,
        );
        for (species_id, is_stagnant) in stagnant {
            if is_stagnant {
                let size = self.population.species.get(species_id)?.members.len();
                self.reporters.species_stagnant(species_id, size);
                self.population.species.mark_stagnant(species_id)?;
            }
        }
        for species in self.population.species.remove_stagnant_species() {
            for genome_id in species.members {
                self.population.genomes.remove_genome(genome_id);
            }
        }
        if self.population.species.active_species().is_empty() {
            return self.handle_extinction();
        }

        let evaluated = self.population.genomes.evaluated().clone();
        let survivors = self.population.genomes.len() - evaluated.len();
        let slots = self.config.neat.pop_size.saturating_sub(survivors);
        let outcome = {
            let mut active = self.population.species.active_species_mut();
            self.reproduction.reproduce_evaluated(
                &mut active,
                self.population.genomes.genomes(),
                &evaluated,
                slots,
                &self.config.genome,
                &mut self.rng,
            )?
        };

        let genomes = &mut self.population.genomes;
        for genome_id in &outcome.dead {
            genomes.remove_genome(*genome_id);
        }
        genomes.clear_evaluated();
        genomes.clear_elites();
        for genome_id in &outcome.elites {
            genomes.set_elite(*genome_id);
        }
        let offspring_count = outcome.offspring.len();
        genomes.add_genomes(outcome.offspring);
        self.reporters
            .post_reproduction(generation, offspring_count, outcome.dead.len());

        let next_generation = self.population.update_generation();
        self.speciation.speciate(
            &mut self.population.species,
            self.population.genomes.genomes(),
            &self.config.genome,
            next_generation,
        )?;
        if self.population.species.is_empty() {
            return self.handle_extinction();
        }

        let summary = GenerationSummary {
            generation,
            population_start_size: start_size,
            population_end_size: self.population.genomes.len(),
            active_species_count: self.population.species.active_species().len(),
            fitness_summary: stats,
        };
        self.reporters.end_generation(&summary);
        self.last_summary = Some(summary);
        Ok(())
    }

    fn track_best_genome(&mut self, candidate: &Genome) {
        let better = self
            .best_genome
            .as_ref()
            .map_or(true, |best| candidate.fitness_or_min() > best.fitness_or_min());
        if better {
            self.best_genome = Some(candidate.clone());
        }
    }

    fn handle_extinction(&mut self) -> Result<(), EvolutionError> {
        self.reporters.complete_extinction();
        if self.config.neat.reset_on_extinction {
            self.create_new_population()
        } else {
            Err(EvolutionError::CompleteExtinction)
        }
    }

    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    pub fn generation(&self) -> u32 {
        self.population.generation
    }

    pub fn genomes(&self) -> &GenomeManager {
        &self.population.genomes
    }

    pub fn genome(&self, genome_id: GenomeId) -> Result<&Genome, EvolutionError> {
        self.population.genomes.get(genome_id)
    }

    pub fn species(&self) -> &SpeciesSet {
        &self.population.species
    }

    pub fn population_size(&self) -> usize {
        self.population.genomes.len()
    }

    pub fn evaluation_threshold(&self) -> usize {
        self.evaluation.evaluation_threshold()
    }

    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_genome.as_ref()
    }

    pub fn last_summary(&self) -> Option<&GenerationSummary> {
        self.last_summary.as_ref()
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn reproduction(&self) -> &Reproduction {
        &self.reproduction
    }

    pub fn state(&self) -> EvolverState {
        EvolverState {
            generation: self.population.generation,
            genomes: self.population.genomes.clone(),
            species: self.population.species.clone(),
            reproduction: self.reproduction.clone(),
            best_genome: self.best_genome.clone(),
            solved: self.solved,
        }
    }

    /// Resume from a saved state
    pub fn restore(&mut self, state: EvolverState) {
        self.population.generation = state.generation;
        self.population.genomes = state.genomes;
        self.population.species = state.species;
        self.reproduction = state.reproduction;
        self.best_genome = state.best_genome;
        self.solved = state.solved;
        self.last_summary = None;

        if let Some(max_id) = self.population.genomes.max_genome_id() {
            self.reproduction.ensure_ids_above(max_id);
        }
        let node_keys: Vec<_> = self
            .population
            .genomes
            .genomes()
            .values()
            .flat_map(|g| g.nodes.keys().copied())
            .collect();
        self.config.genome.node_indexer.next_key(&node_keys);
        self.rng = ChaCha8Rng::seed_from_u64(self.seed ^ u64::from(state.generation));
    }
}
