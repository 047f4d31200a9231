//! Creates genomes from scratch or from the evaluated members of each species.

use super::fitness_manager::FitnessManager;
use super::species::{Species, SpeciesId};
use super::{EvolutionError, Population};
use crate::genome::{Genome, GenomeConfig, GenomeId};
use crate::neat_config::ReproductionConfig;
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Offspring allocation across species
#[derive(Debug)]
pub struct SpeciesReproduction {
    min_species_size: usize,
    fitness_manager: FitnessManager,
}

impl SpeciesReproduction {
    pub fn new(min_species_size: usize) -> Self {
        Self {
            min_species_size,
            fitness_manager: FitnessManager::new(),
        }
    }

    /// Number of genomes (elites included) each species contributes to the
    /// `slots` free places of the next generation.
    pub fn compute_offspring_counts(
        &mut self,
        species: &mut [&mut Species],
        population: &Population,
        evaluated: &BTreeSet<GenomeId>,
        slots: usize,
    ) -> Vec<usize> {
        for s in species.iter_mut() {
            s.dying_count = s.evaluated_count(evaluated);
        }
        self.fitness_manager.adjust_fitnesses(species, population, evaluated);
        let total_adjusted_fitness: f64 = species.iter().filter_map(|s| s.adjusted_fitness).sum();

        let deficits: Vec<i64> = species
            .iter()
            .map(|s| {
                let expected = s.compute_expected_size(self.min_species_size, total_adjusted_fitness, slots);
                s.compute_pop_deficit(expected)
            })
            .collect();
        self.normalize_spawn_counts(slots, &deficits)
    }

    /// Scale deficits so they sum to roughly `total`, each at least the
    /// minimum species size.
    pub fn normalize_spawn_counts(&self, total: usize, deficits: &[i64]) -> Vec<usize> {
        let total_deficit: i64 = deficits.iter().sum();
        if total_deficit == 0 {
            return vec![self.min_species_size; deficits.len()];
        }
        let norm = total as f64 / total_deficit as f64;
        deficits
            .iter()
            .map(|d| {
                let normalized = (*d as f64 * norm).round_ties_even() as i64;
                normalized.max(self.min_species_size as i64) as usize
            })
            .collect()
    }

    /// Remove the evaluated non-elite members, returning their ids
    pub fn process_dying_parents(
        &self,
        species: &mut Species,
        sorted_parents: &[GenomeId],
        elites: &[GenomeId],
    ) -> BTreeSet<GenomeId> {
        let dying: BTreeSet<GenomeId> = sorted_parents
            .iter()
            .filter(|id| !elites.contains(id))
            .copied()
            .collect();
        species.kill_members(&dying);
        dying
    }
}

/// Keeps the best evaluated members of a species alive
#[derive(Debug, Clone, Copy)]
pub struct Elites {
    pub elitism: usize,
}

impl Elites {
    pub fn new(elitism: usize) -> Self {
        Self { elitism }
    }

    pub fn elitism_count(&self, offspring_count: usize) -> usize {
        offspring_count.min(self.elitism)
    }

    pub fn preserve(&self, sorted_parents: &[GenomeId], offspring_count: usize) -> Vec<GenomeId> {
        sorted_parents
            .iter()
            .take(self.elitism_count(offspring_count))
            .copied()
            .collect()
    }
}

/// Breeds children and hands out genome ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffspringGenerator {
    next_genome_id: GenomeId,
    pub survival_threshold: f64,
    pub min_species_size: usize,
}

impl OffspringGenerator {
    pub fn new(config: &ReproductionConfig) -> Self {
        Self {
            next_genome_id: 1,
            survival_threshold: config.survival_threshold,
            min_species_size: config.min_species_size,
        }
    }

    pub fn next_genome_id(&mut self) -> GenomeId {
        let id = self.next_genome_id;
        self.next_genome_id += 1;
        id
    }

    /// Never hand out an id at or below `floor`
    pub fn ensure_above(&mut self, floor: GenomeId) {
        self.next_genome_id = self.next_genome_id.max(floor + 1);
    }

    pub fn create_without_parents<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Vec<Genome> {
        (0..count)
            .map(|_| {
                let id = self.next_genome_id();
                Genome::new_random(id, config, rng)
            })
            .collect()
    }

    /// Members allowed to reproduce out of `parent_count` sorted parents
    pub fn reproduction_cutoff(&self, parent_count: usize) -> usize {
        let by_threshold = (self.survival_threshold * parent_count as f64).ceil() as usize;
        by_threshold.max(self.min_species_size).min(parent_count)
    }

    /// Produce `spawn` children from the top of `parents` (best first).
    ///
    /// Two distinct parents are drawn per child; a single surviving parent
    /// reproduces asexually.
    pub fn create_offspring<R: Rng + ?Sized>(
        &mut self,
        parents: &[&Genome],
        spawn: usize,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Vec<(Genome, (GenomeId, GenomeId))> {
        let cutoff = self.reproduction_cutoff(parents.len());
        let selected = &parents[..cutoff];
        let mut children = Vec::with_capacity(spawn);
        for _ in 0..spawn {
            let (a, b) = if selected.len() >= 2 {
                let picked = sample(rng, selected.len(), 2);
                (selected[picked.index(0)], selected[picked.index(1)])
            } else {
                (selected[0], selected[0])
            };
            let id = self.next_genome_id();
            let mut child = Genome::crossover(id, a, b, rng);
            child.mutate(config, rng);
            children.push((child, (a.key, b.key)));
        }
        children
    }
}

/// Result of one reproduction round
#[derive(Debug, Default)]
pub struct ReproductionOutcome {
    pub offspring: Vec<Genome>,
    pub elites: Vec<GenomeId>,
    pub dead: BTreeSet<GenomeId>,
}

/// Mixed-generation reproduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reproduction {
    config: ReproductionConfig,
    generator: OffspringGenerator,
    /// Parents of every genome created so far (empty for initial genomes)
    ancestors: BTreeMap<GenomeId, Vec<GenomeId>>,
}

impl Reproduction {
    pub fn new(config: &ReproductionConfig) -> Self {
        Self {
            config: config.clone(),
            generator: OffspringGenerator::new(config),
            ancestors: BTreeMap::new(),
        }
    }

    /// Smallest allocation any species receives
    pub fn min_species_size(&self) -> usize {
        self.config.min_species_size.max(self.config.elitism)
    }

    pub fn ancestors(&self) -> &BTreeMap<GenomeId, Vec<GenomeId>> {
        &self.ancestors
    }

    pub fn ensure_ids_above(&mut self, floor: GenomeId) {
        self.generator.ensure_above(floor);
    }

    pub fn create_new_genomes<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Vec<Genome> {
        let genomes = self.generator.create_without_parents(count, config, rng);
        for genome in &genomes {
            self.ancestors.insert(genome.key, Vec::new());
        }
        genomes
    }

    /// Replace the evaluated members of `active_species`.
    ///
    /// The allocation of `slots` decides how many elites each species keeps.
    /// Every other evaluated member dies and is replaced by one child bred
    /// from the species' evaluated members, so the population size is
    /// unchanged. A species without evaluated members is left alone.
    pub fn reproduce_evaluated<R: Rng + ?Sized>(
        &mut self,
        active_species: &mut [&mut Species],
        population: &Population,
        evaluated: &BTreeSet<GenomeId>,
        slots: usize,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Result<ReproductionOutcome, EvolutionError> {
        let mut species_reproduction = SpeciesReproduction::new(self.min_species_size());
        let offspring_counts =
            species_reproduction.compute_offspring_counts(active_species, population, evaluated, slots);
        let elites = Elites::new(self.config.elitism);

        let mut outcome = ReproductionOutcome::default();
        for (species, &count) in active_species.iter_mut().zip(&offspring_counts) {
            let sorted_parents = species.sorted_by_fitness(population, evaluated);
            let kept = elites.preserve(&sorted_parents, count);
            let dying = species_reproduction.process_dying_parents(species, &sorted_parents, &kept);
            let spawn = dying.len();
            if spawn > 0 {
                let parents = lookup(&sorted_parents, population, species.key)?;
                for (child, (a, b)) in self.generator.create_offspring(&parents, spawn, config, rng) {
                    self.ancestors.insert(child.key, vec![a, b]);
                    outcome.offspring.push(child);
                }
            }
            log::debug!(
                "Species {}: {} evaluated, {} elites, {} offspring",
                species.key,
                sorted_parents.len(),
                kept.len(),
                spawn
            );
            outcome.elites.extend(kept);
            outcome.dead.extend(dying);
        }
        Ok(outcome)
    }
}

fn lookup<'a>(
    ids: &[GenomeId],
    population: &'a Population,
    species_id: SpeciesId,
) -> Result<Vec<&'a Genome>, EvolutionError> {
    if ids.is_empty() {
        return Err(EvolutionError::InsufficientParents(species_id));
    }
    ids.iter()
        .map(|id| population.get(id).ok_or(EvolutionError::GenomeNotFound(*id)))
        .collect()
}
