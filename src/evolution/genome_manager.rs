//! Ownership and bookkeeping of the live genomes.

use super::{EvolutionError, Population};
use crate::genome::{Genome, GenomeId};
use crate::models::EvaluationData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Genome store tracking which genomes are free to hand out, which have
/// been evaluated this generation and which survived as elites.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenomeManager {
    genomes: Population,
    free: BTreeSet<GenomeId>,
    evaluated: BTreeSet<GenomeId>,
    elites: BTreeSet<GenomeId>,
}

impl GenomeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.genomes.clear();
        self.free.clear();
        self.evaluated.clear();
        self.elites.clear();
    }

    pub fn add_genome(&mut self, genome: Genome) {
        self.free.insert(genome.key);
        self.genomes.insert(genome.key, genome);
    }

    pub fn add_genomes(&mut self, genomes: impl IntoIterator<Item = Genome>) {
        for genome in genomes {
            self.add_genome(genome);
        }
    }

    pub fn remove_genome(&mut self, genome_id: GenomeId) -> Option<Genome> {
        self.free.remove(&genome_id);
        self.evaluated.remove(&genome_id);
        self.elites.remove(&genome_id);
        self.genomes.remove(&genome_id)
    }

    pub fn get(&self, genome_id: GenomeId) -> Result<&Genome, EvolutionError> {
        self.genomes
            .get(&genome_id)
            .ok_or(EvolutionError::GenomeNotFound(genome_id))
    }

    pub fn genomes(&self) -> &Population {
        &self.genomes
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn max_genome_id(&self) -> Option<GenomeId> {
        self.genomes.keys().next_back().copied()
    }

    /// The genome has been handed out for evaluation
    pub fn set_unavailable(&mut self, genome_id: GenomeId) {
        self.free.remove(&genome_id);
    }

    pub fn set_evaluated(&mut self, genome_id: GenomeId) {
        self.evaluated.insert(genome_id);
    }

    /// Elites stay alive and can be handed out again
    pub fn set_elite(&mut self, genome_id: GenomeId) {
        self.elites.insert(genome_id);
        self.free.insert(genome_id);
    }

    pub fn clear_evaluated(&mut self) {
        self.evaluated.clear();
    }

    pub fn clear_elites(&mut self) {
        self.elites.clear();
    }

    /// Attach evaluation data and mark the genome evaluated
    pub fn update_genome_data(
        &mut self,
        genome_id: GenomeId,
        data: EvaluationData,
    ) -> Result<&Genome, EvolutionError> {
        let genome = self
            .genomes
            .get_mut(&genome_id)
            .ok_or(EvolutionError::GenomeNotFound(genome_id))?;
        genome.data = Some(data);
        self.free.remove(&genome_id);
        self.evaluated.insert(genome_id);
        Ok(genome)
    }

    pub fn set_fitness(&mut self, genome_id: GenomeId, fitness: f64) -> Result<(), EvolutionError> {
        let genome = self
            .genomes
            .get_mut(&genome_id)
            .ok_or(EvolutionError::GenomeNotFound(genome_id))?;
        genome.fitness = Some(fitness);
        Ok(())
    }

    pub fn evaluated(&self) -> &BTreeSet<GenomeId> {
        &self.evaluated
    }

    pub fn elites(&self) -> &BTreeSet<GenomeId> {
        &self.elites
    }

    pub fn available(&self) -> &BTreeSet<GenomeId> {
        &self.free
    }

    /// Fitnesses of the evaluated genomes that have been scored
    pub fn evaluated_fitnesses(&self) -> Vec<f64> {
        self.evaluated
            .iter()
            .filter_map(|id| self.genomes.get(id).and_then(|g| g.fitness))
            .collect()
    }
}
