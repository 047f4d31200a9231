//! A single species of the mixed-generation population.

use super::Population;
use crate::genome::{Genome, GenomeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type SpeciesId = u32;

/// A group of genomes compatible with a shared representative
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    pub key: SpeciesId,
    pub created: u32,
    pub last_improved: u32,
    /// Copy of the representative so it outlives the genome itself
    pub representative: Option<Genome>,
    pub members: BTreeSet<GenomeId>,
    pub fitness: Option<f64>,
    pub adjusted_fitness: Option<f64>,
    /// Evaluated members that will be replaced this generation
    pub dying_count: usize,
    pub fitness_history: Vec<f64>,
    active: bool,
}

impl Species {
    pub fn new(key: SpeciesId, generation: u32) -> Self {
        Self {
            key,
            created: generation,
            last_improved: generation,
            representative: None,
            members: BTreeSet::new(),
            fitness: None,
            adjusted_fitness: None,
            dying_count: 0,
            fitness_history: Vec::new(),
            active: true,
        }
    }

    pub fn add_member(&mut self, genome_id: GenomeId) {
        self.members.insert(genome_id);
    }

    /// Set the representative; it also becomes a member
    pub fn set_representative(&mut self, genome: &Genome) {
        self.members.insert(genome.key);
        self.representative = Some(genome.clone());
    }

    pub fn representative_id(&self) -> Option<GenomeId> {
        self.representative.as_ref().map(|g| g.key)
    }

    /// Fitnesses of the members, optionally restricted to `evaluated`
    pub fn fitnesses(&self, population: &Population, evaluated: Option<&BTreeSet<GenomeId>>) -> Vec<f64> {
        self.members
            .iter()
            .filter(|id| evaluated.map_or(true, |e| e.contains(id)))
            .filter_map(|id| population.get(id).and_then(|g| g.fitness))
            .collect()
    }

    /// Evaluated members, best first (ties broken by id)
    pub fn sorted_by_fitness(
        &self,
        population: &Population,
        evaluated: &BTreeSet<GenomeId>,
    ) -> Vec<GenomeId> {
        let mut scored: Vec<(GenomeId, f64)> = self
            .members
            .iter()
            .filter(|id| evaluated.contains(id))
            .filter_map(|id| population.get(id).map(|g| (*id, g.fitness_or_min())))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.into_iter().map(|(id, _)| id).collect()
    }

    pub fn evaluated_count(&self, evaluated: &BTreeSet<GenomeId>) -> usize {
        self.members.iter().filter(|id| evaluated.contains(id)).count()
    }

    pub fn mark_stagnant(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_member(&self, genome_id: GenomeId) -> bool {
        self.members.contains(&genome_id)
    }

    /// Drop members that died this generation
    pub fn kill_members(&mut self, dead: &BTreeSet<GenomeId>) {
        self.members.retain(|id| !dead.contains(id));
    }

    /// Share of `total_dying_pop` this species has earned, at least `min_species_size`
    pub fn compute_expected_size(
        &self,
        min_species_size: usize,
        total_adjusted_fitness: f64,
        total_dying_pop: usize,
    ) -> f64 {
        let min = min_species_size as f64;
        if total_adjusted_fitness > 0.0 {
            let af = self.adjusted_fitness.unwrap_or(0.0);
            min.max(af / total_adjusted_fitness * total_dying_pop as f64)
        } else {
            min
        }
    }

    /// Move the replacement count halfway towards the expected size.
    ///
    /// A non-zero difference always shifts the deficit by at least one.
    pub fn compute_pop_deficit(&self, expected_species_size: f64) -> i64 {
        let dying = self.dying_count as i64;
        let size_diff = (expected_species_size - self.dying_count as f64) * 0.5;
        let rounded = size_diff.round_ties_even() as i64;
        if rounded != 0 {
            dying + rounded
        } else if size_diff > 0.0 {
            dying + 1
        } else if size_diff < 0.0 {
            dying - 1
        } else {
            dying
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::test_support::{population, set_fitness};
    use crate::genome::GenomeConfig;
    use approx::assert_relative_eq;

    fn species_with(members: &[GenomeId]) -> Species {
        let mut species = Species::new(1, 0);
        for id in members {
            species.add_member(*id);
        }
        species
    }

    #[test]
    fn test_representative_becomes_member() {
        let config = GenomeConfig::default();
        let pop = population(3, &config, 1);
        let mut species = Species::new(1, 0);
        species.set_representative(&pop[&2]);
        assert_eq!(species.representative_id(), Some(2));
        assert!(species.is_member(2));
    }

    #[test]
    fn test_sorted_by_fitness_only_evaluated() {
        let config = GenomeConfig::default();
        let mut pop = population(4, &config, 1);
        set_fitness(&mut pop, &[(1, 0.5), (2, 2.0), (3, 1.0), (4, 9.0)]);
        let species = species_with(&[1, 2, 3, 4]);
        let evaluated: BTreeSet<_> = [1, 2, 3].into_iter().collect();

        assert_eq!(species.sorted_by_fitness(&pop, &evaluated), vec![2, 3, 1]);
        let mut fitnesses = species.fitnesses(&pop, Some(&evaluated));
        fitnesses.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(fitnesses, vec![0.5, 1.0, 2.0]);
        assert_eq!(species.fitnesses(&pop, None).len(), 4);
    }

    #[test]
    fn test_expected_size() {
        let mut species = Species::new(1, 0);
        species.adjusted_fitness = Some(0.5);
        assert_relative_eq!(species.compute_expected_size(2, 1.0, 10), 5.0);
        assert_relative_eq!(species.compute_expected_size(8, 1.0, 10), 8.0);
        assert_relative_eq!(species.compute_expected_size(2, 0.0, 10), 2.0);
    }

    #[test]
    fn test_pop_deficit_rounding() {
        let mut species = Species::new(1, 0);
        species.dying_count = 4;
        // (8 - 4) / 2 = 2
        assert_eq!(species.compute_pop_deficit(8.0), 6);
        // (5 - 4) / 2 = 0.5 rounds to 0, still nudged up
        assert_eq!(species.compute_pop_deficit(5.0), 5);
        // (3 - 4) / 2 = -0.5 rounds to 0, nudged down
        assert_eq!(species.compute_pop_deficit(3.0), 3);
        // (7 - 4) / 2 = 1.5 rounds to 2
        assert_eq!(species.compute_pop_deficit(7.0), 6);
        assert_eq!(species.compute_pop_deficit(4.0), 4);
    }

    #[test]
    fn test_kill_members_and_stagnation() {
        let mut species = species_with(&[1, 2, 3]);
        species.kill_members(&[1, 3].into_iter().collect());
        assert!(species.is_member(2));
        assert!(!species.is_member(1));
        assert!(species.is_active());
        species.mark_stagnant();
        assert!(!species.is_active());
    }
}
