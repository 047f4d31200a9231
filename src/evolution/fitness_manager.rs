use super::species::Species;
use super::Population;
use crate::genome::GenomeId;
use crate::stats::mean;
use std::collections::BTreeSet;

/// Computes species adjusted fitness from the latest evaluations
#[derive(Debug, Default)]
pub struct FitnessManager {
    all_new_fitnesses: Vec<f64>,
}

impl FitnessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitnesses of every evaluated member of `species`
    pub fn collect_new_fitnesses(
        &mut self,
        species: &[&mut Species],
        population: &Population,
        evaluated: &BTreeSet<GenomeId>,
    ) -> &[f64] {
        self.all_new_fitnesses = species
            .iter()
            .flat_map(|s| s.fitnesses(population, Some(evaluated)))
            .collect();
        &self.all_new_fitnesses
    }

    /// Set each species' adjusted fitness to its mean evaluated fitness,
    /// min-max scaled over all evaluated genomes (range at least 1).
    pub fn adjust_fitnesses(
        &mut self,
        species: &mut [&mut Species],
        population: &Population,
        evaluated: &BTreeSet<GenomeId>,
    ) -> Vec<f64> {
        self.collect_new_fitnesses(species, population, evaluated);
        if self.all_new_fitnesses.is_empty() {
            return Vec::new();
        }
        let min = self.all_new_fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.all_new_fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = if max != min { (max - min).max(1.0) } else { 1.0 };

        species
            .iter_mut()
            .map(|s| {
                let fitnesses = s.fitnesses(population, Some(evaluated));
                let af = if fitnesses.is_empty() {
                    0.0
                } else {
                    (mean(&fitnesses) - min) / range
                };
                s.adjusted_fitness = Some(af);
                af
            })
            .collect()
    }
}
