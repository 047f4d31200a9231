//! Detects species that stopped improving.

use super::species_set::SpeciesSet;
use super::{Population, SpeciesId};
use crate::genome::GenomeId;
use crate::neat_config::StagnationConfig;
use crate::stats::StatFunction;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct Stagnation {
    species_fitness_func: StatFunction,
    max_stagnation: u32,
    species_elitism: usize,
}

impl Stagnation {
    pub fn new(config: &StagnationConfig) -> Self {
        Self {
            species_fitness_func: config.species_fitness_func,
            max_stagnation: config.max_stagnation,
            species_elitism: config.species_elitism,
        }
    }

    /// Update every species' fitness history and flag stagnant ones.
    ///
    /// Species fitness is `species_fitness_func` over the evaluated members;
    /// a species with none keeps its previous fitness. A species is stagnant
    /// once it has gone more than `max_stagnation` generations without
    /// improving, unless it ranks among the `species_elitism` fittest.
    pub fn update(
        &self,
        species_set: &mut SpeciesSet,
        population: &Population,
        evaluated: &BTreeSet<GenomeId>,
        generation: u32,
    ) -> BTreeMap<SpeciesId, bool> {
        let mut ranking: Vec<(SpeciesId, f64, u32)> = Vec::with_capacity(species_set.len());
        for species in species_set.iter_mut() {
            let prev_fitness = species
                .fitness_history
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let fitnesses = species.fitnesses(population, Some(evaluated));
            if let Some(fitness) = self.species_fitness_func.apply(&fitnesses) {
                species.fitness = Some(fitness);
                species.fitness_history.push(fitness);
                species.adjusted_fitness = None;
                if fitness > prev_fitness {
                    species.last_improved = generation;
                }
            }
            ranking.push((
                species.key,
                species.fitness.unwrap_or(f64::NEG_INFINITY),
                species.last_improved,
            ));
        }

        ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranking
            .into_iter()
            .enumerate()
            .map(|(rank, (id, _, last_improved))| {
                let stale = generation.saturating_sub(last_improved) > self.max_stagnation;
                let protected = rank < self.species_elitism;
                (id, stale && !protected)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::test_support::{population, set_fitness};
    use crate::genome::GenomeConfig;

    fn setup() -> (SpeciesSet, Population, BTreeSet<GenomeId>) {
        let config = GenomeConfig::default();
        let mut pop = population(4, &config, 1);
        set_fitness(&mut pop, &[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let mut set = SpeciesSet::new();
        for pair in [[1, 2], [3, 4]] {
            let sid = set.create_new_species(0);
            for id in pair {
                set.add_member(sid, id).unwrap();
            }
        }
        let evaluated = (1..=4).collect();
        (set, pop, evaluated)
    }

    #[test]
    fn test_improving_species_not_stagnant() {
        let (mut set, pop, evaluated) = setup();
        let stagnation = Stagnation::new(&StagnationConfig {
            max_stagnation: 2,
            ..StagnationConfig::default()
        });
        let result = stagnation.update(&mut set, &pop, &evaluated, 5);
        assert_eq!(result.values().filter(|s| **s).count(), 0);
        assert_eq!(set.get(1).unwrap().last_improved, 5);
        assert_eq!(set.get(1).unwrap().fitness, Some(1.5));
    }

    #[test]
    fn test_flat_species_goes_stagnant() {
        let (mut set, pop, evaluated) = setup();
        let stagnation = Stagnation::new(&StagnationConfig {
            max_stagnation: 2,
            ..StagnationConfig::default()
        });
        stagnation.update(&mut set, &pop, &evaluated, 0);
        assert!(stagnation.update(&mut set, &pop, &evaluated, 2).values().all(|s| !*s));
        let result = stagnation.update(&mut set, &pop, &evaluated, 3);
        assert_eq!(result[&1], true);
        assert_eq!(result[&2], true);
    }

    #[test]
    fn test_species_elitism_protects_fittest() {
        let (mut set, pop, evaluated) = setup();
        let stagnation = Stagnation::new(&StagnationConfig {
            max_stagnation: 0,
            species_elitism: 1,
            ..StagnationConfig::default()
        });
        stagnation.update(&mut set, &pop, &evaluated, 0);
        let result = stagnation.update(&mut set, &pop, &evaluated, 1);
        // species 2 has the higher mean fitness (3.5)
        assert_eq!(result[&1], true);
        assert_eq!(result[&2], false);
    }

    #[test]
    fn test_unevaluated_species_keeps_fitness() {
        let (mut set, pop, _) = setup();
        let stagnation = Stagnation::new(&StagnationConfig::default());
        let only_first: BTreeSet<GenomeId> = [1, 2].into_iter().collect();
        stagnation.update(&mut set, &pop, &only_first, 0);
        assert_eq!(set.get(2).unwrap().fitness, None);
        assert!(set.get(2).unwrap().fitness_history.is_empty());
        assert_eq!(set.get(1).unwrap().fitness_history, vec![1.5]);
    }
}
