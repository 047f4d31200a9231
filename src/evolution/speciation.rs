//! Assigns genomes to species by compatibility distance.

use super::distance_cache::GenomeDistanceCache;
use super::species_set::SpeciesSet;
use super::{EvolutionError, Population};
use crate::genome::{Genome, GenomeConfig, GenomeId};
use crate::neat_config::SpeciationConfig;

#[derive(Debug, Clone)]
pub struct Speciation {
    pub compatibility_threshold: f64,
    distance_cache: GenomeDistanceCache,
}

impl Speciation {
    pub fn new(config: &SpeciationConfig) -> Self {
        Self {
            compatibility_threshold: config.compatibility_threshold,
            distance_cache: GenomeDistanceCache::new(),
        }
    }

    pub fn distance_cache(&self) -> &GenomeDistanceCache {
        &self.distance_cache
    }

    /// Re-speciate `population`.
    ///
    /// Existing species first pick representatives, then every genome left
    /// unassigned joins the closest compatible species or founds a new one.
    pub fn speciate(
        &mut self,
        species_set: &mut SpeciesSet,
        population: &Population,
        config: &GenomeConfig,
        generation: u32,
    ) -> Result<(), EvolutionError> {
        species_set.prune_dead_members(population);
        self.set_new_representatives(species_set, population, config)?;
        self.partition_population(species_set, population, config, generation)?;
        self.distance_cache.retain_alive(|id| population.contains_key(&id));
        log::debug!(
            "Speciated {} genomes into {} species (cache hits {}, misses {})",
            population.len(),
            species_set.len(),
            self.distance_cache.hits,
            self.distance_cache.misses
        );
        Ok(())
    }

    /// Keep a live representative for every species.
    ///
    /// A species whose representative died takes its member closest to the
    /// old one; a species with no members left takes the closest unspeciated
    /// genome, or is dropped when there is none.
    fn set_new_representatives(
        &mut self,
        species_set: &mut SpeciesSet,
        population: &Population,
        config: &GenomeConfig,
    ) -> Result<(), EvolutionError> {
        let mut unspeciated = species_set.unspeciated(population);

        for species_id in species_set.species_ids() {
            let species = species_set.get(species_id)?;
            let Some(old_rep) = species.representative.clone() else {
                if species.members.is_empty() {
                    species_set.remove_species(species_id)?;
                } else if let Some(first) = species.members.iter().next().and_then(|id| population.get(id)) {
                    let first = first.clone();
                    species_set.set_representative(species_id, &first)?;
                }
                continue;
            };
            if population.contains_key(&old_rep.key) && species.is_member(old_rep.key) {
                continue;
            }

            let candidates: Vec<GenomeId> = if species.members.is_empty() {
                unspeciated.clone()
            } else {
                species.members.iter().copied().collect()
            };
            match self.closest(&old_rep, &candidates, population, config) {
                Some(new_rep) => {
                    unspeciated.retain(|id| *id != new_rep);
                    if let Some(genome) = population.get(&new_rep) {
                        species_set.set_representative(species_id, genome)?;
                    }
                }
                None => {
                    log::debug!("Species {} has no genomes left, removing it", species_id);
                    species_set.remove_species(species_id)?;
                }
            }
        }
        Ok(())
    }

    fn partition_population(
        &mut self,
        species_set: &mut SpeciesSet,
        population: &Population,
        config: &GenomeConfig,
        generation: u32,
    ) -> Result<(), EvolutionError> {
        for genome_id in species_set.unspeciated(population) {
            let Some(genome) = population.get(&genome_id) else {
                continue;
            };

            let mut best: Option<(f64, u32)> = None;
            for species in species_set.iter() {
                let Some(rep) = &species.representative else {
                    continue;
                };
                let d = self.distance_cache.distance(rep, genome, config);
                if d < self.compatibility_threshold && best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, species.key));
                }
            }

            match best {
                Some((_, species_id)) => species_set.add_member(species_id, genome_id)?,
                None => {
                    let species_id = species_set.create_new_species(generation);
                    species_set.set_representative(species_id, genome)?;
                }
            }
        }
        Ok(())
    }

    fn closest(
        &mut self,
        target: &Genome,
        candidates: &[GenomeId],
        population: &Population,
        config: &GenomeConfig,
    ) -> Option<GenomeId> {
        let mut best: Option<(f64, GenomeId)> = None;
        for id in candidates {
            let Some(genome) = population.get(id) else {
                continue;
            };
            let d = self.distance_cache.distance(target, genome, config);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, *id));
            }
        }
        best.map(|(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::test_support::population;

    #[test]
    fn test_identical_genomes_share_a_species() {
        let config = GenomeConfig::default();
        let base = population(1, &config, 7);
        let mut pop = Population::new();
        for id in 1..=5 {
            let mut genome = base[&1].clone();
            genome.key = id;
            pop.insert(id, genome);
        }

        let mut speciation = Speciation::new(&SpeciationConfig::default());
        let mut set = SpeciesSet::new();
        speciation.speciate(&mut set, &pop, &config, 0).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(1).unwrap().members.len(), 5);
    }

    #[test]
    fn test_every_genome_speciated_once() {
        let config = GenomeConfig::default();
        let pop = population(20, &config, 11);
        let mut speciation = Speciation::new(&SpeciationConfig {
            compatibility_threshold: 0.5,
        });
        let mut set = SpeciesSet::new();
        speciation.speciate(&mut set, &pop, &config, 0).unwrap();

        let total: usize = set.iter().map(|s| s.members.len()).sum();
        assert_eq!(total, 20);
        assert!(set.unspeciated(&pop).is_empty());
        for species in set.iter() {
            let rep = species.representative_id().unwrap();
            assert!(species.is_member(rep));
        }
    }

    #[test]
    fn test_dead_representative_replaced() {
        let config = GenomeConfig::default();
        let mut pop = population(6, &config, 3);
        let mut speciation = Speciation::new(&SpeciationConfig {
            compatibility_threshold: 100.0,
        });
        let mut set = SpeciesSet::new();
        speciation.speciate(&mut set, &pop, &config, 0).unwrap();
        assert_eq!(set.len(), 1);
        let old_rep = set.get(1).unwrap().representative_id().unwrap();

        pop.remove(&old_rep);
        speciation.speciate(&mut set, &pop, &config, 1).unwrap();
        let species = set.get(1).unwrap();
        let new_rep = species.representative_id().unwrap();
        assert_ne!(new_rep, old_rep);
        assert!(pop.contains_key(&new_rep));
        assert_eq!(species.members.len(), 5);
    }

    #[test]
    fn test_emptied_species_adopts_unspeciated_genome() {
        let config = GenomeConfig::default();
        let pop = population(4, &config, 5);
        let mut speciation = Speciation::new(&SpeciationConfig {
            compatibility_threshold: 100.0,
        });
        let mut set = SpeciesSet::new();
        speciation.speciate(&mut set, &pop, &config, 0).unwrap();

        // Replace the whole population with new genomes
        let next: Population = population(8, &config, 6)
            .into_iter()
            .filter(|(id, _)| *id > 4)
            .collect();
        speciation.speciate(&mut set, &next, &config, 1).unwrap();

        assert_eq!(set.len(), 1);
        let species = set.get(1).unwrap();
        assert_eq!(species.members.len(), 4);
        assert!(species.representative_id().unwrap() > 4);
    }
}
