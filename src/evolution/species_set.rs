//! The collection of species in a population.

use super::species::{Species, SpeciesId};
use super::{EvolutionError, Population};
use crate::genome::{Genome, GenomeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpeciesSet {
    species: BTreeMap<SpeciesId, Species>,
}

impl SpeciesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.species.clear();
    }

    /// Add an empty species keyed one above the current maximum
    pub fn create_new_species(&mut self, generation: u32) -> SpeciesId {
        let id = self.species.keys().next_back().map_or(1, |k| k + 1);
        self.species.insert(id, Species::new(id, generation));
        id
    }

    pub fn add_member(&mut self, species_id: SpeciesId, genome_id: GenomeId) -> Result<(), EvolutionError> {
        self.get_mut(species_id)?.add_member(genome_id);
        Ok(())
    }

    pub fn set_representative(&mut self, species_id: SpeciesId, genome: &Genome) -> Result<(), EvolutionError> {
        self.get_mut(species_id)?.set_representative(genome);
        Ok(())
    }

    pub fn remove_species(&mut self, species_id: SpeciesId) -> Result<Species, EvolutionError> {
        self.species
            .remove(&species_id)
            .ok_or(EvolutionError::SpeciesNotFound(species_id))
    }

    pub fn get(&self, species_id: SpeciesId) -> Result<&Species, EvolutionError> {
        self.species
            .get(&species_id)
            .ok_or(EvolutionError::SpeciesNotFound(species_id))
    }

    pub fn get_mut(&mut self, species_id: SpeciesId) -> Result<&mut Species, EvolutionError> {
        self.species
            .get_mut(&species_id)
            .ok_or(EvolutionError::SpeciesNotFound(species_id))
    }

    pub fn species_ids(&self) -> Vec<SpeciesId> {
        self.species.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Species> {
        self.species.values_mut()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Species the genome belongs to, if any
    pub fn species_of(&self, genome_id: GenomeId) -> Option<SpeciesId> {
        self.species
            .values()
            .find(|s| s.is_member(genome_id))
            .map(|s| s.key)
    }

    pub fn is_speciated(&self, genome_id: GenomeId) -> bool {
        self.species_of(genome_id).is_some()
    }

    /// Genomes of `population` not yet assigned to a species
    pub fn unspeciated(&self, population: &Population) -> Vec<GenomeId> {
        population
            .keys()
            .copied()
            .filter(|id| !self.is_speciated(*id))
            .collect()
    }

    pub fn representative_ids(&self) -> BTreeMap<SpeciesId, Option<GenomeId>> {
        self.species
            .iter()
            .map(|(id, s)| (*id, s.representative_id()))
            .collect()
    }

    pub fn mark_stagnant(&mut self, species_id: SpeciesId) -> Result<(), EvolutionError> {
        self.get_mut(species_id)?.mark_stagnant();
        Ok(())
    }

    /// Remove inactive species, returning them so their members can be culled
    pub fn remove_stagnant_species(&mut self) -> Vec<Species> {
        let stagnant: Vec<SpeciesId> = self
            .species
            .values()
            .filter(|s| !s.is_active())
            .map(|s| s.key)
            .collect();
        stagnant
            .into_iter()
            .filter_map(|id| self.species.remove(&id))
            .collect()
    }

    pub fn active_species(&self) -> Vec<&Species> {
        self.species.values().filter(|s| s.is_active()).collect()
    }

    pub fn active_species_mut(&mut self) -> Vec<&mut Species> {
        self.species.values_mut().filter(|s| s.is_active()).collect()
    }

    /// Forget members no longer in `population`
    pub fn prune_dead_members(&mut self, population: &Population) {
        for species in self.species.values_mut() {
            species.members.retain(|id| population.contains_key(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::test_support::population;
    use crate::genome::GenomeConfig;

    #[test]
    fn test_new_species_ids_increase() {
        let mut set = SpeciesSet::new();
        assert_eq!(set.create_new_species(0), 1);
        assert_eq!(set.create_new_species(0), 2);
        set.remove_species(2).unwrap();
        assert_eq!(set.create_new_species(1), 2);
        assert_eq!(set.get(2).unwrap().created, 1);
    }

    #[test]
    fn test_unknown_species_errors() {
        let mut set = SpeciesSet::new();
        assert_eq!(set.add_member(7, 1), Err(EvolutionError::SpeciesNotFound(7)));
        assert!(matches!(set.remove_species(7), Err(EvolutionError::SpeciesNotFound(7))));
    }

    #[test]
    fn test_unspeciated_and_lookup() {
        let config = GenomeConfig::default();
        let pop = population(4, &config, 2);
        let mut set = SpeciesSet::new();
        let sid = set.create_new_species(0);
        set.set_representative(sid, &pop[&1]).unwrap();
        set.add_member(sid, 3).unwrap();

        assert_eq!(set.unspeciated(&pop), vec![2, 4]);
        assert_eq!(set.species_of(3), Some(sid));
        assert_eq!(set.representative_ids()[&sid], Some(1));
    }

    #[test]
    fn test_remove_stagnant_species() {
        let mut set = SpeciesSet::new();
        let a = set.create_new_species(0);
        let b = set.create_new_species(0);
        set.mark_stagnant(a).unwrap();

        assert_eq!(set.active_species().len(), 1);
        let removed = set.remove_stagnant_species();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].key, a);
        assert_eq!(set.species_ids(), vec![b]);
    }

    #[test]
    fn test_prune_dead_members() {
        let config = GenomeConfig::default();
        let mut pop = population(3, &config, 2);
        let mut set = SpeciesSet::new();
        let sid = set.create_new_species(0);
        for id in 1..=3 {
            set.add_member(sid, id).unwrap();
        }
        pop.remove(&2);
        set.prune_dead_members(&pop);
        assert!(!set.get(sid).unwrap().is_member(2));
        assert_eq!(set.get(sid).unwrap().members.len(), 2);
    }
}
