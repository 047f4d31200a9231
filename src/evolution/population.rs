use super::genome_manager::GenomeManager;
use super::species_set::SpeciesSet;
use super::EvolutionError;
use crate::genome::Genome;
use rand::seq::IteratorRandom;
use rand::Rng;

/// Generation counter, genomes and species of one population
#[derive(Clone, Debug, Default)]
pub struct PopulationManager {
    pub generation: u32,
    pub genomes: GenomeManager,
    pub species: SpeciesSet,
}

impl PopulationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.generation = 0;
        self.genomes.reset();
        self.species.reset();
    }

    pub fn update_generation(&mut self) -> u32 {
        self.generation += 1;
        self.generation
    }

    /// Replace every genome with `genomes`
    pub fn set_new_population(&mut self, genomes: Vec<Genome>) {
        self.genomes.reset();
        self.genomes.add_genomes(genomes);
    }

    /// Pick a random free genome and mark it as handed out
    pub fn random_available_genome<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<&Genome, EvolutionError> {
        let genome_id = self
            .genomes
            .available()
            .iter()
            .copied()
            .choose(rng)
            .ok_or(EvolutionError::NoGenomesAvailable)?;
        self.genomes.set_unavailable(genome_id);
        self.genomes.get(genome_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::test_support::population;
    use crate::genome::GenomeConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_pool_drains_then_errors() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut manager = PopulationManager::new();
        manager.set_new_population(population(3, &GenomeConfig::default(), 0).into_values().collect());

        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..3 {
            seen.insert(manager.random_available_genome(&mut rng).unwrap().key);
        }
        assert_eq!(seen.len(), 3);
        let err = manager.random_available_genome(&mut rng).unwrap_err();
        assert_eq!(err.to_string(), "No more genomes to send.");
    }

    #[test]
    fn test_reset() {
        let mut manager = PopulationManager::new();
        manager.set_new_population(population(2, &GenomeConfig::default(), 0).into_values().collect());
        manager.update_generation();
        manager.reset();
        assert_eq!(manager.generation, 0);
        assert!(manager.genomes.is_empty());
    }
}
