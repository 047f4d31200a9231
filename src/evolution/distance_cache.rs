use crate::genome::{Genome, GenomeConfig, GenomeId};
use std::collections::HashMap;

/// Memoised genome compatibility distances.
///
/// Genomes never change after they join the population, so distances are
/// cached by id pair for as long as both genomes are alive.
#[derive(Debug, Default, Clone)]
pub struct GenomeDistanceCache {
    distances: HashMap<(GenomeId, GenomeId), f64>,
    pub hits: u64,
    pub misses: u64,
}

impl GenomeDistanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance(&mut self, a: &Genome, b: &Genome, config: &GenomeConfig) -> f64 {
        if let Some(&d) = self.distances.get(&(a.key, b.key)) {
            self.hits += 1;
            return d;
        }
        let d = a.distance(b, config);
        self.distances.insert((a.key, b.key), d);
        self.distances.insert((b.key, a.key), d);
        self.misses += 1;
        d
    }

    /// Drop entries involving genomes for which `alive` is false
    pub fn retain_alive(&mut self, alive: impl Fn(GenomeId) -> bool) {
        self.distances.retain(|(a, b), _| alive(*a) && alive(*b));
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}
