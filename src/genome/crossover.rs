//! Genome crossover.

use super::{Genome, GenomeId};
use rand::Rng;

impl Genome {
    /// Create a child of two parents.
    ///
    /// Genes shared by both parents are mixed attribute by attribute;
    /// disjoint and excess genes come from the fitter parent only.
    pub fn crossover<R: Rng + ?Sized>(
        key: GenomeId,
        parent_a: &Genome,
        parent_b: &Genome,
        rng: &mut R,
    ) -> Genome {
        let (fitter, other) = if parent_a.fitness_or_min() > parent_b.fitness_or_min() {
            (parent_a, parent_b)
        } else {
            (parent_b, parent_a)
        };

        let mut child = Genome::new(key);
        for (conn_key, gene) in &fitter.connections {
            let inherited = match other.connections.get(conn_key) {
                Some(homologous) => gene.crossover(homologous, rng),
                None => gene.clone(),
            };
            child.connections.insert(*conn_key, inherited);
        }
        for (node_key, gene) in &fitter.nodes {
            let inherited = match other.nodes.get(node_key) {
                Some(homologous) => gene.crossover(homologous, rng),
                None => gene.clone(),
            };
            child.nodes.insert(*node_key, inherited);
        }
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::GenomeConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_child_structure_follows_fitter_parent() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let config = GenomeConfig::default();
        let mut strong = Genome::new_random(1, &config, &mut rng);
        let mut weak = Genome::new_random(2, &config, &mut rng);
        strong.mutate_add_node(&config, &mut rng);
        weak.mutate_add_node(&config, &mut rng);
        weak.mutate_add_node(&config, &mut rng);
        strong.fitness = Some(2.0);
        weak.fitness = Some(1.0);

        let child = Genome::crossover(3, &weak, &strong, &mut rng);

        assert_eq!(child.key, 3);
        assert_eq!(child.fitness, None);
        let child_nodes: Vec<_> = child.nodes.keys().collect();
        let strong_nodes: Vec<_> = strong.nodes.keys().collect();
        assert_eq!(child_nodes, strong_nodes);
        assert_eq!(child.connections.len(), strong.connections.len());
    }

    #[test]
    fn test_self_crossover_is_a_copy() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let config = GenomeConfig::default();
        let parent = Genome::new_random(1, &config, &mut rng);
        let child = Genome::crossover(2, &parent, &parent, &mut rng);
        assert_eq!(child.nodes, parent.nodes);
        assert_eq!(child.connections, parent.connections);
    }
}
