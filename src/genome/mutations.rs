//! Structural and attribute mutations (NEAT-style).

use super::config::GenomeConfig;
use super::genes::{ConnectionGene, NodeGene};
use super::{Genome, NodeKey};
use crate::network::graph::creates_cycle;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

impl Genome {
    /// Apply structural mutations, then perturb every gene's attributes
    pub fn mutate<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        if config.single_structural_mutation {
            let total = config.node_add_prob
                + config.node_delete_prob
                + config.conn_add_prob
                + config.conn_delete_prob;
            let div = total.max(1.0);
            let r: f64 = rng.gen();
            if r < config.node_add_prob / div {
                self.mutate_add_node(config, rng);
            } else if r < (config.node_add_prob + config.node_delete_prob) / div {
                self.mutate_delete_node(config, rng);
            } else if r < (config.node_add_prob + config.node_delete_prob + config.conn_add_prob) / div {
                self.mutate_add_connection(config, rng);
            } else if r < total / div {
                self.mutate_delete_connection(rng);
            }
        } else {
            if rng.gen::<f64>() < config.node_add_prob {
                self.mutate_add_node(config, rng);
            }
            if rng.gen::<f64>() < config.node_delete_prob {
                self.mutate_delete_node(config, rng);
            }
            if rng.gen::<f64>() < config.conn_add_prob {
                self.mutate_add_connection(config, rng);
            }
            if rng.gen::<f64>() < config.conn_delete_prob {
                self.mutate_delete_connection(rng);
            }
        }

        for gene in self.connections.values_mut() {
            gene.mutate(config, rng);
        }
        for gene in self.nodes.values_mut() {
            gene.mutate(config, rng);
        }
    }

    /// Split a random connection with a new node.
    ///
    /// The old connection is disabled; the incoming half gets weight 1.0 and
    /// the outgoing half inherits the old weight.
    pub fn mutate_add_node<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let Some(&split_key) = self.connections.keys().choose(rng) else {
            if config.structural_surer() {
                self.mutate_add_connection(config, rng);
            }
            return;
        };

        let new_key = config.node_indexer.next_key(self.nodes.keys());
        self.nodes.insert(new_key, NodeGene::new(new_key, config, rng));

        let old_weight = match self.connections.get_mut(&split_key) {
            Some(conn) => {
                conn.enabled = false;
                conn.weight
            }
            None => return,
        };
        let (input, output) = split_key;
        self.add_connection(ConnectionGene {
            key: (input, new_key),
            weight: 1.0,
            enabled: true,
        });
        self.add_connection(ConnectionGene {
            key: (new_key, output),
            weight: old_weight,
            enabled: true,
        });
    }

    /// Add a connection between two random nodes.
    ///
    /// Output-to-output links are never created, and neither are cycles
    /// when the genome is feed-forward.
    pub fn mutate_add_connection<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let targets: Vec<NodeKey> = self.nodes.keys().copied().collect();
        let Some(&out_node) = targets.choose(rng) else {
            return;
        };
        let mut sources = targets.clone();
        sources.extend(config.input_keys());
        let Some(&in_node) = sources.choose(rng) else {
            return;
        };

        let key = (in_node, out_node);
        if let Some(existing) = self.connections.get_mut(&key) {
            if config.structural_surer() {
                existing.enabled = true;
            }
            return;
        }
        if config.is_output(in_node) && config.is_output(out_node) {
            return;
        }
        if config.feed_forward {
            let existing: Vec<_> = self.connections.keys().copied().collect();
            if creates_cycle(&existing, key) {
                return;
            }
        }
        self.add_connection(ConnectionGene::new(key, config, rng));
    }

    /// Remove a random hidden node with all its connections.
    /// Returns the removed key.
    pub fn mutate_delete_node<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        rng: &mut R,
    ) -> Option<NodeKey> {
        let removable: Vec<NodeKey> = self
            .nodes
            .keys()
            .copied()
            .filter(|&k| !config.is_output(k))
            .collect();
        let &victim = removable.choose(rng)?;

        self.connections
            .retain(|&(input, output), _| input != victim && output != victim);
        self.nodes.remove(&victim);
        Some(victim)
    }

    pub fn mutate_delete_connection<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(&key) = self.connections.keys().choose(rng) {
            self.connections.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::InitialConnection;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn xor_cppn_config() -> GenomeConfig {
        GenomeConfig {
            num_inputs: 2,
            num_outputs: 1,
            ..GenomeConfig::default()
        }
    }

    #[test]
    fn test_add_node_splits_connection() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = xor_cppn_config();
        let mut genome = Genome::new_random(1, &config, &mut rng);
        let before_nodes = genome.nodes.len();
        let before_conns = genome.connections.len();

        genome.mutate_add_node(&config, &mut rng);

        assert_eq!(genome.nodes.len(), before_nodes + 1);
        assert_eq!(genome.connections.len(), before_conns + 2);
        let disabled = genome.connections.values().filter(|c| !c.enabled).count();
        assert_eq!(disabled, 1);
    }

    #[test]
    fn test_add_node_on_empty_genome_with_surer() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = GenomeConfig {
            initial_connection: InitialConnection::Unconnected,
            structural_mutation_surer: crate::genome::StructuralSurer::True,
            ..xor_cppn_config()
        };
        let mut genome = Genome::new_random(1, &config, &mut rng);
        genome.mutate_add_node(&config, &mut rng);
        assert_eq!(genome.nodes.len(), 1);
    }

    #[test]
    fn test_add_connection_keeps_feed_forward_acyclic() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = xor_cppn_config();
        let mut genome = Genome::new_random(1, &config, &mut rng);
        for _ in 0..10 {
            genome.mutate_add_node(&config, &mut rng);
        }
        for _ in 0..200 {
            genome.mutate_add_connection(&config, &mut rng);
        }
        let keys: Vec<_> = genome.connections.keys().copied().collect();
        for (i, &key) in keys.iter().enumerate() {
            let others: Vec<_> = keys
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, k)| *k)
                .collect();
            assert!(!creates_cycle(&others, key), "cycle through {:?}", key);
        }
    }

    #[test]
    fn test_delete_node_never_removes_outputs() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = xor_cppn_config();
        let mut genome = Genome::new_random(1, &config, &mut rng);
        assert_eq!(genome.mutate_delete_node(&config, &mut rng), None);

        genome.mutate_add_node(&config, &mut rng);
        let removed = genome.mutate_delete_node(&config, &mut rng);
        assert!(removed.is_some());
        assert!(genome.nodes.contains_key(&0));
        assert!(genome
            .connections
            .keys()
            .all(|&(i, o)| Some(i) != removed && Some(o) != removed));
    }

    #[test]
    fn test_mutate_keeps_genome_consistent() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let config = xor_cppn_config();
        let mut genome = Genome::new_random(1, &config, &mut rng);
        for _ in 0..100 {
            genome.mutate(&config, &mut rng);
        }
        for &(input, output) in genome.connections.keys() {
            assert!(config.is_input(input) || genome.nodes.contains_key(&input));
            assert!(genome.nodes.contains_key(&output));
        }
    }

    #[test]
    fn test_single_structural_mutation_changes_at_most_one_thing() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let config = GenomeConfig {
            single_structural_mutation: true,
            node_add_prob: 1.0,
            node_delete_prob: 1.0,
            conn_add_prob: 1.0,
            conn_delete_prob: 1.0,
            ..xor_cppn_config()
        };
        let mut genome = Genome::new_random(1, &config, &mut rng);
        let before = genome.nodes.len();
        genome.mutate(&config, &mut rng);
        assert!(genome.nodes.len().abs_diff(before) <= 1);
    }
}
