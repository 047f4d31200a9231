//! NEAT genomes: node and connection genes plus the operators acting on them.
//!
//! Keys follow the usual NEAT layout: input pins are negative
//! (`-1..=-num_inputs`), outputs are `0..num_outputs`, and hidden nodes get
//! keys from the shared [`NodeIndexer`].

pub mod attributes;
mod config;
mod crossover;
mod genes;
mod mutations;

pub use config::{GenomeConfig, InitialConnection, NodeIndexer, StructuralSurer};
pub use genes::{ConnectionGene, NodeGene};

use crate::models::EvaluationData;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a genome within one population
pub type GenomeId = u64;
/// Identifier of a node gene
pub type NodeKey = i64;
/// `(input node, output node)`
pub type ConnectionKey = (NodeKey, NodeKey);

/// A NEAT genome (here encoding a CPPN)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genome {
    pub key: GenomeId,
    pub nodes: BTreeMap<NodeKey, NodeGene>,
    pub connections: BTreeMap<ConnectionKey, ConnectionGene>,
    pub fitness: Option<f64>,
    /// Last evaluation received for this genome
    pub data: Option<EvaluationData>,
}

impl Genome {
    /// Empty genome; see [`Genome::configure_new`]
    pub fn new(key: GenomeId) -> Self {
        Self {
            key,
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            fitness: None,
            data: None,
        }
    }

    /// Create a genome with output (and optional hidden) nodes wired per
    /// `initial_connection`.
    pub fn new_random<R: Rng + ?Sized>(key: GenomeId, config: &GenomeConfig, rng: &mut R) -> Self {
        let mut genome = Self::new(key);
        genome.configure_new(config, rng);
        genome
    }

    pub fn configure_new<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        for key in config.output_keys() {
            self.nodes.insert(key, NodeGene::new(key, config, rng));
        }
        for _ in 0..config.num_hidden {
            let key = config.node_indexer.next_key(self.nodes.keys());
            self.nodes.insert(key, NodeGene::new(key, config, rng));
        }

        match config.initial_connection {
            InitialConnection::Unconnected => {}
            InitialConnection::FsNeatNoHidden => self.connect_fs_neat(config, false, rng),
            InitialConnection::FsNeatHidden => self.connect_fs_neat(config, true, rng),
            InitialConnection::FullNoDirect => self.connect_full(config, false, rng),
            InitialConnection::FullDirect => self.connect_full(config, true, rng),
            InitialConnection::PartialNoDirect(fraction) => {
                self.connect_partial(config, false, fraction, rng)
            }
            InitialConnection::PartialDirect(fraction) => {
                self.connect_partial(config, true, fraction, rng)
            }
        }
    }

    /// One random input wired to every output (and hidden node, if asked)
    fn connect_fs_neat<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, hidden: bool, rng: &mut R) {
        let inputs = config.input_keys();
        let Some(&input) = inputs.choose(rng) else {
            return;
        };
        let targets: Vec<NodeKey> = self
            .nodes
            .keys()
            .copied()
            .filter(|&k| hidden || config.is_output(k))
            .collect();
        for output in targets {
            self.add_connection(ConnectionGene::new((input, output), config, rng));
        }
    }

    fn connect_full<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, direct: bool, rng: &mut R) {
        for key in self.full_connection_keys(config, direct) {
            self.add_connection(ConnectionGene::new(key, config, rng));
        }
    }

    fn connect_partial<R: Rng + ?Sized>(
        &mut self,
        config: &GenomeConfig,
        direct: bool,
        fraction: f64,
        rng: &mut R,
    ) {
        let mut all = self.full_connection_keys(config, direct);
        all.shuffle(rng);
        let count = (fraction * all.len() as f64).round() as usize;
        for key in all.into_iter().take(count) {
            self.add_connection(ConnectionGene::new(key, config, rng));
        }
    }

    /// Every connection a "full" initial topology would contain
    fn full_connection_keys(&self, config: &GenomeConfig, direct: bool) -> Vec<ConnectionKey> {
        let hidden: Vec<NodeKey> = self
            .nodes
            .keys()
            .copied()
            .filter(|&k| !config.is_output(k))
            .collect();
        let outputs = config.output_keys();
        let inputs = config.input_keys();

        let mut keys = Vec::new();
        if !hidden.is_empty() {
            for &i in &inputs {
                for &h in &hidden {
                    keys.push((i, h));
                }
            }
            for &h in &hidden {
                for &o in &outputs {
                    keys.push((h, o));
                }
            }
        }
        if direct || hidden.is_empty() {
            for &i in &inputs {
                for &o in &outputs {
                    keys.push((i, o));
                }
            }
        }
        if !config.feed_forward {
            for &n in self.nodes.keys() {
                keys.push((n, n));
            }
        }
        keys
    }

    pub(crate) fn add_connection(&mut self, gene: ConnectionGene) {
        self.connections.insert(gene.key, gene);
    }

    /// Compatibility distance used for speciation
    pub fn distance(&self, other: &Genome, config: &GenomeConfig) -> f64 {
        let node_distance = gene_set_distance(
            &self.nodes,
            &other.nodes,
            config,
            |a, b| a.distance(b, config),
        );
        let connection_distance = gene_set_distance(
            &self.connections,
            &other.connections,
            config,
            |a, b| a.distance(b, config),
        );
        node_distance + connection_distance
    }

    /// `(node count, enabled connection count)`
    pub fn size(&self) -> (usize, usize) {
        let enabled = self.connections.values().filter(|c| c.enabled).count();
        (self.nodes.len(), enabled)
    }

    /// Fitness, treating an unevaluated genome as worst
    pub fn fitness_or_min(&self) -> f64 {
        self.fitness.unwrap_or(f64::MIN)
    }
}

fn gene_set_distance<K: Ord, G>(
    ours: &BTreeMap<K, G>,
    theirs: &BTreeMap<K, G>,
    config: &GenomeConfig,
    gene_distance: impl Fn(&G, &G) -> f64,
) -> f64 {
    if ours.is_empty() && theirs.is_empty() {
        return 0.0;
    }
    let mut distance = 0.0;
    let mut disjoint = theirs.keys().filter(|k| !ours.contains_key(k)).count();
    for (key, gene) in ours {
        match theirs.get(key) {
            Some(other) => distance += gene_distance(gene, other),
            None => disjoint += 1,
        }
    }
    let max_len = ours.len().max(theirs.len()) as f64;
    (distance + config.compatibility_disjoint_coefficient * disjoint as f64) / max_len
}
