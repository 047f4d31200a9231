//! Evolvable-substrate HyperNEAT.
//!
//! The CPPN is sampled on a quadtree around each known node. Regions with
//! high weight variance are subdivided; leaves inside a band of contrasting
//! weight become connections, and their far ends become hidden nodes.

use super::substrate::{Coord, EsParams, Substrate};
use crate::network::{AggregationFunction, FeedForwardNetwork, NodeEval, RecurrentNetwork};
use std::collections::{BTreeMap, BTreeSet};

/// Hashable/orderable form of a coordinate
type CoordKey = (u64, u64);

fn key_of((x, y): Coord) -> CoordKey {
    // +0.0 so -0.0 and 0.0 map to the same node
    ((x + 0.0).to_bits(), (y + 0.0).to_bits())
}

fn coord_of((x, y): CoordKey) -> Coord {
    (f64::from_bits(x), f64::from_bits(y))
}

/// Source and target of a discovered connection
type Link = (CoordKey, CoordKey);

/// Quadtree cell with the CPPN weight sampled at its centre
#[derive(Debug)]
struct QuadPoint {
    x: f64,
    y: f64,
    width: f64,
    level: u32,
    weight: f64,
    children: Vec<QuadPoint>,
}

impl QuadPoint {
    fn new(x: f64, y: f64, width: f64, level: u32) -> Self {
        Self {
            x,
            y,
            width,
            level,
            weight: 0.0,
            children: Vec::new(),
        }
    }

    fn leaf_weights(&self, out: &mut Vec<f64>) {
        if self.children.is_empty() {
            out.push(self.weight);
        } else {
            for child in &self.children {
                child.leaf_weights(out);
            }
        }
    }

    /// Variance of the leaf weights below this cell; 0.0 for a leaf
    fn variance(&self) -> f64 {
        if self.children.is_empty() {
            return 0.0;
        }
        let mut weights = Vec::new();
        self.leaf_weights(&mut weights);
        crate::stats::variance(&weights)
    }
}

/// One ES-HyperNEAT phenotype construction
pub struct EsNetwork<'a> {
    substrate: &'a Substrate,
    cppn: FeedForwardNetwork,
    params: &'a EsParams,
}

impl<'a> EsNetwork<'a> {
    pub fn new(substrate: &'a Substrate, cppn: FeedForwardNetwork, params: &'a EsParams) -> Self {
        Self {
            substrate,
            cppn,
            params,
        }
    }

    /// Signal depth of the deepest possible substrate
    pub fn activations(&self) -> usize {
        2usize.pow(self.params.max_depth) + 1
    }

    /// Build the recurrent substrate network.
    ///
    /// Node indices: inputs first, then outputs, then hidden nodes.
    pub fn create_phenotype_network(&mut self) -> RecurrentNetwork {
        let n_inputs = self.substrate.input_coordinates.len();
        let n_outputs = self.substrate.output_coordinates.len();
        let input_nodes: Vec<usize> = (0..n_inputs).collect();
        let output_nodes: Vec<usize> = (n_inputs..n_inputs + n_outputs).collect();

        let mut index_of: BTreeMap<CoordKey, usize> = BTreeMap::new();
        for (i, &c) in self
            .substrate
            .input_coordinates
            .iter()
            .chain(self.substrate.output_coordinates.iter())
            .enumerate()
        {
            index_of.entry(key_of(c)).or_insert(i);
        }

        let (hidden, connections) = self.es_hyperneat();
        let mut next_index = n_inputs + n_outputs;
        for node in hidden {
            index_of.entry(node).or_insert_with(|| {
                next_index += 1;
                next_index - 1
            });
        }

        let mut incoming: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
        for ((source, target), weight) in connections {
            if let (Some(&s), Some(&t)) = (index_of.get(&source), index_of.get(&target)) {
                incoming.entry(t).or_default().push((s, weight));
            }
        }

        let node_evals = incoming
            .into_iter()
            .map(|(node, links)| NodeEval {
                node,
                activation: self.params.activation,
                aggregation: AggregationFunction::Sum,
                bias: 0.0,
                response: 1.0,
                links,
            })
            .collect();

        RecurrentNetwork::new(input_nodes, output_nodes, node_evals, self.activations())
    }

    /// Discover hidden nodes and connections, pruned to input-output paths
    fn es_hyperneat(&mut self) -> (BTreeSet<CoordKey>, BTreeMap<Link, f64>) {
        let mut hidden: BTreeSet<CoordKey> = BTreeSet::new();
        let mut connections: BTreeMap<Link, f64> = BTreeMap::new();

        let inputs = self.substrate.input_coordinates.clone();
        for coord in inputs {
            for (link, w) in self.explore(coord, true) {
                hidden.insert(link.1);
                connections.insert(link, w);
            }
        }

        let mut unexplored: BTreeSet<CoordKey> = hidden.clone();
        for _ in 0..self.params.iteration_level {
            let mut discovered = BTreeSet::new();
            for &node in &unexplored {
                for (link, w) in self.explore(coord_of(node), true) {
                    if !hidden.contains(&link.1) {
                        discovered.insert(link.1);
                    }
                    connections.insert(link, w);
                }
            }
            hidden.extend(discovered.iter().copied());
            unexplored = discovered;
        }

        let outputs = self.substrate.output_coordinates.clone();
        for coord in outputs {
            connections.extend(self.explore(coord, false));
        }

        self.clean_net(connections)
    }

    /// Quadtree search around one node
    fn explore(&mut self, coord: Coord, outgoing: bool) -> BTreeMap<Link, f64> {
        let mut root = QuadPoint::new(0.0, 0.0, 1.0, 1);
        self.divide(&mut root, coord, outgoing);
        let mut found = BTreeMap::new();
        self.prune_and_extract(&root, coord, outgoing, &mut found);
        found
    }

    fn divide(&mut self, point: &mut QuadPoint, coord: Coord, outgoing: bool) {
        let half = point.width / 2.0;
        let level = point.level + 1;
        point.children = vec![
            QuadPoint::new(point.x - half, point.y - half, half, level),
            QuadPoint::new(point.x - half, point.y + half, half, level),
            QuadPoint::new(point.x + half, point.y + half, half, level),
            QuadPoint::new(point.x + half, point.y - half, half, level),
        ];
        for child in &mut point.children {
            child.weight = self.query_cppn(coord, (child.x, child.y), outgoing);
        }

        let subdivide = point.level < self.params.initial_depth
            || (point.level < self.params.max_depth
                && point.variance() > self.params.division_threshold);
        if subdivide {
            for child in &mut point.children {
                self.divide(child, coord, outgoing);
            }
        }
    }

    fn prune_and_extract(
        &mut self,
        point: &QuadPoint,
        coord: Coord,
        outgoing: bool,
        found: &mut BTreeMap<Link, f64>,
    ) {
        for child in &point.children {
            if child.variance() > self.params.variance_threshold {
                self.prune_and_extract(child, coord, outgoing, found);
                continue;
            }

            let d_left = (child.weight
                - self.query_cppn(coord, (child.x - point.width, child.y), outgoing))
            .abs();
            let d_right = (child.weight
                - self.query_cppn(coord, (child.x + point.width, child.y), outgoing))
            .abs();
            let d_top = (child.weight
                - self.query_cppn(coord, (child.x, child.y - point.width), outgoing))
            .abs();
            let d_bottom = (child.weight
                - self.query_cppn(coord, (child.x, child.y + point.width), outgoing))
            .abs();

            let band = d_top.min(d_bottom).max(d_left.min(d_right));
            if band > self.params.band_threshold && child.weight != 0.0 {
                let here = key_of(coord);
                let there = key_of((child.x, child.y));
                let link = if outgoing { (here, there) } else { (there, here) };
                found.insert(link, child.weight);
            }
        }
    }

    /// Connection weight between two substrate points, zeroed below 0.2
    /// and rescaled to `max_weight`.
    fn query_cppn(&mut self, from: Coord, to: Coord, outgoing: bool) -> f64 {
        let input = if outgoing {
            [from.0, from.1, to.0, to.1, 1.0]
        } else {
            [to.0, to.1, from.0, from.1, 1.0]
        };
        let w = self.cppn.activate(&input).first().copied().unwrap_or(0.0);
        if w.abs() <= 0.2 {
            return 0.0;
        }
        let scaled = if w > 0.0 { (w - 0.2) / 0.8 } else { (w + 0.2) / 0.8 };
        scaled * self.params.max_weight
    }

    /// Keep only nodes on some input-to-output path
    fn clean_net(
        &self,
        connections: BTreeMap<Link, f64>,
    ) -> (BTreeSet<CoordKey>, BTreeMap<Link, f64>) {
        let inputs: BTreeSet<CoordKey> =
            self.substrate.input_coordinates.iter().map(|&c| key_of(c)).collect();
        let outputs: BTreeSet<CoordKey> =
            self.substrate.output_coordinates.iter().map(|&c| key_of(c)).collect();

        let mut from_inputs = inputs.clone();
        loop {
            let before = from_inputs.len();
            for (source, target) in connections.keys() {
                if from_inputs.contains(source) {
                    from_inputs.insert(*target);
                }
            }
            if from_inputs.len() == before {
                break;
            }
        }

        let mut to_outputs = outputs.clone();
        loop {
            let before = to_outputs.len();
            for (source, target) in connections.keys() {
                if to_outputs.contains(target) {
                    to_outputs.insert(*source);
                }
            }
            if to_outputs.len() == before {
                break;
            }
        }

        let on_path: BTreeSet<CoordKey> = from_inputs.intersection(&to_outputs).copied().collect();
        let kept: BTreeMap<Link, f64> = connections
            .into_iter()
            .filter(|((s, t), _)| on_path.contains(s) && on_path.contains(t))
            .collect();
        let hidden = on_path
            .into_iter()
            .filter(|n| !inputs.contains(n) && !outputs.contains(n))
            .collect();
        (hidden, kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{ConnectionGene, Genome, GenomeConfig, NodeGene};
    use crate::network::ActivationFunction;

    /// CPPN whose output is `activation(Σ w_i * input_i)`
    fn linear_cppn(weights: [f64; 5], activation: ActivationFunction) -> FeedForwardNetwork {
        let config = GenomeConfig::default();
        let mut genome = Genome::new(0);
        genome.nodes.insert(
            0,
            NodeGene {
                key: 0,
                bias: 0.0,
                response: 1.0,
                activation,
                aggregation: AggregationFunction::Sum,
            },
        );
        for (i, w) in weights.iter().enumerate() {
            let key = (-(i as i64) - 1, 0);
            genome
                .connections
                .insert(key, ConnectionGene { key, weight: *w, enabled: true });
        }
        FeedForwardNetwork::create(&genome, &config)
    }

    #[test]
    fn test_quadtree_variance() {
        let mut point = QuadPoint::new(0.0, 0.0, 1.0, 1);
        assert_eq!(point.variance(), 0.0);
        point.children = (0..4)
            .map(|i| {
                let mut c = QuadPoint::new(0.0, 0.0, 0.5, 2);
                c.weight = if i % 2 == 0 { 1.0 } else { -1.0 };
                c
            })
            .collect();
        assert_eq!(point.variance(), 1.0);
    }

    #[test]
    fn test_query_threshold_and_scaling() {
        let substrate = Substrate::xor();
        let params = EsParams::default();
        // Identity on the bias input only
        let cppn = linear_cppn([0.0, 0.0, 0.0, 0.0, 0.6], ActivationFunction::Identity);
        let mut net = EsNetwork::new(&substrate, cppn, &params);
        let w = net.query_cppn((0.0, 0.0), (1.0, 1.0), true);
        assert!((w - 0.5 * params.max_weight).abs() < 1e-9);

        let cppn = linear_cppn([0.0, 0.0, 0.0, 0.0, 0.1], ActivationFunction::Identity);
        let mut net = EsNetwork::new(&substrate, cppn, &params);
        assert_eq!(net.query_cppn((0.0, 0.0), (1.0, 1.0), true), 0.0);
    }

    #[test]
    fn test_flat_cppn_yields_empty_substrate() {
        let substrate = Substrate::xor();
        let params = EsParams::default();
        let cppn = linear_cppn([0.0; 5], ActivationFunction::Identity);
        let mut net = EsNetwork::new(&substrate, cppn, &params);
        let phenotype = net.create_phenotype_network();

        assert_eq!(phenotype.input_nodes, vec![0, 1, 2]);
        assert_eq!(phenotype.output_nodes, vec![3]);
        assert_eq!(phenotype.num_connections(), 0);
        assert_eq!(phenotype.activations, 5);
    }

    #[test]
    fn test_phenotype_indices_are_dense() {
        let substrate = Substrate::xor();
        let params = EsParams::default();
        let cppn = linear_cppn([1.5, -2.0, 2.5, 3.0, 0.0], ActivationFunction::Sin);
        let mut net = EsNetwork::new(&substrate, cppn, &params);
        let mut phenotype = net.create_phenotype_network();

        let size = phenotype.num_nodes();
        for eval in &phenotype.node_evals {
            assert!(eval.node >= 3 && eval.node < size);
            for (source, _) in &eval.links {
                assert!(*source < size);
            }
        }
        let out = phenotype.activate(&[1.0, 0.0, 1.0]);
        assert_eq!(out.len(), 1);
    }
}
