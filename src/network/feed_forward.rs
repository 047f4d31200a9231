//! Feed-forward evaluation, used to query CPPNs.

use super::graph::feed_forward_layers;
use super::recurrent::NodeEval;
use crate::genome::{ConnectionKey, Genome, GenomeConfig, NodeKey};
use std::collections::HashMap;

/// Layered feed-forward network
#[derive(Clone, Debug)]
pub struct FeedForwardNetwork {
    input_nodes: Vec<NodeKey>,
    output_nodes: Vec<NodeKey>,
    node_evals: Vec<NodeEval<NodeKey>>,
    values: HashMap<NodeKey, f64>,
}

impl FeedForwardNetwork {
    /// Build from the enabled connections of a genome
    pub fn create(genome: &Genome, config: &GenomeConfig) -> Self {
        let inputs = config.input_keys();
        let outputs = config.output_keys();
        let connections: Vec<ConnectionKey> = genome
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.key)
            .collect();

        let mut node_evals = Vec::new();
        for layer in feed_forward_layers(&inputs, &outputs, &connections) {
            for node in layer {
                let Some(gene) = genome.nodes.get(&node) else {
                    continue;
                };
                let links = connections
                    .iter()
                    .filter(|(_, o)| *o == node)
                    .filter_map(|key| genome.connections.get(key).map(|c| (key.0, c.weight)))
                    .collect();
                node_evals.push(NodeEval {
                    node,
                    activation: gene.activation,
                    aggregation: gene.aggregation,
                    bias: gene.bias,
                    response: gene.response,
                    links,
                });
            }
        }

        let values = inputs
            .iter()
            .chain(outputs.iter())
            .map(|&k| (k, 0.0))
            .collect();

        Self {
            input_nodes: inputs,
            output_nodes: outputs,
            node_evals,
            values,
        }
    }

    /// Evaluate; `inputs` must match the genome's input count
    pub fn activate(&mut self, inputs: &[f64]) -> Vec<f64> {
        debug_assert_eq!(inputs.len(), self.input_nodes.len());
        for (key, value) in self.input_nodes.iter().zip(inputs) {
            self.values.insert(*key, *value);
        }

        let mut incoming = Vec::new();
        for eval in &self.node_evals {
            incoming.clear();
            incoming.extend(
                eval.links
                    .iter()
                    .map(|(i, w)| self.values.get(i).copied().unwrap_or(0.0) * w),
            );
            let s = eval.aggregation.apply(&incoming);
            self.values
                .insert(eval.node, eval.activation.apply(eval.bias + eval.response * s));
        }

        self.output_nodes
            .iter()
            .map(|k| self.values.get(k).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn num_inputs(&self) -> usize {
        self.input_nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{ConnectionGene, NodeGene};
    use crate::network::{ActivationFunction, AggregationFunction};
    use approx::assert_relative_eq;

    fn identity_node(key: NodeKey) -> NodeGene {
        NodeGene {
            key,
            bias: 0.0,
            response: 1.0,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
        }
    }

    #[test]
    fn test_weighted_sum_through_hidden_node() {
        let config = GenomeConfig {
            num_inputs: 2,
            num_outputs: 1,
            ..GenomeConfig::default()
        };
        let mut genome = Genome::new(1);
        genome.nodes.insert(0, identity_node(0));
        genome.nodes.insert(1, identity_node(1));
        for (key, weight) in [((-1, 1), 2.0), ((-2, 1), -1.0), ((1, 0), 0.5), ((-1, 0), 1.0)] {
            genome.connections.insert(key, ConnectionGene { key, weight, enabled: true });
        }

        let mut net = FeedForwardNetwork::create(&genome, &config);
        let out = net.activate(&[1.0, 3.0]);
        // hidden = 2*1 - 3 = -1; output = 0.5 * -1 + 1 = 0.5
        assert_relative_eq!(out[0], 0.5);
    }

    #[test]
    fn test_disabled_connections_are_ignored() {
        let config = GenomeConfig {
            num_inputs: 1,
            num_outputs: 1,
            ..GenomeConfig::default()
        };
        let mut genome = Genome::new(1);
        genome.nodes.insert(0, identity_node(0));
        genome
            .connections
            .insert((-1, 0), ConnectionGene { key: (-1, 0), weight: 3.0, enabled: false });

        let mut net = FeedForwardNetwork::create(&genome, &config);
        assert_eq!(net.activate(&[1.0]), vec![0.0]);
    }
}
