//! Recurrent network used as the ES-HyperNEAT phenotype.
//!
//! Node values are double-buffered: each activation reads the previous
//! step's values and writes the other buffer, so arbitrary recurrent links
//! are evaluated synchronously.

use super::{ActivationFunction, AggregationFunction};
use serde::{Deserialize, Serialize};

/// Evaluation record of one non-input node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeEval<K> {
    pub node: K,
    pub activation: ActivationFunction,
    pub aggregation: AggregationFunction,
    pub bias: f64,
    pub response: f64,
    /// `(source node, weight)`
    pub links: Vec<(K, f64)>,
}

/// Recurrent network over dense node indices.
///
/// Inputs occupy `0..n_inputs`, outputs follow, then hidden nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentNetwork {
    pub input_nodes: Vec<usize>,
    pub output_nodes: Vec<usize>,
    pub node_evals: Vec<NodeEval<usize>>,
    values: [Vec<f64>; 2],
    active: usize,
    /// Activations needed for a signal to cross the deepest substrate
    pub activations: usize,
}

impl RecurrentNetwork {
    pub fn new(
        input_nodes: Vec<usize>,
        output_nodes: Vec<usize>,
        node_evals: Vec<NodeEval<usize>>,
        activations: usize,
    ) -> Self {
        let size = input_nodes
            .iter()
            .chain(output_nodes.iter())
            .copied()
            .chain(node_evals.iter().map(|e| e.node))
            .chain(node_evals.iter().flat_map(|e| e.links.iter().map(|(i, _)| *i)))
            .max()
            .map_or(0, |m| m + 1);

        Self {
            input_nodes,
            output_nodes,
            node_evals,
            values: [vec![0.0; size], vec![0.0; size]],
            active: 0,
            activations,
        }
    }

    /// Zero all node values
    pub fn reset(&mut self) {
        for buffer in &mut self.values {
            buffer.iter_mut().for_each(|v| *v = 0.0);
        }
        self.active = 0;
    }

    /// Advance one step; returns the output node values
    pub fn activate(&mut self, inputs: &[f64]) -> Vec<f64> {
        debug_assert_eq!(inputs.len(), self.input_nodes.len());
        let (previous, next) = if self.active == 0 {
            let (a, b) = self.values.split_at_mut(1);
            (&mut a[0], &mut b[0])
        } else {
            let (a, b) = self.values.split_at_mut(1);
            (&mut b[0], &mut a[0])
        };
        self.active = 1 - self.active;

        for (&i, &v) in self.input_nodes.iter().zip(inputs) {
            previous[i] = v;
            next[i] = v;
        }

        let mut incoming = Vec::new();
        for eval in &self.node_evals {
            incoming.clear();
            incoming.extend(eval.links.iter().map(|&(i, w)| previous[i] * w));
            let s = eval.aggregation.apply(&incoming);
            next[eval.node] = eval.activation.apply(eval.bias + eval.response * s);
        }

        self.output_nodes.iter().map(|&i| next[i]).collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.values[0].len()
    }

    pub fn num_connections(&self) -> usize {
        self.node_evals.iter().map(|e| e.links.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn relay(node: usize, links: Vec<(usize, f64)>) -> NodeEval<usize> {
        NodeEval {
            node,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
            bias: 0.0,
            response: 1.0,
            links,
        }
    }

    #[test]
    fn test_signal_takes_one_step_per_hop() {
        // input 0 -> hidden 2 -> output 1
        let mut net = RecurrentNetwork::new(
            vec![0],
            vec![1],
            vec![relay(1, vec![(2, 1.0)]), relay(2, vec![(0, 2.0)])],
            2,
        );
        assert_eq!(net.activate(&[1.0]), vec![0.0]);
        assert_eq!(net.activate(&[1.0]), vec![2.0]);

        net.reset();
        assert_eq!(net.activate(&[1.0]), vec![0.0]);
    }

    #[test]
    fn test_self_loop_accumulates() {
        let mut net = RecurrentNetwork::new(vec![0], vec![1], vec![relay(1, vec![(0, 1.0), (1, 1.0)])], 1);
        net.activate(&[1.0]);
        net.activate(&[1.0]);
        let out = net.activate(&[1.0]);
        assert_relative_eq!(out[0], 3.0);
    }

    #[test]
    fn test_roundtrips_through_bincode() {
        let net = RecurrentNetwork::new(vec![0], vec![1], vec![relay(1, vec![(0, 0.5)])], 3);
        let bytes = bincode::serialize(&net).unwrap();
        let decoded: RecurrentNetwork = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, net);
        assert_eq!(decoded.num_connections(), 1);
    }
}
