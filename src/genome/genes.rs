//! Node and connection genes.

use super::config::GenomeConfig;
use super::{ConnectionKey, NodeKey};
use crate::network::{ActivationFunction, AggregationFunction};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A hidden or output node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub key: NodeKey,
    pub bias: f64,
    pub response: f64,
    pub activation: ActivationFunction,
    pub aggregation: AggregationFunction,
}

impl NodeGene {
    /// Create a node with freshly initialised attributes
    pub fn new<R: Rng + ?Sized>(key: NodeKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self {
            key,
            bias: config.bias.init_value(rng),
            response: config.response.init_value(rng),
            activation: config
                .activation
                .init_value(rng)
                .unwrap_or(ActivationFunction::Sigmoid),
            aggregation: config
                .aggregation
                .init_value(rng)
                .unwrap_or(AggregationFunction::Sum),
        }
    }

    pub fn mutate<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.bias = config.bias.mutate_value(self.bias, rng);
        self.response = config.response.mutate_value(self.response, rng);
        self.activation = config.activation.mutate_value(&self.activation, rng);
        self.aggregation = config.aggregation.mutate_value(&self.aggregation, rng);
    }

    pub fn distance(&self, other: &NodeGene, config: &GenomeConfig) -> f64 {
        let mut d = (self.bias - other.bias).abs() + (self.response - other.response).abs();
        if self.activation != other.activation {
            d += 1.0;
        }
        if self.aggregation != other.aggregation {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }

    /// Homologous crossover: each attribute comes from either parent
    pub fn crossover<R: Rng + ?Sized>(&self, other: &NodeGene, rng: &mut R) -> NodeGene {
        debug_assert_eq!(self.key, other.key);
        NodeGene {
            key: self.key,
            bias: pick(rng, self.bias, other.bias),
            response: pick(rng, self.response, other.response),
            activation: pick(rng, self.activation, other.activation),
            aggregation: pick(rng, self.aggregation, other.aggregation),
        }
    }
}

/// A weighted link between two nodes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub key: ConnectionKey,
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    pub fn new<R: Rng + ?Sized>(key: ConnectionKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self {
            key,
            weight: config.weight.init_value(rng),
            enabled: config.enabled.init_value(rng),
        }
    }

    pub fn mutate<R: Rng + ?Sized>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.weight = config.weight.mutate_value(self.weight, rng);
        self.enabled = config.enabled.mutate_value(self.enabled, rng);
    }

    pub fn distance(&self, other: &ConnectionGene, config: &GenomeConfig) -> f64 {
        let mut d = (self.weight - other.weight).abs();
        if self.enabled != other.enabled {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }

    pub fn crossover<R: Rng + ?Sized>(
        &self,
        other: &ConnectionGene,
        rng: &mut R,
    ) -> ConnectionGene {
        debug_assert_eq!(self.key, other.key);
        ConnectionGene {
            key: self.key,
            weight: pick(rng, self.weight, other.weight),
            enabled: pick(rng, self.enabled, other.enabled),
        }
    }
}

#[inline]
fn pick<T, R: Rng + ?Sized>(rng: &mut R, ours: T, theirs: T) -> T {
    if rng.gen::<f64>() > 0.5 {
        ours
    } else {
        theirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn node(key: NodeKey, bias: f64, activation: ActivationFunction) -> NodeGene {
        NodeGene {
            key,
            bias,
            response: 1.0,
            activation,
            aggregation: AggregationFunction::Sum,
        }
    }

    #[test]
    fn test_node_distance() {
        let config = GenomeConfig::default();
        let a = node(0, 0.0, ActivationFunction::Sigmoid);
        let b = node(0, 1.0, ActivationFunction::Tanh);
        // (|0 - 1| + 1 activation mismatch) * 0.5
        assert_relative_eq!(a.distance(&b, &config), 1.0);
        assert_relative_eq!(a.distance(&a, &config), 0.0);
    }

    #[test]
    fn test_connection_distance() {
        let config = GenomeConfig::default();
        let a = ConnectionGene { key: (-1, 0), weight: 0.5, enabled: true };
        let b = ConnectionGene { key: (-1, 0), weight: -0.5, enabled: false };
        assert_relative_eq!(a.distance(&b, &config), 1.0);
    }

    #[test]
    fn test_crossover_takes_attributes_from_parents() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let a = ConnectionGene { key: (-1, 0), weight: 1.0, enabled: true };
        let b = ConnectionGene { key: (-1, 0), weight: 2.0, enabled: true };
        for _ in 0..20 {
            let child = a.crossover(&b, &mut rng);
            assert!(child.weight == 1.0 || child.weight == 2.0);
            assert_eq!(child.key, (-1, 0));
        }
    }
}
