use super::{Gym, Individual};
use crate::models::{EvaluationData, XorData};
use crate::phenotype::{EsParams, PhenotypeConfig, Substrate, SubstrateVersion};
use rand::RngCore;

pub const XOR_INPUTS: [[f64; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
pub const XOR_OUTPUTS: [f64; 4] = [0.0, 1.0, 1.0, 0.0];

/// Feeds the four XOR cases (plus a constant bias input) through a network
#[derive(Clone, Copy, Debug, Default)]
pub struct XorGym;

impl XorGym {
    /// Small quadtree over the three-input XOR substrate
    pub fn phenotype_config() -> PhenotypeConfig {
        let substrate = Substrate::xor();
        PhenotypeConfig {
            version: SubstrateVersion::Small,
            input_coords: substrate.input_coordinates,
            output_coords: substrate.output_coordinates,
            params: EsParams::for_version(SubstrateVersion::Small),
        }
    }

    pub fn simulate(&self, individual: &mut Individual) -> XorData {
        let network = &mut individual.network;
        let mut log = XorData {
            experiment_data: individual.experiment_data,
            ..XorData::default()
        };

        for (inputs, expected) in XOR_INPUTS.iter().zip(XOR_OUTPUTS) {
            let inputs = vec![inputs[0], inputs[1], 1.0];
            network.reset();
            let mut outputs = Vec::new();
            for _ in 0..network.activations.max(1) {
                outputs = network.activate(&inputs);
            }
            log.inputs.push(inputs);
            log.outputs.push(outputs);
            log.expected_outputs.push(vec![expected]);
        }
        log
    }
}

impl Gym for XorGym {
    fn name(&self) -> &'static str {
        "xor"
    }

    fn run(&self, individual: &mut Individual, _rng: &mut dyn RngCore) -> Option<EvaluationData> {
        Some(self.simulate(individual).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::{FitnessFunction, XorFitness};
    use crate::models::ExperimentData;
    use crate::network::{ActivationFunction, AggregationFunction, NodeEval, RecurrentNetwork};

    /// Output = x1 + x2, ignoring the bias
    fn adder() -> RecurrentNetwork {
        let output = NodeEval {
            node: 3,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
            bias: 0.0,
            response: 1.0,
            links: vec![(0, 1.0), (1, 1.0)],
        };
        RecurrentNetwork::new(vec![0, 1, 2], vec![3], vec![output], 2)
    }

    #[test]
    fn test_xor_log() {
        let mut individual = Individual {
            experiment_data: ExperimentData {
                experiment_id: 2,
                genome_id: 9,
            },
            network: adder(),
        };
        let log = XorGym.simulate(&mut individual);

        assert_eq!(log.experiment_data.genome_id, 9);
        assert_eq!(log.inputs[1], vec![0.0, 1.0, 1.0]);
        assert_eq!(log.outputs, vec![vec![0.0], vec![1.0], vec![1.0], vec![2.0]]);
        assert_eq!(log.expected_outputs[3], vec![0.0]);

        let data: EvaluationData = log.into();
        let fitness = XorFitness.evaluate(&[&data]).unwrap();
        assert!(fitness[0].abs() < 1e-12);
    }

    #[test]
    fn test_phenotype_config_is_valid() {
        let config = XorGym::phenotype_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_coords, vec![(0.0, 1.0)]);
    }
}
