use super::{Gym, Individual};
use crate::models::{EvaluationData, UserData};
use rand::{Rng, RngCore};

/// Stands in for a human rater.
///
/// The network is driven with a constant stimulus; the mean of its clamped
/// outputs becomes a 0-5 rating and the session length is random.
#[derive(Clone, Debug)]
pub struct SimulatedUserGym {
    pub stimulus: f64,
    pub max_rating: i32,
    pub max_session_seconds: u32,
}

impl Default for SimulatedUserGym {
    fn default() -> Self {
        Self {
            stimulus: 0.5,
            max_rating: 5,
            max_session_seconds: 1000,
        }
    }
}

impl SimulatedUserGym {
    pub fn simulate(&self, individual: &mut Individual, rng: &mut dyn RngCore) -> UserData {
        let network = &mut individual.network;
        let inputs = vec![self.stimulus; network.input_nodes.len()];
        network.reset();
        let mut outputs = Vec::new();
        for _ in 0..network.activations.max(1) {
            outputs = network.activate(&inputs);
        }

        let response = if outputs.is_empty() {
            0.0
        } else {
            outputs.iter().map(|o| o.clamp(0.0, 1.0)).sum::<f64>() / outputs.len() as f64
        };
        let user_rating = (response * self.max_rating as f64).round() as i32;

        UserData {
            experiment_data: individual.experiment_data,
            time_since_startup: rng.gen_range(0..=self.max_session_seconds) as f64,
            user_rating,
            ..UserData::default()
        }
    }
}

impl Gym for SimulatedUserGym {
    fn name(&self) -> &'static str {
        "simulated_user"
    }

    fn run(&self, individual: &mut Individual, rng: &mut dyn RngCore) -> Option<EvaluationData> {
        Some(self.simulate(individual, rng).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExperimentData;
    use crate::network::{ActivationFunction, AggregationFunction, NodeEval, RecurrentNetwork};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn constant_network(bias: f64) -> RecurrentNetwork {
        let output = NodeEval {
            node: 1,
            activation: ActivationFunction::Identity,
            aggregation: AggregationFunction::Sum,
            bias,
            response: 1.0,
            links: Vec::new(),
        };
        RecurrentNetwork::new(vec![0], vec![1], vec![output], 1)
    }

    #[test]
    fn test_rating_follows_output() {
        let gym = SimulatedUserGym::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for (bias, rating) in [(0.0, 0), (0.6, 3), (1.0, 5), (7.0, 5), (-3.0, 0)] {
            let mut individual = Individual {
                experiment_data: ExperimentData {
                    experiment_id: 1,
                    genome_id: 4,
                },
                network: constant_network(bias),
            };
            let data = gym.simulate(&mut individual, &mut rng);
            assert_eq!(data.user_rating, rating);
            assert_eq!(data.experiment_data.genome_id, 4);
            assert!((0.0..=1000.0).contains(&data.time_since_startup));
        }
    }
}
