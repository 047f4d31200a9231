//! Genome to mediator network translation.
//!
//! A genome encodes a CPPN; the CPPN is expanded into a recurrent substrate
//! network with ES-HyperNEAT, then shipped to clients as base64 of its
//! bincode encoding.

mod es_hyperneat;
mod substrate;

pub use es_hyperneat::EsNetwork;
pub use substrate::{Coord, EsParams, Substrate, SubstrateVersion};

use crate::genome::{Genome, GenomeConfig};
use crate::network::{FeedForwardNetwork, RecurrentNetwork};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// CPPN inputs: (x1, y1, x2, y2, bias)
pub const CPPN_INPUTS: usize = 5;

/// Phenotype section of an experiment config
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeConfig {
    pub version: SubstrateVersion,
    pub input_coords: Vec<Coord>,
    pub output_coords: Vec<Coord>,
    pub params: EsParams,
}

impl Default for PhenotypeConfig {
    fn default() -> Self {
        let substrate = Substrate::mediator();
        Self {
            version: SubstrateVersion::Medium,
            input_coords: substrate.input_coordinates,
            output_coords: substrate.output_coordinates,
            params: EsParams::for_version(SubstrateVersion::Medium),
        }
    }
}

impl PhenotypeConfig {
    pub fn substrate(&self) -> Substrate {
        Substrate::new(self.input_coords.clone(), self.output_coords.clone())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.input_coords.is_empty() || self.output_coords.is_empty() {
            return Err("substrate needs at least one input and one output".to_string());
        }
        self.params.validate()
    }
}

/// Builds substrate networks for one experiment
#[derive(Clone, Debug)]
pub struct PhenotypeCreator {
    substrate: Substrate,
    params: EsParams,
}

impl PhenotypeCreator {
    pub fn new(substrate: Substrate, params: EsParams) -> Self {
        Self { substrate, params }
    }

    pub fn from_config(config: &PhenotypeConfig) -> Self {
        Self::new(config.substrate(), config.params.clone())
    }

    pub fn substrate(&self) -> &Substrate {
        &self.substrate
    }

    /// Expand a CPPN genome into its substrate network
    pub fn create_network(
        &self,
        genome: &Genome,
        config: &GenomeConfig,
    ) -> Result<RecurrentNetwork, PhenotypeError> {
        if config.num_inputs != CPPN_INPUTS || config.num_outputs == 0 {
            return Err(PhenotypeError::CppnShape {
                inputs: config.num_inputs,
                outputs: config.num_outputs,
            });
        }
        let cppn = FeedForwardNetwork::create(genome, config);
        let mut es = EsNetwork::new(&self.substrate, cppn, &self.params);
        let network = es.create_phenotype_network();
        log::debug!(
            "Genome {} -> substrate with {} nodes, {} connections",
            genome.key,
            network.num_nodes(),
            network.num_connections()
        );
        Ok(network)
    }
}

/// Encode a network for transport
pub fn encode_network(network: &RecurrentNetwork) -> Result<String, PhenotypeError> {
    let bytes = bincode::serialize(network)?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

/// Inverse of [`encode_network`]
pub fn decode_network(encoded: &str) -> Result<RecurrentNetwork, PhenotypeError> {
    let bytes = general_purpose::STANDARD.decode(encoded)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Errors raised while building or encoding a phenotype
#[derive(Debug)]
pub enum PhenotypeError {
    CppnShape { inputs: usize, outputs: usize },
    Encoding(bincode::Error),
    Base64(base64::DecodeError),
}

impl std::fmt::Display for PhenotypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CppnShape { inputs, outputs } => write!(
                f,
                "CPPN must have {} inputs and at least one output, got {} inputs and {} outputs",
                CPPN_INPUTS, inputs, outputs
            ),
            Self::Encoding(e) => write!(f, "Encoding error: {}", e),
            Self::Base64(e) => write!(f, "Base64 error: {}", e),
        }
    }
}

impl std::error::Error for PhenotypeError {}

impl From<bincode::Error> for PhenotypeError {
    fn from(e: bincode::Error) -> Self {
        Self::Encoding(e)
    }
}

impl From<base64::DecodeError> for PhenotypeError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Base64(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_genome_builds_mediator() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = GenomeConfig::default();
        let creator = PhenotypeCreator::from_config(&PhenotypeConfig::default());

        for key in 0..5 {
            let genome = Genome::new_random(key, &config, &mut rng);
            let mut network = creator.create_network(&genome, &config).unwrap();
            assert_eq!(network.input_nodes.len(), 10);
            assert_eq!(network.output_nodes.len(), 10);
            let out = network.activate(&[0.5; 10]);
            assert!(out.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_wrong_cppn_shape_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = GenomeConfig {
            num_inputs: 2,
            ..GenomeConfig::default()
        };
        let genome = Genome::new_random(1, &config, &mut rng);
        let creator = PhenotypeCreator::from_config(&PhenotypeConfig::default());
        assert!(matches!(
            creator.create_network(&genome, &config),
            Err(PhenotypeError::CppnShape { inputs: 2, .. })
        ));
    }

    #[test]
    fn test_encoding_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = GenomeConfig::default();
        let genome = Genome::new_random(1, &config, &mut rng);
        let creator = PhenotypeCreator::new(Substrate::xor(), EsParams::default());
        let network = creator.create_network(&genome, &config).unwrap();

        let encoded = encode_network(&network).unwrap();
        assert_eq!(decode_network(&encoded).unwrap(), network);
        assert!(decode_network("not base64!").is_err());
    }
}
