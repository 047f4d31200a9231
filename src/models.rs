//! Data exchanged with evaluators: user sessions, gym logs and phenotypes.

use crate::genome::GenomeId;
use serde::{Deserialize, Serialize};

/// Routes an evaluation back to its experiment and genome
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentData {
    pub experiment_id: u32,
    pub genome_id: GenomeId,
}

/// What an interactive client reports after talking to a mediator
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub experiment_data: ExperimentData,
    /// Seconds the user spent with this mediator
    pub time_since_startup: f64,
    pub user_rating: i32,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<f64>,
    #[serde(default)]
    pub last_response: Option<String>,
    #[serde(default)]
    pub last_response_time: Option<f64>,
}

/// Log of one XOR gym run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XorData {
    pub experiment_data: ExperimentData,
    pub inputs: Vec<Vec<f64>>,
    pub outputs: Vec<Vec<f64>>,
    pub expected_outputs: Vec<Vec<f64>>,
}

/// Any evaluation a fitness function can score
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationData {
    User(UserData),
    Xor(XorData),
}

impl EvaluationData {
    pub fn experiment_data(&self) -> ExperimentData {
        match self {
            Self::User(data) => data.experiment_data,
            Self::Xor(data) => data.experiment_data,
        }
    }
}

impl From<UserData> for EvaluationData {
    fn from(data: UserData) -> Self {
        Self::User(data)
    }
}

impl From<XorData> for EvaluationData {
    fn from(data: XorData) -> Self {
        Self::Xor(data)
    }
}

/// A serialized mediator network handed to a client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeData {
    pub experiment_data: ExperimentData,
    /// Base64 of the bincode-encoded [`RecurrentNetwork`](crate::network::RecurrentNetwork)
    pub new_mediator: String,
}

/// Body returned by the mediator endpoints
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseModel {
    pub phenotype: PhenotypeData,
    pub message: String,
}
