//! Genome-level parameters from the `[DefaultGenome]` section.

use super::attributes::{
    check_probability, BoolAttributeConfig, BoolDefault, ChoiceAttributeConfig,
    FloatAttributeConfig, InitType,
};
use super::NodeKey;
use crate::network::{ActivationFunction, AggregationFunction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// How a fresh genome is wired
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InitialConnection {
    Unconnected,
    FsNeatNoHidden,
    FsNeatHidden,
    FullNoDirect,
    FullDirect,
    PartialNoDirect(f64),
    PartialDirect(f64),
}

impl FromStr for InitialConnection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let kind = parts.next().unwrap_or("").to_ascii_lowercase();
        let fraction = match parts.next() {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .map_err(|_| format!("invalid partial connection fraction '{}'", raw))?,
            ),
            None => None,
        };
        let partial = |f: Option<f64>| -> Result<f64, String> {
            let f = f.ok_or_else(|| format!("'{}' needs a connection fraction", kind))?;
            if !(0.0..=1.0).contains(&f) {
                return Err(format!("partial connection fraction {} not in [0, 1]", f));
            }
            Ok(f)
        };
        match kind.as_str() {
            "unconnected" => Ok(Self::Unconnected),
            "fs_neat" | "fs_neat_nohidden" => Ok(Self::FsNeatNoHidden),
            "fs_neat_hidden" => Ok(Self::FsNeatHidden),
            "full" | "full_nodirect" => Ok(Self::FullNoDirect),
            "full_direct" => Ok(Self::FullDirect),
            "partial" | "partial_nodirect" => Ok(Self::PartialNoDirect(partial(fraction)?)),
            "partial_direct" => Ok(Self::PartialDirect(partial(fraction)?)),
            other => Err(format!("unknown initial_connection '{}'", other)),
        }
    }
}

impl fmt::Display for InitialConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::FsNeatNoHidden => write!(f, "fs_neat_nohidden"),
            Self::FsNeatHidden => write!(f, "fs_neat_hidden"),
            Self::FullNoDirect => write!(f, "full_nodirect"),
            Self::FullDirect => write!(f, "full_direct"),
            Self::PartialNoDirect(p) => write!(f, "partial_nodirect {}", p),
            Self::PartialDirect(p) => write!(f, "partial_direct {}", p),
        }
    }
}

/// Whether structural mutations insist on succeeding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralSurer {
    /// Follows `single_structural_mutation`
    Default,
    True,
    False,
}

impl FromStr for StructuralSurer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "1" | "on" | "yes" | "true" => Ok(Self::True),
            "0" | "off" | "no" | "false" => Ok(Self::False),
            other => Err(format!("invalid structural_mutation_surer '{}'", other)),
        }
    }
}

impl fmt::Display for StructuralSurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
        }
    }
}

/// Monotonic source of hidden-node keys shared by every genome of a run.
///
/// Never hands out a key at or below the largest key of the genome asking,
/// so it recovers on its own after a checkpoint restore.
#[derive(Debug, Default)]
pub struct NodeIndexer {
    next: AtomicI64,
}

impl NodeIndexer {
    pub fn next_key<'a, I>(&self, existing: I) -> NodeKey
    where
        I: IntoIterator<Item = &'a NodeKey>,
    {
        let floor = existing.into_iter().copied().max().map_or(0, |k| k + 1);
        self.next.fetch_max(floor, Ordering::SeqCst);
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Clone for NodeIndexer {
    fn clone(&self) -> Self {
        Self {
            next: AtomicI64::new(self.next.load(Ordering::SeqCst)),
        }
    }
}

impl PartialEq for NodeIndexer {
    fn eq(&self, _other: &Self) -> bool {
        // Counter state is not part of the configuration.
        true
    }
}

/// Genome configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenomeConfig {
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub num_hidden: usize,
    pub feed_forward: bool,
    pub initial_connection: InitialConnection,
    pub compatibility_disjoint_coefficient: f64,
    pub compatibility_weight_coefficient: f64,
    pub conn_add_prob: f64,
    pub conn_delete_prob: f64,
    pub node_add_prob: f64,
    pub node_delete_prob: f64,
    pub single_structural_mutation: bool,
    pub structural_mutation_surer: StructuralSurer,
    pub activation: ChoiceAttributeConfig<ActivationFunction>,
    pub aggregation: ChoiceAttributeConfig<AggregationFunction>,
    pub bias: FloatAttributeConfig,
    pub response: FloatAttributeConfig,
    pub weight: FloatAttributeConfig,
    pub enabled: BoolAttributeConfig,
    #[serde(skip)]
    pub node_indexer: NodeIndexer,
}

impl Default for GenomeConfig {
    /// CPPN queried with (x1, y1, x2, y2, bias) producing one weight
    fn default() -> Self {
        Self {
            num_inputs: 5,
            num_outputs: 1,
            num_hidden: 0,
            feed_forward: true,
            initial_connection: InitialConnection::FullDirect,
            compatibility_disjoint_coefficient: 1.0,
            compatibility_weight_coefficient: 0.5,
            conn_add_prob: 0.5,
            conn_delete_prob: 0.5,
            node_add_prob: 0.2,
            node_delete_prob: 0.2,
            single_structural_mutation: false,
            structural_mutation_surer: StructuralSurer::Default,
            activation: ChoiceAttributeConfig {
                default: Some(ActivationFunction::Sigmoid),
                options: vec![
                    ActivationFunction::Sigmoid,
                    ActivationFunction::Gauss,
                    ActivationFunction::Sin,
                    ActivationFunction::Tanh,
                    ActivationFunction::Abs,
                ],
                mutate_rate: 0.1,
            },
            aggregation: ChoiceAttributeConfig {
                default: Some(AggregationFunction::Sum),
                options: vec![AggregationFunction::Sum],
                mutate_rate: 0.0,
            },
            bias: FloatAttributeConfig {
                init_mean: 0.0,
                init_stdev: 1.0,
                init_type: InitType::Gaussian,
                replace_rate: 0.1,
                mutate_rate: 0.7,
                mutate_power: 0.5,
                max_value: 30.0,
                min_value: -30.0,
            },
            response: FloatAttributeConfig {
                init_mean: 1.0,
                init_stdev: 0.0,
                init_type: InitType::Gaussian,
                replace_rate: 0.0,
                mutate_rate: 0.0,
                mutate_power: 0.0,
                max_value: 30.0,
                min_value: -30.0,
            },
            weight: FloatAttributeConfig {
                init_mean: 0.0,
                init_stdev: 1.0,
                init_type: InitType::Gaussian,
                replace_rate: 0.1,
                mutate_rate: 0.8,
                mutate_power: 0.5,
                max_value: 30.0,
                min_value: -30.0,
            },
            enabled: BoolAttributeConfig {
                default: BoolDefault::True,
                mutate_rate: 0.01,
                rate_to_true_add: 0.0,
                rate_to_false_add: 0.0,
            },
            node_indexer: NodeIndexer::default(),
        }
    }
}

impl GenomeConfig {
    /// Input pin keys: -1, -2, ..., -num_inputs
    pub fn input_keys(&self) -> Vec<NodeKey> {
        (0..self.num_inputs as NodeKey).map(|i| -i - 1).collect()
    }

    /// Output node keys: 0, 1, ..., num_outputs - 1
    pub fn output_keys(&self) -> Vec<NodeKey> {
        (0..self.num_outputs as NodeKey).collect()
    }

    pub fn is_output(&self, key: NodeKey) -> bool {
        key >= 0 && (key as usize) < self.num_outputs
    }

    pub fn is_input(&self, key: NodeKey) -> bool {
        key < 0 && ((-key) as usize) <= self.num_inputs
    }

    /// Whether a failed structural mutation should fall back to the nearest
    /// alternative (re-enable an existing connection, add a connection
    /// instead of splitting one).
    pub fn structural_surer(&self) -> bool {
        match self.structural_mutation_surer {
            StructuralSurer::True => true,
            StructuralSurer::False => false,
            StructuralSurer::Default => self.single_structural_mutation,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.num_inputs == 0 || self.num_outputs == 0 {
            return Err("num_inputs and num_outputs must be > 0".to_string());
        }
        for (name, value) in [
            ("conn_add_prob", self.conn_add_prob),
            ("conn_delete_prob", self.conn_delete_prob),
            ("node_add_prob", self.node_add_prob),
            ("node_delete_prob", self.node_delete_prob),
        ] {
            check_probability(name, value)?;
        }
        if self.compatibility_disjoint_coefficient < 0.0
            || self.compatibility_weight_coefficient < 0.0
        {
            return Err("compatibility coefficients must be >= 0".to_string());
        }
        self.activation.validate("activation")?;
        self.aggregation.validate("aggregation")?;
        self.bias.validate("bias")?;
        self.response.validate("response")?;
        self.weight.validate("weight")?;
        self.enabled.validate("enabled")?;
        Ok(())
    }
}
