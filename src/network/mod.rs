//! Network phenotypes built from genomes.
//!
//! - Feed-forward evaluation for CPPNs
//! - Double-buffered recurrent evaluation for ES-HyperNEAT substrates
//! - Graph helpers shared with the genome operators

mod activation;
mod feed_forward;
pub mod graph;
mod recurrent;

pub use activation::{ActivationFunction, AggregationFunction};
pub use feed_forward::FeedForwardNetwork;
pub use recurrent::{NodeEval, RecurrentNetwork};
