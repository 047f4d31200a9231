//! Directed-graph utilities over connection keys.

use crate::genome::{ConnectionKey, NodeKey};
use std::collections::BTreeSet;

/// Would adding `test` to `connections` create a cycle?
///
/// Assumes `connections` itself is acyclic.
pub fn creates_cycle(connections: &[ConnectionKey], test: ConnectionKey) -> bool {
    let (input, output) = test;
    if input == output {
        return true;
    }

    let mut visited = BTreeSet::from([output]);
    loop {
        let mut added = 0;
        for &(a, b) in connections {
            if visited.contains(&a) && !visited.contains(&b) {
                if b == input {
                    return true;
                }
                visited.insert(b);
                added += 1;
            }
        }
        if added == 0 {
            return false;
        }
    }
}

/// Nodes whose state can influence the outputs.
///
/// Inputs are excluded; outputs are always included.
pub fn required_for_output(
    inputs: &[NodeKey],
    outputs: &[NodeKey],
    connections: &[ConnectionKey],
) -> BTreeSet<NodeKey> {
    let mut required: BTreeSet<NodeKey> = outputs.iter().copied().collect();
    let mut frontier = required.clone();
    loop {
        let layer: BTreeSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| frontier.contains(b) && !frontier.contains(a))
            .map(|&(a, _)| a)
            .collect();
        if layer.is_empty() {
            break;
        }
        let hidden: Vec<NodeKey> = layer
            .iter()
            .copied()
            .filter(|n| !inputs.contains(n))
            .collect();
        if hidden.is_empty() {
            break;
        }
        required.extend(hidden);
        frontier.extend(layer);
    }
    required
}

/// Group nodes into layers that can be evaluated in order.
///
/// Each layer only depends on inputs and earlier layers. Nodes that do not
/// contribute to any output are left out.
pub fn feed_forward_layers(
    inputs: &[NodeKey],
    outputs: &[NodeKey],
    connections: &[ConnectionKey],
) -> Vec<Vec<NodeKey>> {
    let required = required_for_output(inputs, outputs, connections);

    let mut layers = Vec::new();
    let mut evaluated: BTreeSet<NodeKey> = inputs.iter().copied().collect();
    loop {
        let candidates: BTreeSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| evaluated.contains(a) && !evaluated.contains(b))
            .map(|&(_, b)| b)
            .collect();

        let layer: Vec<NodeKey> = candidates
            .into_iter()
            .filter(|n| required.contains(n))
            .filter(|n| {
                connections
                    .iter()
                    .filter(|(_, b)| b == n)
                    .all(|(a, _)| evaluated.contains(a))
            })
            .collect();

        if layer.is_empty() {
            break;
        }
        evaluated.extend(layer.iter().copied());
        layers.push(layer);
    }
    layers
}
