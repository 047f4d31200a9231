use super::{data_kind, FitnessError, FitnessFunction};
use crate::models::{EvaluationData, XorData};

/// `1 - mean squared error` of the first output over the XOR truth table
#[derive(Debug, Default, Clone, Copy)]
pub struct XorFitness;

impl XorFitness {
    pub fn score(&self, log: &XorData) -> Result<f64, FitnessError> {
        let n = log.inputs.len();
        if n == 0 {
            return Err(FitnessError::EmptyLog { function: self.name() });
        }
        let sse: f64 = log
            .outputs
            .iter()
            .zip(&log.expected_outputs)
            .map(|(out, expected)| {
                let o = out.first().copied().unwrap_or(0.0);
                let e = expected.first().copied().unwrap_or(0.0);
                (o - e).powi(2) / n as f64
            })
            .sum();
        Ok(1.0 - sse)
    }
}

impl FitnessFunction for XorFitness {
    fn name(&self) -> &'static str {
        "xor"
    }

    fn evaluate(&self, batch: &[&EvaluationData]) -> Result<Vec<f64>, FitnessError> {
        batch
            .iter()
            .map(|data| match data {
                EvaluationData::Xor(log) => self.score(log),
                other => Err(FitnessError::UnexpectedData {
                    function: self.name(),
                    found: data_kind(other),
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn log(outputs: [f64; 4]) -> XorData {
        XorData {
            inputs: vec![
                vec![0.0, 0.0, 1.0],
                vec![0.0, 1.0, 1.0],
                vec![1.0, 0.0, 1.0],
                vec![1.0, 1.0, 1.0],
            ],
            outputs: outputs.iter().map(|o| vec![*o]).collect(),
            expected_outputs: vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]],
            ..XorData::default()
        }
    }

    #[test]
    fn test_perfect_solution_scores_one() {
        assert_relative_eq!(XorFitness.score(&log([0.0, 1.0, 1.0, 0.0])).unwrap(), 1.0);
    }

    #[test]
    fn test_constant_half_output() {
        assert_relative_eq!(XorFitness.score(&log([0.5; 4])).unwrap(), 0.75);
    }

    #[test]
    fn test_empty_log_is_an_error() {
        assert!(XorFitness.score(&XorData::default()).is_err());
    }
}
