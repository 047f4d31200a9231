use super::{data_kind, FitnessError, FitnessFunction};
use crate::models::EvaluationData;

/// Rewards time spent with a mediator and the rating given to it.
///
/// Both terms are min-max normalised over the batch with a `+ 1` in the
/// denominator, so each lies in `[0, 1)` and fitness in `[0, 2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserEvaluatedFitness;

impl FitnessFunction for UserEvaluatedFitness {
    fn name(&self) -> &'static str {
        "user_evaluated"
    }

    fn evaluate(&self, batch: &[&EvaluationData]) -> Result<Vec<f64>, FitnessError> {
        let mut samples = Vec::with_capacity(batch.len());
        for data in batch {
            match data {
                EvaluationData::User(user) => {
                    samples.push((user.time_since_startup, user.user_rating as f64))
                }
                other => {
                    return Err(FitnessError::UnexpectedData {
                        function: self.name(),
                        found: data_kind(other),
                    })
                }
            }
        }
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let (mut min_time, mut max_time) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_rating, mut max_rating) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(time, rating) in &samples {
            min_time = min_time.min(time);
            max_time = max_time.max(time);
            min_rating = min_rating.min(rating);
            max_rating = max_rating.max(rating);
        }

        Ok(samples
            .into_iter()
            .map(|(time, rating)| {
                (time - min_time) / (max_time - min_time + 1.0)
                    + (rating - min_rating) / (max_rating - min_rating + 1.0)
            })
            .collect())
    }
}
