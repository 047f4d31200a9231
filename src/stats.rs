//! Statistics helpers and per-generation summaries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reduction used for `fitness_criterion` and `species_fitness_func`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatFunction {
    Max,
    Min,
    Mean,
    Median,
}

impl StatFunction {
    /// `None` for an empty slice
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Mean => mean(values),
            Self::Median => median(values),
        })
    }
}

impl FromStr for StatFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(format!("unknown statistic '{}'", other)),
        }
    }
}

impl fmt::Display for StatFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
            Self::Mean => write!(f, "mean"),
            Self::Median => write!(f, "median"),
        }
    }
}

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median with the two middle values averaged for even lengths
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn stdev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Percentile with linear interpolation between closest ranks
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    let frac = rank - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * frac
}

/// Fitness distribution of the genomes evaluated in one generation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessStats {
    pub best: f64,
    pub worst: f64,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    /// 25th, 50th and 75th percentiles
    pub quartiles: [f64; 3],
}

impl FitnessStats {
    pub fn from_fitnesses(fitnesses: &[f64]) -> Self {
        if fitnesses.is_empty() {
            return Self::default();
        }
        Self {
            best: fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst: fitnesses.iter().copied().fold(f64::INFINITY, f64::min),
            mean: mean(fitnesses),
            median: median(fitnesses),
            variance: variance(fitnesses),
            quartiles: [
                percentile(fitnesses, 25.0),
                percentile(fitnesses, 50.0),
                percentile(fitnesses, 75.0),
            ],
        }
    }
}

/// Snapshot reported at the end of each generation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u32,
    pub population_start_size: usize,
    pub population_end_size: usize,
    pub active_species_count: usize,
    pub fitness_summary: FitnessStats,
}

impl GenerationSummary {
    /// Get one-line summary string
    pub fn summary(&self) -> String {
        format!(
            "G:{:4} | Pop:{:4} -> {:4} | Species:{:3} | Best:{:.3} | Mean:{:.3} | Worst:{:.3}",
            self.generation,
            self.population_start_size,
            self.population_end_size,
            self.active_species_count,
            self.fitness_summary.best,
            self.fitness_summary.mean,
            self.fitness_summary.worst,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(mean(&values), 2.5);
        assert_relative_eq!(median(&values), 2.5);
        assert_relative_eq!(variance(&values), 1.25);
        assert_relative_eq!(stdev(&[2.0, 2.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_stat_functions() {
        let values = [3.0, 1.0, 2.0, 10.0];
        assert_eq!(StatFunction::Max.apply(&values), Some(10.0));
        assert_eq!(StatFunction::Min.apply(&values), Some(1.0));
        assert_eq!(StatFunction::Mean.apply(&values), Some(4.0));
        assert_eq!(StatFunction::Median.apply(&values), Some(2.5));
        assert_eq!(StatFunction::Max.apply(&[]), None);
        assert_eq!("MEAN".parse::<StatFunction>(), Ok(StatFunction::Mean));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(percentile(&values, 25.0), 1.75);
        assert_relative_eq!(percentile(&values, 50.0), 2.5);
        assert_relative_eq!(percentile(&values, 75.0), 3.25);
        assert_relative_eq!(percentile(&values, 100.0), 4.0);
    }

    #[test]
    fn test_fitness_stats() {
        let stats = FitnessStats::from_fitnesses(&[0.5, 1.5, 1.0]);
        assert_relative_eq!(stats.best, 1.5);
        assert_relative_eq!(stats.worst, 0.5);
        assert_relative_eq!(stats.mean, 1.0);
        assert_relative_eq!(stats.quartiles[1], 1.0);
        assert_eq!(FitnessStats::from_fitnesses(&[]), FitnessStats::default());
    }

    #[test]
    fn test_summary_line() {
        let summary = GenerationSummary {
            generation: 3,
            population_start_size: 30,
            population_end_size: 31,
            active_species_count: 2,
            fitness_summary: FitnessStats::from_fitnesses(&[1.0]),
        };
        assert!(summary.summary().contains("Species:  2"));
    }
}
