use super::note_taker::ExperimentRecord;
use crate::stats::{mean, median, percentile, stdev, FitnessStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl SummaryStatistics {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            mean: mean(values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_dev: stdev(values),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuartileStatistics {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl QuartileStatistics {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            q1: percentile(values, 25.0),
            median: median(values),
            q3: percentile(values, 75.0),
        }
    }
}

/// One generation across every analysed run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: u32,
    pub runs: usize,
    pub population_start_size: SummaryStatistics,
    pub population_end_size: SummaryStatistics,
    pub active_species_count: SummaryStatistics,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessStatsSummary {
    pub best_fitness: SummaryStatistics,
    pub worst_fitness: SummaryStatistics,
    pub mean_fitness: SummaryStatistics,
    pub median_fitness: SummaryStatistics,
    pub fitness_variance: SummaryStatistics,
    pub fitness_quartiles: QuartileStatistics,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStatistics {
    pub total_experiments: usize,
    pub solved_experiments: usize,
    pub generation_statistics: BTreeMap<u32, GenerationStats>,
    pub fitness_statistics: FitnessStatsSummary,
}

/// Aggregates experiment records into cross-run statistics
pub struct Analyst<'a> {
    records: &'a [ExperimentRecord],
}

impl<'a> Analyst<'a> {
    pub fn new(records: &'a [ExperimentRecord]) -> Self {
        Self { records }
    }

    pub fn aggregate_generation_stats(&self) -> BTreeMap<u32, GenerationStats> {
        let mut columns: BTreeMap<u32, [Vec<f64>; 3]> = BTreeMap::new();
        for summary in self.records.iter().flat_map(|r| &r.generations) {
            let column = columns.entry(summary.generation).or_default();
            column[0].push(summary.population_start_size as f64);
            column[1].push(summary.population_end_size as f64);
            column[2].push(summary.active_species_count as f64);
        }

        columns
            .into_iter()
            .map(|(generation, [start, end, species])| {
                let stats = GenerationStats {
                    generation,
                    runs: start.len(),
                    population_start_size: SummaryStatistics::from_values(&start),
                    population_end_size: SummaryStatistics::from_values(&end),
                    active_species_count: SummaryStatistics::from_values(&species),
                };
                (generation, stats)
            })
            .collect()
    }

    pub fn aggregate_fitness_stats(&self) -> FitnessStatsSummary {
        let stats: Vec<_> = self.records.iter().flat_map(|r| &r.fitness_stats).collect();
        let column = |f: fn(&FitnessStats) -> f64| -> Vec<f64> { stats.iter().map(|&s| f(s)).collect() };
        let quartiles: Vec<f64> = stats.iter().flat_map(|s| s.quartiles).collect();

        FitnessStatsSummary {
            best_fitness: SummaryStatistics::from_values(&column(|s| s.best)),
            worst_fitness: SummaryStatistics::from_values(&column(|s| s.worst)),
            mean_fitness: SummaryStatistics::from_values(&column(|s| s.mean)),
            median_fitness: SummaryStatistics::from_values(&column(|s| s.median)),
            fitness_variance: SummaryStatistics::from_values(&column(|s| s.variance)),
            fitness_quartiles: QuartileStatistics::from_values(&quartiles),
        }
    }

    pub fn compute_aggregated_statistics(&self) -> AggregatedStatistics {
        AggregatedStatistics {
            total_experiments: self.records.len(),
            solved_experiments: self.records.iter().filter(|r| r.solved()).count(),
            generation_statistics: self.aggregate_generation_stats(),
            fitness_statistics: self.aggregate_fitness_stats(),
        }
    }
}
