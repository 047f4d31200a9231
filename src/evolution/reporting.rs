//! Hooks for observing an evolving population.

use super::species::SpeciesId;
use crate::genome::Genome;
use crate::stats::{FitnessStats, GenerationSummary};

/// Receives evolution events. Every method defaults to doing nothing.
pub trait Reporter: Send + Sync {
    fn start_generation(&mut self, _generation: u32) {}
    fn post_evaluate(&mut self, _generation: u32, _stats: &FitnessStats, _best: &Genome) {}
    fn post_reproduction(&mut self, _generation: u32, _offspring: usize, _deaths: usize) {}
    fn end_generation(&mut self, _summary: &GenerationSummary) {}
    fn species_stagnant(&mut self, _species_id: SpeciesId, _size: usize) {}
    fn complete_extinction(&mut self) {}
    fn found_solution(&mut self, _generation: u32, _best: &Genome) {}
    fn info(&mut self, _message: &str) {}
}

/// Fans every event out to a list of reporters
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for ReporterSet {
    fn start_generation(&mut self, generation: u32) {
        self.reporters.iter_mut().for_each(|r| r.start_generation(generation));
    }

    fn post_evaluate(&mut self, generation: u32, stats: &FitnessStats, best: &Genome) {
        self.reporters
            .iter_mut()
            .for_each(|r| r.post_evaluate(generation, stats, best));
    }

    fn post_reproduction(&mut self, generation: u32, offspring: usize, deaths: usize) {
        self.reporters
            .iter_mut()
            .for_each(|r| r.post_reproduction(generation, offspring, deaths));
    }

    fn end_generation(&mut self, summary: &GenerationSummary) {
        self.reporters.iter_mut().for_each(|r| r.end_generation(summary));
    }

    fn species_stagnant(&mut self, species_id: SpeciesId, size: usize) {
        self.reporters
            .iter_mut()
            .for_each(|r| r.species_stagnant(species_id, size));
    }

    fn complete_extinction(&mut self) {
        self.reporters.iter_mut().for_each(|r| r.complete_extinction());
    }

    fn found_solution(&mut self, generation: u32, best: &Genome) {
        self.reporters
            .iter_mut()
            .for_each(|r| r.found_solution(generation, best));
    }

    fn info(&mut self, message: &str) {
        self.reporters.iter_mut().for_each(|r| r.info(message));
    }
}

/// Writes events to the `log` facade, tagged with an experiment name
#[derive(Debug, Clone)]
pub struct LogReporter {
    name: String,
}

impl LogReporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Reporter for LogReporter {
    fn start_generation(&mut self, generation: u32) {
        log::debug!("[{}] Running generation {}", self.name, generation);
    }

    fn post_evaluate(&mut self, generation: u32, stats: &FitnessStats, best: &Genome) {
        let (nodes, connections) = best.size();
        log::info!(
            "[{}] G{} fitness best {:.3} mean {:.3} stdev {:.3}; best genome {} ({} nodes, {} connections)",
            self.name,
            generation,
            stats.best,
            stats.mean,
            stats.variance.sqrt(),
            best.key,
            nodes,
            connections
        );
    }

    fn end_generation(&mut self, summary: &GenerationSummary) {
        log::info!("[{}] {}", self.name, summary.summary());
    }

    fn species_stagnant(&mut self, species_id: SpeciesId, size: usize) {
        log::info!(
            "[{}] Species {} with {} members is stagnated: removing it",
            self.name,
            species_id,
            size
        );
    }

    fn complete_extinction(&mut self) {
        log::warn!("[{}] All species extinct", self.name);
    }

    fn found_solution(&mut self, generation: u32, best: &Genome) {
        log::info!(
            "[{}] Solution found in generation {}: genome {} with fitness {:.4}",
            self.name,
            generation,
            best.key,
            best.fitness_or_min()
        );
    }

    fn info(&mut self, message: &str) {
        log::info!("[{}] {}", self.name, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counter(Arc<Mutex<Vec<String>>>);

    impl Reporter for Counter {
        fn start_generation(&mut self, generation: u32) {
            self.0.lock().unwrap().push(format!("start {}", generation));
        }

        fn complete_extinction(&mut self) {
            self.0.lock().unwrap().push("extinct".to_string());
        }
    }

    #[test]
    fn test_reporter_set_fans_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = ReporterSet::new();
        set.add(Box::new(Counter(log.clone())));
        set.add(Box::new(Counter(log.clone())));
        set.add(Box::new(LogReporter::new("test")));

        set.start_generation(4);
        set.complete_extinction();
        set.info("ignored by counters");

        assert_eq!(set.len(), 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start 4", "start 4", "extinct", "extinct"]
        );
    }
}
