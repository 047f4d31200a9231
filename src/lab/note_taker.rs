use crate::evolution::{Reporter, SpeciesId};
use crate::experiment::ExperimentId;
use crate::genome::{Genome, GenomeId};
use crate::stats::{FitnessStats, GenerationSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Stagnation { species_id: SpeciesId, size: usize },
    Extinction,
    Solution { genome_id: GenomeId, fitness: f64 },
    Info { message: String },
}

/// A notable moment in an experiment's history
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperimentEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub generation: u32,
    pub kind: EventKind,
}

/// Everything recorded about one experiment run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub experiment_id: ExperimentId,
    pub generations: Vec<GenerationSummary>,
    /// Evaluation statistics per generation, including a solving one
    pub fitness_stats: Vec<FitnessStats>,
    pub events: Vec<ExperimentEvent>,
}

impl ExperimentRecord {
    pub fn new(experiment_id: ExperimentId) -> Self {
        Self {
            experiment_id,
            ..Self::default()
        }
    }

    pub fn solved(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e.kind, EventKind::Solution { .. }))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Reporter that records events into a shared [`ExperimentRecord`].
///
/// Clones share the record, so the lab keeps one handle while the evolver
/// owns another.
#[derive(Clone, Debug)]
pub struct NoteTaker {
    record: Arc<Mutex<ExperimentRecord>>,
    generation: u32,
}

impl NoteTaker {
    pub fn new(experiment_id: ExperimentId) -> Self {
        Self {
            record: Arc::new(Mutex::new(ExperimentRecord::new(experiment_id))),
            generation: 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ExperimentRecord> {
        // a poisoned record is still worth reading
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self) -> ExperimentRecord {
        self.lock().clone()
    }

    /// Drop everything recorded so far
    pub fn clear(&self) {
        let mut record = self.lock();
        let experiment_id = record.experiment_id;
        *record = ExperimentRecord::new(experiment_id);
    }

    fn push_event(&mut self, kind: EventKind) {
        let event = ExperimentEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            generation: self.generation,
            kind,
        };
        self.lock().events.push(event);
    }
}

impl Reporter for NoteTaker {
    fn start_generation(&mut self, generation: u32) {
        self.generation = generation;
    }

    fn post_evaluate(&mut self, _generation: u32, stats: &FitnessStats, _best: &Genome) {
        self.lock().fitness_stats.push(stats.clone());
    }

    fn end_generation(&mut self, summary: &GenerationSummary) {
        self.lock().generations.push(summary.clone());
    }

    fn species_stagnant(&mut self, species_id: SpeciesId, size: usize) {
        self.push_event(EventKind::Stagnation { species_id, size });
    }

    fn complete_extinction(&mut self) {
        self.push_event(EventKind::Extinction);
    }

    fn found_solution(&mut self, _generation: u32, best: &Genome) {
        self.push_event(EventKind::Solution {
            genome_id: best.key,
            fitness: best.fitness_or_min(),
        });
    }

    fn info(&mut self, message: &str) {
        self.push_event(EventKind::Info {
            message: message.to_string(),
        });
    }
}
