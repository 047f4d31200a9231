//! Checkpoint system for saving and restoring experiment state.

use crate::evolution::EvolverState;
use crate::experiment::ExperimentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"NEVO";

/// Complete evolutionary state of one experiment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    pub experiment_id: ExperimentId,
    pub experiment_name: String,
    /// Unix timestamp of the save
    pub saved_at: i64,
    pub state: EvolverState,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;

    pub fn new(experiment_id: ExperimentId, experiment_name: impl Into<String>, state: EvolverState) -> Self {
        Self {
            version: Self::VERSION,
            experiment_id,
            experiment_name: experiment_name.into(),
            saved_at: chrono::Utc::now().timestamp(),
            state,
        }
    }

    pub fn generation(&self) -> u32 {
        self.state.generation
    }

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CheckpointError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;

        if checkpoint.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        Ok(checkpoint)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

/// Errors that can occur during checkpoint operations
#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Serialization(bincode::Error),
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}

/// A checkpoint file found on disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub path: PathBuf,
    pub experiment_id: ExperimentId,
    pub generation: u32,
}

/// Checkpoint manager for periodic saving
pub struct CheckpointManager {
    /// Base directory for checkpoints
    pub base_dir: PathBuf,
    /// Generations between checkpoints (0 disables periodic saves)
    pub interval: u32,
    /// Maximum checkpoints to keep per experiment
    pub max_checkpoints: usize,
    last_checkpoint: BTreeMap<ExperimentId, u32>,
}

impl CheckpointManager {
    pub fn new(base_dir: impl Into<PathBuf>, interval: u32, max_checkpoints: usize) -> Result<Self, CheckpointError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            interval,
            max_checkpoints,
            last_checkpoint: BTreeMap::new(),
        })
    }

    /// Check if a periodic checkpoint is due
    pub fn should_save(&self, experiment_id: ExperimentId, generation: u32) -> bool {
        self.interval > 0
            && generation > 0
            && generation % self.interval == 0
            && self.last_checkpoint.get(&experiment_id) != Some(&generation)
    }

    pub fn checkpoint_path(&self, experiment_id: ExperimentId, generation: u32) -> PathBuf {
        self.base_dir
            .join(format!("checkpoint_e{:03}_g{:06}.bin", experiment_id, generation))
    }

    /// Save checkpoint and prune old ones of the same experiment
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        let path = self.checkpoint_path(checkpoint.experiment_id, checkpoint.generation());
        checkpoint.save(&path)?;
        self.last_checkpoint
            .insert(checkpoint.experiment_id, checkpoint.generation());
        log::info!("Saved checkpoint {}", path.display());

        self.cleanup(checkpoint.experiment_id)?;
        Ok(path)
    }

    /// Every checkpoint in the directory, oldest first
    pub fn list(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut checkpoints: Vec<CheckpointInfo> = std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let (experiment_id, generation) = parse_file_name(&entry.file_name().to_string_lossy())?;
                Some(CheckpointInfo {
                    path: entry.path(),
                    experiment_id,
                    generation,
                })
            })
            .collect();
        checkpoints.sort_by_key(|c| (c.experiment_id, c.generation));
        Ok(checkpoints)
    }

    /// Remove checkpoints of an experiment beyond the retention limit
    fn cleanup(&self, experiment_id: ExperimentId) -> Result<(), CheckpointError> {
        let checkpoints: Vec<_> = self
            .list()?
            .into_iter()
            .filter(|c| c.experiment_id == experiment_id)
            .collect();

        if checkpoints.len() > self.max_checkpoints {
            let to_remove = checkpoints.len() - self.max_checkpoints;
            for checkpoint in checkpoints.into_iter().take(to_remove) {
                std::fs::remove_file(&checkpoint.path)?;
            }
        }

        Ok(())
    }

    /// Latest checkpoint of an experiment
    pub fn find_latest(&self, experiment_id: ExperimentId) -> Option<CheckpointInfo> {
        self.list()
            .ok()?
            .into_iter()
            .filter(|c| c.experiment_id == experiment_id)
            .max_by_key(|c| c.generation)
    }
}

/// `checkpoint_e{id}_g{generation}.bin`
fn parse_file_name(name: &str) -> Option<(ExperimentId, u32)> {
    let stem = name.strip_prefix("checkpoint_e")?.strip_suffix(".bin")?;
    let (experiment, generation) = stem.split_once("_g")?;
    Some((experiment.parse().ok()?, generation.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::{Evolver, EvolverState};
    use crate::fitness::XorFitness;
    use crate::neat_config::NeatConfig;

    fn create_test_state() -> EvolverState {
        let mut evolver = Evolver::new(NeatConfig::default(), Box::new(XorFitness), 12, 9);
        evolver.create_new_population().unwrap();
        evolver.state()
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let checkpoint = Checkpoint::new(2, "xor", create_test_state());

        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap();

        assert_eq!(loaded.experiment_id, 2);
        assert_eq!(loaded.experiment_name, "xor");
        assert_eq!(loaded.state.genomes.len(), 30);
        assert_eq!(loaded.state.species.len(), checkpoint.state.species.len());
        assert!(checkpoint.size_bytes() > 0);
    }

    #[test]
    fn test_rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.bin");
        std::fs::write(&path, b"PRMD0000").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_manager_retention() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = CheckpointManager::new(dir.path(), 2, 2).unwrap();
        let state = create_test_state();

        for generation in [2, 4, 6] {
            let mut state = state.clone();
            state.generation = generation;
            assert!(manager.should_save(0, generation));
            manager.save(&Checkpoint::new(0, "a", state)).unwrap();
            assert!(!manager.should_save(0, generation));
        }
        manager.save(&Checkpoint::new(1, "b", state)).unwrap();

        let listed = manager.list().unwrap();
        let generations: Vec<_> = listed
            .iter()
            .filter(|c| c.experiment_id == 0)
            .map(|c| c.generation)
            .collect();
        assert_eq!(generations, vec![4, 6]);
        assert_eq!(manager.find_latest(0).unwrap().generation, 6);
        assert_eq!(manager.find_latest(1).unwrap().generation, 0);
        assert!(manager.find_latest(7).is_none());
        assert!(!manager.should_save(0, 3));
    }

    #[test]
    fn test_parse_file_name() {
        assert_eq!(parse_file_name("checkpoint_e003_g000120.bin"), Some((3, 120)));
        assert_eq!(parse_file_name("notes.txt"), None);
    }
}
