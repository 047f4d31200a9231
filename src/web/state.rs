//! Shared application state for the mediator server.

use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use serde::Serialize;

use crate::checkpoint::{Checkpoint, CheckpointInfo, CheckpointManager};
use crate::config::Config;
use crate::experiment::{ExperimentError, ExperimentId, ExperimentStatus};
use crate::lab::Lab;
use crate::models::{PhenotypeData, ResponseModel, UserData};
use crate::storage::SessionData;

use super::routes::ApiError;

/// Maximum number of events buffered per subscriber
const BROADCAST_CAPACITY: usize = 16;

/// Event streamed to WebSocket clients
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    DataReceived {
        experiment_id: ExperimentId,
        genome_id: u64,
    },
    MediatorSent {
        experiment_id: ExperimentId,
        genome_id: u64,
    },
    GenerationAdvanced {
        status: ExperimentStatus,
    },
    PopulationReset {
        experiment_id: Option<ExperimentId>,
    },
    CheckpointSaved {
        path: String,
    },
    Status {
        experiments: Vec<ExperimentStatus>,
    },
}

/// Application state shared between all handlers
pub struct AppState {
    /// Every running experiment
    pub lab: Arc<Mutex<Lab>>,
    /// CSV log of received user data; the lock serializes appends
    pub sessions: Arc<Mutex<SessionData>>,
    pub checkpoints: Arc<Mutex<CheckpointManager>>,
    pub config: Config,
    /// Broadcast channel for events to WebSocket clients
    pub event_tx: broadcast::Sender<Arc<ServerEvent>>,
}

/// Run `f` on a blocking thread while holding the lock on `shared`.
/// Generation advances and network construction are CPU bound and must
/// not stall the async workers.
async fn run_blocking<S, T, F>(shared: &Arc<Mutex<S>>, f: F) -> Result<T, ApiError>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut S) -> T + Send + 'static,
{
    let shared = Arc::clone(shared);
    tokio::task::spawn_blocking(move || {
        let mut guard = shared.blocking_lock();
        f(&mut *guard)
    })
        .await
        .map_err(|e| ApiError::Internal(format!("Background task failed: {}", e)))
}

fn new_mediator_error(e: ExperimentError) -> ApiError {
    log::error!("Failed to fetch new genome: {}", e);
    ApiError::Internal("Failed to generate new mediator genome".to_string())
}

impl AppState {
    /// Build the lab from the configured experiments and create their populations
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let mut lab = Lab::new();
        for experiment in &config.experiments {
            lab.add_simple_experiment(experiment.clone())?;
        }
        lab.instantiate_experiments()?;
        Self::with_lab(config, lab)
    }

    /// Serve an already populated lab
    pub fn with_lab(config: Config, lab: Lab) -> Result<Self, Box<dyn std::error::Error>> {
        let checkpoints = CheckpointManager::new(
            config.storage.checkpoint_dir.clone(),
            config.logging.checkpoint_interval,
            config.storage.max_checkpoints,
        )?;
        let (event_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Ok(Self {
            lab: Arc::new(Mutex::new(lab)),
            sessions: Arc::new(Mutex::new(SessionData::new(config.storage.session_file.clone()))),
            checkpoints: Arc::new(Mutex::new(checkpoints)),
            config,
            event_tx,
        })
    }

    /// Store and evaluate user data; returns whether a generation advanced
    pub async fn process_user_data(&self, data: UserData) -> Result<bool, ApiError> {
        let experiment_id = data.experiment_data.experiment_id;
        let genome_id = data.experiment_data.genome_id;
        log::info!(
            "Processing user data for experiment {} genome {}",
            experiment_id,
            genome_id
        );
        let row = data.clone();
        if let Err(e) = run_blocking(&self.sessions, move |sessions| sessions.store_session_data(&row)).await? {
            log::error!("Failed to store session data: {}", e);
        }

        let outcome = run_blocking(&self.lab, move |lab| {
            let advanced = lab.return_individual_to_experiment(data.into())?;
            if !advanced {
                return Ok(None);
            }
            let experiment = lab.experiment(experiment_id)?;
            Ok::<_, ExperimentError>(Some((experiment.status(), experiment.state())))
        })
        .await?;
        let advanced = match outcome {
            Ok(advanced) => advanced,
            Err(ExperimentError::UnknownExperiment(id)) => {
                return Err(ApiError::NotFound(format!("Unknown experiment {}", id)))
            }
            Err(e) => {
                log::warn!("Evaluation of genome {} not recorded: {}", genome_id, e);
                None
            }
        };
        self.broadcast(ServerEvent::DataReceived {
            experiment_id,
            genome_id,
        });

        let Some((status, state)) = advanced else {
            return Ok(false);
        };
        let generation = status.generation;
        let checkpoint = Checkpoint::new(experiment_id, status.name.clone(), state);
        let saved = run_blocking(&self.checkpoints, move |checkpoints| {
            checkpoints
                .should_save(experiment_id, generation)
                .then(|| checkpoints.save(&checkpoint))
        })
        .await?;
        match saved {
            Some(Ok(path)) => self.broadcast(ServerEvent::CheckpointSaved {
                path: path.display().to_string(),
            }),
            Some(Err(e)) => log::error!("Periodic checkpoint failed: {}", e),
            None => {}
        }
        self.broadcast(ServerEvent::GenerationAdvanced { status });
        Ok(true)
    }

    /// Evaluate the finished mediator and hand out a replacement from the same experiment
    pub async fn swap_out_mediator(&self, data: UserData) -> Result<ResponseModel, ApiError> {
        let experiment_id = data.experiment_data.experiment_id;
        self.process_user_data(data).await?;

        let phenotype = run_blocking(&self.lab, move |lab| {
            lab.sample_individual_from_experiment(experiment_id)
        })
        .await?
        .map_err(new_mediator_error)?;
        self.announce_mediator(&phenotype);
        Ok(ResponseModel {
            phenotype,
            message: "New mediator generated successfully".to_string(),
        })
    }

    /// Mediator for a client that has none yet
    pub async fn first_mediator(&self) -> Result<ResponseModel, ApiError> {
        let phenotype = run_blocking(&self.lab, |lab| lab.sample_random_experiment())
            .await?
            .map_err(new_mediator_error)?;
        self.announce_mediator(&phenotype);
        Ok(ResponseModel {
            phenotype,
            message: "First mediator generated successfully".to_string(),
        })
    }

    fn announce_mediator(&self, phenotype: &PhenotypeData) {
        log::info!(
            "New mediator provided: experiment {} genome {}",
            phenotype.experiment_data.experiment_id,
            phenotype.experiment_data.genome_id
        );
        self.broadcast(ServerEvent::MediatorSent {
            experiment_id: phenotype.experiment_data.experiment_id,
            genome_id: phenotype.experiment_data.genome_id,
        });
    }

    /// Force a generation advance in every experiment
    pub async fn run_evolution(&self) {
        log::info!("Starting the evolutionary process");
        let advanced = run_blocking(&self.lab, |lab| {
            let mut statuses = Vec::new();
            for id in lab.experiment_ids() {
                let Ok(experiment) = lab.experiment_mut(id) else {
                    continue;
                };
                match experiment.advance() {
                    Ok(()) => statuses.push(experiment.status()),
                    Err(e) => log::warn!("Experiment {} did not advance: {}", id, e),
                }
            }
            statuses
        })
        .await;
        match advanced {
            Ok(statuses) => {
                for status in statuses {
                    self.broadcast(ServerEvent::GenerationAdvanced { status });
                }
            }
            Err(e) => log::error!("Evolutionary process aborted: {:?}", e),
        }
        log::info!("Evolutionary process finished");
    }

    /// Restart every population
    pub async fn reset_population(&self) -> Result<(), ApiError> {
        log::info!("Restarting the population");
        run_blocking(&self.lab, |lab| lab.reset()).await??;
        self.broadcast(ServerEvent::PopulationReset { experiment_id: None });
        Ok(())
    }

    pub async fn reset_experiment(&self, experiment_id: ExperimentId) -> Result<(), ApiError> {
        run_blocking(&self.lab, move |lab| lab.experiment_mut(experiment_id)?.reset()).await??;
        self.broadcast(ServerEvent::PopulationReset {
            experiment_id: Some(experiment_id),
        });
        Ok(())
    }

    pub async fn statuses(&self) -> Vec<ExperimentStatus> {
        self.lab.lock().await.statuses()
    }

    /// Checkpoint every experiment now
    pub async fn save_checkpoints(&self) -> Result<Vec<String>, ApiError> {
        let snapshots = run_blocking(&self.lab, |lab| {
            lab.experiment_ids()
                .into_iter()
                .map(|id| {
                    let experiment = lab.experiment(id)?;
                    Ok::<_, ExperimentError>(Checkpoint::new(
                        id,
                        experiment.config().name.clone(),
                        experiment.state(),
                    ))
                })
                .collect::<Result<Vec<_>, ExperimentError>>()
        })
        .await??;
        let paths = run_blocking(&self.checkpoints, move |checkpoints| {
            snapshots
                .iter()
                .map(|checkpoint| checkpoints.save(checkpoint).map(|path| path.display().to_string()))
                .collect::<Result<Vec<_>, _>>()
        })
        .await??;
        for path in &paths {
            self.broadcast(ServerEvent::CheckpointSaved { path: path.clone() });
        }
        Ok(paths)
    }

    /// Restore the experiment a checkpoint file belongs to
    pub async fn load_checkpoint(&self, path: &str) -> Result<ExperimentStatus, ApiError> {
        let file = path.to_string();
        let checkpoint = tokio::task::spawn_blocking(move || Checkpoint::load(file))
            .await
            .map_err(|e| ApiError::Internal(format!("Background task failed: {}", e)))??;
        let experiment_id = checkpoint.experiment_id;
        let status = run_blocking(&self.lab, move |lab| {
            let experiment = lab.experiment_mut(checkpoint.experiment_id)?;
            experiment.restore(checkpoint.state);
            Ok::<_, ExperimentError>(experiment.status())
        })
        .await??;
        log::info!("Restored experiment {} from {}", experiment_id, path);
        Ok(status)
    }

    pub async fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, ApiError> {
        Ok(run_blocking(&self.checkpoints, |checkpoints| checkpoints.list()).await??)
    }

    /// Broadcast an event to all WebSocket clients
    pub fn broadcast(&self, event: ServerEvent) {
        // no receivers is fine
        let _ = self.event_tx.send(Arc::new(event));
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Arc<ServerEvent>> {
        self.event_tx.subscribe()
    }
}
