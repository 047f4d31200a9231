//! Integration tests for neuroevolution

use neuroevolution::checkpoint::{Checkpoint, CheckpointManager};
use neuroevolution::experiment::{Experiment, ExperimentConfig};
use neuroevolution::lab::{Lab, ParameterGrid};
use neuroevolution::models::UserData;
use neuroevolution::neat_config::NeatConfig;
use neuroevolution::phenotype::decode_network;
use neuroevolution::Config;
use serde_yaml::Value;
use tempfile::TempDir;

fn small_xor(name: &str, seed: u64) -> ExperimentConfig {
    ExperimentConfig {
        name: name.to_string(),
        num_generations: 3,
        pop_size: Some(20),
        seed: Some(seed),
        ..ExperimentConfig::xor()
    }
}

#[test]
fn test_shipped_configs_load() {
    let server = Config::from_file("config.yaml").expect("config.yaml should load");
    assert!(!server.experiments.is_empty());

    let lab = Config::from_file("config/xor_lab.yaml").expect("xor_lab.yaml should load");
    assert_eq!(lab.experiments.len(), 2);

    for experiment in server.experiments.iter().chain(&lab.experiments) {
        experiment.validate().unwrap();
        NeatConfig::from_file(&experiment.neat_config_path).unwrap();
    }
}

#[test]
fn test_lab_runs_xor_scenarios() {
    let mut lab = Lab::with_seed(4);
    lab.add_simple_experiment(small_xor("xor_a", 1)).unwrap();
    lab.add_simple_experiment(small_xor("xor_b", 2)).unwrap();
    lab.instantiate_experiments().unwrap();

    let results = lab.run_scenarios();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, result)| result.is_ok()));

    for status in lab.statuses() {
        assert!(status.generation >= 1 || status.solved);
        assert!(status.best_fitness.is_some());
    }

    let statistics = lab.statistics();
    assert_eq!(statistics.total_experiments, 2);
    assert!(!statistics.generation_statistics.is_empty());
}

#[test]
fn test_parameterized_lab() {
    let mut grid = ParameterGrid::new();
    grid.insert(
        "async_eval.eval_threshold".to_string(),
        vec![Value::from(0.4_f64), Value::from(0.8_f64)],
    );

    let mut lab = Lab::with_seed(5);
    let ids = lab.add_parameterized_experiment(&small_xor("xor", 3), &grid).unwrap();
    assert_eq!(ids.len(), 2);

    let thresholds: Vec<usize> = ids
        .iter()
        .map(|&id| lab.experiment(id).unwrap().status().evaluation_threshold)
        .collect();
    assert_eq!(thresholds, vec![8, 16]);
}

#[test]
fn test_checkpoint_resume() {
    let dir = TempDir::new().unwrap();
    let mut manager = CheckpointManager::new(dir.path(), 1, 3).unwrap();

    let mut experiment = Experiment::new(0, small_xor("xor", 9)).unwrap();
    experiment.instantiate().unwrap();
    experiment.start(Some(2)).unwrap();
    let before = experiment.status();

    let checkpoint = Checkpoint::new(0, before.name.clone(), experiment.state());
    let path = manager.save(&checkpoint).unwrap();
    assert_eq!(manager.find_latest(0).unwrap().path, path);

    let loaded = Checkpoint::load(&path).unwrap();
    let mut resumed = Experiment::new(0, small_xor("xor", 9)).unwrap();
    resumed.restore(loaded.state);

    let after = resumed.status();
    assert_eq!(after.generation, before.generation);
    assert_eq!(after.population_size, before.population_size);
    assert_eq!(after.species_count, before.species_count);
    assert_eq!(after.solved, before.solved);
}

#[test]
fn test_online_experiment_serves_mediators() {
    let config = ExperimentConfig {
        pop_size: Some(10),
        seed: Some(2),
        ..ExperimentConfig::default()
    };
    let mut lab = Lab::with_seed(8);
    let id = lab.add_simple_experiment(config).unwrap();
    lab.instantiate_experiments().unwrap();

    // 0.4 of ten genomes must report before the population advances
    let threshold = lab.experiment(id).unwrap().status().evaluation_threshold;
    let mut advanced = false;
    for _ in 0..threshold {
        let phenotype = lab.sample_individual_from_experiment(id).unwrap();
        let network = decode_network(&phenotype.new_mediator).unwrap();
        assert_eq!(network.input_nodes.len(), 10);
        assert_eq!(network.output_nodes.len(), 10);

        let data = UserData {
            experiment_data: phenotype.experiment_data,
            time_since_startup: 60.0,
            user_rating: 3,
            ..UserData::default()
        };
        advanced = lab.return_individual_to_experiment(data.into()).unwrap();
    }

    assert!(advanced);
    assert_eq!(lab.experiment(id).unwrap().status().generation, 1);
}
