//! Neuroevolution CLI entry point.
//!
//! Offline experiment runs, config scaffolding and checkpoint inspection.

use clap::{Parser, Subcommand};
use neuroevolution::checkpoint::Checkpoint;
use neuroevolution::lab::Lab;
use neuroevolution::neat_config::NeatConfig;
use neuroevolution::Config;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "neuroevolution")]
#[command(version)]
#[command(about = "Mixed-generation NEAT with ES-HyperNEAT mediator networks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every experiment of a lab configuration to completion
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config/xor_lab.yaml")]
        config: PathBuf,

        /// Override the generation count of every experiment
        #[arg(short, long)]
        generations: Option<u32>,

        /// Seed of the lab's own sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Write experiment records and aggregated statistics here (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check a server/lab configuration and the NEAT files it references
    Validate {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file
        checkpoint: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            generations,
            seed,
            output,
        } => run_lab(config, generations, seed, output),

        Commands::Init { output, force } => generate_config(output, force),

        Commands::Validate { config } => validate_config(config),

        Commands::Analyze { checkpoint } => analyze_checkpoint(checkpoint),
    }
}

fn run_lab(
    config_path: PathBuf,
    generations: Option<u32>,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading config from: {:?}", config_path);
    let config = Config::from_file(&config_path)?;

    let mut lab = match seed {
        Some(s) => Lab::with_seed(s),
        None => Lab::new(),
    };
    for mut experiment in config.experiments {
        if let Some(generations) = generations {
            experiment.num_generations = generations;
        }
        lab.add_simple_experiment(experiment)?;
    }
    lab.instantiate_experiments()?;

    println!("Running {} experiments", lab.len());
    let start = Instant::now();
    let results = lab.run_scenarios();
    let elapsed = start.elapsed();

    println!();
    println!("=== Runs Complete ({:.2}s) ===", elapsed.as_secs_f64());
    for (status, (_, result)) in lab.statuses().iter().zip(&results) {
        let outcome = match result {
            Ok(()) if status.solved => "solved".to_string(),
            Ok(()) => "not solved".to_string(),
            Err(e) => format!("failed: {}", e),
        };
        println!(
            "  [{}] {}: generation {}, {} species, best {:.4} ({})",
            status.experiment_id,
            status.name,
            status.generation,
            status.species_count,
            status.best_fitness.unwrap_or(f64::NAN),
            outcome
        );
    }

    let statistics = lab.statistics();
    println!();
    println!(
        "Solved: {}/{}",
        statistics.solved_experiments, statistics.total_experiments
    );
    let best = &statistics.fitness_statistics.best_fitness;
    println!(
        "Best fitness per generation: mean {:.4}, min {:.4}, max {:.4}",
        best.mean, best.min, best.max
    );

    if let Some(path) = output {
        let report = serde_json::json!({
            "records": lab.records(),
            "statistics": statistics,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to: {:?}", path);
    }

    Ok(())
}

fn generate_config(output: PathBuf, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if output.exists() && !force {
        return Err(format!("{:?} already exists, pass --force to overwrite", output).into());
    }
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(&config_path)?;
    println!("{:?}: ok", config_path);

    for experiment in &config.experiments {
        experiment.validate()?;
        let neat = NeatConfig::from_file(&experiment.neat_config_path)?;
        println!(
            "  {}: {} ({} inputs, {} outputs, population {})",
            experiment.name,
            experiment.neat_config_path.display(),
            neat.genome.num_inputs,
            neat.genome.num_outputs,
            neat.neat.pop_size
        );
    }
    Ok(())
}

fn analyze_checkpoint(checkpoint_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint Analysis ===");
    println!("File: {:?}", checkpoint_path);
    println!();

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let state = &checkpoint.state;

    println!("Experiment: {} ({})", checkpoint.experiment_name, checkpoint.experiment_id);
    println!("Generation: {}", state.generation);
    println!("Population: {}", state.genomes.len());
    println!("Evaluated: {}", state.genomes.evaluated().len());
    println!("Species: {}", state.species.species_ids().len());
    println!("Solved: {}", state.solved);

    if let Some(best) = &state.best_genome {
        let (nodes, connections) = best.size();
        println!();
        println!("Best genome: {}", best.key);
        println!("  Fitness: {:.4}", best.fitness.unwrap_or(f64::NAN));
        println!("  Nodes: {}, enabled connections: {}", nodes, connections);
    }

    println!();
    println!(
        "Checkpoint size: {:.2} KB",
        checkpoint.size_bytes() as f64 / 1_000.0
    );

    Ok(())
}
