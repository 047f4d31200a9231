//! Performance benchmarks for neuroevolution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use neuroevolution::experiment::{Experiment, ExperimentConfig};
use neuroevolution::genome::{Genome, GenomeConfig};
use neuroevolution::phenotype::{encode_network, PhenotypeConfig, PhenotypeCreator};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn mutated_genome(key: u64, mutations: usize, config: &GenomeConfig, rng: &mut ChaCha8Rng) -> Genome {
    let mut genome = Genome::new_random(key, config, rng);
    for _ in 0..mutations {
        genome.mutate(config, rng);
    }
    genome
}

fn benchmark_genome_ops(c: &mut Criterion) {
    let config = GenomeConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let a = mutated_genome(1, 20, &config, &mut rng);
    let b = mutated_genome(2, 20, &config, &mut rng);

    c.bench_function("genome_distance", |bench| {
        bench.iter(|| black_box(&a).distance(black_box(&b), &config))
    });

    c.bench_function("genome_mutate", |bench| {
        let mut genome = a.clone();
        bench.iter(|| genome.mutate(&config, &mut rng));
    });
}

fn benchmark_phenotype(c: &mut Criterion) {
    let mut group = c.benchmark_group("es_hyperneat");
    let config = GenomeConfig::default();
    let creator = PhenotypeCreator::from_config(&PhenotypeConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for mutations in [0, 10, 40].iter() {
        let genome = mutated_genome(1, *mutations, &config, &mut rng);
        group.bench_with_input(BenchmarkId::new("mutations", mutations), mutations, |b, _| {
            b.iter(|| creator.create_network(black_box(&genome), &config))
        });
    }
    group.finish();

    let genome = mutated_genome(1, 10, &config, &mut rng);
    if let Ok(mut network) = creator.create_network(&genome, &config) {
        let inputs = [0.5; 10];
        c.bench_function("mediator_activate", |b| {
            b.iter(|| network.activate(black_box(&inputs)))
        });
        c.bench_function("mediator_encode", |b| {
            b.iter(|| encode_network(black_box(&network)))
        });
    }
}

fn benchmark_xor_generation(c: &mut Criterion) {
    let config = ExperimentConfig {
        pop_size: Some(50),
        seed: Some(1),
        ..ExperimentConfig::xor()
    };

    c.bench_function("xor_generation", |b| {
        b.iter_batched(
            || {
                let mut experiment = Experiment::new(0, config.clone()).unwrap();
                experiment.instantiate().unwrap();
                experiment
            },
            |mut experiment| experiment.start(Some(1)),
            criterion::BatchSize::LargeInput,
        )
    });
}

fn benchmark_checkpoint(c: &mut Criterion) {
    let mut experiment = Experiment::new(0, ExperimentConfig::xor()).unwrap();
    experiment.instantiate().unwrap();
    experiment.start(Some(3)).unwrap();
    let state = experiment.state();

    c.bench_function("checkpoint_serialize", |b| {
        b.iter(|| bincode::serialize(black_box(&state)).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_genome_ops,
    benchmark_phenotype,
    benchmark_xor_generation,
    benchmark_checkpoint,
);

criterion_main!(benches);
