//! NEAT parameter file (`config_cppn_*` INI files).
//!
//! Sections:
//! - `[NEAT]`: population-level settings
//! - `[DefaultGenome]`: genome structure, mutation rates and attributes
//! - `[Speciation]`: compatibility threshold
//! - `[MixedGenerationStagnation]`: stagnation detection
//! - `[MixedGenerationReproduction]`: elitism and parent selection
//!
//! The neat-python names `[DefaultSpeciesSet]`, `[DefaultStagnation]` and
//! `[DefaultReproduction]` are accepted for the last three.

pub mod ini;

use crate::genome::attributes::{
    check_probability, BoolAttributeConfig, ChoiceAttributeConfig, FloatAttributeConfig, InitType,
};
use crate::genome::{GenomeConfig, InitialConnection, NodeIndexer, StructuralSurer};
use crate::stats::StatFunction;
use ini::{IniDocument, IniSection, IniValue, IniWriter, SectionReader};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

const NEAT_SECTION: &[&str] = &["NEAT"];
const GENOME_SECTION: &[&str] = &["DefaultGenome"];
const SPECIATION_SECTION: &[&str] = &["Speciation", "DefaultSpeciesSet"];
const STAGNATION_SECTION: &[&str] = &["MixedGenerationStagnation", "DefaultStagnation"];
const REPRODUCTION_SECTION: &[&str] = &["MixedGenerationReproduction", "DefaultReproduction"];

/// Complete NEAT configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NeatConfig {
    pub neat: NeatSection,
    pub genome: GenomeConfig,
    pub speciation: SpeciationConfig,
    pub stagnation: StagnationConfig,
    pub reproduction: ReproductionConfig,
}

/// `[NEAT]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeatSection {
    /// Reduces evaluated fitnesses before comparing with the threshold
    pub fitness_criterion: StatFunction,
    pub fitness_threshold: f64,
    pub no_fitness_termination: bool,
    pub pop_size: usize,
    pub reset_on_extinction: bool,
}

impl Default for NeatSection {
    fn default() -> Self {
        Self {
            fitness_criterion: StatFunction::Max,
            fitness_threshold: 5.0,
            no_fitness_termination: false,
            pop_size: 30,
            reset_on_extinction: false,
        }
    }
}

/// `[Speciation]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciationConfig {
    pub compatibility_threshold: f64,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            compatibility_threshold: 3.0,
        }
    }
}

/// `[MixedGenerationStagnation]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagnationConfig {
    pub species_fitness_func: StatFunction,
    /// Generations without improvement before a species is stagnant
    pub max_stagnation: u32,
    /// Number of best species protected from stagnation
    pub species_elitism: usize,
}

impl Default for StagnationConfig {
    fn default() -> Self {
        Self {
            species_fitness_func: StatFunction::Mean,
            max_stagnation: 15,
            species_elitism: 0,
        }
    }
}

/// `[MixedGenerationReproduction]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Best evaluated members per species kept unchanged
    pub elitism: usize,
    /// Fraction of each species allowed to reproduce
    pub survival_threshold: f64,
    pub min_species_size: usize,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            elitism: 0,
            survival_threshold: 0.2,
            min_species_size: 2,
        }
    }
}

impl NeatConfig {
    /// Load and validate a NEAT INI file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate INI text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let doc = IniDocument::parse(text)?;
        let config = Self {
            neat: read_neat(section(&doc, NEAT_SECTION)?)?,
            genome: read_genome(section(&doc, GENOME_SECTION)?)?,
            speciation: read_speciation(section(&doc, SPECIATION_SECTION)?)?,
            stagnation: read_stagnation(section(&doc, STAGNATION_SECTION)?)?,
            reproduction: read_reproduction(section(&doc, REPRODUCTION_SECTION)?)?,
        };
        config.validate().map_err(ConfigError::OutOfRange)?;
        Ok(config)
    }

    /// Write back in the same INI dialect
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ini_string())?;
        Ok(())
    }

    pub fn to_ini_string(&self) -> String {
        let mut w = IniWriter::default();
        let n = &self.neat;
        w.section("NEAT")
            .entry("fitness_criterion", n.fitness_criterion)
            .entry("fitness_threshold", n.fitness_threshold)
            .bool_entry("no_fitness_termination", n.no_fitness_termination)
            .entry("pop_size", n.pop_size)
            .bool_entry("reset_on_extinction", n.reset_on_extinction);

        let g = &self.genome;
        w.section("DefaultGenome")
            .entry("num_inputs", g.num_inputs)
            .entry("num_outputs", g.num_outputs)
            .entry("num_hidden", g.num_hidden)
            .bool_entry("feed_forward", g.feed_forward)
            .entry("initial_connection", g.initial_connection)
            .entry("compatibility_disjoint_coefficient", g.compatibility_disjoint_coefficient)
            .entry("compatibility_weight_coefficient", g.compatibility_weight_coefficient)
            .entry("conn_add_prob", g.conn_add_prob)
            .entry("conn_delete_prob", g.conn_delete_prob)
            .entry("node_add_prob", g.node_add_prob)
            .entry("node_delete_prob", g.node_delete_prob)
            .bool_entry("single_structural_mutation", g.single_structural_mutation)
            .entry("structural_mutation_surer", g.structural_mutation_surer);
        write_choice(&mut w, "activation", &g.activation);
        write_choice(&mut w, "aggregation", &g.aggregation);
        write_float(&mut w, "bias", &g.bias);
        write_float(&mut w, "response", &g.response);
        write_float(&mut w, "weight", &g.weight);
        w.entry("enabled_default", g.enabled.default)
            .entry("enabled_mutate_rate", g.enabled.mutate_rate)
            .entry("enabled_rate_to_true_add", g.enabled.rate_to_true_add)
            .entry("enabled_rate_to_false_add", g.enabled.rate_to_false_add);

        w.section("Speciation")
            .entry("compatibility_threshold", self.speciation.compatibility_threshold);

        let s = &self.stagnation;
        w.section("MixedGenerationStagnation")
            .entry("species_fitness_func", s.species_fitness_func)
            .entry("max_stagnation", s.max_stagnation)
            .entry("species_elitism", s.species_elitism);

        let r = &self.reproduction;
        w.section("MixedGenerationReproduction")
            .entry("elitism", r.elitism)
            .entry("survival_threshold", r.survival_threshold)
            .entry("min_species_size", r.min_species_size);

        w.finish()
    }

    /// Range checks on every value
    pub fn validate(&self) -> Result<(), String> {
        if self.neat.pop_size == 0 {
            return Err("pop_size must be > 0".to_string());
        }
        if self.neat.fitness_criterion == StatFunction::Median {
            return Err("fitness_criterion must be one of max, min, mean".to_string());
        }
        self.genome.validate()?;
        if self.speciation.compatibility_threshold <= 0.0 {
            return Err("compatibility_threshold must be > 0".to_string());
        }
        check_probability("survival_threshold", self.reproduction.survival_threshold)?;
        if self.reproduction.survival_threshold == 0.0 {
            return Err("survival_threshold must be > 0".to_string());
        }
        if self.reproduction.min_species_size == 0 {
            return Err("min_species_size must be > 0".to_string());
        }
        Ok(())
    }
}

impl std::str::FromStr for NeatConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn section<'a>(doc: &'a IniDocument, names: &[&str]) -> Result<&'a IniSection, ConfigError> {
    doc.section(names)
        .ok_or_else(|| ConfigError::MissingSection(names[0].to_string()))
}

fn read_neat(section: &IniSection) -> Result<NeatSection, ConfigError> {
    let mut r = SectionReader::new(section);
    let no_fitness_termination = r.optional("no_fitness_termination", false)?;
    let raw_criterion: String = r.required("fitness_criterion")?;
    let fitness_criterion = match raw_criterion.parse::<StatFunction>() {
        Ok(criterion) => criterion,
        Err(_) if no_fitness_termination => {
            log::warn!(
                "Ignoring unknown fitness_criterion '{}' (no_fitness_termination is set)",
                raw_criterion
            );
            StatFunction::Max
        }
        Err(message) => {
            return Err(ConfigError::InvalidValue {
                section: section.name.clone(),
                key: "fitness_criterion".to_string(),
                value: raw_criterion,
                message,
            })
        }
    };
    let neat = NeatSection {
        fitness_criterion,
        fitness_threshold: r.required("fitness_threshold")?,
        no_fitness_termination,
        pop_size: r.required("pop_size")?,
        reset_on_extinction: r.required("reset_on_extinction")?,
    };
    r.finish()?;
    Ok(neat)
}

fn read_genome(section: &IniSection) -> Result<GenomeConfig, ConfigError> {
    let mut r = SectionReader::new(section);
    let genome = GenomeConfig {
        num_inputs: r.required("num_inputs")?,
        num_outputs: r.required("num_outputs")?,
        num_hidden: r.required("num_hidden")?,
        feed_forward: r.required("feed_forward")?,
        initial_connection: r.optional("initial_connection", InitialConnection::Unconnected)?,
        compatibility_disjoint_coefficient: r.required("compatibility_disjoint_coefficient")?,
        compatibility_weight_coefficient: r.required("compatibility_weight_coefficient")?,
        conn_add_prob: r.required("conn_add_prob")?,
        conn_delete_prob: r.required("conn_delete_prob")?,
        node_add_prob: r.required("node_add_prob")?,
        node_delete_prob: r.required("node_delete_prob")?,
        single_structural_mutation: r.optional("single_structural_mutation", false)?,
        structural_mutation_surer: r
            .optional("structural_mutation_surer", StructuralSurer::Default)?,
        activation: read_choice(&mut r, "activation")?,
        aggregation: read_choice(&mut r, "aggregation")?,
        bias: read_float(&mut r, "bias")?,
        response: read_float(&mut r, "response")?,
        weight: read_float(&mut r, "weight")?,
        enabled: BoolAttributeConfig {
            default: r.required("enabled_default")?,
            mutate_rate: r.required("enabled_mutate_rate")?,
            rate_to_true_add: r.optional("enabled_rate_to_true_add", 0.0)?,
            rate_to_false_add: r.optional("enabled_rate_to_false_add", 0.0)?,
        },
        node_indexer: NodeIndexer::default(),
    };
    r.finish()?;
    Ok(genome)
}

fn read_float(r: &mut SectionReader<'_>, name: &str) -> Result<FloatAttributeConfig, ConfigError> {
    Ok(FloatAttributeConfig {
        init_mean: r.required(&format!("{}_init_mean", name))?,
        init_stdev: r.required(&format!("{}_init_stdev", name))?,
        init_type: r.optional(&format!("{}_init_type", name), InitType::Gaussian)?,
        replace_rate: r.required(&format!("{}_replace_rate", name))?,
        mutate_rate: r.required(&format!("{}_mutate_rate", name))?,
        mutate_power: r.required(&format!("{}_mutate_power", name))?,
        max_value: r.required(&format!("{}_max_value", name))?,
        min_value: r.required(&format!("{}_min_value", name))?,
    })
}

/// `<name>_default` may be `random` or `none` to draw from the options
fn read_choice<T>(
    r: &mut SectionReader<'_>,
    name: &str,
) -> Result<ChoiceAttributeConfig<T>, ConfigError>
where
    T: IniValue,
{
    let raw_default: String = r.required(&format!("{}_default", name))?;
    let default = match raw_default.to_ascii_lowercase().as_str() {
        "random" | "none" => None,
        _ => Some(T::parse_ini(&raw_default).map_err(|message| ConfigError::InvalidValue {
            section: GENOME_SECTION[0].to_string(),
            key: format!("{}_default", name),
            value: raw_default.clone(),
            message,
        })?),
    };
    Ok(ChoiceAttributeConfig {
        default,
        options: r.required(&format!("{}_options", name))?,
        mutate_rate: r.required(&format!("{}_mutate_rate", name))?,
    })
}

fn write_float(w: &mut IniWriter, name: &str, attr: &FloatAttributeConfig) {
    w.entry(&format!("{}_init_mean", name), attr.init_mean)
        .entry(&format!("{}_init_stdev", name), attr.init_stdev)
        .entry(&format!("{}_init_type", name), attr.init_type)
        .entry(&format!("{}_replace_rate", name), attr.replace_rate)
        .entry(&format!("{}_mutate_rate", name), attr.mutate_rate)
        .entry(&format!("{}_mutate_power", name), attr.mutate_power)
        .entry(&format!("{}_max_value", name), attr.max_value)
        .entry(&format!("{}_min_value", name), attr.min_value);
}

fn write_choice<T: Display>(w: &mut IniWriter, name: &str, attr: &ChoiceAttributeConfig<T>) {
    match &attr.default {
        Some(value) => w.entry(&format!("{}_default", name), value),
        None => w.entry(&format!("{}_default", name), "random"),
    };
    w.list_entry(&format!("{}_options", name), &attr.options)
        .entry(&format!("{}_mutate_rate", name), attr.mutate_rate);
}

fn read_speciation(section: &IniSection) -> Result<SpeciationConfig, ConfigError> {
    let mut r = SectionReader::new(section);
    let config = SpeciationConfig {
        compatibility_threshold: r.required("compatibility_threshold")?,
    };
    r.finish()?;
    Ok(config)
}

fn read_stagnation(section: &IniSection) -> Result<StagnationConfig, ConfigError> {
    let defaults = StagnationConfig::default();
    let mut r = SectionReader::new(section);
    let config = StagnationConfig {
        species_fitness_func: r.optional("species_fitness_func", defaults.species_fitness_func)?,
        max_stagnation: r.optional("max_stagnation", defaults.max_stagnation)?,
        species_elitism: r.optional("species_elitism", defaults.species_elitism)?,
    };
    r.finish()?;
    Ok(config)
}

fn read_reproduction(section: &IniSection) -> Result<ReproductionConfig, ConfigError> {
    let defaults = ReproductionConfig::default();
    let mut r = SectionReader::new(section);
    let config = ReproductionConfig {
        elitism: r.optional("elitism", defaults.elitism)?,
        survival_threshold: r.optional("survival_threshold", defaults.survival_threshold)?,
        min_species_size: r.optional("min_species_size", defaults.min_species_size)?,
    };
    r.finish()?;
    Ok(config)
}

/// Errors raised while reading a NEAT parameter file
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse { line: usize, message: String },
    MissingSection(String),
    MissingKey { section: String, key: String },
    InvalidValue { section: String, key: String, value: String, message: String },
    UnknownKeys { section: String, keys: Vec<String> },
    OutOfRange(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Parse { line, message } => write!(f, "Parse error on line {}: {}", line, message),
            Self::MissingSection(name) => write!(f, "Missing section [{}]", name),
            Self::MissingKey { section, key } => write!(f, "Missing '{}' in [{}]", key, section),
            Self::InvalidValue { section, key, value, message } => write!(
                f,
                "Invalid value '{}' for '{}' in [{}]: {}",
                value, key, section, message
            ),
            Self::UnknownKeys { section, keys } => {
                write!(f, "Unknown keys in [{}]: {}", section, keys.join(", "))
            }
            Self::OutOfRange(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
