//! Gene attribute configuration, initialisation and mutation.
//!
//! Each numeric, boolean or enumerated gene attribute is driven by a small
//! config block read from the `[DefaultGenome]` section, e.g. `weight_*`,
//! `enabled_*` or `activation_*`.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distribution used when a float attribute is (re)initialised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitType {
    Gaussian,
    Uniform,
}

impl FromStr for InitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower.contains("gauss") || lower.contains("normal") {
            Ok(Self::Gaussian)
        } else if lower.contains("uniform") {
            Ok(Self::Uniform)
        } else {
            Err(format!("unknown init_type '{}'", s))
        }
    }
}

impl fmt::Display for InitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

/// Configuration of a floating point attribute (bias, response, weight)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatAttributeConfig {
    pub init_mean: f64,
    pub init_stdev: f64,
    pub init_type: InitType,
    pub replace_rate: f64,
    pub mutate_rate: f64,
    pub mutate_power: f64,
    pub max_value: f64,
    pub min_value: f64,
}

impl FloatAttributeConfig {
    /// Clamp into `[min_value, max_value]`
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min_value).min(self.max_value)
    }

    /// Draw a fresh value
    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self.init_type {
            InitType::Gaussian => self.clamp(gaussian(rng, self.init_mean, self.init_stdev)),
            InitType::Uniform => {
                let low = self.min_value.max(self.init_mean - 2.0 * self.init_stdev);
                let high = self.max_value.min(self.init_mean + 2.0 * self.init_stdev);
                if high > low {
                    rng.gen_range(low..=high)
                } else {
                    low
                }
            }
        }
    }

    /// Perturb or replace a value
    pub fn mutate_value<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> f64 {
        let r: f64 = rng.gen();
        if r < self.mutate_rate {
            return self.clamp(value + gaussian(rng, 0.0, self.mutate_power));
        }
        if r < self.replace_rate + self.mutate_rate {
            return self.init_value(rng);
        }
        value
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), String> {
        check_probability(&format!("{}_replace_rate", name), self.replace_rate)?;
        check_probability(&format!("{}_mutate_rate", name), self.mutate_rate)?;
        if self.min_value > self.max_value {
            return Err(format!(
                "{}_min_value ({}) exceeds {}_max_value ({})",
                name, self.min_value, name, self.max_value
            ));
        }
        if self.init_stdev < 0.0 || self.mutate_power < 0.0 {
            return Err(format!("{} stdev and mutate_power must be >= 0", name));
        }
        Ok(())
    }
}

/// Initial state of a boolean attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolDefault {
    True,
    False,
    Random,
}

impl FromStr for BoolDefault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "on" | "yes" | "true" => Ok(Self::True),
            "0" | "off" | "no" | "false" => Ok(Self::False),
            "random" | "none" => Ok(Self::Random),
            other => Err(format!("unknown boolean default '{}'", other)),
        }
    }
}

impl fmt::Display for BoolDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Configuration of a boolean attribute (connection `enabled`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoolAttributeConfig {
    pub default: BoolDefault,
    pub mutate_rate: f64,
    pub rate_to_true_add: f64,
    pub rate_to_false_add: f64,
}

impl BoolAttributeConfig {
    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        match self.default {
            BoolDefault::True => true,
            BoolDefault::False => false,
            BoolDefault::Random => rng.gen_bool(0.5),
        }
    }

    pub fn mutate_value<R: Rng + ?Sized>(&self, value: bool, rng: &mut R) -> bool {
        let rate = if value {
            self.mutate_rate + self.rate_to_false_add
        } else {
            self.mutate_rate + self.rate_to_true_add
        };
        if rate > 0.0 && rng.gen::<f64>() < rate {
            // Coin flip, so a "mutation" keeps the value half the time.
            return rng.gen_bool(0.5);
        }
        value
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), String> {
        check_probability(&format!("{}_mutate_rate", name), self.mutate_rate)?;
        check_probability(&format!("{}_rate_to_true_add", name), self.rate_to_true_add)?;
        check_probability(&format!("{}_rate_to_false_add", name), self.rate_to_false_add)
    }
}

/// Configuration of an enumerated attribute (activation, aggregation)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceAttributeConfig<T> {
    /// `None` means pick randomly from `options`
    pub default: Option<T>,
    pub options: Vec<T>,
    pub mutate_rate: f64,
}

impl<T: Clone> ChoiceAttributeConfig<T> {
    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<T> {
        match &self.default {
            Some(value) => Some(value.clone()),
            None => self.options.choose(rng).cloned(),
        }
    }

    pub fn mutate_value<R: Rng + ?Sized>(&self, value: &T, rng: &mut R) -> T {
        if self.mutate_rate > 0.0 && rng.gen::<f64>() < self.mutate_rate {
            if let Some(choice) = self.options.choose(rng) {
                return choice.clone();
            }
        }
        value.clone()
    }
}

impl<T: PartialEq + fmt::Display> ChoiceAttributeConfig<T> {
    pub(crate) fn validate(&self, name: &str) -> Result<(), String> {
        check_probability(&format!("{}_mutate_rate", name), self.mutate_rate)?;
        if self.options.is_empty() {
            return Err(format!("{}_options must not be empty", name));
        }
        if let Some(default) = &self.default {
            if !self.options.contains(default) {
                return Err(format!(
                    "{}_default '{}' is not one of {}_options",
                    name, default, name
                ));
            }
        }
        Ok(())
    }
}

/// Sample N(mean, stdev); a zero stdev returns the mean
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, stdev: f64) -> f64 {
    match Normal::new(mean, stdev) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    }
}

pub(crate) fn check_probability(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} must be in [0, 1], got {}", name, value));
    }
    Ok(())
}
