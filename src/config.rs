//! Configuration for the evolution engine.
//!
//! Supports YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::methods::{Crossover, Mutation, Selection};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolveConfig {
    pub population: PopulationConfig,
    pub variation: VariationConfig,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Population shape and generation bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Genomes per generation.
    pub size: usize,
    /// Top genomes copied unchanged into the next generation.
    pub elitism: usize,
    /// Fresh minimal genomes injected each generation.
    pub provenance: usize,
    /// Clear genome context before evaluation (recurrent networks see the
    /// dataset as one fresh sequence).
    pub clear_on_evaluate: bool,
}

/// Mutation and crossover behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariationConfig {
    /// Probability that a bred offspring is mutated at all.
    pub mutation_rate: f64,
    /// Mutations applied when one occurs.
    pub mutation_amount: usize,
    /// Operator catalog drawn from at mutation time.
    pub mutation: Vec<Mutation>,
    /// Crossover method catalog drawn from at breeding time.
    pub crossover: Vec<Crossover>,
}

/// Progress logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Generations between progress logs; 0 disables them.
    pub log_every: usize,
}

impl Default for EvolveConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            variation: VariationConfig::default(),
            selection: Selection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 50,
            elitism: 2,
            provenance: 0,
            clear_on_evaluate: true,
        }
    }
}

impl Default for VariationConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.3,
            mutation_amount: 1,
            mutation: Mutation::all(),
            crossover: Crossover::all(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_every: 0 }
    }
}

impl EvolveConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: EvolveConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.population.size == 0 {
            return Err("population size must be > 0".to_string());
        }
        if self.population.elitism + self.population.provenance > self.population.size {
            return Err("elitism + provenance cannot exceed population size".to_string());
        }
        if !(0.0..=1.0).contains(&self.variation.mutation_rate) {
            return Err("mutation_rate must be within [0, 1]".to_string());
        }
        if self.variation.mutation.is_empty() {
            return Err("mutation catalog cannot be empty".to_string());
        }
        if self.variation.crossover.is_empty() {
            return Err("crossover catalog cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EvolveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = EvolveConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: EvolveConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.population.size, loaded.population.size);
        assert_eq!(config.variation.mutation.len(), loaded.variation.mutation.len());
    }

    #[test]
    fn test_file_roundtrip() {
        let path = "/tmp/evograph_test_config.yaml";
        let mut config = EvolveConfig::default();
        config.population.size = 123;
        config.save(path).unwrap();
        let loaded = EvolveConfig::from_file(path).unwrap();
        assert_eq!(loaded.population.size, 123);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EvolveConfig::default();
        config.population.size = 0;
        assert!(config.validate().is_err());

        let mut config = EvolveConfig::default();
        config.population.elitism = 60;
        assert!(config.validate().is_err());

        let mut config = EvolveConfig::default();
        config.variation.mutation.clear();
        assert!(config.validate().is_err());
    }
}
