//! Per-generation fitness statistics.

use serde::{Deserialize, Serialize};

/// A snapshot of one generation's scored population.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
    /// Mean node count across the population.
    pub mean_nodes: f64,
    /// Mean regular-connection count across the population.
    pub mean_connections: f64,
}

/// Accumulated history of generation snapshots.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    pub snapshots: Vec<GenerationStats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot.
    pub fn record(&mut self, stats: GenerationStats) {
        self.snapshots.push(stats);
    }

    /// Best fitness per generation.
    pub fn best_series(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.best).collect()
    }

    /// Mean fitness per generation.
    pub fn mean_series(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.mean).collect()
    }

    /// Save history as JSON.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from JSON.
    pub fn load_json(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_series() {
        let mut history = StatsHistory::new();
        history.record(GenerationStats {
            generation: 0,
            best: -0.5,
            mean: -0.8,
            worst: -1.2,
            mean_nodes: 3.0,
            mean_connections: 2.0,
        });
        history.record(GenerationStats {
            generation: 1,
            best: -0.3,
            mean: -0.6,
            worst: -1.0,
            mean_nodes: 3.5,
            mean_connections: 2.5,
        });
        assert_eq!(history.best_series(), vec![-0.5, -0.3]);
        assert_eq!(history.mean_series().len(), 2);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut history = StatsHistory::new();
        history.record(GenerationStats {
            generation: 3,
            best: 1.0,
            ..GenerationStats::default()
        });
        let path = "/tmp/evograph_test_stats.json";
        history.save_json(path).unwrap();
        let loaded = StatsHistory::load_json(path).unwrap();
        assert_eq!(loaded.snapshots.len(), 1);
        assert_eq!(loaded.snapshots[0].generation, 3);
        std::fs::remove_file(path).ok();
    }
}
