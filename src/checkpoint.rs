//! Checkpoint system for saving and loading evolution state.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::config::EvolveConfig;
use crate::graph::Network;
use crate::stats::StatsHistory;

/// Complete evolution state for checkpointing.
#[derive(Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking.
    pub version: u32,
    /// Generation counter.
    pub generation: usize,
    /// Configuration.
    pub config: EvolveConfig,
    /// All genomes, scores included.
    pub members: Vec<Network>,
    /// Fitness history.
    pub history: StatsHistory,
}

impl Checkpoint {
    /// Current checkpoint version.
    pub const VERSION: u32 = 1;

    /// Create a new checkpoint.
    pub fn new(
        generation: usize,
        config: EvolveConfig,
        members: Vec<Network>,
        history: StatsHistory,
    ) -> Self {
        Self {
            version: Self::VERSION,
            generation,
            config,
            members,
            history,
        }
    }

    /// Save checkpoint to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Magic bytes for identification.
        writer.write_all(b"EVOG")?;

        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;

        Ok(())
    }

    /// Load checkpoint from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != b"EVOG" {
            return Err(CheckpointError::InvalidFormat("invalid magic bytes".to_string()));
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

    /// Approximate serialized size in bytes.
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

/// Errors that can occur during checkpoint operations.
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
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "version mismatch: expected {}, found {}", expected, found)
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

/// Checkpoint manager for periodic saving with rotation.
pub struct CheckpointManager {
    /// Base directory for checkpoints.
    pub base_dir: String,
    /// Generations between checkpoints.
    pub interval: usize,
    /// Maximum checkpoints to keep.
    pub max_checkpoints: usize,
    last_checkpoint: usize,
}

impl CheckpointManager {
    /// Create a new checkpoint manager.
    pub fn new(base_dir: String, interval: usize, max_checkpoints: usize) -> Self {
        std::fs::create_dir_all(&base_dir).ok();

        Self {
            base_dir,
            interval,
            max_checkpoints,
            last_checkpoint: 0,
        }
    }

    /// Whether a checkpoint is due at this generation.
    pub fn should_save(&self, generation: usize) -> bool {
        generation > 0
            && self.interval > 0
            && generation % self.interval == 0
            && generation != self.last_checkpoint
    }

    /// Generate a checkpoint filename.
    pub fn checkpoint_path(&self, generation: usize) -> String {
        format!("{}/checkpoint_{:08}.bin", self.base_dir, generation)
    }

    /// Save a checkpoint and rotate old ones.
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<String, CheckpointError> {
        let path = self.checkpoint_path(checkpoint.generation);
        checkpoint.save(&path)?;
        self.last_checkpoint = checkpoint.generation;

        self.cleanup()?;

        Ok(path)
    }

    /// Remove checkpoints beyond the retention limit, oldest first.
    fn cleanup(&self) -> Result<(), CheckpointError> {
        let mut checkpoints: Vec<_> = std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("checkpoint_")
            })
            .collect();

        if checkpoints.len() > self.max_checkpoints {
            checkpoints.sort_by_key(|e| e.file_name());

            let to_remove = checkpoints.len() - self.max_checkpoints;
            for entry in checkpoints.into_iter().take(to_remove) {
                std::fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }

    /// Find the latest checkpoint in the directory.
    pub fn find_latest(&self) -> Option<String> {
        std::fs::read_dir(&self.base_dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("checkpoint_")
            })
            .max_by_key(|e| e.file_name())
            .map(|e| e.path().to_string_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::Mutation;

    fn create_test_checkpoint() -> Checkpoint {
        let mut genome = Network::new(2, 1);
        genome.mutate(&Mutation::AddNode);
        genome.score = Some(-0.25);
        Checkpoint::new(10, EvolveConfig::default(), vec![genome], StatsHistory::new())
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let checkpoint = create_test_checkpoint();
        let temp_path = "/tmp/evograph_test_checkpoint.bin";

        checkpoint.save(temp_path).unwrap();
        let loaded = Checkpoint::load(temp_path).unwrap();

        assert_eq!(loaded.generation, checkpoint.generation);
        assert_eq!(loaded.members.len(), 1);
        assert_eq!(loaded.members[0].score, Some(-0.25));
        assert!(loaded.members[0].is_valid());

        std::fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_checkpoint_rejects_bad_magic() {
        let temp_path = "/tmp/evograph_test_bad_magic.bin";
        std::fs::write(temp_path, b"NOPE----").unwrap();
        assert!(matches!(
            Checkpoint::load(temp_path),
            Err(CheckpointError::InvalidFormat(_))
        ));
        std::fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_checkpoint_size() {
        let checkpoint = create_test_checkpoint();
        let size = checkpoint.size_bytes();
        assert!(size > 0);
        assert!(size < 1_000_000);
    }

    #[test]
    fn test_manager_rotation() {
        let dir = "/tmp/evograph_test_checkpoints";
        std::fs::remove_dir_all(dir).ok();
        let mut manager = CheckpointManager::new(dir.to_string(), 5, 2);

        assert!(!manager.should_save(0));
        assert!(manager.should_save(5));
        assert!(!manager.should_save(7));

        for generation in [5, 10, 15] {
            let mut checkpoint = create_test_checkpoint();
            checkpoint.generation = generation;
            manager.save(&checkpoint).unwrap();
        }

        // Only the two newest checkpoints survive rotation.
        let remaining: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(remaining.len(), 2);
        let latest = manager.find_latest().unwrap();
        assert!(latest.contains("00000015"));

        std::fs::remove_dir_all(dir).ok();
    }
}
