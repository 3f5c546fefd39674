//! The engine factory: typed configuration, environment-variable overrides,
//! and the `Truth`/`False`/`Zero` constants every session shares.
//!
//! Configuration is validated up front so a bad setting fails fast with a
//! typed error rather than surfacing later at first use.

use std::env;
use std::path::PathBuf;

use crate::error::{SpockError, SpockResult};
use crate::planner::PlateauStrategy;
use crate::resource::ResourceLimits;
use crate::theory::{TheoryStore, TruthConstants};
use crate::vector::{RngHandle, VectorGeneration};
use crate::versioning::MergeStrategy;

pub const DEFAULT_DIMENSION: usize = 256;
pub const DEFAULT_SEED: u64 = 0;
pub const DEFAULT_CANDIDATE_LIMIT: usize = 32;

/// Engine-wide configuration, validated once at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub dimension: usize,
    pub seed: u64,
    pub generation: VectorGeneration,
    pub storage_root: PathBuf,
    pub limits: ResourceLimits,
    pub plateau: PlateauStrategy,
    pub candidate_limit: usize,
    pub merge_strategy: MergeStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            seed: DEFAULT_SEED,
            generation: VectorGeneration::Gaussian,
            storage_root: PathBuf::from("."),
            limits: ResourceLimits::default(),
            plateau: PlateauStrategy::Stop,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            merge_strategy: MergeStrategy::PreferTarget,
        }
    }
}

impl EngineConfig {
    /// Validates dimension (must be a power of two, `>= 64`) and other
    /// invariants the rest of the engine assumes hold unconditionally.
    pub fn validate(&self) -> SpockResult<()> {
        if self.dimension < 64 || !self.dimension.is_power_of_two() {
            return Err(SpockError::Config(format!(
                "dimension {} must be a power of two >= 64",
                self.dimension
            )));
        }
        if self.limits.max_recursion == 0 {
            return Err(SpockError::Config("max_recursion must be at least 1".to_string()));
        }
        if self.limits.max_planning_steps == 0 {
            return Err(SpockError::Config("max_planning_steps must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Builds a config from environment variables, falling back to defaults
    /// for anything unset. Every parse failure is a `SpockError::Config`,
    /// never a silent fallback to the default.
    pub fn from_env() -> SpockResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("SPOCK_DIMENSION") {
            config.dimension = raw.parse().map_err(|_| SpockError::Config(format!("invalid SPOCK_DIMENSION '{raw}'")))?;
        }
        if let Ok(raw) = env::var("SPOCK_SEED") {
            config.seed = raw.parse().map_err(|_| SpockError::Config(format!("invalid SPOCK_SEED '{raw}'")))?;
        }
        if let Ok(raw) = env::var("SPOCK_GENERATION") {
            config.generation =
                VectorGeneration::parse(&raw).ok_or_else(|| SpockError::Config(format!("invalid SPOCK_GENERATION '{raw}'")))?;
        }
        if let Ok(raw) = env::var("SPOCK_STORAGE_ROOT") {
            config.storage_root = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("SPOCK_MAX_RECURSION") {
            config.limits.max_recursion =
                raw.parse().map_err(|_| SpockError::Config(format!("invalid SPOCK_MAX_RECURSION '{raw}'")))?;
        }
        if let Ok(raw) = env::var("SPOCK_MAX_PLANNING_STEPS") {
            config.limits.max_planning_steps =
                raw.parse().map_err(|_| SpockError::Config(format!("invalid SPOCK_MAX_PLANNING_STEPS '{raw}'")))?;
        }
        if let Ok(raw) = env::var("SPOCK_PLATEAU_STRATEGY") {
            config.plateau =
                PlateauStrategy::parse(&raw).ok_or_else(|| SpockError::Config(format!("invalid SPOCK_PLATEAU_STRATEGY '{raw}'")))?;
        }
        if let Ok(raw) = env::var("SPOCK_CANDIDATE_LIMIT") {
            config.candidate_limit =
                raw.parse().map_err(|_| SpockError::Config(format!("invalid SPOCK_CANDIDATE_LIMIT '{raw}'")))?;
        }
        if let Ok(raw) = env::var("SPOCK_MERGE_STRATEGY") {
            config.merge_strategy =
                MergeStrategy::parse(&raw).ok_or_else(|| SpockError::Config(format!("invalid SPOCK_MERGE_STRATEGY '{raw}'")))?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// The shared, long-lived state every [`crate::session::Session`] is built
/// against: configuration, the theory store, and the canonical vectors.
pub struct Engine {
    pub config: EngineConfig,
    pub theory_store: TheoryStore,
    pub truth: TruthConstants,
}

impl Engine {
    /// Builds a new engine, seeding fresh `Truth`/`False`/`Zero` vectors (or
    /// loading previously persisted ones from `truth.bin` if present).
    #[tracing::instrument(skip_all, fields(dimension = config.dimension, seed = config.seed))]
    pub fn new(config: EngineConfig) -> SpockResult<Self> {
        config.validate()?;
        let theory_store = TheoryStore::new(config.storage_root.clone());

        let truth = match theory_store.load_truth(config.dimension)? {
            Some(constants) => constants,
            None => {
                let mut rng = RngHandle::from_seed(config.seed);
                let constants = TruthConstants {
                    truth: rng.random_vector(config.dimension, config.generation),
                    falsehood: rng.random_vector(config.dimension, config.generation),
                    zero: crate::vector::Vector::zeros(config.dimension),
                };
                theory_store.save_truth(&constants)?;
                constants
            }
        };

        tracing::info!("engine initialized");
        Ok(Self { config, theory_store, truth })
    }

    /// Builds a new engine from environment-variable configuration.
    pub fn from_env() -> SpockResult<Self> {
        Self::new(EngineConfig::from_env()?)
    }

    #[must_use]
    pub fn fresh_rng(&self) -> RngHandle {
        RngHandle::from_seed(self.config.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_dimension() {
        let config = EngineConfig { dimension: 100, ..EngineConfig::default() };
        assert!(matches!(config.validate(), Err(SpockError::Config(_))));
    }

    #[test]
    fn new_engine_persists_truth_constants() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig { storage_root: dir.path().to_path_buf(), dimension: 64, ..EngineConfig::default() };
        let engine = Engine::new(config.clone()).unwrap();
        let reopened = Engine::new(config).unwrap();
        assert_eq!(engine.truth, reopened.truth);
    }
}
