//! The conceptual space: fixed-dimension numeric vectors and the seeded RNG
//! that mints new concepts inside it.
//!
//! Every `Vector` is immutable after construction; operations return new
//! vectors rather than mutating in place, so a `Vector` stored inside a
//! [`crate::value::Value`] is never aliased mutably.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SpockError, SpockResult};

/// A point (or direction) in the shared conceptual space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vector(Vec<f64>);

impl Vector {
    /// Builds a vector from raw components, without dimension validation.
    ///
    /// Dimension validation (power of two, `>= 64`) happens once, at
    /// [`crate::engine::EngineConfig`] construction time — every vector
    /// created afterwards inherits that dimension implicitly.
    #[must_use]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self(data)
    }

    /// An all-zero vector of the given dimension. This is the engine's `Zero` constant.
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|x| *x == 0.0)
    }

    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Zero-in, zero-out: normalising the zero vector returns the zero vector
    /// rather than dividing by zero.
    #[must_use]
    pub fn normalise(&self) -> Self {
        let n = self.norm();
        if n == 0.0 {
            return self.clone();
        }
        Self(self.0.iter().map(|x| x / n).collect())
    }

    /// Cosine similarity in `[-1, 1]`. Defined as `0.0` when either operand
    /// is the zero vector (cosine is undefined there; `0.0` keeps every
    /// downstream formula — `(cos+1)/2`, `1-cos` — finite and matches the
    /// "zero-in, zero-out" convention used by [`Self::normalise`]).
    #[must_use]
    pub fn cosine(&self, other: &Self) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 { 0.0 } else { self.dot(other) / denom }
    }

    #[must_use]
    pub fn scale(&self, s: f64) -> Self {
        Self(self.0.iter().map(|x| x * s).collect())
    }

    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self(self.0.iter().zip(other.0.iter()).map(|(a, b)| a + b).collect())
    }

    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self(self.0.iter().zip(other.0.iter()).map(|(a, b)| a - b).collect())
    }

    /// Element-wise product.
    #[must_use]
    pub fn hadamard(&self, other: &Self) -> Self {
        Self(self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).collect())
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        Self(self.0.iter().map(|x| -x).collect())
    }

    /// Little-endian f64 byte encoding, used for `truth.bin`.
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|x| x.to_le_bytes()).collect()
    }

    /// Inverse of [`Self::to_le_bytes`].
    pub fn from_le_bytes(bytes: &[u8]) -> SpockResult<Self> {
        if bytes.len() % 8 != 0 {
            return Err(SpockError::Storage(format!(
                "truth.bin has {} bytes, not a multiple of 8",
                bytes.len()
            )));
        }
        let data = bytes
            .chunks_exact(8)
            .map(|chunk| f64::from_le_bytes(chunk.try_into().expect("chunk of 8 bytes")))
            .collect();
        Ok(Self(data))
    }
}

/// How newly-minted concept vectors are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorGeneration {
    /// Each component i.i.d. standard normal, then normalised to unit length.
    Gaussian,
    /// Each component uniformly `+1` or `-1`, then normalised to unit length.
    Bipolar,
}

impl VectorGeneration {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Some(Self::Gaussian),
            "bipolar" => Some(Self::Bipolar),
            _ => None,
        }
    }
}

/// The engine's single seeded random source, threaded explicitly through
/// every call that allocates a random vector instead of living behind a
/// global/`thread_local!`: an explicit handle carried in the engine and
/// executor context.
#[derive(Clone)]
pub struct RngHandle {
    seed: u64,
    rng: ChaCha8Rng,
}

impl std::fmt::Debug for RngHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RngHandle").field("seed", &self.seed).finish()
    }
}

impl RngHandle {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws a fresh unit vector of the given dimension, quasi-orthogonal to
    /// every other random draw by construction (high-dimensional random
    /// vectors are nearly orthogonal with overwhelming probability).
    pub fn random_vector(&mut self, dim: usize, generation: VectorGeneration) -> Vector {
        let raw: Vec<f64> = match generation {
            VectorGeneration::Gaussian => (0..dim).map(|_| self.sample_standard_normal()).collect(),
            VectorGeneration::Bipolar => (0..dim)
                .map(|_| if self.rng.r#gen::<bool>() { 1.0 } else { -1.0 })
                .collect(),
        };
        Vector::from_vec(raw).normalise()
    }

    /// A small perturbation vector for the planner's `random_restart` plateau policy.
    pub fn small_perturbation(&mut self, dim: usize, magnitude: f64) -> Vector {
        self.random_vector(dim, VectorGeneration::Gaussian).scale(magnitude)
    }

    /// Box-Muller transform over the underlying uniform generator, so the
    /// whole engine draws from one seeded stream.
    fn sample_standard_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_is_idempotent() {
        let v = Vector::from_vec(vec![3.0, 4.0, 0.0, 0.0]);
        let n1 = v.normalise();
        let n2 = n1.normalise();
        assert!((n1.norm() - 1.0).abs() < 1e-9);
        for (a, b) in n1.data().iter().zip(n2.data().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_normalises_to_zero() {
        let v = Vector::zeros(64);
        assert!(v.normalise().is_zero());
    }

    #[test]
    fn cosine_self_is_one() {
        let v = Vector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert!((v.cosine(&v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = Vector::from_vec(vec![1.0, 0.0, 0.0, 0.0]);
        let b = Vector::from_vec(vec![0.0, 1.0, 0.0, 0.0]);
        assert!((a.cosine(&b) - b.cosine(&a)).abs() < 1e-12);
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut a = RngHandle::from_seed(42);
        let mut b = RngHandle::from_seed(42);
        let va = a.random_vector(64, VectorGeneration::Gaussian);
        let vb = b.random_vector(64, VectorGeneration::Gaussian);
        assert_eq!(va, vb);
    }

    #[test]
    fn truth_bin_round_trips() {
        let v = Vector::from_vec(vec![0.5, -0.25, 1.0, 0.0]);
        let bytes = v.to_le_bytes();
        let restored = Vector::from_le_bytes(&bytes).unwrap();
        assert_eq!(v, restored);
    }
}
