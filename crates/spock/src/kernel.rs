//! The geometric kernel: the eight kernel-set verbs that operate on
//! `VECTOR` operands (`Add`, `Bind`, `Negate`, `Distance`, `Move`,
//! `Modulate`, `Identity`, `Normalise`).
//!
//! Each function is a pure transform over raw `Vector`s; dispatch,
//! type-checking, and origin-stamping live in `exec.rs`, keeping "what a
//! verb computes" separate from "how a statement invokes it".

use crate::value::{Origin, VectorValue};
use crate::vector::Vector;

/// `Add(a, b)`: vector sum, unnormalised.
#[must_use]
pub fn add(a: &Vector, b: &Vector) -> Vector {
    a.add(b)
}

/// `Bind(a, b)`: element-wise (Hadamard) product, the VSA binding operator.
#[must_use]
pub fn bind(a: &Vector, b: &Vector) -> Vector {
    a.hadamard(b)
}

/// `Negate(a)`: negation, used to build a contrary concept.
#[must_use]
pub fn negate(a: &Vector) -> Vector {
    a.negate()
}

/// `Distance(a, b)`: cosine similarity, mapped into `[0, 1]` so it can be
/// read directly as a confidence/truth-likeness score. Used both by the
/// `Distance` verb itself and by `Evaluate`/planning's goal-proximity check.
#[must_use]
pub fn distance(a: &Vector, b: &Vector) -> f64 {
    (a.cosine(b) + 1.0) / 2.0
}

/// `Move(a, b)`: translates `a` by `b`, an alias for vector addition kept
/// distinct from `Add` so a script can express "displace this concept" and
/// "combine these two concepts" with different verbs over the same math.
#[must_use]
pub fn mv(a: &Vector, b: &Vector) -> Vector {
    a.add(b)
}

/// `Modulate(a, b)` where `b` is a `VECTOR`: element-wise (Hadamard)
/// scaling, distinct from `Bind` only in the calling verb's type signature.
#[must_use]
pub fn modulate_vector(a: &Vector, b: &Vector) -> Vector {
    a.hadamard(b)
}

/// `Modulate(a, s)` where `s` is a `SCALAR`: scales a vector's magnitude
/// without renormalising.
#[must_use]
pub fn modulate_scalar(a: &Vector, scalar: f64) -> Vector {
    a.scale(scalar)
}

/// `Identity(a)`: the trivial self-map, used by `Remember` as the fallback
/// statement for a value with no recorded producing statement.
#[must_use]
pub fn identity(a: &Vector) -> Vector {
    a.clone()
}

/// `Normalise(a)`: scales `a` to unit length.
#[must_use]
pub fn normalise(a: &Vector) -> Vector {
    a.normalise()
}

/// Wraps a geometric verb's vector result with a fresh, un-annotated
/// `Origin`; callers in `exec.rs` fill in the declaration/verb/line.
#[must_use]
pub fn wrap(vector: Vector, origin: Origin) -> VectorValue {
    VectorValue::new(vector, origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(data: &[f64]) -> Vector {
        Vector::from_vec(data.to_vec())
    }

    #[test]
    fn add_sums_components() {
        let a = v(&[1.0, 0.0, 0.0, 0.0]);
        let b = v(&[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(add(&a, &b), v(&[1.0, 1.0, 0.0, 0.0]));
    }

    #[test]
    fn bind_is_hadamard_product() {
        let a = v(&[1.0, 2.0, 3.0, 4.0]);
        let b = v(&[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(bind(&a, &b), v(&[2.0, 4.0, 6.0, 8.0]));
    }

    #[test]
    fn distance_of_identical_vectors_is_one() {
        let a = v(&[1.0, 2.0, 3.0, 4.0]);
        assert!((distance(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn distance_of_opposites_is_zero() {
        let a = v(&[1.0, 0.0, 0.0, 0.0]);
        assert!((distance(&a, &negate(&a))).abs() < 1e-9);
    }

    #[test]
    fn move_translates_by_the_object() {
        let a = v(&[1.0, 0.0, 0.0, 0.0]);
        let delta = v(&[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(mv(&a, &delta), v(&[1.0, 1.0, 0.0, 0.0]));
    }

    #[test]
    fn modulate_scalar_does_not_renormalise() {
        let a = v(&[1.0, 0.0, 0.0, 0.0]);
        let scaled = modulate_scalar(&a, 3.0);
        assert!((scaled.norm() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn modulate_vector_is_hadamard() {
        let a = v(&[1.0, 2.0, 3.0, 4.0]);
        let b = v(&[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(modulate_vector(&a, &b), v(&[1.0, 0.0, 3.0, 0.0]));
    }

    #[test]
    fn identity_clones_the_vector() {
        let a = v(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(identity(&a), a);
    }

    #[test]
    fn normalise_scales_to_unit_length() {
        let a = v(&[3.0, 4.0, 0.0, 0.0]);
        assert!((normalise(&a).norm() - 1.0).abs() < 1e-9);
    }
}
