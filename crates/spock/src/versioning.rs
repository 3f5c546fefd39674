//! Theory branch/merge version algebra, layered on top of [`crate::theory`].
//!
//! `branch` always succeeds (it is a copy with a fresh version id); `merge`
//! can fail with `SpockError::MergeConflict` under the `Fail` strategy,
//! which is the default because silently picking a winner on a real
//! conflict would make `Remember` non-deterministic across peers.

use indexmap::IndexMap;

use crate::error::{SpockError, SpockResult};
use crate::theory::{TheoryDescriptor, TheorySnapshot};
use crate::value::{NumericValue, Origin, Value, VectorValue};

/// How `MergeTheory` resolves a declaration present in both the target and
/// source version with different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Refuse the merge entirely; returns `SpockError::MergeConflict`.
    Fail,
    /// The target version's value wins.
    PreferTarget,
    /// The source version's value wins.
    PreferSource,
    /// Keep the target's value and additionally store the source's value
    /// under `"{declaration}_merged"`.
    Both,
    /// Keep the target's value and additionally store a consensus value
    /// under `"{declaration}_consensus"`: for two `VECTOR`s this is
    /// `normalise(target + source)`; for two `NUMERIC`s, their average.
    Consensus,
}

impl MergeStrategy {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Some(Self::Fail),
            "prefer-target" | "prefer_target" | "target" => Some(Self::PreferTarget),
            "prefer-source" | "prefer_source" | "source" => Some(Self::PreferSource),
            "both" => Some(Self::Both),
            "consensus" => Some(Self::Consensus),
            _ => None,
        }
    }
}

fn consensus_value(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Vector(a), Value::Vector(b)) => {
            let vector = a.vector.add(&b.vector).normalise();
            Value::Vector(VectorValue::new(vector, Origin::new(None, "consensus".to_string(), 0)))
        }
        _ => {
            let a = target.as_numeric().map_or(0.0, |n| n.magnitude);
            let b = source.as_numeric().map_or(0.0, |n| n.magnitude);
            Value::Numeric(NumericValue::new((a + b) / 2.0, None, Origin::new(None, "consensus".to_string(), 0)))
        }
    }
}

/// Creates a new version of `source`, parented on it, with the same
/// declarations and source text. Used by the `BranchTheory` statement.
#[must_use]
pub fn branch(source: &TheorySnapshot, new_name: &str) -> TheorySnapshot {
    TheorySnapshot {
        descriptor: TheoryDescriptor::new(new_name, Some(source.descriptor.version)),
        source: source.source.clone(),
        declarations: source.declarations.clone(),
    }
}

/// Merges `source` into `target`, producing a new version parented on
/// `target`. Declarations present in only one side are carried over
/// unconditionally; declarations in both with equal values are kept as-is;
/// declarations in both with differing values are resolved by `strategy`.
pub fn merge(target: &TheorySnapshot, source: &TheorySnapshot, strategy: MergeStrategy) -> SpockResult<TheorySnapshot> {
    let mut merged: IndexMap<String, Value> = target.declarations.clone();
    let mut conflicts = 0usize;

    for (name, source_value) in &source.declarations {
        match merged.get(name) {
            None => {
                merged.insert(name.clone(), source_value.clone());
            }
            Some(target_value) if target_value == source_value => {}
            Some(target_value) => {
                conflicts += 1;
                match strategy {
                    MergeStrategy::Fail => {
                        return Err(SpockError::MergeConflict {
                            declaration: name.clone(),
                            target_version: target.descriptor.version.to_string(),
                            source_version: source.descriptor.version.to_string(),
                        });
                    }
                    MergeStrategy::PreferTarget => {}
                    MergeStrategy::PreferSource => {
                        merged.insert(name.clone(), source_value.clone());
                    }
                    MergeStrategy::Both => {
                        merged.insert(format!("{name}_merged"), source_value.clone());
                    }
                    MergeStrategy::Consensus => {
                        merged.insert(format!("{name}_consensus"), consensus_value(target_value, source_value));
                    }
                }
            }
        }
    }

    if conflicts > 0 {
        tracing::warn!(
            target = %target.descriptor.name,
            source = %source.descriptor.name,
            conflicts,
            "resolved merge conflicts"
        );
    }

    let mut descriptor = TheoryDescriptor::new(&target.descriptor.name, Some(target.descriptor.version));
    descriptor.metadata = target.descriptor.metadata.clone();

    let source_text = format!("{}\n{}", target.source, source.source);

    Ok(TheorySnapshot {
        descriptor,
        source: source_text,
        declarations: merged,
    })
}
