//! The planner: semantic gradient descent over a fixed action set.
//!
//! A plain iterative hill-climb, no external solver crate — matching the
//! spec's "procedural_fallback ... opaque" non-goal. `Plan` and `Solve`
//! share the same [`hill_climb`] loop; they differ only in the closure that
//! scores a candidate vector.

use crate::error::{SpockError, SpockResult};
use crate::kernel;
use crate::resource::LimitTracker;
use crate::tracer::{TraceEvent, Tracer};
use crate::vector::{RngHandle, Vector};

/// One candidate move: a named delta added to the current vector.
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub delta: Vector,
}

/// What happens when no action improves the score (a plateau).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateauStrategy {
    /// Stop and return the best vector found so far.
    Stop,
    /// Apply a small random perturbation and keep climbing, up to the
    /// planning-step limit.
    RandomRestart,
}

impl PlateauStrategy {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Some(Self::Stop),
            "random-restart" | "random_restart" => Some(Self::RandomRestart),
            _ => None,
        }
    }
}

/// The path and final state a hill-climb produced.
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub path: Vec<String>,
    pub final_vector: Vector,
    pub final_score: f64,
    pub steps: usize,
}

/// Climbs from `start` toward higher `objective(&vector)`, picking at each
/// step the available action that improves the score the most. Shared by
/// `Plan` (objective = similarity to a goal vector) and `Solve` (objective =
/// caller-supplied constraint satisfaction score).
pub fn hill_climb<F: Fn(&Vector) -> f64>(
    start: Vector,
    actions: &[Action],
    objective: F,
    plateau: PlateauStrategy,
    limits: &mut LimitTracker,
    tracer: &mut dyn Tracer,
    rng: &mut RngHandle,
) -> SpockResult<PlanResult> {
    let mut current = start;
    let mut current_score = objective(&current);
    let mut path = Vec::new();
    let mut steps = 0usize;

    loop {
        limits.step_planning().map_err(|e| SpockError::Execution {
            message: e.to_string(),
            statement: "plan".to_string(),
            line: 0,
        })?;
        steps += 1;

        let best = actions
            .iter()
            .map(|action| {
                let candidate = current.add(&action.delta);
                (action, objective(&candidate), candidate)
            })
            .filter(|(_, score, _)| *score > current_score)
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((action, score, candidate)) => {
                current = candidate;
                current_score = score;
                path.push(action.name.clone());
                tracer.on_plan_step(TraceEvent::PlanStep { step: steps, score: current_score });
            }
            None => {
                tracer.on_plan_step(TraceEvent::PlateauReached { step: steps, strategy: format!("{plateau:?}") });
                match plateau {
                    PlateauStrategy::Stop => break,
                    PlateauStrategy::RandomRestart => {
                        let perturbation = rng.small_perturbation(current.dim(), 0.05);
                        let perturbed = current.add(&perturbation);
                        let perturbed_score = objective(&perturbed);
                        if perturbed_score > current_score {
                            current = perturbed;
                            current_score = perturbed_score;
                        } else {
                            break;
                        }
                    }
                }
            }
        }
    }

    Ok(PlanResult {
        path,
        final_vector: current,
        final_score: current_score,
        steps,
    })
}

/// `Plan(start, goal, actions)`: climbs toward maximum similarity with
/// `goal`.
pub fn plan(
    start: Vector,
    goal: &Vector,
    actions: &[Action],
    plateau: PlateauStrategy,
    limits: &mut LimitTracker,
    tracer: &mut dyn Tracer,
    rng: &mut RngHandle,
) -> SpockResult<PlanResult> {
    hill_climb(start, actions, |v| kernel::distance(v, goal), plateau, limits, tracer, rng)
}

/// `Solve(start, constraint, actions)`: climbs toward maximum value of a
/// caller-supplied scoring closure, used when the target is a numeric
/// constraint rather than a fixed goal vector.
pub fn solve<F: Fn(&Vector) -> f64>(
    start: Vector,
    constraint: F,
    actions: &[Action],
    plateau: PlateauStrategy,
    limits: &mut LimitTracker,
    tracer: &mut dyn Tracer,
    rng: &mut RngHandle,
) -> SpockResult<PlanResult> {
    hill_climb(start, actions, constraint, plateau, limits, tracer, rng)
}
