//! Stage list simplification

use tracing::trace;

use crate::curve::{CurveKind, DEFAULT_TABLE_SIZE, ToneCurve};

use super::stages::Stage;

/// Composition error tolerated when dropping a curve pair
const PAIR_EPSILON: f64 = 1e-6;

/// Points checked when testing a curve pair for identity
const PAIR_PROBES: usize = 256;

/// Run every pass until the list stops changing
pub(super) fn optimize(stages: &mut Vec<Stage>) -> bool {
    let mut changed = false;
    loop {
        let before = stages.len();
        let mut round = drop_identities(stages);
        round |= fuse_matrices(stages);
        round |= drop_identities(stages);
        round |= drop_inverse_curve_pairs(stages);
        round |= fuse_sampled_curves(stages);
        trace!(before, after = stages.len(), round, "optimize pass");
        if !round {
            return changed;
        }
        changed = true;
    }
}

fn drop_identities(stages: &mut Vec<Stage>) -> bool {
    let before = stages.len();
    stages.retain(|s| !s.is_identity());
    stages.len() != before
}

fn fuse_matrices(stages: &mut Vec<Stage>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < stages.len() {
        let fused = match (&stages[i], &stages[i + 1]) {
            (Stage::Matrix(a), Stage::Matrix(b)) => a.then(b),
            _ => None,
        };
        if let Some(m) = fused {
            trace!(index = i, "fused adjacent matrices");
            stages[i] = Stage::Matrix(m);
            stages.remove(i + 1);
            changed = true;
        } else {
            i += 1;
        }
    }
    changed
}

fn composes_to_identity(first: &ToneCurve, second: &ToneCurve) -> bool {
    (0..PAIR_PROBES).all(|i| {
        let x = i as f64 / (PAIR_PROBES - 1) as f64;
        (second.evaluate(first.evaluate(x)) - x).abs() < PAIR_EPSILON
    })
}

fn drop_inverse_curve_pairs(stages: &mut Vec<Stage>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < stages.len() {
        let cancels = match (&stages[i], &stages[i + 1]) {
            (Stage::Curves(a), Stage::Curves(b)) if a.len() == b.len() => {
                a.iter().zip(b).all(|(f, g)| composes_to_identity(f, g))
            }
            _ => false,
        };
        if cancels {
            trace!(index = i, "dropped inverse curve pair");
            stages.drain(i..i + 2);
            changed = true;
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
    changed
}

fn all_sampled(curves: &[ToneCurve]) -> bool {
    curves
        .iter()
        .all(|c| matches!(c.kind(), CurveKind::Sampled(_)))
}

fn fuse_sampled_curves(stages: &mut Vec<Stage>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < stages.len() {
        let fused = match (&stages[i], &stages[i + 1]) {
            (Stage::Curves(a), Stage::Curves(b))
                if a.len() == b.len() && all_sampled(a) && all_sampled(b) =>
            {
                a.iter()
                    .zip(b)
                    .map(|(f, g)| f.join(g, DEFAULT_TABLE_SIZE))
                    .collect::<Result<Vec<_>, _>>()
                    .ok()
            }
            _ => None,
        };
        if let Some(curves) = fused {
            trace!(index = i, "joined sampled curve sets");
            stages[i] = Stage::Curves(curves);
            stages.remove(i + 1);
            changed = true;
        } else {
            i += 1;
        }
    }
    changed
}
