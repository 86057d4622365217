//! Completion gate for history commits

use crate::models::{ArtifactKind, StepArtifacts};

/// True iff every slot of every step in `[0, step_count)` is terminal
///
/// Missing entries count as pending.
pub fn is_complete(artifacts: &[StepArtifacts], step_count: usize) -> bool {
    (0..step_count).all(|i| artifacts.get(i).is_some_and(StepArtifacts::is_terminal))
}

/// First pending (step index, kind), for diagnostics
pub fn first_pending(
    artifacts: &[StepArtifacts],
    step_count: usize,
) -> Option<(usize, ArtifactKind)> {
    (0..step_count).find_map(|i| match artifacts.get(i) {
        None => Some((i, ArtifactKind::Lyrics)),
        Some(step) => ArtifactKind::ALL
            .into_iter()
            .find(|k| !step.slot(*k).is_terminal())
            .map(|k| (i, k)),
    })
}
