//! Availability resolution for ordered task sequences.
//!
//! A task position unlocks when its predecessor is in the user's completed
//! set; position 0 is always unlocked. Pure functions over a consistent
//! snapshot of the completed set; callers that mutate state must hold the
//! snapshot inside the same transaction.

use std::collections::HashSet;

/// Whether the task at `index` in an ordered sequence is eligible to activate.
///
/// Duplicate ids in `ordered` (an authoring error) are evaluated positionally,
/// not deduplicated. Out-of-range indices are never available.
pub fn is_available(ordered: &[String], index: usize, completed: &HashSet<String>) -> bool {
    if index >= ordered.len() {
        return false;
    }
    index == 0 || completed.contains(&ordered[index - 1])
}

/// All positions in `ordered` currently eligible to activate.
/// Completed positions are not eligible (terminal state).
pub fn available_indices(ordered: &[String], completed: &HashSet<String>) -> Vec<usize> {
    (0..ordered.len())
        .filter(|&i| is_available(ordered, i, completed) && !completed.contains(&ordered[i]))
        .collect()
}
