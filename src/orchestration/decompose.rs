//! Task decomposer
//!
//! Splits a composite query into ordered single-agent subtasks. Returns
//! `None` for anything atomic; invoked only after the pre-filter signals
//! ambiguity. Subtasks run strictly in order because later ones may depend
//! on session context written by earlier ones.

use crate::config::RoutePolicy;
use crate::domain::Task;

use super::prefilter::matching_families;

/// Decompose a query into subtasks, or `None` when it is atomic
///
/// Each subtask targets the agent of one matched intent family and carries
/// the query text verbatim: every agent sees the full question and answers
/// its own aspect of it. Order follows the policy's canonical pipeline
/// order (data -> analysis -> report -> advice).
pub fn decompose_task(query: &str, policy: &RoutePolicy) -> Option<Vec<Task>> {
    let normalized = query.trim().to_lowercase();
    let families = matching_families(&normalized, policy);

    if families.len() < 2 {
        return None;
    }

    Some(
        families
            .iter()
            .enumerate()
            .map(|(order, family)| Task {
                sub_query: query.to_string(),
                target_agent: family.agent.clone(),
                order,
            })
            .collect(),
    )
}
