//! Pre-filter / intent classifier
//!
//! Cheap, model-free first pass over a query: answer trivial small talk
//! directly, or suggest which specialized agent should handle it. Pure
//! function over the routing policy; no I/O, constant small time.

use serde::{Deserialize, Serialize};

use crate::config::{IntentFamily, RoutePolicy};

/// Outcome of the pre-filter pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreFilterOutcome {
    /// Whether the query should be handed to an agent
    pub should_handoff: bool,
    /// Canned answer when no agent is needed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_response: Option<String>,
    /// Suggested agent; deliberately absent for composite queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_agent: Option<String>,
    /// Classification confidence
    pub confidence: f64,
}

/// Classify a query against the routing policy
///
/// Rules apply in priority order and never combine confidences:
/// 1. greeting/small talk -> direct canned response;
/// 2. exactly one intent family -> that family's agent;
/// 3. multiple families (composite) -> handoff with **no** suggested agent
///    and a deliberately low confidence.
pub fn pre_filter_query(query: &str, policy: &RoutePolicy) -> PreFilterOutcome {
    let normalized = query.trim().to_lowercase();

    if is_greeting(&normalized, policy) {
        return PreFilterOutcome {
            should_handoff: false,
            direct_response: Some(policy.identity_response.clone()),
            suggested_agent: None,
            confidence: policy.greeting_confidence,
        };
    }

    let matched = matching_families(&normalized, policy);

    match matched.as_slice() {
        [family] => PreFilterOutcome {
            should_handoff: true,
            direct_response: None,
            suggested_agent: Some(family.agent.clone()),
            confidence: if family.specific {
                policy.specific_confidence
            } else {
                policy.metric_confidence
            },
        },
        [] => PreFilterOutcome {
            should_handoff: true,
            direct_response: None,
            suggested_agent: None,
            confidence: policy.fallback_confidence,
        },
        _ => {
            tracing::debug!(
                families = matched.len(),
                "composite query, declining single-agent suggestion"
            );
            PreFilterOutcome {
                should_handoff: true,
                direct_response: None,
                suggested_agent: None,
                confidence: policy.composite_confidence,
            }
        }
    }
}

fn is_greeting(normalized: &str, policy: &RoutePolicy) -> bool {
    policy
        .greeting_patterns
        .iter()
        .any(|p| greeting_prefix_matches(normalized, p))
}

/// Patterns ending in an ASCII letter must stop at a word boundary, so
/// "hi" matches "hi there" but not "high cpu usage". Korean particles
/// attach directly to the stem, so Korean patterns match as plain prefixes.
fn greeting_prefix_matches(normalized: &str, pattern: &str) -> bool {
    let rest = match normalized.strip_prefix(pattern) {
        Some(rest) => rest,
        None => return false,
    };

    let word_bounded = pattern
        .chars()
        .last()
        .map_or(false, |c| c.is_ascii_alphabetic());

    !word_bounded
        || rest
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric())
}

/// Families whose keywords appear in the query, in policy order
pub(crate) fn matching_families<'a>(
    normalized: &str,
    policy: &'a RoutePolicy,
) -> Vec<&'a IntentFamily> {
    policy
        .families
        .iter()
        .filter(|family| family.keywords.iter().any(|k| normalized.contains(k.as_str())))
        .collect()
}
