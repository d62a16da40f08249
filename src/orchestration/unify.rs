//! Result unifier
//!
//! Merges zero, one, or many agent outputs into a single answer string.

use crate::domain::AgentOutput;

/// Fixed fallback when no agent produced a result
pub const EMPTY_RESULT_FALLBACK: &str = "결과를 생성할 수 없습니다.";

/// Heading for the merged multi-agent document
const MERGED_HEADING: &str = "# 통합 분석 결과";

/// Merge agent outputs into one answer
///
/// - zero results: the fixed fallback string;
/// - one result: its response verbatim;
/// - many results: one Markdown document with a top-level heading and a
///   per-agent subsection in input order, every body verbatim down to its
///   trailing whitespace.
pub fn unify_results(results: &[AgentOutput]) -> String {
    match results {
        [] => EMPTY_RESULT_FALLBACK.to_string(),
        [only] => only.response.clone(),
        many => {
            let mut document = String::from(MERGED_HEADING);

            for output in many {
                document.push_str(&format!("\n\n## {}\n\n{}", output.agent, output.response));
            }

            document
        }
    }
}
