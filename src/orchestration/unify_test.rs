use super::unify::{unify_results, EMPTY_RESULT_FALLBACK};
use crate::domain::AgentOutput;

#[test]
fn test_empty_results_yield_fixed_fallback() {
    assert_eq!(unify_results(&[]), EMPTY_RESULT_FALLBACK);
}

#[test]
fn test_single_result_identity_law() {
    let results = vec![AgentOutput::new("A", "X")];
    // No wrapping, no header: the response comes back exactly as given
    assert_eq!(unify_results(&results), "X");
}

#[test]
fn test_multi_merge_preserves_order_and_content() {
    let results = vec![
        AgentOutput::new("NLQ Agent", "Status data"),
        AgentOutput::new("Analyst Agent", "Analysis result"),
    ];

    let merged = unify_results(&results);

    assert!(merged.starts_with("# "));
    assert!(merged.contains("## NLQ Agent"));
    assert!(merged.contains("## Analyst Agent"));
    assert!(merged.contains("Status data"));
    assert!(merged.contains("Analysis result"));

    let nlq_pos = merged.find("## NLQ Agent").unwrap();
    let analyst_pos = merged.find("## Analyst Agent").unwrap();
    assert!(nlq_pos < analyst_pos, "input order must be preserved");
}

#[test]
fn test_last_body_trailing_whitespace_survives_merge() {
    let results = vec![
        AgentOutput::new("NLQ Agent", "상태: 정상\n"),
        AgentOutput::new("Advisor Agent", "조치 목록:\n- 재시작\n\n"),
    ];

    let merged = unify_results(&results);

    assert!(merged.ends_with("조치 목록:\n- 재시작\n\n"));
    assert!(merged.contains("상태: 정상\n\n\n## Advisor Agent"));
}

#[test]
fn test_multi_merge_keeps_bodies_verbatim() {
    let body = "라인1\n\n- 항목\n```\ncode\n```";
    let results = vec![
        AgentOutput::new("Reporter Agent", body),
        AgentOutput::new("Advisor Agent", "조치: 재시작"),
    ];

    let merged = unify_results(&results);
    assert!(merged.contains(body));
    assert!(merged.contains("조치: 재시작"));
}
