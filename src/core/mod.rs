//! Agent execution
//!
//! [`BaseAgent`] drives one agent through a bounded tool-calling loop against
//! a resolved model, producing the event sequence the rest of the system
//! consumes.

mod base;

pub use base::BaseAgent;
pub(crate) use base::done_response;

use tera::{Context, Tera};

use crate::domain::Query;

/// Render agent instructions as a Tera template with per-invocation values
///
/// Instructions may use placeholders such as:
/// ```text
/// You are a monitoring assistant. Query: {{ query }} (session {{ session_id }})
/// ```
///
/// Falls back to the raw instruction text if rendering fails.
pub fn render_instructions(instructions: &str, query: &Query) -> String {
    if !instructions.contains("{{") {
        return instructions.to_string();
    }

    let mut context = Context::new();
    context.insert("query", &query.text);
    context.insert("session_id", &query.session_id);

    match Tera::one_off(instructions, &context, false) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!("Failed to render instruction template: {}", e);
            instructions.to_string()
        }
    }
}
