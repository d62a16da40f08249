//! Domain types for the orchestration core
//!
//! Core abstractions shared by every other module: the event protocol,
//! conversation messages, tool calls, and the per-run query/task types.

mod event;
mod message;
mod query;
mod tool_call;

pub use event::*;
pub use message::*;
pub use query::*;
pub use tool_call::*;
