//! # Argus - Multi-Agent Query Orchestration Core
//!
//! Argus is the orchestration core of an AI-assisted server monitoring
//! system. It takes a natural-language monitoring question, decides whether
//! it can be answered directly, routes it (possibly after splitting it into
//! sub-questions) to one or more specialized LLM-backed agents, drives each
//! agent through a bounded tool-calling loop, streams typed progress events
//! to the caller, and merges the agents' answers into one response.
//!
//! ## Architecture
//!
//! - **Domain**: the event protocol and per-run types ([`domain`])
//! - **Model seam**: the `AgentExecutor` interface and streaming machinery;
//!   concrete provider adapters live outside this crate ([`llm`])
//! - **Agent execution**: the bounded tool-calling loop ([`core`])
//! - **Orchestration**: pre-filter, decomposer, executor, unifier
//!   ([`orchestration`])
//! - **Ports**: agent registry, tool set, session context ([`registry`],
//!   [`tools`], [`session`])
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use argus::config::Settings;
//! use argus::registry::StaticDirectory;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let _directory = StaticDirectory::from_settings(&settings);
//!     Ok(())
//! }
//! ```
//!
//! The crate is a library: HTTP/SSE transport, authentication, and the
//! metrics data pipeline are external collaborators.

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod llm;
pub mod orchestration;
pub mod registry;
pub mod session;
pub mod tools;

pub use config::Settings;
pub use core::BaseAgent;
pub use domain::{AgentOutput, Query, StreamEvent, Task};
pub use error::{AgentError, ErrorCode};
pub use orchestration::{MultiAgentExecutor, OrchestrationRequest};
