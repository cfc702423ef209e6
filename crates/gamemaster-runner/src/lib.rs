//! Live collaborators for the Gamemaster orchestrator.
//!
//! Connects the phase sequencer to the outside world: an OpenAI-compatible
//! llama.cpp server for narration, dialogue, composition and teasers, and
//! an MCP tool server advertising the content-generation tools.
//!
//! # Modules
//!
//! - [`adapters`] -- LLM-backed implementations of the collaborator traits.
//! - [`bootstrap`] -- Connection attempts, degradation, and orchestrator
//!   construction.
//! - [`discovery`] -- MCP streamable-HTTP tool discovery.
//! - [`error`] -- [`RunnerError`] and its mapping onto collaborator errors.
//! - [`llm`] -- Chat-completions client.
//! - [`parse`] -- Tolerant parsing of composer responses.
//! - [`prompt`] -- `minijinja` prompt templates.
//!
//! [`RunnerError`]: error::RunnerError

pub mod adapters;
pub mod bootstrap;
pub mod discovery;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
