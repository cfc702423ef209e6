//! Phase sequencer, cycle scheduler, and orchestration for the Gamemaster
//! daily cycle.
//!
//! This crate owns the six-phase cycle that advances the shared story by
//! one day: Generate Episode, Collect Votes, Compose Content, Publish,
//! Advance, and Report.
//!
//! # Modules
//!
//! - [`clock`] -- Wall-clock abstraction and daily trigger computation.
//! - [`collaborator`] -- Capability traits for the external services and
//!   the [`Collaborators`] slot table.
//! - [`config`] -- Configuration loading from `gamemaster-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- Shared stop control for the continuous loops.
//! - [`fallback`] -- Deterministic stand-ins for every collaborator.
//! - [`orchestrator`] -- The [`Orchestrator`] owning the world state.
//! - [`pacing`] -- Inter-phase wait strategies.
//! - [`scheduler`] -- Single-shot, scheduled, and simulation modes.
//! - [`sequencer`] -- The six-phase cycle state machine.
//!
//! [`Collaborators`]: collaborator::Collaborators
//! [`Orchestrator`]: orchestrator::Orchestrator

pub mod clock;
pub mod collaborator;
pub mod config;
pub mod control;
pub mod fallback;
pub mod orchestrator;
pub mod pacing;
pub mod scheduler;
pub mod sequencer;
