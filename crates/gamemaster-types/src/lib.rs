//! Shared type definitions for the Gamemaster daily cycle orchestrator.
//!
//! This crate is the single source of truth for the data that flows
//! between the phase sequencer, the scheduler, and the collaborator
//! adapters. Nothing here performs I/O.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for cycle identifiers
//! - [`enums`] -- Content kinds, cycle phases, and cycle status
//! - [`cast`] -- NPC personas and the dialogue lines they produce
//! - [`world`] -- The persistent [`WorldState`] record
//! - [`cycle`] -- Cycle snapshots, composed content, and [`CycleResult`]
//! - [`tools`] -- Discovered content-generation tool descriptors

pub mod cast;
pub mod cycle;
pub mod enums;
pub mod ids;
pub mod tools;
pub mod world;

// Re-export all public types at crate root for convenience.
pub use cast::{NpcDialogue, NpcProfile, default_cast};
pub use cycle::{ComposedContent, CompletedCycle, CycleOutcome, CycleResult, CycleSnapshot, FailedCycle};
pub use enums::{ContentKind, CycleStatus, Phase};
pub use ids::CycleId;
pub use tools::{ToolCatalog, ToolDescriptor};
pub use world::{StateError, WorldState};
