// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Per-phase test timing and shared-context reuse tracking.
//!
//! A host test framework feeds [`events::InsightEvent`]s into a
//! [`orchestrator::ReportOrchestrator`]. The orchestrator determines which build phase is running
//! (for example Maven Surefire vs. Failsafe), records class and method timing, tracks how often
//! each shared application context is created and reused, and renders one report per phase when
//! the root scope closes.
//!
//! The basic flow is:
//!
//! 1. Load an [`config::InsightConfig`] and get an orchestrator builder from it.
//! 2. Register a [`collab::FingerprintResolver`] and any other collaborators, then build.
//! 3. Call [`orchestrator::ReportOrchestrator::handle_event`] for every lifecycle event.
//! 4. Close the [`scope::RootScope`] (or send a `RunClosed` event) to emit the report.

pub mod collab;
pub mod config;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod output;
pub mod phase;
pub mod reporter;
pub mod scope;
mod time;
pub mod tracker;
