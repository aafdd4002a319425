// Compilation pipeline
//
//  Copyright (C) 2014-2022 Ryan Specialty Group, LLC.
//
//  This file is part of klink.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Compilation pipeline for a single module.
//!
//! A [`LinkOrchestrator`] carries a module from a [`Frontend`] through
//!   dependency linking and then either writes a klib or hands the linked
//!   program to a [`Backend`].
//!
//! Phases
//! ======
//! Each run moves through the [`Phase`]s in order and records its
//!   progress as a [`State`]:
//!
//!   1. [`Phase::Analyzing`] asks the frontend for an [`AnalyzedModule`];
//!   2. [`Phase::Translating`] asks the frontend for the module's IR;
//!   3. [`Phase::LinkingDependencies`] links every already-compiled
//!        dependency and then the module itself; and
//!   4. either [`Phase::EmittingArtifact`] or
//!        [`Phase::LoweringAndEmittingOutput`],
//!          depending on the [`Target`].
//!
//! Cancellation
//! ============
//! Runs are cancelled cooperatively through a [`CancelToken`].
//! The token is only consulted at checkpoints between units of work,
//!   so a cancelled run never leaves a partially written klib behind;
//!     see [`KlibWriter`](crate::klib::KlibWriter) for how the artifact
//!     itself is made visible.

mod backend;
mod cache;
mod frontend;
mod orchestrator;
mod state;

pub use backend::{Backend, ListingBackend, PhaseConfig};
pub use cache::{CachedDependencies, DependencyCache, MemoryDependencyCache};
pub use frontend::{
    AnalyzedModule, Frontend, IrAnalysis, KlibFrontend, PreparedModule,
};
pub use orchestrator::{
    LinkOptions, LinkOrchestrator, LinkRequest, Outcome, PipelineError,
    PipelineErrorKind, Target, TranslationResult,
};
pub use state::{CancelToken, Checkpoint, Phase, State};
