// Pipeline state and cancellation
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

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Phase of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Analyzing,
    Translating,
    LinkingDependencies,
    EmittingArtifact,
    LoweringAndEmittingOutput,
}

impl Display for Phase {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Analyzing => write!(fmt, "analysis"),
            Self::Translating => write!(fmt, "translation"),
            Self::LinkingDependencies => write!(fmt, "dependency linking"),
            Self::EmittingArtifact => write!(fmt, "klib emission"),
            Self::LoweringAndEmittingOutput => write!(fmt, "lowering"),
        }
    }
}

/// State of a [`LinkOrchestrator`](super::LinkOrchestrator).
///
/// `Done`, `Aborted` and `Failed` are terminal for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Idle,
    Running(Phase),
    Done,
    Aborted(Phase),
    Failed(String),
}

/// Result of a cancellation checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    Abort,
}

/// Cooperative cancellation signal.
///
/// Clones share the same signal,
///   and so a driver may hold one clone
///     (possibly on another thread)
///   while the pipeline polls another at each checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        if self.is_cancelled() {
            Checkpoint::Abort
        } else {
            Checkpoint::Continue
        }
    }
}
