// Multi-module IR linker (klink)
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

//! Link the IR of one module against already-compiled dependencies and
//!   persist it as a klib.
//!
//! A compilation session proceeds roughly as follows:
//!
//!   1. Already-compiled modules are [discovered](module::discover) as a
//!        [`ModuleGraph`](module::ModuleGraph) of records,
//!        which is [linearized](module::ModuleGraph::linearize) with the
//!        builtins module first;
//!   2. Each dependency is given a [`ModuleDescriptor`](module::ModuleDescriptor)
//!        and its [klib](klib) is deserialized into a single
//!        [`LinkGraph`](link::LinkGraph),
//!          with references to not-yet-loaded declarations held by stubs
//!          until their owner is reconciled;
//!   3. The freshly translated [`ModuleIr`](ir::ModuleIr) is merged into
//!        the same graph; and
//!   4. The result is either written as a klib or lowered to output.
//!
//! These steps are driven by the [`LinkOrchestrator`](pipeline::LinkOrchestrator),
//!   which may be cancelled between units of work.
//!
//! Declarations are identified across every module by
//!   [`StableId`](ir::StableId),
//!     derived from the name and signature of the declaration alone.

// We build docs for private items.
#![allow(rustdoc::private_intra_doc_links)]

pub mod global;

#[macro_use]
extern crate static_assertions;

pub mod fs;
pub mod ir;
pub mod klib;
pub mod link;
pub mod module;
pub mod pipeline;

#[cfg(test)]
pub mod test;
