// Compiled modules
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

//! Already-compiled modules and their namespaces.
//!
//! A [`CompiledModuleRecord`] points to a klib that has not yet been
//!   loaded.
//! Records and their dependencies form a [`ModuleGraph`],
//!   which is [linearized](ModuleGraph::linearize) into the order in
//!   which modules are linked:
//!     the single builtins module first,
//!     then every module after all of its dependencies.
//!
//! Each record is then turned into a [`ModuleDescriptor`] by a
//!   [`DescriptorCache`].
//!
//! Builtins
//! ========
//! Exactly one module reachable from the roots must be marked as the
//!   builtins module.
//! It provides the primitives that all other modules link against and so
//!   may itself depend on nothing.
//! Rather than living in a global,
//!   the builtins descriptor is an [`Rc`](std::rc::Rc) handle owned by the
//!   session's [`DescriptorCache`] and shared with every descriptor it
//!   produces.

mod descriptor;
mod discover;
mod graph;

pub use descriptor::{DescriptorCache, DescriptorError, ModuleDescriptor};
pub use discover::{discover, Discovery};
pub use graph::{
    CompiledModuleRecord, ModuleGraph, ModuleGraphError, RecordIx, RecordRef,
};

#[cfg(test)]
mod test;
