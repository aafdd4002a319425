// Cross-module declaration linking
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

//! Link declarations of many modules into a single graph.
//!
//! Every declaration linked during a session is an object on a
//!   [`LinkGraph`],
//!     and every reference from one declaration to another is an edge.
//! Objects are addressed by [`ObjectRef`] and indexed by
//!   [`StableId`](crate::ir::StableId).
//!
//! Stubs
//! =====
//! A reference may be linked before the declaration it refers to has been
//!   loaded,
//!     e.g. a forward reference within a module.
//! Such a reference is linked to a _stub_:
//!   an object in the [`DeclObject::Stub`] state that stands in for the
//!   declaration until its owning module is [reconciled](StubResolver).
//!
//! ```text
//!   main --> (Stub later)          main --> (Decl later)
//!                              ==>
//!   (edges unchanged; only the node weight is replaced)
//! ```
//!
//! Since references are edges to an [`ObjectRef`] and never pointers,
//!   reconciliation replaces the weight of one node and rewrites nothing
//!   else.
//! A graph that still contains a stub once every module has been linked
//!   is incomplete;
//!     see [`StubResolver::assert_fully_reconciled`].

mod error;
mod graph;
mod program;
mod stub;

pub use error::{LinkError, LinkResult};
pub use graph::{DeclObject, LinkGraph, LinkIx, ObjectRef, TransitionResult};
pub use program::{LinkedModule, LinkedProgram};
pub use stub::StubResolver;

#[cfg(test)]
mod test;
