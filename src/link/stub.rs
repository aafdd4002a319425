// External symbol stubs
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

//! Lazy placeholders for declarations that are not yet resident.

use super::{DeclObject, LinkError, LinkGraph, LinkResult, LinkedModule, ObjectRef};
use crate::ir::StableId;

/// Materialize and reconcile placeholders for referenced declarations.
///
/// A stub is an object on the graph in the [`DeclObject::Stub`] state.
/// Since references are edges to an [`ObjectRef`] rather than pointers to
///   a stub,
///     reconciling a stub is a replacement of the weight of a single node;
///     no reference needs to be rewritten.
pub trait StubResolver {
    /// Object standing in for `id`.
    ///
    /// If `id` is already on the graph
    ///   (whether stubbed or resident),
    ///   its existing object is returned;
    ///     otherwise a new stub is created.
    /// Repeated calls with the same `id` therefore always return the same
    ///   [`ObjectRef`].
    fn stub_for(&mut self, id: StableId) -> ObjectRef;

    /// Replace every live stub whose declaration is owned by `module` with
    ///   that declaration.
    ///
    /// Returns the number of stubs reconciled.
    fn reconcile(&mut self, module: &LinkedModule) -> LinkResult<usize>;

    /// Identifiers of all live stubs in ascending order.
    fn live_stubs(&self) -> Vec<StableId>;

    /// Fail with [`LinkError::UnresolvedSymbols`] if any stub remains
    ///   live.
    fn assert_fully_reconciled(&self) -> LinkResult<()> {
        let live = self.live_stubs();

        if live.is_empty() {
            Ok(())
        } else {
            Err(LinkError::UnresolvedSymbols(live))
        }
    }
}

impl StubResolver for LinkGraph {
    fn stub_for(&mut self, id: StableId) -> ObjectRef {
        self.lookup(id).unwrap_or_else(|| {
            tracing::trace!(%id, "creating stub");

            self.stubs_created += 1;
            self.add_object(DeclObject::Stub(id))
        })
    }

    fn reconcile(&mut self, module: &LinkedModule) -> LinkResult<usize> {
        let mut count = 0;

        for decl in module.declarations.iter() {
            let objref = match self.lookup(decl.id) {
                Some(objref) => objref,
                None => continue,
            };

            if let Some(DeclObject::Stub(_)) = self.get(objref) {
                self.with_object(objref, |obj| {
                    obj.resolve(decl.clone(), module.name.clone())
                })?;

                count += 1;
            }
        }

        tracing::debug!(
            module = %module.name,
            reconciled = count,
            "reconciled stubs"
        );

        Ok(count)
    }

    fn live_stubs(&self) -> Vec<StableId> {
        let mut live: Vec<_> = self
            .objects()
            .filter(|obj| obj.is_stub())
            .map(DeclObject::id)
            .collect();

        live.sort();
        live
    }
}

impl LinkGraph {
    /// Total number of stubs created over the life of the graph,
    ///   whether or not they have since been reconciled.
    pub fn stub_count(&self) -> usize {
        self.stubs_created
    }
}
