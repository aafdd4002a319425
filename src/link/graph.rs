// Session link graph
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

//! Graph of every declaration linked during a session.

use fxhash::FxHashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use petgraph::Direction;
use std::rc::Rc;

use super::{LinkError, LinkResult, LinkedModule};
use crate::global;
use crate::ir::{Declaration, StableId};

/// Datatype representing node and edge indexes.
pub type LinkIx = global::ProgDeclSize;

/// Reference to an object stored within the [`LinkGraph`].
///
/// Object references are integer offsets,
///   not pointers.
/// They remain valid for the lifetime of the graph,
///   including across the reconciliation of a stub,
///   since reconciliation replaces the weight of a node rather than the
///   node itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(NodeIndex<LinkIx>);

impl ObjectRef {
    pub fn new(index: NodeIndex<LinkIx>) -> Self {
        Self(index)
    }
}

impl From<NodeIndex<LinkIx>> for ObjectRef {
    fn from(index: NodeIndex<LinkIx>) -> Self {
        Self(index)
    }
}

impl From<ObjectRef> for NodeIndex<LinkIx> {
    fn from(objref: ObjectRef) -> Self {
        objref.0
    }
}

/// An object on the link graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclObject {
    /// A declaration that has been referenced but whose owning module has
    ///   not yet been loaded.
    Stub(StableId),

    /// A resident declaration and the name of the module that owns it.
    Decl {
        decl: Rc<Declaration>,
        owner: Rc<str>,
    },
}

/// Result of a state transition on a [`DeclObject`].
///
/// On failure the original object is returned alongside the error so that
///   the graph can be restored.
pub type TransitionResult = Result<DeclObject, (DeclObject, LinkError)>;

impl DeclObject {
    pub fn id(&self) -> StableId {
        match self {
            Self::Stub(id) => *id,
            Self::Decl { decl, .. } => decl.id,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub(_))
    }

    pub fn decl(&self) -> Option<&Rc<Declaration>> {
        match self {
            Self::Stub(_) => None,
            Self::Decl { decl, .. } => Some(decl),
        }
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::Stub(_) => None,
            Self::Decl { owner, .. } => Some(owner),
        }
    }

    /// Back this object with `decl` owned by module `owner`.
    ///
    /// A stub becomes the declaration.
    /// A declaration that is already resident is kept if `decl` is equal
    ///   to it,
    ///     which happens when the same module is loaded through two
    ///     paths;
    ///   otherwise two modules are claiming the same identity and the
    ///   transition fails.
    pub fn resolve(self, decl: Rc<Declaration>, owner: Rc<str>) -> TransitionResult {
        let compatible = match &self {
            Self::Stub(id) => *id == decl.id,
            Self::Decl { decl: existing, .. } => **existing == *decl,
        };

        match self {
            Self::Stub(_) if compatible => Ok(Self::Decl { decl, owner }),
            Self::Decl { .. } if compatible => Ok(self),

            _ => {
                let err = LinkError::DuplicateDeclaration {
                    id: decl.id,
                    existing: self.owner().unwrap_or("<stub>").into(),
                    given: owner.to_string(),
                };

                Err((self, err))
            }
        }
    }
}

/// Graph of declarations linked during a session.
///
/// Each node holds a [`DeclObject`];
///   each edge is a reference from one declaration to another.
/// Declarations are indexed by [`StableId`] for `O(1)` lookup,
///   and every identifier has at most one node for the lifetime of the
///   graph.
///
/// Nodes are enclosed in an [`Option`] to permit moving owned values out
///   of the graph during a state transition.
#[derive(Debug, Default)]
pub struct LinkGraph {
    graph: DiGraph<Option<DeclObject>, (), LinkIx>,
    index: FxHashMap<StableId, ObjectRef>,
    pub(super) stubs_created: usize,
}

impl LinkGraph {
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a graph with the provided initial capacity.
    pub fn with_capacity(objects: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(objects, edges),
            index: FxHashMap::with_capacity_and_hasher(
                objects,
                Default::default(),
            ),
            stubs_created: 0,
        }
    }

    /// Retrieve an object from the graph by [`ObjectRef`].
    #[inline]
    pub fn get(&self, objref: ObjectRef) -> Option<&DeclObject> {
        self.graph.node_weight(objref.into()).map(|node| {
            node.as_ref()
                .expect("internal error: LinkGraph::get missing node data")
        })
    }

    #[inline]
    pub fn lookup(&self, id: StableId) -> Option<ObjectRef> {
        self.index.get(&id).copied()
    }

    /// The resident declaration for `id`,
    ///   if any.
    ///
    /// A stub is not a declaration.
    pub fn resolve(&self, id: StableId) -> Option<&Rc<Declaration>> {
        self.lookup(id)
            .and_then(|objref| self.get(objref))
            .and_then(DeclObject::decl)
    }

    /// Name of the module that owns the resident declaration `id`.
    pub fn owner_of(&self, id: StableId) -> Option<&str> {
        self.lookup(id)
            .and_then(|objref| self.get(objref))
            .and_then(DeclObject::owner)
    }

    /// Declare that `dep` is referenced by `objref`.
    pub fn add_dep(&mut self, objref: ObjectRef, dep: ObjectRef) {
        self.graph.update_edge(objref.into(), dep.into(), ());
    }

    #[inline]
    pub fn has_dep(&self, objref: ObjectRef, dep: ObjectRef) -> bool {
        self.graph.contains_edge(objref.into(), dep.into())
    }

    /// Objects referenced by `objref`.
    pub fn dependencies(
        &self,
        objref: ObjectRef,
    ) -> impl Iterator<Item = ObjectRef> + '_ {
        self.graph
            .neighbors_directed(objref.into(), Direction::Outgoing)
            .map(ObjectRef::from)
    }

    /// Number of objects on the graph,
    ///   including stubs.
    pub fn object_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of resident declarations.
    pub fn declaration_count(&self) -> usize {
        self.objects().filter(|obj| !obj.is_stub()).count()
    }

    pub(super) fn objects(&self) -> impl Iterator<Item = &DeclObject> {
        self.graph.node_weights().filter_map(Option::as_ref)
    }

    /// Index a new object,
    ///   which must not already exist.
    pub(super) fn add_object(&mut self, obj: DeclObject) -> ObjectRef {
        let id = obj.id();
        debug_assert!(!self.index.contains_key(&id));

        let objref = ObjectRef::new(self.graph.add_node(Some(obj)));
        self.index.insert(id, objref);

        objref
    }

    /// Perform a state transition on an object by [`ObjectRef`].
    ///
    /// Invoke `f` with the located object and replace the object on the
    ///   graph with the result.
    ///
    /// This will safely restore graph state to the original object on
    ///   transition failure.
    pub(super) fn with_object<F>(
        &mut self,
        objref: ObjectRef,
        f: F,
    ) -> LinkResult<ObjectRef>
    where
        F: FnOnce(DeclObject) -> TransitionResult,
    {
        let node = self
            .graph
            .node_weight_mut(objref.into())
            .expect("internal error: LinkGraph::with_object missing node");

        let obj = node
            .take()
            .expect("internal error: LinkGraph::with_object missing object");

        f(obj)
            .map(|obj| {
                node.replace(obj);
                objref
            })
            .map_err(|(orig, err)| {
                node.replace(orig);
                err
            })
    }

    /// Add each declaration of `module` to the graph along with an edge for
    ///   each of its references.
    ///
    /// References to declarations that are not yet resident are linked
    ///   to a stub
    ///     (see [`StubResolver::stub_for`](super::StubResolver::stub_for)).
    /// A declaration that was itself previously stubbed is left pending
    ///   until the module is
    ///   [reconciled](super::StubResolver::reconcile);
    ///     edges are attached to the stub's node either way.
    ///
    /// Returns a reference to each declaration in module order.
    pub fn import(&mut self, module: &LinkedModule) -> LinkResult<Vec<ObjectRef>> {
        use super::StubResolver;

        let mut refs = Vec::with_capacity(module.declarations.len());

        for decl in module.declarations.iter() {
            let objref = match self.lookup(decl.id) {
                None => self.add_object(DeclObject::Decl {
                    decl: decl.clone(),
                    owner: module.name.clone(),
                }),

                Some(objref) => match self.get(objref) {
                    Some(DeclObject::Stub(_)) => objref,
                    _ => self.with_object(objref, |obj| {
                        obj.resolve(decl.clone(), module.name.clone())
                    })?,
                },
            };

            for dep in decl.references() {
                let depref = self.stub_for(dep);
                self.add_dep(objref, depref);
            }

            refs.push(objref);
        }

        tracing::trace!(
            module = %module.name,
            declarations = refs.len(),
            "imported module into link graph"
        );

        Ok(refs)
    }

    /// Objects reachable from `roots`,
    ///   each following every object it references.
    ///
    /// This is a post-order depth-first traversal and so is a topological
    ///   sort of the reachable subgraph so long as it is acyclic;
    ///     declarations may legitimately reference one another
    ///     (e.g. mutual recursion),
    ///       in which case an object is emitted once, upon first
    ///       completion.
    pub fn reachable_post_order(&self, roots: &[ObjectRef]) -> Vec<ObjectRef> {
        let mut dfs = DfsPostOrder::empty(&self.graph);
        let mut order = Vec::new();

        for root in roots {
            dfs.move_to((*root).into());

            while let Some(index) = dfs.next(&self.graph) {
                order.push(ObjectRef::from(index));
            }
        }

        order
    }
}
