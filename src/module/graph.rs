// Compiled module record graph
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

//! Graph of already-compiled modules and their dependencies.

use fixedbitset::FixedBitSet;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::fmt::{self, Display};
use std::path::PathBuf;

use crate::global;

/// Datatype representing node and edge indexes.
pub type RecordIx = global::ModuleRecordSize;

/// Pointer to an artifact that has already been produced but not yet
///   loaded.
///
/// A record is immutable once added to a [`ModuleGraph`];
///   only its dependency edges may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModuleRecord {
    pub name: String,
    pub is_builtins: bool,
    pub artifact_path: PathBuf,
}

impl CompiledModuleRecord {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(
        name: S,
        artifact_path: P,
    ) -> Self {
        Self {
            name: name.into(),
            is_builtins: false,
            artifact_path: artifact_path.into(),
        }
    }

    pub fn builtins<S: Into<String>, P: Into<PathBuf>>(
        name: S,
        artifact_path: P,
    ) -> Self {
        Self {
            is_builtins: true,
            ..Self::new(name, artifact_path)
        }
    }
}

/// Reference to a [`CompiledModuleRecord`] within a [`ModuleGraph`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordRef(NodeIndex<RecordIx>);

impl RecordRef {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl From<NodeIndex<RecordIx>> for RecordRef {
    fn from(index: NodeIndex<RecordIx>) -> Self {
        Self(index)
    }
}

/// Set of compiled module records and their declared dependencies.
///
/// An edge `a -> b` means that `a` depends on `b`.
/// The order in which dependencies of a record are added is significant:
///   it is the tie-break for [`ModuleGraph::linearize`].
#[derive(Debug, Default)]
pub struct ModuleGraph {
    graph: DiGraph<CompiledModuleRecord, (), RecordIx>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_record(&mut self, record: CompiledModuleRecord) -> RecordRef {
        RecordRef(self.graph.add_node(record))
    }

    /// Declare that `dependent` depends on `dependency`.
    ///
    /// Declaring the same dependency more than once has no effect.
    pub fn add_dependency(&mut self, dependent: RecordRef, dependency: RecordRef) {
        self.graph.update_edge(dependent.0, dependency.0, ());
    }

    pub fn get(&self, record: RecordRef) -> Option<&CompiledModuleRecord> {
        self.graph.node_weight(record.0)
    }

    /// Dependencies of `record` in the order in which they were declared.
    pub fn dependencies(&self, record: RecordRef) -> Vec<RecordRef> {
        // petgraph yields the most recently added edge first.
        let mut deps: Vec<_> = self
            .graph
            .neighbors_directed(record.0, Direction::Outgoing)
            .map(RecordRef)
            .collect();

        deps.reverse();
        deps
    }

    /// Locate a record by module name.
    pub fn find(&self, name: &str) -> Option<RecordRef> {
        self.graph
            .node_indices()
            .find(|&index| self.graph[index].name == name)
            .map(RecordRef)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Records reachable from `roots`,
    ///   including the roots themselves,
    ///   in order of discovery.
    pub fn reachable(&self, roots: &[RecordRef]) -> Vec<RecordRef> {
        let mut visited = FixedBitSet::with_capacity(self.graph.node_count());
        let mut found = Vec::new();
        let mut stack: Vec<_> = roots.iter().rev().copied().collect();

        while let Some(record) = stack.pop() {
            if visited.put(record.index()) {
                continue;
            }

            found.push(record);
            stack.extend(self.dependencies(record).into_iter().rev());
        }

        found
    }

    /// The first builtins record reachable from `record`.
    pub fn builtins_reachable(&self, record: RecordRef) -> Option<RecordRef> {
        self.reachable(&[record])
            .into_iter()
            .find(|&r| self.graph[r.0].is_builtins)
    }

    /// Order the records reachable from `roots` such that each record
    ///   follows all of its dependencies.
    ///
    /// The builtins record is always first.
    /// Remaining ties are broken by input order:
    ///   roots in the order given,
    ///   and the dependencies of each record in the order in which they
    ///     were declared.
    /// This keeps artifact output deterministic across runs with identical
    ///   inputs.
    ///
    /// The reachable set must contain exactly one builtins record,
    ///   which must itself have no dependencies,
    ///   and must be acyclic.
    pub fn linearize(
        &self,
        roots: &[RecordRef],
    ) -> Result<Vec<RecordRef>, ModuleGraphError> {
        let reachable = self.reachable(roots);

        let builtins: Vec<_> = reachable
            .iter()
            .copied()
            .filter(|&r| self.graph[r.0].is_builtins)
            .collect();

        let builtins = match builtins[..] {
            [] => return Err(ModuleGraphError::NoBuiltins),
            [only] => only,
            _ => {
                return Err(ModuleGraphError::MultipleBuiltins(
                    builtins.iter().map(|&r| self.name_of(r)).collect(),
                ))
            }
        };

        if !self.dependencies(builtins).is_empty() {
            return Err(ModuleGraphError::BuiltinsHasDependencies(
                self.name_of(builtins),
            ));
        }

        let count = self.graph.node_count();
        let mut visited = FixedBitSet::with_capacity(count);
        let mut on_stack = FixedBitSet::with_capacity(count);
        let mut order = Vec::with_capacity(reachable.len());

        // Post-order DFS; each stack frame holds the index of the next
        //   dependency to visit.
        for start in std::iter::once(builtins).chain(roots.iter().copied()) {
            if visited.put(start.index()) {
                continue;
            }

            on_stack.insert(start.index());
            let mut stack = vec![(start, 0usize)];

            while let Some(&(record, next)) = stack.last() {
                let deps = self.dependencies(record);

                let dep = match deps.get(next) {
                    Some(&dep) => dep,
                    None => {
                        on_stack.set(record.index(), false);
                        order.push(record);
                        stack.pop();
                        continue;
                    }
                };

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                if on_stack.contains(dep.index()) {
                    return Err(ModuleGraphError::Cycle(
                        self.cycle_path(&stack, dep),
                    ));
                }

                if !visited.put(dep.index()) {
                    on_stack.insert(dep.index());
                    stack.push((dep, 0));
                }
            }
        }

        Ok(order)
    }

    fn name_of(&self, record: RecordRef) -> String {
        self.graph[record.0].name.clone()
    }

    /// Names along the DFS stack from `dep` back around to `dep`.
    fn cycle_path(&self, stack: &[(RecordRef, usize)], dep: RecordRef) -> Vec<String> {
        let pos = stack.iter().position(|&(r, _)| r == dep).unwrap_or(0);

        stack[pos..]
            .iter()
            .map(|&(r, _)| self.name_of(r))
            .chain(std::iter::once(self.name_of(dep)))
            .collect()
    }
}

/// The record graph violates a precondition of linking.
///
/// These all represent a breach of contract by the caller
///   (or corrupt artifacts)
///   and are never recoverable within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleGraphError {
    /// No builtins record is reachable from the roots.
    NoBuiltins,

    /// More than one builtins record is reachable from the roots.
    MultipleBuiltins(Vec<String>),

    /// The builtins record declares dependencies of its own,
    ///   and so could not be ordered first.
    BuiltinsHasDependencies(String),

    /// The graph contains a cycle.
    ///
    /// The path begins and ends with the same module name.
    Cycle(Vec<String>),
}

impl Display for ModuleGraphError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoBuiltins => {
                write!(fmt, "no builtins module among dependencies")
            }
            Self::MultipleBuiltins(names) => write!(
                fmt,
                "expected exactly one builtins module, found: {}",
                names.join(", ")
            ),
            Self::BuiltinsHasDependencies(name) => write!(
                fmt,
                "builtins module `{name}` must not declare dependencies"
            ),
            Self::Cycle(path) => {
                write!(fmt, "cyclic module dependency: {}", path.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ModuleGraphError {}
