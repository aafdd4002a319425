// Linked modules and programs
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

use std::rc::Rc;

use super::{LinkGraph, ObjectRef};
use crate::ir::{Declaration, FileIndex, ModuleIr, StableId, SymbolDescriptor};
use crate::module::ModuleDescriptor;

/// One module's declarations in the form in which they are linked.
///
/// This is produced either from freshly translated IR
///   (see [`LinkedModule::from_ir`])
///   or by deserializing a klib
///   (see [`KlibReader::deserialize_module`](crate::klib::KlibReader::deserialize_module)).
/// Declarations are shared by [`Rc`] with the [`LinkGraph`] and with the
///   reader's declaration cache.
#[derive(Debug, Clone)]
pub struct LinkedModule {
    pub name: Rc<str>,
    pub is_builtins: bool,
    pub descriptor: Rc<ModuleDescriptor>,
    pub files: Vec<FileIndex>,
    pub entry_points: Vec<StableId>,
    pub declarations: Vec<Rc<Declaration>>,
    pub descriptors: Vec<SymbolDescriptor>,
}

impl LinkedModule {
    /// Take ownership of translated IR for linking.
    pub fn from_ir(ir: ModuleIr, descriptor: Rc<ModuleDescriptor>) -> Self {
        let files = ir.file_indices();

        let ModuleIr {
            name,
            is_builtins,
            files: ir_files,
            entry_points,
            descriptors,
        } = ir;

        let declarations = ir_files
            .into_iter()
            .flat_map(|file| file.declarations)
            .map(Rc::new)
            .collect();

        Self {
            name: name.into(),
            is_builtins,
            descriptor,
            files,
            entry_points,
            declarations,
            descriptors,
        }
    }

    /// Whether `id` is declared by this module.
    pub fn owns(&self, id: StableId) -> bool {
        self.declarations.iter().any(|decl| decl.id == id)
    }

    pub fn declaration_ids(&self) -> impl Iterator<Item = StableId> + '_ {
        self.declarations.iter().map(|decl| decl.id)
    }
}

/// A fully linked program ready for lowering.
///
/// The graph contains no live stubs.
#[derive(Debug)]
pub struct LinkedProgram {
    pub graph: LinkGraph,

    /// Linked dependencies in link order followed by the module being
    ///   compiled.
    pub modules: Vec<LinkedModule>,
}

impl LinkedProgram {
    /// Module being compiled.
    pub fn main(&self) -> Option<&LinkedModule> {
        self.modules.last()
    }

    /// Roots from which lowering proceeds:
    ///   the entry points of the module being compiled,
    ///   or all of its declarations if it has no entry points.
    pub fn roots(&self) -> Vec<ObjectRef> {
        let main = match self.main() {
            Some(main) => main,
            None => return vec![],
        };

        let ids: Vec<_> = if main.entry_points.is_empty() {
            main.declaration_ids().collect()
        } else {
            main.entry_points.clone()
        };

        ids.into_iter()
            .filter_map(|id| self.graph.lookup(id))
            .collect()
    }

    /// Declarations in dependency order starting from [`Self::roots`].
    pub fn ordered_declarations(&self) -> Vec<&Rc<Declaration>> {
        self.graph
            .reachable_post_order(&self.roots())
            .into_iter()
            .filter_map(|objref| self.graph.get(objref))
            .filter_map(|obj| obj.decl())
            .collect()
    }
}
