// Module-level IR
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

//! IR of an entire module as produced by translation.

use std::path::{Path, PathBuf};

use super::{DeclKind, Declaration, StableId};

/// Declarations originating from a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrFile {
    pub path: PathBuf,
    pub declarations: Vec<Declaration>,
}

/// Declarations of a single source file by identifier only.
///
/// This is the per-file index stored in a klib header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndex {
    pub path: PathBuf,
    pub declarations: Vec<StableId>,
}

impl From<&IrFile> for FileIndex {
    fn from(file: &IrFile) -> Self {
        Self {
            path: file.path.clone(),
            declarations: file.declarations.iter().map(|d| d.id).collect(),
        }
    }
}

/// An entry of a module namespace as seen by the frontend.
///
/// A descriptor may or may not correspond to a declaration in the IR;
///   those that do are persisted by reference to that declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDescriptor {
    pub name: String,
    pub kind: DeclKind,
    pub signature: String,
}

impl SymbolDescriptor {
    pub fn new<N: Into<String>, S: Into<String>>(
        kind: DeclKind,
        name: N,
        signature: S,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: signature.into(),
        }
    }

    /// Identifier of the declaration this descriptor would describe.
    pub fn id(&self) -> StableId {
        StableId::for_identity(&self.name, &self.signature)
    }
}

impl From<&Declaration> for SymbolDescriptor {
    fn from(decl: &Declaration) -> Self {
        Self {
            name: decl.name.clone(),
            kind: decl.kind,
            signature: decl.signature.clone(),
        }
    }
}

/// Translated IR of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIr {
    pub name: String,
    pub is_builtins: bool,
    pub files: Vec<IrFile>,
    pub entry_points: Vec<StableId>,
    pub descriptors: Vec<SymbolDescriptor>,
}

impl ModuleIr {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            is_builtins: false,
            files: Vec::new(),
            entry_points: Vec::new(),
            descriptors: Vec::new(),
        }
    }

    /// IR of the builtins module,
    ///   which provides the primitives that every other module links
    ///   against.
    pub fn builtins<S: Into<String>>(name: S) -> Self {
        Self {
            is_builtins: true,
            ..Self::new(name)
        }
    }

    pub fn add_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        declarations: Vec<Declaration>,
    ) {
        self.files.push(IrFile {
            path: path.as_ref().to_path_buf(),
            declarations,
        });
    }

    pub fn with_entry_point(mut self, id: StableId) -> Self {
        self.entry_points.push(id);
        self
    }

    pub fn add_descriptor(&mut self, descriptor: SymbolDescriptor) {
        self.descriptors.push(descriptor);
    }

    /// Add a namespace descriptor for every declaration of the module.
    ///
    /// Frontends that do not maintain a separate namespace may use this to
    ///   derive one from the IR itself.
    pub fn describe_declarations(&mut self) {
        let descriptors: Vec<_> =
            self.declarations().map(SymbolDescriptor::from).collect();

        self.descriptors.extend(descriptors);
    }

    /// All declarations of all files in file order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.files.iter().flat_map(|file| file.declarations.iter())
    }

    pub fn file_indices(&self) -> Vec<FileIndex> {
        self.files.iter().map(FileIndex::from).collect()
    }
}
