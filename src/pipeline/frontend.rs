// Frontend interface
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

//! Interface to the frontend that analyzes and translates source.
//!
//! The linker never inspects source.
//! A [`Frontend`] produces an [`AnalyzedModule`] and from it the
//!   [`ModuleIr`] that is linked.
//!
//! Two frontends are provided here:
//!
//!   - [`PreparedModule`] yields IR that has already been translated;
//!       and
//!   - [`KlibFrontend`] yields the IR of an existing klib,
//!       which is how a klib is relinked against new dependencies.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ir::{ModuleIr, SymbolDescriptor};
use crate::klib::{IrRef, KlibError, KlibReader, RawModuleHeader};

/// Output of frontend analysis.
pub trait AnalyzedModule {
    /// Binding and resolution context of the analyzer.
    ///
    /// This is opaque to the linker.
    type Bindings;

    fn name(&self) -> &str;
    fn is_builtins(&self) -> bool;

    /// Source files of the module in order.
    fn source_files(&self) -> &[PathBuf];

    fn bindings(&self) -> &Self::Bindings;

    /// Module-level declaration namespace.
    fn namespace(&self) -> &[SymbolDescriptor];
}

pub trait Frontend {
    type Analyzed: AnalyzedModule;
    type Error: std::error::Error + 'static;

    fn analyze(&mut self) -> Result<Self::Analyzed, Self::Error>;

    fn translate(
        &mut self,
        analyzed: &Self::Analyzed,
    ) -> Result<ModuleIr, Self::Error>;
}

/// Analysis derived from IR.
#[derive(Debug, Clone)]
pub struct IrAnalysis<B> {
    name: String,
    is_builtins: bool,
    sources: Vec<PathBuf>,
    namespace: Vec<SymbolDescriptor>,
    bindings: B,
}

impl<B> AnalyzedModule for IrAnalysis<B> {
    type Bindings = B;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_builtins(&self) -> bool {
        self.is_builtins
    }

    fn source_files(&self) -> &[PathBuf] {
        &self.sources
    }

    fn bindings(&self) -> &B {
        &self.bindings
    }

    fn namespace(&self) -> &[SymbolDescriptor] {
        &self.namespace
    }
}

/// Frontend yielding IR that has already been translated.
///
/// If the IR carries no namespace,
///   one is derived from its declarations.
#[derive(Debug, Clone)]
pub struct PreparedModule {
    ir: ModuleIr,
}

impl PreparedModule {
    pub fn new(mut ir: ModuleIr) -> Self {
        if ir.descriptors.is_empty() {
            ir.describe_declarations();
        }

        Self { ir }
    }
}

impl Frontend for PreparedModule {
    type Analyzed = IrAnalysis<()>;
    type Error = Infallible;

    fn analyze(&mut self) -> Result<Self::Analyzed, Self::Error> {
        Ok(IrAnalysis {
            name: self.ir.name.clone(),
            is_builtins: self.ir.is_builtins,
            sources: self.ir.files.iter().map(|f| f.path.clone()).collect(),
            namespace: self.ir.descriptors.clone(),
            bindings: (),
        })
    }

    fn translate(&mut self, _: &Self::Analyzed) -> Result<ModuleIr, Self::Error> {
        Ok(self.ir.clone())
    }
}

/// Frontend yielding the IR of an existing klib.
#[derive(Debug)]
pub struct KlibFrontend {
    path: PathBuf,
    reader: KlibReader,
}

impl KlibFrontend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: KlibReader::new(),
        }
    }
}

impl Frontend for KlibFrontend {
    /// Bindings are the raw header and metadata of the klib.
    type Analyzed = IrAnalysis<Rc<RawModuleHeader>>;
    type Error = KlibError;

    fn analyze(&mut self) -> Result<Self::Analyzed, Self::Error> {
        let raw = self.reader.read_metadata(&self.path)?;

        let namespace = raw
            .metadata
            .entries
            .iter()
            .map(|entry| {
                let signature = match &entry.ir {
                    IrRef::Inline(signature) => signature.clone(),
                    IrRef::Declaration(id) => {
                        self.reader.read_declaration(&self.path, *id)?.signature.clone()
                    }
                };

                Ok(SymbolDescriptor::new(entry.kind, entry.name.clone(), signature))
            })
            .collect::<Result<Vec<_>, KlibError>>()?;

        Ok(IrAnalysis {
            name: raw.header.name.clone(),
            is_builtins: raw.header.is_builtins,
            sources: raw.header.files.iter().map(|f| f.path.clone()).collect(),
            namespace,
            bindings: raw,
        })
    }

    fn translate(&mut self, analyzed: &Self::Analyzed) -> Result<ModuleIr, Self::Error> {
        let raw = analyzed.bindings();

        let mut ir = if raw.header.is_builtins {
            ModuleIr::builtins(raw.header.name.clone())
        } else {
            ModuleIr::new(raw.header.name.clone())
        };

        for file in raw.header.files.iter() {
            let declarations = file
                .declarations
                .iter()
                .map(|&id| {
                    self.reader
                        .read_declaration(&self.path, id)
                        .map(|decl| (*decl).clone())
                })
                .collect::<Result<Vec<_>, _>>()?;

            ir.add_file(&file.path, declarations);
        }

        ir.entry_points = raw.header.entry_points.clone();
        ir.descriptors = analyzed.namespace().to_vec();

        Ok(ir)
    }
}
