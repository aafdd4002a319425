// Module descriptors and their memoized loader
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

//! In-memory module namespaces.
//!
//! A [`ModuleDescriptor`] is built from the metadata of a klib
//!   (or, for the module being compiled, from its frontend namespace)
//!   together with the descriptors of its dependencies.
//! Descriptors are shared by [`Rc`]:
//!   two dependents of the same module observe one descriptor,
//!   and every module other than builtins holds a handle to the single
//!     builtins descriptor of the session.
//!
//! Descriptors of dependencies are produced by [`DescriptorCache`],
//!   which memoizes by canonical artifact path.

use fxhash::{FxHashMap, FxHashSet};
use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{ModuleGraph, ModuleGraphError, RecordRef};
use crate::fs::{Canonicalizer, FsCanonicalizer};
use crate::klib::{KlibError, KlibReader, MetadataEntry, ModuleMetadata};

/// Namespace of one module.
///
/// Lookups walk the module itself,
///   then its dependencies in declaration order
///     (each transitively, excluding builtins),
///   and finally the builtins module.
#[derive(Debug)]
pub struct ModuleDescriptor {
    name: String,
    is_builtins: bool,
    artifact_path: Option<PathBuf>,
    builtins: Option<Rc<ModuleDescriptor>>,
    dependencies: Vec<Rc<ModuleDescriptor>>,
    symbols: FxHashMap<String, MetadataEntry>,
}

impl ModuleDescriptor {
    /// Descriptor of a module loaded from the klib at `path`.
    pub fn from_metadata(
        metadata: &ModuleMetadata,
        path: &Path,
        builtins: Option<Rc<ModuleDescriptor>>,
        dependencies: Vec<Rc<ModuleDescriptor>>,
    ) -> Self {
        Self {
            artifact_path: Some(path.to_path_buf()),
            ..Self::from_namespace(
                metadata.name.clone(),
                metadata.is_builtins,
                builtins,
                dependencies,
                metadata.entries.iter().cloned(),
            )
        }
    }

    /// Descriptor of a module that has no artifact,
    ///   such as the module being compiled.
    pub fn from_namespace<S: Into<String>, I: IntoIterator<Item = MetadataEntry>>(
        name: S,
        is_builtins: bool,
        builtins: Option<Rc<ModuleDescriptor>>,
        dependencies: Vec<Rc<ModuleDescriptor>>,
        entries: I,
    ) -> Self {
        Self {
            name: name.into(),
            is_builtins,
            artifact_path: None,
            builtins: if is_builtins { None } else { builtins },
            dependencies,
            symbols: entries
                .into_iter()
                .map(|entry| (entry.name.clone(), entry))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtins(&self) -> bool {
        self.is_builtins
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    /// Builtins provider,
    ///   which is [`None`] only for the builtins module itself.
    pub fn builtins(&self) -> Option<&Rc<ModuleDescriptor>> {
        self.builtins.as_ref()
    }

    pub fn dependencies(&self) -> &[Rc<ModuleDescriptor>] {
        &self.dependencies
    }

    /// Entry declared by this module alone.
    pub fn local(&self, name: &str) -> Option<&MetadataEntry> {
        self.symbols.get(name)
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Resolve `name` within the namespace visible to this module.
    ///
    /// See the type-level documentation for lookup order.
    pub fn lookup(&self, name: &str) -> Option<&MetadataEntry> {
        self.lookup_chain(name).or_else(|| {
            self.builtins
                .as_ref()
                .and_then(|builtins| builtins.local(name))
        })
    }

    fn lookup_chain(&self, name: &str) -> Option<&MetadataEntry> {
        self.local(name).or_else(|| {
            self.dependencies
                .iter()
                .filter(|dep| !dep.is_builtins)
                .find_map(|dep| dep.lookup_chain(name))
        })
    }
}

/// Failure to resolve a [`ModuleDescriptor`].
#[derive(Debug)]
pub enum DescriptorError {
    Klib(KlibError),
    Graph(ModuleGraphError),

    /// An artifact names a module other than the one its record claims.
    NameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

impl Display for DescriptorError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Klib(err) => Display::fmt(err, fmt),
            Self::Graph(err) => Display::fmt(err, fmt),
            Self::NameMismatch {
                path,
                expected,
                found,
            } => write!(
                fmt,
                "{}: expected module `{expected}`, found `{found}`",
                path.display()
            ),
        }
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Klib(err) => Some(err),
            Self::Graph(err) => Some(err),
            Self::NameMismatch { .. } => None,
        }
    }
}

impl From<KlibError> for DescriptorError {
    fn from(err: KlibError) -> Self {
        Self::Klib(err)
    }
}

impl From<ModuleGraphError> for DescriptorError {
    fn from(err: ModuleGraphError) -> Self {
        Self::Graph(err)
    }
}

/// Memoized, graph-aware loader of [`ModuleDescriptor`]s.
///
/// Descriptors are keyed by canonical artifact path
///   (see [`Canonicalizer`]),
///   and so two records for the same artifact share one descriptor.
/// The first builtins module resolved becomes the builtins provider for
///   every subsequently resolved module.
///
/// A cache belongs to a single session;
///   concurrent sessions must each use their own.
#[derive(Debug)]
pub struct DescriptorCache<C: Canonicalizer = FsCanonicalizer> {
    resolved: FxHashMap<PathBuf, Rc<ModuleDescriptor>>,
    builtins: Option<Rc<ModuleDescriptor>>,
    in_progress: FxHashSet<RecordRef>,
    _canonicalizer: PhantomData<C>,
}

impl<C: Canonicalizer> Default for DescriptorCache<C> {
    fn default() -> Self {
        Self {
            resolved: Default::default(),
            builtins: None,
            in_progress: Default::default(),
            _canonicalizer: PhantomData,
        }
    }
}

impl<C: Canonicalizer> DescriptorCache<C> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Builtins provider of this session,
    ///   if one has been resolved.
    pub fn builtins(&self) -> Option<&Rc<ModuleDescriptor>> {
        self.builtins.as_ref()
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Descriptor for `record`,
    ///   loading it and its dependencies if necessary.
    ///
    /// Dependencies are resolved depth-first before the record itself.
    /// If no builtins provider has yet been resolved,
    ///   the builtins record reachable from `record` is resolved first.
    pub fn resolve(
        &mut self,
        reader: &mut KlibReader,
        graph: &ModuleGraph,
        record: RecordRef,
    ) -> Result<Rc<ModuleDescriptor>, DescriptorError> {
        let rec = graph
            .get(record)
            .expect("internal error: record not in module graph");

        let key = C::canonicalize(&rec.artifact_path).map_err(|_| {
            KlibError::UnresolvedDependency {
                module: rec.name.clone(),
                path: rec.artifact_path.clone(),
            }
        })?;

        if let Some(found) = self.resolved.get(&key) {
            tracing::trace!(module = %rec.name, "descriptor cache hit");
            return Ok(found.clone());
        }

        if !self.in_progress.insert(record) {
            return Err(ModuleGraphError::Cycle(vec![
                rec.name.clone(),
                rec.name.clone(),
            ])
            .into());
        }

        let result = self.load(reader, graph, record, key);
        self.in_progress.remove(&record);

        result
    }

    fn load(
        &mut self,
        reader: &mut KlibReader,
        graph: &ModuleGraph,
        record: RecordRef,
        key: PathBuf,
    ) -> Result<Rc<ModuleDescriptor>, DescriptorError> {
        let rec = graph
            .get(record)
            .expect("internal error: record not in module graph");

        tracing::debug!(module = %rec.name, "descriptor cache miss");

        if !rec.is_builtins && self.builtins.is_none() {
            let builtins = graph
                .builtins_reachable(record)
                .ok_or(ModuleGraphError::NoBuiltins)?;

            self.resolve(reader, graph, builtins)?;
        }

        let dependencies = graph
            .dependencies(record)
            .into_iter()
            .filter(|&dep| graph.get(dep).map_or(true, |d| !d.is_builtins))
            .map(|dep| self.resolve(reader, graph, dep))
            .collect::<Result<Vec<_>, _>>()?;

        let raw = reader.read_metadata(&rec.artifact_path)?;

        if raw.metadata.name != rec.name {
            return Err(DescriptorError::NameMismatch {
                path: rec.artifact_path.clone(),
                expected: rec.name.clone(),
                found: raw.metadata.name.clone(),
            });
        }

        let descriptor = Rc::new(ModuleDescriptor::from_metadata(
            &raw.metadata,
            &rec.artifact_path,
            self.builtins.clone(),
            dependencies,
        ));

        if descriptor.is_builtins() && self.builtins.is_none() {
            self.builtins = Some(descriptor.clone());
        }

        self.resolved.insert(key, descriptor.clone());

        Ok(descriptor)
    }
}
