// Record graph discovery from artifacts on disk
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

//! Build a [`ModuleGraph`] by following the dependencies recorded in klib
//!   metadata.
//!
//! A build driver normally supplies the record graph directly.
//! When relinking an existing klib there is no driver,
//!   and so dependency names from its metadata are located as
//!   `<dir>/<name>.klib` on a list of search paths,
//!     with the directory containing the artifact searched first.

use fxhash::FxHashMap;
use std::path::{Path, PathBuf};

use super::{CompiledModuleRecord, ModuleGraph, RecordRef};
use crate::global;
use crate::klib::{KlibError, KlibReader, KlibResult};

/// Discovers records reachable from a root artifact.
pub struct Discovery<'a> {
    reader: &'a mut KlibReader,
    search_paths: Vec<PathBuf>,
    graph: ModuleGraph,
    found: FxHashMap<String, RecordRef>,
}

impl<'a> Discovery<'a> {
    pub fn new(reader: &'a mut KlibReader, search_paths: &[PathBuf]) -> Self {
        Self {
            reader,
            search_paths: search_paths.to_vec(),
            graph: ModuleGraph::new(),
            found: Default::default(),
        }
    }

    /// Add the artifact at `path` and everything it depends on.
    ///
    /// Each module is visited once;
    ///   a cycle among artifacts produces a cycle in the graph that is
    ///   reported upon linearization.
    pub fn visit(&mut self, path: &Path) -> KlibResult<RecordRef> {
        let raw = self.reader.read_metadata(path)?;
        let meta = &raw.metadata;

        if let Some(&found) = self.found.get(&meta.name) {
            return Ok(found);
        }

        let record = self.graph.add_record(CompiledModuleRecord {
            name: meta.name.clone(),
            is_builtins: meta.is_builtins,
            artifact_path: path.to_path_buf(),
        });

        self.found.insert(meta.name.clone(), record);

        tracing::trace!(module = %meta.name, path = %path.display(), "discovered module");

        let dir = path.parent().map(Path::to_path_buf);

        for dep_name in meta.dependencies.iter() {
            let dep_path = self.locate(dir.as_deref(), dep_name).ok_or_else(|| {
                KlibError::UnresolvedDependency {
                    module: dep_name.clone(),
                    path: PathBuf::from(format!("{dep_name}.{}", global::KLIB_EXT)),
                }
            })?;

            let dep = self.visit(&dep_path)?;
            self.graph.add_dependency(record, dep);
        }

        Ok(record)
    }

    fn locate(&self, dir: Option<&Path>, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.{}", global::KLIB_EXT);

        dir.into_iter()
            .chain(self.search_paths.iter().map(PathBuf::as_path))
            .map(|search| search.join(&file))
            .find(|candidate| candidate.join(global::HEADER_FILE).is_file())
    }

    pub fn finish(self) -> ModuleGraph {
        self.graph
    }
}

/// Build the record graph for the artifact at `root`.
pub fn discover(
    reader: &mut KlibReader,
    root: &Path,
    search_paths: &[PathBuf],
) -> KlibResult<(ModuleGraph, RecordRef)> {
    let mut discovery = Discovery::new(reader, search_paths);
    let root = discovery.visit(root)?;

    Ok((discovery.finish(), root))
}
